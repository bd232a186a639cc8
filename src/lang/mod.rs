//! Language support: the language registry, line-pattern strategy tables,
//! and the pluggable tokenizer / learned-classifier collaborator seams.

pub mod patterns;
pub mod tokenizer;

pub use patterns::LanguageSpec;
pub use tokenizer::LexicalTokenizer;

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;

/// Supported submission languages.
///
/// Unknown file extensions fall back to [`Language::Cpp`], whose patterns are
/// the most general of the C-family tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// C
    C,
    /// C++
    Cpp,
    /// Java
    Java,
    /// Python
    Python,
    /// JavaScript (TypeScript files are treated as JavaScript)
    JavaScript,
}

impl Language {
    /// Detect a language from a file extension (without the leading dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "c" => Self::C,
            "cpp" | "cc" | "cxx" | "h" | "hpp" | "hxx" => Self::Cpp,
            "java" => Self::Java,
            "py" => Self::Python,
            "js" | "ts" | "jsx" | "tsx" => Self::JavaScript,
            _ => Self::Cpp,
        }
    }

    /// Detect a language from a file path.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Cpp)
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::Java => "java",
            Self::Python => "python",
            Self::JavaScript => "javascript",
        }
    }

    /// Per-language detection-threshold offset.
    ///
    /// Dynamic languages get a more lenient threshold, rigidly structured
    /// ones a stricter one.
    pub fn threshold_offset(&self) -> f64 {
        match self {
            Self::JavaScript => -0.05,
            Self::C | Self::Cpp => 0.05,
            Self::Java | Self::Python => 0.0,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External tokenizer / structural-skeleton collaborator.
///
/// Any conforming implementation is pluggable, including adapters over
/// off-the-shelf incremental parsers. The engine ships with
/// [`LexicalTokenizer`], a normalizing lexer driven by the same pattern
/// tables as the dependence-graph builder.
pub trait TokenProvider: Send + Sync {
    /// Produce the ordered token stream for a source text, with comments and
    /// whitespace stripped.
    fn tokenize(&self, source: &str, language: Language) -> Result<Vec<String>>;

    /// Produce the ordered structural-node-label sequence for a source text.
    fn skeleton(&self, source: &str, language: Language) -> Result<Vec<String>>;
}

/// Optional learned-classifier collaborator.
///
/// Implementations score a named feature map into a clone probability. When
/// no scorer is installed the structural detector falls back to its
/// heuristic-only weighting.
pub trait LearnedScorer: Send + Sync {
    /// Score a pair's named features into a probability in `[0, 1]`.
    fn score(&self, features: &HashMap<String, f64>) -> Result<f64>;
}
