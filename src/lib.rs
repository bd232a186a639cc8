//! # Parallax-RS: Cohort Code Clone Detection Engine
//!
//! A Rust engine for detecting near-duplicate and behaviorally-equivalent
//! source code across a cohort of submissions, built for academic-integrity
//! review. This library provides:
//!
//! - **Document Fingerprinting**: winnowing fingerprints with cohort-learned
//!   boilerplate suppression
//! - **Dependence Analysis**: a lightweight, pattern-driven statement
//!   dependence graph with derived behavioral features
//! - **Dual-Signal Scoring**: independent structural (copy/paste style) and
//!   semantic (rewritten-but-equivalent) similarity scorers
//! - **Decision Fusion**: ensemble confidence estimation, adaptive
//!   thresholds, clone typing, risk levels, and cohort-aware outlier flags
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        API Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Core         │  Detectors      │  Language                 │
//! │               │                 │                           │
//! │ • Config      │ • Fingerprint   │ • Pattern tables          │
//! │ • Errors      │ • Dependence    │ • Tokenizer seam          │
//! │ • Session     │ • Behavioral    │ • Learned-scorer seam     │
//! │               │ • Structural    │                           │
//! │               │ • Semantic      │                           │
//! │               │ • Ensemble      │                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parallax_rs::{CodeUnit, Engine, EngineConfig, Language};
//!
//! fn main() -> parallax_rs::Result<()> {
//!     let engine = Engine::new(EngineConfig::default())?;
//!     let units = vec![
//!         CodeUnit::new("alice", Language::Cpp, "int main() { return 0; }"),
//!         CodeUnit::new("bob", Language::Cpp, "int main() { return 1; }"),
//!     ];
//!     let report = engine.analyze_batch(&units)?;
//!     println!("{} pairs compared", report.total_comparisons);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

// Core data structures and engine plumbing
pub mod core {
    //! Core configuration, error, and batch-session types.

    pub mod config;
    pub mod errors;
    pub mod session;
}

// Specialized detection algorithms
pub mod detectors {
    //! Similarity detectors and score-fusion components.

    pub mod behavioral;
    pub mod dependence;
    pub mod ensemble;
    pub mod fingerprint;
    pub mod semantic;
    pub mod structural;
}

// Language tables and external collaborator seams
pub mod lang;

// Public API and engine interface
pub mod api {
    //! High-level API and engine interface.

    pub mod engine;
    pub mod results;
}

// Re-export primary types for convenience
pub use crate::api::engine::Engine;
pub use crate::api::results::{
    BatchReport, CloneType, CohortStats, Confidence, PairAnalysis, ReviewAction, RiskLevel,
    UnifiedVerdict,
};
pub use crate::core::config::EngineConfig;
pub use crate::core::errors::{ParallaxError, Result};
pub use crate::core::session::{CodeUnit, PreparedBatch};
pub use crate::lang::{Language, LearnedScorer, TokenProvider};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
