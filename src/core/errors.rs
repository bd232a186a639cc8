//! Error types for the parallax-rs library.
//!
//! This module provides structured error handling for all engine operations,
//! preserving context so callers can report failures against the unit,
//! configuration field, or language that produced them.

use std::io;

use thiserror::Error;

/// Main result type for parallax operations.
pub type Result<T> = std::result::Result<T, ParallaxError>;

/// Comprehensive error type for all parallax operations.
#[derive(Error, Debug)]
pub enum ParallaxError {
    /// I/O related errors (reading submission files)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration errors, raised at construction time
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// Tokenization failures from the token-provider collaborator
    #[error("Tokenize error in {language}: {message}")]
    Tokenize {
        /// Language of the unit being tokenized
        language: String,
        /// Error description
        message: String,
        /// Identifier of the unit that failed
        unit_id: Option<String>,
    },

    /// Validation errors for input data
    #[error("Validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Field or input that failed validation
        field: Option<String>,
    },

    /// A unit id that is not part of the prepared batch
    #[error("Unknown unit '{unit_id}' in batch comparison")]
    UnknownUnit {
        /// The offending unit identifier
        unit_id: String,
    },

    /// Batch does not contain enough units to form pairs
    #[error("Insufficient units for batch analysis: {count} provided, at least 2 required")]
    InsufficientUnits {
        /// Number of usable units in the batch
        count: usize,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
    },
}

impl ParallaxError {
    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new tokenization error
    pub fn tokenize(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tokenize {
            language: language.into(),
            message: message.into(),
            unit_id: None,
        }
    }

    /// Create a new tokenization error attributed to a unit
    pub fn tokenize_unit(
        language: impl Into<String>,
        message: impl Into<String>,
        unit_id: impl Into<String>,
    ) -> Self {
        Self::Tokenize {
            language: language.into(),
            message: message.into(),
            unit_id: Some(unit_id.into()),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_yaml::Error> for ParallaxError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for ParallaxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
