//! Error types for the classification engine

use std::path::PathBuf;
use thiserror::Error;

pub type MimeResult<T> = Result<T, MimeError>;

/// Errors surfaced by the engine.
///
/// Resolution misses are never errors: every `resolve_*` operation returns
/// `None` (or an empty list) when no known type matches.
#[derive(Error, Debug)]
pub enum MimeError {
    /// The glob compiler was given empty, NUL-containing, or untranslatable text.
    #[error("Malformed glob pattern {pattern:?}: {reason}")]
    MalformedPattern { pattern: String, reason: String },

    /// A strict matcher parser was given non-glob or wrong-arity text.
    #[error("Invalid {kind} pattern {pattern:?}: {reason}")]
    InvalidPattern {
        kind: &'static str,
        pattern: String,
        reason: String,
    },

    /// The IETF media-type parser was given text it cannot split.
    #[error("Malformed media type {text:?}: {reason}")]
    MalformedMediaType { text: String, reason: String },

    /// A package descriptor file could not be parsed.
    #[error("Failed to parse package {package}: {message}")]
    DescriptorParse { package: String, message: String },

    /// An operation named an area that was never bound.
    #[error("Unknown area: {0}")]
    UnknownNamespace(String),

    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

impl MimeError {
    pub(crate) fn malformed_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        MimeError::MalformedPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_pattern(
        kind: &'static str,
        pattern: &str,
        reason: impl Into<String>,
    ) -> Self {
        MimeError::InvalidPattern {
            kind,
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_media_type(text: &str, reason: impl Into<String>) -> Self {
        MimeError::MalformedMediaType {
            text: text.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn descriptor(package: impl Into<String>, message: impl Into<String>) -> Self {
        MimeError::DescriptorParse {
            package: package.into(),
            message: message.into(),
        }
    }
}
