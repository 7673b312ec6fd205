//! Error types for asset generation, loading and persistence

use std::path::PathBuf;

use crate::key::AssetKey;

/// Boxed error from an external collaborator (renderer, issuer, resolver)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A generator's precondition on its inputs failed
///
/// `field` names the offending constraint using the install-config path
/// (`controlPlane.replicas`), `message` describes the violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Path of the offending field
    pub field: String,
    /// Human readable description
    pub message: String,
}

impl ValidationError {
    /// Create validation error for field
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by `Asset::generate`
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// Inputs violate a generator precondition
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Generator asked for a parent it never declared
    #[error("asset \"{asset}\" requested undeclared dependency {requested}")]
    UndeclaredDependency {
        /// Name of the requesting asset
        asset: &'static str,
        /// Key that was requested
        requested: AssetKey,
    },

    /// Injected collaborator is not available
    #[error("service not available: {0}")]
    MissingService(&'static str),

    /// Required user input is missing
    #[error("missing input: {0}")]
    MissingInput(String),

    /// Template rendering failed
    #[error("failed to render {template}")]
    Render {
        /// Template name
        template: String,
        /// Underlying renderer error
        #[source]
        source: BoxError,
    },

    /// Generated content could not be encoded
    #[error("failed to encode {what}")]
    Encode {
        /// What was being encoded
        what: String,
        /// Underlying error
        #[source]
        source: BoxError,
    },

    /// External collaborator failed
    #[error("{context}")]
    External {
        /// What was attempted
        context: String,
        /// Underlying error
        #[source]
        source: BoxError,
    },

    /// Generator observed cancellation
    #[error("generation cancelled")]
    Cancelled,
}

impl GenerateError {
    /// Wrap an external collaborator failure with context
    pub fn external(
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Validation error, if this is one
    #[must_use]
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors raised while loading an asset from previously emitted files
///
/// Load errors are non-fatal for resolution: the store logs them and falls
/// back to generation.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// File was read but could not be parsed
    #[error("failed to parse {file}: {reason}")]
    Parse {
        /// Relative file name
        file: String,
        /// Parser message
        reason: String,
    },
}

impl LoadError {
    /// Create parse error for file
    pub fn parse(file: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            file: file.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors writing or removing asset files
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// IO error on path
    #[error("failed to write {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// File name escapes the target directory
    #[error("refusing to write {0}: path must be relative")]
    InvalidPath(String),
}
