//! Error types for the asset store
//!
//! Every failure below the requested target is wrapped in
//! [`StoreError::Dependency`] with the consumer's name, so the chain names
//! each asset from the root down to the one that failed.

use std::path::PathBuf;

use forge_asset::{display_path, AssetKey, GenerateError, PersistError, ValidationError};

/// Errors reading or writing the persisted state file
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// IO error on the state file
    #[error("state file {path}: {source}")]
    Io {
        /// State file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// State file exists but is not a JSON object
    #[error("state file {path} is corrupt: {reason}")]
    Corrupt {
        /// State file path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// State could not be serialized
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while resolving assets
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The dependency graph contains a cycle
    #[error("dependency cycle detected: {}", display_path(.path))]
    DependencyCycle {
        /// Keys along the cycle; the first key is repeated at the end
        path: Vec<AssetKey>,
    },

    /// An asset's generator failed
    #[error("failed to generate asset \"{name}\"")]
    Generation {
        /// Asset name
        name: &'static str,
        /// Generator error
        #[source]
        source: GenerateError,
    },

    /// A prerequisite of the named asset failed
    #[error("failed to fetch dependency of \"{name}\"")]
    Dependency {
        /// Name of the consumer
        name: &'static str,
        /// The prerequisite's failure
        #[source]
        source: Box<StoreError>,
    },

    /// A state-file entry does not decode into its asset type
    #[error("state for {key} is corrupt: {reason}")]
    StateCorruption {
        /// State-file key
        key: String,
        /// Decoder message
        reason: String,
    },

    /// Resolution was cancelled before the asset completed
    #[error("generation of \"{name}\" was cancelled")]
    Cancelled {
        /// Asset name
        name: &'static str,
    },

    /// Key is not part of the registry
    #[error("unknown asset {key}")]
    UnknownAsset {
        /// Requested key
        key: AssetKey,
    },

    /// Registered type differs from the requested type
    #[error("asset {key} is registered with a different type")]
    TypeMismatch {
        /// Requested key
        key: AssetKey,
    },

    /// Store was opened without a working directory
    #[error("store has no working directory")]
    NoDirectory,

    /// Persisted state file failure
    #[error(transparent)]
    State(#[from] StateError),

    /// Writing or removing asset files failed
    #[error("failed to persist asset \"{name}\"")]
    Persist {
        /// Asset name
        name: &'static str,
        /// Underlying error
        #[source]
        source: PersistError,
    },
}

impl StoreError {
    /// Wrap a prerequisite's failure with the consumer's name
    ///
    /// Cycles and cancellations already describe the whole resolution and
    /// pass through unchanged.
    #[must_use]
    pub fn in_dependency_of(self, name: &'static str) -> Self {
        match self {
            e @ (Self::DependencyCycle { .. } | Self::Cancelled { .. }) => e,
            e => Self::Dependency {
                name,
                source: Box::new(e),
            },
        }
    }

    /// Innermost error of the dependency chain
    #[must_use]
    pub fn root_cause(&self) -> &StoreError {
        let mut current = self;
        while let Self::Dependency { source, .. } = current {
            current = source.as_ref();
        }
        current
    }

    /// Names of the assets along the failure chain, root first
    #[must_use]
    pub fn chain(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut current = self;
        loop {
            match current {
                Self::Dependency { name, source } => {
                    names.push(*name);
                    current = source.as_ref();
                }
                Self::Generation { name, .. }
                | Self::Cancelled { name }
                | Self::Persist { name, .. } => {
                    names.push(*name);
                    return names;
                }
                _ => return names,
            }
        }
    }

    /// Validation failure anywhere in the chain
    #[must_use]
    pub fn validation(&self) -> Option<&ValidationError> {
        match self.root_cause() {
            Self::Generation { source, .. } => source.validation(),
            _ => None,
        }
    }

    /// Cycle path, if resolution failed on a cycle
    #[must_use]
    pub fn cycle(&self) -> Option<&[AssetKey]> {
        match self.root_cause() {
            Self::DependencyCycle { path } => Some(path),
            _ => None,
        }
    }

    /// Whether resolution was cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Self::Cancelled { .. })
    }

    /// Whether the error is fatal corruption of persisted state
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::StateCorruption { .. } | Self::State(StateError::Corrupt { .. })
        )
    }
}
