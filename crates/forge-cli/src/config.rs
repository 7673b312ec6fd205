//! `forge.toml` configuration

use std::path::{Path, PathBuf};

use forge_ignition::InstallInputs;
use forge_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// Errors reading configuration files
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// TOML did not match the schema
    #[error("invalid config {path}: {source}")]
    Toml {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        source: toml::de::Error,
    },

    /// YAML did not match the schema
    #[error("invalid install inputs {path}: {source}")]
    Yaml {
        /// Offending file
        path: PathBuf,
        /// Underlying error
        source: serde_yaml::Error,
    },
}

/// Top-level CLI configuration
///
/// ```toml
/// release_image = "quay.io/openshift-release-dev/ocp-release:4.6.0-x86_64"
///
/// [store]
/// resolve_mode = "concurrent"
///
/// [install]
/// cluster_name = "sno"
/// base_domain = "example.com"
/// control_plane_replicas = 1
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Store behaviour
    pub store: StoreConfig,
    /// Pinned release image; the environment override or default otherwise
    pub release_image: Option<String>,
    /// Answers used when no `install-config.yaml` exists
    pub install: Option<InstallInputs>,
}

impl ForgeConfig {
    /// Parse TOML
    ///
    /// # Errors
    /// Returns the TOML error when the document does not match the schema.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file is unreadable or invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        Self::from_toml(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace the install inputs
    #[must_use]
    pub fn with_install(mut self, inputs: InstallInputs) -> Self {
        self.install = Some(inputs);
        self
    }

    /// Pin the release image
    #[must_use]
    pub fn with_release_image(mut self, pull_spec: impl Into<String>) -> Self {
        self.release_image = Some(pull_spec.into());
        self
    }
}

/// Read install inputs from a YAML file
///
/// # Errors
/// Returns [`ConfigError`] when the file is unreadable or invalid.
pub fn load_install_inputs(path: &Path) -> Result<InstallInputs, ConfigError> {
    let text = read(path)?;
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_store::ResolveMode;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ForgeConfig::from_toml("").unwrap();
        assert_eq!(config, ForgeConfig::default());
        assert!(config.store.persist_state);
    }

    #[test]
    fn parses_full_config() {
        let config = ForgeConfig::from_toml(
            r#"
release_image = "quay.io/r:1"

[store]
resolve_mode = "concurrent"
state_file_name = "state.json"

[install]
cluster_name = "sno"
base_domain = "example.com"
control_plane_replicas = 1
installation_disk = "/dev/sda"
"#,
        )
        .unwrap();
        assert_eq!(config.release_image.as_deref(), Some("quay.io/r:1"));
        assert_eq!(config.store.resolve_mode, ResolveMode::Concurrent);
        assert_eq!(config.store.state_file_name, "state.json");
        let install = config.install.unwrap();
        assert_eq!(install.cluster_name, "sno");
        assert_eq!(install.control_plane_replicas, Some(1));
        assert_eq!(install.installation_disk.as_deref(), Some("/dev/sda"));
    }

    #[test]
    fn rejects_unknown_resolve_mode() {
        assert!(ForgeConfig::from_toml("[store]\nresolve_mode = \"parallel\"\n").is_err());
    }

    #[test]
    fn reads_yaml_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inputs.yaml");
        std::fs::write(&path, "cluster_name: sno\nbase_domain: example.com\ncompute_replicas: 0\n").unwrap();
        let inputs = load_install_inputs(&path).unwrap();
        assert_eq!(inputs.base_domain, "example.com");
        assert_eq!(inputs.compute_replicas, Some(0));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ForgeConfig::load(Path::new("/nonexistent/forge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
