//! Install config asset (`install-config.yaml`)

use forge_asset::{
    async_trait, Asset, AssetFile, AssetKey, FileFetcher, GenerateContext, GenerateError,
    LoadError, Parents, ValidationError, WritableAsset,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{InstallConfigSpec, InstallInputs};

/// File the install config is read from and written to
pub const INSTALL_CONFIG_FILENAME: &str = "install-config.yaml";

/// User-facing cluster configuration
///
/// Generated from the [`InstallInputs`] service, or loaded from an
/// `install-config.yaml` the user placed in the working directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Parsed document with defaults applied
    pub config: InstallConfigSpec,
    /// Emitted file
    pub file: Option<AssetFile>,
}

#[async_trait]
impl Asset for InstallConfig {
    const KEY: AssetKey = AssetKey::new("installconfig.InstallConfig");

    fn name(&self) -> &'static str {
        "Install Config"
    }

    async fn generate(&mut self, _: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        let inputs = ctx.service::<InstallInputs>()?;
        if inputs.cluster_name.is_empty() {
            return Err(GenerateError::MissingInput("cluster_name".to_string()));
        }
        if inputs.base_domain.is_empty() {
            return Err(GenerateError::MissingInput("base_domain".to_string()));
        }

        let config = inputs.to_spec();
        validate(&config)?;
        self.file = Some(encode(&config)?);
        self.config = config;
        Ok(())
    }
}

impl WritableAsset for InstallConfig {
    fn files(&self) -> Vec<AssetFile> {
        self.file.iter().cloned().collect()
    }

    fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, LoadError> {
        let Some(file) = fetcher.fetch_by_name(INSTALL_CONFIG_FILENAME)? else {
            return Ok(false);
        };
        let mut config: InstallConfigSpec = serde_yaml::from_slice(&file.data)
            .map_err(|e| LoadError::parse(INSTALL_CONFIG_FILENAME, e))?;
        config.apply_defaults();
        validate(&config).map_err(|e| LoadError::parse(INSTALL_CONFIG_FILENAME, e))?;
        debug!(cluster = %config.metadata.name, "loaded install config");

        self.config = config;
        self.file = Some(file);
        Ok(true)
    }
}

fn encode(config: &InstallConfigSpec) -> Result<AssetFile, GenerateError> {
    let yaml = serde_yaml::to_string(config).map_err(|e| GenerateError::Encode {
        what: INSTALL_CONFIG_FILENAME.to_string(),
        source: Box::new(e),
    })?;
    Ok(AssetFile::new(INSTALL_CONFIG_FILENAME, yaml))
}

/// Structural checks shared by generation and loading
///
/// # Errors
/// Returns a [`ValidationError`] naming the first offending field.
pub fn validate(config: &InstallConfigSpec) -> Result<(), ValidationError> {
    let name = &config.metadata.name;
    if name.is_empty() {
        return Err(ValidationError::new("metadata.name", "cluster name is required"));
    }
    let valid_label = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-');
    if !valid_label {
        return Err(ValidationError::new(
            "metadata.name",
            format!("{name:?} must be a lowercase DNS label"),
        ));
    }
    if config.base_domain.is_empty() {
        return Err(ValidationError::new("baseDomain", "base domain is required"));
    }
    if let Some(replicas) = config.control_plane.replicas {
        if replicas < 1 {
            return Err(ValidationError::new(
                "controlPlane.replicas",
                format!("must be positive, got {replicas}"),
            ));
        }
    }
    for (i, pool) in config.compute.iter().enumerate() {
        if pool.replicas.is_some_and(|r| r < 0) {
            return Err(ValidationError::new(
                format!("compute[{i}].replicas"),
                "must not be negative",
            ));
        }
    }
    if config.platform.none.is_some() && config.platform.aws.is_some() {
        return Err(ValidationError::new("platform", "exactly one platform must be set"));
    }
    validate_pull_secret(&config.pull_secret)
}

fn validate_pull_secret(secret: &str) -> Result<(), ValidationError> {
    let parsed: serde_json::Value = serde_json::from_str(secret)
        .map_err(|e| ValidationError::new("pullSecret", format!("invalid JSON: {e}")))?;
    if parsed.get("auths").is_some_and(serde_json::Value::is_object) {
        Ok(())
    } else {
        Err(ValidationError::new("pullSecret", "auths required"))
    }
}
