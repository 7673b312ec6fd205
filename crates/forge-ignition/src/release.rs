//! Release payload reference

use std::sync::Arc;

use forge_asset::{async_trait, Asset, AssetKey, GenerateContext, GenerateError, Parents};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Environment variable that overrides the default release image
pub const RELEASE_IMAGE_OVERRIDE_ENV: &str = "FORGE_RELEASE_IMAGE_OVERRIDE";

/// Release image used when nothing overrides it
pub const DEFAULT_RELEASE_IMAGE: &str = "quay.io/openshift-release-dev/ocp-release:4.6.0-x86_64";

/// Resolves the release payload pull spec
///
/// Resolution may involve the network, so it is async. Registered in
/// [`forge_asset::Services`] as `Arc<dyn ReleaseResolver>`.
#[async_trait]
pub trait ReleaseResolver: Send + Sync {
    /// Pull spec of the release payload
    ///
    /// # Errors
    /// Returns [`GenerateError`] when the reference cannot be resolved.
    async fn resolve(&self) -> Result<String, GenerateError>;
}

/// Always resolves to a fixed pull spec
#[derive(Debug, Clone)]
pub struct StaticReleaseResolver {
    pull_spec: String,
}

impl StaticReleaseResolver {
    /// Resolver for a fixed pull spec
    pub fn new(pull_spec: impl Into<String>) -> Self {
        Self {
            pull_spec: pull_spec.into(),
        }
    }
}

#[async_trait]
impl ReleaseResolver for StaticReleaseResolver {
    async fn resolve(&self) -> Result<String, GenerateError> {
        Ok(self.pull_spec.clone())
    }
}

/// Default pull spec, unless the override variable is set
#[derive(Debug, Clone)]
pub struct EnvReleaseResolver {
    default: String,
}

impl Default for EnvReleaseResolver {
    fn default() -> Self {
        Self {
            default: DEFAULT_RELEASE_IMAGE.to_string(),
        }
    }
}

#[async_trait]
impl ReleaseResolver for EnvReleaseResolver {
    async fn resolve(&self) -> Result<String, GenerateError> {
        match std::env::var(RELEASE_IMAGE_OVERRIDE_ENV) {
            Ok(pull_spec) if !pull_spec.trim().is_empty() => {
                warn!(%pull_spec, "found override for release image; please be warned, this is not advised");
                Ok(pull_spec.trim().to_string())
            }
            _ => Ok(self.default.clone()),
        }
    }
}

/// Release payload the cluster boots from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseImage {
    /// Image pull spec
    pub pull_spec: String,
}

#[async_trait]
impl Asset for ReleaseImage {
    const KEY: AssetKey = AssetKey::new("releaseimage.Image");

    fn name(&self) -> &'static str {
        "Release Image"
    }

    async fn generate(&mut self, _: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
        let resolver = ctx.service::<Arc<dyn ReleaseResolver>>()?;
        let pull_spec = resolver.resolve().await?;
        if pull_spec.is_empty() {
            return Err(GenerateError::MissingInput("release image pull spec".to_string()));
        }
        info!(%pull_spec, "resolved release image");
        self.pull_spec = pull_spec;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_asset::Services;

    #[tokio::test]
    async fn uses_injected_resolver() {
        let ctx = GenerateContext::new(Services::new().with::<Arc<dyn ReleaseResolver>>(
            Arc::new(StaticReleaseResolver::new("quay.io/test/release:1")),
        ));
        let mut image = ReleaseImage::default();
        image.generate(&Parents::new("Release Image"), &ctx).await.unwrap();
        assert_eq!(image.pull_spec, "quay.io/test/release:1");
    }

    #[tokio::test]
    async fn empty_pull_spec_is_missing_input() {
        let ctx = GenerateContext::new(
            Services::new().with::<Arc<dyn ReleaseResolver>>(Arc::new(StaticReleaseResolver::new(""))),
        );
        let err = ReleaseImage::default()
            .generate(&Parents::new("Release Image"), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::MissingInput(_)));
    }

    #[tokio::test]
    async fn env_resolver_falls_back_to_default() {
        let resolver = EnvReleaseResolver {
            default: "quay.io/default:1".to_string(),
        };
        if std::env::var(RELEASE_IMAGE_OVERRIDE_ENV).is_err() {
            assert_eq!(resolver.resolve().await.unwrap(), "quay.io/default:1");
        }
    }
}
