//! Named targets, the asset registry and default collaborators

use std::sync::Arc;

use forge_asset::{Asset, AssetKey, Registry, Services};

use crate::cluster_id::ClusterId;
use crate::ignition::aio::AllInOneConfig;
use crate::ignition::bootstrap_in_place::SingleNodeBootstrapConfig;
use crate::installconfig::InstallConfig;
use crate::metadata::Metadata;
use crate::password::KubeadminPassword;
use crate::release::{EnvReleaseResolver, ReleaseImage, ReleaseResolver, StaticReleaseResolver};
use crate::tls::{
    CertIssuer, EtcdCaBundle, EtcdMetricCaBundle, EtcdMetricSignerCertKey,
    EtcdMetricSignerClientCertKey, EtcdSignerCertKey, EtcdSignerClientCertKey, RcgenIssuer,
};
use crate::types::InstallInputs;

/// `install-config.yaml`
pub const INSTALL_CONFIG: &[AssetKey] = &[InstallConfig::KEY];

/// All-in-one boot config plus the cluster metadata and admin password
pub const ALL_IN_ONE_CONFIG: &[AssetKey] = &[
    AllInOneConfig::KEY,
    Metadata::KEY,
    KubeadminPassword::KEY,
];

/// Single-node bootstrap-in-place boot config plus the cluster metadata
pub const SINGLE_NODE_IGNITION_CONFIG: &[AssetKey] = &[
    SingleNodeBootstrapConfig::KEY,
    Metadata::KEY,
    KubeadminPassword::KEY,
];

/// Registry of every cluster asset
#[must_use]
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_writable::<InstallConfig>()
        .register::<ReleaseImage>()
        .register::<ClusterId>()
        .register_writable::<EtcdSignerCertKey>()
        .register_writable::<EtcdSignerClientCertKey>()
        .register_writable::<EtcdMetricSignerCertKey>()
        .register_writable::<EtcdMetricSignerClientCertKey>()
        .register_writable::<EtcdCaBundle>()
        .register_writable::<EtcdMetricCaBundle>()
        .register_writable::<Metadata>()
        .register_writable::<KubeadminPassword>()
        .register_writable::<AllInOneConfig>()
        .register_writable::<SingleNodeBootstrapConfig>();
    registry
}

/// Production collaborators
///
/// `release_override` pins the release image; otherwise the environment
/// override or the built-in default applies.
#[must_use]
pub fn default_services(inputs: Option<InstallInputs>, release_override: Option<String>) -> Services {
    let resolver: Arc<dyn ReleaseResolver> = match release_override {
        Some(pull_spec) => Arc::new(StaticReleaseResolver::new(pull_spec)),
        None => Arc::new(EnvReleaseResolver::default()),
    };
    let mut services = Services::new()
        .with(resolver)
        .with::<Arc<dyn CertIssuer>>(Arc::new(RcgenIssuer));
    if let Some(inputs) = inputs {
        services.insert(inputs);
    }
    services
}
