//! Single-node bootstrap-in-place Ignition config
//!
//! Boots a live ISO that brings up the control plane, then installs itself
//! to the configured disk.

use forge_asset::{
    async_trait, Asset, AssetFile, AssetKey, FileFetcher, GenerateContext, GenerateError,
    LoadError, Parents, WritableAsset,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    add_asset_files, add_storage_files, add_systemd_units, decode, encode, FileTemplate,
    IgnitionConfig, Renderer, UnitTemplate,
};
use crate::installconfig::InstallConfig;
use crate::release::ReleaseImage;
use crate::tls::EtcdCaBundle;
use crate::topology::verify_bootstrap_in_place;

/// Emitted file name
pub const SINGLE_NODE_IGNITION_FILENAME: &str = "bootstrap-in-place-for-live-iso.ign";

/// Units enabled on first boot
pub const ENABLED_UNITS: &[&str] = &["bootkube.service", "kubelet.service", "install-to-disk.service"];

const FILES: &[FileTemplate] = &[
    FileTemplate {
        path: "/usr/local/bin/bootkube.sh",
        mode: 0o755,
        source: include_str!("../../data/bootstrap-in-place/files/bootkube.sh"),
    },
    FileTemplate {
        path: "/usr/local/bin/install-to-disk.sh",
        mode: 0o755,
        source: include_str!("../../data/bootstrap-in-place/files/install-to-disk.sh"),
    },
    FileTemplate {
        path: "/root/.docker/config.json",
        mode: 0o600,
        source: include_str!("../../data/bootstrap-in-place/files/pull-secret.json"),
    },
];

const UNITS: &[UnitTemplate] = &[
    UnitTemplate {
        name: "bootkube.service",
        source: include_str!("../../data/bootstrap-in-place/units/bootkube.service"),
    },
    UnitTemplate {
        name: "kubelet.service",
        source: include_str!("../../data/bootstrap-in-place/units/kubelet.service"),
    },
    UnitTemplate {
        name: "install-to-disk.service",
        source: include_str!("../../data/bootstrap-in-place/units/install-to-disk.service"),
    },
];

#[derive(Serialize)]
struct TemplateData<'a> {
    cluster_name: &'a str,
    base_domain: &'a str,
    cluster_domain: String,
    pull_secret: &'a str,
    release_image: &'a str,
    installation_disk: &'a str,
}

/// Ignition config for the single-node live ISO
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SingleNodeBootstrapConfig {
    /// Ignition document
    pub config: Option<IgnitionConfig>,
    /// Emitted file
    pub file: Option<AssetFile>,
}

#[async_trait]
impl Asset for SingleNodeBootstrapConfig {
    const KEY: AssetKey = AssetKey::new("bootstrap.SingleNodeBootstrapInPlace");

    fn name(&self) -> &'static str {
        "Single node bootstrap-in-place ignition config"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![InstallConfig::KEY, ReleaseImage::KEY, EtcdCaBundle::KEY]
    }

    async fn generate(&mut self, parents: &Parents, _: &GenerateContext) -> Result<(), GenerateError> {
        let install_config = &parents.get::<InstallConfig>()?.config;
        verify_bootstrap_in_place(install_config)?;
        let release = parents.get::<ReleaseImage>()?;

        // verified above
        let installation_disk = install_config
            .bootstrap_in_place
            .as_ref()
            .map_or("", |b| b.installation_disk.as_str());

        let data = TemplateData {
            cluster_name: &install_config.metadata.name,
            base_domain: &install_config.base_domain,
            cluster_domain: install_config.cluster_domain(),
            pull_secret: &install_config.pull_secret,
            release_image: &release.pull_spec,
            installation_disk,
        };

        let renderer = Renderer::new();
        let mut config = IgnitionConfig::default();
        add_storage_files(&mut config, &renderer, FILES, &data)?;
        add_systemd_units(&mut config, &renderer, UNITS, &data, ENABLED_UNITS)?;
        add_asset_files(&mut config, "/opt/openshift", &parents.get::<EtcdCaBundle>()?.files());
        config.add_ssh_key("core", &install_config.ssh_key);

        let file = encode(&config, SINGLE_NODE_IGNITION_FILENAME)?;
        info!(disk = installation_disk, "generated single node ignition config");
        self.config = Some(config);
        self.file = Some(file);
        Ok(())
    }
}

impl WritableAsset for SingleNodeBootstrapConfig {
    fn files(&self) -> Vec<AssetFile> {
        self.file.iter().cloned().collect()
    }

    fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, LoadError> {
        let Some(file) = fetcher.fetch_by_name(SINGLE_NODE_IGNITION_FILENAME)? else {
            return Ok(false);
        };
        self.config = Some(decode(&file)?);
        self.file = Some(file);
        Ok(true)
    }
}
