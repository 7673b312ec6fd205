//! All-in-one Ignition config (`aio.ign`)

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
use crate::tls::{
    EtcdCaBundle, EtcdMetricCaBundle, EtcdMetricSignerCertKey, EtcdMetricSignerClientCertKey,
    EtcdSignerCertKey, EtcdSignerClientCertKey,
};
use crate::topology::verify_all_in_one;

/// Emitted file name
pub const AIO_IGNITION_FILENAME: &str = "aio.ign";

/// Units enabled on first boot
pub const ENABLED_UNITS: &[&str] = &["kubelet.service", "aiokube.service"];

/// Host directory TLS material is copied into
const ASSET_ROOT: &str = "/opt/openshift";

const FILES: &[FileTemplate] = &[
    FileTemplate {
        path: "/usr/local/bin/aiokube.sh",
        mode: 0o755,
        source: include_str!("../../data/aio/files/aiokube.sh"),
    },
    FileTemplate {
        path: "/etc/kubernetes/kubelet.conf",
        mode: 0o644,
        source: include_str!("../../data/aio/files/kubelet.conf"),
    },
    FileTemplate {
        path: "/var/lib/kubelet/config.json",
        mode: 0o600,
        source: include_str!("../../data/aio/files/pull-secret.json"),
    },
];

const UNITS: &[UnitTemplate] = &[
    UnitTemplate {
        name: "kubelet.service",
        source: include_str!("../../data/aio/units/kubelet.service"),
    },
    UnitTemplate {
        name: "aiokube.service",
        source: include_str!("../../data/aio/units/aiokube.service"),
    },
    UnitTemplate {
        name: "aio-cleanup.service",
        source: include_str!("../../data/aio/units/aio-cleanup.service"),
    },
];

#[derive(Serialize)]
struct TemplateData<'a> {
    cluster_name: &'a str,
    base_domain: &'a str,
    cluster_domain: String,
    pull_secret: &'a str,
    release_image: &'a str,
}

/// Ignition config for a node that runs the whole cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllInOneConfig {
    /// Ignition document
    pub config: Option<IgnitionConfig>,
    /// Emitted file
    pub file: Option<AssetFile>,
}

#[async_trait]
impl Asset for AllInOneConfig {
    const KEY: AssetKey = AssetKey::new("ignition.AllInOne");

    fn name(&self) -> &'static str {
        "All-in-one Ignition Config"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![
            InstallConfig::KEY,
            EtcdCaBundle::KEY,
            EtcdMetricCaBundle::KEY,
            EtcdMetricSignerCertKey::KEY,
            EtcdMetricSignerClientCertKey::KEY,
            EtcdSignerCertKey::KEY,
            EtcdSignerClientCertKey::KEY,
            ReleaseImage::KEY,
        ]
    }

    async fn generate(&mut self, parents: &Parents, _: &GenerateContext) -> Result<(), GenerateError> {
        let install_config = &parents.get::<InstallConfig>()?.config;
        let release = parents.get::<ReleaseImage>()?;
        verify_all_in_one(install_config)?;

        let data = TemplateData {
            cluster_name: &install_config.metadata.name,
            base_domain: &install_config.base_domain,
            cluster_domain: install_config.cluster_domain(),
            pull_secret: &install_config.pull_secret,
            release_image: &release.pull_spec,
        };

        let renderer = Renderer::new();
        let mut config = IgnitionConfig::default();
        add_storage_files(&mut config, &renderer, FILES, &data)?;
        add_systemd_units(&mut config, &renderer, UNITS, &data, ENABLED_UNITS)?;

        let tls = [
            parents.get::<EtcdCaBundle>()?.files(),
            parents.get::<EtcdMetricCaBundle>()?.files(),
            parents.get::<EtcdMetricSignerCertKey>()?.files(),
            parents.get::<EtcdMetricSignerClientCertKey>()?.files(),
            parents.get::<EtcdSignerCertKey>()?.files(),
            parents.get::<EtcdSignerClientCertKey>()?.files(),
        ];
        for files in &tls {
            add_asset_files(&mut config, ASSET_ROOT, files);
        }

        config.add_ssh_key("core", &install_config.ssh_key);

        let file = encode(&config, AIO_IGNITION_FILENAME)?;
        info!(
            files = config.storage.files.len(),
            units = config.systemd.units.len(),
            "generated all-in-one ignition config"
        );
        self.config = Some(config);
        self.file = Some(file);
        Ok(())
    }
}

impl WritableAsset for AllInOneConfig {
    fn files(&self) -> Vec<AssetFile> {
        self.file.iter().cloned().collect()
    }

    fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, LoadError> {
        let Some(file) = fetcher.fetch_by_name(AIO_IGNITION_FILENAME)? else {
            return Ok(false);
        };
        self.config = Some(decode(&file)?);
        self.file = Some(file);
        Ok(true)
    }
}
