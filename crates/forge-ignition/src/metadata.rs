//! Cluster metadata (`metadata.json`)

use forge_asset::{
    async_trait, Asset, AssetFile, AssetKey, FileFetcher, GenerateContext, GenerateError,
    LoadError, Parents, WritableAsset,
};
use serde::{Deserialize, Serialize};

use crate::cluster_id::ClusterId;
use crate::installconfig::InstallConfig;

/// Emitted file name
pub const METADATA_FILENAME: &str = "metadata.json";

/// Contents of `metadata.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetadata {
    /// Cluster name
    pub cluster_name: String,
    /// Cluster UUID
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    /// Infrastructure id
    #[serde(rename = "infraID")]
    pub infra_id: String,
    /// Platform name
    pub platform: String,
}

/// Metadata consumed when tearing the cluster down
///
/// Read-only: regenerated from state, never loaded from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document
    pub metadata: ClusterMetadata,
    /// Emitted file
    pub file: Option<AssetFile>,
}

#[async_trait]
impl Asset for Metadata {
    const KEY: AssetKey = AssetKey::new("cluster.Metadata");

    fn name(&self) -> &'static str {
        "Metadata"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![ClusterId::KEY, InstallConfig::KEY]
    }

    async fn generate(&mut self, parents: &Parents, _: &GenerateContext) -> Result<(), GenerateError> {
        let id = parents.get::<ClusterId>()?;
        let install_config = &parents.get::<InstallConfig>()?.config;

        let metadata = ClusterMetadata {
            cluster_name: install_config.metadata.name.clone(),
            cluster_id: id.uuid.clone(),
            infra_id: id.infra_id.clone(),
            platform: install_config.platform.name().to_string(),
        };
        let data = serde_json::to_vec(&metadata).map_err(|e| GenerateError::Encode {
            what: METADATA_FILENAME.to_string(),
            source: Box::new(e),
        })?;
        self.file = Some(AssetFile::new(METADATA_FILENAME, data));
        self.metadata = metadata;
        Ok(())
    }
}

impl WritableAsset for Metadata {
    fn files(&self) -> Vec<AssetFile> {
        self.file.iter().cloned().collect()
    }

    fn load(&mut self, _: &dyn FileFetcher) -> Result<bool, LoadError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_asset::MemoryFetcher;

    #[test]
    fn uses_go_style_field_names() {
        let json = serde_json::to_value(ClusterMetadata {
            cluster_name: "sno".to_string(),
            cluster_id: "id".to_string(),
            infra_id: "sno-abcde".to_string(),
            platform: "none".to_string(),
        })
        .unwrap();
        assert_eq!(json["clusterName"], "sno");
        assert_eq!(json["clusterID"], "id");
        assert_eq!(json["infraID"], "sno-abcde");
    }

    #[test]
    fn never_loads() {
        let fetcher = MemoryFetcher::new().with_file(METADATA_FILENAME, "{}");
        assert!(!Metadata::default().load(&fetcher).unwrap());
    }
}
