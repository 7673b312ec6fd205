//! Cluster identity

use forge_asset::{async_trait, Asset, AssetKey, GenerateContext, GenerateError, Parents};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::installconfig::InstallConfig;

/// Longest prefix taken from the cluster name
const MAX_BASE_LEN: usize = 21;

/// Random suffix length
const SUFFIX_LEN: usize = 5;

/// Consonants and digits that cannot spell words
const SUFFIX_CHARS: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";

/// Cluster UUID plus the infrastructure id used to name cloud resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterId {
    /// Random cluster UUID
    pub uuid: String,
    /// Cluster name prefix and random suffix, at most 27 characters
    pub infra_id: String,
}

#[async_trait]
impl Asset for ClusterId {
    const KEY: AssetKey = AssetKey::new("installconfig.ClusterID");

    fn name(&self) -> &'static str {
        "Cluster ID"
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        vec![InstallConfig::KEY]
    }

    async fn generate(&mut self, parents: &Parents, _: &GenerateContext) -> Result<(), GenerateError> {
        let install_config = parents.get::<InstallConfig>()?;
        self.uuid = Uuid::new_v4().to_string();
        self.infra_id = infra_id(&install_config.config.metadata.name, &mut rand::rng());
        debug!(infra_id = %self.infra_id, "generated cluster id");
        Ok(())
    }
}

/// Derive an infrastructure id from a cluster name
///
/// Characters other than ASCII alphanumerics and `-` become `-`, runs of
/// `-` collapse, the result is cut to 21 characters with trailing `-`
/// removed, and a random 5 character suffix is appended.
pub fn infra_id(cluster_name: &str, rng: &mut impl Rng) -> String {
    let mut base = String::with_capacity(cluster_name.len());
    for c in cluster_name.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' };
        if c == '-' && base.ends_with('-') {
            continue;
        }
        base.push(c);
    }
    base.truncate(MAX_BASE_LEN);
    let base = base.trim_end_matches('-');

    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(SUFFIX_CHARS[rng.random_range(0..SUFFIX_CHARS.len())]))
        .collect();
    format!("{base}-{suffix}")
}
