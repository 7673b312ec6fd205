//! Generated `kubeadmin` password

use forge_asset::{
    async_trait, Asset, AssetFile, AssetKey, FileFetcher, GenerateContext, GenerateError,
    LoadError, Parents, WritableAsset,
};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Emitted file name
pub const PASSWORD_FILENAME: &str = "auth/kubeadmin-password";

const GROUPS: usize = 4;
const GROUP_LEN: usize = 5;

/// Password for the temporary `kubeadmin` user
///
/// Read-only: never loaded from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KubeadminPassword {
    /// Plain-text password, `xxxxx-xxxxx-xxxxx-xxxxx`
    pub password: String,
    /// Emitted file
    pub file: Option<AssetFile>,
}

#[async_trait]
impl Asset for KubeadminPassword {
    const KEY: AssetKey = AssetKey::new("password.KubeadminPassword");

    fn name(&self) -> &'static str {
        "Kubeadmin Password"
    }

    async fn generate(&mut self, _: &Parents, _: &GenerateContext) -> Result<(), GenerateError> {
        self.password = password(&mut rand::rng());
        self.file = Some(AssetFile::new(PASSWORD_FILENAME, self.password.as_bytes()));
        Ok(())
    }
}

impl WritableAsset for KubeadminPassword {
    fn files(&self) -> Vec<AssetFile> {
        self.file.iter().cloned().collect()
    }

    fn load(&mut self, _: &dyn FileFetcher) -> Result<bool, LoadError> {
        Ok(false)
    }
}

fn password(rng: &mut impl Rng) -> String {
    let groups: Vec<String> = (0..GROUPS)
        .map(|_| {
            (0..GROUP_LEN)
                .map(|_| char::from(rng.sample(Alphanumeric)))
                .collect()
        })
        .collect();
    groups.join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn has_four_groups_of_five() {
        let pw = password(&mut StdRng::seed_from_u64(1));
        let groups: Vec<&str> = pw.split('-').collect();
        assert_eq!(groups.len(), GROUPS);
        assert!(groups
            .iter()
            .all(|g| g.len() == GROUP_LEN && g.chars().all(|c| c.is_ascii_alphanumeric())));
    }

    #[tokio::test]
    async fn writes_password_file() {
        let mut asset = KubeadminPassword::default();
        asset
            .generate(&Parents::new("Kubeadmin Password"), &GenerateContext::default())
            .await
            .unwrap();
        let files = asset.files();
        assert_eq!(files[0].filename, PASSWORD_FILENAME);
        assert_eq!(files[0].as_str(), Some(asset.password.as_str()));
    }
}
