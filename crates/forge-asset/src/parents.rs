//! Resolved dependencies handed to `generate`

use std::collections::HashMap;
use std::sync::Arc;

use crate::asset::{Asset, DynAsset};
use crate::error::GenerateError;
use crate::key::AssetKey;

/// Lookup-by-type view over an asset's resolved dependencies
///
/// Only the assets declared in `dependencies()` are present. Asking for
/// anything else is a programming error and fails loudly with
/// [`GenerateError::UndeclaredDependency`].
#[derive(Debug, Default)]
pub struct Parents {
    owner: &'static str,
    assets: HashMap<AssetKey, Arc<dyn DynAsset>>,
}

impl Parents {
    /// Empty set of parents for the named asset
    #[must_use]
    pub fn new(owner: &'static str) -> Self {
        Self {
            owner,
            assets: HashMap::new(),
        }
    }

    /// Add a resolved parent
    pub fn insert(&mut self, asset: Arc<dyn DynAsset>) {
        self.assets.insert(asset.key(), asset);
    }

    /// Borrow the resolved parent of type `T`
    ///
    /// # Errors
    /// Returns [`GenerateError::UndeclaredDependency`] if `T` is not a
    /// declared dependency of the owning asset.
    pub fn get<T: Asset>(&self) -> Result<&T, GenerateError> {
        self.assets
            .get(&T::KEY)
            .and_then(|asset| asset.downcast_ref::<T>())
            .ok_or(GenerateError::UndeclaredDependency {
                asset: self.owner,
                requested: T::KEY,
            })
    }

    /// Keys of all resolved parents
    pub fn keys(&self) -> impl Iterator<Item = AssetKey> + '_ {
        self.assets.keys().copied()
    }

    /// Number of resolved parents
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether there are no parents
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl Extend<Arc<dyn DynAsset>> for Parents {
    fn extend<I: IntoIterator<Item = Arc<dyn DynAsset>>>(&mut self, iter: I) {
        for asset in iter {
            self.insert(asset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Erased;
    use crate::context::GenerateContext;
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Domain {
        value: String,
    }

    #[async_trait]
    impl Asset for Domain {
        const KEY: AssetKey = AssetKey::new("test.Domain");

        fn name(&self) -> &'static str {
            "Domain"
        }

        async fn generate(&mut self, _: &Parents, _: &GenerateContext) -> Result<(), GenerateError> {
            Ok(())
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Undeclared;

    #[async_trait]
    impl Asset for Undeclared {
        const KEY: AssetKey = AssetKey::new("test.Undeclared");

        fn name(&self) -> &'static str {
            "Undeclared"
        }

        async fn generate(&mut self, _: &Parents, _: &GenerateContext) -> Result<(), GenerateError> {
            Ok(())
        }
    }

    #[test]
    fn get_declared_parent() {
        let mut parents = Parents::new("Consumer");
        parents.insert(Arc::new(Erased::<Domain>::plain()));
        assert!(parents.get::<Domain>().is_ok());
        assert_eq!(parents.len(), 1);
        assert_eq!(parents.keys().collect::<Vec<_>>(), vec![Domain::KEY]);
    }

    #[test]
    fn get_undeclared_parent_fails_loudly() {
        let parents = Parents::new("Consumer");
        let err = parents.get::<Undeclared>().unwrap_err();
        match err {
            GenerateError::UndeclaredDependency { asset, requested } => {
                assert_eq!(asset, "Consumer");
                assert_eq!(requested, Undeclared::KEY);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
