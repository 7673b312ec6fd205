//! Universe of known asset types
//!
//! The registry maps every [`AssetKey`] to a descriptor that knows how to
//! instantiate a fresh, type-erased asset. Stores never see concrete types.

use std::collections::BTreeMap;

use tracing::warn;

use crate::asset::{Asset, DynAsset, Erased, WritableAsset};
use crate::key::AssetKey;

/// How to build one registered asset type
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    key: AssetKey,
    writable: bool,
    instantiate: fn() -> Box<dyn DynAsset>,
}

impl Descriptor {
    /// Registered key
    #[inline]
    #[must_use]
    pub fn key(&self) -> AssetKey {
        self.key
    }

    /// Whether the asset emits files
    #[inline]
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Fresh default instance
    #[must_use]
    pub fn instantiate(&self) -> Box<dyn DynAsset> {
        (self.instantiate)()
    }
}

fn plain<T: Asset>() -> Box<dyn DynAsset> {
    Box::new(Erased::<T>::plain())
}

fn writable<T: WritableAsset>() -> Box<dyn DynAsset> {
    Box::new(Erased::<T>::writable())
}

/// Known asset types, keyed by [`AssetKey`]
#[derive(Debug, Clone, Default)]
pub struct Registry {
    descriptors: BTreeMap<AssetKey, Descriptor>,
}

impl Registry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset type that keeps state only
    pub fn register<T: Asset>(&mut self) -> &mut Self {
        self.insert(Descriptor {
            key: T::KEY,
            writable: false,
            instantiate: plain::<T>,
        })
    }

    /// Register an asset type that emits files
    pub fn register_writable<T: WritableAsset>(&mut self) -> &mut Self {
        self.insert(Descriptor {
            key: T::KEY,
            writable: true,
            instantiate: writable::<T>,
        })
    }

    fn insert(&mut self, descriptor: Descriptor) -> &mut Self {
        if self.descriptors.insert(descriptor.key, descriptor).is_some() {
            warn!(key = %descriptor.key, "asset registered twice; keeping the last registration");
        }
        self
    }

    /// Descriptor for a key
    #[must_use]
    pub fn get(&self, key: &AssetKey) -> Option<&Descriptor> {
        self.descriptors.get(key)
    }

    /// Whether a key is registered
    #[must_use]
    pub fn contains(&self, key: &AssetKey) -> bool {
        self.descriptors.contains_key(key)
    }

    /// All registered keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = AssetKey> + '_ {
        self.descriptors.keys().copied()
    }

    /// Declared dependencies of a registered asset
    #[must_use]
    pub fn dependencies_of(&self, key: &AssetKey) -> Option<Vec<AssetKey>> {
        self.get(key).map(|d| d.instantiate().dependencies())
    }

    /// Number of registered asset types
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetFile;
    use crate::context::GenerateContext;
    use crate::error::{GenerateError, LoadError};
    use crate::fetcher::FileFetcher;
    use crate::parents::Parents;
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Base;

    #[async_trait]
    impl Asset for Base {
        const KEY: AssetKey = AssetKey::new("test.Base");

        fn name(&self) -> &'static str {
            "Base"
        }

        async fn generate(&mut self, _: &Parents, _: &GenerateContext) -> Result<(), GenerateError> {
            Ok(())
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Output;

    #[async_trait]
    impl Asset for Output {
        const KEY: AssetKey = AssetKey::new("test.Output");

        fn name(&self) -> &'static str {
            "Output"
        }

        fn dependencies(&self) -> Vec<AssetKey> {
            vec![Base::KEY]
        }

        async fn generate(&mut self, _: &Parents, _: &GenerateContext) -> Result<(), GenerateError> {
            Ok(())
        }
    }

    impl WritableAsset for Output {
        fn files(&self) -> Vec<AssetFile> {
            vec![AssetFile::new("output", "")]
        }

        fn load(&mut self, _: &dyn FileFetcher) -> Result<bool, LoadError> {
            Ok(false)
        }
    }

    #[test]
    fn registry_instantiates_by_key() {
        let mut registry = Registry::new();
        registry.register::<Base>().register_writable::<Output>();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&Base::KEY));
        assert!(!registry.get(&Base::KEY).unwrap().is_writable());
        assert!(registry.get(&Output::KEY).unwrap().is_writable());

        let instance = registry.get(&Output::KEY).unwrap().instantiate();
        assert_eq!(instance.key(), Output::KEY);
        assert_eq!(instance.files().len(), 1);
    }

    #[test]
    fn registry_reports_dependencies() {
        let mut registry = Registry::new();
        registry.register::<Base>().register_writable::<Output>();
        assert_eq!(registry.dependencies_of(&Output::KEY), Some(vec![Base::KEY]));
        assert_eq!(registry.dependencies_of(&Base::KEY), Some(vec![]));
        assert_eq!(registry.dependencies_of(&AssetKey::new("test.Missing")), None);
    }

    #[test]
    fn duplicate_registration_keeps_last() {
        let mut registry = Registry::new();
        registry.register::<Output>().register_writable::<Output>();
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&Output::KEY).unwrap().is_writable());
    }
}
