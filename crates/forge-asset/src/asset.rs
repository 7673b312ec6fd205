//! Asset traits and type erasure
//!
//! [`Asset`] is the typed contract implemented by every asset type.
//! [`WritableAsset`] refines it with emitted files and loading from disk.
//! [`DynAsset`] is the object-safe view the store works with; concrete types
//! are erased when they are registered (see [`crate::Registry`]).

use std::any::Any;
use std::fmt::{self, Debug};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::context::GenerateContext;
use crate::error::{GenerateError, LoadError};
use crate::fetcher::FileFetcher;
use crate::key::AssetKey;
use crate::parents::Parents;

/// A file emitted by a writable asset
///
/// `filename` is relative to the target directory. `data` is serialized as
/// base64 so the state file stays a plain JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFile {
    /// Relative file name (`tls/etcd-signer.crt`)
    pub filename: String,
    /// File contents
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl AssetFile {
    /// Create file from name and bytes
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Contents as UTF-8, if valid
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Typed asset contract
///
/// Implement this for every unit of generated configuration. The exported
/// (serialized) fields are the asset's state: they are what the store writes
/// to the state file and compares on reload.
///
/// # Contract
/// - `KEY` is unique and stable
/// - `dependencies` lists every asset `generate` reads through [`Parents`]
/// - `generate` depends only on its parents and on services reachable
///   through [`GenerateContext`]; running it twice on equal inputs yields
///   equal assets
/// - `generate` never resolves further assets itself
///
/// # Example
/// ```rust,ignore
/// #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// pub struct ReleaseImage { pub pull_spec: String }
///
/// #[async_trait]
/// impl Asset for ReleaseImage {
///     const KEY: AssetKey = AssetKey::new("releaseimage.Image");
///
///     fn name(&self) -> &'static str { "Release Image" }
///
///     async fn generate(&mut self, _: &Parents, ctx: &GenerateContext) -> Result<(), GenerateError> {
///         self.pull_spec = ctx.service::<Arc<dyn ReleaseResolver>>()?.resolve().await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Asset:
    Debug + Default + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Static identity, used as cache and state-file key
    const KEY: AssetKey;

    /// Human readable name used in errors and logs
    fn name(&self) -> &'static str;

    /// Assets that must be resolved before `generate` runs
    fn dependencies(&self) -> Vec<AssetKey> {
        Vec::new()
    }

    /// Compute this asset from its resolved parents
    ///
    /// # Errors
    /// Returns [`GenerateError::Validation`] when inputs violate a
    /// precondition, or another variant when a collaborator fails.
    async fn generate(
        &mut self,
        parents: &Parents,
        ctx: &GenerateContext,
    ) -> Result<(), GenerateError>;
}

/// Asset that emits files and can be reconstructed from them
pub trait WritableAsset: Asset {
    /// Files to write, in order; empty when nothing is written
    fn files(&self) -> Vec<AssetFile>;

    /// Reconstruct the asset from previously emitted files
    ///
    /// Returns `Ok(false)` when the files are absent. Read-only assets always
    /// return `Ok(false)`.
    ///
    /// # Errors
    /// Returns [`LoadError`] when a file exists but cannot be read or parsed.
    fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, LoadError>;
}

/// Object-safe view of an asset
///
/// Produced by [`crate::Registry`]; the store resolves, caches and persists
/// assets exclusively through this trait.
#[async_trait]
pub trait DynAsset: Debug + Send + Sync {
    /// Static identity
    fn key(&self) -> AssetKey;

    /// Human readable name
    fn name(&self) -> &'static str;

    /// Declared prerequisites
    fn dependencies(&self) -> Vec<AssetKey>;

    /// See [`Asset::generate`]
    async fn generate(
        &mut self,
        parents: &Parents,
        ctx: &GenerateContext,
    ) -> Result<(), GenerateError>;

    /// Whether the asset was registered as writable
    fn is_writable(&self) -> bool;

    /// Emitted files; empty for non-writable assets
    fn files(&self) -> Vec<AssetFile>;

    /// See [`WritableAsset::load`]; `Ok(false)` for non-writable assets
    fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, LoadError>;

    /// Exported fields as JSON
    fn to_state(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Replace exported fields from JSON
    fn restore(&mut self, state: serde_json::Value) -> Result<(), serde_json::Error>;

    /// Field-level equality with another erased asset of the same type
    fn same_as(&self, other: &dyn DynAsset) -> bool;

    /// Concrete asset as `Any`
    fn as_any(&self) -> &dyn Any;
}

impl dyn DynAsset {
    /// Borrow the concrete asset
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Asset>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// File operations captured at registration for writable assets
struct PersistOps<T> {
    files: fn(&T) -> Vec<AssetFile>,
    load: fn(&mut T, &dyn FileFetcher) -> Result<bool, LoadError>,
}

impl<T> Clone for PersistOps<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PersistOps<T> {}

/// Erased wrapper pairing an asset with its optional file operations
pub(crate) struct Erased<T: Asset> {
    inner: T,
    persist: Option<PersistOps<T>>,
}

impl<T: Asset> Erased<T> {
    pub(crate) fn plain() -> Self {
        Self {
            inner: T::default(),
            persist: None,
        }
    }
}

impl<T: WritableAsset> Erased<T> {
    pub(crate) fn writable() -> Self {
        Self {
            inner: T::default(),
            persist: Some(PersistOps {
                files: <T as WritableAsset>::files,
                load: <T as WritableAsset>::load,
            }),
        }
    }
}

impl<T: Asset> Debug for Erased<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

#[async_trait]
impl<T: Asset> DynAsset for Erased<T> {
    fn key(&self) -> AssetKey {
        T::KEY
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn dependencies(&self) -> Vec<AssetKey> {
        self.inner.dependencies()
    }

    async fn generate(
        &mut self,
        parents: &Parents,
        ctx: &GenerateContext,
    ) -> Result<(), GenerateError> {
        self.inner.generate(parents, ctx).await
    }

    fn is_writable(&self) -> bool {
        self.persist.is_some()
    }

    fn files(&self) -> Vec<AssetFile> {
        self.persist
            .map(|ops| (ops.files)(&self.inner))
            .unwrap_or_default()
    }

    fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, LoadError> {
        match self.persist {
            Some(ops) => (ops.load)(&mut self.inner, fetcher),
            None => Ok(false),
        }
    }

    fn to_state(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.inner)
    }

    fn restore(&mut self, state: serde_json::Value) -> Result<(), serde_json::Error> {
        self.inner = serde_json::from_value(state)?;
        Ok(())
    }

    fn same_as(&self, other: &dyn DynAsset) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| *other == self.inner)
    }

    fn as_any(&self) -> &dyn Any {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::MemoryFetcher;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Greeting {
        text: String,
    }

    #[async_trait]
    impl Asset for Greeting {
        const KEY: AssetKey = AssetKey::new("test.Greeting");

        fn name(&self) -> &'static str {
            "Greeting"
        }

        async fn generate(&mut self, _: &Parents, _: &GenerateContext) -> Result<(), GenerateError> {
            self.text = "hello".to_string();
            Ok(())
        }
    }

    impl WritableAsset for Greeting {
        fn files(&self) -> Vec<AssetFile> {
            vec![AssetFile::new("greeting.txt", self.text.clone())]
        }

        fn load(&mut self, fetcher: &dyn FileFetcher) -> Result<bool, LoadError> {
            let Some(file) = fetcher.fetch_by_name("greeting.txt")? else {
                return Ok(false);
            };
            self.text = String::from_utf8(file.data).map_err(|e| LoadError::parse("greeting.txt", e))?;
            Ok(true)
        }
    }

    #[test]
    fn asset_file_serializes_data_as_base64() {
        let file = AssetFile::new("a.txt", "hi");
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["data"], "aGk=");
        let back: AssetFile = serde_json::from_value(json).unwrap();
        assert_eq!(back, file);
    }

    #[tokio::test]
    async fn erased_generate_and_state() {
        let mut erased: Box<dyn DynAsset> = Box::new(Erased::<Greeting>::plain());
        erased
            .generate(&Parents::new("Greeting"), &GenerateContext::default())
            .await
            .unwrap();

        let state = erased.to_state().unwrap();
        assert_eq!(state, serde_json::json!({"text": "hello"}));

        let mut restored: Box<dyn DynAsset> = Box::new(Erased::<Greeting>::plain());
        restored.restore(state).unwrap();
        assert!(restored.same_as(erased.as_ref()));
        assert_eq!(restored.downcast_ref::<Greeting>().unwrap().text, "hello");
    }

    #[test]
    fn plain_assets_have_no_files() {
        let mut erased = Erased::<Greeting>::plain();
        assert!(!erased.is_writable());
        assert!(erased.files().is_empty());
        let fetcher = MemoryFetcher::new().with_file("greeting.txt", "ignored");
        assert!(!erased.load(&fetcher).unwrap());
    }

    #[test]
    fn writable_assets_load_through_fetcher() {
        let mut erased = Erased::<Greeting>::writable();
        assert!(erased.is_writable());
        let fetcher = MemoryFetcher::new().with_file("greeting.txt", "from disk");
        assert!(erased.load(&fetcher).unwrap());
        assert_eq!(erased.files(), vec![AssetFile::new("greeting.txt", "from disk")]);
    }

    #[test]
    fn restore_rejects_malformed_state() {
        let mut erased = Erased::<Greeting>::plain();
        assert!(erased.restore(serde_json::json!({"text": 42})).is_err());
    }
}
