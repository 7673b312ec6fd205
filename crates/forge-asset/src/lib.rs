//! # Forge Asset
//!
//! The asset contract: typed, persistable units of generated cluster
//! configuration and the type erasure the store resolves them through.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use forge_asset::{Asset, AssetKey, GenerateContext, GenerateError, Parents, Registry};
//!
//! let mut registry = Registry::new();
//! registry.register::<ReleaseImage>().register_writable::<InstallConfig>();
//! ```
//!
//! ## Architecture
//!
//! - [`AssetKey`]: static identity, replaces runtime type reflection
//! - [`Asset`] / [`WritableAsset`]: the typed contract
//! - [`DynAsset`]: object-safe view produced by [`Registry`]
//! - [`Parents`] / [`GenerateContext`]: everything `generate` may read
//! - [`FileFetcher`]: read access to previously emitted files

pub mod asset;
pub mod context;
pub mod error;
pub mod fetcher;
pub mod key;
pub mod parents;
pub mod persist;
pub mod registry;

pub use asset::{Asset, AssetFile, DynAsset, WritableAsset};
pub use context::{GenerateContext, Services};
pub use error::{BoxError, GenerateError, LoadError, PersistError, ValidationError};
pub use fetcher::{DiskFetcher, FileFetcher, MemoryFetcher};
pub use key::{display_path, AssetKey};
pub use parents::Parents;
pub use persist::{delete_from_disk, persist_to_file};
pub use registry::{Descriptor, Registry};

/// Re-exported so asset crates implement [`Asset`] with the same macro
pub use async_trait::async_trait;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
