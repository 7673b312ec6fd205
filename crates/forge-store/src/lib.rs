//! # Forge Store
//!
//! Resolves assets against a [`Registry`](forge_asset::Registry), memoises
//! them per store and round-trips their state through a JSON state file so
//! that a later run resumes without redoing work.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use forge_store::{Store, StoreConfig};
//!
//! let store = Store::open("cluster", Arc::new(registry), services, StoreConfig::default())?;
//! let config = store.fetch::<AllInOneConfig>().await?;
//! store.persist(&[AllInOneConfig::KEY]).await?;
//! ```

pub mod config;
pub mod error;
pub mod plan;
pub mod state;
pub mod store;

pub use config::{ResolveMode, StoreConfig, DEFAULT_STATE_FILE};
pub use error::{StateError, StoreError};
pub use plan::ResolutionPlan;
pub use state::StateFile;
pub use store::{AssetSource, AssetState, Provenance, Store};
