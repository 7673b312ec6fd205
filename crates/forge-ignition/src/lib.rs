//! # Forge Ignition
//!
//! Cluster assets for single-node bring-up: the install config, release
//! image, etcd TLS material, cluster identity and the two Ignition configs
//! a single node boots from.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use forge_ignition::{default_services, registry, AllInOneConfig};
//! use forge_store::{Store, StoreConfig};
//!
//! let services = default_services(Some(inputs), None);
//! let store = Store::open("cluster", Arc::new(registry()), services, StoreConfig::default())?;
//! let aio = store.fetch::<AllInOneConfig>().await?;
//! ```
//!
//! ## Dependency graph
//!
//! ```text
//! AllInOneConfig ──> InstallConfig
//!               ├──> ReleaseImage
//!               └──> etcd signers, client certs, CA bundles
//! SingleNodeBootstrapConfig ──> InstallConfig, ReleaseImage, EtcdCaBundle
//! Metadata ──> ClusterId ──> InstallConfig
//! ```

pub mod cluster_id;
pub mod ignition;
pub mod installconfig;
pub mod metadata;
pub mod password;
pub mod release;
pub mod targets;
pub mod tls;
pub mod topology;
pub mod types;

pub use cluster_id::ClusterId;
pub use ignition::aio::AllInOneConfig;
pub use ignition::bootstrap_in_place::SingleNodeBootstrapConfig;
pub use ignition::IgnitionConfig;
pub use installconfig::InstallConfig;
pub use metadata::Metadata;
pub use password::KubeadminPassword;
pub use release::{
    EnvReleaseResolver, ReleaseImage, ReleaseResolver, StaticReleaseResolver,
    RELEASE_IMAGE_OVERRIDE_ENV,
};
pub use targets::{
    default_services, registry, ALL_IN_ONE_CONFIG, INSTALL_CONFIG, SINGLE_NODE_IGNITION_CONFIG,
};
pub use tls::{CertIssuer, CertKey, IssueError, RcgenIssuer};
pub use topology::{verify_all_in_one, verify_bootstrap_in_place};
pub use types::{InstallConfigSpec, InstallInputs};
