//! Forge CLI
//!
//! `forge create <target>` resolves a target's asset graph into a working
//! directory, resuming from the state file of a previous run.

pub mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use forge_asset::AssetKey;
use forge_ignition::{
    default_services, registry, ALL_IN_ONE_CONFIG, INSTALL_CONFIG, SINGLE_NODE_IGNITION_CONFIG,
};
use forge_store::{ResolveMode, Store};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use config::{load_install_inputs, ConfigError, ForgeConfig};

/// CLI result type
pub type Result<T> = anyhow::Result<T>;

/// Generate single-node cluster assets
#[derive(Parser, Debug)]
#[command(name = "forge", version, about = "Dependency-resolved cluster asset generator")]
pub struct Cli {
    /// Working directory holding emitted files and the state file
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Path to a `forge.toml` configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Install inputs as YAML; overrides the `[install]` config section
    #[arg(long, global = true)]
    pub inputs: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Resolve independent dependencies concurrently
    #[arg(long, global = true)]
    pub concurrent: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a target and write its files
    Create {
        /// What to generate
        #[arg(value_enum)]
        target: Target,
    },
    /// Print a target's dependency graph in DOT format
    Graph {
        /// Graph root
        #[arg(value_enum)]
        target: Target,
    },
    /// Remove the state file
    DestroyState,
}

/// Named target sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// `install-config.yaml`
    InstallConfig,
    /// All-in-one Ignition config
    AioConfig,
    /// Single-node bootstrap-in-place Ignition config
    SingleNodeIgnitionConfig,
}

impl Target {
    /// Asset keys making up the target
    #[must_use]
    pub fn keys(self) -> &'static [AssetKey] {
        match self {
            Self::InstallConfig => INSTALL_CONFIG,
            Self::AioConfig => ALL_IN_ONE_CONFIG,
            Self::SingleNodeIgnitionConfig => SINGLE_NODE_IGNITION_CONFIG,
        }
    }
}

impl Cli {
    /// Effective configuration: file, then command-line overrides
    ///
    /// # Errors
    /// Fails when a referenced file is unreadable or invalid.
    pub fn forge_config(&self) -> Result<ForgeConfig> {
        let mut config = match &self.config {
            Some(path) => ForgeConfig::load(path)?,
            None => ForgeConfig::default(),
        };
        if let Some(path) = &self.inputs {
            config = config.with_install(load_install_inputs(path)?);
        }
        if self.concurrent {
            config.store = config.store.with_resolve_mode(ResolveMode::Concurrent);
        }
        Ok(config)
    }

    /// Open the store described by the flags and configuration
    ///
    /// # Errors
    /// Fails on configuration errors or an unreadable state file.
    pub fn open_store(&self, cancel: CancellationToken) -> Result<Store> {
        let config = self.forge_config()?;
        let services = default_services(config.install, config.release_image);
        let store = Store::open(&self.dir, Arc::new(registry()), services, config.store)
            .with_context(|| format!("failed to open asset store in {}", self.dir.display()))?;
        Ok(store.with_cancellation(cancel))
    }

    /// Execute the subcommand
    ///
    /// # Errors
    /// Returns the first resolution, persistence or configuration error.
    pub async fn run(self) -> Result<()> {
        let cancel = CancellationToken::new();
        let watcher = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                watcher.cancel();
            }
        });
        self.execute(cancel).await
    }

    /// Execute the subcommand under an explicit cancellation token
    ///
    /// # Errors
    /// See [`Cli::run`].
    pub async fn execute(self, cancel: CancellationToken) -> Result<()> {
        let store = self.open_store(cancel)?;
        match self.command {
            Command::Create { target } => {
                std::fs::create_dir_all(&self.dir)
                    .with_context(|| format!("failed to create {}", self.dir.display()))?;
                let written = store
                    .persist(target.keys())
                    .await
                    .with_context(|| format!("failed to create {target:?}"))?;
                for path in &written {
                    info!(path = %path.display(), "wrote file");
                }
                for row in store.provenance() {
                    info!(asset = row.name, source = %row.source, on_disk = row.present_on_disk, "resolved");
                }
            }
            Command::Graph { target } => {
                let plan = store.plan(target.keys())?;
                println!("{}", plan.to_dot());
            }
            Command::DestroyState => store.destroy_state()?,
        }
        Ok(())
    }
}
