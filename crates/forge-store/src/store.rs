//! Asset store: fetch-or-build with memoisation and resumable state
//!
//! # Resolution
//!
//! `fetch(key)` returns the cached asset if the key was already resolved by
//! this store. Otherwise it tries, in order:
//!
//! 1. the asset's files in the store directory (writable assets only)
//! 2. the entry in the persisted state file
//! 3. generation, after recursively resolving every declared dependency
//!
//! Each key owns an async once-cell, so a concurrent request for a key that
//! is being resolved waits for that resolution. Failed or cancelled
//! resolutions leave the cell empty and can be retried.

use std::collections::HashMap;
use std::fmt::{self, Debug, Display};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use forge_asset::{
    delete_from_disk, persist_to_file, Asset, AssetKey, DiskFetcher, DynAsset, FileFetcher,
    GenerateContext, GenerateError, MemoryFetcher, Parents, Registry, Services,
};
use futures::future::{try_join_all, BoxFuture};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ResolveMode, StoreConfig};
use crate::error::StoreError;
use crate::plan::ResolutionPlan;
use crate::state::StateFile;

/// Where a resolved asset's state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetSource {
    /// Produced by `generate` in this run
    Generated,
    /// Restored from the persisted state file
    StateFile,
    /// Loaded from files in the store directory, differing from state
    OnDisk,
}

impl Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generated => "generated",
            Self::StateFile => "state file",
            Self::OnDisk => "on disk",
        })
    }
}

/// A resolved asset together with its provenance
///
/// Immutable once resolved; shared by every consumer of the key.
#[derive(Debug, Clone)]
pub struct AssetState {
    asset: Arc<dyn DynAsset>,
    source: AssetSource,
    present_on_disk: bool,
}

impl AssetState {
    /// The resolved asset
    #[inline]
    #[must_use]
    pub fn asset(&self) -> &Arc<dyn DynAsset> {
        &self.asset
    }

    /// Borrow the concrete asset
    #[must_use]
    pub fn get<T: Asset>(&self) -> Option<&T> {
        self.asset.downcast_ref::<T>()
    }

    /// Where the state came from
    #[inline]
    #[must_use]
    pub fn source(&self) -> AssetSource {
        self.source
    }

    /// Whether the asset's files were found in the store directory
    #[inline]
    #[must_use]
    pub fn present_on_disk(&self) -> bool {
        self.present_on_disk
    }
}

/// One row of [`Store::provenance`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// Asset key
    pub key: AssetKey,
    /// Asset name
    pub name: &'static str,
    /// Where the state came from
    pub source: AssetSource,
    /// Whether files were found on disk
    pub present_on_disk: bool,
}

type Slot = Arc<OnceCell<Arc<AssetState>>>;

/// Resolver and cache for one working directory
///
/// The store exclusively owns its state file. Share it between tasks behind
/// an `Arc`; all operations take `&self`.
pub struct Store {
    dir: Option<PathBuf>,
    registry: Arc<Registry>,
    fetcher: Box<dyn FileFetcher>,
    state: Mutex<StateFile>,
    slots: Mutex<HashMap<AssetKey, Slot>>,
    ctx: GenerateContext,
    config: StoreConfig,
}

impl Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("dir", &self.dir)
            .field("assets", &self.registry.len())
            .field("resolved", &self.slots.lock().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open a store rooted at `dir`, reading its state file
    ///
    /// # Errors
    /// Returns [`StoreError::State`] when the state file exists but cannot be
    /// read or parsed.
    pub fn open(
        dir: impl Into<PathBuf>,
        registry: Arc<Registry>,
        services: Services,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        let dir = dir.into();
        let state = StateFile::open(dir.join(&config.state_file_name))?;
        debug!(dir = %dir.display(), entries = state.len(), "opened asset store");
        Ok(Self {
            fetcher: Box::new(DiskFetcher::new(&dir)),
            dir: Some(dir),
            registry,
            state: Mutex::new(state),
            slots: Mutex::new(HashMap::new()),
            ctx: GenerateContext::new(services),
            config,
        })
    }

    /// Store without a directory: files come from `fetcher`, state is kept in
    /// memory only
    #[must_use]
    pub fn in_memory(registry: Arc<Registry>, services: Services, fetcher: MemoryFetcher) -> Self {
        Self {
            dir: None,
            registry,
            fetcher: Box::new(fetcher),
            state: Mutex::new(StateFile::in_memory()),
            slots: Mutex::new(HashMap::new()),
            ctx: GenerateContext::new(services),
            config: StoreConfig::default(),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a cancellation token with every generator
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.ctx = self.ctx.with_cancellation(cancel);
        self
    }

    /// Working directory, if any
    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Known asset types
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Cancellation token raced against every generator
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        self.ctx.cancellation()
    }

    /// Resolve `T` and return a copy of it
    ///
    /// # Errors
    /// See [`Store::fetch_key`]; additionally [`StoreError::TypeMismatch`]
    /// when `T::KEY` is registered with another type.
    pub async fn fetch<T: Asset>(&self) -> Result<T, StoreError> {
        let state = self.fetch_key(T::KEY).await?;
        state
            .get::<T>()
            .cloned()
            .ok_or(StoreError::TypeMismatch { key: T::KEY })
    }

    /// Resolve the asset registered under `key`
    ///
    /// # Errors
    /// Returns the first fatal error met while resolving the dependency
    /// subgraph. Assets resolved before the failure stay cached. A cyclic
    /// subgraph is rejected before any asset is resolved.
    pub async fn fetch_key(&self, key: AssetKey) -> Result<Arc<AssetState>, StoreError> {
        ResolutionPlan::build(&self.registry, &[key])?;
        self.resolve(key, Vec::new()).await
    }

    /// Resolve several targets in order
    ///
    /// # Errors
    /// Fails fast on the first target that fails.
    pub async fn fetch_all(&self, keys: &[AssetKey]) -> Result<Vec<Arc<AssetState>>, StoreError> {
        let mut resolved = Vec::with_capacity(keys.len());
        for key in keys {
            resolved.push(self.fetch_key(*key).await?);
        }
        Ok(resolved)
    }

    /// Resolution order of the subgraph reachable from `targets`
    ///
    /// # Errors
    /// Returns [`StoreError::DependencyCycle`] or [`StoreError::UnknownAsset`].
    pub fn plan(&self, targets: &[AssetKey]) -> Result<ResolutionPlan, StoreError> {
        ResolutionPlan::build(&self.registry, targets)
    }

    /// Return the asset from disk or state without generating it
    ///
    /// `Ok(None)` when the asset was never resolved. Dependencies are not
    /// consulted.
    ///
    /// # Errors
    /// Returns [`StoreError::StateCorruption`] for an undecodable state entry.
    pub fn load(&self, key: AssetKey) -> Result<Option<Arc<AssetState>>, StoreError> {
        let slot = self.slot(key);
        if let Some(state) = slot.get() {
            return Ok(Some(Arc::clone(state)));
        }
        let Some(state) = self.load_existing(key)? else {
            return Ok(None);
        };
        let state = Arc::new(state);
        // a concurrent fetch may have won the race; keep whichever was first
        let _ = slot.set(Arc::clone(&state));
        Ok(Some(slot.get().cloned().unwrap_or(state)))
    }

    /// Resolve `targets` and write their files into the store directory
    ///
    /// # Errors
    /// Returns [`StoreError::NoDirectory`] for in-memory stores, any
    /// resolution error, or [`StoreError::Persist`].
    pub async fn persist(&self, targets: &[AssetKey]) -> Result<Vec<PathBuf>, StoreError> {
        let dir = self.dir.clone().ok_or(StoreError::NoDirectory)?;
        let mut written = Vec::new();
        for state in self.fetch_all(targets).await? {
            let asset = state.asset();
            let paths = persist_to_file(asset.as_ref(), &dir).map_err(|source| {
                StoreError::Persist {
                    name: asset.name(),
                    source,
                }
            })?;
            info!(asset = asset.name(), files = paths.len(), "persisted asset");
            written.extend(paths);
        }
        Ok(written)
    }

    /// Delete an asset's files and state entry and forget it
    ///
    /// Returns whether anything was found.
    ///
    /// # Errors
    /// Returns [`StoreError::Persist`] when a file cannot be removed, or a
    /// state error.
    pub fn destroy(&self, key: AssetKey) -> Result<bool, StoreError> {
        let Some(state) = self.load(key)? else {
            return Ok(false);
        };
        let asset = state.asset();
        if let Some(dir) = &self.dir {
            delete_from_disk(asset.as_ref(), dir).map_err(|source| StoreError::Persist {
                name: asset.name(),
                source,
            })?;
        }
        {
            let mut file = self.state.lock();
            file.remove(&key.state_key());
            if self.config.persist_state {
                file.save()?;
            }
        }
        self.slots.lock().remove(&key);
        info!(asset = asset.name(), "destroyed asset");
        Ok(true)
    }

    /// Remove the persisted state file and forget every resolved asset
    ///
    /// # Errors
    /// Returns [`StoreError::State`] when the file cannot be removed.
    pub fn destroy_state(&self) -> Result<(), StoreError> {
        self.state.lock().delete()?;
        self.slots.lock().clear();
        info!("removed state file");
        Ok(())
    }

    /// Provenance of every resolved asset, sorted by key
    #[must_use]
    pub fn provenance(&self) -> Vec<Provenance> {
        let mut rows: Vec<Provenance> = self
            .slots
            .lock()
            .iter()
            .filter_map(|(key, slot)| {
                slot.get().map(|state| Provenance {
                    key: *key,
                    name: state.asset.name(),
                    source: state.source,
                    present_on_disk: state.present_on_disk,
                })
            })
            .collect();
        rows.sort_by_key(|row| row.key);
        rows
    }

    /// Snapshot of the state file entry for a key
    #[must_use]
    pub fn state_entry(&self, key: AssetKey) -> Option<serde_json::Value> {
        self.state.lock().get(&key.state_key()).cloned()
    }

    fn slot(&self, key: AssetKey) -> Slot {
        Arc::clone(self.slots.lock().entry(key).or_default())
    }

    fn resolve(
        &self,
        key: AssetKey,
        chain: Vec<AssetKey>,
    ) -> BoxFuture<'_, Result<Arc<AssetState>, StoreError>> {
        Box::pin(async move {
            if let Some(pos) = chain.iter().position(|k| *k == key) {
                let mut path = chain[pos..].to_vec();
                path.push(key);
                return Err(StoreError::DependencyCycle { path });
            }
            let slot = self.slot(key);
            let state = slot
                .get_or_try_init(|| self.materialize(key, &chain))
                .await?;
            Ok(Arc::clone(state))
        })
    }

    async fn materialize(
        &self,
        key: AssetKey,
        chain: &[AssetKey],
    ) -> Result<Arc<AssetState>, StoreError> {
        if let Some(state) = self.load_existing(key)? {
            return Ok(Arc::new(state));
        }

        let mut asset = self.instantiate(key)?;
        let name = asset.name();
        let parents = self.resolve_parents(key, asset.as_ref(), chain).await?;

        debug!(asset = name, "generating asset");
        let cancel = self.ctx.cancellation().clone();
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StoreError::Cancelled { name }),
            result = asset.generate(&parents, &self.ctx) => match result {
                Ok(()) => {}
                Err(GenerateError::Cancelled) => return Err(StoreError::Cancelled { name }),
                Err(source) => return Err(StoreError::Generation { name, source }),
            },
        }
        info!(asset = name, "generated asset");

        self.record(key, asset.as_ref())?;
        Ok(Arc::new(AssetState {
            asset: Arc::from(asset),
            source: AssetSource::Generated,
            present_on_disk: false,
        }))
    }

    async fn resolve_parents(
        &self,
        key: AssetKey,
        asset: &dyn DynAsset,
        chain: &[AssetKey],
    ) -> Result<Parents, StoreError> {
        let name = asset.name();
        let mut chain = chain.to_vec();
        chain.push(key);

        let deps = asset.dependencies();
        let resolved = match self.config.resolve_mode {
            ResolveMode::Sequential => {
                let mut resolved = Vec::with_capacity(deps.len());
                for dep in deps {
                    let state = self
                        .resolve(dep, chain.clone())
                        .await
                        .map_err(|e| e.in_dependency_of(name))?;
                    resolved.push(state);
                }
                resolved
            }
            ResolveMode::Concurrent => try_join_all(deps.into_iter().map(|dep| self.resolve(dep, chain.clone())))
                .await
                .map_err(|e| e.in_dependency_of(name))?,
        };

        let mut parents = Parents::new(name);
        parents.extend(resolved.into_iter().map(|state| Arc::clone(&state.asset)));
        Ok(parents)
    }

    fn instantiate(&self, key: AssetKey) -> Result<Box<dyn DynAsset>, StoreError> {
        self.registry
            .get(&key)
            .map(|descriptor| descriptor.instantiate())
            .ok_or(StoreError::UnknownAsset { key })
    }

    /// Look the asset up on disk and in the state file
    fn load_existing(&self, key: AssetKey) -> Result<Option<AssetState>, StoreError> {
        let mut on_disk = self.instantiate(key)?;
        let found_on_disk = match on_disk.load(self.fetcher.as_ref()) {
            Ok(found) => found,
            Err(e) => {
                warn!(asset = on_disk.name(), error = %e, "failed to load asset from disk");
                false
            }
        };

        let state_key = key.state_key();
        let stored = self.state.lock().get(&state_key).cloned();
        let from_state = match stored {
            Some(value) => {
                let mut asset = self.instantiate(key)?;
                asset.restore(value).map_err(|e| StoreError::StateCorruption {
                    key: state_key.clone(),
                    reason: e.to_string(),
                })?;
                Some(asset)
            }
            None => None,
        };

        let (asset, source) = match (found_on_disk, from_state) {
            (true, Some(stored)) if stored.same_as(on_disk.as_ref()) => (stored, AssetSource::StateFile),
            (true, _) => {
                debug!(asset = on_disk.name(), "using asset from disk");
                self.record(key, on_disk.as_ref())?;
                (on_disk, AssetSource::OnDisk)
            }
            (false, Some(stored)) => (stored, AssetSource::StateFile),
            (false, None) => return Ok(None),
        };
        debug!(asset = asset.name(), source = %source, on_disk = found_on_disk, "loaded asset");
        Ok(Some(AssetState {
            asset: Arc::from(asset),
            source,
            present_on_disk: found_on_disk,
        }))
    }

    /// Write the asset's fields to the state file
    fn record(&self, key: AssetKey, asset: &dyn DynAsset) -> Result<(), StoreError> {
        let value = asset
            .to_state()
            .map_err(|e| StoreError::State(e.into()))?;
        let mut file = self.state.lock();
        file.insert(key.state_key(), value);
        if self.config.persist_state {
            file.save()?;
        }
        Ok(())
    }
}
