//! Session bootstrap
//!
//! A [`SourceScope`] owns everything that lives for one host process: the
//! storage layout with its session directory, the shared binding cache, the
//! in-flight registry and the HTTP transport.

use serde::Serialize;
use sourcescope_api::{Attacher, Gav};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::archive::embedded_gavs;
use crate::cache::BindingCache;
use crate::config::SourceScopeConfig;
use crate::error::Result;
use crate::finder::FinderContext;
use crate::hash::sha1_file;
use crate::http::{HttpTransport, ReqwestTransport};
use crate::resolver::CompositeResolver;
use crate::runtime::{
    InFlightRegistry, OrchestratorConfig, Promoter, ResolutionOrchestrator, ResolverFactory,
};
use crate::storage::StorageLayout;

/// What a binary says about itself.
#[derive(Debug, Clone, Serialize)]
pub struct Identification {
    pub binary: PathBuf,
    pub sha1: String,
    /// Coordinates from `META-INF/maven/**/pom.properties`
    pub embedded: Vec<Gav>,
}

impl Identification {
    /// The coordinate, unless the binary is shaded or carries none.
    pub fn gav(&self) -> Option<&Gav> {
        match self.embedded.as_slice() {
            [gav] => Some(gav),
            _ => None,
        }
    }
}

pub struct SourceScope {
    config: SourceScopeConfig,
    storage: Arc<StorageLayout>,
    bindings: Arc<BindingCache>,
    registry: Arc<InFlightRegistry>,
    http: Arc<dyn HttpTransport>,
}

impl SourceScope {
    /// Open the session under `home`, reading `config.json` there.
    pub fn open(home: PathBuf) -> Result<Self> {
        Self::open_in(StorageLayout::new(home)?)
    }

    /// Open on an existing layout, reading its `config.json`.
    pub fn open_in(storage: StorageLayout) -> Result<Self> {
        let config = SourceScopeConfig::load(&storage.config_file())?;
        let http = transport_for(&config)?;
        Ok(Self::assemble(storage, config, http))
    }

    /// Open with a caller-supplied transport.
    pub fn with_transport(
        home: PathBuf,
        config: SourceScopeConfig,
        http: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(StorageLayout::new(home)?, config, http))
    }

    fn assemble(
        storage: StorageLayout,
        config: SourceScopeConfig,
        http: Arc<dyn HttpTransport>,
    ) -> Self {
        let storage = Arc::new(storage);
        let bindings = Arc::new(BindingCache::new(storage.bindings_file()));

        match bindings.sweep() {
            Ok(removed) if removed > 0 => info!("Dropped {} stale bindings", removed),
            Ok(_) => {}
            Err(e) => warn!("Binding cache sweep failed: {}", e),
        }

        info!(
            "Session at {} (home {})",
            storage.session_dir().display(),
            storage.home().display()
        );

        Self {
            config,
            storage,
            bindings,
            registry: Arc::new(InFlightRegistry::new()),
            http,
        }
    }

    pub fn config(&self) -> &SourceScopeConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<StorageLayout> {
        &self.storage
    }

    pub fn bindings(&self) -> &Arc<BindingCache> {
        &self.bindings
    }

    pub fn finder_context(&self) -> FinderContext {
        FinderContext {
            http: self.http.clone(),
            bindings: self.bindings.clone(),
            storage: self.storage.clone(),
        }
    }

    /// A resolver over the configured finder chain.
    pub fn resolver(&self) -> CompositeResolver {
        CompositeResolver::from_config(&self.config, &self.finder_context())
    }

    pub fn resolver_factory(&self) -> ResolverFactory {
        let config = self.config.clone();
        let ctx = self.finder_context();
        Arc::new(move || CompositeResolver::from_config(&config, &ctx))
    }

    pub fn orchestrator_with(
        &self,
        attacher: Arc<dyn Attacher>,
        config: OrchestratorConfig,
    ) -> ResolutionOrchestrator {
        ResolutionOrchestrator::new(
            config,
            self.resolver_factory(),
            self.registry.clone(),
            Promoter::new(self.storage.clone(), self.bindings.clone(), attacher),
        )
    }
}

fn transport_for(config: &SourceScopeConfig) -> Result<Arc<dyn HttpTransport>> {
    Ok(Arc::new(ReqwestTransport::new(
        config.connect_timeout(),
        config.request_timeout(),
    )?))
}

/// Hash and embedded coordinates of `binary`.
pub fn identify(binary: &Path) -> Result<Identification> {
    Ok(Identification {
        binary: binary.to_path_buf(),
        sha1: sha1_file(binary)?,
        embedded: embedded_gavs(binary)?,
    })
}
