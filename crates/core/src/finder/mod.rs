//! Finder strategies
//!
//! Each strategy turns `(binary, sha1)` into at most a handful of verified
//! candidates. Strategies are tried in configuration order by the
//! [`CompositeResolver`](crate::resolver::CompositeResolver).
//!
//! ```text
//! local          Maven local repository, Gradle module cache
//! maven-central  search.maven.org hash + sources queries
//! nexus          Nexus 3 REST / Nexus 2 service API, dialect detected
//! artifactory    Artifactory checksum + gavc search
//! ```

pub mod artifactory;
pub mod central;
pub mod local;
pub mod nexus;
pub mod remote;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use sourcescope_api::SourceFinder;

use crate::cache::BindingCache;
use crate::config::{FinderConfig, SourceScopeConfig};
use crate::http::HttpTransport;
use crate::storage::StorageLayout;

pub use artifactory::ArtifactoryFinder;
pub use central::MavenCentralFinder;
pub use local::LocalCacheFinder;
pub use nexus::{NexusDialect, NexusFinder};

/// Shared collaborators handed to every remote finder
#[derive(Clone)]
pub struct FinderContext {
    pub http: Arc<dyn HttpTransport>,
    pub bindings: Arc<BindingCache>,
    pub storage: Arc<StorageLayout>,
}

/// Cancellation flag and last download URL of one finder instance.
#[derive(Debug, Default)]
pub struct FinderState {
    canceled: AtomicBool,
    last_url: Mutex<Option<String>>,
}

impl FinderState {
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Forget the URL of the previous request; called at the start of `find`.
    pub fn begin(&self) {
        *self.last_url.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn record_url(&self, url: Option<String>) {
        *self.last_url.lock().unwrap_or_else(PoisonError::into_inner) = url;
    }

    pub fn download_url(&self) -> Option<String> {
        self.last_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Instantiate the configured strategies in priority order.
pub fn build_finders(config: &SourceScopeConfig, ctx: &FinderContext) -> Vec<Box<dyn SourceFinder>> {
    config
        .finders
        .iter()
        .map(|finder| -> Box<dyn SourceFinder> {
            match finder {
                FinderConfig::Local => Box::new(LocalCacheFinder::new(
                    config.maven_repository_path(),
                    config.gradle_cache_path(),
                )),
                FinderConfig::MavenCentral {
                    search_url,
                    repository_url,
                } => Box::new(MavenCentralFinder::new(
                    ctx.clone(),
                    search_url.clone(),
                    repository_url.clone(),
                )),
                FinderConfig::Nexus {
                    url,
                    credentials,
                    repository_id,
                } => Box::new(NexusFinder::new(
                    ctx.clone(),
                    url.clone(),
                    credentials.clone(),
                    repository_id.clone(),
                )),
                FinderConfig::Artifactory { url, credentials } => Box::new(
                    ArtifactoryFinder::new(ctx.clone(), url.clone(), credentials.clone()),
                ),
            }
        })
        .collect()
}
