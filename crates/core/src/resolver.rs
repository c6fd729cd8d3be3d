//! Composite resolver: binding cache first, then the finder chain.

use sourcescope_api::{BINDING_CACHE_FINDER, SourceCandidate, SourceFinder};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::BindingCache;
use crate::config::SourceScopeConfig;
use crate::finder::{FinderContext, FinderState, build_finders};

/// Tries every finder in priority order and stops at the first one that
/// produces a result. One instance per worker thread.
pub struct CompositeResolver {
    finders: Vec<Box<dyn SourceFinder>>,
    bindings: Arc<BindingCache>,
    state: FinderState,
}

impl CompositeResolver {
    pub fn new(finders: Vec<Box<dyn SourceFinder>>, bindings: Arc<BindingCache>) -> Self {
        Self {
            finders,
            bindings,
            state: FinderState::default(),
        }
    }

    pub fn from_config(config: &SourceScopeConfig, ctx: &FinderContext) -> Self {
        Self::new(build_finders(config, ctx), ctx.bindings.clone())
    }

    pub fn finder_names(&self) -> Vec<&str> {
        self.finders.iter().map(|f| f.name()).collect()
    }

    /// The single winning candidate for `binary`, if any.
    pub fn resolve(&self, binary: &Path, sha1: &str) -> Option<SourceCandidate> {
        self.state.begin();
        if self.state.is_canceled() {
            return None;
        }

        if let Some(candidate) = self.from_bindings(binary, sha1) {
            self.state.record_url(candidate.download_url.clone());
            return Some(candidate);
        }

        for finder in &self.finders {
            if self.state.is_canceled() {
                return None;
            }

            let mut found = Vec::new();
            finder.find(binary, sha1, &mut found);
            if found.is_empty() {
                continue;
            }

            let url = finder.download_url();
            if url.is_none() && !finder.accepts_without_url() {
                warn!(
                    "[{}] result for {} carries no download url, ignoring it",
                    finder.name(),
                    binary.display()
                );
                continue;
            }

            let winner = pick_winner(found)?;
            info!(
                "[{}] {} -> {} (confidence {})",
                finder.name(),
                binary.display(),
                winner.source_file.display(),
                winner.confidence
            );
            self.state.record_url(url);
            return Some(winner);
        }

        debug!("No sources found for {}", binary.display());
        None
    }

    /// A binding recorded for this exact binary hash; no network, no verification.
    fn from_bindings(&self, binary: &Path, sha1: &str) -> Option<SourceCandidate> {
        let record = match self.bindings.find_by_sha1(sha1) {
            Ok(record) => record?,
            Err(e) => {
                warn!("Binding cache lookup failed: {}", e);
                return None;
            }
        };

        debug!("Binding cache hit for {}: {}", binary.display(), record.source.display());
        let temp = record.attachable_temp();
        let candidate = SourceCandidate::new(BINDING_CACHE_FINDER, binary.to_path_buf(), sha1, record.source)
            .with_temp_file(temp)
            .with_confidence(100);
        Some(match record.download_url {
            Some(url) => candidate.with_download_url(url),
            None => candidate,
        })
    }
}

/// Highest confidence wins; ties go to the earliest candidate.
fn pick_winner(found: Vec<SourceCandidate>) -> Option<SourceCandidate> {
    found.into_iter().reduce(|best, next| {
        if next.confidence > best.confidence {
            next
        } else {
            best
        }
    })
}

impl SourceFinder for CompositeResolver {
    fn name(&self) -> &str {
        "composite"
    }

    fn find(&self, binary: &Path, sha1: &str, out: &mut Vec<SourceCandidate>) {
        if let Some(candidate) = self.resolve(binary, sha1) {
            out.push(candidate);
        }
    }

    fn cancel(&self) {
        self.state.cancel();
        for finder in &self.finders {
            finder.cancel();
        }
    }

    fn is_canceled(&self) -> bool {
        self.state.is_canceled()
    }

    fn download_url(&self) -> Option<String> {
        self.state.download_url()
    }

    fn accepts_without_url(&self) -> bool {
        true
    }
}
