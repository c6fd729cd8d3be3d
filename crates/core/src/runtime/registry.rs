use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sourcescope_api::AttachTarget;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Binaries currently being resolved, keyed by canonical path.
///
/// One instance per session, shared by every orchestrator batch.
#[derive(Default)]
pub struct InFlightRegistry {
    entries: DashMap<PathBuf, Arc<dyn AttachTarget>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` unless it is already in flight.
    pub fn try_begin(&self, path: PathBuf, target: Arc<dyn AttachTarget>) -> bool {
        match self.entries.entry(path) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(target);
                true
            }
        }
    }

    /// Register `path`, replacing any target already recorded for it.
    pub fn register(&self, path: PathBuf, target: Arc<dyn AttachTarget>) {
        self.entries.insert(path, target);
    }

    pub fn end(&self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn target(&self, path: &Path) -> Option<Arc<dyn AttachTarget>> {
        self.entries.get(path).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
