use crate::error::ApiResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Summary of one persisted binding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingSummary {
    pub source: PathBuf,
    pub download_url: Option<String>,
    pub hashes: Vec<String>,
    pub size_bytes: u64,
    pub exists: bool,
}

/// Statistics for the binding cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingCacheStats {
    pub total_records: usize,
    pub total_hashes: usize,
    pub missing_sources: usize,
    pub cache_file: PathBuf,
}

/// Service interface for inspecting and maintaining the binding cache
pub trait BindingCacheManager: Send + Sync {
    /// Get cache statistics
    fn stats(&self) -> ApiResult<BindingCacheStats>;

    /// List all bindings
    fn list(&self) -> ApiResult<Vec<BindingSummary>>;

    /// Drop bindings whose source file is gone, returning how many were removed
    fn sweep(&self) -> ApiResult<usize>;

    /// Remove every binding
    fn clear(&self) -> ApiResult<()>;
}
