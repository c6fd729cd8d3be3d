use crate::models::gav::Gav;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name reported by candidates served from the binding cache.
pub const BINDING_CACHE_FINDER: &str = "binding-cache";

/// A verified source archive proposed for one binary.
///
/// `source_file` and `temp_file` may point at an in-progress download until
/// the candidate is promoted, after which both live in managed directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCandidate {
    /// Name of the finder that produced this candidate
    pub finder: String,
    /// Canonical path of the binary the source belongs to
    pub binary_path: PathBuf,
    /// Lowercase hex SHA-1 of the binary
    pub sha1: String,
    pub source_file: PathBuf,
    pub temp_file: PathBuf,
    /// 0..=100, share of the binary's classes matched by source files
    pub confidence: u8,
    pub download_url: Option<String>,
    pub gav: Option<Gav>,
}

impl SourceCandidate {
    pub fn new(
        finder: impl Into<String>,
        binary_path: PathBuf,
        sha1: impl Into<String>,
        source_file: PathBuf,
    ) -> Self {
        Self {
            finder: finder.into(),
            binary_path,
            sha1: sha1.into(),
            temp_file: source_file.clone(),
            source_file,
            confidence: 0,
            download_url: None,
            gav: None,
        }
    }

    pub fn with_temp_file(mut self, temp_file: PathBuf) -> Self {
        self.temp_file = temp_file;
        self
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = confidence.min(100);
        self
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }

    pub fn with_gav(mut self, gav: Gav) -> Self {
        self.gav = Some(gav);
        self
    }

    pub fn is_from_binding_cache(&self) -> bool {
        self.finder == BINDING_CACHE_FINDER
    }
}
