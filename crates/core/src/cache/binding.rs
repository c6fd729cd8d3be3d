//! Binding cache
//!
//! A single JSON document maps every confirmed binary SHA-1 to the source
//! archive resolved for it, so repeat resolutions skip the network. One record
//! exists per source archive; its `sha` set grows as more binary variants
//! (repackaged copies, re-signed jars) are confirmed against it.
//!
//! Every load-modify-save cycle runs under one mutex, so concurrent workers
//! resolving different binaries to the same source never lose updates.

use serde::{Deserialize, Serialize};
use sourcescope_api::{ApiResult, BindingCacheManager, BindingCacheStats, BindingSummary};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::error::Result;

pub const BINDING_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingRecord {
    /// Absolute path of the long-lived source archive
    pub source: PathBuf,
    #[serde(rename = "downloadUrl", default)]
    pub download_url: Option<String>,
    /// Lowercase hex SHA-1 of every binary confirmed to match `source`
    #[serde(default)]
    pub sha: Vec<String>,
    /// Session copy handed to the host, may be gone after a restart
    #[serde(default)]
    pub temp: Option<PathBuf>,
}

impl BindingRecord {
    pub fn matches_sha1(&self, sha1: &str) -> bool {
        self.sha.iter().any(|s| s.eq_ignore_ascii_case(sha1))
    }

    pub fn source_exists(&self) -> bool {
        self.source.is_file()
    }

    /// The session copy when it still exists, otherwise the source itself.
    pub fn attachable_temp(&self) -> PathBuf {
        match &self.temp {
            Some(temp) if temp.is_file() => temp.clone(),
            _ => self.source.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingFile {
    pub version: u32,
    #[serde(default)]
    pub records: Vec<BindingRecord>,
}

impl Default for BindingFile {
    fn default() -> Self {
        Self {
            version: BINDING_FORMAT_VERSION,
            records: Vec::new(),
        }
    }
}

pub struct BindingCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl BindingCache {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run one read-modify-write cycle under the cache lock.
    ///
    /// `f` returns whether it changed the document; unchanged documents are
    /// not rewritten.
    fn transact<R>(&self, f: impl FnOnce(&mut BindingFile) -> (R, bool)) -> Result<R> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = self.load()?;
        let (result, dirty) = f(&mut file);
        if dirty {
            self.save(&file)?;
        }
        Ok(result)
    }

    /// Read the document. Only a missing or unparsable document counts as
    /// empty; any other read failure aborts the transaction before a write.
    fn load(&self) -> Result<BindingFile> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BindingFile::default()),
            Err(e) => {
                warn!("Failed to read binding cache {}: {}", self.path.display(), e);
                return Err(e.into());
            }
        };

        Ok(match serde_json::from_slice::<BindingFile>(&bytes) {
            Ok(file) if file.version == BINDING_FORMAT_VERSION => file,
            Ok(file) => {
                warn!(
                    "Binding cache {} has unsupported version {}, starting empty",
                    self.path.display(),
                    file.version
                );
                BindingFile::default()
            }
            Err(e) => {
                warn!(
                    "Binding cache {} is corrupt, starting empty: {}",
                    self.path.display(),
                    e
                );
                BindingFile::default()
            }
        })
    }

    fn save(&self, file: &BindingFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(file)?;

        // Write-then-rename so readers never observe a half-written document
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Look up a live binding for a binary hash (case-insensitive).
    pub fn find_by_sha1(&self, sha1: &str) -> Result<Option<BindingRecord>> {
        self.transact(|file| {
            let found = file
                .records
                .iter()
                .find(|r| r.matches_sha1(sha1) && r.source_exists())
                .cloned();
            (found, false)
        })
    }

    /// Look up a live binding by the URL its source was downloaded from.
    pub fn find_by_url(&self, url: &str) -> Result<Option<BindingRecord>> {
        self.transact(|file| {
            let found = file
                .records
                .iter()
                .find(|r| r.download_url.as_deref() == Some(url) && r.source_exists())
                .cloned();
            (found, false)
        })
    }

    /// Record that `sha1` resolves to `source`.
    ///
    /// An existing record for the same source path gains the hash and has its
    /// URL and temp path refreshed; otherwise a new record is appended.
    pub fn upsert(
        &self,
        source: &Path,
        sha1: &str,
        download_url: Option<&str>,
        temp: Option<&Path>,
    ) -> Result<()> {
        let sha1 = sha1.to_ascii_lowercase();
        self.transact(|file| {
            match file.records.iter_mut().find(|r| r.source == source) {
                Some(record) => {
                    if !record.matches_sha1(&sha1) {
                        record.sha.push(sha1.clone());
                    }
                    if download_url.is_some() {
                        record.download_url = download_url.map(str::to_string);
                    }
                    record.temp = temp.map(Path::to_path_buf);
                }
                None => file.records.push(BindingRecord {
                    source: source.to_path_buf(),
                    download_url: download_url.map(str::to_string),
                    sha: vec![sha1.clone()],
                    temp: temp.map(Path::to_path_buf),
                }),
            }
            debug!("Bound {} -> {}", sha1, source.display());
            ((), true)
        })
    }

    /// Remove records whose source archive no longer exists and rewrite the
    /// document. Returns the number of records removed.
    pub fn sweep(&self) -> Result<usize> {
        let removed = self.transact(|file| {
            let before = file.records.len();
            file.records.retain(BindingRecord::source_exists);
            let removed = before - file.records.len();
            (removed, true)
        })?;

        if removed > 0 {
            info!("Binding cache sweep removed {} stale records", removed);
        }
        Ok(removed)
    }

    pub fn records(&self) -> Result<Vec<BindingRecord>> {
        self.transact(|file| (file.records.clone(), false))
    }

    pub fn clear(&self) -> Result<()> {
        self.transact(|file| {
            file.records.clear();
            ((), true)
        })
    }
}

impl BindingCacheManager for BindingCache {
    fn stats(&self) -> ApiResult<BindingCacheStats> {
        let records = self.records()?;
        Ok(BindingCacheStats {
            total_records: records.len(),
            total_hashes: records.iter().map(|r| r.sha.len()).sum(),
            missing_sources: records.iter().filter(|r| !r.source_exists()).count(),
            cache_file: self.path.clone(),
        })
    }

    fn list(&self) -> ApiResult<Vec<BindingSummary>> {
        Ok(self
            .records()?
            .into_iter()
            .map(|r| {
                let size_bytes = fs::metadata(&r.source).map(|m| m.len()).unwrap_or(0);
                BindingSummary {
                    exists: r.source_exists(),
                    source: r.source,
                    download_url: r.download_url,
                    hashes: r.sha,
                    size_bytes,
                }
            })
            .collect())
    }

    fn sweep(&self) -> ApiResult<usize> {
        Ok(BindingCache::sweep(self)?)
    }

    fn clear(&self) -> ApiResult<()> {
        Ok(BindingCache::clear(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const SHA_A: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";
    const SHA_B: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

    fn setup() -> (tempfile::TempDir, BindingCache, PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let cache = BindingCache::new(temp.path().join("bindings.json"));
        let source = temp.path().join("lib-1.0-sources.jar");
        fs::write(&source, b"zip").unwrap();
        (temp, cache, source)
    }

    #[test]
    fn test_lookup_by_hash_is_case_insensitive() {
        let (_temp, cache, source) = setup();
        cache.upsert(&source, SHA_A, None, None).unwrap();

        let found = cache.find_by_sha1(&SHA_A.to_uppercase()).unwrap().unwrap();
        assert_eq!(found.source, source);
        assert!(cache.find_by_sha1(SHA_B).unwrap().is_none());
    }

    #[test]
    fn test_upsert_merges_hashes() {
        let (_temp, cache, source) = setup();
        cache
            .upsert(&source, SHA_A, Some("https://repo/a-sources.jar"), None)
            .unwrap();
        cache.upsert(&source, SHA_B, None, None).unwrap();
        cache.upsert(&source, SHA_A, None, None).unwrap();

        let records = cache.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sha, vec![SHA_A.to_string(), SHA_B.to_string()]);
        assert_eq!(
            records[0].download_url.as_deref(),
            Some("https://repo/a-sources.jar")
        );
    }

    #[test]
    fn test_lookup_by_url() {
        let (_temp, cache, source) = setup();
        cache
            .upsert(&source, SHA_A, Some("https://repo/a-sources.jar"), None)
            .unwrap();

        assert!(cache.find_by_url("https://repo/a-sources.jar").unwrap().is_some());
        assert!(cache.find_by_url("https://repo/b-sources.jar").unwrap().is_none());
    }

    #[test]
    fn test_sweep_removes_missing_sources() {
        let (temp, cache, source) = setup();
        let gone = temp.path().join("gone-sources.jar");
        fs::write(&gone, b"zip").unwrap();

        cache.upsert(&source, SHA_A, None, None).unwrap();
        cache.upsert(&gone, SHA_B, None, None).unwrap();
        fs::remove_file(&gone).unwrap();

        // A missing source is already invisible to lookups
        assert!(cache.find_by_sha1(SHA_B).unwrap().is_none());

        assert_eq!(cache.sweep().unwrap(), 1);
        let records = cache.records().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records.iter().all(BindingRecord::source_exists));

        // Persisted, not just filtered in memory
        let reopened = BindingCache::new(cache.path().to_path_buf());
        assert_eq!(reopened.records().unwrap().len(), 1);
    }

    #[test]
    fn test_document_shape() {
        let (_temp, cache, source) = setup();
        cache
            .upsert(&source, SHA_A, Some("https://repo/x"), Some(Path::new("/tmp/x")))
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(cache.path()).unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        let record = &value["records"][0];
        assert_eq!(record["downloadUrl"], "https://repo/x");
        assert_eq!(record["sha"][0], SHA_A);
        assert_eq!(record["temp"], "/tmp/x");
        assert!(record["source"].is_string());
    }

    #[test]
    fn test_corrupt_document_starts_empty() {
        let (_temp, cache, source) = setup();
        fs::write(cache.path(), b"{ not json").unwrap();

        assert!(cache.records().unwrap().is_empty());
        cache.upsert(&source, SHA_A, None, None).unwrap();
        assert_eq!(cache.records().unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_document_is_left_alone() {
        let (_temp, cache, source) = setup();
        // a directory where the document should be: reads fail with an I/O error
        fs::create_dir_all(cache.path()).unwrap();
        fs::write(cache.path().join("keep"), b"x").unwrap();

        assert!(cache.records().is_err());
        assert!(cache.find_by_sha1(SHA_A).is_err());
        assert!(cache.upsert(&source, SHA_A, None, None).is_err());
        assert!(cache.sweep().is_err());
        assert!(cache.path().join("keep").is_file());
        assert!(!cache.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_concurrent_upserts_do_not_lose_updates() {
        let temp = tempfile::tempdir().unwrap();
        let cache = Arc::new(BindingCache::new(temp.path().join("bindings.json")));
        let source = temp.path().join("shared-sources.jar");
        fs::write(&source, b"zip").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let source = source.clone();
                std::thread::spawn(move || {
                    let sha = format!("{:040x}", i);
                    cache.upsert(&source, &sha, None, None).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let records = cache.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sha.len(), 8);
    }
}
