//! On-disk layout of managed directories.
//!
//! ```text
//! <home>/                      long-lived, survives restarts
//!   bindings.json              binding cache document
//!   config.json                optional configuration
//!   sources/<hash>/<file>      promoted source archives
//!   logs/                      rolling log files
//! <tmp>/sourcescope-XXXX/      session directory, removed when the layout drops
//!   downloads/<hash>/<n>/<file> in-progress downloads, one slot per request
//!   sources/<hash>/<file>      session copies handed to the host
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;

use crate::error::Result;

pub const HOME_ENV: &str = "SOURCESCOPE_HOME";
const DEFAULT_HOME_DIR: &str = ".sourcescope";

pub struct StorageLayout {
    home: PathBuf,
    session: TempDir,
    download_slots: AtomicU64,
}

impl StorageLayout {
    /// Create the layout rooted at `home` with a fresh session directory.
    pub fn new(home: PathBuf) -> Result<Self> {
        let session = tempfile::Builder::new().prefix("sourcescope-").tempdir()?;
        let layout = Self {
            home,
            session,
            download_slots: AtomicU64::new(0),
        };
        layout.ensure_dirs()?;
        Ok(layout)
    }

    /// Layout under [`default_home`](Self::default_home).
    pub fn at_default_location() -> Result<Self> {
        Self::new(Self::default_home())
    }

    /// Gets the home directory, supporting the SOURCESCOPE_HOME env var.
    pub fn default_home() -> PathBuf {
        if let Ok(env_dir) = std::env::var(HOME_ENV) {
            return PathBuf::from(env_dir);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_HOME_DIR)
    }

    /// Recreate every managed directory. Cheap when they already exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.sources_dir())?;
        fs::create_dir_all(self.session_sources_dir())?;
        fs::create_dir_all(self.downloads_dir())?;
        Ok(())
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.home.join("sources")
    }

    pub fn bindings_file(&self) -> PathBuf {
        self.home.join("bindings.json")
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    pub fn session_dir(&self) -> &Path {
        self.session.path()
    }

    pub fn session_sources_dir(&self) -> PathBuf {
        self.session.path().join("sources")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.session.path().join("downloads")
    }

    /// Whether `path` already lives in the long-lived sources directory.
    pub fn is_managed(&self, path: &Path) -> bool {
        path.starts_with(self.sources_dir())
    }

    /// Fresh download target for `file_name` fetched from a location
    /// identified by `key`. Two requests for the same key never share a file.
    pub fn download_slot(&self, key: &str, file_name: &str) -> PathBuf {
        let slot = self.download_slots.fetch_add(1, Ordering::Relaxed);
        self.downloads_dir()
            .join(short_key(key))
            .join(slot.to_string())
            .join(file_name)
    }

    /// Long-lived and session destinations for a promoted archive.
    pub fn promoted_paths(&self, content_hash: &str, file_name: &str) -> (PathBuf, PathBuf) {
        let key = short_key(content_hash);
        (
            self.sources_dir().join(&key).join(file_name),
            self.session_sources_dir().join(&key).join(file_name),
        )
    }
}

fn short_key(key: &str) -> String {
    let hashed = if key.len() >= 12 && key.chars().all(|c| c.is_ascii_hexdigit()) {
        key.to_ascii_lowercase()
    } else {
        crate::hash::sha1_str(key)
    };
    hashed[..12].to_string()
}
