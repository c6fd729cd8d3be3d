//! Configuration
//!
//! Read from `<home>/config.json` when present; every field has a default so a
//! partial document is valid. The `finders` list is ordered by priority.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, SourceScopeError};
use crate::http::Credentials;

pub const DEFAULT_SEARCH_URL: &str = "https://search.maven.org/solrsearch/select";
pub const DEFAULT_CENTRAL_REPOSITORY: &str = "https://repo1.maven.org/maven2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceScopeConfig {
    /// Worker threads per resolution batch
    pub workers: usize,
    pub poll_interval_ms: u64,
    /// Upper bound for one batch; `None` waits until every worker finishes
    pub time_budget_secs: Option<u64>,
    pub connect_timeout_secs: u64,
    /// Deadline for one whole request, body download included
    #[serde(alias = "read_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Maven local repository, defaults to `~/.m2/repository`
    pub maven_repository: Option<PathBuf>,
    /// Gradle module cache, defaults to `~/.gradle/caches/modules-2/files-2.1`
    pub gradle_cache: Option<PathBuf>,
    pub finders: Vec<FinderConfig>,
}

impl Default for SourceScopeConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            poll_interval_ms: 100,
            time_budget_secs: None,
            connect_timeout_secs: 5,
            request_timeout_secs: 120,
            maven_repository: None,
            gradle_cache: None,
            finders: vec![FinderConfig::Local, FinderConfig::maven_central()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FinderConfig {
    /// Maven local repository and Gradle module cache
    Local,
    /// Maven Central search API
    MavenCentral {
        #[serde(default = "default_search_url")]
        search_url: String,
        #[serde(default = "default_central_repository")]
        repository_url: String,
    },
    /// Sonatype Nexus 2 or 3, dialect detected at first use
    Nexus {
        url: String,
        #[serde(default)]
        credentials: Option<Credentials>,
        /// Repository used for coordinate lookups on Nexus 2
        #[serde(default)]
        repository_id: Option<String>,
    },
    /// JFrog Artifactory
    Artifactory {
        url: String,
        #[serde(default)]
        credentials: Option<Credentials>,
    },
}

impl FinderConfig {
    pub fn maven_central() -> Self {
        FinderConfig::MavenCentral {
            search_url: default_search_url(),
            repository_url: default_central_repository(),
        }
    }
}

fn default_search_url() -> String {
    DEFAULT_SEARCH_URL.to_string()
}

fn default_central_repository() -> String {
    DEFAULT_CENTRAL_REPOSITORY.to_string()
}

impl SourceScopeConfig {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let bytes = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| SourceScopeError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(SourceScopeError::Config(
                "workers must be at least 1".to_string(),
            ));
        }
        for finder in &self.finders {
            match finder {
                FinderConfig::Nexus { url, .. } | FinderConfig::Artifactory { url, .. }
                    if url::Url::parse(url).is_err() =>
                {
                    return Err(SourceScopeError::Config(format!(
                        "invalid repository url: {url}"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs.map(Duration::from_secs)
    }

    pub fn maven_repository_path(&self) -> Option<PathBuf> {
        self.maven_repository
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".m2/repository")))
    }

    pub fn gradle_cache_path(&self) -> Option<PathBuf> {
        self.gradle_cache
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".gradle/caches/modules-2/files-2.1")))
    }
}
