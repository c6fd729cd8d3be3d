//! JFrog Artifactory finder.
//!
//! Uses the REST search API only: `api/search/checksum` for the binary hash,
//! `api/search/gavc` with the embedded coordinate as a fallback.

use serde::Deserialize;
use sourcescope_api::{Gav, SourceCandidate, SourceFinder};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

use super::remote::{RemoteClient, SOURCES_SUFFIX};
use super::{FinderContext, FinderState};
use crate::archive::read_embedded_gav;
use crate::http::{Credentials, HttpRequest, join_url, with_query};

const PING: &str = "api/system/ping";
const CHECKSUM_SEARCH: &str = "api/search/checksum";
const GAVC_SEARCH: &str = "api/search/gavc";
const STORAGE_SEGMENT: &str = "/api/storage/";

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    results: Vec<StorageEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageEntry {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    download_uri: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

impl StorageEntry {
    /// Direct download URL; derived from the storage URI when the server
    /// omitted `downloadUri`.
    fn url(&self) -> Option<String> {
        self.download_uri.clone().or_else(|| {
            let uri = self.uri.as_deref()?;
            let (host, rest) = uri.split_once(STORAGE_SEGMENT)?;
            Some(format!("{host}/{rest}"))
        })
    }

    fn gav(&self) -> Option<Gav> {
        self.path.as_deref().and_then(Gav::from_repository_path)
    }
}

pub struct ArtifactoryFinder {
    ctx: FinderContext,
    base_url: String,
    credentials: Option<Credentials>,
    state: FinderState,
    reachable: Mutex<Option<bool>>,
}

impl ArtifactoryFinder {
    pub fn new(ctx: FinderContext, base_url: String, credentials: Option<Credentials>) -> Self {
        Self {
            ctx,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            state: FinderState::default(),
            reachable: Mutex::new(None),
        }
    }

    fn client(&self) -> RemoteClient<'_> {
        RemoteClient {
            finder: self.name(),
            ctx: &self.ctx,
            state: &self.state,
            credentials: self.credentials.as_ref(),
        }
    }

    /// Whether the server answered `api/system/ping`; probed once.
    pub fn is_reachable(&self) -> bool {
        let mut reachable = self.reachable.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(known) = *reachable {
            return known;
        }
        let answered = self.client().responds(&join_url(&self.base_url, PING));
        if !self.state.is_canceled() {
            if !answered {
                warn!("[artifactory] {} does not answer, skipping it", self.base_url);
            }
            *reachable = Some(answered);
        }
        answered
    }

    fn search(&self, url: &str) -> Vec<StorageEntry> {
        let request = HttpRequest::get(url).json().header("X-Result-Detail", "info");
        self.client()
            .get_json_with::<SearchResults>(request)
            .map(|r| r.results)
            .unwrap_or_default()
    }

    fn by_checksum(&self, binary: &Path, sha1: &str) -> Option<SourceCandidate> {
        let url = with_query(&join_url(&self.base_url, CHECKSUM_SEARCH), &[("sha1", sha1)]);
        let mut entries = self.search(&url);
        entries.sort_by_key(|e| !e.url().is_some_and(|u| u.ends_with(SOURCES_SUFFIX)));

        let client = self.client();
        for entry in entries {
            if self.state.is_canceled() {
                return None;
            }
            let Some(url) = entry.url().and_then(|u| client.sources_sibling(&u)) else {
                continue;
            };
            let gav = entry.gav();
            if let Some(candidate) = client.fetch_candidate(&url, gav.as_ref(), binary, sha1) {
                return Some(candidate);
            }
        }
        None
    }

    fn by_coordinate(&self, binary: &Path, sha1: &str) -> Option<SourceCandidate> {
        let gav = match read_embedded_gav(binary) {
            Ok(gav) => gav?,
            Err(e) => {
                debug!("Cannot read metadata of {}: {}", binary.display(), e);
                return None;
            }
        };
        let (g, a, v) = gav.parts()?;
        let url = with_query(
            &join_url(&self.base_url, GAVC_SEARCH),
            &[("g", g), ("a", a), ("v", v), ("c", "sources")],
        );

        let client = self.client();
        for entry in self.search(&url) {
            let Some(url) = entry.url().filter(|u| u.ends_with(".jar")) else {
                continue;
            };
            if let Some(candidate) = client.fetch_candidate(&url, Some(&gav), binary, sha1) {
                return Some(candidate);
            }
        }
        None
    }
}

impl SourceFinder for ArtifactoryFinder {
    fn name(&self) -> &str {
        "artifactory"
    }

    fn find(&self, binary: &Path, sha1: &str, out: &mut Vec<SourceCandidate>) {
        self.state.begin();
        if self.state.is_canceled() || !self.is_reachable() {
            return;
        }

        let found = self
            .by_checksum(binary, sha1)
            .or_else(|| self.by_coordinate(binary, sha1));
        if let Some(candidate) = found {
            out.push(candidate);
        }
    }

    fn cancel(&self) {
        self.state.cancel();
    }

    fn is_canceled(&self) -> bool {
        self.state.is_canceled()
    }

    fn download_url(&self) -> Option<String> {
        self.state.download_url()
    }
}
