//! Sonatype Nexus finder.
//!
//! The server dialect is probed once per finder instance and cached:
//! `service/rest/v1/status` answers on Nexus 3, `service/local/status` on
//! Nexus 2. Installations mounted under `/nexus` are probed a second time with
//! that suffix. When neither answers both protocols are attempted.

mod v2;
mod v3;

use sourcescope_api::{Gav, SourceCandidate, SourceFinder};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

use super::remote::RemoteClient;
use super::{FinderContext, FinderState};
use crate::archive::read_embedded_gav;
use crate::http::{Credentials, join_url};

const V3_STATUS: &str = "service/rest/v1/status";
const V2_STATUS: &str = "service/local/status";
const CONTEXT_SUFFIX: &str = "nexus";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NexusDialect {
    V3,
    V2,
    Unknown,
}

pub struct NexusFinder {
    ctx: FinderContext,
    base_url: String,
    credentials: Option<Credentials>,
    repository_id: Option<String>,
    state: FinderState,
    detected: Mutex<Option<(NexusDialect, String)>>,
}

impl NexusFinder {
    pub fn new(
        ctx: FinderContext,
        base_url: String,
        credentials: Option<Credentials>,
        repository_id: Option<String>,
    ) -> Self {
        Self {
            ctx,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            repository_id,
            state: FinderState::default(),
            detected: Mutex::new(None),
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

    /// Server dialect, probed on first call.
    pub fn dialect(&self) -> NexusDialect {
        self.endpoint().0
    }

    /// Dialect and the base URL it answered on.
    fn endpoint(&self) -> (NexusDialect, String) {
        let mut detected = self.detected.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = detected.as_ref() {
            return found.clone();
        }

        let found = self.probe();
        // an interrupted probe says nothing about the server
        if !self.state.is_canceled() {
            info!("[nexus] {} detected as {:?}", found.1, found.0);
            *detected = Some(found.clone());
        }
        found
    }

    fn probe(&self) -> (NexusDialect, String) {
        let client = self.client();
        let mut bases = vec![self.base_url.clone()];
        if !self.base_url.ends_with(&format!("/{CONTEXT_SUFFIX}")) {
            bases.push(join_url(&self.base_url, CONTEXT_SUFFIX));
        }

        for base in bases {
            if client.responds(&join_url(&base, V3_STATUS)) {
                return (NexusDialect::V3, base);
            }
            if client.responds(&join_url(&base, V2_STATUS)) {
                return (NexusDialect::V2, base);
            }
        }
        (NexusDialect::Unknown, self.base_url.clone())
    }

    fn embedded_gav(binary: &Path) -> Option<Gav> {
        match read_embedded_gav(binary) {
            Ok(gav) => gav.filter(Gav::is_valid),
            Err(e) => {
                debug!("Cannot read metadata of {}: {}", binary.display(), e);
                None
            }
        }
    }

    fn search(
        &self,
        dialect: NexusDialect,
        base: &str,
        binary: &Path,
        sha1: &str,
    ) -> Option<SourceCandidate> {
        let client = self.client();
        let repository = self.repository_id.as_deref();

        let by_hash = match dialect {
            NexusDialect::V3 => v3::find_by_sha1(&client, base, binary, sha1),
            NexusDialect::V2 => v2::find_by_sha1(&client, base, repository, binary, sha1),
            NexusDialect::Unknown => v3::find_by_sha1(&client, base, binary, sha1)
                .or_else(|| v2::find_by_sha1(&client, base, repository, binary, sha1)),
        };
        if by_hash.is_some() || self.state.is_canceled() {
            return by_hash;
        }

        let gav = Self::embedded_gav(binary)?;
        debug!("[nexus] nothing indexed for {}, trying {}", sha1, gav);
        match dialect {
            NexusDialect::V3 => v3::find_by_gav(&client, base, &gav, binary, sha1),
            NexusDialect::V2 => v2::find_by_gav(&client, base, repository, &gav, binary, sha1),
            NexusDialect::Unknown => v3::find_by_gav(&client, base, &gav, binary, sha1)
                .or_else(|| v2::find_by_gav(&client, base, repository, &gav, binary, sha1)),
        }
    }
}

impl SourceFinder for NexusFinder {
    fn name(&self) -> &str {
        "nexus"
    }

    fn find(&self, binary: &Path, sha1: &str, out: &mut Vec<SourceCandidate>) {
        self.state.begin();
        if self.state.is_canceled() {
            return;
        }

        let (dialect, base) = self.endpoint();
        if let Some(candidate) = self.search(dialect, &base, binary, sha1) {
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
