//! Request helpers shared by remote finders.
//!
//! Every method here swallows failures: a timeout, an error status or an
//! undecodable body is logged and reported as "nothing found", so one broken
//! repository only costs its own slot in the chain.

use serde::de::DeserializeOwned;
use sourcescope_api::{Gav, SourceCandidate};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::{FinderContext, FinderState};
use crate::archive::{Verdict, verify_candidate};
use crate::http::{Credentials, HttpRequest, HttpResponse};

pub const SOURCES_SUFFIX: &str = "-sources.jar";

pub struct RemoteClient<'a> {
    pub finder: &'a str,
    pub ctx: &'a FinderContext,
    pub state: &'a FinderState,
    pub credentials: Option<&'a Credentials>,
}

impl<'a> RemoteClient<'a> {
    /// Send a request unless the finder was canceled. `None` on transport failure.
    pub fn send(&self, request: HttpRequest) -> Option<HttpResponse> {
        if self.state.is_canceled() {
            return None;
        }
        let request = request.credentials(self.credentials);
        match self.ctx.http.execute(&request) {
            Ok(response) => Some(response),
            Err(e) => {
                debug!("[{}] {} failed: {}", self.finder, request.url, e);
                None
            }
        }
    }

    /// GET a JSON document.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        self.get_json_with(HttpRequest::get(url).json())
    }

    pub fn get_json_with<T: DeserializeOwned>(&self, request: HttpRequest) -> Option<T> {
        let url = request.url.clone();
        let response = self.send(request)?;
        match response.json::<T>() {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("[{}] {} returned no usable body: {}", self.finder, url, e);
                None
            }
        }
    }

    /// Whether a GET on `url` answers with a 2xx status.
    pub fn responds(&self, url: &str) -> bool {
        self.send(HttpRequest::get(url).json())
            .is_some_and(|r| r.is_success())
    }

    /// Preflight existence check; falls back to GET for servers rejecting HEAD.
    pub fn exists(&self, url: &str) -> bool {
        match self.send(HttpRequest::head(url)) {
            Some(r) if r.is_success() => true,
            Some(r) if r.status == 405 || r.status == 501 => self
                .send(HttpRequest::get(url))
                .is_some_and(|r| r.is_success()),
            _ => false,
        }
    }

    /// For a main-jar URL, the `-sources.jar` sibling when the server has it.
    pub fn sources_sibling(&self, url: &str) -> Option<String> {
        if url.ends_with(SOURCES_SUFFIX) {
            return Some(url.to_string());
        }
        let sibling = format!("{}{}", url.strip_suffix(".jar")?, SOURCES_SUFFIX);
        if self.exists(&sibling) {
            Some(sibling)
        } else {
            debug!("[{}] no sources next to {}", self.finder, url);
            None
        }
    }

    /// Download `url`, verify it against `binary` and build a candidate.
    ///
    /// A URL already recorded in the binding cache is reused without a new
    /// download. Rejected downloads are deleted.
    pub fn fetch_candidate(
        &self,
        url: &str,
        gav: Option<&Gav>,
        binary: &Path,
        sha1: &str,
    ) -> Option<SourceCandidate> {
        if self.state.is_canceled() {
            return None;
        }

        match self.ctx.bindings.find_by_url(url) {
            Ok(Some(record)) => {
                if let Verdict::Accepted { confidence } = verify_candidate(binary, &record.source) {
                    debug!("[{}] reusing {} for {}", self.finder, record.source.display(), url);
                    return Some(self.accept(
                        SourceCandidate::new(self.finder, binary.to_path_buf(), sha1, record.source.clone())
                            .with_temp_file(record.attachable_temp()),
                        url,
                        gav,
                        confidence,
                    ));
                }
            }
            Ok(None) => {}
            Err(e) => debug!("[{}] binding lookup failed: {}", self.finder, e),
        }

        let response = self.send(HttpRequest::get(url))?;
        if !response.is_success() {
            debug!("[{}] {} answered {}", self.finder, url, response.status);
            return None;
        }

        let file_name = gav
            .and_then(|g| g.file_name(Some("sources"), "jar"))
            .or_else(|| {
                url.rsplit('/')
                    .next()
                    .filter(|s| s.ends_with(".jar"))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "sources.jar".to_string());
        let dest = self.ctx.storage.download_slot(url, &file_name);

        if let Err(e) = write_download(&dest, &response.body) {
            debug!("[{}] failed to store {}: {}", self.finder, dest.display(), e);
            return None;
        }

        match verify_candidate(binary, &dest) {
            Verdict::Accepted { confidence } => Some(self.accept(
                SourceCandidate::new(self.finder, binary.to_path_buf(), sha1, dest),
                url,
                gav,
                confidence,
            )),
            verdict => {
                debug!("[{}] rejected {}: {:?}", self.finder, url, verdict);
                let _ = fs::remove_file(&dest);
                if let Some(slot) = dest.parent() {
                    let _ = fs::remove_dir(slot);
                }
                None
            }
        }
    }

    fn accept(
        &self,
        candidate: SourceCandidate,
        url: &str,
        gav: Option<&Gav>,
        confidence: u8,
    ) -> SourceCandidate {
        self.state.record_url(Some(url.to_string()));
        let candidate = candidate
            .with_download_url(url)
            .with_confidence(confidence);
        match gav {
            Some(gav) => candidate.with_gav(gav.clone()),
            None => candidate,
        }
    }
}

fn write_download(dest: &Path, body: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, body)
}
