//! Nexus 2 service API (`service/local`).

use serde::Deserialize;
use sourcescope_api::{Gav, SourceCandidate};
use std::path::Path;
use tracing::debug;

use crate::finder::remote::RemoteClient;
use crate::http::{join_url, with_query};

const IDENTIFY: &str = "service/local/identify/sha1";
const LUCENE_SEARCH: &str = "service/local/lucene/search";
const REDIRECT: &str = "service/local/artifact/maven/redirect";
pub(super) const DEFAULT_REPOSITORY: &str = "public";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Artifact {
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<String>,
    #[serde(default)]
    repo_id: Option<String>,
    #[serde(default)]
    artifact_hits: Vec<ArtifactHit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactHit {
    repository_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LuceneResponse {
    #[serde(default)]
    data: Vec<Artifact>,
}

impl Artifact {
    fn gav(&self) -> Gav {
        Gav {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.version.clone(),
            artifact_link: None,
        }
    }

    fn repository(&self) -> Option<&str> {
        self.repo_id
            .as_deref()
            .or_else(|| self.artifact_hits.iter().find_map(|h| h.repository_id.as_deref()))
    }
}

/// `artifact/maven/redirect` URL for `gav` in `repository`.
pub(super) fn redirect_url(
    base: &str,
    repository: &str,
    gav: &Gav,
    classifier: Option<&str>,
) -> Option<String> {
    let (g, a, v) = gav.parts()?;
    let mut params = vec![("r", repository), ("g", g), ("a", a), ("v", v), ("e", "jar")];
    if let Some(classifier) = classifier {
        params.push(("c", classifier));
    }
    Some(with_query(&join_url(base, REDIRECT), &params))
}

/// Single exact match; the body may or may not be wrapped in `data`.
fn identify(client: &RemoteClient<'_>, base: &str, sha1: &str) -> Option<Artifact> {
    let url = join_url(base, &format!("{IDENTIFY}/{sha1}"));
    let value: serde_json::Value = client.get_json(&url)?;
    let value = match value {
        serde_json::Value::Object(mut map) if map.contains_key("data") => map.remove("data")?,
        other => other,
    };
    match serde_json::from_value::<Artifact>(value) {
        Ok(artifact) if artifact.gav().is_valid() => Some(artifact),
        Ok(_) => None,
        Err(e) => {
            debug!("[nexus] unexpected identify body for {}: {}", sha1, e);
            None
        }
    }
}

fn lucene_search(client: &RemoteClient<'_>, base: &str, sha1: &str) -> Vec<Artifact> {
    let url = with_query(&join_url(base, LUCENE_SEARCH), &[("sha1", sha1)]);
    client
        .get_json::<LuceneResponse>(&url)
        .map(|r| r.data)
        .unwrap_or_default()
}

/// Sources jar when the server has one, else the plain artifact, which is
/// accepted only if it bundles its own sources.
fn fetch_for(
    client: &RemoteClient<'_>,
    base: &str,
    repository: &str,
    gav: &Gav,
    binary: &Path,
    sha1: &str,
) -> Option<SourceCandidate> {
    let sources = redirect_url(base, repository, gav, Some("sources"))?;
    if client.exists(&sources) {
        if let Some(candidate) = client.fetch_candidate(&sources, Some(gav), binary, sha1) {
            return Some(candidate);
        }
    }
    if client.state.is_canceled() {
        return None;
    }
    let plain = redirect_url(base, repository, gav, None)?;
    client.fetch_candidate(&plain, Some(gav), binary, sha1)
}

pub(super) fn find_by_sha1(
    client: &RemoteClient<'_>,
    base: &str,
    configured: Option<&str>,
    binary: &Path,
    sha1: &str,
) -> Option<SourceCandidate> {
    let artifacts = match identify(client, base, sha1) {
        Some(artifact) => vec![artifact],
        None => lucene_search(client, base, sha1),
    };

    for artifact in artifacts {
        if client.state.is_canceled() {
            return None;
        }
        let gav = artifact.gav();
        if !gav.is_valid() {
            continue;
        }
        let repository = artifact
            .repository()
            .or(configured)
            .unwrap_or(DEFAULT_REPOSITORY);
        if let Some(candidate) = fetch_for(client, base, repository, &gav, binary, sha1) {
            return Some(candidate);
        }
    }
    None
}

pub(super) fn find_by_gav(
    client: &RemoteClient<'_>,
    base: &str,
    configured: Option<&str>,
    gav: &Gav,
    binary: &Path,
    sha1: &str,
) -> Option<SourceCandidate> {
    let repository = configured.unwrap_or(DEFAULT_REPOSITORY);
    let sources = redirect_url(base, repository, gav, Some("sources"))?;
    if !client.exists(&sources) {
        return None;
    }
    client.fetch_candidate(&sources, Some(gav), binary, sha1)
}
