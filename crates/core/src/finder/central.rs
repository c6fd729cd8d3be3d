//! Maven Central search finder.
//!
//! 1. `q=1:"<sha1>"` reverse-maps the binary hash to coordinates
//! 2. `q=g:"…" AND a:"…" AND v:"…" AND l:"sources"` confirms a sources jar exists
//! 3. the sources jar is fetched from the repository in Maven 2 layout

use serde::Deserialize;
use sourcescope_api::{Gav, SourceCandidate, SourceFinder};
use std::path::Path;
use tracing::debug;

use super::remote::RemoteClient;
use super::{FinderContext, FinderState};
use crate::archive::read_embedded_gav;
use crate::http::{join_url, with_query};

const SEARCH_ROWS: &str = "20";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchDocs,
}

#[derive(Debug, Deserialize)]
struct SearchDocs {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    g: Option<String>,
    #[serde(default)]
    a: Option<String>,
    #[serde(default)]
    v: Option<String>,
    #[serde(rename = "latestVersion", default)]
    latest_version: Option<String>,
}

impl SearchDoc {
    fn into_gav(self) -> Gav {
        Gav {
            group_id: self.g,
            artifact_id: self.a,
            // some responses only carry the latest version
            version: self.v.or(self.latest_version),
            artifact_link: self.id,
        }
    }
}

pub struct MavenCentralFinder {
    ctx: FinderContext,
    search_url: String,
    repository_url: String,
    state: FinderState,
}

impl MavenCentralFinder {
    pub fn new(ctx: FinderContext, search_url: String, repository_url: String) -> Self {
        Self {
            ctx,
            search_url,
            repository_url,
            state: FinderState::default(),
        }
    }

    fn client(&self) -> RemoteClient<'_> {
        RemoteClient {
            finder: self.name(),
            ctx: &self.ctx,
            state: &self.state,
            credentials: None,
        }
    }

    fn search(&self, query: &str) -> Vec<SearchDoc> {
        let url = with_query(
            &self.search_url,
            &[("q", query), ("rows", SEARCH_ROWS), ("wt", "json")],
        );
        self.client()
            .get_json::<SearchResponse>(&url)
            .map(|r| r.response.docs)
            .unwrap_or_default()
    }

    /// Coordinates published with this exact binary hash.
    pub fn coordinates_for_sha1(&self, sha1: &str) -> Vec<Gav> {
        let mut gavs: Vec<Gav> = Vec::new();
        for gav in self
            .search(&format!("1:\"{sha1}\""))
            .into_iter()
            .map(SearchDoc::into_gav)
        {
            if !gavs.contains(&gav) {
                gavs.push(gav);
            }
        }
        gavs
    }

    fn has_sources(&self, gav: &Gav) -> bool {
        let Some((g, a, v)) = gav.parts() else {
            return false;
        };
        !self
            .search(&format!("g:\"{g}\" AND a:\"{a}\" AND v:\"{v}\" AND l:\"sources\""))
            .is_empty()
    }

    fn sources_url(&self, gav: &Gav) -> Option<String> {
        Some(join_url(
            &self.repository_url,
            &gav.repository_path(Some("sources"), "jar")?,
        ))
    }
}

impl SourceFinder for MavenCentralFinder {
    fn name(&self) -> &str {
        "maven-central"
    }

    fn find(&self, binary: &Path, sha1: &str, out: &mut Vec<SourceCandidate>) {
        self.state.begin();
        if self.state.is_canceled() {
            return;
        }

        let mut gavs = self.coordinates_for_sha1(sha1);
        if gavs.is_empty() {
            match read_embedded_gav(binary) {
                Ok(Some(gav)) => gavs.push(gav),
                Ok(None) => {}
                Err(e) => debug!("Cannot read metadata of {}: {}", binary.display(), e),
            }
        }

        let client = self.client();
        for gav in gavs.iter().filter(|g| g.is_valid()) {
            if self.state.is_canceled() {
                return;
            }
            if !self.has_sources(gav) {
                debug!("[maven-central] no sources published for {}", gav);
                continue;
            }
            let Some(url) = self.sources_url(gav) else {
                continue;
            };
            if let Some(candidate) = client.fetch_candidate(&url, Some(gav), binary, sha1) {
                out.push(candidate);
                return;
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::testing::Fixture;
    use crate::test_support::acme_sources_bytes;
    use serde_json::json;

    const SEARCH: &str = "https://search.example.com/solrsearch/select";
    const REPO: &str = "https://repo.example.com/maven2";

    fn finder(fixture: &Fixture) -> MavenCentralFinder {
        MavenCentralFinder::new(fixture.ctx.clone(), SEARCH.to_string(), REPO.to_string())
    }

    fn query_url(query: &str) -> String {
        with_query(SEARCH, &[("q", query), ("rows", "20"), ("wt", "json")])
    }

    fn sources_query() -> String {
        query_url("g:\"com.acme\" AND a:\"lib\" AND v:\"1.0\" AND l:\"sources\"")
    }

    #[test]
    fn test_hash_search_then_sources_download() {
        let fixture = Fixture::new();
        let (binary, sha1) = fixture.acme_binary();
        fixture.http.route_json(
            query_url(&format!("1:\"{sha1}\"")),
            json!({"response": {"numFound": 1, "docs": [
                {"id": "com.acme:lib:1.0", "g": "com.acme", "a": "lib", "v": "1.0"}
            ]}}),
        );
        fixture.http.route_json(
            sources_query(),
            json!({"response": {"docs": [{"g": "com.acme", "a": "lib", "v": "1.0", "ec": ["-sources.jar"]}]}}),
        );
        let url = format!("{REPO}/com/acme/lib/1.0/lib-1.0-sources.jar");
        fixture.http.route(&url, 200, acme_sources_bytes());

        let finder = finder(&fixture);
        let mut out = Vec::new();
        finder.find(&binary, &sha1, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].download_url.as_deref(), Some(url.as_str()));
        assert_eq!(finder.download_url().as_deref(), Some(url.as_str()));
    }

    #[test]
    fn test_latest_version_fallback() {
        let fixture = Fixture::new();
        fixture.http.route_json(
            query_url("1:\"abc\""),
            json!({"response": {"docs": [{"id": "com.acme:lib", "g": "com.acme", "a": "lib", "latestVersion": "2.0"}]}}),
        );

        let gavs = finder(&fixture).coordinates_for_sha1("abc");
        assert_eq!(gavs.len(), 1);
        assert_eq!(gavs[0].version.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_embedded_coordinate_used_when_hash_unknown() {
        let fixture = Fixture::new();
        let (binary, sha1) = fixture.acme_binary();
        fixture.http.route_json(
            query_url(&format!("1:\"{sha1}\"")),
            json!({"response": {"docs": []}}),
        );
        fixture
            .http
            .route_json(sources_query(), json!({"response": {"docs": [{"g": "com.acme"}]}}));
        fixture.http.route(
            format!("{REPO}/com/acme/lib/1.0/lib-1.0-sources.jar"),
            200,
            acme_sources_bytes(),
        );

        let mut out = Vec::new();
        finder(&fixture).find(&binary, &sha1, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_no_published_sources() {
        let fixture = Fixture::new();
        let (binary, sha1) = fixture.acme_binary();
        fixture.http.route_json(
            query_url(&format!("1:\"{sha1}\"")),
            json!({"response": {"docs": [{"g": "com.acme", "a": "lib", "v": "1.0"}]}}),
        );
        fixture
            .http
            .route_json(sources_query(), json!({"response": {"docs": []}}));

        let finder = finder(&fixture);
        let mut out = Vec::new();
        finder.find(&binary, &sha1, &mut out);
        assert!(out.is_empty());
        assert!(finder.download_url().is_none());
    }

    #[test]
    fn test_malformed_response_is_no_result() {
        let fixture = Fixture::new();
        let (binary, sha1) = fixture.acme_binary();
        fixture
            .http
            .route(query_url(&format!("1:\"{sha1}\"")), 200, b"<html>".to_vec());
        fixture.http.route(sources_query(), 500, Vec::new());

        let mut out = Vec::new();
        finder(&fixture).find(&binary, &sha1, &mut out);
        assert!(out.is_empty());
    }
}
