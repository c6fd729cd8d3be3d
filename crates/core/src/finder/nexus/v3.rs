//! Nexus 3 REST search (`service/rest/v1`).

use serde::Deserialize;
use serde::de::DeserializeOwned;
use sourcescope_api::{Gav, SourceCandidate};
use std::path::Path;
use tracing::{debug, warn};

use crate::finder::remote::{RemoteClient, SOURCES_SUFFIX};
use crate::http::{join_url, with_query};

const ASSETS_SEARCH: &str = "service/rest/v1/search/assets";
const COMPONENTS_SEARCH: &str = "service/rest/v1/search";

/// Upper bound on followed continuation tokens
pub(super) const MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "continuationToken", default)]
    continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    #[serde(rename = "downloadUrl")]
    download_url: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    maven2: Option<Maven2>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Maven2 {
    group_id: Option<String>,
    artifact_id: Option<String>,
    #[serde(default)]
    base_version: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Component {
    #[serde(default)]
    assets: Vec<Asset>,
}

impl Asset {
    fn gav(&self) -> Option<Gav> {
        if let Some(m) = &self.maven2 {
            let gav = Gav {
                group_id: m.group_id.clone(),
                artifact_id: m.artifact_id.clone(),
                version: m.base_version.clone().or_else(|| m.version.clone()),
                artifact_link: Some(self.download_url.clone()),
            };
            if gav.is_valid() {
                return Some(gav);
            }
        }
        self.path.as_deref().and_then(Gav::from_repository_path)
    }

    fn is_sources(&self) -> bool {
        self.download_url.ends_with(SOURCES_SUFFIX)
    }
}

/// Collect the items of every page, following `continuationToken`.
fn paginate<T: DeserializeOwned>(
    client: &RemoteClient<'_>,
    endpoint: &str,
    params: &[(&str, &str)],
) -> Vec<T> {
    let mut items = Vec::new();
    let mut token: Option<String> = None;

    for page_number in 0..MAX_PAGES {
        let mut query = params.to_vec();
        if let Some(token) = token.as_deref() {
            query.push(("continuationToken", token));
        }
        let url = with_query(endpoint, &query);

        let Some(page) = client.get_json::<Page<T>>(&url) else {
            break;
        };
        items.extend(page.items);

        match page.continuation_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => return items,
        }
        if page_number + 1 == MAX_PAGES {
            warn!("[nexus] {} still paginating after {} pages, stopping", endpoint, MAX_PAGES);
        }
    }
    items
}

/// Try each `(coordinate, url)` hit, sources first, resolving main-jar URLs
/// to their `-sources.jar` sibling.
fn fetch_first(
    client: &RemoteClient<'_>,
    mut assets: Vec<Asset>,
    binary: &Path,
    sha1: &str,
) -> Option<SourceCandidate> {
    // stable: keeps server order within each group
    assets.sort_by_key(|a| !a.is_sources());

    for asset in assets {
        if client.state.is_canceled() {
            return None;
        }
        let Some(url) = client.sources_sibling(&asset.download_url) else {
            continue;
        };
        let gav = asset.gav();
        if let Some(candidate) = client.fetch_candidate(&url, gav.as_ref(), binary, sha1) {
            return Some(candidate);
        }
    }
    None
}

pub(super) fn find_by_sha1(
    client: &RemoteClient<'_>,
    base: &str,
    binary: &Path,
    sha1: &str,
) -> Option<SourceCandidate> {
    let mut assets: Vec<Asset> =
        paginate(client, &join_url(base, ASSETS_SEARCH), &[("sha1", sha1)]);

    if assets.is_empty() {
        debug!("[nexus] no asset hit for {}, searching components", sha1);
        let components: Vec<Component> =
            paginate(client, &join_url(base, COMPONENTS_SEARCH), &[("sha1", sha1)]);
        assets = components
            .into_iter()
            .filter_map(|c| {
                let mut assets = c.assets;
                let pick = assets
                    .iter()
                    .position(Asset::is_sources)
                    .unwrap_or(0);
                (!assets.is_empty()).then(|| assets.swap_remove(pick))
            })
            .collect();
    }

    fetch_first(client, assets, binary, sha1)
}

pub(super) fn find_by_gav(
    client: &RemoteClient<'_>,
    base: &str,
    gav: &Gav,
    binary: &Path,
    sha1: &str,
) -> Option<SourceCandidate> {
    let (g, a, v) = gav.parts()?;
    let assets: Vec<Asset> = paginate(
        client,
        &join_url(base, ASSETS_SEARCH),
        &[
            ("maven.groupId", g),
            ("maven.artifactId", a),
            ("maven.baseVersion", v),
            ("maven.classifier", "sources"),
        ],
    );
    let assets = assets
        .into_iter()
        .filter(|a| a.download_url.ends_with(".jar"))
        .collect();
    fetch_first(client, assets, binary, sha1)
}
