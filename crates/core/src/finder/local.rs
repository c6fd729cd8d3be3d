//! Local package-manager cache finder.
//!
//! Looks for an already-downloaded sources jar in:
//! - the Maven local repository: `~/.m2/repository/{group/as/path}/{artifact}/{version}/`
//! - the Gradle module cache: `~/.gradle/caches/modules-2/files-2.1/{group}/{artifact}/{version}/{hash}/`
//!
//! No network access; the coordinate comes from the binary's embedded
//! metadata or from its own location inside one of those caches.

use sourcescope_api::{Gav, SourceCandidate, SourceFinder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::FinderState;
use super::remote::SOURCES_SUFFIX;
use crate::archive::{Verdict, read_embedded_gav, verify_candidate};

pub struct LocalCacheFinder {
    maven_repository: Option<PathBuf>,
    gradle_cache: Option<PathBuf>,
    state: FinderState,
}

impl LocalCacheFinder {
    pub fn new(maven_repository: Option<PathBuf>, gradle_cache: Option<PathBuf>) -> Self {
        Self {
            maven_repository,
            gradle_cache,
            state: FinderState::default(),
        }
    }

    /// Coordinates worth probing, embedded metadata first.
    fn coordinates(&self, binary: &Path) -> Vec<Gav> {
        let mut gavs = Vec::new();

        match read_embedded_gav(binary) {
            Ok(Some(gav)) => gavs.push(gav),
            Ok(None) => {}
            Err(e) => debug!("Cannot read metadata of {}: {}", binary.display(), e),
        }

        for gav in [self.parse_gradle_path(binary), self.parse_maven_path(binary)]
            .into_iter()
            .flatten()
        {
            if !gavs.iter().any(|g| g.without_link() == gav.without_link()) {
                gavs.push(gav);
            }
        }

        gavs
    }

    /// Parse Gradle cache path to extract Maven coordinates
    /// Path format: files-2.1/{group}/{artifact}/{version}/{hash}/{file}
    fn parse_gradle_path(&self, binary: &Path) -> Option<Gav> {
        let relative = binary.strip_prefix(self.gradle_cache.as_ref()?).ok()?;
        let components: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();

        // Expected: group/artifact/version/hash/file.jar
        if components.len() != 5 {
            return None;
        }

        Some(Gav::new(
            components[0].clone(),
            components[1].clone(),
            components[2].clone(),
        ))
    }

    /// Path format: repository/{group/as/path}/{artifact}/{version}/{file}
    fn parse_maven_path(&self, binary: &Path) -> Option<Gav> {
        let relative = binary.strip_prefix(self.maven_repository.as_ref()?).ok()?;
        let joined: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        Gav::from_repository_path(&joined.join("/")).map(|g| g.without_link())
    }

    fn maven_sources(&self, gav: &Gav) -> Option<PathBuf> {
        let path = self
            .maven_repository
            .as_ref()?
            .join(gav.repository_path(Some("sources"), "jar")?);
        path.is_file().then_some(path)
    }

    /// The single hash directory under `{group}/{artifact}/{version}` holding
    /// the sources jar. Ambiguous layouts yield nothing.
    fn gradle_sources(&self, gav: &Gav) -> Option<PathBuf> {
        let (g, a, v) = gav.parts()?;
        let version_dir = self.gradle_cache.as_ref()?.join(g).join(a).join(v);
        let file_name = gav.file_name(Some("sources"), "jar")?;
        single_candidate(&version_dir, None, |name| name == file_name)
    }

    /// A binary that itself sits in a hash directory: the sources jar is in
    /// exactly one of the sibling hash directories.
    fn gradle_sibling_sources(&self, binary: &Path) -> Option<PathBuf> {
        let cache = self.gradle_cache.as_ref()?;
        if !binary.starts_with(cache) {
            return None;
        }
        let hash_dir = binary.parent()?;
        let version_dir = hash_dir.parent()?;
        let stem = binary.file_stem()?.to_string_lossy().to_string();
        let wanted = format!("{stem}{SOURCES_SUFFIX}");

        single_candidate(version_dir, Some(hash_dir), |name| name == wanted)
    }

    fn accept(&self, binary: &Path, sha1: &str, source: PathBuf, gav: Option<&Gav>) -> Option<SourceCandidate> {
        match verify_candidate(binary, &source) {
            Verdict::Accepted { confidence } => {
                let candidate = SourceCandidate::new(self.name(), binary.to_path_buf(), sha1, source)
                    .with_confidence(confidence);
                Some(match gav {
                    Some(gav) => candidate.with_gav(gav.clone()),
                    None => candidate,
                })
            }
            verdict => {
                debug!("Local sources {} rejected: {:?}", source.display(), verdict);
                None
            }
        }
    }
}

/// Scan the subdirectories of `parent` (except `exclude`) for a file accepted
/// by `matches`. Returns it only when exactly one directory has one.
fn single_candidate(
    parent: &Path,
    exclude: Option<&Path>,
    matches: impl Fn(&str) -> bool,
) -> Option<PathBuf> {
    let mut found = Vec::new();

    for entry in fs::read_dir(parent).ok()?.flatten() {
        let dir = entry.path();
        if !dir.is_dir() || Some(dir.as_path()) == exclude {
            continue;
        }
        let Ok(files) = fs::read_dir(&dir) else {
            continue;
        };
        let hit = files
            .flatten()
            .map(|f| f.path())
            .find(|p| p.is_file() && p.file_name().is_some_and(|n| matches(&n.to_string_lossy())));
        if let Some(hit) = hit {
            found.push(hit);
        }
    }

    match found.len() {
        1 => found.pop(),
        0 => None,
        n => {
            debug!("{} candidate directories under {}, skipping", n, parent.display());
            None
        }
    }
}

impl SourceFinder for LocalCacheFinder {
    fn name(&self) -> &str {
        "local"
    }

    fn find(&self, binary: &Path, sha1: &str, out: &mut Vec<SourceCandidate>) {
        self.state.begin();
        if self.state.is_canceled() {
            return;
        }

        if let Some(source) = self.gradle_sibling_sources(binary) {
            if let Some(candidate) = self.accept(binary, sha1, source, None) {
                out.push(candidate);
                return;
            }
        }

        for gav in self.coordinates(binary) {
            if self.state.is_canceled() {
                return;
            }
            let probes = [self.maven_sources(&gav), self.gradle_sources(&gav)];
            for source in probes.into_iter().flatten() {
                if let Some(candidate) = self.accept(binary, sha1, source, Some(&gav)) {
                    out.push(candidate);
                    return;
                }
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
        None
    }

    fn accepts_without_url(&self) -> bool {
        true
    }
}
