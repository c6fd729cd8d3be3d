use serde::{Deserialize, Serialize};
use std::fmt;

/// Maven coordinate of a published library.
///
/// Any field may be missing when the coordinate was harvested from a partial
/// search response. `artifact_link` records how the coordinate was found (a
/// search hit URL, a repository path) and takes part in equality, so two hits
/// for the same `g:a:v` with different links stay distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gav {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_link: Option<String>,
}

impl Gav {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: Some(group_id.into()),
            artifact_id: Some(artifact_id.into()),
            version: Some(version.into()),
            artifact_link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.artifact_link = Some(link.into());
        self
    }

    /// A coordinate is usable for URL construction only when group, artifact
    /// and version are all present and non-blank.
    pub fn is_valid(&self) -> bool {
        fn present(field: &Option<String>) -> bool {
            field.as_deref().is_some_and(|s| !s.trim().is_empty())
        }
        present(&self.group_id) && present(&self.artifact_id) && present(&self.version)
    }

    /// Returns `(group, artifact, version)` for a valid coordinate.
    pub fn parts(&self) -> Option<(&str, &str, &str)> {
        if !self.is_valid() {
            return None;
        }
        Some((
            self.group_id.as_deref()?,
            self.artifact_id.as_deref()?,
            self.version.as_deref()?,
        ))
    }

    /// Group id with dots replaced by slashes (`com.acme` -> `com/acme`).
    pub fn group_path(&self) -> Option<String> {
        self.parts().map(|(g, _, _)| g.replace('.', "/"))
    }

    /// File name of an artifact file, e.g. `lib-1.0-sources.jar`.
    pub fn file_name(&self, classifier: Option<&str>, extension: &str) -> Option<String> {
        let (_, a, v) = self.parts()?;
        Some(match classifier {
            Some(c) if !c.is_empty() => format!("{a}-{v}-{c}.{extension}"),
            _ => format!("{a}-{v}.{extension}"),
        })
    }

    /// Repository-relative path in the Maven 2 layout, e.g.
    /// `com/acme/lib/1.0/lib-1.0-sources.jar`.
    pub fn repository_path(&self, classifier: Option<&str>, extension: &str) -> Option<String> {
        let (_, a, v) = self.parts()?;
        let group_path = self.group_path()?;
        let file = self.file_name(classifier, extension)?;
        Some(format!("{group_path}/{a}/{v}/{file}"))
    }

    /// Parse a repository-relative Maven 2 path back into a coordinate.
    ///
    /// Path format: `group/as/path/{artifact}/{version}/{artifact}-{version}[-classifier].{ext}`
    pub fn from_repository_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        // group (>= 1 segment) / artifact / version / file
        if segments.len() < 4 {
            return None;
        }

        let file = segments[segments.len() - 1];
        let version = segments[segments.len() - 2];
        let artifact = segments[segments.len() - 3];
        let group = segments[..segments.len() - 3].join(".");

        if !file.starts_with(&format!("{artifact}-")) {
            return None;
        }

        Some(Self::new(group, artifact, version).with_link(trimmed.to_string()))
    }

    /// The same coordinate without the discovery link.
    pub fn without_link(&self) -> Self {
        Self {
            artifact_link: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for Gav {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.group_id.as_deref().unwrap_or("?"),
            self.artifact_id.as_deref().unwrap_or("?"),
            self.version.as_deref().unwrap_or("?")
        )
    }
}
