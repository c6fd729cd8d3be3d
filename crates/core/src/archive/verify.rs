//! Candidate verification.
//!
//! A candidate source archive is accepted only when both checks pass:
//! - [`SourceCheck`]: a binary with class files needs at least one source entry
//! - [`SourceCheck::correspondence`]: at least one top-level class of the binary has a
//!   matching source file path

use std::collections::HashSet;
use std::path::Path;

use super::{entry_names, is_class_entry, is_source_entry};
use crate::error::Result;

/// Outcome of verifying one candidate against its binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted { confidence: u8 },
    /// The candidate has no source entries at all
    WrongSource,
    /// Source entries exist but none belongs to the binary's classes
    Unrelated,
    /// Either archive could not be read
    Unreadable(String),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }
}

/// Structural check over archive entry names.
pub struct SourceCheck {
    class_entries: Vec<String>,
    source_entries: Vec<String>,
}

impl SourceCheck {
    pub fn load(binary: &Path, source: &Path) -> Result<Self> {
        let class_entries = entry_names(binary)?
            .into_iter()
            .filter(|n| is_class_entry(n))
            .collect();
        let source_entries = entry_names(source)?
            .into_iter()
            .filter(|n| is_source_entry(n))
            .collect();

        Ok(Self {
            class_entries,
            source_entries,
        })
    }

    /// False when the binary has classes but the candidate has no sources.
    pub fn passes(&self) -> bool {
        self.class_entries.is_empty() || !self.source_entries.is_empty()
    }

    /// Share (0..=100) of the binary's top-level classes backed by a source file,
    /// or `None` when no class matches.
    pub fn correspondence(&self) -> Option<u8> {
        let classes: HashSet<String> = self
            .class_entries
            .iter()
            .filter_map(|n| top_level_class(n))
            .collect();

        if classes.is_empty() {
            return Some(0);
        }

        let sources: HashSet<&str> = self
            .source_entries
            .iter()
            .filter_map(|n| n.rsplit_once('.').map(|(stem, _)| stem))
            .collect();

        let matched = classes
            .iter()
            .filter(|class| {
                sources.contains(class.as_str())
                    || class
                        .strip_suffix("Kt")
                        .is_some_and(|facade| sources.contains(facade))
            })
            .count();

        if matched == 0 {
            return None;
        }

        Some(((matched * 100) / classes.len()).clamp(1, 100) as u8)
    }
}

/// `com/acme/Lib$Inner.class` -> `com/acme/Lib`; metadata classes are skipped.
fn top_level_class(name: &str) -> Option<String> {
    if name.starts_with("META-INF/") {
        return None;
    }
    let stem = name.strip_suffix(".class")?;
    let file = stem.rsplit('/').next().unwrap_or(stem);
    if file == "module-info" || file == "package-info" {
        return None;
    }

    let top = match stem.find('$') {
        Some(idx) => &stem[..idx],
        None => stem,
    };
    Some(top.to_string())
}

/// Run both checks. Never fails; unreadable archives yield a rejecting verdict.
pub fn verify_candidate(binary: &Path, source: &Path) -> Verdict {
    let check = match SourceCheck::load(binary, source) {
        Ok(check) => check,
        Err(e) => return Verdict::Unreadable(e.to_string()),
    };

    if !check.passes() {
        return Verdict::WrongSource;
    }

    match check.correspondence() {
        Some(confidence) => Verdict::Accepted { confidence },
        None => Verdict::Unrelated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_jar;

    fn fixture(binary: &[(&str, &str)], source: &[(&str, &str)]) -> (tempfile::TempDir, Verdict) {
        let temp = tempfile::tempdir().unwrap();
        let bin = temp.path().join("lib.jar");
        let src = temp.path().join("lib-sources.jar");
        write_jar(&bin, binary);
        write_jar(&src, source);
        let verdict = verify_candidate(&bin, &src);
        (temp, verdict)
    }

    #[test]
    fn test_matching_sources_accepted() {
        let (_t, verdict) = fixture(
            &[
                ("com/acme/Lib.class", "x"),
                ("com/acme/Lib$Inner.class", "x"),
                ("com/acme/Util.class", "x"),
            ],
            &[("com/acme/Lib.java", "class Lib {}"), ("com/acme/Util.java", "class Util {}")],
        );
        assert_eq!(verdict, Verdict::Accepted { confidence: 100 });
    }

    #[test]
    fn test_empty_source_archive_is_wrong_source() {
        let (_t, verdict) = fixture(
            &[("com/acme/Lib.class", "x")],
            &[("META-INF/MANIFEST.MF", "Manifest-Version: 1.0")],
        );
        assert_eq!(verdict, Verdict::WrongSource);
    }

    #[test]
    fn test_unrelated_sources_rejected() {
        let (_t, verdict) = fixture(
            &[("com/acme/Lib.class", "x")],
            &[("org/other/Thing.java", "class Thing {}")],
        );
        assert_eq!(verdict, Verdict::Unrelated);
    }

    #[test]
    fn test_partial_match_scores_share() {
        let (_t, verdict) = fixture(
            &[
                ("com/acme/A.class", "x"),
                ("com/acme/B.class", "x"),
                ("com/acme/C.class", "x"),
                ("com/acme/D.class", "x"),
            ],
            &[("com/acme/A.java", "class A {}")],
        );
        assert_eq!(verdict, Verdict::Accepted { confidence: 25 });
    }

    #[test]
    fn test_kotlin_facade_matches_file() {
        let (_t, verdict) = fixture(
            &[("com/acme/ExtensionsKt.class", "x")],
            &[("com/acme/Extensions.kt", "fun x() = 1")],
        );
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_resource_only_binary_accepts_any_source() {
        let (_t, verdict) = fixture(
            &[("META-INF/services/x", "y")],
            &[("README.txt", "nothing")],
        );
        assert_eq!(verdict, Verdict::Accepted { confidence: 0 });
    }

    #[test]
    fn test_top_level_class() {
        assert_eq!(top_level_class("a/B$C$D.class").as_deref(), Some("a/B"));
        assert_eq!(top_level_class("module-info.class"), None);
        assert_eq!(top_level_class("a/package-info.class"), None);
        assert_eq!(top_level_class("META-INF/versions/9/a/B.class"), None);
    }
}
