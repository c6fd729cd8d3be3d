//! Coordinate identification from `META-INF/maven/**/pom.properties`.

use sourcescope_api::Gav;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::error::Result;

const MAVEN_META_PREFIX: &str = "META-INF/maven/";
const POM_PROPERTIES: &str = "pom.properties";

fn is_pom_properties(name: &str) -> bool {
    name.starts_with(MAVEN_META_PREFIX) && name.ends_with(&format!("/{POM_PROPERTIES}"))
}

/// All distinct, complete coordinates embedded in the archive.
pub fn embedded_gavs(binary: &Path) -> Result<Vec<Gav>> {
    let mut seen = HashSet::new();
    let mut gavs = Vec::new();

    for (name, text) in super::read_text_entries(binary, is_pom_properties)? {
        let gav = parse_pom_properties(&text);
        if !gav.is_valid() {
            debug!("Ignoring incomplete {} in {}", name, binary.display());
            continue;
        }
        if seen.insert(gav.clone()) {
            gavs.push(gav);
        }
    }

    Ok(gavs)
}

/// The embedded coordinate of a binary, if it has exactly one.
///
/// An archive carrying several distinct coordinates is a merged or shaded jar;
/// none of them is trusted.
pub fn read_embedded_gav(binary: &Path) -> Result<Option<Gav>> {
    let mut gavs = embedded_gavs(binary)?;
    match gavs.len() {
        1 => Ok(gavs.pop()),
        0 => Ok(None),
        n => {
            debug!(
                "{} embeds {} coordinates, treating as merged archive",
                binary.display(),
                n
            );
            Ok(None)
        }
    }
}

/// Parse the subset of Java properties syntax Maven writes.
pub fn parse_pom_properties(text: &str) -> Gav {
    let mut gav = Gav::default();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some(idx) = line.find(['=', ':']) else {
            continue;
        };
        let key = line[..idx].trim();
        let value = line[idx + 1..].trim().to_string();

        match key {
            "groupId" => gav.group_id = Some(value),
            "artifactId" => gav.artifact_id = Some(value),
            "version" => gav.version = Some(value),
            _ => {}
        }
    }

    gav
}
