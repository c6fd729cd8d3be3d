//! Read-only access to jar-like archives.

pub mod metadata;
pub mod verify;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

use crate::error::Result;

pub use metadata::{embedded_gavs, read_embedded_gav};
pub use verify::{SourceCheck, Verdict, verify_candidate};

/// File extensions accepted as source entries
pub const SOURCE_EXTENSIONS: &[&str] = &["java", "kt", "scala", "groovy"];

fn open(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

/// Names of all file entries (directories excluded).
pub fn entry_names(path: &Path) -> Result<Vec<String>> {
    let archive = open(path)?;
    Ok(archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(str::to_string)
        .collect())
}

/// Read every entry whose name satisfies `filter` as UTF-8 text.
pub fn read_text_entries(
    path: &Path,
    filter: impl Fn(&str) -> bool,
) -> Result<Vec<(String, String)>> {
    let mut archive = open(path)?;
    let mut out = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !filter(entry.name()) {
            continue;
        }
        let name = entry.name().to_string();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        out.push((name, String::from_utf8_lossy(&bytes).into_owned()));
    }

    Ok(out)
}

pub fn is_class_entry(name: &str) -> bool {
    name.ends_with(".class")
}

pub fn is_source_entry(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(_, ext)| SOURCE_EXTENSIONS.contains(&ext))
}
