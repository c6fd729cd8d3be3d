//! Fixtures shared by unit tests.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Write a jar with the given `(name, content)` entries. Names ending in `/`
/// become directory entries.
pub fn write_jar(path: &Path, entries: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    for (name, content) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
    }
    zip.finish().unwrap();
}

pub fn jar_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("fixture.jar");
    write_jar(&path, entries);
    fs::read(path).unwrap()
}

pub fn pom_properties(group: &str, artifact: &str, version: &str) -> String {
    format!("#Generated by Maven\ngroupId={group}\nartifactId={artifact}\nversion={version}\n")
}

/// A binary jar `com/acme/Lib.class` carrying `com.acme:lib:1.0` metadata.
pub fn acme_binary(path: &Path) {
    let props = pom_properties("com.acme", "lib", "1.0");
    write_jar(
        path,
        &[
            ("com/acme/Lib.class", "\u{CA}\u{FE}"),
            ("META-INF/maven/com.acme/lib/pom.properties", props.as_str()),
        ],
    );
}

/// Sources matching [`acme_binary`].
pub fn acme_sources(path: &Path) {
    write_jar(path, &[("com/acme/Lib.java", "package com.acme; class Lib {}")]);
}

pub fn acme_sources_bytes() -> Vec<u8> {
    jar_bytes(&[("com/acme/Lib.java", "package com.acme; class Lib {}")])
}
