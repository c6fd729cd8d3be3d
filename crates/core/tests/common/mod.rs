use sourcescope_api::{ApiResult, AttachStatus, AttachTarget, Attacher};
use sourcescope_core::error::Result;
use sourcescope_core::http::{HttpRequest, HttpResponse, HttpTransport, Method};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// In-memory HTTP server: exact URL → (status, body); everything else is 404.
#[derive(Default)]
pub struct FakeRepository {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    calls: Mutex<Vec<(Method, String)>>,
}

#[allow(dead_code)]
impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: impl Into<String>, status: u16, body: Vec<u8>) {
        self.routes.lock().unwrap().insert(url.into(), (status, body));
    }

    pub fn route_json(&self, url: impl Into<String>, body: serde_json::Value) {
        self.route(url, 200, body.to_string().into_bytes());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl HttpTransport for FakeRepository {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((request.method, request.url.clone()));
        let routes = self.routes.lock().unwrap();
        Ok(match routes.get(&request.url) {
            Some((status, body)) => HttpResponse {
                status: *status,
                body: if request.method == Method::Head {
                    Vec::new()
                } else {
                    body.clone()
                },
            },
            None => HttpResponse {
                status: 404,
                body: Vec::new(),
            },
        })
    }
}

#[derive(Debug)]
pub struct JarTarget(pub PathBuf);

impl AttachTarget for JarTarget {
    fn binary_path(&self) -> ApiResult<PathBuf> {
        Ok(self.0.canonicalize()?)
    }

    fn location(&self) -> String {
        self.0.display().to_string()
    }
}

/// Remembers what is attached where, like an IDE library table.
#[derive(Default)]
pub struct LibraryTable {
    attached: Mutex<HashMap<PathBuf, PathBuf>>,
    pub reattached: Mutex<usize>,
}

#[allow(dead_code)]
impl LibraryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_of(&self, binary: &Path) -> Option<PathBuf> {
        let binary = binary.canonicalize().ok()?;
        self.attached.lock().unwrap().get(&binary).cloned()
    }

    pub fn reattach_count(&self) -> usize {
        *self.reattached.lock().unwrap()
    }
}

impl Attacher for LibraryTable {
    fn attach(&self, target: &dyn AttachTarget, source: &Path) -> ApiResult<AttachStatus> {
        let binary = target.binary_path()?;
        let mut attached = self.attached.lock().unwrap();
        if attached.get(&binary).is_some_and(|s| s == source) {
            return Ok(AttachStatus::AlreadyAttached);
        }
        attached.insert(binary, source.to_path_buf());
        Ok(AttachStatus::Attached)
    }

    fn reattach(
        &self,
        _target: &dyn AttachTarget,
        _source: &Path,
        _temp_source: &Path,
        _download_url: Option<&str>,
    ) -> ApiResult<()> {
        *self.reattached.lock().unwrap() += 1;
        Ok(())
    }
}

#[allow(dead_code)]
pub fn write_jar(path: &Path, entries: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

#[allow(dead_code)]
pub fn jar_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("fixture.jar");
    write_jar(&path, entries);
    fs::read(path).unwrap()
}

/// `org.example:widget:2.1` binary with two top-level classes and an inner class.
#[allow(dead_code)]
pub fn widget_binary(path: &Path) {
    write_jar(
        path,
        &[
            ("org/example/widget/Widget.class", "\u{CA}\u{FE}"),
            ("org/example/widget/Widget$Builder.class", "\u{CA}\u{FE}"),
            ("org/example/widget/Gadget.class", "\u{CA}\u{FE}"),
            (
                "META-INF/maven/org.example/widget/pom.properties",
                "groupId=org.example\nartifactId=widget\nversion=2.1\n",
            ),
        ],
    );
}

#[allow(dead_code)]
pub fn widget_sources() -> Vec<u8> {
    jar_bytes(&[
        ("org/example/widget/Widget.java", "package org.example.widget; public class Widget {}"),
        ("org/example/widget/Gadget.java", "package org.example.widget; public class Gadget {}"),
    ])
}
