use sourcescope_api::{ApiResult, AttachStatus, AttachTarget, Attacher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// A jar given on the command line.
#[derive(Debug, Clone)]
pub struct JarTarget {
    path: PathBuf,
}

impl JarTarget {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl AttachTarget for JarTarget {
    fn binary_path(&self) -> ApiResult<PathBuf> {
        Ok(self.path.canonicalize()?)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Prints every binding instead of handing it to an IDE.
#[derive(Default)]
pub struct ConsoleAttacher {
    attached: Mutex<HashMap<PathBuf, PathBuf>>,
}

impl ConsoleAttacher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binary → attached source, as seen so far.
    pub fn attached(&self) -> HashMap<PathBuf, PathBuf> {
        self.attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Attacher for ConsoleAttacher {
    fn attach(&self, target: &dyn AttachTarget, source: &Path) -> ApiResult<AttachStatus> {
        let binary = target.binary_path()?;
        let mut attached = self.attached.lock().unwrap_or_else(PoisonError::into_inner);
        if attached.get(&binary).is_some_and(|s| s == source) {
            return Ok(AttachStatus::AlreadyAttached);
        }
        println!("{} -> {}", target.location(), source.display());
        attached.insert(binary, source.to_path_buf());
        Ok(AttachStatus::Attached)
    }

    fn reattach(
        &self,
        target: &dyn AttachTarget,
        source: &Path,
        _temp_source: &Path,
        download_url: Option<&str>,
    ) -> ApiResult<()> {
        match download_url {
            Some(url) => println!("{} -> {} ({})", target.location(), source.display(), url),
            None => println!("{} -> {}", target.location(), source.display()),
        }
        Ok(())
    }
}
