//! Promotion turns a verified candidate into an attached, persisted source.

use sourcescope_api::{AttachStatus, AttachTarget, Attacher, SourceCandidate};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::BindingCache;
use crate::error::{Result, SourceScopeError};
use crate::hash::sha1_file;
use crate::storage::StorageLayout;

pub struct Promoter {
    storage: Arc<StorageLayout>,
    bindings: Arc<BindingCache>,
    attacher: Arc<dyn Attacher>,
}

impl Promoter {
    pub fn new(
        storage: Arc<StorageLayout>,
        bindings: Arc<BindingCache>,
        attacher: Arc<dyn Attacher>,
    ) -> Self {
        Self {
            storage,
            bindings,
            attacher,
        }
    }

    /// Copy, attach and record `candidate` for `target`.
    ///
    /// Returns the session copy handed to the attacher.
    pub fn promote(&self, target: &dyn AttachTarget, candidate: &SourceCandidate) -> Result<PathBuf> {
        self.storage.ensure_dirs()?;

        let (long_lived, session) = self.place(candidate)?;

        match self.attacher.attach(target, &session)? {
            AttachStatus::Attached => {}
            AttachStatus::AlreadyAttached => {
                debug!("{} already attached, refreshing", target.location());
                self.attacher.reattach(
                    target,
                    &long_lived,
                    &session,
                    candidate.download_url.as_deref(),
                )?;
            }
            AttachStatus::Rejected => {
                return Err(SourceScopeError::Internal(format!(
                    "{} rejected {}",
                    target.location(),
                    session.display()
                )));
            }
        }

        self.bindings.upsert(
            &long_lived,
            &candidate.sha1,
            candidate.download_url.as_deref(),
            Some(&session),
        )?;
        info!(
            "Attached {} to {} ({})",
            long_lived.display(),
            target.location(),
            candidate.finder
        );
        Ok(session)
    }

    /// Long-lived and session locations for the candidate's archive, copying
    /// whatever is not there yet.
    fn place(&self, candidate: &SourceCandidate) -> Result<(PathBuf, PathBuf)> {
        let source = &candidate.source_file;
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                SourceScopeError::Internal(format!("no file name in {}", source.display()))
            })?;

        if self.storage.is_managed(source) {
            let key = source
                .parent()
                .and_then(Path::file_name)
                .map(|k| k.to_string_lossy().to_string())
                .unwrap_or_default();
            let (_, session) = self.storage.promoted_paths(&key, &file_name);
            let temp = &candidate.temp_file;
            if temp.is_file() && temp.starts_with(self.storage.session_dir()) {
                return Ok((source.clone(), temp.clone()));
            }
            copy_into(source, &session)?;
            return Ok((source.clone(), session));
        }

        let content_hash = sha1_file(source)?;
        let (long_lived, session) = self.storage.promoted_paths(&content_hash, &file_name);
        copy_into(source, &long_lived)?;
        copy_into(source, &session)?;
        Ok((long_lived, session))
    }
}

/// Copy `from` to `to` unless `to` exists. The file appears under its final
/// name only once complete.
fn copy_into(from: &Path, to: &Path) -> Result<()> {
    if to.is_file() {
        return Ok(());
    }
    let parent = to.parent().ok_or_else(|| {
        SourceScopeError::Internal(format!("no parent directory for {}", to.display()))
    })?;
    fs::create_dir_all(parent)?;

    let staged = tempfile::Builder::new().prefix(".copy-").tempfile_in(parent)?;
    fs::copy(from, staged.path())?;
    staged.persist(to).map_err(|e| e.error)?;
    Ok(())
}
