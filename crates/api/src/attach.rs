use crate::error::ApiResult;
use std::fmt;
use std::path::{Path, PathBuf};

/// Host-side handle for a library slot that can receive a source archive.
pub trait AttachTarget: Send + Sync + fmt::Debug {
    /// Canonical path of the binary behind this target.
    fn binary_path(&self) -> ApiResult<PathBuf>;

    /// Human readable location used in log lines.
    fn location(&self) -> String;
}

/// Result of handing a source archive to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachStatus {
    Attached,
    /// The target already has this exact file attached
    AlreadyAttached,
    Rejected,
}

/// Host collaborator that associates a source archive with a target.
pub trait Attacher: Send + Sync {
    fn attach(&self, target: &dyn AttachTarget, source: &Path) -> ApiResult<AttachStatus>;

    /// Refresh an existing attachment without copying anything new.
    fn reattach(
        &self,
        target: &dyn AttachTarget,
        source: &Path,
        temp_source: &Path,
        download_url: Option<&str>,
    ) -> ApiResult<()>;
}
