use crate::models::SourceCandidate;
use std::path::Path;

/// A strategy that locates a source archive for a binary.
///
/// Implementations never fail: network errors, malformed responses and
/// rejected candidates are logged and reported as "nothing appended".
/// Cancellation is cooperative; `cancel()` only prevents the next network
/// call from starting.
pub trait SourceFinder: Send + Sync {
    /// Finder name (for logging and candidate attribution)
    fn name(&self) -> &str;

    /// Append zero or more verified candidates for `binary` to `out`.
    fn find(&self, binary: &Path, sha1: &str, out: &mut Vec<SourceCandidate>);

    /// Request cancellation. Idempotent.
    fn cancel(&self);

    fn is_canceled(&self) -> bool;

    /// Download URL used by the most recent successful `find`, if any.
    fn download_url(&self) -> Option<String>;

    /// Whether a result without a download URL may still be accepted.
    ///
    /// Remote finders always know where they fetched from; local finders and
    /// facades over other finders do not.
    fn accepts_without_url(&self) -> bool {
        false
    }
}
