pub mod attach;
pub mod cache;
pub mod error;
pub mod finder;
pub mod models;

// Re-export commonly used types
pub use attach::{AttachStatus, AttachTarget, Attacher};
pub use cache::{BindingCacheManager, BindingCacheStats, BindingSummary};
pub use error::{ApiError, ApiResult};
pub use finder::SourceFinder;
pub use models::*;
