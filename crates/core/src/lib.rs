//! Source archive resolution for compiled jar libraries.
//!
//! Given a binary jar, find the matching sources jar in local package-manager
//! caches or remote repositories, verify it, attach it through the host's
//! [`Attacher`](sourcescope_api::Attacher) and remember the binding.

pub mod archive;
pub mod cache;
pub mod config;
pub mod error;
pub mod finder;
pub mod hash;
pub mod http;
pub mod logging;
pub mod resolver;
pub mod runtime;
pub mod session;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use config::{FinderConfig, SourceScopeConfig};
pub use error::{Result, SourceScopeError};
pub use resolver::CompositeResolver;
pub use runtime::{OrchestratorConfig, ResolutionOrchestrator, ResolutionOutcome, ResolutionReport};
pub use session::{Identification, SourceScope, identify};
