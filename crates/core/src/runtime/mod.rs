//! Concurrent resolution runtime
//!
//! - [`pool`]: worker threads draining a shared queue of binaries
//! - [`registry`]: binaries in flight across batches
//! - [`promotion`]: copy, attach and persist a winning candidate
//! - [`orchestrator`]: drives one batch end to end

pub mod orchestrator;
pub mod pool;
pub mod promotion;
pub mod registry;

pub use orchestrator::{
    OrchestratorConfig, ResolutionOrchestrator, ResolutionOutcome, ResolutionReport,
};
pub use pool::{FinderPool, ResolverFactory};
pub use promotion::Promoter;
pub use registry::InFlightRegistry;
