//! Resolution orchestrator
//!
//! Drives one batch of attach targets through a fresh [`FinderPool`]:
//! 1. canonical paths are registered as in flight (singleton batches already
//!    in flight are rejected as duplicates)
//! 2. every path is queued and the queue closed
//! 3. the caller's thread polls the result channel, promoting the first
//!    result per path, until all are resolved, the workers finish, the time
//!    budget runs out or the external cancel flag is raised
//! 4. the pool is canceled, drained a final time, and every path unregistered

use serde::Serialize;
use sourcescope_api::{AttachTarget, SourceCandidate};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::pool::{FinderPool, ResolverFactory};
use super::promotion::Promoter;
use super::registry::InFlightRegistry;
use crate::config::SourceScopeConfig;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub workers: usize,
    pub poll_interval: Duration,
    pub time_budget: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            poll_interval: Duration::from_millis(100),
            time_budget: None,
        }
    }
}

impl From<&SourceScopeConfig> for OrchestratorConfig {
    fn from(config: &SourceScopeConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            poll_interval: config.poll_interval(),
            time_budget: config.time_budget(),
        }
    }
}

/// Per-path result of a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionReport {
    /// Binary path → session copy of its attached sources
    pub resolved: Vec<(PathBuf, PathBuf)>,
    pub unresolved: Vec<PathBuf>,
    /// Targets whose binary path could not be determined
    pub invalid: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum ResolutionOutcome {
    Completed(ResolutionReport),
    /// External cancel with paths still unresolved
    Canceled(ResolutionReport),
    /// Time budget spent with paths still unresolved
    TimedOut(ResolutionReport),
    /// A single-target batch whose binary is already being resolved
    Duplicate(PathBuf),
}

impl ResolutionOutcome {
    pub fn report(&self) -> Option<&ResolutionReport> {
        match self {
            ResolutionOutcome::Completed(r)
            | ResolutionOutcome::Canceled(r)
            | ResolutionOutcome::TimedOut(r) => Some(r),
            ResolutionOutcome::Duplicate(_) => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ResolutionOutcome::Completed(_))
    }
}

pub struct ResolutionOrchestrator {
    config: OrchestratorConfig,
    factory: ResolverFactory,
    registry: Arc<InFlightRegistry>,
    promoter: Promoter,
}

/// Bookkeeping for the paths of one batch.
struct Batch {
    targets: HashMap<PathBuf, Arc<dyn AttachTarget>>,
    order: Vec<PathBuf>,
    resolved: HashMap<PathBuf, PathBuf>,
}

impl Batch {
    fn unresolved(&self) -> usize {
        self.order.len() - self.resolved.len()
    }
}

impl ResolutionOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        factory: ResolverFactory,
        registry: Arc<InFlightRegistry>,
        promoter: Promoter,
    ) -> Self {
        Self {
            config,
            factory,
            registry,
            promoter,
        }
    }

    /// Resolve sources for `targets`.
    ///
    /// `cancel`, when given, is checked between polls; raising it stops the
    /// batch after the lookups in flight finish.
    pub fn resolve(
        &self,
        targets: &[Arc<dyn AttachTarget>],
        cancel: Option<&AtomicBool>,
    ) -> Result<ResolutionOutcome> {
        let mut invalid = Vec::new();
        let mut batch = Batch {
            targets: HashMap::new(),
            order: Vec::new(),
            resolved: HashMap::new(),
        };

        for target in targets {
            match target.binary_path() {
                Ok(path) => {
                    if batch.targets.insert(path.clone(), target.clone()).is_none() {
                        batch.order.push(path);
                    }
                }
                Err(e) => {
                    warn!("Cannot locate binary of {}: {}", target.location(), e);
                    invalid.push(target.location());
                }
            }
        }

        if targets.len() == 1 {
            if let Some(path) = batch.order.first() {
                if !self.registry.try_begin(path.clone(), targets[0].clone()) {
                    info!("{} is already being resolved", path.display());
                    return Ok(ResolutionOutcome::Duplicate(path.clone()));
                }
            }
        } else {
            // larger batches take over paths another batch may hold
            for path in &batch.order {
                self.registry.register(path.clone(), batch.targets[path].clone());
            }
        }

        let stop = self.run(&mut batch, cancel);
        for path in &batch.order {
            self.registry.end(path);
        }
        let stop = stop?;

        let report = ResolutionReport {
            resolved: batch
                .order
                .iter()
                .filter_map(|p| batch.resolved.get(p).map(|s| (p.clone(), s.clone())))
                .collect(),
            unresolved: batch
                .order
                .iter()
                .filter(|p| !batch.resolved.contains_key(*p))
                .cloned()
                .collect(),
            invalid,
        };
        info!(
            "Resolution finished: {} resolved, {} unresolved",
            report.resolved.len(),
            report.unresolved.len()
        );

        Ok(match stop {
            Stop::Canceled if !report.unresolved.is_empty() => ResolutionOutcome::Canceled(report),
            Stop::TimedOut if !report.unresolved.is_empty() => ResolutionOutcome::TimedOut(report),
            _ => ResolutionOutcome::Completed(report),
        })
    }

    fn run(&self, batch: &mut Batch, cancel: Option<&AtomicBool>) -> Result<Stop> {
        if batch.order.is_empty() {
            return Ok(Stop::Finished);
        }

        let size = self.config.workers.min(batch.order.len()).max(1);
        let pool = FinderPool::new(size, self.factory.clone())?;
        for path in &batch.order {
            pool.submit(path.clone());
        }
        pool.close();
        debug!("Submitted {} binaries to {} workers", batch.order.len(), size);

        let deadline = self.config.time_budget.map(|b| Instant::now() + b);
        let stop = loop {
            self.absorb(batch, pool.drain());

            if batch.unresolved() == 0 || pool.live_workers() == 0 {
                break Stop::Finished;
            }
            if cancel.is_some_and(|c| c.load(Ordering::SeqCst)) {
                info!("Resolution canceled");
                break Stop::Canceled;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                info!("Resolution time budget exhausted");
                break Stop::TimedOut;
            }
            thread::sleep(self.config.poll_interval);
        };

        pool.cancel();
        // results that landed between the last poll and the cancel
        self.absorb(batch, pool.drain());

        // the workers may run out before a poll sees the raised flag
        let signaled = cancel.is_some_and(|c| c.load(Ordering::SeqCst));
        Ok(match stop {
            Stop::Finished if signaled => Stop::Canceled,
            other => other,
        })
    }

    fn absorb(&self, batch: &mut Batch, results: Vec<SourceCandidate>) {
        for candidate in results {
            let path = candidate.binary_path.clone();
            if batch.resolved.contains_key(&path) {
                continue;
            }
            let Some(target) = batch.targets.get(&path) else {
                debug!("Dropping result for unknown binary {}", path.display());
                continue;
            };

            match self.promoter.promote(target.as_ref(), &candidate) {
                Ok(session) => {
                    batch.resolved.insert(path, session);
                }
                Err(e) => warn!("Failed to attach sources to {}: {}", target.location(), e),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Finished,
    Canceled,
    TimedOut,
}
