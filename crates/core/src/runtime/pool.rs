//! Finder pool
//!
//! A fixed set of OS threads drains one shared work channel. Each thread owns
//! its own [`CompositeResolver`], so cancellation reaches exactly the finders
//! doing work for this pool.
//!
//! Shutdown:
//! - `close()` drops the sender; workers finish every queued path, then exit
//! - `cancel()` also drops the sender and cancels every resolver; a worker
//!   never starts another path after that, the one in flight completes

use crossbeam_channel::{self as channel, Receiver, Sender};
use sourcescope_api::{SourceCandidate, SourceFinder};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use crate::error::Result;
use crate::hash::sha1_file;
use crate::resolver::CompositeResolver;

/// Builds the resolver owned by one worker.
pub type ResolverFactory = Arc<dyn Fn() -> CompositeResolver + Send + Sync>;

pub struct FinderPool {
    work_tx: Mutex<Option<Sender<PathBuf>>>,
    results_rx: Receiver<SourceCandidate>,
    canceled: Arc<AtomicBool>,
    live: Arc<AtomicUsize>,
    resolvers: Arc<Mutex<Vec<Arc<CompositeResolver>>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Decrements the live-worker count when a worker exits, even by panic.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FinderPool {
    /// Start `size` workers (at least one).
    pub fn new(size: usize, factory: ResolverFactory) -> Result<Self> {
        let (work_tx, work_rx) = channel::unbounded::<PathBuf>();
        let (results_tx, results_rx) = channel::unbounded::<SourceCandidate>();

        let pool = Self {
            work_tx: Mutex::new(Some(work_tx)),
            results_rx,
            canceled: Arc::new(AtomicBool::new(false)),
            live: Arc::new(AtomicUsize::new(0)),
            resolvers: Arc::new(Mutex::new(Vec::new())),
            handles: Mutex::new(Vec::new()),
        };

        for index in 0..size.max(1) {
            let work_rx = work_rx.clone();
            let results_tx = results_tx.clone();
            let factory = factory.clone();
            let canceled = pool.canceled.clone();
            let resolvers = pool.resolvers.clone();
            let live = pool.live.clone();

            // counted before the thread runs so the pool never looks idle early
            pool.live.fetch_add(1, Ordering::SeqCst);
            let spawned = thread::Builder::new()
                .name(format!("source-finder-{index}"))
                .spawn(move || {
                    let _guard = LiveGuard(live);
                    let resolver = Arc::new(factory());
                    {
                        let mut all = resolvers.lock().unwrap_or_else(PoisonError::into_inner);
                        // cancel() may already have swept the list
                        if canceled.load(Ordering::SeqCst) {
                            resolver.cancel();
                        }
                        all.push(resolver.clone());
                    }
                    run_worker(&resolver, &work_rx, &results_tx, &canceled);
                });

            match spawned {
                Ok(handle) => pool
                    .handles
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(handle),
                Err(e) => {
                    pool.live.fetch_sub(1, Ordering::SeqCst);
                    if index == 0 {
                        return Err(e.into());
                    }
                    warn!("Could not start finder worker {}: {}", index, e);
                    break;
                }
            }
        }

        Ok(pool)
    }

    /// Queue a binary. `false` once the pool is closed or canceled.
    pub fn submit(&self, binary: PathBuf) -> bool {
        let tx = self.work_tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx.send(binary).is_ok(),
            None => false,
        }
    }

    /// No more work will be submitted.
    pub fn close(&self) {
        self.work_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Stop the pool. Idempotent.
    pub fn cancel(&self) {
        if self.canceled.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Canceling finder pool");
        self.close();
        for resolver in self
            .resolvers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            resolver.cancel();
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    pub fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Results produced since the previous call, without blocking.
    pub fn drain(&self) -> Vec<SourceCandidate> {
        self.results_rx.try_iter().collect()
    }

    /// Wait for every worker thread to exit.
    pub fn join(&self) {
        let handles: Vec<_> = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("A finder worker panicked");
            }
        }
    }
}

fn run_worker(
    resolver: &CompositeResolver,
    work_rx: &Receiver<PathBuf>,
    results_tx: &Sender<SourceCandidate>,
    canceled: &AtomicBool,
) {
    // recv() fails once the sender is gone and the queue is empty
    while let Ok(binary) = work_rx.recv() {
        if canceled.load(Ordering::SeqCst) {
            break;
        }

        let sha1 = match sha1_file(&binary) {
            Ok(sha1) => sha1,
            Err(e) => {
                warn!("Cannot hash {}: {}", binary.display(), e);
                continue;
            }
        };

        if let Some(candidate) = resolver.resolve(&binary, &sha1) {
            if results_tx.send(candidate).is_err() {
                break;
            }
        }
    }
    debug!("Finder worker exiting");
}
