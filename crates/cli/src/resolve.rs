use sourcescope_api::AttachTarget;
use sourcescope_core::storage::StorageLayout;
use sourcescope_core::{OrchestratorConfig, ResolutionOutcome, SourceScope};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::attach::{ConsoleAttacher, JarTarget};

pub fn run(
    storage: StorageLayout,
    jars: Vec<PathBuf>,
    timeout: Option<u64>,
    workers: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let scope = SourceScope::open_in(storage)?;

    let mut config = OrchestratorConfig::from(scope.config());
    if let Some(secs) = timeout {
        config.time_budget = Some(Duration::from_secs(secs));
    }
    if let Some(workers) = workers {
        config.workers = workers.max(1);
    }

    let targets: Vec<Arc<dyn AttachTarget>> = jars
        .into_iter()
        .map(|jar| Arc::new(JarTarget::new(jar)) as Arc<dyn AttachTarget>)
        .collect();

    tracing::info!("Resolving {} jars with {} workers", targets.len(), config.workers);
    let orchestrator = scope.orchestrator_with(Arc::new(ConsoleAttacher::new()), config);
    let outcome = orchestrator.resolve(&targets, None)?;

    let report = match &outcome {
        ResolutionOutcome::Duplicate(path) => {
            println!("{} is already being resolved", path.display());
            return Ok(());
        }
        ResolutionOutcome::Completed(report) => report,
        ResolutionOutcome::Canceled(report) => {
            println!("Canceled.");
            report
        }
        ResolutionOutcome::TimedOut(report) => {
            println!("Timed out.");
            report
        }
    };

    for location in &report.invalid {
        println!("{}: cannot read file", location);
    }
    for path in &report.unresolved {
        println!("{}: no sources found", path.display());
    }
    println!(
        "\n{} resolved, {} unresolved",
        report.resolved.len(),
        report.unresolved.len() + report.invalid.len()
    );

    Ok(())
}
