mod attach;
mod cache;
mod identify;
mod resolve;

use clap::{Parser, Subcommand};
use sourcescope_core::storage::StorageLayout;
use std::path::PathBuf;

pub use attach::{ConsoleAttacher, JarTarget};

#[derive(Parser)]
#[command(
    name = "sourcescope",
    version,
    about = "Find and attach the sources jar of compiled Java libraries",
    long_about = "Sourcescope looks up the sources jar matching a compiled jar in the local Maven and \
                  Gradle caches and in the configured remote repositories (Maven Central, Nexus, \
                  Artifactory). Every candidate is checked against the binary before it is accepted, \
                  and successful lookups are remembered in ~/.sourcescope/bindings.json."
)]
pub struct Cli {
    /// Also log to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the sources of one or more jars
    Resolve {
        /// Binary jars to resolve
        #[arg(value_name = "JAR", required = true)]
        jars: Vec<PathBuf>,
        /// Give up after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Worker threads (defaults to the configured value)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print the SHA-1 and embedded Maven coordinates of a jar
    Identify {
        #[arg(value_name = "JAR")]
        jar: PathBuf,
    },
    /// Inspect or maintain the binding cache
    Cache {
        #[command(subcommand)]
        command: cache::CacheCommands,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let component = match &cli.command {
        Commands::Resolve { .. } => "resolve",
        _ => "cli",
    };
    let storage = StorageLayout::at_default_location()?;
    let _guard = sourcescope_core::logging::init_logging(&storage, component, cli.verbose);

    match cli.command {
        Commands::Resolve {
            jars,
            timeout,
            workers,
        } => resolve::run(storage, jars, timeout, workers),
        Commands::Identify { jar } => identify::run(jar),
        Commands::Cache { command } => cache::run(&storage, command),
    }
}
