use clap::Subcommand;
use sourcescope_api::BindingCacheManager;
use sourcescope_core::cache::BindingCache;
use sourcescope_core::storage::StorageLayout;
use tabled::{Table, Tabled};

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show cache statistics
    Stats,
    /// List bindings
    List {
        /// Only show bindings whose source path contains this text
        #[arg(long)]
        filter: Option<String>,
        /// Sort by size instead of file order
        #[arg(long)]
        by_size: bool,
    },
    /// Drop bindings whose source file is gone
    Sweep,
    /// Remove every binding
    Clear,
}

#[derive(Tabled)]
struct BindingRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Hashes")]
    hashes: usize,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "OK")]
    exists: String,
}

fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
    }
}

pub fn run(storage: &StorageLayout, cmd: CacheCommands) -> Result<(), Box<dyn std::error::Error>> {
    let cache = BindingCache::new(storage.bindings_file());
    let manager: &dyn BindingCacheManager = &cache;

    match cmd {
        CacheCommands::Stats => {
            let stats = manager.stats()?;
            println!("Cache File:      {}", stats.cache_file.display());
            println!("Total Bindings:  {}", stats.total_records);
            println!("Total Hashes:    {}", stats.total_hashes);
            println!("Missing Sources: {}", stats.missing_sources);
        }
        CacheCommands::List { filter, by_size } => {
            let mut bindings = manager.list()?;

            if let Some(pattern) = filter {
                bindings.retain(|b| b.source.to_string_lossy().contains(&pattern));
            }
            if by_size {
                bindings.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
            }

            let rows: Vec<BindingRow> = bindings
                .into_iter()
                .map(|b| BindingRow {
                    source: b.source.display().to_string(),
                    size: human_size(b.size_bytes),
                    hashes: b.hashes.len(),
                    url: b.download_url.unwrap_or_else(|| "-".to_string()),
                    exists: if b.exists { "yes" } else { "no" }.to_string(),
                })
                .collect();

            if rows.is_empty() {
                println!("No bindings found.");
            } else {
                println!("{}", Table::new(rows));
            }
        }
        CacheCommands::Sweep => {
            let removed = manager.sweep()?;
            println!("Removed {} stale bindings.", removed);
        }
        CacheCommands::Clear => {
            manager.clear()?;
            println!("Binding cache cleared.");
        }
    }

    Ok(())
}
