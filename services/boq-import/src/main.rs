//! SPK BOQ Import CLI
//!
//! Imports one BOQ spreadsheet into MongoDB, or into an in-memory store with
//! `--dry-run`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use spk_boq_import::BoqImporter;
use spk_database::{ensure_indexes, initialize_database, DocumentStore, MemoryStore};
use spk_utils::{init_logging, AppConfig};

#[derive(Debug, Parser)]
#[command(name = "spk-import", version, about = "Import a BOQ spreadsheet as an SPK work order")]
struct Cli {
    /// Spreadsheet to import (.xlsx, .xlsm, .xls or .csv)
    file: PathBuf,

    /// Configuration file layered over config/default and the environment
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Import into an in-memory store; nothing is written to MongoDB
    #[arg(long)]
    dry_run: bool,

    /// Print the import outcome as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::load().context("Failed to load configuration")?,
    };

    // Initialize tracing
    init_logging(&config.logging).context("Failed to initialize logging")?;
    info!(file = %cli.file.display(), dry_run = cli.dry_run, "Starting SPK BOQ import");

    let store: Arc<dyn DocumentStore> = if cli.dry_run {
        let store = MemoryStore::new();
        ensure_indexes(&store).await?;
        Arc::new(store)
    } else {
        initialize_database(&config.database)
            .await
            .context("Failed to connect to MongoDB")?
    };

    let importer = BoqImporter::new(store, config.import.clone());
    let outcome = importer.import_path(&cli.file).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if outcome.success {
        println!(
            "{}: {} line items in {} categories / {} subcategories ({} rows skipped), budget {}",
            outcome.order_number.as_deref().unwrap_or_default(),
            outcome.line_items,
            outcome.categories,
            outcome.sub_categories,
            outcome.skipped_rows,
            outcome.budget.unwrap_or_default(),
        );
        for warning in &outcome.warnings {
            println!("  warning: {}", warning);
        }
    }

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
