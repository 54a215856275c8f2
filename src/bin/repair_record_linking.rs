//! Repair missing client / project links in a workspace database.
//!
//! With `--dry-run` every pass runs against an in-memory copy of the
//! database and nothing is written. Logging follows `RUST_LOG` (default
//! `info`); the JSON report goes to stdout.

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;

use uba_links_lib::linking::Threshold;
use uba_links_lib::repair::{run_repair, RepairOptions};
use uba_links_lib::state::{load_config_or_default, AppState};
use uba_links_lib::store::MemoryStore;

/// Link unlinked projects, invoices and tasks to their clients and projects
#[derive(Parser, Debug)]
#[command(name = "repair_record_linking")]
#[command(version, about, long_about = None)]
struct Args {
    /// Legacy JSON export to import before linking
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// Auto-link threshold: a 0-1 score, or legacy 0-10 points when above 1
    #[arg(long, value_name = "N", value_parser = parse_threshold)]
    threshold: Option<Threshold>,

    /// Include the orphaned-record report
    #[arg(long)]
    orphans: bool,

    /// Run against an in-memory copy; write nothing
    #[arg(long)]
    dry_run: bool,

    /// Workspace database, overriding the config
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,
}

impl Args {
    fn repair_options(&self) -> RepairOptions {
        RepairOptions {
            import: self.import.clone(),
            threshold: self.threshold,
            orphans: self.orphans,
            dry_run: self.dry_run,
        }
    }
}

fn parse_threshold(raw: &str) -> Result<Threshold, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}` is not a number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("`{raw}` must be a non-negative number"));
    }
    Ok(if value > 1.0 {
        Threshold::from_points(value)
    } else {
        Threshold::new(value)
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let options = args.repair_options();

    let mut config = load_config_or_default();
    if let Some(path) = &args.database {
        config.database_path = Some(path.display().to_string());
    }
    let state = AppState::with_config(config);
    let db = state
        .db
        .as_ref()
        .ok_or_else(|| anyhow!("workspace database is unavailable"))?;
    let linking = &state.config.linking;

    let report = if options.dry_run {
        let snapshot = MemoryStore::snapshot_of(db).context("failed to snapshot database")?;
        run_repair(&snapshot, linking, &options)?
    } else {
        db.with_transaction(|db| run_repair(db, linking, &options))?
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
