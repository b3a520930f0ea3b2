//! Command-line access to a model document store.
//!
//! # Responsibility
//! - Inspect, validate and migrate stored documents from a shell.
//! - Run legacy imports without a UI host.

use clap::{Parser, Subcommand};
use log::info;
use modelstore_core::{
    init_logging, validate_document, DocumentStore, DuplicateRequest, FileDocumentStore,
    StoreConfig,
};
use serde_json::json;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "modelstore")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and maintain versioned model documents")]
struct Cli {
    /// Directory holding modelstore.json (created with defaults if missing)
    #[arg(long, value_name = "DIR", default_value = ".")]
    config_dir: PathBuf,

    /// Store root; overrides the configured one
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Legacy import location; overrides the configured one
    #[arg(long, value_name = "DIR")]
    legacy_root: Option<PathBuf>,

    /// Do not write migrated documents back on read
    #[arg(long)]
    no_persist_upgrades: bool,

    /// Absolute directory for rolling log files; logging is off without it
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", default_value = modelstore_core::default_log_level())]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List stored documents, most recently updated first
    List,
    /// Print one document's manifest and payload summary
    Show { id: String },
    /// Run consistency checks over one document
    Validate { id: String },
    /// Report how a stored document would migrate, without writing
    MigrateReport { id: String },
    /// Copy a document under a new id
    Duplicate {
        source_id: String,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete one document
    Delete { id: String },
    /// Import legacy single-file documents not yet in the store
    BootstrapLegacy,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    if let Some(log_dir) = &cli.log_dir {
        init_logging(&cli.log_level, log_dir)?;
    }

    let mut config = StoreConfig::load_or_init(&cli.config_dir)?;
    if let Some(root) = cli.root {
        config.root = root;
    }
    if let Some(legacy_root) = cli.legacy_root {
        config.legacy_root = Some(legacy_root);
    }
    if cli.no_persist_upgrades {
        config.persist_upgrades = false;
    }
    let store = FileDocumentStore::open(config)?;
    info!(
        "event=cli_command module=store status=start root={}",
        store.root().display()
    );

    match cli.command {
        Command::List => {
            for manifest in store.list()? {
                println!(
                    "{}\tv{}\t{}\t{}\t{}",
                    manifest.id,
                    manifest.version,
                    manifest.kind.as_str(),
                    manifest.updated_at.to_rfc3339(),
                    manifest.name
                );
            }
        }
        Command::Show { id } => {
            let Some(document) = store.get(&id)? else {
                eprintln!("document `{id}` not found");
                return Ok(ExitCode::FAILURE);
            };
            let summary = match (document.model(), document.grid()) {
                (Some(model), _) => json!({
                    "elements": model.elements.len(),
                    "relationships": model.relationships.len(),
                    "diagrams": model.diagrams.len(),
                }),
                (None, Some(grid)) => json!({
                    "elements": grid.elements.len(),
                    "constraints": grid.constraints.len(),
                }),
                (None, None) => json!({}),
            };
            let output = json!({
                "manifest": serde_json::to_value(&document.manifest)?,
                "payload": summary,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Validate { id } => {
            let Some(document) = store.get(&id)? else {
                eprintln!("document `{id}` not found");
                return Ok(ExitCode::FAILURE);
            };
            let issues = validate_document(&document);
            println!("{}", serde_json::to_string_pretty(&issues)?);
            if issues.iter().any(|issue| issue.is_error()) {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::MigrateReport { id } => {
            let Some(outcome) = store.migration_report(&id)? else {
                eprintln!("document `{id}` not found");
                return Ok(ExitCode::FAILURE);
            };
            let output = json!({
                "status": outcome.status.as_str(),
                "fromVersion": outcome.from_version,
                "targetVersion": outcome.target_version,
                "reachedVersion": outcome.reached_version,
                "appliedSteps": serde_json::to_value(&outcome.applied_steps)?,
                "warnings": outcome.warnings,
                "reason": outcome.reason,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Duplicate {
            source_id,
            id,
            name,
        } => {
            let request = DuplicateRequest {
                id,
                name,
                description: None,
            };
            let manifest = store.duplicate(&source_id, &request, None)?;
            println!("{}", manifest.id);
        }
        Command::Delete { id } => {
            if !store.delete(&id)? {
                eprintln!("document `{id}` not found");
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::BootstrapLegacy => {
            let report = store.bootstrap_legacy()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.failed.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
