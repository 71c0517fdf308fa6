use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;
use vwc_diff::{DiffEngine, DiffOptions, DiffStats, FileStatus, ScmStatus, StatusCollector};
use vwc_store::InMemoryObjectStore;

use crate::cli::*;
use crate::import::{import_snapshot, load_working_copy};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Status(args) => {
            let report = cmd_status(&args).await?;
            print_report(&report, cli.format)
        }
        Command::Diff(args) => {
            let report = cmd_diff(&args).await?;
            print_report(&report, cli.format)
        }
        Command::Import(args) => cmd_import(&args, cli.format),
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub status: ScmStatus,
    pub stats: DiffStats,
}

/// Diff options from the config file, then overridden by flags.
fn resolve_options(flags: &DiffFlags) -> anyhow::Result<DiffOptions> {
    let mut options = match &flags.config {
        Some(path) => DiffOptions::load(path)?,
        None => DiffOptions::default(),
    };
    if flags.ignored {
        options.list_ignored = true;
    }
    if flags.case_insensitive {
        options.case_sensitive = false;
    }
    if flags.no_symlinks {
        options.symlinks_enabled = false;
    }
    Ok(options)
}

fn build_engine(store: Arc<InMemoryObjectStore>, flags: &DiffFlags, options: DiffOptions) -> anyhow::Result<DiffEngine> {
    let engine = DiffEngine::new(store, options);
    match &flags.exclude_from {
        Some(path) => {
            let rules = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(engine.with_global_ignore(&rules)?)
        }
        None => Ok(engine),
    }
}

pub async fn cmd_status(args: &StatusArgs) -> anyhow::Result<Report> {
    let options = resolve_options(&args.flags)?;
    let store = Arc::new(InMemoryObjectStore::new());
    let mut roots = Vec::with_capacity(args.against.len());
    for dir in &args.against {
        roots.push(import_snapshot(&store, dir, &options.hidden_names)?);
    }
    let wc = load_working_copy(
        store.clone(),
        &args.workdir,
        options.symlinks_enabled,
        &options.hidden_names,
    )
    .await?;

    let engine = build_engine(store, &args.flags, options)?;
    let collector = Arc::new(StatusCollector::new());
    let stats = engine.diff(wc.root().clone(), &roots, collector.clone()).await?;
    Ok(Report {
        status: collector.status(),
        stats,
    })
}

pub async fn cmd_diff(args: &DiffArgs) -> anyhow::Result<Report> {
    let options = resolve_options(&args.flags)?;
    let store = Arc::new(InMemoryObjectStore::new());
    let old = import_snapshot(&store, &args.old, &options.hidden_names)?;
    let new = import_snapshot(&store, &args.new, &options.hidden_names)?;

    let engine = build_engine(store, &args.flags, options)?;
    let collector = Arc::new(StatusCollector::new());
    let stats = engine.diff_snapshots(old, new, collector.clone()).await?;
    Ok(Report {
        status: collector.status(),
        stats,
    })
}

fn cmd_import(args: &ImportArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = InMemoryObjectStore::new();
    let id = import_snapshot(&store, &args.path, &DiffOptions::default().hidden_names)?;
    match format {
        OutputFormat::Text => println!("{} ({} objects)", id.to_string().yellow(), store.len()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "tree": id.to_hex(), "objects": store.len() })
        ),
    }
    Ok(())
}

fn print_report(report: &Report, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            if report.status.is_empty() {
                println!("{} Working copy clean.", "✓".green().bold());
            }
            for (path, status) in report.status.iter() {
                let code = status.code().to_string();
                let code = match status {
                    FileStatus::Added => code.green(),
                    FileStatus::Removed => code.red(),
                    FileStatus::Modified => code.yellow(),
                    FileStatus::Ignored => code.dimmed(),
                };
                println!("{code} {path}");
            }
        }
    }
    Ok(())
}
