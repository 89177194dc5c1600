use anyhow::{bail, Context};
use backref_cache::ReferenceCache;
use backref_store::{FileReferenceStore, ReferenceStore};
use backref_types::{NodeId, ReferenceRecord, TargetId};
use colored::Colorize;
use serde::Serialize;

use crate::cli::*;
use crate::settings::Settings;

/// What a command produced, ready for rendering.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Output {
    Record(RecordReport),
    Listing { targets: Vec<ListingRow> },
    NewId { id: NodeId },
}

#[derive(Debug, Serialize)]
pub struct RecordReport {
    pub target: String,
    pub referrers: Vec<String>,
    /// Whether a record is persisted after the command.
    pub persisted: bool,
}

#[derive(Debug, Serialize)]
pub struct ListingRow {
    pub target: String,
    pub referrers: usize,
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::resolve(cli.config.as_deref(), cli.store.clone())?;
    let store = FileReferenceStore::open(settings.store.clone())
        .with_context(|| format!("opening store at {}", settings.store.root.display()))?;
    let cache = ReferenceCache::with_config(store, settings.cache)?;

    let output = execute(&cli.command, &cache)?;
    let stats = cache.stats()?;
    tracing::debug!(
        ?stats,
        hit_ratio = ?stats.hit_ratio(),
        retention = ?cache.config().retention,
        "cache statistics"
    );
    render(&output, cli.format)
}

pub fn execute(
    command: &Command,
    cache: &ReferenceCache<FileReferenceStore>,
) -> anyhow::Result<Output> {
    match command {
        Command::Show(args) => cmd_show(cache, &args.target),
        Command::Add(args) => cmd_add(cache, args),
        Command::Remove(args) => cmd_remove(cache, args),
        Command::Clear(args) => cmd_clear(cache, &args.target),
        Command::List => cmd_list(cache),
        Command::NewId => Ok(Output::NewId { id: NodeId::new() }),
    }
}

fn cmd_show(
    cache: &ReferenceCache<FileReferenceStore>,
    target: &TargetId,
) -> anyhow::Result<Output> {
    let record = cache.get(target)?;
    report(cache, &record)
}

fn cmd_add(
    cache: &ReferenceCache<FileReferenceStore>,
    args: &ReferrerArgs,
) -> anyhow::Result<Output> {
    let record = cache.get(&args.target)?;
    record.add_reference(args.referrer.clone());
    cache.save(&record)?;
    report(cache, &record)
}

fn cmd_remove(
    cache: &ReferenceCache<FileReferenceStore>,
    args: &ReferrerArgs,
) -> anyhow::Result<Output> {
    let record = cache.get(&args.target)?;
    if !record.remove_reference(&args.referrer) {
        bail!(
            "{} does not reference {}",
            args.referrer,
            args.target.canonical()
        );
    }
    cache.save(&record)?;
    report(cache, &record)
}

fn cmd_clear(
    cache: &ReferenceCache<FileReferenceStore>,
    target: &TargetId,
) -> anyhow::Result<Output> {
    let record = cache.get(target)?;
    record.clear_all_references();
    cache.save(&record)?;
    report(cache, &record)
}

fn cmd_list(cache: &ReferenceCache<FileReferenceStore>) -> anyhow::Result<Output> {
    let mut targets = Vec::new();
    for id in cache.store().targets()? {
        let record = cache.get(&id.into())?;
        targets.push(ListingRow {
            target: id.to_string(),
            referrers: record.len(),
        });
    }
    Ok(Output::Listing { targets })
}

fn report(
    cache: &ReferenceCache<FileReferenceStore>,
    record: &ReferenceRecord,
) -> anyhow::Result<Output> {
    let target = record.target();
    Ok(Output::Record(RecordReport {
        target: target.to_string(),
        referrers: record.referrers().iter().map(ToString::to_string).collect(),
        persisted: cache.store().exists(&target)?,
    }))
}

pub fn render(output: &Output, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(output)?);
        return Ok(());
    }

    match output {
        Output::Record(r) => {
            println!("Target {}", r.target.yellow().bold());
            if r.referrers.is_empty() {
                println!("  {}", "no referrers".dimmed());
            }
            for referrer in &r.referrers {
                println!("  {} {}", "<-".cyan(), referrer);
            }
            let state = if r.persisted {
                "persisted".green()
            } else {
                "not persisted".dimmed()
            };
            println!("  {state}");
        }
        Output::Listing { targets } if targets.is_empty() => {
            println!("No reference records.");
        }
        Output::Listing { targets } => {
            for row in targets {
                println!("{}  {} referrer(s)", row.target.yellow(), row.referrers);
            }
        }
        Output::NewId { id } => println!("{id}"),
    }
    Ok(())
}
