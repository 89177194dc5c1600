use std::path::PathBuf;

use backref_types::{PropertyId, TargetId};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "backref",
    about = "Inspect and edit the reference records of a backref store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store directory (overrides `store.root` from the settings file)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// TOML settings file: cache keys at the top level plus a `[store]` table
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the referrers of a target
    Show(TargetArgs),
    /// Record that a property references a target
    Add(ReferrerArgs),
    /// Drop one reference from a property to a target
    Remove(ReferrerArgs),
    /// Drop every reference to a target
    Clear(TargetArgs),
    /// List every target with persisted references
    List,
    /// Print a fresh node id
    NewId,
}

#[derive(Args)]
pub struct TargetArgs {
    /// `<uuid>` or `<uuid>#<qualifier>`
    pub target: TargetId,
}

#[derive(Args)]
pub struct ReferrerArgs {
    /// `<uuid>` or `<uuid>#<qualifier>`
    pub target: TargetId,
    /// `<uuid>/<property name>`
    pub referrer: PropertyId,
}
