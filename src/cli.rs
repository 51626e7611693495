//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use topicmap_core::Subject;

/// Default number of unmatched labels listed by `map`.
pub const DEFAULT_UNMATCHED_TOP: usize = 20;

/// Map exam questions to syllabus topics and report topic distributions.
///
/// Questions carry free-text topic labels ("Definite Integration",
/// "vectors in space"). topicmap resolves them against the canonical
/// syllabus and aggregates them into per-topic counts.
#[derive(Parser, Debug)]
#[command(name = "topicmap")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/topicmap/config.json)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path (overrides the config file)
    #[arg(long, value_name = "PATH", global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store the canonical syllabus, applying the configured weightage
    Seed(SeedArgs),

    /// Import scans and their questions from a JSON file
    Import(ImportArgs),

    /// Print per-topic question counts
    Aggregate(AggregateArgs),

    /// Link unmapped questions to canonical topics
    Map(MapArgs),

    /// Report mapping coverage for a subject
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Syllabus JSON file (default: built-in syllabus)
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON file holding an array of scans
    #[arg(value_name = "SCANS")]
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Subject to aggregate (Math, Physics, Chemistry, Biology)
    #[arg(short, long)]
    pub subject: Subject,

    /// Only questions of this scan
    #[arg(long, conflicts_with_all = ["user", "input"])]
    pub scan: Option<String>,

    /// Only scans visible to this user (own scans plus system scans)
    #[arg(long, conflicts_with = "input")]
    pub user: Option<String>,

    /// Only scans of this exam context (e.g. KCET, NEET)
    #[arg(short, long)]
    pub exam: Option<String>,

    /// Aggregate scans from this JSON file instead of the database
    #[arg(long, value_name = "PATH", requires = "exam")]
    pub input: Option<PathBuf>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct MapArgs {
    /// Subject to map
    #[arg(short, long)]
    pub subject: Subject,

    /// Match without storing links
    #[arg(long)]
    pub dry_run: bool,

    /// Number of unmatched labels to list
    #[arg(long, default_value_t = DEFAULT_UNMATCHED_TOP)]
    pub top: usize,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Subject to verify
    #[arg(short, long)]
    pub subject: Subject,

    /// Also list topics weighted for this exam that have no linked questions
    #[arg(short, long)]
    pub exam: Option<String>,

    /// Print JSON instead of a report
    #[arg(long)]
    pub json: bool,
}
