mod case;
mod cmd_config;
mod cmd_info;
mod cmd_ingest;
mod cmd_init;
mod cmd_query;
mod cmd_rebuild;
mod cmd_show;
mod cmd_tag;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use timeline_core::{DescriptionLod, TypeZoomLevel};
use timeline_store::{TimelineConfig, TimelinePaths};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "timeline", version, about = "Forensic timeline event store")]
struct Cli {
    /// Case directory (defaults to the nearest ancestor containing .timeline/)
    #[arg(long, global = true)]
    case: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args)]
struct RangeArgs {
    /// Range start (RFC 3339 or epoch seconds, inclusive)
    #[arg(long)]
    start: String,
    /// Range end (RFC 3339 or epoch seconds, exclusive)
    #[arg(long)]
    end: String,
    /// JSON file holding a filter tree
    #[arg(long)]
    filter: Option<PathBuf>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize .timeline/ and its database
    Init,
    /// Insert events from a JSON-lines feed ("-" for stdin)
    Ingest {
        source: String,
    },
    /// Print aggregated events for a time range
    Aggregate {
        #[command(flatten)]
        range: RangeArgs,
        /// Group by base or sub type
        #[arg(long, default_value = "base")]
        type_zoom: TypeZoomLevel,
        /// Description level: short, medium or full
        #[arg(long, default_value = "short")]
        lod: DescriptionLod,
    },
    /// Count events per type in a time range
    Count {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, default_value = "base")]
        type_zoom: TypeZoomLevel,
    },
    /// List event ids in a time range
    Ids {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Show one event as JSON
    Show {
        event_id: i64,
    },
    /// Summarize the store
    Info {
        #[arg(long)]
        json: bool,
    },
    /// Tag or untag every event derived from a file (and artifact)
    Tag {
        #[arg(long)]
        file_id: i64,
        /// Omit to match events with no artifact
        #[arg(long)]
        artifact_id: Option<i64>,
        #[arg(long)]
        untag: bool,
    },
    /// Drop and recreate the database
    Rebuild,
    /// Manage .timeline/config.json
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
}

/// `RUST_LOG` wins; otherwise the case's configured level, then `warn`.
fn init_tracing(repo_root: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = TimelineConfig::load(&TimelinePaths::discover(repo_root).config_json)
            .map(|cfg| cfg.log_level)
            .unwrap_or_else(|_| "warn".to_string());
        EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn query_params<'a>(
    repo_root: &'a Path,
    range: &'a RangeArgs,
    type_zoom: TypeZoomLevel,
    lod: DescriptionLod,
) -> cmd_query::QueryParams<'a> {
    cmd_query::QueryParams {
        repo_root,
        start: &range.start,
        end: &range.end,
        filter: range.filter.as_ref(),
        type_zoom,
        lod,
        json: range.json,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let repo_root = cli
        .case
        .or_else(|| TimelinePaths::find_root(&cwd))
        .unwrap_or(cwd);
    init_tracing(&repo_root);

    match cli.cmd {
        Command::Init => cmd_init::execute(&repo_root),
        Command::Ingest { source } => cmd_ingest::execute(&repo_root, &source),
        Command::Aggregate {
            range,
            type_zoom,
            lod,
        } => cmd_query::aggregate(&query_params(&repo_root, &range, type_zoom, lod)),
        Command::Count { range, type_zoom } => cmd_query::count(&query_params(
            &repo_root,
            &range,
            type_zoom,
            DescriptionLod::default(),
        )),
        Command::Ids { range } => cmd_query::ids(&query_params(
            &repo_root,
            &range,
            TypeZoomLevel::default(),
            DescriptionLod::default(),
        )),
        Command::Show { event_id } => cmd_show::execute(&repo_root, event_id),
        Command::Info { json } => cmd_info::execute(&repo_root, json),
        Command::Tag {
            file_id,
            artifact_id,
            untag,
        } => cmd_tag::execute(&repo_root, file_id, artifact_id, untag),
        Command::Rebuild => cmd_rebuild::execute(&repo_root),
        Command::Config { cmd } => cmd_config::run(cmd, &repo_root),
    }
}
