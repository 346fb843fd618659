use anyhow::{bail, Context as AnyhowContext, Result};
use civic_diff::RunIndex;
use civic_sources::{build_source, source_names, HttpTransport, MeetingSource, SourceOptions};
use clap::{Args, Parser, Subcommand};
use crate::config::{FileConfig, Overrides};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};
use std::path::PathBuf;

pub mod config;
pub mod crawl;

pub use crawl::{run_source, CrawlReport};

#[derive(Parser)]
#[command(name = "civic-scrapers")]
#[command(about = "Scrape public meeting schedules and diff them against prior runs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML config file with [diff] and [google] tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root directory of run files (overrides [diff].output_dir)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl sources and write one diffed run file per source
    Crawl(CrawlArgs),

    /// List previous run files per source
    Runs(RunsArgs),

    /// List available sources
    Sources,
}

#[derive(Args)]
struct CrawlArgs {
    /// Source names (see `sources`)
    #[arg(required = true)]
    sources: Vec<String>,

    /// Output format used for diffing (only "ocd")
    #[arg(long)]
    output_format: Option<String>,

    /// strftime prefix for run directories, e.g. "%Y/%m/%d"
    #[arg(long)]
    feed_prefix: Option<String>,

    /// Diff and report but do not write run files
    #[arg(long)]
    dry_run: bool,

    /// Google API key (falls back to [google].api_key, then GOOGLE_API_KEY)
    #[arg(long)]
    google_api_key: Option<String>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RunsArgs {
    /// Only this source
    source: Option<String>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing
    let json_output = match &cli.command {
        Commands::Crawl(args) => args.json,
        Commands::Runs(args) => args.json,
        Commands::Sources => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let file_config = FileConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Crawl(args) => run_crawl(args, &file_config, cli.output_dir).await?,
        Commands::Runs(args) => run_runs(args, &file_config, cli.output_dir)?,
        Commands::Sources => run_sources()?,
    }

    Ok(())
}

async fn run_crawl(
    args: CrawlArgs,
    file_config: &FileConfig,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let overrides = Overrides {
        output_dir,
        output_format: args.output_format,
        feed_prefix: args.feed_prefix,
        google_api_key: args.google_api_key,
    };

    // Everything that can be rejected is rejected before the first request.
    let diff_config = file_config.diff_settings(&overrides).validate()?;
    let options = SourceOptions::current()
        .with_google_api_key(file_config.google_api_key(&overrides))
        .with_calendar_api(file_config.google.calendar_api.clone());
    let names = unique_sources(&args.sources);
    let mut sources: Vec<Box<dyn MeetingSource>> = Vec::with_capacity(names.len());
    for name in names {
        sources.push(build_source(name, &options)?);
    }
    let transport = HttpTransport::new().context("Failed to build HTTP client")?;

    let mut index = RunIndex::build(&diff_config.output_dir);
    let mut reports = Vec::with_capacity(sources.len());
    let mut failed = Vec::new();
    for source in &mut sources {
        let name = source.info().name.clone();
        let outcome = run_source(
            source.as_mut(),
            &transport,
            &diff_config,
            &index,
            options.now,
            args.dry_run,
        )
        .await;
        match outcome {
            Ok(report) => {
                if let Some(path) = &report.output {
                    index.insert(path.clone());
                }
                reports.push(report);
            }
            Err(err) => {
                log::error!("{err:#}");
                failed.push(name);
            }
        }
    }

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&reports)?)?;
    } else {
        for report in &reports {
            print_stdout(&report.summary_line())?;
        }
    }

    if !failed.is_empty() {
        bail!(
            "{} of {} sources failed: {}",
            failed.len(),
            sources.len(),
            failed.join(", ")
        );
    }
    Ok(())
}

/// Source names in command line order, each once; a repeat would overwrite its own run file.
fn unique_sources(names: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(String::as_str)
        .filter(|name| {
            let first = seen.insert(*name);
            if !first {
                log::warn!("Source {name} listed more than once; crawling it once");
            }
            first
        })
        .collect()
}

#[derive(Serialize)]
struct SourceRuns {
    runs: Vec<PathBuf>,
    latest: Option<PathBuf>,
}

fn run_runs(args: RunsArgs, file_config: &FileConfig, output_dir: Option<PathBuf>) -> Result<()> {
    let root = output_dir.unwrap_or_else(|| file_config.diff.output_dir.clone());
    let index = RunIndex::build(&root);

    let names: Vec<&str> = match args.source.as_deref() {
        Some(name) => vec![name],
        None => index.sources(),
    };

    if args.json {
        let listing: BTreeMap<&str, SourceRuns> = names
            .iter()
            .map(|name| {
                let runs = index.runs_for(name).to_vec();
                let latest = index.latest(name).map(PathBuf::from);
                (*name, SourceRuns { runs, latest })
            })
            .collect();
        return print_stdout(&serde_json::to_string_pretty(&listing)?);
    }

    if names.is_empty() {
        return print_stdout(&format!("No runs under {}", root.display()));
    }
    for name in names {
        let runs = index.runs_for(name);
        print_stdout(&format!("{name} ({} runs)", runs.len()))?;
        let latest = index.latest(name);
        for path in runs {
            let marker = if Some(path.as_path()) == latest { "*" } else { " " };
            print_stdout(&format!("  {marker} {}", path.display()))?;
        }
    }
    Ok(())
}

fn run_sources() -> Result<()> {
    for name in source_names() {
        print_stdout(name)?;
    }
    Ok(())
}

fn print_stdout(line: &str) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{line}")?;
    Ok(())
}
