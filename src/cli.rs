use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::error::CasemapError;

#[derive(Debug, Parser)]
#[command(
    name = "casemap",
    version,
    about = "Map legacy case projects to their document folders in cloud storage"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile every project and persist the resulting path mapping.
    Map(MapArgs),
    /// Reconcile and report which projects could not be placed.
    Analyze(AnalyzeArgs),
    /// Generate storage URLs for every mapped document.
    Urls(UrlsArgs),
    /// Write a sample environment file.
    Init(InitArgs),
    /// Check config, snapshot files and store access.
    Verify(VerifyArgs),
}

#[derive(Debug, Args)]
struct MapArgs {
    /// Mapping file to write (defaults to the export dir).
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Write every project with mapping issues to a CSV file.
    #[arg(long)]
    export_csv: bool,
    #[arg(long, value_name = "PATH", requires = "export_csv")]
    csv_path: Option<PathBuf>,
    /// How many unmapped projects to list.
    #[arg(long, value_name = "N", default_value_t = commands::analyze::DEFAULT_SHOW)]
    show: usize,
}

#[derive(Debug, Args)]
struct UrlsArgs {
    /// Saved mapping file from `casemap map`; reconciles live when omitted.
    #[arg(long, value_name = "PATH")]
    mapping: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct InitArgs {
    #[arg(long, value_name = "PATH")]
    path: Option<PathBuf>,
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct VerifyArgs {
    /// Treat an empty storage root as a failure.
    #[arg(long)]
    strict: bool,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let status = if report.ok { "ok" } else { "failed" };
    println!("{} [{status}]", report.command);
    for line in &report.details {
        println!("  {line}");
    }
    for issue in &report.issues {
        println!("  issue: {issue}");
    }
    Ok(())
}

fn dispatch(command: Command) -> Result<CommandReport> {
    match command {
        Command::Map(args) => commands::map::run(&commands::map::MapOptions {
            out: args.out,
            dry_run: args.dry_run,
        }),
        Command::Analyze(args) => commands::analyze::run(&commands::analyze::AnalyzeOptions {
            export_csv: args.export_csv,
            csv_path: args.csv_path,
            show: args.show,
        }),
        Command::Urls(args) => commands::urls::run(&commands::urls::UrlsOptions {
            mapping: args.mapping,
            out: args.out,
        }),
        Command::Init(args) => commands::init::run(&commands::init::InitOptions {
            path: args.path,
            force: args.force,
        }),
        Command::Verify(args) => {
            commands::verify::run(&commands::verify::VerifyOptions { strict: args.strict })
        }
    }
}

/// Prefix a typed failure with its stable code so scripts can match on it.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<CasemapError>() {
        Some(typed) => format!("{}: {err:#}", typed.code().as_str()),
        None => format!("{err:#}"),
    }
}

/// Run the CLI; `Ok(false)` means the report carried issues.
pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    let report = dispatch(cli.command)?;
    print_report(&report, cli.json)?;
    Ok(report.ok)
}
