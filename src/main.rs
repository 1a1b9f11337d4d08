//! Bugsheet CLI - merge tester bug spreadsheets and generate analysis reports.

use anyhow::Context;
use bugsheet::config::AppConfig;
use bugsheet::pipeline;
use bugsheet::validate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bugsheet", version, about = "Excel bug-report merging & analysis tool")]
struct Cli {
    /// Path to a JSON config file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge one or more workbooks (or folders of workbooks) into a report
    Analyze {
        /// Input .xlsx/.xls files or directories
        paths: Vec<PathBuf>,
        /// Output directory, overrides the configured one
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Open the generated report when done
        #[arg(long)]
        open: bool,
    },
    /// Severity-level pivot over an existing report
    Levels {
        /// Report to analyze; the latest one in the output dir when omitted
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        open: bool,
    },
    /// Per-date and per-type breakdown over an existing report
    Breakdown {
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        open: bool,
    },
    /// Check the structure (and optionally row integrity) of a report
    Validate {
        /// Report to check
        report: PathBuf,
        /// A source workbook to compare row counts against
        #[arg(long)]
        original: Option<PathBuf>,
        /// Text to match rows on during the integrity comparison
        #[arg(long)]
        needle: Option<String>,
    },
}

fn open_report(path: &std::path::Path) {
    if let Err(e) = open::that(path) {
        tracing::warn!(path = %path.display(), error = %e, "Could not open the report");
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = AppConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Command::Analyze { paths, output, open } => {
            if let Some(dir) = output {
                cfg.output_dir = dir;
            }
            if paths.is_empty() {
                anyhow::bail!("no input files or directories given");
            }

            // A single workbook path gets the single-file flow, anything
            // else goes through the batch merge.
            let report = if paths.len() == 1 && paths[0].is_file() {
                pipeline::run_single(&paths[0], &cfg)?
            } else {
                pipeline::run_batch(&paths, &cfg)?.report
            };
            println!("{}", report.display());
            if open {
                open_report(&report);
            }
        }
        Command::Levels { report, output, open } => {
            if let Some(dir) = output {
                cfg.output_dir = dir;
            }
            let out = pipeline::run_levels(report, &cfg)?;
            println!("{}", out.display());
            if open {
                open_report(&out);
            }
        }
        Command::Breakdown { report, output, open } => {
            if let Some(dir) = output {
                cfg.output_dir = dir;
            }
            let out = pipeline::run_breakdown(report, &cfg)?;
            println!("{}", out.display());
            if open {
                open_report(&out);
            }
        }
        Command::Validate {
            report,
            original,
            needle,
        } => {
            let structure = validate::validate_report_structure(&report, &cfg)?;
            println!(
                "sheets: {} ({})",
                structure.sheet_count,
                structure.sheet_names.join(", ")
            );
            for issue in &structure.issues {
                println!("issue: {issue}");
            }
            println!("structure: {}", if structure.valid { "ok" } else { "invalid" });

            if let Some(original) = original {
                let integrity =
                    validate::check_row_integrity(&original, &report, needle.as_deref(), &cfg)?;
                println!(
                    "rows: {} in source, {} matching in report (difference {})",
                    integrity.original_rows, integrity.merged_rows, integrity.difference
                );
            }

            if !structure.valid {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
