/*!
# Unique Strings CLI

Loads token files into a deduplicating store and reports how much
storage the deduplication saved.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use unique_strings::cli_common::{self, OutputFormat, OutputWriter};
use unique_strings::{ingest_path, IngestConfig, Ingested};

#[derive(Parser)]
#[command(
    name = "unique-strings",
    version = env!("CARGO_PKG_VERSION"),
    author = "Unique Strings Team",
    about = "Deduplicating string store: ingest token files and report dedup statistics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (text, json)
    #[arg(short = 'f', long, default_value = "text", global = true)]
    format: String,

    /// Pretty print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest token files (one value per line, or key: value records)
    Ingest {
        /// Input files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Path to ingest configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Keep the store in building phase after ingestion
        #[arg(long)]
        no_freeze: bool,

        /// Print every distinct stored value
        #[arg(short, long)]
        list: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a default ingest configuration
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "unique-strings.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.quiet {
        cli_common::init_minimal_logging()?;
    } else {
        cli_common::init_logging(cli.verbose)?;
    }

    let format = OutputFormat::parse_output_format(&cli.format)?;

    match cli.command {
        Commands::Ingest { files, config, no_freeze, list, output } => {
            let mut config = match config {
                Some(path) => IngestConfig::load_from_file(&path)?,
                None => IngestConfig::default(),
            };
            if no_freeze {
                config.freeze = false;
            }

            let mut writer = match &output {
                Some(path) => OutputWriter::file(path, format)
                    .with_context(|| format!("Failed to create {}", path.display()))?,
                None => OutputWriter::stdout(format),
            }
            .with_pretty(cli.pretty);

            if format == OutputFormat::Text && !cli.quiet && output.is_none() {
                cli_common::print_header(
                    "unique-strings",
                    env!("CARGO_PKG_VERSION"),
                    "Deduplicating string store",
                );
            }

            let mut failed = 0usize;
            for file in &files {
                let started = Instant::now();
                match ingest_path(file, &config) {
                    Ok(ingested) => {
                        info!("{} ingested in {:?}", file.display(), started.elapsed());
                        if !cli.quiet {
                            write_report(&mut writer, &ingested, list)?;
                        }
                    }
                    Err(e) => {
                        cli_common::print_error(&format!("{}: {:#}", file.display(), e));
                        failed += 1;
                    }
                }
            }
            writer.flush()?;

            if failed > 0 {
                anyhow::bail!("{} of {} files failed", failed, files.len());
            }
            if format == OutputFormat::Text && !cli.quiet && output.is_none() {
                cli_common::print_success(&format!("{} files ingested", files.len()));
            }
        }

        Commands::InitConfig { output } => {
            if output.exists() {
                cli_common::print_warning(&format!("{} already exists, overwriting", output.display()));
            }
            IngestConfig::default().save_to_file(&output)?;
            if !cli.quiet {
                cli_common::print_success(&format!("Configuration written to {}", output.display()));
            }
        }
    }

    Ok(())
}

fn write_report(writer: &mut OutputWriter, ingested: &Ingested, list: bool) -> Result<()> {
    let report = &ingested.report;

    if writer.format() == OutputFormat::Json {
        if list {
            let values: Vec<String> = ingested
                .store
                .iter()
                .map(|(_, bytes)| String::from_utf8_lossy(bytes).into_owned())
                .collect();
            writer.write_object(&serde_json::json!({ "report": report, "values": values }))?;
        } else {
            writer.write_object(report)?;
        }
        return Ok(());
    }

    let stats = &report.stats;
    writer.write_header(&report.source)?;
    writer.write_fields(&[
        ("lines", report.lines.to_string()),
        ("values", report.values.to_string()),
        ("skipped", report.skipped.to_string()),
        ("distinct", stats.strings.to_string()),
        ("dedup ratio", format!("{:.1}%", stats.dedup_ratio() * 100.0)),
        ("arena used", cli_common::format_file_size(stats.bytes_used as u64)),
        ("arena reserved", cli_common::format_file_size(stats.bytes_capacity as u64)),
        ("est. saved", cli_common::format_file_size(stats.estimated_bytes_saved() as u64)),
        ("grow events", stats.grow_events.to_string()),
        ("phase", stats.phase.to_string()),
    ])?;

    if list {
        for (handle, bytes) in ingested.store.iter() {
            writer.write_list_item(&format!("{:>8}  {}", handle.offset(), String::from_utf8_lossy(bytes)))?;
        }
    }
    Ok(())
}
