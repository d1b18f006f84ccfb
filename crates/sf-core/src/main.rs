//! Sensorfleet CLI.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use sf_common::{IngestError, Result};
use sf_core::{
    backfill_instrument, export_range, ingest_file, refresh_charts, run_poller, HttpFetchClient,
    IngestOptions, PipelineContext,
};
use sf_schema::{JsonSchemaProvider, SchemaProvider};
use sf_store::StoreLayout;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sf-core", version, about = "Sensorfleet ingestion and rendering pipeline")]
struct Cli {
    /// Instrument schema JSON file
    #[arg(long, env = "SF_SCHEMAS", default_value = "schemas.json")]
    schemas: PathBuf,

    /// Data root holding proc_data/ and graphs/
    #[arg(long, env = "SF_DATA_ROOT", default_value = ".")]
    data_root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest one raw file for a graph and refresh its charts
    Ingest {
        graph: String,
        file: PathBuf,
        /// Treat as a user-driven upload (backfill historical months)
        #[arg(long)]
        upload: bool,
    },
    /// Regenerate the full and recent chart artifacts for a graph
    Render { graph: String },
    /// Export a date range as CSV
    Export {
        graph: String,
        /// Begin bound, `YYYY-MM-DDTHH:MM[:SS]`
        begin: String,
        /// End bound, `YYYY-MM-DDTHH:MM[:SS]`
        end: String,
        /// Output file (`-` for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },
    /// Download and ingest an instrument's full remote history
    Backfill { graph: String },
    /// Poll all registered instruments on an interval
    Poll {
        /// Seconds between cycles
        #[arg(long, default_value_t = 120)]
        interval_secs: u64,
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
}

/// Parse a CLI bound, with or without seconds.
fn parse_bound(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .map_err(|_| IngestError::Render(format!("unparsable bound: {raw}")))
}

fn run(cli: Cli) -> Result<()> {
    let provider = JsonSchemaProvider::new(&cli.schemas);
    let ctx = PipelineContext {
        schemas: &provider,
        layout: StoreLayout::new(&cli.data_root),
    };

    match cli.command {
        Command::Ingest { graph, file, upload } => {
            ingest_file(
                &ctx,
                &graph,
                &file,
                IngestOptions {
                    unattended: false,
                    user_upload: upload,
                },
            )?;
            refresh_charts(&ctx, &graph)
        }
        Command::Render { graph } => refresh_charts(&ctx, &graph),
        Command::Export {
            graph,
            begin,
            end,
            output,
        } => {
            let buf = export_range(&ctx, &graph, parse_bound(&begin)?, parse_bound(&end)?)?;
            if output.as_os_str() == "-" {
                use std::io::Write;
                std::io::stdout().write_all(&buf)?;
            } else {
                fs::write(&output, &buf)?;
            }
            Ok(())
        }
        Command::Backfill { graph } => {
            let instrument = provider
                .instruments()?
                .into_iter()
                .find(|i| i.graph == graph)
                .ok_or_else(|| IngestError::Schema {
                    graph: graph.clone(),
                    reason: "no remote link configured".into(),
                })?;
            backfill_instrument(&ctx, &HttpFetchClient::new(), &instrument)
        }
        Command::Poll {
            interval_secs,
            once,
        } => {
            run_poller(
                &ctx,
                &HttpFetchClient::new(),
                Duration::from_secs(interval_secs),
                once.then_some(1),
            );
            Ok(())
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!(code = e.code(), error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(e.code() as i32);
    }
}
