//! Incremental polling and bulk backfill.
//!
//! Both triggers feed the same chain. The incremental poll touches only
//! the most-recently-modified remote file per instrument; registration
//! backfill downloads every file concurrently but merges sequentially so
//! partition writes stay single-writer.

use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sf_common::{IngestError, Result};
use sf_schema::Instrument;
use tracing::{error, info, warn};

use crate::chain::{ingest_bytes, refresh_charts, IngestOptions, PipelineContext};

/// One file in an instrument's remote folder.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    #[serde(rename = "modified")]
    pub modified_at: DateTime<Utc>,
    #[serde(rename = "href")]
    pub download_url: String,
}

/// Minimal remote-storage contract consumed by the pipeline.
///
/// `Sync` because backfill downloads run on scoped threads sharing one
/// client.
pub trait FetchClient: Sync {
    /// List the files in the folder behind a public link.
    fn list_files(&self, link: &str) -> Result<Vec<RemoteFile>>;

    /// Download one file's bytes.
    fn download(&self, url: &str) -> Result<Vec<u8>>;

    /// Whether the folder carries CSV files at all; `false` selects the
    /// tab-separated Latin-1 text fallback.
    fn has_csv(&self, link: &str) -> Result<bool> {
        Ok(self
            .list_files(link)?
            .iter()
            .any(|f| f.name.ends_with(".csv")))
    }
}

/// `FetchClient` over HTTP: the link serves a JSON file index
/// (`[{name, modified, href}]`) and each `href` serves raw bytes.
pub struct HttpFetchClient {
    agent: ureq::Agent,
}

impl HttpFetchClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(120))
                .build(),
        }
    }
}

impl Default for HttpFetchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchClient for HttpFetchClient {
    fn list_files(&self, link: &str) -> Result<Vec<RemoteFile>> {
        self.agent
            .get(link)
            .call()
            .map_err(|e| IngestError::Transport(e.to_string()))?
            .into_json::<Vec<RemoteFile>>()
            .map_err(|e| IngestError::Transport(e.to_string()))
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| IngestError::Transport(e.to_string()))?;
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut response.into_reader(), &mut bytes)?;
        Ok(bytes)
    }
}

/// One incremental poll pass over every registered instrument.
///
/// Per-instrument failures are logged and never abort the remaining
/// instruments in the cycle.
pub fn poll_cycle(ctx: &PipelineContext<'_>, fetch: &dyn FetchClient) {
    let instruments = match ctx.schemas.instruments() {
        Ok(instruments) => instruments,
        Err(e) => {
            error!(error = %e, "cannot enumerate instruments, skipping cycle");
            return;
        }
    };
    for instrument in &instruments {
        if let Err(e) = poll_instrument(ctx, fetch, instrument) {
            warn!(
                graph = %instrument.graph,
                code = e.code(),
                error = %e,
                "instrument skipped for this cycle"
            );
        }
    }
}

fn poll_instrument(
    ctx: &PipelineContext<'_>,
    fetch: &dyn FetchClient,
    instrument: &Instrument,
) -> Result<()> {
    let files = fetch.list_files(&instrument.link)?;
    let Some(newest) = files.iter().max_by_key(|f| f.modified_at) else {
        return Ok(());
    };
    let bytes = fetch.download(&newest.download_url)?;
    let outcome = ingest_bytes(
        ctx,
        &instrument.graph,
        &bytes,
        IngestOptions {
            unattended: true,
            user_upload: false,
        },
    )?;
    if outcome.is_some() {
        refresh_charts(ctx, &instrument.graph)?;
    }
    Ok(())
}

/// Full historical backfill for a newly registered instrument.
///
/// All remote files are fetched concurrently (one task per file); merges
/// run sequentially afterwards to keep partition writes single-writer. A
/// failed download aborts only that file, never its siblings.
pub fn backfill_instrument(
    ctx: &PipelineContext<'_>,
    fetch: &dyn FetchClient,
    instrument: &Instrument,
) -> Result<()> {
    let csv_folder = fetch.has_csv(&instrument.link)?;
    let files = fetch.list_files(&instrument.link)?;
    let wanted: Vec<&RemoteFile> = files
        .iter()
        .filter(|f| {
            if csv_folder {
                f.name.ends_with(".csv")
            } else {
                f.name.ends_with(".txt")
            }
        })
        .collect();
    info!(
        graph = %instrument.graph,
        files = wanted.len(),
        csv_folder,
        "backfill started"
    );

    let downloads: Vec<(String, Result<Vec<u8>>)> = thread::scope(|scope| {
        let handles: Vec<_> = wanted
            .iter()
            .map(|file| {
                scope.spawn(move || (file.name.clone(), fetch.download(&file.download_url)))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    (
                        String::from("<unknown>"),
                        Err(IngestError::Transport("download task panicked".into())),
                    )
                })
            })
            .collect()
    });

    for (name, result) in downloads {
        match result {
            Ok(bytes) => {
                ingest_bytes(
                    ctx,
                    &instrument.graph,
                    &bytes,
                    IngestOptions {
                        unattended: true,
                        user_upload: false,
                    },
                )?;
            }
            Err(e) => {
                warn!(
                    graph = %instrument.graph,
                    file = %name,
                    error = %e,
                    "backfill download failed"
                );
            }
        }
    }

    refresh_charts(ctx, &instrument.graph)
}

/// Interval-driven poller. Owns only the trigger; each cycle receives the
/// context and fetch client by reference and nothing outlives the call.
pub fn run_poller(
    ctx: &PipelineContext<'_>,
    fetch: &dyn FetchClient,
    interval: Duration,
    max_cycles: Option<u64>,
) {
    let mut cycles = 0u64;
    loop {
        poll_cycle(ctx, fetch);
        cycles += 1;
        if let Some(max) = max_cycles {
            if cycles >= max {
                return;
            }
        }
        thread::sleep(interval);
    }
}
