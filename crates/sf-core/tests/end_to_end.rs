//! End-to-end chain tests over a temp store and an in-memory fetch client.

use std::collections::HashMap;
use std::fs;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sf_common::{IngestError, Result};
use sf_core::{
    backfill_instrument, export_range, ingest_bytes, poll_cycle, refresh_charts, FetchClient,
    IngestOptions, PipelineContext, RemoteFile,
};
use sf_schema::{
    provider::write_schema_file, GraphSchema, JsonSchemaProvider, SchemaProvider, TimeColumn,
    VariableColumn,
};
use sf_store::{read_partition, StoreLayout};

fn schema(graph: &str, vars: Vec<VariableColumn>) -> GraphSchema {
    GraphSchema {
        name: graph.into(),
        time_format: "d.m.Y H:M".into(),
        time_columns: vec![TimeColumn {
            name: "Time".into(),
            use_flag: true,
        }],
        variables: vars,
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    provider: JsonSchemaProvider,
    layout: StoreLayout,
}

impl Fixture {
    fn new(schemas: &[(GraphSchema, Option<String>)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let schema_path = dir.path().join("schemas.json");
        write_schema_file(&schema_path, schemas).unwrap();
        let layout = StoreLayout::new(dir.path().join("data"));
        Self {
            _dir: dir,
            provider: JsonSchemaProvider::new(schema_path),
            layout,
        }
    }

    fn ctx(&self) -> PipelineContext<'_> {
        PipelineContext {
            schemas: &self.provider,
            layout: self.layout.clone(),
        }
    }
}

fn dt(d: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, d)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

#[test]
fn ingested_partition_has_canonical_shape() {
    let fx = Fixture::new(&[(
        schema(
            "aeth",
            vec![
                VariableColumn::new("A"),
                VariableColumn {
                    use_flag: false,
                    ..VariableColumn::new("B")
                },
            ],
        ),
        None,
    )]);
    let ctx = fx.ctx();

    let raw = b"Time,A,B\n\
        15.03.2024 10:10,2,9\n\
        15.03.2024 10:00,1,9\n\
        15.03.2024 10:00,1,9\n";
    ingest_bytes(&ctx, "aeth", raw, IngestOptions::default())
        .unwrap()
        .unwrap();

    let part = read_partition(&fx.layout.partition_path("aeth", 2024, 3)).unwrap();
    assert_eq!(part.column_names(), vec!["A"]);
    assert!(part.column("B").is_none());
    assert_eq!(part.timestamps, vec![dt(15, 10, 0), dt(15, 10, 10)]);
    assert_eq!(part.column("A").unwrap().values, vec![Some(1.0), Some(2.0)]);
}

#[test]
fn column_mismatch_leaves_the_store_untouched() {
    let fx = Fixture::new(&[(
        schema("aeth", vec![VariableColumn::new("A"), VariableColumn::new("C")]),
        None,
    )]);
    let ctx = fx.ctx();

    let raw = b"Time,A\n15.03.2024 10:00,1\n";
    let err = ingest_bytes(&ctx, "aeth", raw, IngestOptions::default()).unwrap_err();
    assert!(matches!(err, IngestError::ColumnMismatch { .. }));
    assert!(!fx.layout.graph_dir("aeth").exists());
}

#[test]
fn re_running_the_chain_is_idempotent() {
    let fx = Fixture::new(&[(schema("aeth", vec![VariableColumn::new("A")]), None)]);
    let ctx = fx.ctx();

    let raw = b"Time,A\n15.03.2024 10:00,1.5\n15.03.2024 10:05,2\n";
    ingest_bytes(&ctx, "aeth", raw, IngestOptions::default()).unwrap();
    let first = fs::read(fx.layout.partition_path("aeth", 2024, 3)).unwrap();
    ingest_bytes(&ctx, "aeth", raw, IngestOptions::default()).unwrap();
    let second = fs::read(fx.layout.partition_path("aeth", 2024, 3)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn gap_boundaries_survive_to_the_partition() {
    let fx = Fixture::new(&[(schema("aeth", vec![VariableColumn::new("A")]), None)]);
    let ctx = fx.ctx();

    // five-minute cadence, then a 250-minute outage
    let raw = b"Time,A\n\
        15.03.2024 10:00,1\n\
        15.03.2024 10:05,2\n\
        15.03.2024 10:05,2\n\
        15.03.2024 14:10,3\n";
    ingest_bytes(&ctx, "aeth", raw, IngestOptions::default()).unwrap();

    let part = read_partition(&fx.layout.partition_path("aeth", 2024, 3)).unwrap();
    assert_eq!(part.len(), 5);
    let nulls: Vec<NaiveDateTime> = part
        .timestamps
        .iter()
        .zip(&part.column("A").unwrap().values)
        .filter(|(_, v)| v.is_none())
        .map(|(t, _)| *t)
        .collect();
    assert_eq!(nulls.len(), 2);
    assert!(nulls.iter().all(|t| *t > dt(15, 10, 5) && *t < dt(15, 14, 10)));
    // still sorted and unique
    let mut sorted = part.timestamps.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted, part.timestamps);
}

#[test]
fn coefficient_scales_export_and_chart_alike() {
    let fx = Fixture::new(&[(
        schema(
            "aeth",
            vec![VariableColumn {
                coefficient: 2.0,
                default: true,
                ..VariableColumn::new("A")
            }],
        ),
        None,
    )]);
    let ctx = fx.ctx();

    let raw = b"Time,A\n15.03.2024 10:00,5\n15.03.2024 10:05,5\n";
    ingest_bytes(&ctx, "aeth", raw, IngestOptions::default()).unwrap();

    // stored raw, never scaled at rest
    let part = read_partition(&fx.layout.partition_path("aeth", 2024, 3)).unwrap();
    assert_eq!(part.column("A").unwrap().values[0], Some(5.0));

    let csv = export_range(&ctx, "aeth", dt(15, 0, 0), dt(16, 0, 0)).unwrap();
    let text = String::from_utf8(csv).unwrap();
    assert!(text.contains(",10"), "export not scaled: {text}");

    refresh_charts(&ctx, "aeth").unwrap();
    let html = fs::read_to_string(fx.layout.chart_path("recent", "aeth")).unwrap();
    assert!(html.contains("10.0"), "chart series not scaled");
    assert!(fx.layout.chart_path("full", "aeth").exists());
}

struct MemFetch {
    folders: HashMap<String, Vec<RemoteFile>>,
    blobs: HashMap<String, Vec<u8>>,
}

impl MemFetch {
    fn new() -> Self {
        Self {
            folders: HashMap::new(),
            blobs: HashMap::new(),
        }
    }

    fn add(&mut self, link: &str, name: &str, modified: DateTime<Utc>, bytes: &[u8]) {
        let href = format!("{link}/{name}");
        self.folders
            .entry(link.to_string())
            .or_default()
            .push(RemoteFile {
                name: name.to_string(),
                modified_at: modified,
                download_url: href.clone(),
            });
        self.blobs.insert(href, bytes.to_vec());
    }
}

impl FetchClient for MemFetch {
    fn list_files(&self, link: &str) -> Result<Vec<RemoteFile>> {
        self.folders
            .get(link)
            .cloned()
            .ok_or_else(|| IngestError::Transport(format!("unknown link {link}")))
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.blobs
            .get(url)
            .cloned()
            .ok_or_else(|| IngestError::Transport(format!("unknown url {url}")))
    }
}

fn mod_at(day: u32) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&format!("2024-03-{day:02}T12:00:00Z"))
        .unwrap()
        .with_timezone(&Utc)
}

#[test]
fn poll_ingests_only_the_newest_file_per_instrument() {
    let fx = Fixture::new(&[(
        schema("aeth", vec![VariableColumn::new("A")]),
        Some("disk:/aeth".into()),
    )]);
    let ctx = fx.ctx();

    let mut fetch = MemFetch::new();
    fetch.add(
        "disk:/aeth",
        "old.csv",
        mod_at(1),
        b"Time,A\n01.03.2024 10:00,1\n01.03.2024 10:05,1\n",
    );
    fetch.add(
        "disk:/aeth",
        "new.csv",
        mod_at(15),
        b"Time,A\n15.03.2024 10:00,2\n15.03.2024 10:05,2\n",
    );

    poll_cycle(&ctx, &fetch);

    let part = read_partition(&fx.layout.partition_path("aeth", 2024, 3)).unwrap();
    assert_eq!(part.len(), 2);
    assert!(part.timestamps.iter().all(|t| *t >= dt(15, 10, 0)));
    assert!(fx.layout.chart_path("full", "aeth").exists());
    assert!(fx.layout.chart_path("recent", "aeth").exists());
}

#[test]
fn one_bad_instrument_never_aborts_the_cycle() {
    let fx = Fixture::new(&[
        (
            schema("bad", vec![VariableColumn::new("Missing")]),
            Some("disk:/bad".into()),
        ),
        (
            schema("good", vec![VariableColumn::new("A")]),
            Some("disk:/good".into()),
        ),
    ]);
    let ctx = fx.ctx();

    let mut fetch = MemFetch::new();
    fetch.add(
        "disk:/bad",
        "f.csv",
        mod_at(15),
        b"Time,Other\n15.03.2024 10:00,1\n",
    );
    fetch.add(
        "disk:/good",
        "f.csv",
        mod_at(15),
        b"Time,A\n15.03.2024 10:00,4\n15.03.2024 10:05,5\n",
    );

    poll_cycle(&ctx, &fetch);

    assert!(!fx.layout.graph_dir("bad").exists());
    assert!(fx.layout.partition_path("good", 2024, 3).exists());
}

#[test]
fn backfill_merges_every_month_and_renders_once() {
    let fx = Fixture::new(&[(
        schema("aeth", vec![VariableColumn::new("A")]),
        Some("disk:/aeth".into()),
    )]);
    let ctx = fx.ctx();

    let mut fetch = MemFetch::new();
    fetch.add(
        "disk:/aeth",
        "feb.csv",
        mod_at(1),
        b"Time,A\n10.02.2024 10:00,1\n10.02.2024 10:05,1\n",
    );
    fetch.add(
        "disk:/aeth",
        "mar.csv",
        mod_at(15),
        b"Time,A\n15.03.2024 10:00,2\n15.03.2024 10:05,2\n",
    );
    // non-CSV files are ignored in a CSV folder
    fetch.add("disk:/aeth", "notes.txt", mod_at(2), b"irrelevant");

    let instrument = fx.provider.instruments().unwrap().pop().unwrap();
    backfill_instrument(&ctx, &fetch, &instrument).unwrap();

    assert!(fx.layout.partition_path("aeth", 2024, 2).exists());
    assert!(fx.layout.partition_path("aeth", 2024, 3).exists());
    assert!(fx.layout.chart_path("full", "aeth").exists());
}

#[test]
fn backfill_falls_back_to_text_files_in_csv_less_folders() {
    let fx = Fixture::new(&[(
        schema("lvs", vec![VariableColumn::new("Flow")]),
        Some("disk:/lvs".into()),
    )]);
    let ctx = fx.ctx();

    let mut fetch = MemFetch::new();
    fetch.add(
        "disk:/lvs",
        "march.txt",
        mod_at(15),
        b"Time\tFlow\n15.03.2024 10:00\t1,5\n15.03.2024 10:05\t2\n",
    );
    fetch.add("disk:/lvs", "manual.pdf", mod_at(1), b"irrelevant");

    let instrument = fx.provider.instruments().unwrap().pop().unwrap();
    backfill_instrument(&ctx, &fetch, &instrument).unwrap();

    let part = read_partition(&fx.layout.partition_path("lvs", 2024, 3)).unwrap();
    assert_eq!(part.len(), 2);
    assert_eq!(part.column("Flow").unwrap().values[0], Some(1.5));
}

#[test]
fn export_bounds_are_exact() {
    let fx = Fixture::new(&[(schema("aeth", vec![VariableColumn::new("A")]), None)]);
    let ctx = fx.ctx();

    let raw = b"Time,A\n\
        14.03.2024 10:00,1\n\
        15.03.2024 10:00,2\n\
        16.03.2024 10:00,3\n";
    ingest_bytes(&ctx, "aeth", raw, IngestOptions::default()).unwrap();

    let csv = export_range(&ctx, "aeth", dt(15, 0, 0), dt(15, 23, 0)).unwrap();
    let text = String::from_utf8(csv).unwrap();
    assert!(text.contains("2024-03-15 10:00:00"));
    assert!(!text.contains("2024-03-14"));
    assert!(!text.contains("2024-03-16"));
}

#[test]
fn user_upload_backfills_historical_months() {
    let fx = Fixture::new(&[(schema("aeth", vec![VariableColumn::new("A")]), None)]);
    let ctx = fx.ctx();

    // current data first, then a historical upload for a prior year
    ingest_bytes(
        &ctx,
        "aeth",
        b"Time,A\n15.03.2024 10:00,1\n15.03.2024 10:05,1\n",
        IngestOptions::default(),
    )
    .unwrap();
    ingest_bytes(
        &ctx,
        "aeth",
        b"Time,A\n15.03.2023 10:00,9\n15.03.2023 10:05,9\n",
        IngestOptions {
            unattended: false,
            user_upload: true,
        },
    )
    .unwrap();

    assert!(fx.layout.partition_path("aeth", 2023, 3).exists());
    assert!(fx.layout.partition_path("aeth", 2024, 3).exists());
}
