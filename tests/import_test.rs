//! Integration tests for the table importer
//!
//! Staged files are written straight to a temp directory and imported into
//! the in-memory store or a SQLite store.

mod common;

use common::{stage, AGENCY, CALENDAR, ROUTES, STOPS, STOP_TIMES, TRIPS};
use gtfs_sync::adapters::store::{
    keys, search_stops, stop_schedule, DestinationStore, MemoryStore, SqliteStore,
};
use gtfs_sync::config::ImportConfig;
use gtfs_sync::core::import::TableImporter;
use gtfs_sync::core::progress::StageProgress;
use gtfs_sync::domain::ImportError;
use gtfs_sync::logging::{GroupLogger, LogGroup, LogGroups, MemoryLogSink};
use std::sync::Arc;
use tempfile::TempDir;
use test_case::test_case;
use tokio::sync::watch;

fn importer(parallel: bool) -> TableImporter {
    TableImporter::new(&ImportConfig::default(), GroupLogger::default())
        .with_parallel_parse(parallel)
}

fn not_cancelled() -> watch::Receiver<bool> {
    let (_tx, rx) = watch::channel(false);
    rx
}

fn stop_times_rows(count: usize) -> String {
    let mut body = String::from("trip_id,arrival_time,departure_time,stop_id,stop_sequence\n");
    for i in 0..count {
        body.push_str(&format!("T1,08:00:00,08:00:00,S{i},{i}\n"));
    }
    body
}

#[test_case(false ; "sequential")]
#[test_case(true ; "parallel")]
fn test_batch_boundary_issues_three_inserts(parallel: bool) {
    let dir = TempDir::new().unwrap();
    let importer = importer(parallel);
    let rows = 2 * importer.batch_size() + 7;
    let staged = stage(
        dir.path(),
        &[
            ("agency.txt", AGENCY.to_string()),
            ("stop_times.txt", stop_times_rows(rows)),
        ],
    );

    let mut store = MemoryStore::new();
    let report = importer
        .import_all(&mut store, &staged, &StageProgress::detached(), &not_cancelled())
        .unwrap();

    let calls: Vec<usize> = store
        .bulk_insert_calls()
        .into_iter()
        .filter(|(table, _)| table == "stop_times")
        .map(|(_, n)| n)
        .collect();
    assert_eq!(calls, vec![1000, 1000, 7]);
    assert_eq!(report.get("stop_times").unwrap().batches, 3);
    assert_eq!(store.row_count("stop_times").unwrap(), rows as u64);
}

#[test]
fn test_exact_multiple_has_no_empty_flush() {
    let dir = TempDir::new().unwrap();
    let importer = importer(false).with_batch_size(5);
    let staged = stage(dir.path(), &[("stop_times.txt", stop_times_rows(10))]);

    let mut store = MemoryStore::new();
    importer
        .import_all(&mut store, &staged, &StageProgress::detached(), &not_cancelled())
        .unwrap();
    assert_eq!(
        store.bulk_insert_calls(),
        vec![("stop_times".to_string(), 5), ("stop_times".to_string(), 5)]
    );
}

#[test_case(false ; "sequential")]
#[test_case(true ; "parallel")]
fn test_import_is_idempotent(parallel: bool) {
    let dir = TempDir::new().unwrap();
    let staged = stage(
        dir.path(),
        &[
            ("agency.txt", AGENCY.to_string()),
            ("stops.txt", STOPS.to_string()),
            ("trips.txt", TRIPS.to_string()),
            ("stop_times.txt", STOP_TIMES.to_string()),
        ],
    );
    let importer = importer(parallel);
    let mut store = MemoryStore::new();

    importer
        .import_all(&mut store, &staged, &StageProgress::detached(), &not_cancelled())
        .unwrap();
    let first: Vec<_> = ["agency", "stops", "trips", "stop_times"]
        .iter()
        .map(|t| store.rows(t))
        .collect();

    importer
        .import_all(&mut store, &staged, &StageProgress::detached(), &not_cancelled())
        .unwrap();
    let second: Vec<_> = ["agency", "stops", "trips", "stop_times"]
        .iter()
        .map(|t| store.rows(t))
        .collect();

    assert_eq!(first, second);
    assert_eq!(store.read_flag(keys::IMPORT_COMPLETE).unwrap(), Some(true));
}

#[test_case(false ; "sequential")]
#[test_case(true ; "parallel")]
fn test_failure_on_one_table_rolls_back_all(parallel: bool) {
    let dir = TempDir::new().unwrap();
    let staged = stage(
        dir.path(),
        &[
            ("agency.txt", AGENCY.to_string()),
            ("routes.txt", ROUTES.to_string()),
            ("stops.txt", STOPS.to_string()),
            ("trips.txt", TRIPS.to_string()),
        ],
    );
    let mut store = MemoryStore::new();
    store.fail_on_table(Some("stops"));

    let err = importer(parallel)
        .import_all(&mut store, &staged, &StageProgress::detached(), &not_cancelled())
        .unwrap_err();

    assert!(matches!(err, ImportError::Store { ref table, .. } if table == "stops"));
    for table in ["agency", "routes", "stops", "trips"] {
        assert_eq!(store.row_count(table).unwrap(), 0, "{table}");
    }
    assert!(!store.in_transaction());
    assert_eq!(store.read_flag(keys::IMPORT_COMPLETE).unwrap(), Some(false));
}

#[test]
fn test_short_stop_times_row_is_skipped() {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(MemoryLogSink::new(64));
    let logger = GroupLogger::new(LogGroups::all()).with_sink(sink.clone());
    let body = format!("{STOP_TIMES}T2,08:30:00,08:30:00\nT2,08:40:00,08:40:00,34343,1\n");
    let staged = stage(dir.path(), &[("stop_times.txt", body)]);

    let mut store = MemoryStore::new();
    let report = TableImporter::new(&ImportConfig::default(), logger)
        .import_all(&mut store, &staged, &StageProgress::detached(), &not_cancelled())
        .unwrap();

    let stats = report.get("stop_times").unwrap();
    assert_eq!(stats.inserted, 3);
    assert_eq!(stats.skipped, 1);
    assert_eq!(store.row_count("stop_times").unwrap(), 3);
    assert!(!sink.messages(LogGroup::ImportVerbose).is_empty());
}

#[test]
fn test_reordered_header_maps_by_name() {
    let dir = TempDir::new().unwrap();
    let staged = stage(
        dir.path(),
        &[(
            "stops.txt",
            "stop_lon,stop_lat,stop_name,stop_id\n-105.001,39.753,Union Station,33756\n"
                .to_string(),
        )],
    );

    let mut store = MemoryStore::new();
    importer(false)
        .import_all(&mut store, &staged, &StageProgress::detached(), &not_cancelled())
        .unwrap();

    let row = &store.rows("stops")[0];
    assert_eq!(row[0].as_deref(), Some("33756"));
    assert_eq!(row[1], None);
    assert_eq!(row[2].as_deref(), Some("Union Station"));
    assert_eq!(row[4].as_deref(), Some("39.753"));
    assert_eq!(row[5].as_deref(), Some("-105.001"));
}

#[test]
fn test_missing_required_column_fails_import() {
    let dir = TempDir::new().unwrap();
    let staged = stage(
        dir.path(),
        &[("calendar.txt", CALENDAR.replace("start_date,", "").replace("20250105,", ""))],
    );

    let mut store = MemoryStore::new();
    let err = importer(false)
        .import_all(&mut store, &staged, &StageProgress::detached(), &not_cancelled())
        .unwrap_err();
    assert!(matches!(
        err,
        ImportError::MissingColumn { ref column, .. } if column == "start_date"
    ));
}

#[test]
fn test_cancel_before_start_leaves_flag_untouched() {
    let dir = TempDir::new().unwrap();
    let staged = stage(dir.path(), &[("agency.txt", AGENCY.to_string())]);
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let mut store = MemoryStore::new();
    store.write_flag(keys::IMPORT_COMPLETE, true).unwrap();
    let err = importer(false)
        .import_all(&mut store, &staged, &StageProgress::detached(), &rx)
        .unwrap_err();

    assert!(matches!(err, ImportError::Cancelled));
    assert!(store.bulk_insert_calls().is_empty());
    assert_eq!(store.read_flag(keys::IMPORT_COMPLETE).unwrap(), Some(true));
}

#[test]
fn test_progress_reaches_full_stage() {
    let dir = TempDir::new().unwrap();
    let staged = stage(
        dir.path(),
        &[
            ("agency.txt", AGENCY.to_string()),
            ("stops.txt", STOPS.to_string()),
        ],
    );
    let progress = StageProgress::detached();
    importer(true)
        .import_all(&mut MemoryStore::new(), &staged, &progress, &not_cancelled())
        .unwrap();
    assert_eq!(progress.overall(), 100);
}

#[test]
fn test_sqlite_import_serves_queries() {
    let dir = TempDir::new().unwrap();
    let staged = stage(
        dir.path(),
        &[
            ("agency.txt", AGENCY.to_string()),
            ("stops.txt", STOPS.to_string()),
            ("trips.txt", TRIPS.to_string()),
            ("stop_times.txt", STOP_TIMES.to_string()),
        ],
    );

    let mut store = SqliteStore::open_in_memory().unwrap();
    importer(true)
        .import_all(&mut store, &staged, &StageProgress::detached(), &not_cancelled())
        .unwrap();

    assert_eq!(store.row_count("stops").unwrap(), 2);
    assert_eq!(store.read_flag(keys::IMPORT_COMPLETE).unwrap(), Some(true));

    let logger = GroupLogger::default();
    let matches = search_stops(&store, "union", &logger).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].stop_id, "33756");

    let schedule = stop_schedule(&store, "33756", &logger).unwrap();
    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].trip_id, "T1");
    assert_eq!(schedule[0].arrival_time, "08:12:00");
}
