//! Shared fixtures for integration tests

#![allow(dead_code)]

use gtfs_sync::adapters::source::LocalArchiveSource;
use gtfs_sync::adapters::store::MemoryStore;
use gtfs_sync::config::SyncConfig;
use gtfs_sync::core::update::UpdateCoordinator;
use gtfs_sync::logging::GroupLogger;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const AGENCY: &str = "agency_id,agency_name,agency_url,agency_timezone\n\
RTD,Regional Transportation District,https://www.rtd-denver.com,America/Denver\n";

pub const STOPS: &str = "stop_id,stop_code,stop_name,stop_desc,stop_lat,stop_lon\n\
33756,33756,Union Station Track 1,Vehicles Travelling North,39.753,-105.001\n\
34343,34343,Civic Center Station Gate B,,39.738,-104.987\n";

pub const CALENDAR: &str = "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
WK,1,1,1,1,1,0,0,20250105,20250503\n";

pub const CALENDAR_DATES: &str = "service_id,date,exception_type\nWK,20250526,2\n";

pub const ROUTES: &str = "route_id,agency_id,route_short_name,route_long_name,route_type\n\
0,RTD,0,Broadway,3\n";

pub const TRIPS: &str = "route_id,service_id,trip_id,trip_headsign,direction_id\n\
0,WK,T1,Union Station,0\n";

pub const STOP_TIMES: &str = "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
T1,08:00:00,08:00:00,34343,1\n\
T1,08:12:00,08:12:00,33756,2\n";

/// Every table the default configuration requires
pub fn full_feed() -> Vec<(&'static str, String)> {
    vec![
        ("agency.txt", AGENCY.to_string()),
        ("calendar.txt", CALENDAR.to_string()),
        ("calendar_dates.txt", CALENDAR_DATES.to_string()),
        ("routes.txt", ROUTES.to_string()),
        ("stops.txt", STOPS.to_string()),
        ("trips.txt", TRIPS.to_string()),
        ("stop_times.txt", STOP_TIMES.to_string()),
    ]
}

/// Write a zip archive holding `members`
pub fn write_zip(path: &Path, members: &[(&str, String)]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, body) in members {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// Write staged table files and return the set
pub fn stage(dir: &Path, members: &[(&str, String)]) -> gtfs_sync::domain::StagedFileSet {
    let mut staged = gtfs_sync::domain::StagedFileSet::new(dir);
    for (file_name, body) in members {
        let path = dir.join(file_name);
        std::fs::write(&path, body).unwrap();
        let table = file_name.trim_end_matches(".txt");
        staged.insert(table, path);
    }
    staged
}

/// Configuration rooted in a test directory with fast store retries
pub fn test_config(root: &Path) -> SyncConfig {
    let mut config = SyncConfig::default();
    config.staging.dir = root.join("staging").display().to_string();
    config.store.path = root.join("bus_schedule.db").display().to_string();
    config.store.retry.initial_delay_ms = 1;
    config.store.retry.max_delay_ms = 5;
    config
}

/// Coordinator over the local source and a shared memory store
pub fn coordinator(
    config: SyncConfig,
    store: &MemoryStore,
) -> (UpdateCoordinator, watch::Sender<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let coordinator = UpdateCoordinator::new(
        config,
        Arc::new(LocalArchiveSource::new()),
        Arc::new(store.clone()),
        GroupLogger::default(),
        shutdown_rx,
    );
    (coordinator, shutdown_tx)
}

pub fn archive_url(path: &Path) -> String {
    path.display().to_string()
}
