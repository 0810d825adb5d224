//! Fixed destination schema
//!
//! The GTFS tables are declared from the table catalogue so insert column
//! lists and DDL cannot drift apart. Key columns are `NOT NULL DEFAULT ''`,
//! which lets `INSERT OR REPLACE` fold a missing optional key (such as
//! `agency_id` in single-agency feeds) onto one row.

use crate::domain::tables::{TableSpec, TABLES};
use crate::domain::StoreError;
use rusqlite::Connection;

const INTEGER_COLUMNS: &[&str] = &[
    "route_type",
    "direction_id",
    "location_type",
    "wheelchair_boarding",
    "stop_sequence",
    "pickup_type",
    "drop_off_type",
    "timepoint",
    "exception_type",
    "shape_pt_sequence",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

fn column_affinity(name: &str) -> &'static str {
    if INTEGER_COLUMNS.contains(&name) {
        "INTEGER"
    } else if name.ends_with("_lat") || name.ends_with("_lon") || name == "shape_dist_traveled" {
        "REAL"
    } else {
        "TEXT"
    }
}

/// Value a NULL key column takes on insert
pub(crate) fn key_default(name: &str) -> &'static str {
    if column_affinity(name) == "TEXT" {
        ""
    } else {
        "0"
    }
}

/// `CREATE TABLE` statement for one catalogue table
pub fn table_ddl(spec: &TableSpec) -> String {
    let columns: Vec<String> = spec
        .columns
        .iter()
        .map(|column| {
            let affinity = column_affinity(column.name);
            if spec.primary_key.contains(&column.name) {
                let default = key_default(column.name);
                let literal = if affinity == "TEXT" {
                    format!("'{default}'")
                } else {
                    default.to_string()
                };
                format!("\"{}\" {affinity} NOT NULL DEFAULT {literal}", column.name)
            } else {
                format!("\"{}\" {affinity}", column.name)
            }
        })
        .collect();
    let key: Vec<String> = spec.primary_key.iter().map(|k| format!("\"{k}\"")).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {},\n    PRIMARY KEY ({})\n)",
        spec.name,
        columns.join(",\n    "),
        key.join(", ")
    )
}

/// Create every table, index and bookkeeping table that is missing
pub fn initialise_schema(connection: &mut Connection) -> Result<(), StoreError> {
    let transaction = connection
        .transaction()
        .map_err(|source| StoreError::Sqlite {
            operation: "begin schema transaction",
            source,
        })?;

    for spec in TABLES {
        transaction
            .execute_batch(&table_ddl(spec))
            .map_err(|source| StoreError::Sqlite {
                operation: "create table",
                source,
            })?;
    }

    transaction
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS flags (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_stop_times_stop_id ON stop_times (stop_id);
            CREATE INDEX IF NOT EXISTS idx_trips_route_id ON trips (route_id);",
        )
        .map_err(|source| StoreError::Sqlite {
            operation: "create bookkeeping tables",
            source,
        })?;

    transaction.commit().map_err(|source| StoreError::Sqlite {
        operation: "commit schema transaction",
        source,
    })
}
