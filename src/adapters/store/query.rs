//! Read-only lookups against an imported store

use super::sqlite::SqliteStore;
use crate::domain::StoreError;
use crate::logging::{GroupLogger, LogGroup};
use serde::Serialize;

/// A stop matching a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopMatch {
    pub stop_id: String,
    pub stop_name: String,
}

/// One scheduled call at a stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledArrival {
    pub trip_id: String,
    pub stop_sequence: i64,
    pub arrival_time: String,
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Stops whose name, code or description contains `text`
pub fn search_stops(
    store: &SqliteStore,
    text: &str,
    logger: &GroupLogger,
) -> Result<Vec<StopMatch>, StoreError> {
    let pattern = format!("%{}%", escape_like(text.trim()));
    logger.log_with(LogGroup::QueryVerbose, || {
        format!("search_stops pattern {pattern}")
    });

    let mut statement = store
        .connection()
        .prepare_cached(
            "SELECT stop_id, stop_name FROM stops
             WHERE stop_name LIKE ?1 ESCAPE '\\'
                OR stop_code LIKE ?1 ESCAPE '\\'
                OR stop_desc LIKE ?1 ESCAPE '\\'
             ORDER BY stop_name, stop_id",
        )
        .map_err(|source| StoreError::Sqlite {
            operation: "prepare stop search",
            source,
        })?;

    let matches = statement
        .query_map([&pattern], |row| {
            Ok(StopMatch {
                stop_id: row.get(0)?,
                stop_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|source| StoreError::Sqlite {
            operation: "search stops",
            source,
        })?;

    logger.log(
        LogGroup::QuerySimple,
        format!("search '{}' matched {} stops", text, matches.len()),
    );
    Ok(matches)
}

/// Calls at `stop_id` ordered by arrival time
pub fn stop_schedule(
    store: &SqliteStore,
    stop_id: &str,
    logger: &GroupLogger,
) -> Result<Vec<ScheduledArrival>, StoreError> {
    let mut statement = store
        .connection()
        .prepare_cached(
            "SELECT trip_id, stop_sequence, arrival_time FROM stop_times
             WHERE stop_id = ?1
             ORDER BY arrival_time, trip_id",
        )
        .map_err(|source| StoreError::Sqlite {
            operation: "prepare stop schedule",
            source,
        })?;

    let arrivals = statement
        .query_map([stop_id], |row| {
            Ok(ScheduledArrival {
                trip_id: row.get(0)?,
                stop_sequence: row.get(1)?,
                arrival_time: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|source| StoreError::Sqlite {
            operation: "read stop schedule",
            source,
        })?;

    logger.log(
        LogGroup::QuerySimple,
        format!("stop {} has {} scheduled calls", stop_id, arrivals.len()),
    );
    Ok(arrivals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::{DestinationStore, Row};
    use crate::domain::tables::{STOPS, STOP_TIMES};

    fn seeded() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let stop = |id: &str, code: &str, name: &str, desc: &str| -> Row {
            let mut row: Row = vec![None; STOPS.columns.len()];
            row[0] = Some(id.to_string());
            row[1] = Some(code.to_string());
            row[2] = Some(name.to_string());
            row[3] = Some(desc.to_string());
            row[4] = Some("39.7".to_string());
            row[5] = Some("-105.0".to_string());
            row
        };
        store
            .bulk_insert(
                &STOPS,
                &[
                    stop("100", "UNS", "Union Station", "Gate A"),
                    stop("200", "CIV", "Civic Center", "Bay 3"),
                    stop("300", "50%", "Broadway & 1st", ""),
                ],
            )
            .unwrap();

        let call = |trip: &str, stop: &str, seq: &str, at: &str| -> Row {
            let mut row: Row = vec![None; STOP_TIMES.columns.len()];
            row[0] = Some(trip.to_string());
            row[1] = Some(at.to_string());
            row[2] = Some(at.to_string());
            row[3] = Some(stop.to_string());
            row[4] = Some(seq.to_string());
            row
        };
        store
            .bulk_insert(
                &STOP_TIMES,
                &[
                    call("T2", "100", "4", "08:15:00"),
                    call("T1", "100", "1", "07:45:00"),
                    call("T1", "200", "2", "07:55:00"),
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_search_matches_name_code_and_description() {
        let store = seeded();
        let logger = GroupLogger::default();

        let by_name = search_stops(&store, "union", &logger).unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].stop_id, "100");

        assert_eq!(search_stops(&store, "CIV", &logger).unwrap()[0].stop_id, "200");
        assert_eq!(search_stops(&store, "Bay", &logger).unwrap()[0].stop_id, "200");
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let store = seeded();
        let found = search_stops(&store, "%", &GroupLogger::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].stop_id, "300");
    }

    #[test]
    fn test_schedule_ordered_by_arrival() {
        let store = seeded();
        let calls = stop_schedule(&store, "100", &GroupLogger::default()).unwrap();
        assert_eq!(
            calls,
            vec![
                ScheduledArrival {
                    trip_id: "T1".to_string(),
                    stop_sequence: 1,
                    arrival_time: "07:45:00".to_string(),
                },
                ScheduledArrival {
                    trip_id: "T2".to_string(),
                    stop_sequence: 4,
                    arrival_time: "08:15:00".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_schedule_unknown_stop_is_empty() {
        let store = seeded();
        assert!(stop_schedule(&store, "999", &GroupLogger::default())
            .unwrap()
            .is_empty());
    }
}
