//! In-memory destination store
//!
//! Backs dry runs and tests. Clones share state, so a test can keep one
//! handle for inspection while the coordinator opens others.

use super::schema::key_default;
use super::traits::{DestinationStore, Row, StoreOpener};
use crate::domain::tables::{table_spec, TableSpec};
use crate::domain::StoreError;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

type TableRows = BTreeMap<Vec<String>, Row>;
type Tables = BTreeMap<&'static str, TableRows>;

#[derive(Debug, Default)]
struct MemoryState {
    committed: Tables,
    pending: Option<Tables>,
    flags: BTreeMap<String, bool>,
    settings: BTreeMap<String, String>,
    bulk_insert_calls: Vec<(String, usize)>,
    fail_on_table: Option<String>,
    fail_next_opens: u32,
    opens: u32,
}

impl MemoryState {
    fn working(&self) -> &Tables {
        self.pending.as_ref().unwrap_or(&self.committed)
    }
}

/// Shared-state store holding every table in maps keyed by primary key
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Reject every bulk insert into `table` until cleared
    pub fn fail_on_table(&self, table: Option<&str>) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_on_table = table.map(str::to_string);
        }
    }

    /// Report the database as busy for the next `count` opens
    pub fn fail_next_opens(&self, count: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next_opens = count;
        }
    }

    /// Bulk insert calls as `(table, rows)` in call order
    pub fn bulk_insert_calls(&self) -> Vec<(String, usize)> {
        self.state
            .lock()
            .map(|state| state.bulk_insert_calls.clone())
            .unwrap_or_default()
    }

    /// Successful opens through [`StoreOpener`]
    pub fn open_count(&self) -> u32 {
        self.state.lock().map(|state| state.opens).unwrap_or(0)
    }

    /// Rows of a table ordered by primary key
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .ok()
            .and_then(|state| {
                state
                    .working()
                    .get(table)
                    .map(|rows| rows.values().cloned().collect())
            })
            .unwrap_or_default()
    }
}

fn busy_error() -> StoreError {
    StoreError::Sqlite {
        operation: "open store",
        source: rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        ),
    }
}

impl DestinationStore for MemoryStore {
    fn begin_transaction(&mut self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.pending.is_some() {
            return Err(StoreError::TransactionActive);
        }
        state.pending = Some(state.committed.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let pending = state.pending.take().ok_or(StoreError::NoTransaction)?;
        state.committed = pending;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state
            .pending
            .take()
            .map(|_| ())
            .ok_or(StoreError::NoTransaction)
    }

    fn in_transaction(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.pending.is_some())
            .unwrap_or(false)
    }

    fn bulk_insert(&mut self, table: &TableSpec, rows: &[Row]) -> Result<usize, StoreError> {
        let mut state = self.lock()?;
        state.bulk_insert_calls.push((table.name.to_string(), rows.len()));

        if state.fail_on_table.as_deref() == Some(table.name) {
            return Err(StoreError::Rejected {
                table: table.name.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != table.columns.len()) {
            return Err(StoreError::Rejected {
                table: table.name.to_string(),
                reason: format!(
                    "row has {} values for {} columns",
                    bad.len(),
                    table.columns.len()
                ),
            });
        }

        let key_indices = table.key_indices();
        let MemoryState {
            committed, pending, ..
        } = &mut *state;
        let target = pending.as_mut().unwrap_or(committed).entry(table.name).or_default();

        for row in rows {
            let mut row = row.clone();
            // NULL keys take the column default, as in the SQLite schema
            for &index in &key_indices {
                row[index]
                    .get_or_insert_with(|| key_default(table.columns[index].name).to_string());
            }
            let key: Vec<String> = key_indices
                .iter()
                .map(|&index| row[index].clone().unwrap_or_default())
                .collect();
            target.insert(key, row);
        }
        Ok(rows.len())
    }

    fn read_flag(&self, key: &str) -> Result<Option<bool>, StoreError> {
        Ok(self.lock()?.flags.get(key).copied())
    }

    fn write_flag(&mut self, key: &str, value: bool) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.pending.is_some() {
            return Err(StoreError::TransactionActive);
        }
        state.flags.insert(key.to_string(), value);
        Ok(())
    }

    fn read_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.settings.get(key).cloned())
    }

    fn write_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.pending.is_some() {
            return Err(StoreError::TransactionActive);
        }
        state.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn row_count(&self, table: &str) -> Result<u64, StoreError> {
        let spec = table_spec(table).ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        let state = self.lock()?;
        Ok(state
            .working()
            .get(spec.name)
            .map_or(0, |rows| rows.len() as u64))
    }
}

impl StoreOpener for MemoryStore {
    fn open(&self) -> Result<Box<dyn DestinationStore>, StoreError> {
        let mut state = self.lock()?;
        if state.fail_next_opens > 0 {
            state.fail_next_opens -= 1;
            return Err(busy_error());
        }
        state.opens += 1;
        Ok(Box::new(self.clone()))
    }

    fn describe(&self) -> String {
        "in-memory store".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::keys;
    use crate::domain::tables::{CALENDAR_DATES, STOPS, STOP_TIMES};

    fn calendar_date(service: &str, date: &str, exception: &str) -> Row {
        vec![
            Some(service.to_string()),
            Some(date.to_string()),
            Some(exception.to_string()),
        ]
    }

    #[test]
    fn test_rollback_restores_committed_rows() {
        let mut store = MemoryStore::new();
        store
            .bulk_insert(&CALENDAR_DATES, &[calendar_date("WK", "20250101", "2")])
            .unwrap();

        store.begin_transaction().unwrap();
        store
            .bulk_insert(&CALENDAR_DATES, &[calendar_date("WK", "20250704", "2")])
            .unwrap();
        assert_eq!(store.row_count("calendar_dates").unwrap(), 2);
        store.rollback().unwrap();

        assert_eq!(store.row_count("calendar_dates").unwrap(), 1);
    }

    #[test]
    fn test_replace_on_composite_key() {
        let mut store = MemoryStore::new();
        store
            .bulk_insert(
                &CALENDAR_DATES,
                &[
                    calendar_date("WK", "20250101", "2"),
                    calendar_date("WK", "20250101", "1"),
                ],
            )
            .unwrap();
        let rows = store.rows("calendar_dates");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2].as_deref(), Some("1"));
    }

    #[test]
    fn test_null_keys_take_column_defaults() {
        let mut store = MemoryStore::new();
        let mut row: Row = vec![None; STOP_TIMES.columns.len()];
        row[STOP_TIMES.column_index("trip_id").unwrap()] = Some("T1".to_string());
        store.bulk_insert(&STOP_TIMES, &[row]).unwrap();

        let rows = store.rows("stop_times");
        let sequence = STOP_TIMES.column_index("stop_sequence").unwrap();
        assert_eq!(rows[0][sequence].as_deref(), Some("0"));
    }

    #[test]
    fn test_injected_failure_is_recorded() {
        let mut store = MemoryStore::new();
        store.fail_on_table(Some("stops"));
        let row: Row = vec![Some("1".to_string()); STOPS.columns.len()];
        assert!(store.bulk_insert(&STOPS, &[row]).is_err());
        assert_eq!(store.bulk_insert_calls(), vec![("stops".to_string(), 1)]);
    }

    #[test]
    fn test_opens_report_busy_then_succeed() {
        let store = MemoryStore::new();
        store.fail_next_opens(2);
        assert!(matches!(store.open(), Err(e) if e.is_busy()));
        assert!(matches!(store.open(), Err(e) if e.is_busy()));
        assert!(store.open().is_ok());
        assert_eq!(store.open_count(), 1);
    }

    #[test]
    fn test_flag_shared_between_clones() {
        let store = MemoryStore::new();
        let mut handle = store.open().unwrap();
        handle.write_flag(keys::IMPORT_COMPLETE, true).unwrap();
        assert_eq!(store.read_flag(keys::IMPORT_COMPLETE).unwrap(), Some(true));
    }

    #[test]
    fn test_settings_refused_in_transaction() {
        let mut store = MemoryStore::new();
        store.begin_transaction().unwrap();
        assert!(matches!(
            store.write_setting(keys::SOURCE_URL, "x"),
            Err(StoreError::TransactionActive)
        ));
        store.commit().unwrap();
        assert!(matches!(store.commit(), Err(StoreError::NoTransaction)));
    }
}
