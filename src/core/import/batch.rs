//! Row batching and import statistics

use crate::adapters::store::Row;
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts for one imported table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableImportStats {
    /// Rows handed to the store
    pub inserted: u64,
    /// Rows dropped for having too few fields
    pub skipped: u64,
    /// Bulk insert calls issued
    pub batches: u64,
}

/// Per-table outcome of a committed import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub tables: BTreeMap<String, TableImportStats>,
}

impl ImportReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stats slot for a table, created empty on first use
    pub fn table_mut(&mut self, table: &str) -> &mut TableImportStats {
        self.tables.entry(table.to_string()).or_default()
    }

    pub fn get(&self, table: &str) -> Option<&TableImportStats> {
        self.tables.get(table)
    }

    pub fn total_inserted(&self) -> u64 {
        self.tables.values().map(|s| s.inserted).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.tables.values().map(|s| s.skipped).sum()
    }
}

/// Accumulates rows until a batch is full
#[derive(Debug)]
pub struct RowBatch {
    rows: Vec<Row>,
    capacity: usize,
}

impl RowBatch {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            rows: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a row, handing back the full batch when it reaches capacity
    pub fn push(&mut self, row: Row) -> Option<Vec<Row>> {
        self.rows.push(row);
        if self.rows.len() >= self.capacity {
            Some(std::mem::replace(
                &mut self.rows,
                Vec::with_capacity(self.capacity),
            ))
        } else {
            None
        }
    }

    /// Remaining rows, possibly none
    pub fn take_remaining(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
