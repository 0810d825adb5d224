//! Source-to-destination column mapping
//!
//! A [`ColumnMap`] records, for every destination column of a table, which
//! field of a source record feeds it.

use crate::adapters::store::Row;
use crate::domain::{ImportError, TableSpec};
use csv::StringRecord;

/// Destination column index to source field index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    table: &'static TableSpec,
    sources: Vec<Option<usize>>,
    min_fields: usize,
    header_driven: bool,
}

fn normalise(field: &str) -> String {
    field.trim_start_matches('\u{feff}').trim().to_ascii_lowercase()
}

impl ColumnMap {
    /// Map columns by name from a file's header line
    ///
    /// When the header names none of the table's columns the published
    /// order is used instead. A header that names some columns but not a
    /// required one is rejected.
    pub fn from_header(
        table: &'static TableSpec,
        header: &StringRecord,
    ) -> Result<Self, ImportError> {
        let names: Vec<String> = header.iter().map(normalise).collect();
        let sources: Vec<Option<usize>> = table
            .columns
            .iter()
            .map(|column| names.iter().position(|name| name == column.name))
            .collect();

        if sources.iter().all(Option::is_none) {
            tracing::debug!(
                table = %table.name,
                "Header names no known columns, using published column order"
            );
            return Ok(Self::published(table));
        }

        if let Some(column) = table
            .columns
            .iter()
            .zip(&sources)
            .find(|(column, source)| column.required && source.is_none())
            .map(|(column, _)| column)
        {
            return Err(ImportError::MissingColumn {
                table: table.name.to_string(),
                column: column.name.to_string(),
            });
        }

        Ok(Self::build(table, sources, true))
    }

    /// Map columns by their position in the published GTFS order
    pub fn published(table: &'static TableSpec) -> Self {
        let sources = table
            .columns
            .iter()
            .map(|column| table.source_order.iter().position(|name| *name == column.name))
            .collect();
        Self::build(table, sources, false)
    }

    fn build(table: &'static TableSpec, sources: Vec<Option<usize>>, header_driven: bool) -> Self {
        let min_fields = table
            .columns
            .iter()
            .zip(&sources)
            .filter(|(column, _)| column.required)
            .filter_map(|(_, source)| *source)
            .max()
            .map_or(0, |index| index + 1);
        Self {
            table,
            sources,
            min_fields,
            header_driven,
        }
    }

    pub fn table(&self) -> &'static TableSpec {
        self.table
    }

    /// Fields a record needs to reach every required column
    pub fn min_fields(&self) -> usize {
        self.min_fields
    }

    pub fn is_header_driven(&self) -> bool {
        self.header_driven
    }

    /// Source field index feeding destination column `index`
    pub fn source_of(&self, index: usize) -> Option<usize> {
        self.sources.get(index).copied().flatten()
    }

    /// Reorder a record into destination column order
    ///
    /// Returns `None` for a record too short to fill the required columns.
    /// Optional columns beyond the record's end become NULL; empty fields stay
    /// empty strings.
    pub fn remap(&self, record: &StringRecord) -> Option<Row> {
        if record.len() < self.min_fields {
            return None;
        }
        Some(
            self.sources
                .iter()
                .map(|source| source.and_then(|i| record.get(i)).map(str::to_string))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tables::{AGENCY, STOPS, STOP_TIMES, TRIPS};

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn test_header_driven_remap_follows_names() {
        let header = record(&["trip_id", "route_id", "service_id", "shape_id"]);
        let map = ColumnMap::from_header(&TRIPS, &header).unwrap();
        assert!(map.is_header_driven());

        let row = map.remap(&record(&["T1", "R9", "WK", "S4"])).unwrap();
        for (index, column) in TRIPS.columns.iter().enumerate() {
            let expected = header
                .iter()
                .position(|name| name == column.name)
                .map(|source| record(&["T1", "R9", "WK", "S4"])[source].to_string());
            assert_eq!(row[index], expected, "{}", column.name);
        }
    }

    #[test]
    fn test_published_order_fallback() {
        let header = record(&["a", "b", "c"]);
        let map = ColumnMap::from_header(&TRIPS, &header).unwrap();
        assert!(!map.is_header_driven());

        // route_id, service_id, trip_id in published order
        let row = map.remap(&record(&["R1", "WK", "T1"])).unwrap();
        assert_eq!(row[0].as_deref(), Some("T1"));
        assert_eq!(row[1].as_deref(), Some("R1"));
        assert_eq!(row[2].as_deref(), Some("WK"));
        assert_eq!(row[3], None);
    }

    #[test]
    fn test_stops_published_positions() {
        let map = ColumnMap::published(&STOPS);
        for (index, column) in STOPS.columns.iter().enumerate() {
            assert_eq!(
                map.source_of(index),
                STOPS.source_order.iter().position(|name| *name == column.name)
            );
        }
        assert_eq!(map.min_fields(), 6);
    }

    #[test]
    fn test_missing_required_column() {
        let header = record(&["trip_id", "arrival_time", "stop_id"]);
        let err = ColumnMap::from_header(&STOP_TIMES, &header).unwrap_err();
        assert!(matches!(
            err,
            ImportError::MissingColumn { ref column, .. } if column == "departure_time"
        ));
    }

    #[test]
    fn test_short_record_rejected() {
        let map = ColumnMap::published(&STOP_TIMES);
        assert!(map.remap(&record(&["T1", "08:00:00", "08:00:00"])).is_none());
        assert!(map
            .remap(&record(&["T1", "08:00:00", "08:00:00", "S1", "1"]))
            .is_some());
    }

    #[test]
    fn test_bom_and_case_in_header() {
        let header = record(&["\u{feff}Agency_ID", " agency_name ", "agency_url", "agency_timezone"]);
        let map = ColumnMap::from_header(&AGENCY, &header).unwrap();
        assert_eq!(map.source_of(0), Some(0));
        assert_eq!(map.source_of(1), Some(1));
        assert_eq!(map.source_of(4), None);
    }

    #[test]
    fn test_empty_field_is_kept() {
        let header = record(&["agency_id", "agency_name", "agency_url", "agency_timezone"]);
        let map = ColumnMap::from_header(&AGENCY, &header).unwrap();
        let row = map
            .remap(&record(&["", "RTD", "https://www.rtd-denver.com", "America/Denver"]))
            .unwrap();
        assert_eq!(row[0].as_deref(), Some(""));
        assert_eq!(row[4], None);
    }
}
