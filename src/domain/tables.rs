//! Static table catalogue
//!
//! One [`TableSpec`] per GTFS file the pipeline knows about. `columns` is the
//! destination insert order; `source_order` is the published GTFS column
//! order, used positionally only when a file's header names none of the
//! table's columns.

/// A destination column and whether a row is unusable without it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub required: bool,
}

const fn req(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        required: true,
    }
}

const fn opt(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        required: false,
    }
}

/// Static descriptor of one destination table
#[derive(Debug, PartialEq, Eq)]
pub struct TableSpec {
    /// Destination table name, also the canonical staged name
    pub name: &'static str,

    /// Archive member name
    pub file_name: &'static str,

    /// Destination columns in insert order
    pub columns: &'static [ColumnSpec],

    /// Natural key used for replace-on-conflict
    pub primary_key: &'static [&'static str],

    /// Published source column order
    pub source_order: &'static [&'static str],
}

impl TableSpec {
    /// Destination column names in insert order
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Position of a destination column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Destination positions of the primary key columns
    pub fn key_indices(&self) -> Vec<usize> {
        self.primary_key
            .iter()
            .filter_map(|key| self.column_index(key))
            .collect()
    }
}

pub static AGENCY: TableSpec = TableSpec {
    name: "agency",
    file_name: "agency.txt",
    columns: &[
        opt("agency_id"),
        req("agency_name"),
        req("agency_url"),
        req("agency_timezone"),
        opt("agency_lang"),
    ],
    primary_key: &["agency_id"],
    source_order: &[
        "agency_id",
        "agency_name",
        "agency_url",
        "agency_timezone",
        "agency_lang",
        "agency_phone",
        "agency_fare_url",
        "agency_email",
    ],
};

pub static CALENDAR: TableSpec = TableSpec {
    name: "calendar",
    file_name: "calendar.txt",
    columns: &[
        req("service_id"),
        req("start_date"),
        req("end_date"),
        req("monday"),
        req("tuesday"),
        req("wednesday"),
        req("thursday"),
        req("friday"),
        req("saturday"),
        req("sunday"),
    ],
    primary_key: &["service_id"],
    source_order: &[
        "service_id",
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
        "start_date",
        "end_date",
    ],
};

pub static CALENDAR_DATES: TableSpec = TableSpec {
    name: "calendar_dates",
    file_name: "calendar_dates.txt",
    columns: &[req("service_id"), req("date"), req("exception_type")],
    primary_key: &["service_id", "date"],
    source_order: &["service_id", "date", "exception_type"],
};

pub static ROUTES: TableSpec = TableSpec {
    name: "routes",
    file_name: "routes.txt",
    columns: &[
        req("route_id"),
        opt("agency_id"),
        opt("route_short_name"),
        opt("route_long_name"),
        opt("route_desc"),
        req("route_type"),
        opt("route_url"),
        opt("route_color"),
        opt("route_text_color"),
    ],
    primary_key: &["route_id"],
    source_order: &[
        "route_id",
        "agency_id",
        "route_short_name",
        "route_long_name",
        "route_desc",
        "route_type",
        "route_url",
        "route_color",
        "route_text_color",
        "route_sort_order",
    ],
};

pub static STOPS: TableSpec = TableSpec {
    name: "stops",
    file_name: "stops.txt",
    columns: &[
        req("stop_id"),
        opt("stop_code"),
        req("stop_name"),
        opt("stop_desc"),
        req("stop_lat"),
        req("stop_lon"),
        opt("zone_id"),
        opt("stop_url"),
        opt("location_type"),
        opt("parent_station"),
        opt("stop_timezone"),
        opt("wheelchair_boarding"),
    ],
    primary_key: &["stop_id"],
    source_order: &[
        "stop_id",
        "stop_code",
        "stop_name",
        "stop_desc",
        "stop_lat",
        "stop_lon",
        "zone_id",
        "stop_url",
        "location_type",
        "parent_station",
        "stop_timezone",
        "wheelchair_boarding",
    ],
};

pub static TRIPS: TableSpec = TableSpec {
    name: "trips",
    file_name: "trips.txt",
    columns: &[
        req("trip_id"),
        req("route_id"),
        req("service_id"),
        opt("trip_headsign"),
        opt("direction_id"),
        opt("block_id"),
        opt("shape_id"),
    ],
    primary_key: &["trip_id"],
    source_order: &[
        "route_id",
        "service_id",
        "trip_id",
        "trip_headsign",
        "trip_short_name",
        "direction_id",
        "block_id",
        "shape_id",
        "wheelchair_accessible",
        "bikes_allowed",
    ],
};

pub static STOP_TIMES: TableSpec = TableSpec {
    name: "stop_times",
    file_name: "stop_times.txt",
    columns: &[
        req("trip_id"),
        req("arrival_time"),
        req("departure_time"),
        req("stop_id"),
        req("stop_sequence"),
        opt("stop_headsign"),
        opt("pickup_type"),
        opt("drop_off_type"),
        opt("shape_dist_traveled"),
        opt("timepoint"),
    ],
    primary_key: &["trip_id", "stop_sequence"],
    source_order: &[
        "trip_id",
        "arrival_time",
        "departure_time",
        "stop_id",
        "stop_sequence",
        "stop_headsign",
        "pickup_type",
        "drop_off_type",
        "shape_dist_traveled",
        "timepoint",
    ],
};

pub static SHAPES: TableSpec = TableSpec {
    name: "shapes",
    file_name: "shapes.txt",
    columns: &[
        req("shape_id"),
        req("shape_pt_lat"),
        req("shape_pt_lon"),
        req("shape_pt_sequence"),
        opt("shape_dist_traveled"),
    ],
    primary_key: &["shape_id", "shape_pt_sequence"],
    source_order: &[
        "shape_id",
        "shape_pt_lat",
        "shape_pt_lon",
        "shape_pt_sequence",
        "shape_dist_traveled",
    ],
};

pub static FEED_INFO: TableSpec = TableSpec {
    name: "feed_info",
    file_name: "feed_info.txt",
    columns: &[
        req("feed_publisher_name"),
        req("feed_publisher_url"),
        req("feed_lang"),
        opt("feed_start_date"),
        opt("feed_end_date"),
        opt("feed_version"),
        opt("feed_contact_email"),
        opt("feed_contact_url"),
    ],
    primary_key: &["feed_publisher_name"],
    source_order: &[
        "feed_publisher_name",
        "feed_publisher_url",
        "feed_lang",
        "default_lang",
        "feed_start_date",
        "feed_end_date",
        "feed_version",
        "feed_contact_email",
        "feed_contact_url",
    ],
};

/// Every known table in import order
pub static TABLES: [&TableSpec; 9] = [
    &AGENCY,
    &CALENDAR,
    &CALENDAR_DATES,
    &ROUTES,
    &STOPS,
    &TRIPS,
    &STOP_TIMES,
    &SHAPES,
    &FEED_INFO,
];

/// Tables an archive must contain unless configured otherwise
pub const DEFAULT_REQUIRED_TABLES: [&str; 7] = [
    "agency",
    "calendar",
    "calendar_dates",
    "routes",
    "stops",
    "trips",
    "stop_times",
];

/// Look up a table by name
pub fn table_spec(name: &str) -> Option<&'static TableSpec> {
    TABLES.iter().copied().find(|spec| spec.name == name)
}

/// Look up a table by archive member name
pub fn table_for_file(file_name: &str) -> Option<&'static TableSpec> {
    TABLES.iter().copied().find(|spec| spec.file_name == file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_destination_column_is_published() {
        for spec in TABLES {
            for column in spec.columns {
                assert!(
                    spec.source_order.contains(&column.name),
                    "{}.{} missing from published order",
                    spec.name,
                    column.name
                );
            }
        }
    }

    #[test]
    fn test_primary_keys_resolve() {
        for spec in TABLES {
            assert_eq!(spec.key_indices().len(), spec.primary_key.len(), "{}", spec.name);
        }
    }

    #[test]
    fn test_lookup_by_name_and_file() {
        assert_eq!(table_spec("stop_times"), Some(&STOP_TIMES));
        assert_eq!(table_for_file("stops.txt"), Some(&STOPS));
        assert!(table_spec("fares").is_none());
    }

    #[test]
    fn test_required_tables_are_known() {
        for name in DEFAULT_REQUIRED_TABLES {
            assert!(table_spec(name).is_some(), "{name}");
        }
    }

    #[test]
    fn test_stops_published_order() {
        assert_eq!(
            STOPS.source_order,
            &[
                "stop_id",
                "stop_code",
                "stop_name",
                "stop_desc",
                "stop_lat",
                "stop_lon",
                "zone_id",
                "stop_url",
                "location_type",
                "parent_station",
                "stop_timezone",
                "wheelchair_boarding",
            ]
        );
    }
}
