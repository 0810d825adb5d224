//! SQLite destination store

use super::schema::initialise_schema;
use super::traits::{DestinationStore, Row, StoreOpener};
use crate::domain::tables::{table_spec, TableSpec};
use crate::domain::StoreError;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Store backed by one SQLite connection
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) a database file and ensure the schema exists
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(&path).map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;
        Self::from_connection(conn, path, busy_timeout)
    }

    /// Private in-memory database with the schema applied
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(conn, PathBuf::from(":memory:"), Duration::from_millis(0))
    }

    fn from_connection(
        mut conn: Connection,
        path: PathBuf,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        conn.busy_timeout(busy_timeout)
            .map_err(|source| StoreError::Sqlite {
                operation: "set busy timeout",
                source,
            })?;
        initialise_schema(&mut conn)?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    fn ensure_autocommit(&self) -> Result<(), StoreError> {
        if self.conn.is_autocommit() {
            Ok(())
        } else {
            Err(StoreError::TransactionActive)
        }
    }
}

fn insert_sql(table: &TableSpec, row_count: usize) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("\"{}\"", c.name))
        .collect();
    let placeholders = format!("({})", vec!["?"; table.columns.len()].join(", "));
    format!(
        "INSERT OR REPLACE INTO \"{}\" ({}) VALUES {}",
        table.name,
        columns.join(", "),
        vec![placeholders.as_str(); row_count].join(", ")
    )
}

impl DestinationStore for SqliteStore {
    fn begin_transaction(&mut self) -> Result<(), StoreError> {
        self.ensure_autocommit()?;
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|source| StoreError::Sqlite {
                operation: "begin import transaction",
                source,
            })
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.conn.is_autocommit() {
            return Err(StoreError::NoTransaction);
        }
        self.conn
            .execute_batch("COMMIT")
            .map_err(|source| StoreError::Sqlite {
                operation: "commit import transaction",
                source,
            })
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if self.conn.is_autocommit() {
            return Err(StoreError::NoTransaction);
        }
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|source| StoreError::Sqlite {
                operation: "roll back import transaction",
                source,
            })
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn bulk_insert(&mut self, table: &TableSpec, rows: &[Row]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
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

        let mut statement = self
            .conn
            .prepare_cached(&insert_sql(table, rows.len()))
            .map_err(|source| StoreError::Sqlite {
                operation: "prepare bulk insert",
                source,
            })?;
        statement
            .execute(params_from_iter(rows.iter().flatten()))
            .map_err(|source| StoreError::Sqlite {
                operation: "execute bulk insert",
                source,
            })?;
        Ok(rows.len())
    }

    fn read_flag(&self, key: &str) -> Result<Option<bool>, StoreError> {
        self.conn
            .query_row("SELECT value FROM flags WHERE key = ?1", [key], |row| {
                row.get::<_, i64>(0)
            })
            .optional()
            .map(|value| value.map(|v| v != 0))
            .map_err(|source| StoreError::Sqlite {
                operation: "read flag",
                source,
            })
    }

    fn write_flag(&mut self, key: &str, value: bool) -> Result<(), StoreError> {
        self.ensure_autocommit()?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO flags (key, value) VALUES (?1, ?2)",
                (key, i64::from(value)),
            )
            .map(|_| ())
            .map_err(|source| StoreError::Sqlite {
                operation: "write flag",
                source,
            })
    }

    fn read_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|source| StoreError::Sqlite {
                operation: "read setting",
                source,
            })
    }

    fn write_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.ensure_autocommit()?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                (key, value),
            )
            .map(|_| ())
            .map_err(|source| StoreError::Sqlite {
                operation: "write setting",
                source,
            })
    }

    fn row_count(&self, table: &str) -> Result<u64, StoreError> {
        let spec = table_spec(table).ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", spec.name), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|count| count.max(0) as u64)
            .map_err(|source| StoreError::Sqlite {
                operation: "count rows",
                source,
            })
    }
}

/// Opens [`SqliteStore`] handles for a database file
#[derive(Debug, Clone)]
pub struct SqliteStoreOpener {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStoreOpener {
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }
}

impl StoreOpener for SqliteStoreOpener {
    fn open(&self) -> Result<Box<dyn DestinationStore>, StoreError> {
        Ok(Box::new(SqliteStore::open(&self.path, self.busy_timeout)?))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
