//! Table store over a `DuckDB` connection.
//!
//! Frames are materialized as plain SQL tables. Every table gets an
//! explicit `index BIGINT` column holding a dense 0-based row index
//! (appends continue from the current maximum), and every write stamps a
//! `<TABLE>:built_at` timestamp into the `_meta` bookkeeping table.

use std::fmt::Write as _;
use std::path::Path;

use ches_explorer_survey_models::{Frame, Value};
use duckdb::Connection;

use crate::{IfExists, StoreError};

/// Number of rows per INSERT chunk.
const CHUNK_ROWS: usize = 500;

/// A relational store holding the pipeline's materialized tables.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (or creates) the store file and ensures the bookkeeping
    /// schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or schema creation fails.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }

        let conn = Connection::open(path)?;
        log::debug!("Opened store at {}", path.display());

        Self::init(conn)
    }

    /// Opens an in-memory store, used by tests and throwaway runs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the connection or schema creation fails.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;

        Ok(Self { conn })
    }

    /// Returns whether a table exists in the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the catalog query fails.
    pub fn exists(&self, table: &str) -> Result<bool, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            duckdb::params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Materializes a frame as a table.
    ///
    /// Returns the number of rows written. The frame must not carry its
    /// own `index` column; the store adds one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteConflict`] if the table exists and
    /// `if_exists` is [`IfExists::Fail`], or another [`StoreError`] for
    /// invalid names and database failures.
    pub fn write(
        &self,
        table: &str,
        frame: &Frame,
        if_exists: IfExists,
    ) -> Result<u64, StoreError> {
        ensure_identifier(table)?;

        if frame.column_index("index").is_some() {
            return Err(StoreError::Conversion {
                message: format!("frame for '{table}' already contains an 'index' column"),
            });
        }

        let exists = self.exists(table)?;
        match if_exists {
            IfExists::Fail if exists => {
                return Err(StoreError::WriteConflict {
                    table: table.to_owned(),
                });
            }
            IfExists::Replace if exists => {
                self.conn
                    .execute_batch(&format!("DROP TABLE {}", quote_ident(table)))?;
            }
            _ => {}
        }

        let fresh = !exists || if_exists == IfExists::Replace;
        if fresh {
            self.create_table(table, frame)?;
        }

        let start_index: i64 = if fresh {
            0
        } else {
            self.conn.query_row(
                &format!(
                    "SELECT COALESCE(MAX(\"index\") + 1, 0) FROM {}",
                    quote_ident(table)
                ),
                [],
                |row| row.get(0),
            )?
        };

        let inserted = self.insert_rows(table, frame, start_index)?;

        self.set_meta(
            &format!("{table}:built_at"),
            &chrono::Utc::now().to_rfc3339(),
        )?;

        log::info!("Wrote {inserted} rows to table {table} ({if_exists})");

        Ok(inserted)
    }

    /// Writes the frame only if the table is absent.
    ///
    /// Returns `true` if a write happened. This is the pipeline's only
    /// caching mechanism and it is keyed by table name, not content: if
    /// the source files change under an existing table, the stale table
    /// keeps being served until a replace write rebuilds it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the existence check or write fails.
    pub fn write_if_absent(&self, table: &str, frame: &Frame) -> Result<bool, StoreError> {
        if self.exists(table)? {
            log::info!(
                "Table {table} already exists, skipping write (cache is name-keyed; replace to rebuild from source)"
            );
            return Ok(false);
        }

        self.write(table, frame, IfExists::Fail)?;
        Ok(true)
    }

    /// Runs a SQL query and collects the result into a frame.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails or a result cell has a
    /// type the frame cannot represent.
    pub fn query(&self, sql: &str) -> Result<Frame, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;

        let mut columns: Option<Vec<String>> = None;
        let mut data: Vec<Vec<Value>> = Vec::new();

        while let Some(row) = rows.next()? {
            let names = columns.get_or_insert_with(|| {
                row.as_ref()
                    .column_names()
                    .into_iter()
                    .collect()
            });

            let mut values = Vec::with_capacity(names.len());
            for i in 0..names.len() {
                values.push(value_from_ref(row.get_ref(i)?)?);
            }
            data.push(values);
        }

        Ok(Frame::from_rows(columns.unwrap_or_default(), data))
    }

    /// Returns the number of rows in a table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the table name is invalid or the query
    /// fails.
    pub fn count(&self, table: &str) -> Result<u64, StoreError> {
        ensure_identifier(table)?;
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Returns the user table names in the store, sorted. Bookkeeping
    /// tables (leading underscore) are excluded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the catalog query fails.
    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables ORDER BY table_name",
        )?;
        let mut rows = stmt.query([])?;

        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            if !name.starts_with('_') {
                names.push(name);
            }
        }

        Ok(names)
    }

    /// Gets a bookkeeping value from the `_meta` table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn get_meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT value FROM _meta WHERE key = ?")?;
        let result = stmt.query_row([key], |row| row.get(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::DuckDb(e)),
        }
    }

    /// Sets a bookkeeping value in the `_meta` table.
    fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO _meta (key, value) VALUES (?, ?)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
            duckdb::params![key, value],
        )?;
        Ok(())
    }

    fn create_table(&self, table: &str, frame: &Frame) -> Result<(), StoreError> {
        let mut ddl = format!("CREATE TABLE {} (\"index\" BIGINT", quote_ident(table));
        for (i, name) in frame.columns().iter().enumerate() {
            write!(ddl, ", {} {}", quote_ident(name), sql_type(frame, i))
                .expect("writing to String cannot fail");
        }
        ddl.push(')');

        self.conn.execute_batch(&ddl)?;
        Ok(())
    }

    fn insert_rows(
        &self,
        table: &str,
        frame: &Frame,
        start_index: i64,
    ) -> Result<u64, StoreError> {
        let columns = frame.columns();
        let mut inserted = 0u64;

        for (chunk_idx, chunk) in frame.rows().chunks(CHUNK_ROWS).enumerate() {
            let mut sql = format!("INSERT INTO {} (\"index\"", quote_ident(table));
            for name in columns {
                write!(sql, ", {}", quote_ident(name)).expect("writing to String cannot fail");
            }
            sql.push_str(") VALUES ");

            for i in 0..chunk.len() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str("(?");
                for _ in columns {
                    sql.push_str(", ?");
                }
                sql.push(')');
            }

            let mut stmt = self.conn.prepare(&sql)?;
            let mut param = 1usize;

            for (offset, row) in chunk.iter().enumerate() {
                let index = start_index + i64::try_from(chunk_idx * CHUNK_ROWS + offset)
                    .unwrap_or(i64::MAX);
                stmt.raw_bind_parameter(param, index)?;
                param += 1;

                for value in row {
                    match value {
                        Value::Null => stmt.raw_bind_parameter(param, None::<i64>)?,
                        Value::Int(v) => stmt.raw_bind_parameter(param, *v)?,
                        Value::Real(v) => stmt.raw_bind_parameter(param, *v)?,
                        Value::Text(v) => stmt.raw_bind_parameter(param, v.as_str())?,
                    }
                    param += 1;
                }
            }

            let rows = stmt.raw_execute()?;
            inserted += u64::try_from(rows).unwrap_or(0);
        }

        Ok(inserted)
    }
}

/// Rejects table names that are not plain SQL identifiers.
fn ensure_identifier(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName {
            name: name.to_owned(),
        })
    }
}

/// Double-quotes an identifier, escaping embedded quotes.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Picks the SQL column type for one frame column.
fn sql_type(frame: &Frame, col: usize) -> &'static str {
    let mut saw_int = false;

    for row in frame.rows() {
        match &row[col] {
            Value::Text(_) => return "TEXT",
            Value::Real(_) => return "DOUBLE",
            Value::Int(_) => saw_int = true,
            Value::Null => {}
        }
    }

    if saw_int { "BIGINT" } else { "TEXT" }
}

/// Converts a database cell into a frame value.
fn value_from_ref(value: duckdb::types::ValueRef<'_>) -> Result<Value, StoreError> {
    use duckdb::types::ValueRef;

    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Boolean(v) => Ok(Value::Int(i64::from(v))),
        ValueRef::TinyInt(v) => Ok(Value::Int(i64::from(v))),
        ValueRef::SmallInt(v) => Ok(Value::Int(i64::from(v))),
        ValueRef::Int(v) => Ok(Value::Int(i64::from(v))),
        ValueRef::BigInt(v) => Ok(Value::Int(v)),
        ValueRef::UTinyInt(v) => Ok(Value::Int(i64::from(v))),
        ValueRef::USmallInt(v) => Ok(Value::Int(i64::from(v))),
        ValueRef::UInt(v) => Ok(Value::Int(i64::from(v))),
        ValueRef::UBigInt(v) => i64::try_from(v).map(Value::Int).map_err(|_| {
            StoreError::Conversion {
                message: format!("unsigned value {v} does not fit a signed index"),
            }
        }),
        ValueRef::HugeInt(v) => i64::try_from(v).map(Value::Int).map_err(|_| {
            StoreError::Conversion {
                message: format!("huge integer {v} does not fit a signed index"),
            }
        }),
        ValueRef::Float(v) => Ok(Value::Real(f64::from(v))),
        ValueRef::Double(v) => Ok(Value::Real(v)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::Text(s.to_owned()))
            .map_err(|e| StoreError::Conversion {
                message: format!("invalid UTF-8 in text cell: {e}"),
            }),
        other => Err(StoreError::Conversion {
            message: format!("unsupported cell type: {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> Frame {
        Frame::from_rows(
            vec!["country".to_owned(), "party_id".to_owned(), "eu_position".to_owned()],
            vec![
                vec!["be".into(), Value::Int(102), Value::Real(6.5)],
                vec!["be".into(), Value::Int(103), Value::Null],
            ],
        )
    }

    #[test]
    fn write_and_query_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        store.write("V3", &sample_frame(), IfExists::Fail).unwrap();

        let frame = store
            .query("SELECT * FROM V3 ORDER BY \"index\"")
            .unwrap();

        assert_eq!(frame.columns(), ["index", "country", "party_id", "eu_position"]);
        assert_eq!(frame.get(0, "index"), Some(&Value::Int(0)));
        assert_eq!(frame.get(1, "index"), Some(&Value::Int(1)));
        assert_eq!(frame.get(0, "party_id"), Some(&Value::Int(102)));
        assert_eq!(frame.get(0, "eu_position"), Some(&Value::Real(6.5)));
        assert_eq!(frame.get(1, "eu_position"), Some(&Value::Null));
        assert_eq!(frame.get(0, "country"), Some(&Value::Text("be".to_owned())));
    }

    #[test]
    fn fail_mode_raises_write_conflict() {
        let store = Store::open_in_memory().unwrap();
        store.write("V3", &sample_frame(), IfExists::Fail).unwrap();

        let err = store.write("V3", &sample_frame(), IfExists::Fail).unwrap_err();

        assert!(matches!(
            err,
            StoreError::WriteConflict { table } if table == "V3"
        ));
    }

    #[test]
    fn replace_rebuilds_from_scratch() {
        let store = Store::open_in_memory().unwrap();
        store.write("V3", &sample_frame(), IfExists::Fail).unwrap();

        let mut smaller = sample_frame();
        smaller.rows_mut()[0][1] = Value::Int(999);
        let smaller = Frame::from_rows(
            smaller.columns().to_vec(),
            vec![smaller.rows()[0].clone()],
        );
        store.write("V3", &smaller, IfExists::Replace).unwrap();

        assert_eq!(store.count("V3").unwrap(), 1);
        let frame = store.query("SELECT party_id FROM V3").unwrap();
        assert_eq!(frame.get(0, "party_id"), Some(&Value::Int(999)));
    }

    #[test]
    fn append_continues_the_index() {
        let store = Store::open_in_memory().unwrap();
        store.write("V3", &sample_frame(), IfExists::Fail).unwrap();
        store.write("V3", &sample_frame(), IfExists::Append).unwrap();

        let frame = store
            .query("SELECT \"index\" FROM V3 ORDER BY \"index\"")
            .unwrap();

        let indexes: Vec<Option<i64>> = frame
            .column_values("index")
            .map(Value::as_i64)
            .collect();
        assert_eq!(indexes, vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn write_if_absent_is_idempotent() {
        let store = Store::open_in_memory().unwrap();

        assert!(store.write_if_absent("PARTIES", &sample_frame()).unwrap());
        let first = store.query("SELECT * FROM PARTIES ORDER BY \"index\"").unwrap();

        // Second write is skipped even with different content: the cache
        // is keyed by table name.
        let mut different = sample_frame();
        different.rows_mut()[0][1] = Value::Int(7);
        assert!(!store.write_if_absent("PARTIES", &different).unwrap());

        let second = store.query("SELECT * FROM PARTIES ORDER BY \"index\"").unwrap();
        assert_eq!(first, second);

        // A replace write re-derives and matches a from-scratch build.
        store.write("PARTIES", &different, IfExists::Replace).unwrap();
        let scratch = Store::open_in_memory().unwrap();
        scratch.write("PARTIES", &different, IfExists::Fail).unwrap();
        assert_eq!(
            store.query("SELECT * FROM PARTIES ORDER BY \"index\"").unwrap(),
            scratch.query("SELECT * FROM PARTIES ORDER BY \"index\"").unwrap(),
        );
    }

    #[test]
    fn rejects_non_identifier_table_names() {
        let store = Store::open_in_memory().unwrap();

        let err = store
            .write("bad name; DROP TABLE x", &sample_frame(), IfExists::Fail)
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidTableName { .. }));
    }

    #[test]
    fn rejects_frames_carrying_their_own_index() {
        let store = Store::open_in_memory().unwrap();
        let frame = Frame::from_rows(
            vec!["index".to_owned()],
            vec![vec![Value::Int(0)]],
        );

        let err = store.write("V3", &frame, IfExists::Fail).unwrap_err();

        assert!(matches!(err, StoreError::Conversion { .. }));
    }

    #[test]
    fn writes_stamp_build_metadata() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get_meta("V3:built_at").unwrap(), None);

        store.write("V3", &sample_frame(), IfExists::Fail).unwrap();

        assert!(store.get_meta("V3:built_at").unwrap().is_some());
        assert!(store.exists("V3").unwrap());
        assert_eq!(store.table_names().unwrap(), vec!["V3".to_owned()]);
    }
}
