#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB`-backed relational store for the pipeline tables.
//!
//! Each pipeline stage materializes its output as a named table in a
//! single `DuckDB` file (`COUNTRIES`, `PARTIES`, `LOOKUP`, `V3`,
//! `EXPERTS`), every table carrying an explicit `index` column. The
//! store offers create/replace/append write semantics, a
//! write-only-if-absent mode that doubles as the pipeline's cache, and
//! declarative SQL queries for the cross-table joins.

pub mod paths;
pub mod store;

use strum_macros::{AsRefStr, Display, EnumString};

pub use store::Store;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The table already exists and the caller asked for
    /// [`IfExists::Fail`] semantics.
    #[error("Write conflict: table '{table}' already exists")]
    WriteConflict {
        /// Name of the conflicting table.
        table: String,
    },

    /// The table name is not a plain SQL identifier.
    #[error("Invalid table name: {name:?}")]
    InvalidTableName {
        /// The rejected name.
        name: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// What to do when a write targets a table that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum IfExists {
    /// Refuse the write with [`StoreError::WriteConflict`].
    Fail,
    /// Drop the existing table and write from scratch.
    Replace,
    /// Keep the existing rows and append the new ones.
    Append,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn if_exists_parses_from_cli_strings() {
        assert_eq!(IfExists::from_str("replace").unwrap(), IfExists::Replace);
        assert_eq!(IfExists::from_str("append").unwrap(), IfExists::Append);
        assert_eq!(IfExists::from_str("fail").unwrap(), IfExists::Fail);
        assert!(IfExists::from_str("upsert").is_err());
        assert_eq!(IfExists::Replace.to_string(), "replace");
    }
}
