#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reference tables built from the CHES codebook PDF.
//!
//! The codebook prints the country and party lookup tables as typeset
//! pages; [`ches_explorer_pdf`] turns those pages into raw string grids,
//! and this crate repairs the extraction artifacts (pagination markers,
//! wrapped rows, spurious columns, unrepeated country codes) and
//! normalizes identifiers into the canonical [`Country`] and [`Party`]
//! rows every downstream join depends on.

pub mod countries;
pub mod layout;
pub mod parties;

use std::collections::BTreeMap;

use ches_explorer_pdf::RawTable;

pub use ches_explorer_survey_models::{Country, Party};
pub use countries::build_countries;
pub use layout::{CodebookLayout, ches2019};
pub use parties::build_parties;

/// Errors that can occur while building reference tables.
#[derive(Debug, thiserror::Error)]
pub enum CodebookError {
    /// PDF extraction failed.
    #[error("Extraction error: {0}")]
    Extract(#[from] ches_explorer_pdf::ExtractError),

    /// An expected column is absent after applying the layout's renames,
    /// meaning the codebook layout changed out from under the geometry.
    #[error("Schema mismatch: expected column '{column}' not found")]
    SchemaMismatch {
        /// Canonical name of the missing column.
        column: String,
    },

    /// A cell that must hold an integer identifier does not parse.
    #[error("Invalid number in column '{column}': {value:?}")]
    InvalidNumber {
        /// Canonical name of the offending column.
        column: String,
        /// The raw cell content.
        value: String,
    },
}

/// Renames raw extracted headers to canonical column names in place.
pub(crate) fn apply_renames(table: &mut RawTable, renames: &BTreeMap<String, String>) {
    for header in &mut table.headers {
        if let Some(canonical) = renames.get(header) {
            *header = canonical.clone();
        }
    }
}

/// Returns the index of a required column.
pub(crate) fn require_column(table: &RawTable, name: &str) -> Result<usize, CodebookError> {
    table
        .column_index(name)
        .ok_or_else(|| CodebookError::SchemaMismatch {
            column: name.to_owned(),
        })
}

/// Returns the raw header that the layout maps to a canonical name.
pub(crate) fn raw_header_for<'a>(
    renames: &'a BTreeMap<String, String>,
    canonical: &str,
) -> Result<&'a str, CodebookError> {
    renames
        .iter()
        .find(|(_, v)| v.as_str() == canonical)
        .map(|(k, _)| k.as_str())
        .ok_or_else(|| CodebookError::SchemaMismatch {
            column: canonical.to_owned(),
        })
}

/// Parses an integer identifier cell.
pub(crate) fn parse_id(column: &str, value: &str) -> Result<i64, CodebookError> {
    value
        .trim()
        .parse()
        .map_err(|_| CodebookError::InvalidNumber {
            column: column.to_owned(),
            value: value.to_owned(),
        })
}
