#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline orchestration: codebook extraction, microdata loading, and
//! the lookup join that makes the three sources queryable as one schema.
//!
//! All state lives in an explicit [`PipelineContext`] — the store
//! handle, the codebook layout, and the source file paths — constructed
//! once and passed to every stage. Nothing is loaded at import time; the
//! store connection closes when the context drops.

pub mod context;
pub mod joins;
pub mod stages;

pub use context::{PipelineContext, SourceFiles};

/// Name of the materialized country table.
pub const COUNTRIES_TABLE: &str = "COUNTRIES";
/// Name of the materialized party table.
pub const PARTIES_TABLE: &str = "PARTIES";
/// Name of the materialized party-country lookup table.
pub const LOOKUP_TABLE: &str = "LOOKUP";
/// Name of the party-level survey microdata table.
pub const SURVEY_TABLE: &str = "V3";
/// Name of the expert-level microdata table.
pub const EXPERTS_TABLE: &str = "EXPERTS";

/// Errors that can occur while running the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// PDF extraction failed before any table building started.
    #[error("Extraction error: {0}")]
    Extract(#[from] ches_explorer_pdf::ExtractError),

    /// Building a reference table from the codebook failed.
    #[error("Codebook error: {0}")]
    Codebook(#[from] ches_explorer_codebook::CodebookError),

    /// Loading a microdata file failed.
    #[error("Microdata error: {0}")]
    Microdata(#[from] ches_explorer_microdata::MicrodataError),

    /// A store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] ches_explorer_database::StoreError),

    /// A stage needs a table an earlier stage has not materialized yet.
    #[error("Table '{table}' is not materialized; run the earlier pipeline stages first")]
    MissingTable {
        /// Name of the missing table.
        table: String,
    },
}

/// Returns an error unless every listed table is materialized.
pub(crate) fn require_tables(
    store: &ches_explorer_database::Store,
    tables: &[&str],
) -> Result<(), PipelineError> {
    for table in tables {
        if !store.exists(table)? {
            return Err(PipelineError::MissingTable {
                table: (*table).to_owned(),
            });
        }
    }
    Ok(())
}
