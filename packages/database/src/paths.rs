#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the data directory.
//!
//! All inputs (codebook PDF, microdata CSVs, question metadata) and the
//! `DuckDB` store live under the project root's `data/` directory.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the path of the `DuckDB` store file.
#[must_use]
pub fn store_path() -> PathBuf {
    data_dir().join("ches.duckdb")
}

/// Returns the path of the codebook PDF.
#[must_use]
pub fn codebook_path() -> PathBuf {
    data_dir().join("2019_CHES_codebook.pdf")
}

/// Returns the path of the party-level survey microdata file.
#[must_use]
pub fn survey_path() -> PathBuf {
    data_dir().join("CHES2019V3.csv")
}

/// Returns the path of the expert-level microdata file.
#[must_use]
pub fn experts_path() -> PathBuf {
    data_dir().join("CHES2019_experts.csv")
}

/// Returns the path of the question metadata JSON file.
#[must_use]
pub fn questions_path() -> PathBuf {
    data_dir().join("questions.json")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
