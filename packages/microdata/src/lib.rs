#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Microdata loading for the CHES survey files.
//!
//! Reads the two wide CSV microdata exports (party-level survey
//! responses and expert-level ratings) into [`Frame`]s with per-column
//! type inference. The expert file — identified by a filename marker —
//! additionally gets dataset-specific normalization so its key columns
//! and party identifiers line up with the survey schema and the codebook
//! party table (see [`normalize`]).

pub mod normalize;

use std::io;
use std::path::Path;

use ches_explorer_survey_models::{Frame, Value};

/// Errors that can occur while loading microdata.
#[derive(Debug, thiserror::Error)]
pub enum MicrodataError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A column the normalization rules require is absent.
    #[error("Schema mismatch: expected column '{column}' not found")]
    SchemaMismatch {
        /// Name of the missing column.
        column: String,
    },
}

/// Filename marker identifying the expert-level dataset.
const EXPERTS_MARKER: &str = "experts";

/// Returns `true` if the path names the expert-level microdata file.
#[must_use]
pub fn is_experts_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.to_lowercase().contains(EXPERTS_MARKER))
}

/// Loads a microdata file, applying expert normalization when the
/// filename marks it as the expert-level dataset.
///
/// # Errors
///
/// Returns [`MicrodataError`] if the file is unreadable, malformed, or
/// (for the expert file) missing a column the normalization renames.
pub fn load_microdata(path: &Path) -> Result<Frame, MicrodataError> {
    let file = std::fs::File::open(path)?;
    let mut frame = read_csv(file)?;

    log::info!(
        "Loaded {} rows x {} columns from {}",
        frame.len(),
        frame.columns().len(),
        path.display(),
    );

    if is_experts_file(path) {
        normalize::apply(&mut frame, &normalize::experts())?;
    }

    Ok(frame)
}

/// Reads CSV microdata into a typed frame.
///
/// Each column's type is inferred from its non-missing cells: all
/// integers -> `Int`, otherwise all numeric -> `Real`, otherwise `Text`.
/// Empty cells and Stata's `.` missing marker become `Null` regardless
/// of the column type.
///
/// # Errors
///
/// Returns [`MicrodataError::Csv`] if the input is not valid CSV.
pub fn read_csv<R: io::Read>(reader: R) -> Result<Frame, MicrodataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let mut cells: Vec<Vec<String>> = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        cells.push(
            (0..columns.len())
                .map(|i| record.get(i).unwrap_or("").trim().to_owned())
                .collect(),
        );
    }

    let types: Vec<ColumnType> = (0..columns.len())
        .map(|i| infer_column_type(cells.iter().map(|row| row[i].as_str())))
        .collect();

    let mut frame = Frame::new(columns);
    for row in cells {
        let values = row
            .into_iter()
            .zip(&types)
            .map(|(cell, ty)| typed_value(&cell, *ty))
            .collect();
        frame.push_row(values);
    }

    Ok(frame)
}

/// Inferred storage type for one CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Int,
    Real,
    Text,
}

/// Returns `true` for cells that encode a missing observation.
fn is_missing(cell: &str) -> bool {
    cell.is_empty() || cell == "."
}

fn infer_column_type<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut inferred = ColumnType::Int;

    for cell in cells {
        if is_missing(cell) {
            continue;
        }
        match inferred {
            ColumnType::Int => {
                if cell.parse::<i64>().is_err() {
                    inferred = if cell.parse::<f64>().is_ok() {
                        ColumnType::Real
                    } else {
                        return ColumnType::Text;
                    };
                }
            }
            ColumnType::Real => {
                if cell.parse::<f64>().is_err() {
                    return ColumnType::Text;
                }
            }
            ColumnType::Text => unreachable!(),
        }
    }

    inferred
}

fn typed_value(cell: &str, ty: ColumnType) -> Value {
    if is_missing(cell) {
        return Value::Null;
    }
    match ty {
        ColumnType::Int => cell.parse::<i64>().map_or(Value::Null, Value::Int),
        ColumnType::Real => cell.parse::<f64>().map_or(Value::Null, Value::Real),
        ColumnType::Text => Value::Text(cell.to_owned()),
    }
}
