//! Expert-dataset normalization rules.
//!
//! The expert-level file was exported with column names and two party
//! identifiers that disagree with the survey file and the codebook. The
//! repairs live in an embedded TOML document rather than inline
//! constants so every drop, rename, and id substitution is reviewable as
//! data, with a recorded reason per id fix.

use std::collections::BTreeMap;

use ches_explorer_survey_models::{Frame, Value};
use serde::Deserialize;

use crate::MicrodataError;

/// Normalization rules for the expert dataset, embedded at compile time.
const EXPERTS_TOML: &str = include_str!("../normalize/experts.toml");

/// Dataset-specific normalization rules.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpertNormalization {
    /// Columns to drop before writing. Missing drop targets are logged,
    /// not fatal — a column the export no longer carries needs no drop.
    #[serde(default)]
    pub drop_columns: Vec<String>,
    /// Column renames (source name -> survey-schema name). A missing
    /// rename source is a schema mismatch.
    #[serde(default)]
    pub renames: BTreeMap<String, String>,
    /// Party-id reconciliation entries.
    #[serde(default)]
    pub party_id_fixes: Vec<PartyIdFix>,
}

/// One reviewable party-id substitution.
#[derive(Debug, Clone, Deserialize)]
pub struct PartyIdFix {
    /// The id as encoded in the expert dataset.
    pub source_id: i64,
    /// The canonical id used by the codebook party table.
    pub canonical_id: i64,
    /// Why the two datasets disagree.
    pub reason: String,
}

/// Returns the embedded normalization rules for the expert dataset.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time
/// guarantee since the rules are embedded).
#[must_use]
pub fn experts() -> ExpertNormalization {
    toml::from_str(EXPERTS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse experts normalization rules: {e}"))
}

/// Applies normalization rules to a loaded frame in place.
///
/// # Errors
///
/// Returns [`MicrodataError::SchemaMismatch`] if a rename source column
/// or the `party_id` column is absent.
pub fn apply(frame: &mut Frame, rules: &ExpertNormalization) -> Result<(), MicrodataError> {
    for column in &rules.drop_columns {
        if frame.drop_column(column) {
            log::debug!("Dropped column '{column}'");
        } else {
            log::warn!("Drop target '{column}' not present in dataset");
        }
    }

    for (from, to) in &rules.renames {
        if !frame.rename_column(from, to) {
            return Err(MicrodataError::SchemaMismatch {
                column: from.clone(),
            });
        }
    }

    if !rules.party_id_fixes.is_empty() {
        let party_id = frame.column_index("party_id").ok_or_else(|| {
            MicrodataError::SchemaMismatch {
                column: "party_id".to_owned(),
            }
        })?;

        for fix in &rules.party_id_fixes {
            let mut replaced = 0u64;
            for row in frame.rows_mut() {
                if row[party_id] == Value::Int(fix.source_id) {
                    row[party_id] = Value::Int(fix.canonical_id);
                    replaced += 1;
                }
            }
            log::info!(
                "Remapped party_id {} -> {} on {replaced} rows ({})",
                fix.source_id,
                fix.canonical_id,
                fix.reason,
            );
        }
    }

    Ok(())
}
