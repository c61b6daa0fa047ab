#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for the CHES pipeline CLI.
//!
//! Thin reporting layer over the pipeline stages: table inventories for
//! the `tables` subcommand and question-metadata coverage checks for the
//! `questions` subcommand.

use std::collections::BTreeMap;

use ches_explorer_pipeline::{EXPERTS_TABLE, PipelineContext, PipelineError};
use ches_explorer_survey_models::QuestionMeta;

/// Errors the CLI layer can produce on top of the pipeline's own.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A pipeline stage failed.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// A store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] ches_explorer_database::StoreError),

    /// Loading question metadata failed.
    #[error("Question metadata error: {0}")]
    Question(#[from] ches_explorer_questions::QuestionError),

    /// Reshaping a frame failed.
    #[error("Analytics error: {0}")]
    Analytics(#[from] ches_explorer_analytics::AnalyticsError),
}

/// One row of the `tables` subcommand output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    /// Table name.
    pub name: String,
    /// Number of rows.
    pub rows: u64,
    /// RFC 3339 timestamp of the last write, if recorded.
    pub built_at: Option<String>,
}

/// Returns name, row count, and build time for every materialized table.
///
/// # Errors
///
/// Returns [`IngestError`] if a catalog or count query fails.
pub fn tables_report(ctx: &PipelineContext) -> Result<Vec<TableReport>, IngestError> {
    let mut reports = Vec::new();

    for name in ctx.store.table_names()? {
        let rows = ctx.store.count(&name)?;
        let built_at = ctx.store.get_meta(&format!("{name}:built_at"))?;
        reports.push(TableReport {
            name,
            rows,
            built_at,
        });
    }

    Ok(reports)
}

/// Coverage of the expert file's question columns by the metadata keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCoverage {
    /// Number of question keys in the metadata file.
    pub metadata_keys: usize,
    /// Question columns in `EXPERTS`, identity columns excluded.
    pub question_columns: usize,
    /// Question columns with no metadata entry.
    pub uncovered: Vec<String>,
}

impl QuestionCoverage {
    /// Returns `true` when every question column has a metadata entry.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.uncovered.is_empty()
    }
}

/// Identity columns excluded when treating `EXPERTS` as long-form
/// question observations.
const EXPERT_ID_COLUMNS: [&str; 4] = ["index", "party_id", "party", "dob"];

/// Checks that the melted expert question keys are a subset of the
/// metadata's key set.
///
/// # Errors
///
/// Returns [`IngestError`] if `EXPERTS` is not materialized or cannot be
/// queried.
pub fn question_coverage(
    ctx: &PipelineContext,
    metadata: &BTreeMap<String, QuestionMeta>,
) -> Result<QuestionCoverage, IngestError> {
    if !ctx.store.exists(EXPERTS_TABLE)? {
        return Err(IngestError::Pipeline(PipelineError::MissingTable {
            table: EXPERTS_TABLE.to_owned(),
        }));
    }

    let experts = ctx
        .store
        .query(&format!("SELECT * FROM {EXPERTS_TABLE}"))?;

    // Identity columns the export may or may not carry are excluded only
    // when present.
    let id_columns: Vec<&str> = EXPERT_ID_COLUMNS
        .iter()
        .copied()
        .filter(|c| experts.column_index(c).is_some())
        .collect();

    let questions = ches_explorer_analytics::question_columns(&experts, &id_columns)?;
    let uncovered: Vec<String> = questions
        .iter()
        .filter(|q| !metadata.contains_key(*q))
        .cloned()
        .collect();

    if uncovered.is_empty() {
        log::info!(
            "All {} expert question columns covered by metadata",
            questions.len(),
        );
    } else {
        log::warn!("{} expert question columns lack metadata", uncovered.len());
    }

    Ok(QuestionCoverage {
        metadata_keys: metadata.len(),
        question_columns: questions.len(),
        uncovered,
    })
}

#[cfg(test)]
mod tests {
    use ches_explorer_database::IfExists;
    use ches_explorer_survey_models::{Frame, Value};

    use super::*;

    fn experts_frame() -> Frame {
        Frame::from_rows(
            vec![
                "party_id".to_owned(),
                "party".to_owned(),
                "dob".to_owned(),
                "eu_position".to_owned(),
                "lrgen".to_owned(),
            ],
            vec![vec![
                Value::Int(102),
                "PS".into(),
                Value::Int(1971),
                Value::Real(6.0),
                Value::Real(3.0),
            ]],
        )
    }

    fn meta(keys: &[&str]) -> BTreeMap<String, QuestionMeta> {
        keys.iter()
            .map(|k| {
                (
                    (*k).to_owned(),
                    QuestionMeta {
                        description: "d".to_owned(),
                        category: "c".to_owned(),
                        scores: BTreeMap::new(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn tables_report_lists_counts_and_build_times() {
        let ctx = PipelineContext::in_memory().unwrap();
        ctx.store
            .write("EXPERTS", &experts_frame(), IfExists::Fail)
            .unwrap();

        let reports = tables_report(&ctx).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].name, "EXPERTS");
        assert_eq!(reports[0].rows, 1);
        assert!(reports[0].built_at.is_some());
    }

    #[test]
    fn coverage_is_complete_when_metadata_has_every_question() {
        let ctx = PipelineContext::in_memory().unwrap();
        ctx.store
            .write(EXPERTS_TABLE, &experts_frame(), IfExists::Fail)
            .unwrap();

        let coverage =
            question_coverage(&ctx, &meta(&["eu_position", "lrgen", "galtan"])).unwrap();

        assert!(coverage.is_complete());
        assert_eq!(coverage.question_columns, 2);
        assert_eq!(coverage.metadata_keys, 3);
    }

    #[test]
    fn coverage_reports_uncovered_questions() {
        let ctx = PipelineContext::in_memory().unwrap();
        ctx.store
            .write(EXPERTS_TABLE, &experts_frame(), IfExists::Fail)
            .unwrap();

        let coverage = question_coverage(&ctx, &meta(&["eu_position"])).unwrap();

        assert!(!coverage.is_complete());
        assert_eq!(coverage.uncovered, vec!["lrgen".to_owned()]);
    }

    #[test]
    fn coverage_requires_the_experts_table() {
        let ctx = PipelineContext::in_memory().unwrap();

        let err = question_coverage(&ctx, &meta(&[])).unwrap_err();

        assert!(matches!(
            err,
            IngestError::Pipeline(PipelineError::MissingTable { .. }),
        ));
    }
}
