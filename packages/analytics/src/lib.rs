#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filtering, reshaping, and aggregation for the dashboard.
//!
//! Operates on the joined analysis views the pipeline produces. Every
//! result here is transient — recomputed on each filter change by the
//! presentation layer and never written back to the store.

use std::collections::{BTreeMap, BTreeSet};

use ches_explorer_survey_models::{Frame, SummaryStats, Value};

/// Errors that can occur during analytics operations.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// A named column is absent from the frame.
    #[error("Column '{column}' not found in frame")]
    MissingColumn {
        /// The missing column name.
        column: String,
    },
}

fn require_column(frame: &Frame, column: &str) -> Result<usize, AnalyticsError> {
    frame
        .column_index(column)
        .ok_or_else(|| AnalyticsError::MissingColumn {
            column: column.to_owned(),
        })
}

/// Returns the sorted distinct non-null values of a column, rendered as
/// strings. This feeds the dashboard's multi-select filter options.
///
/// # Errors
///
/// Returns [`AnalyticsError::MissingColumn`] if the column is absent.
pub fn unique_values(frame: &Frame, column: &str) -> Result<Vec<String>, AnalyticsError> {
    require_column(frame, column)?;

    let set: BTreeSet<String> = frame
        .column_values(column)
        .filter(|v| !v.is_null())
        .map(ToString::to_string)
        .collect();

    Ok(set.into_iter().collect())
}

/// Keeps the rows whose `column` value is one of `values` (rendered as
/// strings), preserving row order — the multi-select filter.
///
/// # Errors
///
/// Returns [`AnalyticsError::MissingColumn`] if the column is absent.
pub fn filter_isin(
    frame: &Frame,
    column: &str,
    values: &[&str],
) -> Result<Frame, AnalyticsError> {
    let idx = require_column(frame, column)?;

    let rows = frame
        .rows()
        .iter()
        .filter(|row| !row[idx].is_null() && values.contains(&row[idx].to_string().as_str()))
        .cloned()
        .collect();

    Ok(Frame::from_rows(frame.columns().to_vec(), rows))
}

/// Returns the non-identity column names of a wide frame — the question
/// keys a melt would produce.
///
/// # Errors
///
/// Returns [`AnalyticsError::MissingColumn`] if an id column is absent.
pub fn question_columns(
    frame: &Frame,
    id_columns: &[&str],
) -> Result<Vec<String>, AnalyticsError> {
    for id in id_columns {
        require_column(frame, id)?;
    }

    Ok(frame
        .columns()
        .iter()
        .filter(|c| !id_columns.contains(&c.as_str()))
        .cloned()
        .collect())
}

/// Reshapes a wide frame into long format: one output row per
/// (input row, non-id column), with `question` and `value` columns
/// appended after the id columns. Null observations are kept.
///
/// # Errors
///
/// Returns [`AnalyticsError::MissingColumn`] if an id column is absent.
pub fn melt(frame: &Frame, id_columns: &[&str]) -> Result<Frame, AnalyticsError> {
    let id_indexes: Vec<usize> = id_columns
        .iter()
        .map(|c| require_column(frame, c))
        .collect::<Result<_, _>>()?;

    let value_columns: Vec<(usize, &String)> = frame
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| !id_columns.contains(&c.as_str()))
        .map(|(i, c)| (i, c))
        .collect();

    let mut columns: Vec<String> = id_columns.iter().map(|c| (*c).to_owned()).collect();
    columns.push("question".to_owned());
    columns.push("value".to_owned());

    let mut melted = Frame::new(columns);
    for row in frame.rows() {
        for (value_idx, name) in &value_columns {
            let mut out: Vec<Value> = id_indexes.iter().map(|&i| row[i].clone()).collect();
            out.push(Value::Text((*name).clone()));
            out.push(row[*value_idx].clone());
            melted.push_row(out);
        }
    }

    Ok(melted)
}

/// Groups a joined frame by `group_keys` and computes per-question
/// summary statistics, ignoring null observations.
///
/// Output is long: one row per (group, question) with `count`, `mean`,
/// `median`, `stdev`, and `variance` columns. Groups appear in sorted
/// key order; questions in the order given.
///
/// # Errors
///
/// Returns [`AnalyticsError::MissingColumn`] if a key or question
/// column is absent.
pub fn aggregate(
    frame: &Frame,
    group_keys: &[&str],
    question_columns: &[&str],
) -> Result<Frame, AnalyticsError> {
    let key_indexes: Vec<usize> = group_keys
        .iter()
        .map(|c| require_column(frame, c))
        .collect::<Result<_, _>>()?;
    let question_indexes: Vec<usize> = question_columns
        .iter()
        .map(|c| require_column(frame, c))
        .collect::<Result<_, _>>()?;

    let mut groups: BTreeMap<Vec<String>, Vec<usize>> = BTreeMap::new();
    for (row_idx, row) in frame.rows().iter().enumerate() {
        let key: Vec<String> = key_indexes.iter().map(|&i| row[i].to_string()).collect();
        groups.entry(key).or_default().push(row_idx);
    }

    let mut columns: Vec<String> = group_keys.iter().map(|c| (*c).to_owned()).collect();
    columns.extend(
        ["question", "count", "mean", "median", "stdev", "variance"]
            .map(str::to_owned),
    );

    let mut out = Frame::new(columns);
    for (key, row_indexes) in &groups {
        for (question, &question_idx) in question_columns.iter().zip(&question_indexes) {
            let observations: Vec<f64> = row_indexes
                .iter()
                .filter_map(|&r| frame.rows()[r][question_idx].as_f64())
                .collect();
            let stats = SummaryStats::from_observations(&observations);

            let mut row: Vec<Value> =
                key.iter().map(|k| Value::Text(k.clone())).collect();
            row.push(Value::Text((*question).to_owned()));
            row.push(Value::Int(i64::try_from(stats.count).unwrap_or(i64::MAX)));
            row.push(stats.mean.map_or(Value::Null, Value::Real));
            row.push(stats.median.map_or(Value::Null, Value::Real));
            row.push(stats.stdev.map_or(Value::Null, Value::Real));
            row.push(stats.variance.map_or(Value::Null, Value::Real));
            out.push_row(row);
        }
    }

    log::debug!(
        "Aggregated {} groups x {} questions",
        groups.len(),
        question_columns.len(),
    );

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined_sample() -> Frame {
        Frame::from_rows(
            vec![
                "country".to_owned(),
                "party".to_owned(),
                "eu_position".to_owned(),
                "lrgen".to_owned(),
            ],
            vec![
                vec!["bel".into(), "PS".into(), Value::Real(6.0), Value::Real(3.0)],
                vec!["bel".into(), "PS".into(), Value::Real(7.0), Value::Null],
                vec!["bel".into(), "NVA".into(), Value::Real(4.0), Value::Real(7.0)],
                vec!["dnk".into(), "V".into(), Value::Null, Value::Null],
            ],
        )
    }

    #[test]
    fn filter_keeps_only_selected_values() {
        let frame = joined_sample();

        let filtered = filter_isin(&frame, "party", &["PS"]).unwrap();

        assert_eq!(filtered.len(), 2);
        assert!(filtered
            .column_values("party")
            .all(|v| *v == Value::Text("PS".to_owned())));
    }

    #[test]
    fn unique_values_are_sorted_and_deduplicated() {
        let frame = joined_sample();

        let values = unique_values(&frame, "party").unwrap();

        assert_eq!(values, ["NVA", "PS", "V"]);
    }

    #[test]
    fn melt_produces_one_row_per_question_cell() {
        let frame = joined_sample();

        let melted = melt(&frame, &["country", "party"]).unwrap();

        assert_eq!(
            melted.columns(),
            ["country", "party", "question", "value"],
        );
        // 4 input rows x 2 question columns.
        assert_eq!(melted.len(), 8);
        assert_eq!(melted.get(0, "question"), Some(&Value::Text("eu_position".to_owned())));
        assert_eq!(melted.get(0, "value"), Some(&Value::Real(6.0)));
        // Null observations survive the reshape.
        assert_eq!(melted.get(3, "value"), Some(&Value::Null));
    }

    #[test]
    fn aggregate_ignores_nulls_and_uses_sample_statistics() {
        let frame = joined_sample();

        let stats = aggregate(&frame, &["country", "party"], &["eu_position"]).unwrap();

        // Groups in sorted key order: (bel, NVA), (bel, PS), (dnk, V).
        assert_eq!(stats.len(), 3);

        assert_eq!(stats.get(1, "party"), Some(&Value::Text("PS".to_owned())));
        assert_eq!(stats.get(1, "count"), Some(&Value::Int(2)));
        assert_eq!(stats.get(1, "mean"), Some(&Value::Real(6.5)));
        assert_eq!(stats.get(1, "median"), Some(&Value::Real(6.5)));
        assert_eq!(stats.get(1, "variance"), Some(&Value::Real(0.5)));

        // Single observation: spread is undefined.
        assert_eq!(stats.get(0, "count"), Some(&Value::Int(1)));
        assert_eq!(stats.get(0, "stdev"), Some(&Value::Null));

        // All-null group keeps its row with null statistics.
        assert_eq!(stats.get(2, "count"), Some(&Value::Int(0)));
        assert_eq!(stats.get(2, "mean"), Some(&Value::Null));
    }

    #[test]
    fn missing_column_is_an_error() {
        let frame = joined_sample();

        assert!(matches!(
            filter_isin(&frame, "nope", &[]),
            Err(AnalyticsError::MissingColumn { .. }),
        ));
        assert!(matches!(
            aggregate(&frame, &["nope"], &["eu_position"]),
            Err(AnalyticsError::MissingColumn { .. }),
        ));
    }

    #[test]
    fn expert_questions_are_covered_by_metadata() {
        // The melted expert question keys (identity columns excluded)
        // must be a subset of the metadata's key set.
        let experts = Frame::from_rows(
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
        );

        let metadata = ches_explorer_questions::questions_from_reader(
            r#"{
                "eu_position": {"description": "d", "category": "c", "scores": {"1": "low"}},
                "lrgen": {"description": "d", "category": "c", "scores": {"0": "left"}},
                "galtan": {"description": "d", "category": "c", "scores": {"0": "lib"}}
            }"#
            .as_bytes(),
        )
        .unwrap();

        let questions = question_columns(&experts, &["party_id", "party", "dob"]).unwrap();

        assert!(questions.iter().all(|q| metadata.contains_key(q)));
    }
}
