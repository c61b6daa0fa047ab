#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Static per-question metadata.
//!
//! The dashboard annotates and bounds its plots with a hand-maintained
//! JSON file keyed by question code: each entry carries a description, a
//! category, and the labeled score scale. Keys are lowercased on load to
//! match the microdata's lowercased column naming; no join against the
//! microdata is required, but key coverage of the expert file's question
//! columns is a tested property.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use ches_explorer_survey_models::QuestionMeta;

/// Errors that can occur while loading question metadata.
#[derive(Debug, thiserror::Error)]
pub enum QuestionError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loads question metadata from a JSON file.
///
/// # Errors
///
/// Returns [`QuestionError`] if the file is unreadable or not the
/// expected JSON shape.
pub fn load_questions(path: &Path) -> Result<BTreeMap<String, QuestionMeta>, QuestionError> {
    let file = std::fs::File::open(path)?;
    let questions = questions_from_reader(io::BufReader::new(file))?;

    log::info!(
        "Loaded metadata for {} questions from {}",
        questions.len(),
        path.display(),
    );

    Ok(questions)
}

/// Parses question metadata from a JSON reader, lowercasing keys.
///
/// # Errors
///
/// Returns [`QuestionError::Json`] if the input is not the expected
/// JSON shape.
pub fn questions_from_reader<R: io::Read>(
    reader: R,
) -> Result<BTreeMap<String, QuestionMeta>, QuestionError> {
    let raw: BTreeMap<String, QuestionMeta> = serde_json::from_reader(reader)?;

    Ok(raw
        .into_iter()
        .map(|(key, meta)| (key.to_lowercase(), meta))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "EU_Position": {
            "description": "overall orientation of the party leadership towards European integration",
            "category": "European Union",
            "scores": {
                "1": "strongly opposed",
                "4": "neutral",
                "7": "strongly in favor"
            }
        },
        "lrgen": {
            "description": "overall ideological stance",
            "category": "Ideology",
            "scores": {
                "0": "extreme left",
                "5": "center",
                "10": "extreme right"
            }
        }
    }"#;

    #[test]
    fn keys_are_lowercased_on_load() {
        let questions = questions_from_reader(SAMPLE.as_bytes()).unwrap();

        assert!(questions.contains_key("eu_position"));
        assert!(!questions.contains_key("EU_Position"));
        assert_eq!(questions.len(), 2);
    }

    #[test]
    fn score_range_bounds_the_scale() {
        let questions = questions_from_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(questions["eu_position"].score_range(), Some((1.0, 7.0)));
        assert_eq!(questions["lrgen"].score_range(), Some((0.0, 10.0)));
        assert_eq!(questions["lrgen"].category, "Ideology");
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = questions_from_reader("not json".as_bytes()).unwrap_err();
        assert!(matches!(err, QuestionError::Json(_)));
    }
}
