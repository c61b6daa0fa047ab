//! Explicit pipeline state.
//!
//! The context object owns everything a stage needs: the open store, the
//! codebook layout, and the source file locations. Constructing it is
//! the initialization boundary; dropping it closes the store connection.

use std::path::PathBuf;

use ches_explorer_codebook::layout::{CodebookLayout, ches2019};
use ches_explorer_database::{Store, paths};

use crate::PipelineError;

/// Locations of the pipeline's source files.
#[derive(Debug, Clone)]
pub struct SourceFiles {
    /// The codebook PDF.
    pub codebook: PathBuf,
    /// The party-level survey microdata file.
    pub survey: PathBuf,
    /// The expert-level microdata file.
    pub experts: PathBuf,
    /// The question metadata JSON file.
    pub questions: PathBuf,
}

impl SourceFiles {
    /// Returns the canonical locations under the project `data/`
    /// directory.
    #[must_use]
    pub fn default_paths() -> Self {
        Self {
            codebook: paths::codebook_path(),
            survey: paths::survey_path(),
            experts: paths::experts_path(),
            questions: paths::questions_path(),
        }
    }
}

/// Everything the pipeline stages share.
pub struct PipelineContext {
    /// The open relational store.
    pub store: Store,
    /// Layout geometry for the codebook edition being processed.
    pub layout: CodebookLayout,
    /// Source file locations.
    pub files: SourceFiles,
}

impl PipelineContext {
    /// Creates a context from explicit parts.
    #[must_use]
    pub const fn new(store: Store, layout: CodebookLayout, files: SourceFiles) -> Self {
        Self {
            store,
            layout,
            files,
        }
    }

    /// Opens the default store and source locations for the 2019
    /// edition.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the store cannot be opened.
    pub fn open_default() -> Result<Self, PipelineError> {
        let store = Store::open(&paths::store_path())?;
        Ok(Self::new(store, ches2019(), SourceFiles::default_paths()))
    }

    /// Creates a context over an in-memory store, for tests and
    /// throwaway runs.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the store cannot be opened.
    pub fn in_memory() -> Result<Self, PipelineError> {
        let store = Store::open_in_memory()?;
        Ok(Self::new(store, ches2019(), SourceFiles::default_paths()))
    }
}
