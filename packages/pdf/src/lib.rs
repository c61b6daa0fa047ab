#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Table extraction from fixed-layout PDF documents.
//!
//! The CHES codebook publishes its country and party reference tables as
//! typeset PDF pages. This crate extracts a rectangular region of a page
//! — identified by a 1-based page number and a `[top, left, bottom,
//! right]` area in points, top-left origin — into a [`RawTable`] grid of
//! strings.
//!
//! Extraction is positional: every character the page draws is recorded
//! with its device coordinates via a [`pdf_extract::OutputDev`], then
//! characters inside the area are clustered into rows, cell fragments,
//! and columns (see [`grid`]). The output is approximate by nature;
//! downstream table builders must treat pagination markers, wrapped rows
//! and spurious trailing columns as ordinary, recoverable data.

mod device;
pub mod grid;

use std::ops::RangeInclusive;
use std::path::Path;

use lopdf::Document;

use crate::device::CharCollector;
pub use crate::grid::GridOptions;

/// Errors that can occur during PDF table extraction.
///
/// Every failure here means a static-layout assumption was violated;
/// retrying without correcting the page number or area cannot succeed.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The document could not be read or parsed.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Rendering a page's text content failed.
    #[error("PDF content error: {0}")]
    Output(#[from] pdf_extract::OutputError),

    /// The requested page does not exist in the document.
    #[error("page {page} out of range: document has {page_count} pages")]
    PageOutOfRange {
        /// Requested 1-based page number.
        page: u32,
        /// Number of pages in the document.
        page_count: u32,
    },

    /// The area produced no table rows at all.
    #[error("no table rows inside area {area:?} on page {page}")]
    EmptyRegion {
        /// 1-based page number that was searched.
        page: u32,
        /// `[top, left, bottom, right]` area that came up empty.
        area: [f64; 4],
    },
}

/// A single character placed on a page.
///
/// Coordinates are in points with a top-left origin (`y` grows downward),
/// matching the areas the codebook geometry is published in.
#[derive(Debug, Clone, PartialEq)]
pub struct PageChar {
    /// Horizontal offset of the character origin from the page's left edge.
    pub x: f64,
    /// Vertical offset of the baseline from the page's top edge.
    pub y: f64,
    /// Horizontal advance width.
    pub width: f64,
    /// Effective (device-space) font size.
    pub font_size: f64,
    /// The character's text content.
    pub text: String,
}

/// An extracted grid of raw strings.
///
/// The first physical row of the region becomes the header row; cells
/// with no header text get an empty-string name, and duplicate header
/// names are disambiguated with a `_2`, `_3`, … suffix. No semantic
/// cleanup is performed here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    /// Column header names, in layout order.
    pub headers: Vec<String>,
    /// Data rows; each row has exactly `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Returns the position of a header by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Returns `true` if the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Concatenates tables in order, aligning columns by header name.
    ///
    /// The output header set is the union of all input headers in
    /// first-seen order; cells for columns a table does not have are
    /// filled with the empty string (the raw-table missing marker).
    #[must_use]
    pub fn concat(tables: Vec<Self>) -> Self {
        let mut headers: Vec<String> = Vec::new();
        for table in &tables {
            for header in &table.headers {
                if !headers.iter().any(|h| h == header) {
                    headers.push(header.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for table in tables {
            let mapping: Vec<usize> = table
                .headers
                .iter()
                .map(|h| headers.iter().position(|u| u == h).expect("union header"))
                .collect();

            for row in table.rows {
                let mut out = vec![String::new(); headers.len()];
                for (cell, &target) in row.into_iter().zip(&mapping) {
                    out[target] = cell;
                }
                rows.push(out);
            }
        }

        Self { headers, rows }
    }
}

/// Extracts tabular regions from one PDF document.
///
/// The document is parsed once on open and kept in memory; all region
/// extractions reuse it.
pub struct TableExtractor {
    doc: Document,
    page_count: u32,
    options: GridOptions,
}

impl TableExtractor {
    /// Opens and parses a PDF document.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Pdf`] if the file is unreadable or not a
    /// parseable PDF.
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        let doc = Document::load(path)?;
        let page_count = u32::try_from(doc.get_pages().len()).unwrap_or(u32::MAX);

        log::debug!("Opened {} ({page_count} pages)", path.display());

        Ok(Self {
            doc,
            page_count,
            options: GridOptions::default(),
        })
    }

    /// Overrides the clustering tolerances used for grid assembly.
    #[must_use]
    pub const fn with_options(mut self, options: GridOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the number of pages in the document.
    #[must_use]
    pub const fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Extracts the table inside `area` on a single 1-based page.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::PageOutOfRange`] for a bad page number,
    /// [`ExtractError::EmptyRegion`] if the area contains no text rows,
    /// or [`ExtractError::Output`] if the page content cannot be
    /// rendered.
    pub fn extract_table(&self, page: u32, area: [f64; 4]) -> Result<RawTable, ExtractError> {
        let chars = self.page_chars(page)?;
        let inside = grid::chars_in_area(chars, area);
        let table = grid::raw_table_from_chars(inside, &self.options);

        if table.headers.is_empty() {
            return Err(ExtractError::EmptyRegion { page, area });
        }

        log::debug!(
            "Extracted {} columns x {} rows from page {page}",
            table.headers.len(),
            table.rows.len(),
        );

        Ok(table)
    }

    /// Extracts the same area from every page in a 1-based inclusive
    /// range, one table per page in page order.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::extract_table`]; the whole range is
    /// validated against the page count before any page is rendered.
    pub fn extract_tables(
        &self,
        pages: RangeInclusive<u32>,
        area: [f64; 4],
    ) -> Result<Vec<RawTable>, ExtractError> {
        let last = *pages.end();
        if last == 0 || last > self.page_count {
            return Err(ExtractError::PageOutOfRange {
                page: last,
                page_count: self.page_count,
            });
        }

        pages.map(|page| self.extract_table(page, area)).collect()
    }

    /// Collects every positioned character on a page.
    fn page_chars(&self, page: u32) -> Result<Vec<PageChar>, ExtractError> {
        if page == 0 || page > self.page_count {
            return Err(ExtractError::PageOutOfRange {
                page,
                page_count: self.page_count,
            });
        }

        let mut collector = CharCollector::default();
        pdf_extract::output_doc_page(&self.doc, &mut collector, page)?;
        Ok(collector.into_chars())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_aligns_columns_by_header_name() {
        let first = RawTable {
            headers: vec!["Country".to_owned(), "Party ID".to_owned()],
            rows: vec![vec!["aus".to_owned(), "1".to_owned()]],
        };
        let second = RawTable {
            headers: vec!["Party ID".to_owned(), "Party Name".to_owned()],
            rows: vec![vec!["2".to_owned(), "Beta".to_owned()]],
        };

        let joined = RawTable::concat(vec![first, second]);

        assert_eq!(joined.headers, ["Country", "Party ID", "Party Name"]);
        assert_eq!(joined.rows[0], ["aus", "1", ""]);
        assert_eq!(joined.rows[1], ["", "2", "Beta"]);
    }

    #[test]
    fn concat_of_nothing_is_empty() {
        let joined = RawTable::concat(Vec::new());
        assert!(joined.headers.is_empty());
        assert!(joined.is_empty());
    }
}
