//! Country table builder.
//!
//! The codebook's country table is typeset as two side-by-side
//! half-tables on one page. Each half is extracted with its own area and
//! cleaned independently; the result is the left half's rows followed by
//! the right half's rows, in extraction order.

use ches_explorer_pdf::{RawTable, TableExtractor};
use ches_explorer_survey_models::Country;

use crate::layout::CodebookLayout;
use crate::{CodebookError, apply_renames, parse_id, require_column};

/// Builds the country table from the codebook.
///
/// # Errors
///
/// Returns [`CodebookError`] if extraction fails, an expected column is
/// missing, or a country id does not parse.
pub fn build_countries(
    extractor: &TableExtractor,
    layout: &CodebookLayout,
) -> Result<Vec<Country>, CodebookError> {
    let page = layout.countries.page;
    let left = extractor.extract_table(page, layout.countries.left_area)?;
    let right = extractor.extract_table(page, layout.countries.right_area)?;

    let countries = countries_from_tables(left, right, layout)?;

    log::info!(
        "Built {} countries from codebook page {page} ({} edition)",
        countries.len(),
        layout.edition,
    );

    Ok(countries)
}

/// Cleans and concatenates the two raw half-tables.
///
/// # Errors
///
/// Returns [`CodebookError::SchemaMismatch`] if a canonical column is
/// absent after renames, or [`CodebookError::InvalidNumber`] for an
/// unparseable country id.
pub fn countries_from_tables(
    left: RawTable,
    right: RawTable,
    layout: &CodebookLayout,
) -> Result<Vec<Country>, CodebookError> {
    let mut countries = Vec::new();
    for half in [left, right] {
        countries.extend(countries_from_half(half, layout)?);
    }
    Ok(countries)
}

fn countries_from_half(
    mut table: RawTable,
    layout: &CodebookLayout,
) -> Result<Vec<Country>, CodebookError> {
    apply_renames(&mut table, &layout.countries.renames);

    let country = require_column(&table, "country")?;
    let country_id = require_column(&table, "country_id")?;
    let fullname = require_column(&table, "country_fullname")?;

    // Row 0 of each half duplicates the header band; drop it.
    table
        .rows
        .iter()
        .skip(1)
        .map(|row| {
            Ok(Country {
                country: row[country].trim().to_lowercase(),
                country_id: parse_id("country_id", &row[country_id])?,
                country_fullname: row[fullname].trim().to_owned(),
            })
        })
        .collect()
}
