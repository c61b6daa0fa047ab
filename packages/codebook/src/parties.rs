//! Party table builder.
//!
//! The party table spans several codebook pages. Each page is extracted
//! independently and the grids are concatenated in page order before
//! cleanup. Cleanup repairs three extraction artifacts — pagination
//! marker rows, a spurious unnamed trailing column, and party names
//! wrapped onto a second physical row — and then normalizes country
//! codes so every party row joins against the country table.

use ches_explorer_pdf::{RawTable, TableExtractor};
use ches_explorer_survey_models::Party;

use crate::layout::CodebookLayout;
use crate::{CodebookError, apply_renames, parse_id, raw_header_for, require_column};

/// Builds the party table from the codebook.
///
/// # Errors
///
/// Returns [`CodebookError`] if extraction fails, an expected column is
/// missing, or a party id does not parse.
pub fn build_parties(
    extractor: &TableExtractor,
    layout: &CodebookLayout,
) -> Result<Vec<Party>, CodebookError> {
    let pages = layout.parties.first_page..=layout.parties.last_page;
    let tables = extractor.extract_tables(pages.clone(), layout.parties.area)?;

    let parties = parties_from_raw(RawTable::concat(tables), layout)?;

    log::info!(
        "Built {} parties from codebook pages {}-{} ({} edition)",
        parties.len(),
        pages.start(),
        pages.end(),
        layout.edition,
    );

    Ok(parties)
}

/// Cleans a concatenated raw party table into canonical rows.
///
/// The cleanup steps run in a fixed order; in particular continuation
/// rows are merged *before* the country column is forward-filled, so a
/// continuation row (which has no country of its own) never pollutes the
/// fill.
///
/// # Errors
///
/// Returns [`CodebookError::SchemaMismatch`] if a canonical column is
/// absent, or [`CodebookError::InvalidNumber`] for an unparseable party
/// id.
pub fn parties_from_raw(
    mut table: RawTable,
    layout: &CodebookLayout,
) -> Result<Vec<Party>, CodebookError> {
    let renames = &layout.parties.renames;
    let raw_english = raw_header_for(renames, "party_name_english")?;
    let english = require_column(&table, raw_english)?;

    // 1. Drop rows holding the "continued on next page" marker, which the
    //    layout inserts whenever the table spans a page break. The marker
    //    lands in either the english-name column or the unnamed trailing
    //    column depending on how the page happened to render.
    let marker = layout.pagination_marker.as_str();
    let unnamed = table.column_index("");
    let before = table.rows.len();
    table.rows.retain(|row| {
        row[english].trim() != marker && unnamed.is_none_or(|i| row[i].trim() != marker)
    });
    if table.rows.len() < before {
        log::debug!("Dropped {} pagination marker rows", before - table.rows.len());
    }

    // 2. Drop the unnamed trailing column entirely; it exists only because
    //    the extraction area is wider than the printed table.
    while let Some(idx) = table.column_index("") {
        drop_raw_column(&mut table, idx);
    }

    let country = require_column(&table, raw_header_for(renames, "country")?)?;
    let party_id = require_column(&table, raw_header_for(renames, "party_id")?)?;
    let party = require_column(&table, raw_header_for(renames, "party")?)?;
    let party_name = require_column(&table, raw_header_for(renames, "party_name")?)?;
    let english = require_column(&table, raw_english)?;

    // 3. Merge continuation rows: a row with no country, party id, or
    //    abbreviation is the second physical line of a name too long to
    //    fit one row. Its name cells belong to the row above it.
    merge_continuation_rows(&mut table, country, party_id, party, party_name, english);

    // 4. Forward-fill the country column; the codebook prints each
    //    country once for its whole run of parties.
    let mut carried = String::new();
    for row in &mut table.rows {
        if row[country].trim().is_empty() {
            row[country].clone_from(&carried);
        } else {
            carried.clone_from(&row[country]);
        }
    }

    // 5. Lowercase country codes and collapse known inconsistent
    //    spellings to the canonical code used by the country table.
    for row in &mut table.rows {
        let code = row[country].trim().to_lowercase();
        row[country] = layout.country_fixes.get(&code).cloned().unwrap_or(code);
    }

    // 6./7. Remaining missing cells stay as empty strings; rename and
    //       parse into canonical rows with a dense index.
    apply_renames(&mut table, renames);

    table
        .rows
        .iter()
        .map(|row| {
            Ok(Party {
                country: row[country].clone(),
                party_id: parse_id("party_id", &row[party_id])?,
                party: row[party].trim().to_owned(),
                party_name: row[party_name].trim().to_owned(),
                party_name_english: row[english].trim().to_owned(),
            })
        })
        .collect()
}

/// Merges every continuation row into its predecessor and removes it.
///
/// Runs back-to-front so chains of wrapped lines collapse naturally.
fn merge_continuation_rows(
    table: &mut RawTable,
    country: usize,
    party_id: usize,
    party: usize,
    party_name: usize,
    english: usize,
) {
    let is_continuation = |row: &[String]| {
        row[country].trim().is_empty()
            && row[party_id].trim().is_empty()
            && row[party].trim().is_empty()
    };

    for i in (1..table.rows.len()).rev() {
        if is_continuation(&table.rows[i]) {
            let row = table.rows.remove(i);
            let prev = &mut table.rows[i - 1];
            prev[party_name].push_str(&row[party_name]);
            prev[english].push_str(&row[english]);
        }
    }

    // A continuation row with nothing above it has no home; this only
    // happens when the extraction area clips the first printed row.
    if let Some(first) = table.rows.first()
        && is_continuation(first)
    {
        log::warn!("Dropping continuation row with no preceding party row");
        table.rows.remove(0);
    }
}

fn drop_raw_column(table: &mut RawTable, idx: usize) {
    table.headers.remove(idx);
    for row in &mut table.rows {
        row.remove(idx);
    }
}
