//! Pipeline stages: codebook tables, microdata tables, and the lookup.
//!
//! Stages are idempotent: unless `force` is set, a stage whose output
//! table already exists skips its (expensive) source work entirely. The
//! skip is keyed by table name, not source content — replacing stale
//! tables is what `force` is for.

use std::time::Instant;

use ches_explorer_codebook::{build_countries, build_parties};
use ches_explorer_database::IfExists;
use ches_explorer_microdata::load_microdata;
use ches_explorer_pdf::TableExtractor;
use ches_explorer_survey_models::{Country, Frame, Party, Value};

use crate::context::PipelineContext;
use crate::{
    COUNTRIES_TABLE, EXPERTS_TABLE, LOOKUP_TABLE, PARTIES_TABLE, PipelineError, SURVEY_TABLE,
    require_tables,
};

/// Converts country rows into a writable frame.
#[must_use]
pub fn countries_frame(countries: &[Country]) -> Frame {
    let mut frame = Frame::new(vec![
        "country".to_owned(),
        "country_id".to_owned(),
        "country_fullname".to_owned(),
    ]);
    for c in countries {
        frame.push_row(vec![
            Value::Text(c.country.clone()),
            Value::Int(c.country_id),
            Value::Text(c.country_fullname.clone()),
        ]);
    }
    frame
}

/// Converts party rows into a writable frame.
#[must_use]
pub fn parties_frame(parties: &[Party]) -> Frame {
    let mut frame = Frame::new(vec![
        "country".to_owned(),
        "party_id".to_owned(),
        "party".to_owned(),
        "party_name".to_owned(),
        "party_name_english".to_owned(),
    ]);
    for p in parties {
        frame.push_row(vec![
            Value::Text(p.country.clone()),
            Value::Int(p.party_id),
            Value::Text(p.party.clone()),
            Value::Text(p.party_name.clone()),
            Value::Text(p.party_name_english.clone()),
        ]);
    }
    frame
}

/// Builds and materializes the `COUNTRIES` and `PARTIES` tables from the
/// codebook PDF.
///
/// With `force` the tables are rebuilt from source and replaced;
/// otherwise existing tables are kept and extraction is skipped.
///
/// # Errors
///
/// Returns [`PipelineError`] if extraction, cleanup, or the writes fail.
pub fn build_codebook_tables(ctx: &PipelineContext, force: bool) -> Result<(), PipelineError> {
    if !force
        && ctx.store.exists(COUNTRIES_TABLE)?
        && ctx.store.exists(PARTIES_TABLE)?
    {
        log::info!("Codebook tables already materialized, skipping extraction");
        return Ok(());
    }

    let start = Instant::now();
    let extractor = TableExtractor::open(&ctx.files.codebook)?;

    let countries = build_countries(&extractor, &ctx.layout)?;
    let parties = build_parties(&extractor, &ctx.layout)?;

    let if_exists = if force { IfExists::Replace } else { IfExists::Fail };
    ctx.store
        .write(COUNTRIES_TABLE, &countries_frame(&countries), if_exists)?;
    ctx.store
        .write(PARTIES_TABLE, &parties_frame(&parties), if_exists)?;

    log::info!(
        "Codebook stage complete in {:?} ({} countries, {} parties)",
        start.elapsed(),
        countries.len(),
        parties.len(),
    );

    Ok(())
}

/// Loads and materializes the `V3` and `EXPERTS` microdata tables.
///
/// # Errors
///
/// Returns [`PipelineError`] if loading or the writes fail.
pub fn load_microdata_tables(ctx: &PipelineContext, force: bool) -> Result<(), PipelineError> {
    let datasets = [
        (&ctx.files.survey, SURVEY_TABLE),
        (&ctx.files.experts, EXPERTS_TABLE),
    ];

    for (path, table) in datasets {
        if !force && ctx.store.exists(table)? {
            log::info!("Table {table} already materialized, skipping load");
            continue;
        }

        let start = Instant::now();
        let frame = load_microdata(path)?;
        let if_exists = if force { IfExists::Replace } else { IfExists::Fail };
        let rows = ctx.store.write(table, &frame, if_exists)?;

        log::info!("Loaded {rows} rows into {table} in {:?}", start.elapsed());
    }

    Ok(())
}

/// Materializes the `LOOKUP` table: every party enriched with its
/// country's id and full name.
///
/// Left-join semantics are deliberate: a party whose country is missing
/// from `COUNTRIES` keeps its row with null enrichment columns, so data
/// quality problems surface as nulls instead of silently dropped rows.
///
/// # Errors
///
/// Returns [`PipelineError::MissingTable`] if the codebook tables are
/// not materialized yet, or [`PipelineError::Store`] on query/write
/// failures.
pub fn build_lookup(ctx: &PipelineContext) -> Result<(), PipelineError> {
    require_tables(&ctx.store, &[COUNTRIES_TABLE, PARTIES_TABLE])?;

    let lookup = ctx.store.query(
        "SELECT p.country, p.party_id, p.party, p.party_name, p.party_name_english,
                c.country_id, c.country_fullname
         FROM PARTIES p
         LEFT JOIN COUNTRIES c ON p.country = c.country
         ORDER BY p.\"index\"",
    )?;

    ctx.store.write(LOOKUP_TABLE, &lookup, IfExists::Replace)?;

    Ok(())
}

/// Runs every pipeline stage in order.
///
/// # Errors
///
/// Returns the first [`PipelineError`] a stage produces.
pub fn run_all(ctx: &PipelineContext, force: bool) -> Result<(), PipelineError> {
    build_codebook_tables(ctx, force)?;
    load_microdata_tables(ctx, force)?;
    build_lookup(ctx)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_reference_tables() -> PipelineContext {
        let ctx = PipelineContext::in_memory().unwrap();

        let countries = [
            Country {
                country: "bel".to_owned(),
                country_id: 1,
                country_fullname: "Belgium".to_owned(),
            },
            Country {
                country: "hun".to_owned(),
                country_id: 23,
                country_fullname: "Hungary".to_owned(),
            },
        ];
        let parties = [
            Party {
                country: "bel".to_owned(),
                party_id: 102,
                party: "PS".to_owned(),
                party_name: "Parti Socialiste".to_owned(),
                party_name_english: "Socialist Party".to_owned(),
            },
            Party {
                country: "hun".to_owned(),
                party_id: 2301,
                party: "MSZP".to_owned(),
                party_name: "Magyar Szocialista Part".to_owned(),
                party_name_english: "Hungarian Socialist Party".to_owned(),
            },
            // A party whose country is absent from COUNTRIES.
            Party {
                country: "xxx".to_owned(),
                party_id: 9999,
                party: "GHOST".to_owned(),
                party_name: String::new(),
                party_name_english: String::new(),
            },
        ];

        ctx.store
            .write(COUNTRIES_TABLE, &countries_frame(&countries), IfExists::Fail)
            .unwrap();
        ctx.store
            .write(PARTIES_TABLE, &parties_frame(&parties), IfExists::Fail)
            .unwrap();

        ctx
    }

    #[test]
    fn lookup_enriches_parties_with_country_columns() {
        let ctx = context_with_reference_tables();

        build_lookup(&ctx).unwrap();

        let lookup = ctx
            .store
            .query("SELECT * FROM LOOKUP ORDER BY \"index\"")
            .unwrap();
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.get(0, "country_id"), Some(&Value::Int(1)));
        assert_eq!(
            lookup.get(0, "country_fullname"),
            Some(&Value::Text("Belgium".to_owned())),
        );
    }

    #[test]
    fn lookup_keeps_parties_with_unknown_countries() {
        let ctx = context_with_reference_tables();

        build_lookup(&ctx).unwrap();

        let lookup = ctx
            .store
            .query("SELECT * FROM LOOKUP WHERE party_id = 9999")
            .unwrap();
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.get(0, "country_id"), Some(&Value::Null));
        assert_eq!(lookup.get(0, "country_fullname"), Some(&Value::Null));
    }

    #[test]
    fn lookup_requires_codebook_tables() {
        let ctx = PipelineContext::in_memory().unwrap();

        let err = build_lookup(&ctx).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::MissingTable { table } if table == COUNTRIES_TABLE
        ));
    }

    #[test]
    fn reference_frames_have_canonical_columns() {
        let frame = countries_frame(&[]);
        assert_eq!(frame.columns(), ["country", "country_id", "country_fullname"]);

        let frame = parties_frame(&[]);
        assert_eq!(
            frame.columns(),
            ["country", "party_id", "party", "party_name", "party_name_english"],
        );
    }
}
