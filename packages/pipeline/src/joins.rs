//! Analysis views: microdata joined against the lookup table.
//!
//! These views are recomputed on demand and never persisted; the
//! presentation layer consumes them read-only. Left joins are mandatory
//! so a microdata row with an unmatched `party_id` stays visible (with
//! null enrichment columns) instead of silently disappearing.

use ches_explorer_survey_models::Frame;

use crate::context::PipelineContext;
use crate::{EXPERTS_TABLE, LOOKUP_TABLE, PipelineError, SURVEY_TABLE, require_tables};

/// Returns the survey microdata enriched with party and country display
/// columns from `LOOKUP`.
///
/// # Errors
///
/// Returns [`PipelineError::MissingTable`] if `V3` or `LOOKUP` is not
/// materialized, or [`PipelineError::Store`] if the query fails.
pub fn survey_with_lookup(ctx: &PipelineContext) -> Result<Frame, PipelineError> {
    require_tables(&ctx.store, &[SURVEY_TABLE, LOOKUP_TABLE])?;

    let frame = ctx.store.query(
        "SELECT v.*, l.party_name, l.party_name_english, l.country_id, l.country_fullname
         FROM V3 v
         LEFT JOIN LOOKUP l ON v.party_id = l.party_id
         ORDER BY v.\"index\"",
    )?;

    log::debug!("Joined survey view: {} rows", frame.len());
    Ok(frame)
}

/// Returns the expert microdata enriched with country and party display
/// columns from `LOOKUP`.
///
/// The expert table does not carry a country column of its own (it is
/// dropped during normalization), so the join brings `country` in along
/// with the display columns.
///
/// # Errors
///
/// Returns [`PipelineError::MissingTable`] if `EXPERTS` or `LOOKUP` is
/// not materialized, or [`PipelineError::Store`] if the query fails.
pub fn experts_with_lookup(ctx: &PipelineContext) -> Result<Frame, PipelineError> {
    require_tables(&ctx.store, &[EXPERTS_TABLE, LOOKUP_TABLE])?;

    let frame = ctx.store.query(
        "SELECT e.*, l.country, l.party_name, l.party_name_english,
                l.country_id, l.country_fullname
         FROM EXPERTS e
         LEFT JOIN LOOKUP l ON e.party_id = l.party_id
         ORDER BY e.\"index\"",
    )?;

    log::debug!("Joined experts view: {} rows", frame.len());
    Ok(frame)
}
