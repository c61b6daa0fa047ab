//! Per-edition codebook layout configuration.
//!
//! Page ranges, region areas, and column rename maps are data, not code:
//! each codebook edition gets a TOML layout file embedded at compile time
//! via [`include_str!`]. Supporting a future edition means adding a
//! layout file, not touching the builders.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Layout TOML for the 2019 codebook edition, embedded at compile time.
const CHES_2019_TOML: &str = include_str!("../layouts/ches2019.toml");

/// Everything edition-specific about the codebook document.
#[derive(Debug, Clone, Deserialize)]
pub struct CodebookLayout {
    /// Edition label (e.g. `"2019"`), used in log messages.
    pub edition: String,
    /// Literal text of the artifact row the layout inserts when a table
    /// continues on the next page.
    pub pagination_marker: String,
    /// Country codes printed inconsistently in the party table, mapped to
    /// the canonical code used by the country table.
    #[serde(default)]
    pub country_fixes: BTreeMap<String, String>,
    /// Geometry for the country table.
    pub countries: CountriesLayout,
    /// Geometry for the party table.
    pub parties: PartiesLayout,
}

/// Geometry for the country table: two side-by-side half-tables on a
/// single page, each extracted with its own area.
#[derive(Debug, Clone, Deserialize)]
pub struct CountriesLayout {
    /// 1-based page number of the country table.
    pub page: u32,
    /// `[top, left, bottom, right]` area of the left half-table.
    pub left_area: [f64; 4],
    /// `[top, left, bottom, right]` area of the right half-table.
    pub right_area: [f64; 4],
    /// Raw extracted header name -> canonical column name.
    pub renames: BTreeMap<String, String>,
}

/// Geometry for the party table, which spans a page range.
#[derive(Debug, Clone, Deserialize)]
pub struct PartiesLayout {
    /// First 1-based page of the party table.
    pub first_page: u32,
    /// Last 1-based page of the party table (inclusive).
    pub last_page: u32,
    /// `[top, left, bottom, right]` area shared by every page.
    pub area: [f64; 4],
    /// Raw extracted header name -> canonical column name.
    pub renames: BTreeMap<String, String>,
}

/// Returns the layout for the 2019 CHES codebook.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time
/// guarantee since the layout is embedded).
#[must_use]
pub fn ches2019() -> CodebookLayout {
    toml::from_str(CHES_2019_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse ches2019 layout: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_2019_layout_parses() {
        let layout = ches2019();

        assert_eq!(layout.edition, "2019");
        assert_eq!(layout.pagination_marker, "Continued on next page");
        assert_eq!(layout.countries.page, 2);
        assert_eq!(layout.countries.left_area, [153.0, 82.0, 403.0, 300.0]);
        assert_eq!(layout.countries.right_area, [153.0, 320.0, 403.0, 529.0]);
        assert_eq!(layout.parties.first_page, 3);
        assert_eq!(layout.parties.last_page, 11);
        assert_eq!(layout.country_fixes.get("hung").map(String::as_str), Some("hun"));
    }

    #[test]
    fn layout_renames_cover_canonical_columns() {
        let layout = ches2019();

        let party_targets: Vec<&str> = layout
            .parties
            .renames
            .values()
            .map(String::as_str)
            .collect();
        for required in ["country", "party_id", "party", "party_name", "party_name_english"] {
            assert!(party_targets.contains(&required), "missing {required}");
        }

        let country_targets: Vec<&str> = layout
            .countries
            .renames
            .values()
            .map(String::as_str)
            .collect();
        for required in ["country", "country_id", "country_fullname"] {
            assert!(country_targets.contains(&required), "missing {required}");
        }
    }
}
