//! Clustering of positioned characters into string grids.
//!
//! Characters are grouped into baseline rows, rows are split into cell
//! fragments wherever the horizontal gap exceeds a font-size fraction,
//! and fragments from all rows are merged into column intervals by
//! x-overlap. The result mirrors what a stream-mode table extractor
//! produces: close to the printed table, with layout artifacts intact.

use crate::{PageChar, RawTable};

/// Tolerances for grid assembly, in points or font-size fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridOptions {
    /// Maximum baseline distance for two characters to share a row.
    pub row_tolerance: f64,
    /// Gap wider than this fraction of the font size renders as a space
    /// inside a cell.
    pub space_ratio: f64,
    /// Gap wider than this fraction of the font size starts a new cell
    /// fragment.
    pub cell_gap_ratio: f64,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            row_tolerance: 2.5,
            space_ratio: 0.18,
            cell_gap_ratio: 1.0,
        }
    }
}

/// A run of characters forming one cell candidate within a row.
#[derive(Debug)]
struct Fragment {
    start: f64,
    end: f64,
    font_size: f64,
    text: String,
}

/// Keeps the characters whose origin lies inside `area`
/// (`[top, left, bottom, right]`, top-left page origin).
#[must_use]
pub fn chars_in_area(chars: Vec<PageChar>, area: [f64; 4]) -> Vec<PageChar> {
    let [top, left, bottom, right] = area;
    chars
        .into_iter()
        .filter(|c| c.y >= top && c.y <= bottom && c.x >= left && c.x <= right)
        .collect()
}

/// Assembles characters into a raw string grid.
///
/// The first clustered row becomes the header row. Returns an empty
/// table when no characters are given.
#[must_use]
pub fn raw_table_from_chars(mut chars: Vec<PageChar>, options: &GridOptions) -> RawTable {
    if chars.is_empty() {
        return RawTable::default();
    }

    chars.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let rows = cluster_rows(chars, options.row_tolerance);
    let row_fragments: Vec<Vec<Fragment>> = rows
        .into_iter()
        .map(|row| fragments_of_row(row, options))
        .collect();

    let columns = column_intervals(&row_fragments);

    let mut grid: Vec<Vec<String>> = Vec::with_capacity(row_fragments.len());
    for fragments in row_fragments {
        let mut cells = vec![String::new(); columns.len()];
        for fragment in fragments {
            let Some(idx) = columns
                .iter()
                .position(|&(start, end)| fragment.start < end && fragment.end > start)
            else {
                continue;
            };
            if cells[idx].is_empty() {
                cells[idx] = fragment.text;
            } else {
                cells[idx].push(' ');
                cells[idx].push_str(&fragment.text);
            }
        }
        grid.push(cells);
    }

    let mut iter = grid.into_iter();
    let headers = dedupe_headers(iter.next().unwrap_or_default());

    RawTable {
        headers,
        rows: iter.collect(),
    }
}

/// Splits baseline-sorted characters into rows.
fn cluster_rows(chars: Vec<PageChar>, tolerance: f64) -> Vec<Vec<PageChar>> {
    let mut rows: Vec<Vec<PageChar>> = Vec::new();
    let mut anchor = f64::MIN;

    for c in chars {
        if (c.y - anchor).abs() > tolerance {
            anchor = c.y;
            rows.push(Vec::new());
        }
        rows.last_mut().expect("row pushed above").push(c);
    }

    for row in &mut rows {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    rows
}

/// Merges one row's x-sorted characters into cell fragments, re-deriving
/// intra-cell spaces from the gap geometry.
fn fragments_of_row(row: Vec<PageChar>, options: &GridOptions) -> Vec<Fragment> {
    let mut fragments: Vec<Fragment> = Vec::new();

    for c in row {
        let advance_end = c.x + c.width;

        if let Some(last) = fragments.last_mut() {
            let gap = c.x - last.end;
            let font_size = last.font_size.max(c.font_size);

            if gap <= options.cell_gap_ratio * font_size {
                if gap > options.space_ratio * font_size {
                    last.text.push(' ');
                }
                last.text.push_str(&c.text);
                last.end = last.end.max(advance_end);
                last.font_size = font_size;
                continue;
            }
        }

        fragments.push(Fragment {
            start: c.x,
            end: advance_end,
            font_size: c.font_size,
            text: c.text,
        });
    }

    for fragment in &mut fragments {
        fragment.text = fragment.text.trim().to_owned();
    }

    fragments
}

/// Derives column x-intervals by merging overlapping fragment extents
/// across all rows.
fn column_intervals(rows: &[Vec<Fragment>]) -> Vec<(f64, f64)> {
    // Touching intervals within half a point still belong together.
    const MERGE_EPSILON: f64 = 0.5;

    let mut extents: Vec<(f64, f64)> = rows
        .iter()
        .flatten()
        .map(|f| (f.start, f.end))
        .collect();
    extents.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut columns: Vec<(f64, f64)> = Vec::new();
    for (start, end) in extents {
        match columns.last_mut() {
            Some(last) if start <= last.1 + MERGE_EPSILON => {
                last.1 = last.1.max(end);
            }
            _ => columns.push((start, end)),
        }
    }

    columns
}

/// Disambiguates duplicate header names with a positional suffix.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());

    for header in headers {
        if seen.iter().any(|h| *h == header) {
            let mut n = 2;
            while seen.iter().any(|h| *h == format!("{header}_{n}")) {
                n += 1;
            }
            seen.push(format!("{header}_{n}"));
        } else {
            seen.push(header);
        }
    }

    seen
}
