//! Results table walker.
//!
//! Finds the results grid in a page and returns the text of every data
//! row's cells. The first row of the grid is the header and is skipped.

use rostersync_fetch::html::{self, cell_text, tag_blocks};

use crate::descriptor::RESULTS_GRID_ID;

/// Returns the inner HTML of the results grid.
///
/// Prefers the `<table>` whose id mentions the grid; falls back to the first
/// table in the page.
fn results_table(body: &str) -> Option<&str> {
    let mut first = None;
    for (start, inner_start, inner_end, _) in tag_blocks(body, "table") {
        let inner = &body[inner_start..inner_end];
        let open_tag = &body[start..inner_start];
        let is_grid = html::attr(open_tag, "id").is_some_and(|id| id.contains(RESULTS_GRID_ID));
        if is_grid {
            return Some(inner);
        }
        first.get_or_insert(inner);
    }
    first
}

/// Returns the cell texts of every data row, in page order.
///
/// Rows keep however many cells they have; the parser decides what a short
/// row means.
pub fn data_rows(body: &str) -> Vec<Vec<String>> {
    let Some(table) = results_table(body) else {
        return Vec::new();
    };

    tag_blocks(table, "tr")
        .skip(1)
        .map(|(_, inner_start, inner_end, _)| {
            let row = &table[inner_start..inner_end];
            tag_blocks(row, "td")
                .map(|(_, s, e, _)| cell_text(&row[s..e]))
                .collect()
        })
        .collect()
}
