//! Critical CSS extraction over a snapshot of a rendered page.
//!
//! The page-side script only collects data; all matching happens here so
//! the algorithm can run (and be tested) without a browser.

pub mod classifier;
pub mod snapshot;
pub mod usage;
pub mod walker;

#[cfg(test)]
mod tests;

pub use classifier::selector_matches;
pub use snapshot::{CssRule, ElementSnapshot, PageSnapshot, SNAPSHOT_SCRIPT, StyleSheetSnapshot};
pub use usage::UsageIndex;
pub use walker::{WalkOutput, walk_stylesheets};

use crate::results::ExtractionResult;

/// Extract the critical CSS of a rendered page.
///
/// Builds the usage index from the visible elements, walks the stylesheets
/// with it and derives the statistics of the result.
pub fn extract_critical_css(snapshot: &PageSnapshot) -> ExtractionResult {
    let index = UsageIndex::from_elements(&snapshot.elements);
    let WalkOutput { css, original_size } = walk_stylesheets(&snapshot.style_sheets, &index);

    ::log::debug!(
        "Walked {} stylesheets with {} usage tokens",
        snapshot.style_sheets.len(),
        index.len()
    );

    ExtractionResult::new(css, original_size, index.len())
}
