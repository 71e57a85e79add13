//! Label Extractor
//!
//! Finds scalar metadata anywhere in the grid by fuzzy label matching. A
//! field matches any cell whose text contains one of its aliases
//! (case-insensitive). This is permissive on purpose and can pick up
//! unrelated cells on ambiguous sheets.

use tracing::trace;

use super::grid::{Cell, Grid};
use crate::config::ImportConfig;

/// Placement strategies, tried in this order across every alias hit of a
/// region. Hits above the BOQ body are tried before hits inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Value sits right of the label, or below it when the right neighbour
    /// is itself a label.
    Adjacent,
    /// Value sits directly below the label.
    Vertical,
    /// Value follows the label in the same row, possibly after a `:` inside
    /// the label cell or after blank/separator cells.
    Inline,
}

impl Strategy {
    const ORDER: [Strategy; 3] = [Strategy::Adjacent, Strategy::Vertical, Strategy::Inline];

    fn apply(self, grid: &Grid, row: usize, col: usize) -> Option<Cell> {
        match self {
            Strategy::Adjacent => {
                let mut right_col = col + 1;
                // Bare ":" cells are transparent.
                while grid.cell(row, right_col).is_separator() {
                    right_col += 1;
                }
                let right = grid.cell(row, right_col);
                if right.is_label() {
                    scalar(grid.cell(row + 1, col))
                } else {
                    scalar(right)
                }
            }
            Strategy::Vertical => scalar(grid.cell(row + 1, col)),
            Strategy::Inline => {
                let label = grid.cell(row, col).as_text()?;
                if let Some((_, rest)) = label.split_once(':') {
                    if let Some(value) = scalar(&Cell::text(rest)) {
                        return Some(value);
                    }
                }
                (col + 1..grid.width())
                    .map(|c| grid.cell(row, c))
                    .find(|cell| !cell.is_blank() && !cell.is_separator())
                    .and_then(scalar)
            }
        }
    }
}

/// Trimmed text (leading separators removed) or the raw numeric/date cell.
fn scalar(cell: &Cell) -> Option<Cell> {
    match cell {
        Cell::Text(_) => {
            let text = cell.as_text()?.trim_start_matches(':').trim();
            (!text.is_empty()).then(|| Cell::text(text))
        }
        Cell::Number(_) | Cell::DateSerial(_) => Some(cell.clone()),
        Cell::Empty => None,
    }
}

pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Metadata extractor driven by the configured alias table.
pub struct LabelExtractor<'a> {
    config: &'a ImportConfig,
    body_start: Option<usize>,
}

impl<'a> LabelExtractor<'a> {
    pub fn new(config: &'a ImportConfig) -> Self {
        Self {
            config,
            body_start: None,
        }
    }

    /// Rows from `row` on only count once nothing above them matched.
    pub fn with_body_start(mut self, row: usize) -> Self {
        self.body_start = Some(row);
        self
    }

    /// First value for `field`, or `None` when no alias matches anywhere.
    pub fn extract(&self, grid: &Grid, field: &str) -> Option<Cell> {
        let aliases: Vec<String> = self
            .config
            .aliases_for(field)
            .iter()
            .map(|alias| normalize(alias))
            .filter(|alias| !alias.is_empty())
            .collect();
        if aliases.is_empty() {
            return None;
        }

        let (body, header): (Vec<(usize, usize)>, Vec<(usize, usize)>) = grid
            .positions()
            .filter(|&(r, c)| {
                grid.cell(r, c)
                    .as_text()
                    .map(|text| {
                        let text = normalize(text);
                        aliases.iter().any(|alias| text.contains(alias.as_str()))
                    })
                    .unwrap_or(false)
            })
            .partition(|&(r, _)| self.body_start.is_some_and(|start| r >= start));

        [header, body].iter().find_map(|hits| {
            Strategy::ORDER.into_iter().find_map(|strategy| {
                hits.iter().find_map(|&(row, col)| {
                    let value = strategy.apply(grid, row, col)?;
                    trace!(field, row, col, ?strategy, "Label value found");
                    Some(value)
                })
            })
        })
    }

    /// Value rendered as text; numbers print without a trailing `.0`.
    pub fn extract_text(&self, grid: &Grid, field: &str) -> Option<String> {
        self.extract(grid, field).map(|cell| cell.display())
    }

    /// True when the text contains any configured metadata alias.
    pub fn is_known_label(&self, text: &str) -> bool {
        let text = normalize(text);
        self.config
            .all_label_aliases()
            .map(|alias| normalize(alias))
            .any(|alias| !alias.is_empty() && text.contains(&alias))
    }
}
