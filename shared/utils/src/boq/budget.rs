//! Budget Aggregator
//!
//! The work order budget is the sum of derived line amounts unless the sheet
//! carries an explicit grand-total row, in which case the sheet's figure
//! wins and any disagreement is reported as a warning.

use tracing::{info, warn};

use super::grid::{Cell, Grid};
use super::hierarchy::{BoqItemRow, ColumnMap};
use super::labels::normalize;

/// A grand-total row found anywhere in the sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplicitTotal {
    pub row: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSummary {
    /// Sum of `rate x volume` over all parsed items.
    pub computed: f64,
    pub explicit: Option<ExplicitTotal>,
    /// The figure stored on the work order.
    pub budget: f64,
    pub warning: Option<String>,
}

pub struct BudgetAggregator {
    total_keyword: String,
    tolerance_ratio: f64,
}

impl BudgetAggregator {
    pub fn new(total_keyword: impl Into<String>, tolerance_ratio: f64) -> Self {
        Self {
            total_keyword: normalize(&total_keyword.into()),
            tolerance_ratio,
        }
    }

    /// Last row of the sheet that mentions the total keyword and carries a
    /// number. The header and priced item rows below it never qualify.
    pub fn find_explicit_total(&self, grid: &Grid, header_row: usize, columns: &ColumnMap) -> Option<ExplicitTotal> {
        (0..grid.height()).rev().find_map(|r| {
            if r == header_row {
                return None;
            }
            let row = grid.row(r)?;
            if r > header_row && row.get(columns.unit).is_some_and(|cell| !cell.is_blank()) {
                return None;
            }
            let mentions_total = row
                .iter()
                .filter_map(Cell::as_text)
                .any(|text| normalize(text).contains(&self.total_keyword));
            if !mentions_total {
                return None;
            }
            row.iter()
                .rev()
                .find_map(|cell| match cell {
                    Cell::Number(value) => Some(*value),
                    Cell::Text(_) => cell.as_number(),
                    _ => None,
                })
                .map(|value| ExplicitTotal { row: r, value })
        })
    }

    pub fn aggregate(&self, items: &[BoqItemRow], explicit: Option<ExplicitTotal>) -> BudgetSummary {
        let computed: f64 = items.iter().map(BoqItemRow::amount).sum();

        let Some(total) = explicit else {
            info!(budget = computed, "Budget computed from line items");
            return BudgetSummary {
                computed,
                explicit: None,
                budget: computed,
                warning: None,
            };
        };

        let deviation = (total.value - computed).abs();
        let warning = (deviation > self.tolerance_ratio * computed.abs()).then(|| {
            let message = format!(
                "Explicit total {} on row {} differs from computed total {}",
                total.value,
                total.row + 1,
                computed
            );
            warn!(explicit = total.value, computed, "{}", message);
            message
        });

        info!(budget = total.value, row = total.row, "Budget taken from explicit total row");
        BudgetSummary {
            computed,
            explicit: Some(total),
            budget: total.value,
            warning,
        }
    }
}
