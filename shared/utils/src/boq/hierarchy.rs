//! BOQ Hierarchy Parser
//!
//! Rebuilds the category -> subcategory -> work item hierarchy from the rows
//! below the BOQ table header. The source sheets carry no level markers, so
//! classification relies on row shape and one row of lookahead:
//!
//! - description + unit: priced work item
//! - description, no unit, next row has a unit: subcategory
//! - description, no unit, next row has no unit: category
//!
//! The running category/subcategory is an explicit [`HierarchyState`]
//! threaded through [`HierarchyParser::step`], so the parser is a fold over
//! rows and each step can be tested on its own.

use tracing::{debug, info, warn};

use spk_models::{BoqVolume, Rate, RatePair};

use super::grid::{Cell, Grid};
use super::labels::{normalize, LabelExtractor};
use crate::config::{HeaderAliases, ImportConfig};
use crate::error::{SpkError, SpkResult};

/// Column positions of the BOQ table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    pub description: usize,
    pub unit: usize,
    pub total_price: usize,
    pub non_remote_rate: usize,
    pub remote_rate: usize,
    pub non_remote_qty: usize,
    pub remote_qty: usize,
    pub non_remote_rate_label: String,
    pub remote_rate_label: String,
}

impl ColumnMap {
    /// Maps a header row, or `None` when description, unit or total price
    /// is missing.
    pub fn detect(row: &[Cell], aliases: &HeaderAliases) -> Option<Self> {
        let headers: Vec<String> = row
            .iter()
            .map(|cell| cell.as_text().map(normalize).unwrap_or_default())
            .collect();

        let description = find_column(&headers, &aliases.description, true)?;
        let unit = find_column(&headers, &aliases.unit, true)?;
        let total_price = find_column(&headers, &aliases.total_price, true)?;

        // "r rate" is a substring of "nr rate", so rate and quantity columns
        // only match exactly and otherwise fall back to their usual position
        // right of the unit column.
        let non_remote_rate = find_column(&headers, &aliases.non_remote_rate, false).unwrap_or(unit + 1);
        let remote_rate = find_column(&headers, &aliases.remote_rate, false).unwrap_or(unit + 2);
        let non_remote_qty = find_column(&headers, &aliases.non_remote_qty, false).unwrap_or(unit + 3);
        let remote_qty = find_column(&headers, &aliases.remote_qty, false).unwrap_or(unit + 4);

        let label_at = |col: usize, fallback: &str| {
            row.get(col)
                .and_then(Cell::as_text)
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string())
        };

        Some(Self {
            description,
            unit,
            total_price,
            non_remote_rate,
            remote_rate,
            non_remote_qty,
            remote_qty,
            non_remote_rate_label: label_at(non_remote_rate, "Non-Remote"),
            remote_rate_label: label_at(remote_rate, "Remote"),
        })
    }
}

/// Exact match first; substring match second when allowed.
fn find_column(headers: &[String], aliases: &[String], allow_substring: bool) -> Option<usize> {
    let aliases: Vec<String> = aliases.iter().map(|a| normalize(a)).filter(|a| !a.is_empty()).collect();

    headers
        .iter()
        .position(|header| aliases.iter().any(|alias| header == alias))
        .or_else(|| {
            allow_substring
                .then(|| {
                    headers
                        .iter()
                        .position(|header| aliases.iter().any(|alias| header.contains(alias.as_str())))
                })
                .flatten()
        })
}

/// How a data row was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowClass {
    Category,
    SubCategory,
    WorkItem,
    /// Label-shaped "total" row, handled by the budget aggregator.
    Summary,
    Skipped,
}

/// One entry of the per-row diagnostic trail.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDecision {
    pub row: usize,
    pub class: RowClass,
    pub label: String,
}

/// A priced work item row with its resolved hierarchy names.
#[derive(Debug, Clone, PartialEq)]
pub struct BoqItemRow {
    pub row: usize,
    pub category: String,
    pub sub_category: String,
    pub description: String,
    pub unit: String,
    pub rates: RatePair,
    pub volume: BoqVolume,
    /// Total price as written in the sheet; informational only.
    pub stated_total: Option<f64>,
}

impl BoqItemRow {
    /// Derived line amount; the stated total is never used.
    pub fn amount(&self) -> f64 {
        self.rates.amount_for(&self.volume)
    }
}

/// Accumulator threaded through the row fold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchyState {
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub items: Vec<BoqItemRow>,
    pub decisions: Vec<RowDecision>,
    pub warnings: Vec<String>,
}

impl HierarchyState {
    fn decide(mut self, row: usize, class: RowClass, label: impl Into<String>) -> Self {
        self.decisions.push(RowDecision {
            row,
            class,
            label: label.into(),
        });
        self
    }
}

/// Output of the hierarchy stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBoq {
    pub header_row: usize,
    pub columns: ColumnMap,
    pub work_description: String,
    pub items: Vec<BoqItemRow>,
    pub decisions: Vec<RowDecision>,
    pub warnings: Vec<String>,
}

impl ParsedBoq {
    pub fn computed_total(&self) -> f64 {
        self.items.iter().map(BoqItemRow::amount).sum()
    }

    pub fn count(&self, class: RowClass) -> usize {
        self.decisions.iter().filter(|d| d.class == class).count()
    }
}

pub struct HierarchyParser<'a> {
    config: &'a ImportConfig,
}

impl<'a> HierarchyParser<'a> {
    pub fn new(config: &'a ImportConfig) -> Self {
        Self { config }
    }

    /// Parse the whole grid. A missing header is fatal.
    pub fn parse(&self, grid: &Grid) -> SpkResult<ParsedBoq> {
        let (header_row, columns) = self
            .find_header(grid)
            .ok_or_else(|| SpkError::import_failed("BOQ header row not found"))?;
        info!(header_row, "BOQ header detected");

        let work_description = self.narrative(grid, header_row);

        let state = (header_row + 1..grid.height()).fold(HierarchyState::default(), |state, r| {
            let row = grid.row(r).unwrap_or(&[]);
            self.step(state, r, row, grid.row(r + 1), &columns)
        });

        Ok(ParsedBoq {
            header_row,
            columns,
            work_description,
            items: state.items,
            decisions: state.decisions,
            warnings: state.warnings,
        })
    }

    /// First row carrying all required column labels.
    pub fn find_header(&self, grid: &Grid) -> Option<(usize, ColumnMap)> {
        grid.rows()
            .find_map(|(r, row)| ColumnMap::detect(row, &self.config.header).map(|columns| (r, columns)))
    }

    /// Long free-text fragments above the header, newline joined.
    pub fn narrative(&self, grid: &Grid, header_row: usize) -> String {
        let labels = LabelExtractor::new(self.config);

        grid.rows()
            .take(header_row)
            .flat_map(|(_, row)| row.iter())
            .filter_map(Cell::as_text)
            .filter(|text| text.chars().count() >= self.config.min_description_length)
            .filter(|text| !labels.is_known_label(text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Classify one data row. `next` is the following grid row, used for
    /// the category/subcategory lookahead.
    pub fn step(
        &self,
        state: HierarchyState,
        r: usize,
        row: &[Cell],
        next: Option<&[Cell]>,
        columns: &ColumnMap,
    ) -> HierarchyState {
        let at = |col: usize| row.get(col).unwrap_or(&Cell::Empty);
        let description = at(columns.description).as_text().map(str::to_string);
        let unit = unit_of(row, columns);

        match (description, unit) {
            (Some(description), None) => self.label_row(state, r, description, next, columns),
            (Some(description), Some(unit)) => self.item_row(state, r, row, description, unit, columns),
            (None, _) => {
                if row.iter().all(Cell::is_blank) {
                    debug!(row = r, "Blank row");
                    return state.decide(r, RowClass::Skipped, "");
                }
                let message = format!("Row {}: no description, skipped", r + 1);
                warn!(row = r, "{}", message);
                let mut state = state.decide(r, RowClass::Skipped, "");
                state.warnings.push(message);
                state
            }
        }
    }

    fn label_row(
        &self,
        mut state: HierarchyState,
        r: usize,
        description: String,
        next: Option<&[Cell]>,
        columns: &ColumnMap,
    ) -> HierarchyState {
        if normalize(&description).contains(&normalize(&self.config.total_keyword)) {
            info!(row = r, label = %description, "Summary row");
            return state.decide(r, RowClass::Summary, description);
        }

        let precedes_items = next.and_then(|n| unit_of(n, columns)).is_some();
        if precedes_items {
            info!(row = r, label = %description, "Subcategory");
            state.sub_category = Some(description.clone());
            state.decide(r, RowClass::SubCategory, description)
        } else {
            info!(row = r, label = %description, "Category");
            state.category = Some(description.clone());
            state.sub_category = None;
            state.decide(r, RowClass::Category, description)
        }
    }

    fn item_row(
        &self,
        mut state: HierarchyState,
        r: usize,
        row: &[Cell],
        description: String,
        unit: String,
        columns: &ColumnMap,
    ) -> HierarchyState {
        let number = |col: usize| row.get(col).and_then(Cell::as_number);

        let rates = RatePair::new(
            Rate::new(number(columns.non_remote_rate).unwrap_or(0.0), columns.non_remote_rate_label.clone()),
            Rate::new(number(columns.remote_rate).unwrap_or(0.0), columns.remote_rate_label.clone()),
        );

        let mut quantity = |col: usize, channel: &str| {
            let value = number(col).unwrap_or(0.0);
            if value < 0.0 {
                let message = format!("Row {}: negative {} quantity {} clamped to 0", r + 1, channel, value);
                warn!(row = r, "{}", message);
                state.warnings.push(message);
                0.0
            } else {
                value
            }
        };
        let volume = BoqVolume::new(
            quantity(columns.non_remote_qty, "non-remote"),
            quantity(columns.remote_qty, "remote"),
        );

        let category = state
            .category
            .clone()
            .unwrap_or_else(|| self.config.fallback_category.clone());
        let sub_category = state
            .sub_category
            .clone()
            .unwrap_or_else(|| self.config.fallback_subcategory.clone());

        let item = BoqItemRow {
            row: r,
            category,
            sub_category,
            description: description.clone(),
            unit,
            rates,
            volume,
            stated_total: number(columns.total_price),
        };

        if let Some(stated) = item.stated_total {
            if (stated - item.amount()).abs() > 0.5 {
                let message = format!(
                    "Row {}: stated total {} differs from derived amount {}",
                    r + 1,
                    stated,
                    item.amount()
                );
                warn!(row = r, "{}", message);
                state.warnings.push(message);
            }
        }

        info!(
            row = r,
            item = %item.description,
            category = %item.category,
            sub_category = %item.sub_category,
            amount = item.amount(),
            "Work item"
        );
        state.items.push(item);
        state.decide(r, RowClass::WorkItem, description)
    }
}

fn unit_of(row: &[Cell], columns: &ColumnMap) -> Option<String> {
    row.get(columns.unit)
        .filter(|cell| !cell.is_blank())
        .map(Cell::display)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn header() -> Vec<Cell> {
        vec![
            t("Description"),
            t("Unit"),
            t("NR Rate"),
            t("R Rate"),
            t("NR Qty"),
            t("R Qty"),
            t("Total Price"),
        ]
    }

    fn item(name: &str, unit: &str, nr: f64, r: f64, nq: f64, rq: f64, total: f64) -> Vec<Cell> {
        vec![t(name), t(unit), n(nr), n(r), n(nq), n(rq), n(total)]
    }

    fn label(name: &str) -> Vec<Cell> {
        vec![t(name)]
    }

    fn columns() -> ColumnMap {
        ColumnMap::detect(&header(), &HeaderAliases::default()).unwrap()
    }

    #[test]
    fn test_column_detection() {
        let columns = columns();
        assert_eq!(columns.description, 0);
        assert_eq!(columns.unit, 1);
        assert_eq!(columns.non_remote_rate, 2);
        assert_eq!(columns.remote_rate, 3);
        assert_eq!(columns.non_remote_qty, 4);
        assert_eq!(columns.remote_qty, 5);
        assert_eq!(columns.total_price, 6);
        assert_eq!(columns.remote_rate_label, "R Rate");
    }

    #[test]
    fn test_column_positional_fallback() {
        let row = vec![t("No"), t("Uraian"), t("Satuan"), t("Harga A"), t("Harga B"), t("Vol A"), t("Vol B"), t("Jumlah Harga")];
        let columns = ColumnMap::detect(&row, &HeaderAliases::default()).unwrap();
        assert_eq!(columns.description, 1);
        assert_eq!(columns.unit, 2);
        assert_eq!(columns.non_remote_rate, 3);
        assert_eq!(columns.remote_qty, 6);
        assert_eq!(columns.total_price, 7);
    }

    #[test]
    fn test_label_before_item_is_subcategory() {
        let config = ImportConfig::default();
        let parser = HierarchyParser::new(&config);
        let columns = columns();
        let r1 = label("Excavation");
        let r2 = item("Excavate trench", "m3", 50_000.0, 60_000.0, 10.0, 5.0, 800_000.0);

        let state = parser.step(HierarchyState::default(), 1, &r1, Some(&r2), &columns);

        assert_eq!(state.decisions[0].class, RowClass::SubCategory);
        assert_eq!(state.sub_category.as_deref(), Some("Excavation"));
        assert_eq!(state.category, None);
    }

    #[test]
    fn test_label_without_following_unit_is_category() {
        let config = ImportConfig::default();
        let parser = HierarchyParser::new(&config);
        let columns = columns();

        let followed_by_label = parser.step(
            HierarchyState::default(),
            1,
            &label("Earthworks"),
            Some(&label("Excavation")),
            &columns,
        );
        assert_eq!(followed_by_label.decisions[0].class, RowClass::Category);

        let last_row = parser.step(HierarchyState::default(), 1, &label("Earthworks"), None, &columns);
        assert_eq!(last_row.decisions[0].class, RowClass::Category);
        assert_eq!(last_row.category.as_deref(), Some("Earthworks"));
    }

    #[test]
    fn test_new_category_clears_subcategory() {
        let config = ImportConfig::default();
        let parser = HierarchyParser::new(&config);
        let state = HierarchyState {
            category: Some("Earthworks".to_string()),
            sub_category: Some("Excavation".to_string()),
            ..Default::default()
        };

        let state = parser.step(state, 5, &label("Concrete"), None, &columns());

        assert_eq!(state.category.as_deref(), Some("Concrete"));
        assert_eq!(state.sub_category, None);
    }

    #[test]
    fn test_item_uses_running_hierarchy_and_derives_amount() {
        let config = ImportConfig::default();
        let parser = HierarchyParser::new(&config);
        let state = HierarchyState {
            category: Some("Earthworks".to_string()),
            sub_category: Some("Excavation".to_string()),
            ..Default::default()
        };
        let row = item("Excavate trench", "m3", 50_000.0, 60_000.0, 10.0, 5.0, 1.0);

        let state = parser.step(state, 3, &row, None, &columns());

        let parsed = &state.items[0];
        assert_eq!(parsed.category, "Earthworks");
        assert_eq!(parsed.sub_category, "Excavation");
        assert_eq!(parsed.unit, "m3");
        assert_eq!(parsed.volume, BoqVolume::new(10.0, 5.0));
        assert_eq!(parsed.amount(), 800_000.0);
        // Stated total disagrees and is reported, not used.
        assert_eq!(parsed.stated_total, Some(1.0));
        assert_eq!(state.warnings.len(), 1);
    }

    #[test]
    fn test_orphan_item_gets_fallback_names() {
        let config = ImportConfig::default();
        let parser = HierarchyParser::new(&config);
        let row = item("Mobilisation", "ls", 1_000.0, 0.0, 1.0, 0.0, 1_000.0);

        let state = parser.step(HierarchyState::default(), 1, &row, None, &columns());

        assert_eq!(state.items[0].category, config.fallback_category);
        assert_eq!(state.items[0].sub_category, config.fallback_subcategory);
    }

    #[test]
    fn test_negative_quantity_is_clamped() {
        let config = ImportConfig::default();
        let parser = HierarchyParser::new(&config);
        let row = item("Backfill", "m3", 100.0, 100.0, -4.0, 2.0, 200.0);

        let state = parser.step(HierarchyState::default(), 1, &row, None, &columns());

        assert_eq!(state.items[0].volume, BoqVolume::new(0.0, 2.0));
        assert_eq!(state.warnings.len(), 1);
    }

    #[test]
    fn test_rows_without_description_are_skipped() {
        let config = ImportConfig::default();
        let parser = HierarchyParser::new(&config);
        let stray = vec![Cell::Empty, Cell::Empty, n(12.0)];

        let state = parser.step(HierarchyState::default(), 7, &stray, None, &columns());
        assert_eq!(state.decisions[0].class, RowClass::Skipped);
        assert_eq!(state.warnings.len(), 1);

        let blank = vec![Cell::Empty; 7];
        let state = parser.step(state, 8, &blank, None, &columns());
        assert_eq!(state.decisions[1].class, RowClass::Skipped);
        assert_eq!(state.warnings.len(), 1);
    }

    #[test]
    fn test_total_row_is_summary() {
        let config = ImportConfig::default();
        let parser = HierarchyParser::new(&config);
        let row = vec![t("Grand Total"), Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty, n(5.0)];

        let state = parser.step(HierarchyState::default(), 9, &row, None, &columns());

        assert_eq!(state.decisions[0].class, RowClass::Summary);
        assert_eq!(state.category, None);
    }

    #[test]
    fn test_parse_full_grid() {
        let config = ImportConfig::default();
        let grid = Grid::from_rows(vec![
            vec![t("No. SPK"), t("SPK-001")],
            vec![t("Pekerjaan galian tanah untuk jaringan pipa distribusi air bersih")],
            header(),
            label("Earthworks"),
            label("Excavation"),
            item("Excavate trench", "m3", 50_000.0, 60_000.0, 10.0, 5.0, 800_000.0),
            item("Dispose spoil", "m3", 10_000.0, 12_000.0, 10.0, 0.0, 100_000.0),
        ]);

        let parsed = HierarchyParser::new(&config).parse(&grid).unwrap();

        assert_eq!(parsed.header_row, 2);
        assert_eq!(
            parsed.work_description,
            "Pekerjaan galian tanah untuk jaringan pipa distribusi air bersih"
        );
        assert_eq!(parsed.count(RowClass::Category), 1);
        assert_eq!(parsed.count(RowClass::SubCategory), 1);
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.computed_total(), 900_000.0);
    }

    #[test]
    fn test_missing_header_is_fatal() {
        let config = ImportConfig::default();
        let grid = Grid::from_rows(vec![vec![t("Description"), t("Unit")], item("x", "m", 1.0, 1.0, 1.0, 1.0, 2.0)]);

        let err = HierarchyParser::new(&config).parse(&grid).unwrap_err();
        assert_eq!(err.error_code(), "IMPORT_FAILED");
    }
}
