//! BOQ document reader: the pure stages of the import, from grid to parsed
//! metadata, hierarchy and budget. Nothing here touches the store.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::budget::{BudgetAggregator, BudgetSummary};
use super::dates::DateNormalizer;
use super::grid::Grid;
use super::hierarchy::{HierarchyParser, ParsedBoq};
use super::labels::LabelExtractor;
use crate::config::ImportConfig;
use crate::error::{SpkError, SpkResult};

/// Scalar metadata found by label matching. Every field is optional here;
/// [`WorkOrderMetadata::require`] decides what is fatal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkOrderMetadata {
    pub order_number: Option<String>,
    pub reference_number: Option<String>,
    pub title: Option<String>,
    pub project_name: Option<String>,
    pub contractor: Option<String>,
    pub location: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Date fields whose label was found but whose value did not parse,
    /// as `(field, raw value)`.
    pub unparsed_dates: Vec<(String, String)>,
}

/// The metadata a work order cannot be created without.
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredMetadata {
    pub order_number: String,
    pub issue_date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl WorkOrderMetadata {
    /// Label lookup over the whole grid. Hits from `body_start` on (the BOQ
    /// table) are only used when nothing above it matches.
    pub fn extract(grid: &Grid, config: &ImportConfig, body_start: Option<usize>) -> Self {
        let labels = match body_start {
            Some(row) => LabelExtractor::new(config).with_body_start(row),
            None => LabelExtractor::new(config),
        };
        let dates = DateNormalizer::new(config.date_formats.clone());
        let mut unparsed_dates = Vec::new();

        let mut date = |field: &str| {
            let cell = labels.extract(grid, field)?;
            let parsed = dates.normalize_cell(&cell);
            if parsed.is_none() {
                warn!(field, value = %cell.display(), "Unparseable date");
                unparsed_dates.push((field.to_string(), cell.display()));
            }
            parsed
        };
        let issue_date = date("issue_date");
        let start_date = date("start_date");
        let end_date = date("end_date");

        let metadata = Self {
            order_number: labels.extract_text(grid, "order_number"),
            reference_number: labels.extract_text(grid, "reference_number"),
            title: labels.extract_text(grid, "title"),
            project_name: labels.extract_text(grid, "project_name"),
            contractor: labels.extract_text(grid, "contractor"),
            location: labels.extract_text(grid, "location"),
            issue_date,
            start_date,
            end_date,
            unparsed_dates,
        };

        info!(
            order_number = ?metadata.order_number,
            issue_date = ?metadata.issue_date,
            start_date = ?metadata.start_date,
            end_date = ?metadata.end_date,
            "Extracted work order metadata"
        );
        metadata
    }

    /// Fails on the first missing order number or date.
    pub fn require(&self) -> SpkResult<RequiredMetadata> {
        let order_number = self
            .order_number
            .clone()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| SpkError::import_failed("Order number not found"))?;

        let date = |field: &str, value: Option<NaiveDate>| {
            value.ok_or_else(|| {
                let detail = self
                    .unparsed_dates
                    .iter()
                    .find(|(name, _)| name == field)
                    .map(|(_, raw)| format!("unrecognized value '{}'", raw))
                    .unwrap_or_else(|| "not found".to_string());
                SpkError::import_failed(format!("{}: {}", field, detail))
            })
        };

        Ok(RequiredMetadata {
            order_number,
            issue_date: date("issue_date", self.issue_date)?,
            start_date: date("start_date", self.start_date)?,
            end_date: date("end_date", self.end_date)?,
        })
    }
}

/// Everything read from one worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct BoqDocument {
    pub metadata: WorkOrderMetadata,
    pub boq: ParsedBoq,
    pub budget: BudgetSummary,
}

impl BoqDocument {
    /// Runs label extraction, hierarchy parsing and budget aggregation.
    /// Only a missing table header fails here.
    pub fn read(grid: &Grid, config: &ImportConfig) -> SpkResult<Self> {
        let boq = HierarchyParser::new(config).parse(grid)?;
        let metadata = WorkOrderMetadata::extract(grid, config, Some(boq.header_row + 1));

        let aggregator = BudgetAggregator::new(config.total_keyword.clone(), config.budget_tolerance_ratio);
        let explicit = aggregator.find_explicit_total(grid, boq.header_row, &boq.columns);
        let budget = aggregator.aggregate(&boq.items, explicit);

        Ok(Self { metadata, boq, budget })
    }

    /// Row-level and budget warnings in document order.
    pub fn warnings(&self) -> Vec<String> {
        self.boq
            .warnings
            .iter()
            .cloned()
            .chain(self.budget.warning.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boq::grid::Cell;
    use crate::boq::hierarchy::RowClass;

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    fn n(v: f64) -> Cell {
        Cell::Number(v)
    }

    fn sheet() -> Vec<Vec<Cell>> {
        vec![
            vec![t("No. SPK"), t(":"), t("SPK/2024/001")],
            vec![t("Judul"), t(":"), t("Galian pipa distribusi")],
            vec![t("Lokasi"), t(":"), t("Cikarang")],
            vec![t("Tanggal SPK"), t(":"), Cell::DateSerial(45292.0)],
            vec![t("Tanggal Mulai"), t(":"), t("15/01/2024")],
            vec![t("Tanggal Selesai"), t(":"), t("31 Maret 2024")],
            vec![t("Pekerjaan galian tanah untuk jaringan pipa distribusi air bersih")],
            vec![t("Description"), t("Unit"), t("NR Rate"), t("R Rate"), t("NR Qty"), t("R Qty"), t("Total Price")],
            vec![t("Earthworks")],
            vec![t("Excavation")],
            vec![t("Excavate trench"), t("m3"), n(50_000.0), n(60_000.0), n(10.0), n(5.0), n(800_000.0)],
        ]
    }

    #[test]
    fn test_read_document() {
        let config = ImportConfig::default();
        let doc = BoqDocument::read(&Grid::from_rows(sheet()), &config).unwrap();

        let required = doc.metadata.require().unwrap();
        assert_eq!(required.order_number, "SPK/2024/001");
        assert_eq!(required.issue_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(required.start_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(required.end_date, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(doc.metadata.title.as_deref(), Some("Galian pipa distribusi"));
        assert_eq!(doc.metadata.location.as_deref(), Some("Cikarang"));

        assert_eq!(doc.boq.count(RowClass::Category), 1);
        assert_eq!(doc.boq.items.len(), 1);
        assert_eq!(doc.budget.budget, 800_000.0);
        assert!(doc.warnings().is_empty());
    }

    #[test]
    fn test_unparseable_date_is_reported() {
        let mut rows = sheet();
        rows[5][2] = t("akhir bulan");
        let config = ImportConfig::default();
        let doc = BoqDocument::read(&Grid::from_rows(rows), &config).unwrap();

        assert_eq!(doc.metadata.end_date, None);
        let err = doc.metadata.require().unwrap_err();
        assert!(err.to_string().contains("akhir bulan"));
    }

    #[test]
    fn test_missing_order_number_is_fatal() {
        let metadata = WorkOrderMetadata {
            issue_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        };

        assert_eq!(metadata.require().unwrap_err().error_code(), "IMPORT_FAILED");
    }
}
