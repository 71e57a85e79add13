//! BOQ Importer
//!
//! Orchestrates one import: load the worksheet, read it, check every fatal
//! precondition, then resolve the catalog and persist the work order. No
//! catalog entity is written unless all preconditions hold.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use spk_database::{CatalogRepository, DocumentStore, WorkOrderRepository};
use spk_models::WorkOrder;
use spk_utils::boq::{BoqDocument, Grid, GridLoader, RowClass};
use spk_utils::{validate_model, validate_schedule, ErrorResponse, ImportConfig, SpkError, SpkResult};

use crate::assembler::{Assembler, CreatedCounts};

/// A successful import.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub work_order: WorkOrder,
    pub created: CreatedCounts,
    pub warnings: Vec<String>,
    pub categories: usize,
    pub sub_categories: usize,
    pub skipped_rows: usize,
}

/// Structured result of an import, as printed by `spk-import --json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub filename: String,
    pub success: bool,
    pub order_number: Option<String>,
    pub work_order_id: Option<Uuid>,
    pub budget: Option<f64>,
    pub line_items: usize,
    pub categories: usize,
    pub sub_categories: usize,
    pub skipped_rows: usize,
    pub created: CreatedCounts,
    pub warnings: Vec<String>,
    pub error: Option<ErrorResponse>,
}

impl ImportOutcome {
    pub fn from_result(filename: impl Into<String>, result: SpkResult<ImportReport>) -> Self {
        let filename = filename.into();
        match result {
            Ok(report) => Self {
                filename,
                success: true,
                order_number: Some(report.work_order.order_number.clone()),
                work_order_id: Some(report.work_order.id),
                budget: Some(report.work_order.budget),
                line_items: report.work_order.work_items.len(),
                categories: report.categories,
                sub_categories: report.sub_categories,
                skipped_rows: report.skipped_rows,
                created: report.created,
                warnings: report.warnings,
                error: None,
            },
            Err(e) => Self {
                filename,
                success: false,
                order_number: None,
                work_order_id: None,
                budget: None,
                line_items: 0,
                categories: 0,
                sub_categories: 0,
                skipped_rows: 0,
                created: CreatedCounts::default(),
                warnings: Vec::new(),
                error: Some(e.into()),
            },
        }
    }
}

pub struct BoqImporter {
    config: ImportConfig,
    catalog: CatalogRepository,
    work_orders: WorkOrderRepository,
}

impl BoqImporter {
    pub fn new(store: Arc<dyn DocumentStore>, config: ImportConfig) -> Self {
        Self {
            config,
            catalog: CatalogRepository::new(store.clone()),
            work_orders: WorkOrderRepository::new(store),
        }
    }

    pub async fn import_path(&self, path: &Path) -> ImportOutcome {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let result = match GridLoader::new(&self.config).load_path(path) {
            Ok(grid) => self.import_grid(&grid).await,
            Err(e) => Err(e),
        };
        Self::finish(filename, result)
    }

    pub async fn import_bytes(&self, filename: &str, data: &[u8]) -> ImportOutcome {
        let result = match GridLoader::new(&self.config).load_bytes(filename, data) {
            Ok(grid) => self.import_grid(&grid).await,
            Err(e) => Err(e),
        };
        Self::finish(filename.to_string(), result)
    }

    fn finish(filename: String, result: SpkResult<ImportReport>) -> ImportOutcome {
        match &result {
            Ok(report) => info!(
                filename = %filename,
                order_number = %report.work_order.order_number,
                budget = report.work_order.budget,
                line_items = report.work_order.work_items.len(),
                warnings = report.warnings.len(),
                "Import succeeded"
            ),
            Err(e) => error!(filename = %filename, code = e.error_code(), "Import failed: {}", e),
        }
        ImportOutcome::from_result(filename, result)
    }

    /// Run the pipeline over an already loaded grid.
    pub async fn import_grid(&self, grid: &Grid) -> SpkResult<ImportReport> {
        let document = BoqDocument::read(grid, &self.config)?;

        if document.boq.work_description.trim().is_empty() {
            return Err(SpkError::import_failed("Work description not found above the BOQ table"));
        }
        let required = document.metadata.require()?;
        if self.work_orders.exists(&required.order_number).await? {
            return Err(SpkError::conflict(format!(
                "Work order {} already exists",
                required.order_number
            )));
        }

        let mut warnings = document.warnings();
        if let Err(e) = validate_schedule(required.start_date, required.end_date) {
            warn!(order_number = %required.order_number, "{}", e);
            warnings.push(e.to_string());
        }
        if document.boq.items.is_empty() {
            let message = "BOQ table has no work items".to_string();
            warn!("{}", message);
            warnings.push(message);
        }

        let mut assembler = Assembler::new(&self.catalog, &self.config);
        let draft = assembler.draft(&document, required);
        validate_model(&draft)?;

        let area_id = assembler.resolve_area(document.metadata.location.as_deref()).await?;

        let mut lines = Vec::with_capacity(document.boq.items.len());
        for item in &document.boq.items {
            lines.push(assembler.resolve_line(item).await?);
        }

        let work_order = assembler.complete(draft, area_id, lines);
        validate_model(&work_order)?;
        self.work_orders.create(&work_order).await?;

        warnings.append(&mut assembler.warnings);
        Ok(ImportReport {
            created: assembler.created,
            warnings,
            categories: document.boq.count(RowClass::Category),
            sub_categories: document.boq.count(RowClass::SubCategory),
            skipped_rows: document.boq.count(RowClass::Skipped),
            work_order,
        })
    }
}
