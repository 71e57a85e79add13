//! Aggregate Assembler
//!
//! Resolves catalog references for parsed BOQ rows and builds the work order
//! aggregate. Line items snapshot the rates read from their own row.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use spk_database::CatalogRepository;
use spk_models::{GeoPoint, WorkOrder, WorkOrderLineItem};
use spk_utils::boq::{BoqDocument, BoqItemRow, RequiredMetadata};
use spk_utils::{ImportConfig, SpkResult};

/// Catalog entities created by one import, per type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCounts {
    pub categories: u32,
    pub sub_categories: u32,
    pub units: u32,
    pub areas: u32,
    pub work_items: u32,
}

impl CreatedCounts {
    pub fn total(&self) -> u32 {
        self.categories + self.sub_categories + self.units + self.areas + self.work_items
    }
}

fn tally(counter: &mut u32, created: bool) {
    if created {
        *counter += 1;
    }
}

pub struct Assembler<'a> {
    catalog: &'a CatalogRepository,
    config: &'a ImportConfig,
    pub created: CreatedCounts,
    pub warnings: Vec<String>,
}

impl<'a> Assembler<'a> {
    pub fn new(catalog: &'a CatalogRepository, config: &'a ImportConfig) -> Self {
        Self {
            catalog,
            config,
            created: CreatedCounts::default(),
            warnings: Vec::new(),
        }
    }

    /// Area by name, created with the placeholder point when new. No
    /// location label means no area.
    pub async fn resolve_area(&mut self, location: Option<&str>) -> SpkResult<Option<Uuid>> {
        let Some(name) = location.map(str::trim).filter(|name| !name.is_empty()) else {
            let message = "No location found; work order has no area".to_string();
            warn!("{}", message);
            self.warnings.push(message);
            return Ok(None);
        };

        let [longitude, latitude] = self.config.placeholder_location;
        let area = self
            .catalog
            .area(name, GeoPoint::new(longitude, latitude))
            .await?;
        if area.created {
            info!(
                area = name,
                longitude = area.entity.location.longitude(),
                latitude = area.entity.location.latitude(),
                "Area created with placeholder location"
            );
        }
        tally(&mut self.created.areas, area.created);
        Ok(Some(area.entity.id))
    }

    /// Resolve the row's category, subcategory, unit and work item, then
    /// snapshot the row as a line item.
    pub async fn resolve_line(&mut self, row: &BoqItemRow) -> SpkResult<WorkOrderLineItem> {
        let category = self.catalog.category(&row.category).await?;
        tally(&mut self.created.categories, category.created);

        let sub_category = self
            .catalog
            .sub_category(&row.sub_category, category.entity.id)
            .await?;
        tally(&mut self.created.sub_categories, sub_category.created);

        let unit = self.catalog.unit(&row.unit).await?;
        tally(&mut self.created.units, unit.created);

        let work_item = self
            .catalog
            .work_item(
                &row.description,
                category.entity.id,
                sub_category.entity.id,
                unit.entity.id,
                row.rates.clone(),
            )
            .await?;
        tally(&mut self.created.work_items, work_item.created);

        if !work_item.created && !work_item.entity.rates.same_amounts(&row.rates) {
            let message = format!(
                "Row {}: rates for '{}' differ from catalog ({} / {} vs {} / {}); using the sheet's rates",
                row.row + 1,
                row.description,
                row.rates.non_remote.amount,
                row.rates.remote.amount,
                work_item.entity.rates.non_remote.amount,
                work_item.entity.rates.remote.amount,
            );
            warn!(row = row.row, "{}", message);
            self.warnings.push(message);
        }

        Ok(WorkOrderLineItem::new(
            work_item.entity.id,
            row.volume,
            row.rates.clone(),
            row.description.clone(),
        ))
    }

    /// The work order as far as the sheet's metadata goes: no area and no
    /// line items yet. Validated before any catalog write.
    pub fn draft(&self, document: &BoqDocument, required: RequiredMetadata) -> WorkOrder {
        let metadata = &document.metadata;
        WorkOrder {
            id: Uuid::new_v4(),
            order_number: required.order_number,
            reference_number: metadata.reference_number.clone(),
            title: metadata.title.clone(),
            project_name: metadata.project_name.clone(),
            contractor: metadata.contractor.clone(),
            issue_date: required.issue_date,
            start_date: required.start_date,
            end_date: required.end_date,
            work_description: document.boq.work_description.clone(),
            area_id: None,
            budget: document.budget.budget,
            work_items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn complete(
        &self,
        mut order: WorkOrder,
        area_id: Option<Uuid>,
        work_items: Vec<WorkOrderLineItem>,
    ) -> WorkOrder {
        order.area_id = area_id;
        order.work_items = work_items;

        info!(
            order_number = %order.order_number,
            line_items = order.work_items.len(),
            budget = order.budget,
            duration_days = order.duration_days(),
            "Work order assembled"
        );
        order
    }
}
