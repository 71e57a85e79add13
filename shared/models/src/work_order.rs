//! Work order ("SPK") aggregate.
//!
//! A work order is written once per import and is read-only afterwards.
//! Reporting mutates its own activity entities and never touches the line
//! items stored here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::pricing::{BoqVolume, RatePair};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Order number must be between 1 and 100 characters"))]
    pub order_number: String,
    pub reference_number: Option<String>,
    pub title: Option<String>,
    pub project_name: Option<String>,
    pub contractor: Option<String>,
    pub issue_date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(min = 1, message = "Work description must not be empty"))]
    pub work_description: String,
    pub area_id: Option<Uuid>,
    pub budget: f64,
    #[validate]
    pub work_items: Vec<WorkOrderLineItem>,
    pub created_at: DateTime<Utc>,
}

/// Embedded BOQ line. `rates` is a snapshot taken at import time so later
/// catalog rate changes do not alter historical orders.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderLineItem {
    pub work_item_id: Uuid,
    #[validate]
    pub boq_volume: BoqVolume,
    pub rates: RatePair,
    pub amount: f64,
    pub description: String,
}

impl WorkOrderLineItem {
    /// Build a line item; `amount` is always derived from volume and rates.
    pub fn new(
        work_item_id: Uuid,
        boq_volume: BoqVolume,
        rates: RatePair,
        description: impl Into<String>,
    ) -> Self {
        let amount = rates.amount_for(&boq_volume);
        Self {
            work_item_id,
            boq_volume,
            rates,
            amount,
            description: description.into(),
        }
    }
}

impl WorkOrder {
    /// Sum of the line amounts, independent of the stored budget.
    pub fn line_total(&self) -> f64 {
        self.work_items.iter().map(|item| item.amount).sum()
    }

    /// Contract length in days, inclusive of both ends.
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}
