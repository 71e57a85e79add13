use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::pricing::RatePair;

/// A priced catalog entry. `name` is the natural key; `rates` holds the
/// current canonical rate, which later imports do not overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[validate(length(min = 1, max = 1000, message = "Work item name must be between 1 and 1000 characters"))]
    pub name: String,
    pub category_id: Uuid,
    pub sub_category_id: Uuid,
    pub unit_id: Uuid,
    pub rates: RatePair,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(
        name: impl Into<String>,
        category_id: Uuid,
        sub_category_id: Uuid,
        unit_id: Uuid,
        rates: RatePair,
    ) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            description: name.clone(),
            name,
            category_id,
            sub_category_id,
            unit_id,
            rates,
            created_at: Utc::now(),
        }
    }
}
