//! Reference catalog entities: categories, subcategories and units.
//!
//! These are created lazily the first time an import references them and are
//! never rewritten by the importer afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Top level of the BOQ hierarchy (e.g. "Earthworks").
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[validate(length(min = 1, max = 500, message = "Category name must be between 1 and 500 characters"))]
    pub name: String,
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            code: None,
            created_at: Utc::now(),
        }
    }
}

/// Second level of the BOQ hierarchy, scoped to one category.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[validate(length(min = 1, max = 500, message = "Subcategory name must be between 1 and 500 characters"))]
    pub name: String,
    pub category_id: Uuid,
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SubCategory {
    pub fn new(name: impl Into<String>, category_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category_id,
            code: None,
            created_at: Utc::now(),
        }
    }
}

/// Unit of measure (m3, ls, unit, ...).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[validate(length(min = 1, max = 50, message = "Unit name must be between 1 and 50 characters"))]
    pub name: String,
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            code: None,
            created_at: Utc::now(),
        }
    }
}
