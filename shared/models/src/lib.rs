//! # SPK Core Domain Models
//!
//! Domain models for the work-order (SPK) backend. All models implement
//! serialization with serde and validation with the validator crate, and are
//! stored as MongoDB documents keyed by `_id`.
//!
//! ## Key Models
//!
//! - **WorkOrder**: the signed scope of work with its embedded BOQ line items
//! - **WorkItem**: a priced catalog entry referenced by line items
//! - **Category / SubCategory / Unit**: catalog reference data
//! - **Area**: named work location with a GeoJSON point
//!
//! ## Invariants
//!
//! - A line item's `amount` is derived from its own volume and rate snapshot
//! - BOQ volumes are non-negative
//! - Natural keys (order number, names) are non-empty

pub mod area;
pub mod catalog;
pub mod pricing;
pub mod work_item;
pub mod work_order;


pub use area::*;
pub use catalog::*;
pub use pricing::*;
pub use work_item::*;
pub use work_order::*;
