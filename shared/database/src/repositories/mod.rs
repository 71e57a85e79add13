//! Repository module for database access
//!
//! Typed repositories over the [`DocumentStore`](crate::store::DocumentStore) seam.

pub mod catalog;
pub mod work_order;

pub use catalog::{CatalogEntity, CatalogRepository, Resolved};
pub use work_order::WorkOrderRepository;
