//! Work Order Repository
//!
//! Work orders are written once per import. The order number is unique.

use std::sync::Arc;

use mongodb::bson::{self, doc};
use tracing::info;

use spk_models::WorkOrder;
use spk_utils::{SpkError, SpkResult};

use crate::store::{collections, DocumentStore};

pub struct WorkOrderRepository {
    store: Arc<dyn DocumentStore>,
}

impl WorkOrderRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Insert a new work order. An existing order number is a `Conflict`.
    pub async fn create(&self, order: &WorkOrder) -> SpkResult<()> {
        let document = bson::to_document(order)?;

        self.store
            .insert_one(collections::WORK_ORDERS, document)
            .await
            .map_err(|e| match e {
                SpkError::Conflict { .. } => {
                    SpkError::conflict(format!("Work order {} already exists", order.order_number))
                }
                other => other,
            })?;

        info!(order_number = %order.order_number, id = %order.id, "Work order created");
        Ok(())
    }

    /// Find work order by its order number
    pub async fn find_by_order_number(&self, order_number: &str) -> SpkResult<Option<WorkOrder>> {
        self.store
            .find_one(collections::WORK_ORDERS, doc! { "orderNumber": order_number })
            .await?
            .map(bson::from_document)
            .transpose()
            .map_err(SpkError::from)
    }

    pub async fn exists(&self, order_number: &str) -> SpkResult<bool> {
        let count = self
            .store
            .count(collections::WORK_ORDERS, doc! { "orderNumber": order_number })
            .await?;
        Ok(count > 0)
    }
}
