use spk_utils::SpkResult;

use crate::store::{collections, DocumentStore};

/// Natural-key unique indexes the resolver and work order insert rely on.
pub const UNIQUE_INDEXES: &[(&str, &[&str])] = &[
    (collections::WORK_ORDERS, &["orderNumber"]),
    (collections::CATEGORIES, &["name"]),
    (collections::SUB_CATEGORIES, &["name", "categoryId"]),
    (collections::UNITS, &["name"]),
    (collections::AREAS, &["name"]),
    (collections::WORK_ITEMS, &["name"]),
];

pub async fn ensure_indexes(store: &dyn DocumentStore) -> SpkResult<()> {
    tracing::info!("Ensuring collection indexes");

    for (collection, keys) in UNIQUE_INDEXES {
        store.ensure_unique_index(collection, keys).await?;
    }
    store.ensure_geo_index(collections::AREAS, "location").await?;

    tracing::info!("Collection indexes ensured");
    Ok(())
}
