pub mod mongo;
pub mod store;
pub mod memory;
pub mod migrations;
pub mod repositories;

pub use mongo::{create_mongo_client, get_database, health_check as mongo_health_check, MongoClient, MongoDatabase};
pub use store::{collections, is_duplicate_key, DocumentStore, MongoStore};
pub use memory::MemoryStore;
pub use migrations::ensure_indexes;
pub use repositories::*;

use std::sync::Arc;

use spk_utils::{DatabaseConfig, SpkResult};

/// Connect to MongoDB and make sure every index exists.
pub async fn initialize_database(config: &DatabaseConfig) -> SpkResult<Arc<dyn DocumentStore>> {
    let client = create_mongo_client(config).await?;
    let store = MongoStore::new(get_database(&client, &config.database_name));

    // Run migrations
    migrations::ensure_indexes(&store).await?;

    Ok(Arc::new(store))
}
