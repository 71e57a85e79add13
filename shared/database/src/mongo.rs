use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};

use spk_utils::{DatabaseConfig, SpkResult};

pub type MongoClient = Client;
pub type MongoDatabase = Database;

pub async fn create_mongo_client(config: &DatabaseConfig) -> SpkResult<MongoClient> {
    let mut options = ClientOptions::parse(&config.mongodb_url).await?;
    let timeout = Duration::from_secs(config.connection_timeout_seconds);
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);
    options.app_name = Some("spk-import".to_string());

    let client = Client::with_options(options)?;

    // Test connection
    health_check(&client).await?;

    tracing::info!(database = %config.database_name, "Connected to MongoDB database");
    Ok(client)
}

pub fn get_database(client: &MongoClient, database_name: &str) -> MongoDatabase {
    client.database(database_name)
}

pub async fn health_check(client: &MongoClient) -> SpkResult<()> {
    client
        .database("admin")
        .run_command(doc! {"ping": 1}, None)
        .await?;
    Ok(())
}
