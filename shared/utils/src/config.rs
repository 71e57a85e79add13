use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub mongodb_url: String,
    pub database_name: String,
    pub connection_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

/// Everything the BOQ heuristics need that varies between document layouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub sheet_name: String,
    /// Logical metadata field -> label aliases, matched case-insensitively
    /// by substring.
    pub labels: BTreeMap<String, Vec<String>>,
    pub header: HeaderAliases,
    /// chrono format strings, tried in order.
    pub date_formats: Vec<String>,
    pub total_keyword: String,
    pub min_description_length: usize,
    pub fallback_category: String,
    pub fallback_subcategory: String,
    /// `[longitude, latitude]` stored for areas with no known position.
    pub placeholder_location: [f64; 2],
    pub budget_tolerance_ratio: f64,
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
}

/// BOQ table column aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderAliases {
    pub description: Vec<String>,
    pub unit: Vec<String>,
    pub total_price: Vec<String>,
    pub non_remote_rate: Vec<String>,
    pub remote_rate: Vec<String>,
    pub non_remote_qty: Vec<String>,
    pub remote_qty: Vec<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    /// Layered load with an explicit file on top of the standard sources.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // Add local config (gitignored)
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("SPK").separator("__"));

        Ok(builder)
    }
}

impl ImportConfig {
    pub fn aliases_for(&self, field: &str) -> &[String] {
        self.labels.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_label_aliases(&self) -> impl Iterator<Item = &String> {
        self.labels.values().flatten()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            mongodb_url: "mongodb://localhost:27017".to_string(),
            database_name: "spk".to_string(),
            connection_timeout_seconds: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "plain".to_string(),
            file_path: None,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for ImportConfig {
    fn default() -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(
            "order_number".to_string(),
            strings(&["no. spk", "nomor spk", "no spk", "order number", "order no"]),
        );
        labels.insert(
            "reference_number".to_string(),
            strings(&["no. referensi", "no. ref", "reference number", "ref no"]),
        );
        labels.insert(
            "title".to_string(),
            strings(&["judul", "nama pekerjaan", "title"]),
        );
        labels.insert(
            "project_name".to_string(),
            strings(&["nama proyek", "project name"]),
        );
        labels.insert(
            "contractor".to_string(),
            strings(&["kontraktor", "pelaksana", "contractor"]),
        );
        labels.insert(
            "location".to_string(),
            strings(&["lokasi", "location"]),
        );
        labels.insert(
            "issue_date".to_string(),
            strings(&["tanggal spk", "tgl spk", "tanggal terbit", "issue date", "date issued"]),
        );
        labels.insert(
            "start_date".to_string(),
            strings(&["tanggal mulai", "tgl mulai", "start date"]),
        );
        labels.insert(
            "end_date".to_string(),
            strings(&["tanggal selesai", "tgl selesai", "end date", "finish date"]),
        );

        Self {
            sheet_name: "BOQ".to_string(),
            labels,
            header: HeaderAliases::default(),
            date_formats: strings(&[
                "%d/%m/%Y",
                "%d-%m-%Y",
                "%d.%m.%Y",
                "%Y-%m-%d",
                "%Y-%m-%dT%H:%M:%S",
                "%d %B %Y",
                "%d %b %Y",
                "%B %d, %Y",
            ]),
            total_keyword: "total".to_string(),
            min_description_length: 30,
            fallback_category: "Uncategorized".to_string(),
            fallback_subcategory: "General".to_string(),
            placeholder_location: [0.0, 0.0],
            budget_tolerance_ratio: 0.01,
            max_file_size: 10 * 1024 * 1024, // 10MB
            allowed_extensions: strings(&["xlsx", "xlsm", "xls", "csv"]),
        }
    }
}

impl Default for HeaderAliases {
    fn default() -> Self {
        Self {
            description: strings(&["description", "uraian", "deskripsi"]),
            unit: strings(&["unit", "satuan", "sat"]),
            total_price: strings(&["total price", "jumlah harga", "total harga"]),
            non_remote_rate: strings(&["nr rate", "non remote rate", "harga satuan nr"]),
            remote_rate: strings(&["r rate", "remote rate", "harga satuan r"]),
            non_remote_qty: strings(&["nr qty", "non remote qty", "volume nr"]),
            remote_qty: strings(&["r qty", "remote qty", "volume r"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_defaults_match_builtin() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let loaded = AppConfig::load_from(&path).unwrap();
        let builtin = ImportConfig::default();

        assert_eq!(loaded.import.labels, builtin.labels);
        assert_eq!(loaded.import.date_formats, builtin.date_formats);
        assert_eq!(loaded.import.header.remote_rate, builtin.header.remote_rate);
        assert_eq!(loaded.import.max_file_size, builtin.max_file_size);
        assert_eq!(loaded.database.database_name, "spk");
    }

    #[test]
    fn test_aliases_for_unknown_field_is_empty() {
        let config = ImportConfig::default();
        assert!(config.aliases_for("nothing").is_empty());
        assert!(config.all_label_aliases().any(|alias| alias == "lokasi"));
    }
}
