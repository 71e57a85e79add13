use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum SpkError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Spreadsheet error: {message}")]
    Spreadsheet { message: String },

    #[error("Import failed: {message}")]
    ImportFailed { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SpkError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn spreadsheet(message: impl Into<String>) -> Self {
        Self::Spreadsheet {
            message: message.into(),
        }
    }

    pub fn import_failed(message: impl Into<String>) -> Self {
        Self::ImportFailed {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Spreadsheet { .. } => "SPREADSHEET_ERROR",
            Self::ImportFailed { .. } => "IMPORT_FAILED",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

pub type SpkResult<T> = Result<T, SpkError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<SpkError> for ErrorResponse {
    fn from(error: SpkError) -> Self {
        Self {
            error: error.to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
            details: None,
        }
    }
}

// Conversion from common error types
impl From<mongodb::error::Error> for SpkError {
    fn from(error: mongodb::error::Error) -> Self {
        Self::database(error.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for SpkError {
    fn from(error: mongodb::bson::ser::Error) -> Self {
        Self::internal(format!("BSON serialization failed: {}", error))
    }
}

impl From<mongodb::bson::de::Error> for SpkError {
    fn from(error: mongodb::bson::de::Error) -> Self {
        Self::database(format!("BSON deserialization failed: {}", error))
    }
}

impl From<csv::Error> for SpkError {
    fn from(error: csv::Error) -> Self {
        Self::spreadsheet(error.to_string())
    }
}

impl From<std::io::Error> for SpkError {
    fn from(error: std::io::Error) -> Self {
        Self::spreadsheet(error.to_string())
    }
}

impl From<serde_json::Error> for SpkError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation("JSON", error.to_string())
    }
}

impl From<config::ConfigError> for SpkError {
    fn from(error: config::ConfigError) -> Self {
        Self::configuration(error.to_string())
    }
}
