pub mod config;
pub mod logging;
pub mod error;
pub mod validation;
pub mod boq;

pub use config::*;
pub use logging::*;
pub use error::*;
pub use validation::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.database.database_name, "spk");
        assert_eq!(config.import.sheet_name, "BOQ");
        assert_eq!(config.import.total_keyword, "total");
        assert!(!config.import.aliases_for("order_number").is_empty());
    }

    #[test]
    fn test_error_handling() {
        let error = SpkError::validation("test_field", "test message");
        assert_eq!(error.error_code(), "VALIDATION_ERROR");
        assert!(!error.is_conflict());

        let response = ErrorResponse::from(SpkError::conflict("SPK-1 exists"));
        assert_eq!(response.code, "CONFLICT");
    }
}
