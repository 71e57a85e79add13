use crate::error::{SpkError, SpkResult};
use chrono::NaiveDate;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

pub fn validate_model<T: Validate>(model: &T) -> SpkResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let error_messages = format_validation_errors(&errors);
            Err(SpkError::validation("model", error_messages))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect_messages("", errors, &mut messages);
    messages.join(", ")
}

fn collect_messages(prefix: &str, errors: &ValidationErrors, messages: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let code: &str = &error.code;
                    let message = match (&error.message, code) {
                        (Some(message), _) => format!("{}: {}", path, message),
                        (None, "length") => format!("Length validation failed for field '{}'", path),
                        (None, "range") => format!("Value out of range for field '{}'", path),
                        (None, "required") => format!("Field '{}' is required", path),
                        (None, code) => format!("Validation failed for field '{}': {}", path, code),
                    };
                    messages.push(message);
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_messages(&path, nested, messages),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_messages(&format!("{}[{}]", path, index), nested, messages);
                }
            }
        }
    }
}

pub fn validate_file_type(file_name: &str, allowed_types: &[String]) -> SpkResult<()> {
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    if !allowed_types.iter().any(|allowed| allowed.eq_ignore_ascii_case(&extension)) {
        return Err(SpkError::validation(
            "file_type",
            format!(
                "File type '{}' not allowed. Allowed types: {}",
                extension,
                allowed_types.join(", ")
            ),
        ));
    }

    Ok(())
}

pub fn validate_file_size(file_size: u64, max_size: u64) -> SpkResult<()> {
    if file_size > max_size {
        return Err(SpkError::validation(
            "file_size",
            format!(
                "File size {} bytes exceeds maximum allowed size {} bytes",
                file_size, max_size
            ),
        ));
    }

    Ok(())
}

pub fn validate_schedule(start_date: NaiveDate, end_date: NaiveDate) -> SpkResult<()> {
    if start_date > end_date {
        return Err(SpkError::validation(
            "end_date",
            format!("End date {} is before start date {}", end_date, start_date),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["xlsx".to_string(), "xls".to_string(), "csv".to_string()]
    }

    #[test]
    fn test_validate_file_type() {
        assert!(validate_file_type("boq.xlsx", &allowed()).is_ok());
        assert!(validate_file_type("BOQ.XLSX", &allowed()).is_ok());
        assert!(validate_file_type("boq.pdf", &allowed()).is_err());
        assert!(validate_file_type("boq", &allowed()).is_err());
    }

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size(10, 10).is_ok());
        assert!(validate_file_size(11, 10).is_err());
    }

    #[test]
    fn test_validate_schedule() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert!(validate_schedule(start, end).is_ok());
        assert!(validate_schedule(start, start).is_ok());
        assert!(validate_schedule(end, start).is_err());
    }

    #[test]
    fn test_nested_validation_messages_include_path() {
        use spk_models::{BoqVolume, Rate, RatePair, WorkOrderLineItem};

        let item = WorkOrderLineItem::new(
            uuid::Uuid::new_v4(),
            BoqVolume::new(-1.0, 0.0),
            RatePair::new(Rate::new(1.0, "NR"), Rate::new(1.0, "R")),
            "bad",
        );
        let err = validate_model(&item).unwrap_err();

        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("boq_volume.non_remote"));
    }
}
