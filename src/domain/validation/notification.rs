use super::errors::ValidationResult;
use super::utils::require_non_empty_str;
use crate::domain::value_objects::EntityPayload;

pub fn validate_notification(payload: &EntityPayload) -> ValidationResult<()> {
    require_non_empty_str(payload, "type")?;
    require_non_empty_str(payload, "title")?;
    Ok(())
}
