use super::errors::{PayloadValidationError, ValidationResult};
use crate::domain::value_objects::EntityPayload;
use serde_json::Value;

pub(super) fn require_non_empty_str<'a>(
    payload: &'a EntityPayload,
    field: &str,
) -> ValidationResult<&'a str> {
    match payload.get(field) {
        None | Some(Value::Null) => Err(PayloadValidationError::missing(field)),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(PayloadValidationError::missing(field))
        }
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(PayloadValidationError::invalid(field, "must be a string")),
    }
}

pub(super) fn number_in_range(
    value: &Value,
    field: &str,
    min: f64,
    max: f64,
) -> ValidationResult<f64> {
    let number = value
        .as_f64()
        .ok_or_else(|| PayloadValidationError::invalid(field, "must be a number"))?;
    if !(min..=max).contains(&number) {
        return Err(PayloadValidationError::invalid(
            field,
            format_args!("must be within [{min}, {max}] (got {number})"),
        ));
    }
    Ok(number)
}
