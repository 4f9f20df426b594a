use serde::{Deserialize, Serialize};
use std::fmt;

pub type ValidationResult<T> = Result<T, PayloadValidationError>;

/// Why a queued payload was refused before dispatch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFailureKind {
    /// A required field is absent or empty.
    MissingField,
    /// A field is present but has the wrong type or range.
    InvalidValue,
    UnknownAgentType,
    /// A completed analysis result does not match its agent's shape.
    ResultShape,
    /// Image body could not be decoded.
    Encoding,
    PayloadTooLarge,
}

impl ValidationFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationFailureKind::MissingField => "missing_field",
            ValidationFailureKind::InvalidValue => "invalid_value",
            ValidationFailureKind::UnknownAgentType => "unknown_agent_type",
            ValidationFailureKind::ResultShape => "result_shape",
            ValidationFailureKind::Encoding => "encoding",
            ValidationFailureKind::PayloadTooLarge => "payload_too_large",
        }
    }
}

impl fmt::Display for ValidationFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayloadValidationError {
    pub kind: ValidationFailureKind,
    pub message: String,
}

impl PayloadValidationError {
    pub fn new(kind: ValidationFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(super) fn missing(field: &str) -> Self {
        Self::new(
            ValidationFailureKind::MissingField,
            format!("{field} is required"),
        )
    }

    pub(super) fn invalid(field: &str, detail: impl fmt::Display) -> Self {
        Self::new(
            ValidationFailureKind::InvalidValue,
            format!("{field} {detail}"),
        )
    }
}

impl fmt::Display for PayloadValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for PayloadValidationError {}
