use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Database(String),
    Network(String),
    NotFound(String),
    InvalidInput(String),
    ConfigurationError(String),
    SerializationError(String),
    DeserializationError(String),
}

impl AppError {
    pub fn not_found(table: &str, id: &str) -> Self {
        AppError::NotFound(format!("{table}/{id}"))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            AppError::DeserializationError(err.to_string())
        } else {
            AppError::SerializationError(err.to_string())
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_map_to_not_found() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(AppError::not_found("lots", "abc").to_string(), "Not found: lots/abc");
    }

    #[test]
    fn malformed_json_maps_to_deserialization() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = AppError::from(err);
        assert!(matches!(err, AppError::DeserializationError(_)));
        assert!(err.to_string().starts_with("Deserialization error:"));
    }
}
