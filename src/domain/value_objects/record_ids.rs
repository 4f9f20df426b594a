use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier assigned on local creation. Never sent to the remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalId(String);

impl LocalId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(value: String) -> Result<Self, String> {
        if value.trim().is_empty() {
            return Err("Local id cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<LocalId> for String {
    fn from(id: LocalId) -> Self {
        id.0
    }
}

/// Identity assigned by the remote once it accepts a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerId(String);

impl ServerId {
    pub fn new(value: String) -> Result<Self, String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("Server id cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Accepts the string or integer identities remotes commonly return.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Self::new(s.clone()).ok(),
            serde_json::Value::Number(n) => Self::new(n.to_string()).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ServerId> for String {
    fn from(id: ServerId) -> Self {
        id.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SyncQueueId(i64);

impl SyncQueueId {
    pub fn new(value: i64) -> Result<Self, String> {
        if value <= 0 {
            return Err("Sync queue id must be positive".to_string());
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SyncQueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SyncQueueId> for i64 {
    fn from(id: SyncQueueId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_id_accepts_numbers_and_strings() {
        assert_eq!(ServerId::from_json(&json!(42)).unwrap().as_str(), "42");
        assert_eq!(ServerId::from_json(&json!(" srv-1 ")).unwrap().as_str(), "srv-1");
        assert!(ServerId::from_json(&json!("")).is_none());
        assert!(ServerId::from_json(&json!(null)).is_none());
    }

    #[test]
    fn queue_id_must_be_positive() {
        assert!(SyncQueueId::new(0).is_err());
        assert_eq!(SyncQueueId::new(7).unwrap().value(), 7);
    }
}
