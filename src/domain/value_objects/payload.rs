use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Domain fields of a record. Always a JSON object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EntityPayload(Map<String, Value>);

impl EntityPayload {
    pub fn new(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err("Entity payload cannot be null".to_string()),
            _ => Err("Entity payload must be a JSON object".to_string()),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Shallow merge; `null` in the patch removes the key.
    pub fn merge(&mut self, patch: &EntityPayload) {
        for (key, value) in &patch.0 {
            if value.is_null() {
                self.0.remove(key);
            } else {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

impl From<EntityPayload> for Value {
    fn from(payload: EntityPayload) -> Self {
        payload.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::EntityPayload;
    use serde_json::json;

    #[test]
    fn rejects_non_objects() {
        assert!(EntityPayload::new(json!([1, 2])).is_err());
        assert!(EntityPayload::new(json!(null)).is_err());
        assert!(EntityPayload::from_json_str("{oops").is_err());
    }

    #[test]
    fn merge_overwrites_and_removes() {
        let mut base = EntityPayload::new(json!({"name": "Lote A", "area": 3, "crop": "maize"}))
            .unwrap();
        let patch = EntityPayload::new(json!({"area": 4, "crop": null})).unwrap();

        base.merge(&patch);

        assert_eq!(base.to_value(), json!({"name": "Lote A", "area": 4}));
    }
}
