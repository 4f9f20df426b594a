use crate::domain::validation::ImageUpload;
use crate::domain::value_objects::{EntityPayload, ErrorKind, ServerId};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct DispatchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DispatchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Remote view of a record after a create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    pub server_id: ServerId,
    /// Everything except the identity keys.
    pub fields: EntityPayload,
}

impl RemoteRecord {
    /// Reads the identity from `id` or `serverId`.
    pub fn from_response(body: Value) -> Result<Self, DispatchError> {
        let Value::Object(mut map) = body else {
            return Err(DispatchError::new(
                ErrorKind::Unknown,
                "remote response is not a JSON object",
            ));
        };
        let server_id = ["id", "serverId"]
            .iter()
            .find_map(|key| map.get(*key).and_then(ServerId::from_json))
            .ok_or_else(|| {
                DispatchError::new(ErrorKind::Unknown, "remote response carries no identity")
            })?;
        map.remove("id");
        map.remove("serverId");
        Ok(Self {
            server_id,
            fields: EntityPayload::new(Value::Object(map)).map_err(|e| {
                DispatchError::new(ErrorKind::Unknown, e)
            })?,
        })
    }
}

/// Outbound side of the sync pass. `resource` is the table's remote path.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn create(
        &self,
        resource: &str,
        body: &EntityPayload,
    ) -> Result<RemoteRecord, DispatchError>;
    async fn update(
        &self,
        resource: &str,
        server_id: &ServerId,
        body: &EntityPayload,
    ) -> Result<RemoteRecord, DispatchError>;
    async fn delete(&self, resource: &str, server_id: &ServerId) -> Result<(), DispatchError>;
    /// Multipart create: binary `file`, JSON `metadata`, text `status`.
    async fn upload_image(
        &self,
        resource: &str,
        upload: ImageUpload,
        metadata: &EntityPayload,
        status: &str,
    ) -> Result<RemoteRecord, DispatchError>;
}
