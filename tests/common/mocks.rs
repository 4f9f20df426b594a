use async_trait::async_trait;
use fieldsync::application::ports::{DispatchError, RemoteApi, RemoteRecord};
use fieldsync::domain::validation::ImageUpload;
use fieldsync::domain::value_objects::{EntityPayload, ErrorKind, ServerId};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub method: &'static str,
    pub resource: String,
    pub server_id: Option<String>,
    pub body: Value,
}

/// In-memory remote. Identities are `1, 2, 3...` in creation order.
#[derive(Default)]
pub struct MockRemoteApi {
    calls: Mutex<Vec<RemoteCall>>,
    failures: Mutex<HashMap<String, Vec<ErrorKind>>>,
    next_id: Mutex<i64>,
}

impl MockRemoteApi {
    /// The next `times` calls against `resource` fail with `kind`.
    pub fn fail_next(&self, resource: &str, kind: ErrorKind, times: usize) {
        self.failures
            .lock()
            .unwrap()
            .entry(resource.to_string())
            .or_default()
            .extend((0..times).map(|_| kind));
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, resource: &str) -> Vec<RemoteCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.resource == resource)
            .collect()
    }

    fn handle(
        &self,
        method: &'static str,
        resource: &str,
        server_id: Option<&ServerId>,
        body: Value,
    ) -> Result<RemoteRecord, DispatchError> {
        self.calls.lock().unwrap().push(RemoteCall {
            method,
            resource: resource.to_string(),
            server_id: server_id.map(|id| id.to_string()),
            body: body.clone(),
        });

        if let Some(pending) = self.failures.lock().unwrap().get_mut(resource) {
            if !pending.is_empty() {
                let kind = pending.remove(0);
                return Err(DispatchError::new(kind, format!("mock {kind} failure")));
            }
        }

        let identity = match server_id {
            Some(id) => json!(id.as_str()),
            None => {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                json!(*next)
            }
        };
        let mut response = body;
        response["id"] = identity;
        response["syncedBy"] = json!("mock");
        RemoteRecord::from_response(response)
    }
}

#[async_trait]
impl RemoteApi for MockRemoteApi {
    async fn create(
        &self,
        resource: &str,
        body: &EntityPayload,
    ) -> Result<RemoteRecord, DispatchError> {
        self.handle("POST", resource, None, body.to_value())
    }

    async fn update(
        &self,
        resource: &str,
        server_id: &ServerId,
        body: &EntityPayload,
    ) -> Result<RemoteRecord, DispatchError> {
        self.handle("PUT", resource, Some(server_id), body.to_value())
    }

    async fn delete(&self, resource: &str, server_id: &ServerId) -> Result<(), DispatchError> {
        self.handle("DELETE", resource, Some(server_id), json!({}))
            .map(|_| ())
    }

    async fn upload_image(
        &self,
        resource: &str,
        upload: ImageUpload,
        metadata: &EntityPayload,
        status: &str,
    ) -> Result<RemoteRecord, DispatchError> {
        let mut body = metadata.to_value();
        body["size"] = json!(upload.bytes.len());
        body["mimeType"] = json!(upload.mime_type);
        body["status"] = json!(status);
        self.handle("MULTIPART", resource, None, body)
    }
}
