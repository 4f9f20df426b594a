use crate::application::ports::{DispatchError, RemoteApi, RemoteRecord};
use crate::domain::validation::ImageUpload;
use crate::domain::value_objects::{EntityPayload, ErrorKind, ServerId};
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const MAX_ERROR_BODY_CHARS: usize = 256;

/// JSON-over-HTTP adapter for the field-operations API.
#[derive(Clone)]
pub struct HttpRemoteApi {
    base_url: String,
    api_token: Option<String>,
    client: Client,
}

impl HttpRemoteApi {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let trimmed = config.base_url.trim();
        if trimmed.is_empty() {
            return Err(AppError::ConfigurationError(
                "Remote base_url is empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;

        Ok(Self {
            base_url: trimmed.trim_end_matches('/').to_string(),
            api_token: config
                .api_token
                .clone()
                .filter(|token| !token.trim().is_empty()),
            client,
        })
    }

    fn url(&self, resource: &str, server_id: Option<&ServerId>) -> String {
        let resource = resource.trim_matches('/');
        match server_id {
            Some(id) => format!("{}/{}/{}", self.base_url, resource, id.as_str()),
            None => format!("{}/{}", self.base_url, resource),
        }
    }

    fn request(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_for_record(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<RemoteRecord, DispatchError> {
        let body = send(builder).await?;
        let value: Value = serde_json::from_str(&body).map_err(|err| {
            DispatchError::new(
                ErrorKind::Unknown,
                format!("remote returned malformed JSON: {err}"),
            )
        })?;
        RemoteRecord::from_response(value)
    }
}

/// Maps a transport failure onto the error taxonomy at the point it happens.
fn classify_transport(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        ErrorKind::Timeout
    } else if let Some(status) = err.status() {
        ErrorKind::from_status(status.as_u16())
    } else if err.is_connect() || err.is_request() || err.is_body() {
        ErrorKind::Network
    } else if err.is_decode() {
        ErrorKind::Unknown
    } else {
        ErrorKind::Network
    }
}

fn transport_error(err: reqwest::Error) -> DispatchError {
    DispatchError::new(classify_transport(&err), err.to_string())
}

async fn send(builder: reqwest::RequestBuilder) -> Result<String, DispatchError> {
    let response = builder.send().await.map_err(transport_error)?;
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if status.is_success() {
        return Ok(body);
    }
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> DispatchError {
    let snippet: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    DispatchError::new(
        ErrorKind::from_status(status.as_u16()),
        format!("remote responded {status}: {snippet}"),
    )
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn create(
        &self,
        resource: &str,
        body: &EntityPayload,
    ) -> Result<RemoteRecord, DispatchError> {
        let url = self.url(resource, None);
        debug!(target: "fieldsync::remote", %url, "POST");
        self.send_for_record(self.request(Method::POST, url).json(body.as_map()))
            .await
    }

    async fn update(
        &self,
        resource: &str,
        server_id: &ServerId,
        body: &EntityPayload,
    ) -> Result<RemoteRecord, DispatchError> {
        let url = self.url(resource, Some(server_id));
        debug!(target: "fieldsync::remote", %url, "PUT");
        self.send_for_record(self.request(Method::PUT, url).json(body.as_map()))
            .await
    }

    async fn delete(&self, resource: &str, server_id: &ServerId) -> Result<(), DispatchError> {
        let url = self.url(resource, Some(server_id));
        debug!(target: "fieldsync::remote", %url, "DELETE");
        send(self.request(Method::DELETE, url)).await.map(|_| ())
    }

    async fn upload_image(
        &self,
        resource: &str,
        upload: ImageUpload,
        metadata: &EntityPayload,
        status: &str,
    ) -> Result<RemoteRecord, DispatchError> {
        let file_name = metadata
            .get_str("fileName")
            .unwrap_or("upload")
            .to_string();
        let metadata_json = metadata.to_json_string().map_err(|err| {
            DispatchError::new(ErrorKind::Validation, format!("metadata: {err}"))
        })?;
        let file = Part::bytes(upload.bytes)
            .file_name(file_name)
            .mime_str(&upload.mime_type)
            .map_err(|err| DispatchError::new(ErrorKind::Validation, err.to_string()))?;
        let metadata_part = Part::text(metadata_json)
            .mime_str("application/json")
            .map_err(|err| DispatchError::new(ErrorKind::Validation, err.to_string()))?;
        let form = Form::new()
            .part("file", file)
            .part("metadata", metadata_part)
            .text("status", status.to_string());

        let url = self.url(resource, None);
        debug!(target: "fieldsync::remote", %url, "POST multipart");
        self.send_for_record(self.request(Method::POST, url).multipart(form))
            .await
    }
}
