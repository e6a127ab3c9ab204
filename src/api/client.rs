//! HTTP client for the media backend

use super::types::{FileRecord, MediaApi, ProgressFn, RecordId};
use super::{download, list, objects, upload};
use crate::config::ClientConfig;
use crate::error::{MediaError, MediaResult};
use crate::upload::UploadSource;
use async_trait::async_trait;
use bytes::Bytes;
use log::warn;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct HttpMediaApi {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

impl HttpMediaApi {
    pub fn new(config: &ClientConfig) -> MediaResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .build()
            .map_err(|e| MediaError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        HttpMediaApi {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        }
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and map network errors and non-2xx statuses to `Transport`.
    pub(crate) async fn send(
        &self,
        request: RequestBuilder,
        operation: &'static str,
        fallback: &'static str,
    ) -> MediaResult<Response> {
        let response = request.send().await.map_err(|e| {
            warn!("{}: request failed: {}", operation, e);
            MediaError::transport(operation, None, fallback)
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let detail = extract_detail(&text).unwrap_or_else(|| fallback.to_string());
        warn!("{}: {} - {}", operation, status, text);
        Err(MediaError::transport(operation, Some(status.as_u16()), detail))
    }
}

/// Pull the human-readable `detail` string out of an error body.
pub(crate) fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

#[async_trait]
impl MediaApi for HttpMediaApi {
    async fn list(&self) -> MediaResult<Vec<FileRecord>> {
        list::list_media(self).await
    }

    async fn upload(&self, source: &UploadSource, progress: ProgressFn) -> MediaResult<Vec<FileRecord>> {
        upload::upload_media(self, source, progress).await
    }

    async fn delete(&self, id: RecordId) -> MediaResult<()> {
        objects::delete_media(self, id).await
    }

    async fn rename(&self, id: RecordId, new_name: &str) -> MediaResult<()> {
        objects::rename_media(self, id, new_name).await
    }

    async fn download(&self, id: RecordId) -> MediaResult<Bytes> {
        download::download_media(self, id).await
    }
}
