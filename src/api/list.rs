//! Media list operation

use super::client::HttpMediaApi;
use super::types::FileRecord;
use crate::error::{MediaError, MediaResult};
use reqwest::Method;

/// Fetch the full media collection
pub async fn list_media(api: &HttpMediaApi) -> MediaResult<Vec<FileRecord>> {
    let request = api.request(Method::GET, "/media/list");
    let response = api.send(request, "List", "Failed to fetch files").await?;

    response.json::<Vec<FileRecord>>().await.map_err(|e| {
        log::warn!("List: invalid response body: {}", e);
        MediaError::transport("List", None, "Failed to fetch files")
    })
}
