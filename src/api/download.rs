//! Media download operation

use super::client::HttpMediaApi;
use super::types::RecordId;
use crate::error::{MediaError, MediaResult};
use bytes::Bytes;
use reqwest::Method;

/// Fetch the binary payload of a media record
pub async fn download_media(api: &HttpMediaApi, id: RecordId) -> MediaResult<Bytes> {
    let request = api.request(Method::GET, &format!("/media/download/{}", id));
    let response = api.send(request, "Download", "Download failed").await?;

    response.bytes().await.map_err(|e| {
        log::warn!("Download: failed to read body for {}: {}", id, e);
        MediaError::transport("Download", None, "Download failed")
    })
}
