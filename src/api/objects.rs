//! Media object operations (delete, rename)

use super::client::HttpMediaApi;
use super::types::RecordId;
use crate::error::MediaResult;
use reqwest::Method;

/// Delete a single media record
pub async fn delete_media(api: &HttpMediaApi, id: RecordId) -> MediaResult<()> {
    let request = api.request(Method::DELETE, &format!("/media/delete/{}", id));
    api.send(request, "Delete", "Delete failed").await?;
    Ok(())
}

/// Rename a media record. The new name travels as a query parameter.
pub async fn rename_media(api: &HttpMediaApi, id: RecordId, new_name: &str) -> MediaResult<()> {
    let path = format!(
        "/media/rename/{}?new_name={}",
        id,
        urlencoding::encode(new_name)
    );
    let request = api.request(Method::PUT, &path);
    api.send(request, "Rename", "Rename failed").await?;
    Ok(())
}
