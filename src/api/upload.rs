//! Media upload operation (multipart, streamed with progress)

use super::client::HttpMediaApi;
use super::types::{FileRecord, ProgressFn};
use crate::error::{MediaError, MediaResult};
use crate::upload::UploadSource;
use futures_util::TryStreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Upload one file as the multipart field `files`
pub async fn upload_media(
    api: &HttpMediaApi,
    source: &UploadSource,
    progress: ProgressFn,
) -> MediaResult<Vec<FileRecord>> {
    let (stream, total_bytes) = source.open_stream().await?;

    // Report bytes as the body stream hands them to the connection
    let sent_bytes = Arc::new(AtomicU64::new(0));
    let counter = sent_bytes.clone();
    let on_progress = progress.clone();
    let counted = stream.inspect_ok(move |chunk| {
        let sent = counter.fetch_add(chunk.len() as u64, Ordering::SeqCst) + chunk.len() as u64;
        on_progress(sent.min(total_bytes), total_bytes);
    });

    let part = Part::stream_with_length(Body::wrap_stream(counted), total_bytes)
        .file_name(source.name().to_string())
        .mime_str(source.mime_type())
        .map_err(|e| MediaError::Validation(format!("Invalid content type: {}", e)))?;
    let form = Form::new().part("files", part);

    let request = api.request(Method::POST, "/media/upload").multipart(form);
    let response = api.send(request, "Upload", "Upload failed").await?;

    // The created records are informational; an unreadable body is not a failed upload.
    let created = match response.json::<Vec<FileRecord>>().await {
        Ok(records) => records,
        Err(e) => {
            log::debug!("Upload: ignoring unparsable response for {}: {}", source.name(), e);
            Vec::new()
        }
    };

    progress(total_bytes, total_bytes);
    Ok(created)
}
