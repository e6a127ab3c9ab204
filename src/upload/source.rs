//! File handles accepted by the upload queue

use crate::error::{MediaError, MediaResult};
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Chunk size used when streaming an in-memory payload
const MEMORY_CHUNK_SIZE: usize = 64 * 1024;

pub(crate) type ByteStream = BoxStream<'static, Result<Bytes, std::io::Error>>;

/// Source bytes of one upload. Cheap to clone; retries reuse the same source.
#[derive(Debug, Clone)]
pub enum UploadSource {
    Memory {
        name: String,
        mime_type: String,
        data: Bytes,
    },
    File {
        path: PathBuf,
        name: String,
        mime_type: String,
    },
}

impl UploadSource {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        UploadSource::Memory {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Local file; the content type is guessed from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MediaError::Validation(format!("Not a file path: {}", path.display())))?
            .to_string();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(UploadSource::File {
            path: path.to_path_buf(),
            name,
            mime_type,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            UploadSource::Memory { name, .. } | UploadSource::File { name, .. } => name,
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            UploadSource::Memory { mime_type, .. } | UploadSource::File { mime_type, .. } => {
                mime_type
            }
        }
    }

    /// Open the payload as a byte stream together with its total length.
    pub(crate) async fn open_stream(&self) -> MediaResult<(ByteStream, u64)> {
        match self {
            UploadSource::Memory { data, .. } => {
                let total = data.len() as u64;
                let data = data.clone();
                let chunks: Vec<Result<Bytes, std::io::Error>> = (0..data.len())
                    .step_by(MEMORY_CHUNK_SIZE)
                    .map(|start| {
                        let end = std::cmp::min(start + MEMORY_CHUNK_SIZE, data.len());
                        Ok(data.slice(start..end))
                    })
                    .collect();
                Ok((stream::iter(chunks).boxed(), total))
            }
            UploadSource::File { path, .. } => {
                let file = File::open(path).await?;
                let total = file.metadata().await?.len();
                Ok((ReaderStream::new(file).boxed(), total))
            }
        }
    }
}
