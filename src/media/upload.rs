/// Upload decoder
///
/// Reads a picked file, sniffs its format from the bytes, and checks it
/// actually decodes before handing it to the editor. The encoded bytes are
/// kept as-is; nothing is re-encoded.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::task;
use tracing::info;

use crate::state::data::{Image, MediaType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("{0} is not a recognized image format")]
    Unrecognized(String),

    #[error("{name} could not be decoded: {message}")]
    Corrupt { name: String, message: String },

    #[error("decode task failed: {0}")]
    Join(String),
}

/// Read and validate an image file
///
/// Decoding is CPU-bound, so it runs on the blocking pool.
pub async fn decode_upload(path: PathBuf) -> Result<Image, UploadError> {
    task::spawn_blocking(move || decode_upload_blocking(&path))
        .await
        .map_err(|e| UploadError::Join(e.to_string()))?
}

fn decode_upload_blocking(path: &Path) -> Result<Image, UploadError> {
    let bytes = std::fs::read(path).map_err(|e| UploadError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let image = decode_bytes(bytes, &name)?;
    info!(file = %name, media_type = %image.media_type(), bytes = image.len(), "decoded upload");
    Ok(image)
}

/// Validate in-memory bytes and tag them with their media type
pub fn decode_bytes(bytes: Vec<u8>, name: &str) -> Result<Image, UploadError> {
    let format =
        image::guess_format(&bytes).map_err(|_| UploadError::Unrecognized(name.to_string()))?;

    // Full decode: catches truncated or corrupt files up front
    image::load_from_memory_with_format(&bytes, format).map_err(|e| UploadError::Corrupt {
        name: name.to_string(),
        message: e.to_string(),
    })?;

    let media_type = MediaType::parse(format.to_mime_type())
        .map_err(|_| UploadError::Unrecognized(name.to_string()))?;

    Image::new(media_type, bytes).map_err(|e| UploadError::Corrupt {
        name: name.to_string(),
        message: e.to_string(),
    })
}
