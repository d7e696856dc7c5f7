/// Saving images to disk
///
/// Downloads are a plain side effect: the bytes are written exactly as
/// held (no re-encoding), so the file extension follows the media type.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::state::data::Image;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {message}")]
    Write { path: String, message: String },
}

/// Write `image` to `path`, returning the path on success
pub async fn save_image(image: Image, path: PathBuf) -> Result<PathBuf, ExportError> {
    tokio::fs::write(&path, image.bytes())
        .await
        .map_err(|e| ExportError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    info!(path = %path.display(), bytes = image.len(), "saved image");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::MediaType;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_save_writes_bytes_verbatim() {
        let image = Image::new(MediaType::png(), vec![0x89u8, b'P', b'N', b'G']).unwrap();
        let path = std::env::temp_dir().join(format!("inkly-export-{}.png", std::process::id()));

        let saved = save_image(image, path.clone()).await.unwrap();
        let written = std::fs::read(&saved).unwrap();
        let _ = std::fs::remove_file(&saved);

        assert_eq!(saved, path);
        assert_eq!(written, vec![0x89u8, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_save_into_missing_directory_fails() {
        let image = Image::new(MediaType::png(), vec![1u8]).unwrap();
        let result = save_image(image, PathBuf::from("/nonexistent/dir/edited.png")).await;
        assert_matches!(result, Err(ExportError::Write { .. }));
    }
}
