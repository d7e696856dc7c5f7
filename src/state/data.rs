/// Shared data structures for the editor state
///
/// These types flow between the remote service, the upload codec,
/// the edit history and the UI layer.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

/// Source of unique image ids (used to key decoded preview handles)
static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Errors raised when an image payload can't be split into (media type, bytes)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("not an image media type: {0:?}")]
    NotAnImage(String),

    #[error("image payload is empty")]
    Empty,

    #[error("invalid base64 image data: {0}")]
    Base64(String),
}

/// A validated `image/*` media type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType(String);

impl MediaType {
    /// Parse a media type such as `image/png`.
    /// Parameters (`; charset=...`) are dropped and the result is lowercased.
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let essence = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.strip_prefix("image/") {
            Some(subtype) if !subtype.is_empty() => Ok(Self(essence)),
            _ => Err(FormatError::NotAnImage(raw.to_string())),
        }
    }

    /// `image/png`, what the model returns when it doesn't say otherwise
    pub fn png() -> Self {
        Self("image/png".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File extension used when saving an image of this type
    pub fn extension(&self) -> &str {
        match self.0.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/svg+xml" => "svg",
            "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
            other => other.trim_start_matches("image/"),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable raster image: media type plus encoded bytes
///
/// Cloning is cheap (the byte buffer is shared). Two images compare
/// equal when media type and bytes match; the id only identifies
/// a particular upload/result for preview caching.
#[derive(Clone)]
pub struct Image {
    id: u64,
    media_type: MediaType,
    bytes: Arc<[u8]>,
}

impl Image {
    /// Wrap encoded image bytes. Empty payloads are rejected.
    pub fn new(media_type: MediaType, bytes: impl Into<Arc<[u8]>>) -> Result<Self, FormatError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(FormatError::Empty);
        }

        Ok(Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            media_type,
            bytes,
        })
    }

    /// Decode a base64 payload as it appears on the wire
    pub fn from_base64(media_type: &str, data: &str) -> Result<Self, FormatError> {
        let media_type = MediaType::parse(media_type)?;
        let bytes = BASE64
            .decode(data.trim())
            .map_err(|e| FormatError::Base64(e.to_string()))?;
        Self::new(media_type, bytes)
    }

    /// Encode the bytes for the wire (the inverse of [`Image::from_base64`])
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.media_type == other.media_type && self.bytes == other.bytes
    }
}

impl Eq for Image {}

// Keep logs readable: never dump the payload
impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("media_type", &self.media_type.as_str())
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Top-level editor mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditingMode {
    /// Upload an image and transform it with prompts
    #[default]
    Edit,
    /// Produce a fresh image from text alone
    Generate,
}

/// Which image feeds the next edit-producing action (edit mode only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    /// Always start from the uploaded image
    #[default]
    Original,
    /// Start from the revision under the history cursor
    Latest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_parse() {
        assert_eq!(MediaType::parse("image/PNG").unwrap().as_str(), "image/png");
        assert_eq!(
            MediaType::parse("image/jpeg; q=0.9").unwrap().as_str(),
            "image/jpeg"
        );
        assert!(matches!(
            MediaType::parse("text/plain"),
            Err(FormatError::NotAnImage(_))
        ));
        assert!(MediaType::parse("image/").is_err());
    }

    #[test]
    fn test_extension() {
        assert_eq!(MediaType::parse("image/jpeg").unwrap().extension(), "jpg");
        assert_eq!(MediaType::png().extension(), "png");
        assert_eq!(MediaType::parse("image/webp").unwrap().extension(), "webp");
    }

    #[test]
    fn test_base64_payload() {
        let image = Image::from_base64("image/png", "AQID").unwrap();
        assert_eq!(image.bytes(), &[1, 2, 3]);
        assert_eq!(image.to_base64(), "AQID");

        assert!(matches!(
            Image::from_base64("image/png", "not base64!"),
            Err(FormatError::Base64(_))
        ));
        assert_eq!(Image::from_base64("image/png", ""), Err(FormatError::Empty));
    }

    #[test]
    fn test_equality_ignores_id() {
        let a = Image::new(MediaType::png(), vec![9u8, 9]).unwrap();
        let b = Image::new(MediaType::png(), vec![9u8, 9]).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a, b);
    }
}
