//! Uploaded cover images.
//!
//! Files are written under the media root with a generated name; the stored
//! reference is the path relative to that root, which is also the path under
//! `/media/` the file is served from.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Maximum upload size (5MB)
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Accepted file extensions.
const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Subdirectory of the media root for book covers.
const COVERS_DIR: &str = "books";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("empty file provided")]
    Empty,

    #[error("file too large, maximum size is {max} bytes", max = MAX_IMAGE_SIZE)]
    TooLarge,

    #[error("unsupported file format '{0}', supported: png, jpg, jpeg, gif, webp")]
    UnsupportedFormat(String),

    #[error("file content is not a {0} image")]
    ContentMismatch(String),

    #[error("failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes uploads below a root directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate and store a cover image.
    ///
    /// Returns the stored reference, e.g. `books/3f2a….png`.
    ///
    /// # Errors
    ///
    /// Returns a `MediaError` for an empty, oversized or non-image upload, or
    /// when the file cannot be written.
    pub async fn save_cover(&self, original_name: &str, data: &[u8]) -> Result<String, MediaError> {
        let ext = validate_image(original_name, data)?;

        let dir = self.root.join(COVERS_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let filename = format!("{}.{ext}", Uuid::new_v4());
        tokio::fs::write(dir.join(&filename), data).await?;

        tracing::debug!(file = %filename, size = data.len(), "cover stored");
        Ok(format!("{COVERS_DIR}/{filename}"))
    }
}

/// Check size, extension and leading bytes; returns the normalized extension.
fn validate_image(original_name: &str, data: &[u8]) -> Result<String, MediaError> {
    if data.is_empty() {
        return Err(MediaError::Empty);
    }
    if data.len() > MAX_IMAGE_SIZE {
        return Err(MediaError::TooLarge);
    }

    let ext = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_FORMATS.contains(&ext.as_str()) {
        return Err(MediaError::UnsupportedFormat(ext));
    }

    let matches = match ext.as_str() {
        "png" => data.starts_with(b"\x89PNG\r\n\x1a\n"),
        "jpg" | "jpeg" => data.starts_with(&[0xFF, 0xD8, 0xFF]),
        "gif" => data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a"),
        "webp" => {
            data.get(..4) == Some(b"RIFF".as_slice()) && data.get(8..12) == Some(b"WEBP".as_slice())
        }
        _ => false,
    };
    if !matches {
        return Err(MediaError::ContentMismatch(ext));
    }

    Ok(if ext == "jpeg" { "jpg".to_owned() } else { ext })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_validate_image() {
        assert_eq!(validate_image("cover.PNG", PNG).unwrap(), "png");
        assert_eq!(
            validate_image("cover.jpeg", &[0xFF, 0xD8, 0xFF, 0xE0]).unwrap(),
            "jpg"
        );
        assert!(matches!(validate_image("cover.png", b""), Err(MediaError::Empty)));
        assert!(matches!(
            validate_image("cover.svg", b"<svg/>"),
            Err(MediaError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            validate_image("cover.png", b"not a png"),
            Err(MediaError::ContentMismatch(_))
        ));
        assert!(matches!(
            validate_image("cover.png", &vec![0; MAX_IMAGE_SIZE + 1]),
            Err(MediaError::TooLarge)
        ));
    }

    #[tokio::test]
    async fn test_save_cover_writes_below_root() {
        let root = std::env::temp_dir().join(format!("bookshop-media-{}", Uuid::new_v4()));
        let media = MediaStore::new(&root);

        let reference = media.save_cover("dune.png", PNG).await.unwrap();
        assert!(reference.starts_with("books/"));
        assert!(reference.ends_with(".png"));
        assert_eq!(tokio::fs::read(root.join(&reference)).await.unwrap(), PNG);

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
