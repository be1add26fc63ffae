use std::path::Path;

use image::ImageFormat;
use serde::Serialize;
use strum::Display;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4"];

/// What kind of upload an operator is submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Image => IMAGE_EXTENSIONS,
            Self::Video => VIDEO_EXTENSIONS,
        }
    }
}

/// A file read from disk and checked against the upload allow-list.
///
/// No size limit is enforced here; the backend decides what it accepts.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub kind: MediaKind,
    pub content_type: &'static str,
}

impl UploadFile {
    /// Read `path` and validate it as `kind`.
    pub fn load(path: &Path, kind: MediaKind) -> Result<Self, MediaError> {
        let bytes = std::fs::read(path).map_err(|source| MediaError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Self::from_bytes(file_name, bytes, kind)
    }

    /// Validate in-memory content as `kind`.
    pub fn from_bytes(file_name: String, bytes: Vec<u8>, kind: MediaKind) -> Result<Self, MediaError> {
        let extension = Path::new(&file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if !kind.allowed_extensions().contains(&extension.as_str()) {
            return Err(MediaError::UnsupportedExtension {
                file_name,
                kind,
                allowed: kind.allowed_extensions().join(", "),
            });
        }

        let content_type = match kind {
            MediaKind::Image => match image::guess_format(&bytes) {
                Ok(ImageFormat::Jpeg) => "image/jpeg",
                Ok(ImageFormat::Png) => "image/png",
                _ => return Err(MediaError::ContentMismatch { file_name, kind }),
            },
            MediaKind::Video => {
                if !is_mp4(&bytes) {
                    return Err(MediaError::ContentMismatch { file_name, kind });
                }
                "video/mp4"
            }
        };

        Ok(Self {
            file_name,
            bytes,
            kind,
            content_type,
        })
    }
}

/// ISO base media files open with a box whose type is `ftyp`.
fn is_mp4(bytes: &[u8]) -> bool {
    bytes.get(4..8) == Some(b"ftyp".as_slice())
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file_name}: not an accepted {kind} type (allowed: {allowed})")]
    UnsupportedExtension {
        file_name: String,
        kind: MediaKind,
        allowed: String,
    },

    #[error("{file_name}: content does not look like a supported {kind}")]
    ContentMismatch { file_name: String, kind: MediaKind },
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";
    const MP4_HEAD: &[u8] = b"\0\0\0\x18ftypmp42\0\0\0\0";

    #[test]
    fn test_png_accepted() {
        let f = UploadFile::from_bytes("a.PNG".into(), PNG_MAGIC.to_vec(), MediaKind::Image).unwrap();
        assert_eq!(f.content_type, "image/png");
    }

    #[test]
    fn test_jpeg_accepted_under_either_extension() {
        for name in ["a.jpg", "a.jpeg"] {
            let f = UploadFile::from_bytes(name.into(), JPEG_MAGIC.to_vec(), MediaKind::Image).unwrap();
            assert_eq!(f.content_type, "image/jpeg");
        }
    }

    #[test]
    fn test_extension_outside_allow_list() {
        let err = UploadFile::from_bytes("a.gif".into(), PNG_MAGIC.to_vec(), MediaKind::Image)
            .unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedExtension { .. }));

        let err = UploadFile::from_bytes("clip.mov".into(), MP4_HEAD.to_vec(), MediaKind::Video)
            .unwrap_err();
        assert!(err.to_string().contains("allowed: mp4"));
    }

    #[test]
    fn test_content_sniffed() {
        let err = UploadFile::from_bytes("a.png".into(), b"not an image".to_vec(), MediaKind::Image)
            .unwrap_err();
        assert!(matches!(err, MediaError::ContentMismatch { .. }));

        let err = UploadFile::from_bytes("a.mp4".into(), PNG_MAGIC.to_vec(), MediaKind::Video)
            .unwrap_err();
        assert!(matches!(err, MediaError::ContentMismatch { .. }));
    }

    #[test]
    fn test_mp4_accepted() {
        let f = UploadFile::from_bytes("clip.mp4".into(), MP4_HEAD.to_vec(), MediaKind::Video).unwrap();
        assert_eq!(f.content_type, "video/mp4");
        assert_eq!(f.kind, MediaKind::Video);
    }

    #[test]
    fn test_missing_file() {
        let err = UploadFile::load(Path::new("/nonexistent/x.png"), MediaKind::Image).unwrap_err();
        assert!(matches!(err, MediaError::Read { .. }));
    }
}
