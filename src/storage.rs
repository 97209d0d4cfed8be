//! Local storage for generated thumbnails
//!
//! Decodes thumbnail data URIs and writes them as PNG files to the
//! configured output directory, or Pictures/Viralyze by default.

use crate::gateway::AspectRatio;
use base64::Engine;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of every thumbnail data URI
const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Resolve the thumbnail directory.
///
/// Returns the configured location if set, otherwise the default one.
pub(crate) fn thumbnails_dir(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(custom) = configured {
        return Some(custom.to_path_buf());
    }
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .map(|d| d.join("Viralyze"))
}

/// Decode a `data:image/png;base64,...` URI into raw PNG bytes
pub(crate) fn decode_data_uri(data_uri: &str) -> Result<Vec<u8>, StorageError> {
    let payload = data_uri
        .strip_prefix(PNG_DATA_URI_PREFIX)
        .ok_or(StorageError::NotPngDataUri)?;
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

/// Save a thumbnail, returning the path to the written file
pub(crate) fn save_thumbnail(
    data_uri: &str,
    dir: &Path,
    stem: &str,
    aspect_ratio: AspectRatio,
) -> Result<PathBuf, StorageError> {
    let bytes = decode_data_uri(data_uri)?;

    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| StorageError::CreateDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;
        info!("Created thumbnails directory: {:?}", dir);
    }

    let timestamp = Local::now().format("%Y-%m-%d-%H-%M-%S");
    let ratio = aspect_ratio.as_str().replace(':', "x");
    let filepath = dir.join(format!(
        "{}-thumbnail-{}-{}.png",
        sanitize_stem(stem),
        ratio,
        timestamp
    ));

    fs::write(&filepath, bytes).map_err(|e| StorageError::WriteFile {
        path: filepath.clone(),
        source: e,
    })?;

    info!("Saved thumbnail to: {:?}", filepath);
    Ok(filepath)
}

/// Keep file stems to a safe character set
fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Storage errors with contextual information
#[derive(Debug, thiserror::Error)]
pub(crate) enum StorageError {
    #[error("Thumbnail is not a PNG data URI")]
    NotPngDataUri,

    #[error("Thumbnail payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_uri() {
        assert_eq!(
            decode_data_uri("data:image/png;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert!(matches!(
            decode_data_uri("data:image/jpeg;base64,aGVsbG8="),
            Err(StorageError::NotPngDataUri)
        ));
        assert!(matches!(
            decode_data_uri("data:image/png;base64,@@@"),
            Err(StorageError::Decode(_))
        ));
    }

    #[test]
    fn test_configured_dir_wins() {
        let dir = thumbnails_dir(Some(Path::new("/tmp/thumbs")));
        assert_eq!(dir, Some(PathBuf::from("/tmp/thumbs")));
    }

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("my clip (final)"), "my-clip--final");
        assert_eq!(sanitize_stem("***"), "video");
        assert_eq!(sanitize_stem("ok_name-1"), "ok_name-1");
    }

    #[test]
    fn test_save_thumbnail_writes_png_bytes() {
        let dir = std::env::temp_dir().join(format!("viralyze-thumbs-{}", std::process::id()));
        let path = save_thumbnail(
            "data:image/png;base64,aGVsbG8=",
            &dir,
            "tiny house",
            AspectRatio::Landscape16x9,
        )
        .unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("tiny-house-thumbnail-16x9-"));
        assert!(name.ends_with(".png"));
        assert_eq!(fs::read(&path).unwrap(), b"hello");

        let _ = fs::remove_dir_all(&dir);
    }
}
