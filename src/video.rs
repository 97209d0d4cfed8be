//! Video input handling
//!
//! A `VideoFile` is what the user picked: a name, a MIME type, a declared size
//! and somewhere to read the bytes from. The bytes are only read once the size
//! check has passed.

use base64::Engine;
use std::path::{Path, PathBuf};

/// Largest accepted upload (50 MiB)
pub(crate) const MAX_VIDEO_BYTES: u64 = 50 * 1024 * 1024;

/// Fixed message shown when an upload exceeds `MAX_VIDEO_BYTES`
pub(crate) const OVERSIZE_MESSAGE: &str =
    "File is too large. Please upload a video smaller than 50MB.";

/// Fallback when the extension is not recognised
const DEFAULT_MIME_TYPE: &str = "video/mp4";

#[derive(Debug)]
enum VideoSource {
    File(PathBuf),
    #[cfg(test)]
    Memory(Vec<u8>),
}

/// A selected video, not yet read
#[derive(Debug)]
pub(crate) struct VideoFile {
    pub(crate) name: String,
    pub(crate) mime_type: String,
    pub(crate) size: u64,
    source: VideoSource,
}

impl VideoFile {
    /// Describe a file on disk without reading it
    pub(crate) async fn open(path: &Path) -> std::io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            mime_type: mime_type_for(path).to_string(),
            size: metadata.len(),
            source: VideoSource::File(path.to_path_buf()),
        })
    }

    /// Wrap bytes that are already in memory
    #[cfg(test)]
    pub(crate) fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            source: VideoSource::Memory(bytes),
        }
    }

    /// A file whose declared size differs from its content, for size checks
    #[cfg(test)]
    pub(crate) fn with_declared_size(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            size,
            source: VideoSource::Memory(Vec::new()),
        }
    }

    pub(crate) fn is_oversize(&self) -> bool {
        self.size > MAX_VIDEO_BYTES
    }

    /// Read the full contents into memory
    pub(crate) async fn read_bytes(self) -> std::io::Result<Vec<u8>> {
        match self.source {
            VideoSource::File(path) => tokio::fs::read(path).await,
            #[cfg(test)]
            VideoSource::Memory(bytes) => Ok(bytes),
        }
    }
}

/// Video bytes encoded for inline transport
#[derive(Debug, Clone)]
pub(crate) struct EncodedVideo {
    pub(crate) mime_type: String,
    /// Standard base64, no data-URI prefix
    pub(crate) data: String,
}

impl EncodedVideo {
    pub(crate) fn encode(bytes: &[u8], mime_type: &str) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Guess the video MIME type from a file extension
pub(crate) fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" | "qt" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "3gp" => "video/3gpp",
        "mpeg" | "mpg" => "video/mpeg",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        _ => DEFAULT_MIME_TYPE,
    }
}
