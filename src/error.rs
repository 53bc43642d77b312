//! Error taxonomy for the watermark pipeline.

use std::path::PathBuf;

/// Enumeration of the errors a render can produce
///
/// Decode, I/O and encode failures are scoped to a single image: in batch
/// mode they are recorded against that item and its siblings keep going.
/// A missing or unusable font aborts the whole call because no text can be
/// laid out without it.
#[derive(Debug, thiserror::Error)]
pub enum WatermarkError {
    /// The source could not be decoded (corrupt, truncated or unsupported)
    #[error("could not decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The requested font family is not available in the font catalog
    #[error("font family '{family}' is not available")]
    MissingFont { family: String },

    /// A font file was found but rusttype could not parse it
    #[error("invalid font data in {}", .path.display())]
    InvalidFont { path: PathBuf },

    /// The rendered raster could not be serialized
    #[error("could not encode output: {0}")]
    Encode(#[source] image::ImageError),

    /// Filesystem read/write failure, including directory creation
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    /// A worker task panicked or was cancelled before reporting
    #[error("render task failed: {0}")]
    Task(String),
}

/// Result type alias using WatermarkError.
pub type Result<T> = std::result::Result<T, WatermarkError>;

impl WatermarkError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn decode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Short machine-friendly label used in batch reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode",
            Self::MissingFont { .. } => "missing-font",
            Self::InvalidFont { .. } => "invalid-font",
            Self::Encode(_) => "encode",
            Self::Io { .. } => "io",
            Self::Config(_) => "config",
            Self::Task(_) => "task",
        }
    }
}
