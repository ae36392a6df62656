//! Error types for conversion and batch runs.

use std::path::PathBuf;

use crate::modules::formats::TargetFormat;

/// A single file failed to convert.
#[derive(Debug, thiserror::Error)]
#[error("Error converting {}: {source}", path.display())]
pub struct ConversionError {
    pub path: PathBuf,
    #[source]
    pub source: ConversionFailure,
}

impl ConversionError {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<ConversionFailure>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Underlying cause of a [`ConversionError`].
#[derive(Debug, thiserror::Error)]
pub enum ConversionFailure {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("No encoder available for {0}")]
    Unsupported(TargetFormat),

    #[error("Failed to encode {format}: {message}")]
    Encode {
        format: TargetFormat,
        message: String,
    },

    #[error("Failed to copy metadata: {0}")]
    Metadata(#[from] img_parts::Error),

    #[error("Invalid source file name")]
    InvalidFileName,
}

/// The batch cannot start with the current options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Please select a destination folder first")]
    MissingOutputDirectory,

    #[error("Cannot use output directory {}: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A run is already active, so the batch cannot be changed or restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("A conversion is already running")]
pub struct BusyError;

/// Reasons a run is refused before any file is touched.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Busy(#[from] BusyError),
}
