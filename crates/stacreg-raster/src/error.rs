//! Error type for raster operations.

use std::path::PathBuf;
use thiserror::Error;

use stacreg_core::error::ColorMapError;

/// Errors raised while reading, rendering or writing rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    /// An underlying I/O failure.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The originating error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a classic TIFF container.
    #[error("'{path}' is not a TIFF file: {reason}")]
    NotATiff {
        /// The file involved.
        path: PathBuf,
        /// What failed in the header.
        reason: String,
    },

    /// The container is structurally damaged.
    #[error("Corrupt TIFF: {message}")]
    Corrupt {
        /// Description of the inconsistency.
        message: String,
    },

    /// The file uses a TIFF feature the reader does not implement.
    #[error("Unsupported TIFF feature: {feature}")]
    Unsupported {
        /// The unsupported feature (compression, sample layout, ...).
        feature: String,
    },

    /// A tag required for the operation is missing.
    #[error("Missing required TIFF tag: {tag}")]
    MissingTag {
        /// The tag name.
        tag: &'static str,
    },

    /// Color relief rendering failed.
    #[error(transparent)]
    ColorMap(#[from] ColorMapError),
}

impl RasterError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }
}
