//! Custom error types for `stacreg` operations.
//!
//! This module provides structured error handling using `thiserror`, replacing
//! generic `anyhow::Error` with domain-specific error types that preserve
//! context and enable better error messages and recovery strategies.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for `stacreg` operations.
///
/// This is the root error type that encompasses all domain-specific errors.
/// It uses `#[error(transparent)]` to delegate display formatting to the
/// underlying error variants.
#[derive(Debug, Error)]
pub enum StacRegError {
    /// Color map parsing and rendering errors
    #[error(transparent)]
    ColorMap(#[from] ColorMapError),

    /// Format registry errors (unknown format, unsupported operations)
    #[error(transparent)]
    Format(#[from] FormatError),

    /// STAC record construction and validation errors
    #[error(transparent)]
    Stac(#[from] StacError),

    /// I/O errors (file read/write, path issues, permissions)
    #[error(transparent)]
    Io(#[from] IoError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic errors from dependencies
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Color map parsing, conversion and rendering errors.
#[derive(Debug, Error)]
pub enum ColorMapError {
    /// A line or element of a style file could not be parsed
    #[error("Failed to parse {format} color map{}: {message}", line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Parse {
        /// The style format being parsed (e.g. "CPT", "SLD")
        format: String,
        /// The line number where parsing failed (if available)
        line: Option<usize>,
        /// Description of the parse error
        message: String,
    },

    /// A color value was malformed
    #[error("Invalid color '{value}': {reason}")]
    InvalidColor {
        /// The offending color token
        value: String,
        /// Why the color is invalid
        reason: String,
    },

    /// A named color is not in the known color table
    #[error("Unknown color name '{name}'")]
    UnknownColorName {
        /// The unresolved color name
        name: String,
    },

    /// The color map has no usable entries
    #[error("Color map has no entries with values")]
    Empty,
}

/// Format registry errors.
///
/// These errors occur when looking up style formats or registration targets,
/// such as when a format is unknown or does not support an operation.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Format was not found in the registry
    #[error("Format '{name}' not found. Available formats: {available}")]
    NotFound {
        /// The requested format name
        name: String,
        /// Comma-separated list of available formats
        available: String,
    },

    /// Format does not support the requested operation
    #[error("Format '{format}' does not support {operation}")]
    OperationNotSupported {
        /// The format name
        format: String,
        /// The operation that's not supported (e.g. "reading", "writing")
        operation: String,
    },

    /// No format could be inferred from a file path
    #[error("Cannot infer a format from '{path}'")]
    UnknownExtension {
        /// The path with an unrecognized extension
        path: PathBuf,
    },
}

/// STAC record construction and validation errors.
#[derive(Debug, Error)]
pub enum StacError {
    /// A required field is missing from a record
    #[error("STAC item{} is missing required field '{field}'", id.as_ref().map(|i| format!(" '{i}'")).unwrap_or_default())]
    MissingField {
        /// The item id, when known
        id: Option<String>,
        /// The missing field name
        field: String,
    },

    /// A bounding box is malformed
    #[error("Invalid bbox [{bbox:?}]: {reason}")]
    InvalidBbox {
        /// The offending bbox
        bbox: [f64; 4],
        /// Why the bbox is invalid
        reason: String,
    },

    /// A record failed to serialize or deserialize
    #[error("Failed to {operation} STAC record: {source}")]
    Json {
        /// "serialize" or "deserialize"
        operation: String,
        /// The underlying serde error
        #[source]
        source: serde_json::Error,
    },

    /// A datetime string could not be parsed
    #[error("Invalid datetime '{value}': {source}")]
    Datetime {
        /// The offending datetime string
        value: String,
        /// The underlying chrono error
        #[source]
        source: chrono::ParseError,
    },
}

/// I/O related errors.
///
/// These errors occur during file or stream operations, including reading,
/// writing, and path validation.
#[derive(Debug, Error)]
pub enum IoError {
    /// Failed to read from a file
    #[error("Failed to read {what} file '{path}': {source}")]
    Read {
        /// What was being read (e.g. "CPT", "item NDJSON")
        what: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to write to a file
    #[error("Failed to write {what} file '{path}': {source}")]
    Write {
        /// What was being written
        what: String,
        /// The file path
        path: PathBuf,
        /// The underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// File was not found
    #[error("File not found: '{path}'")]
    FileNotFound {
        /// The missing file path
        path: PathBuf,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },

    /// Required option is missing
    #[error("Missing required option: {option}")]
    MissingRequired {
        /// The missing option name
        option: String,
    },
}

/// Type alias for Results using [`StacRegError`].
pub type Result<T> = std::result::Result<T, StacRegError>;

impl StacRegError {
    /// Get a user-friendly error message with context.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ColorMap(e) => format!("Color map error: {e}"),
            Self::Format(e) => e.user_message(),
            Self::Stac(e) => format!("STAC record error: {e}"),
            Self::Io(e) => e.user_message(),
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Other(e) => format!("Error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Format(e) => e.recovery_suggestion(),
            Self::Io(e) => e.recovery_suggestion(),
            Self::ColorMap(ColorMapError::UnknownColorName { .. }) => Some(
                "Use an R/G/B triplet or a standard CSS color name.".to_string(),
            ),
            _ => None,
        }
    }

    /// Check if this error is potentially recoverable.
    ///
    /// Recoverable errors might be fixed by retrying with different
    /// parameters or after the user takes some action.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Format(_))
    }
}

impl FormatError {
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { name, available } => {
                format!(
                    "Format '{name}' not found.\n\nAvailable formats:\n{}",
                    available
                        .split(", ")
                        .map(|f| format!("  - {f}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                )
            },
            Self::OperationNotSupported { format, operation } => {
                format!("The '{format}' format does not support {operation}.")
            },
            Self::UnknownExtension { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::NotFound { .. } => {
                Some("Run 'stacreg formats' to see all available formats.".to_string())
            },
            Self::OperationNotSupported { .. } => {
                Some("Try a different format that supports this operation.".to_string())
            },
            Self::UnknownExtension { .. } => {
                Some("Pass the format explicitly instead of relying on the extension.".to_string())
            },
        }
    }
}

impl IoError {
    fn user_message(&self) -> String {
        match self {
            Self::Read { what, path, .. } => {
                format!("Failed to read {} file: {}", what, path.display())
            },
            Self::Write { what, path, .. } => {
                format!("Failed to write {} file: {}", what, path.display())
            },
            Self::FileNotFound { path } => {
                format!("File not found: {}", path.display())
            },
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::FileNotFound { .. } => {
                Some("Check that the file path is correct and the file exists.".to_string())
            },
            _ => None,
        }
    }
}

/// Extension trait for adding I/O context to errors.
///
/// This trait provides convenient methods to wrap errors with file context,
/// creating more informative error messages.
pub trait IoErrorExt<T> {
    /// Add read context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Read`] if the underlying operation fails.
    fn with_read_context(self, what: &str, path: impl Into<PathBuf>) -> Result<T>;

    /// Add write context to an error.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError::Write`] if the underlying operation fails.
    fn with_write_context(self, what: &str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T, E> IoErrorExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_read_context(self, what: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            StacRegError::Io(IoError::Read {
                what: what.to_string(),
                path: path.into(),
                source: Box::new(e),
            })
        })
    }

    fn with_write_context(self, what: &str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| {
            StacRegError::Io(IoError::Write {
                what: what.to_string(),
                path: path.into(),
                source: Box::new(e),
            })
        })
    }
}

/// Helper to create `FormatError::NotFound` with available formats filled in.
#[must_use]
pub fn format_not_found(name: &str) -> FormatError {
    use crate::formats::format_names;

    let available = format_names().join(", ");
    FormatError::NotFound {
        name: name.to_string(),
        available,
    }
}
