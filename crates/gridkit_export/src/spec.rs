//! Conversion options and top-level error types.

use std::fmt;
use std::path::PathBuf;

use gridkit_io_xlsx::SpecXlsxWriteOptions;
use gridkit_io_xlsx::conf::derive_default_xlsx_write_options;

////////////////////////////////////////////////////////////////////////////////
// #region OptionsInit

/// Input options for the conversion entry points.
#[derive(Debug, Clone)]
pub struct SpecConvertOptions {
    /// Target worksheet name (sanitized to Excel naming rules at write time).
    pub sheet_name: String,
    /// XLSX writer options passed through to the kernel.
    pub write_options: SpecXlsxWriteOptions,
}

impl Default for SpecConvertOptions {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
            write_options: derive_default_xlsx_write_options(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Conversion failure taxonomy.
///
/// All variants propagate directly to the caller; there is no retry and no
/// partial-output cleanup guarantee once the destination has been touched.
#[derive(Debug)]
pub enum ConvertError {
    /// Source path does not exist.
    NotFound(PathBuf),
    /// Source bytes are not valid UTF-8, or the payload cannot be parsed
    /// into a tabular frame.
    DecodeError {
        /// Offending source path (or pseudo-path for in-memory payloads).
        path: PathBuf,
        /// Underlying decode/parse error text.
        message: String,
    },
    /// A column cannot be represented in the destination format, or the
    /// frame exceeds the destination's sheet limits.
    UnsupportedSchema(String),
    /// Destination unwritable or any underlying I/O failure.
    Io {
        /// Path involved in the failed I/O operation.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => {
                write!(f, "Source path not found: {}", path.display())
            }
            Self::DecodeError { path, message } => {
                write!(f, "Failed to decode {}: {message}", path.display())
            }
            Self::UnsupportedSchema(msg) => write!(f, "{msg}"),
            Self::Io { path, message } => {
                write!(f, "I/O failure at {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for ConvertError {}

// #endregion
////////////////////////////////////////////////////////////////////////////////
