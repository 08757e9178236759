//! Source loading, schema validation and error classification helpers.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use gridkit_io_xlsx::conf::{N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX};
use polars::prelude::{CsvReadOptions, DataFrame, IpcReader, SerReader};

use crate::spec::ConvertError;

/// Pseudo-path reported for failures on in-memory IPC payloads.
pub(crate) const C_PATH_IPC_PAYLOAD: &str = "<ipc payload>";

////////////////////////////////////////////////////////////////////////////////
// #region SourceLoading

/// Read all source bytes, classifying missing paths separately.
pub(crate) fn load_source_bytes(path_file_src: &Path) -> Result<Vec<u8>, ConvertError> {
    std::fs::read(path_file_src).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            ConvertError::NotFound(path_file_src.to_path_buf())
        } else {
            ConvertError::Io {
                path: path_file_src.to_path_buf(),
                message: err.to_string(),
            }
        }
    })
}

/// Parse UTF-8 CSV bytes into a frame with header and schema inference.
pub(crate) fn parse_csv_frame(
    path_file_src: &Path,
    v_bytes: Vec<u8>,
) -> Result<DataFrame, ConvertError> {
    if let Err(err) = std::str::from_utf8(&v_bytes) {
        return Err(ConvertError::DecodeError {
            path: path_file_src.to_path_buf(),
            message: format!("invalid UTF-8: {err}"),
        });
    }

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1_000))
        .into_reader_with_file_handle(Cursor::new(v_bytes))
        .finish()
        .map_err(|err| ConvertError::DecodeError {
            path: path_file_src.to_path_buf(),
            message: err.to_string(),
        })
}

/// Parse a Polars IPC payload into a frame.
pub(crate) fn parse_ipc_frame(v_ipc_df: &[u8]) -> Result<DataFrame, ConvertError> {
    IpcReader::new(Cursor::new(v_ipc_df))
        .finish()
        .map_err(|err| ConvertError::DecodeError {
            path: PathBuf::from(C_PATH_IPC_PAYLOAD),
            message: err.to_string(),
        })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SchemaValidation

/// Validate that every column dtype maps onto flat cells.
pub(crate) fn validate_flat_columns(df: &DataFrame) -> Result<(), ConvertError> {
    for c_col in df.get_columns() {
        if c_col.dtype().is_nested() {
            return Err(ConvertError::UnsupportedSchema(format!(
                "Column {:?} has unsupported dtype {:?} for tabular cells.",
                c_col.name().as_str(),
                c_col.dtype()
            )));
        }
    }
    Ok(())
}

/// Validate that the frame fits within one worksheet (header row included).
pub(crate) fn validate_within_sheet_limits(df: &DataFrame) -> Result<(), ConvertError> {
    if df.height() + 1 > N_NROWS_EXCEL_MAX {
        return Err(ConvertError::UnsupportedSchema(format!(
            "Frame height {} exceeds worksheet row limit {} (header included).",
            df.height(),
            N_NROWS_EXCEL_MAX
        )));
    }
    if df.width() > N_NCOLS_EXCEL_MAX {
        return Err(ConvertError::UnsupportedSchema(format!(
            "Frame width {} exceeds worksheet column limit {}.",
            df.width(),
            N_NCOLS_EXCEL_MAX
        )));
    }

    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
