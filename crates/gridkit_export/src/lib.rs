//! `gridkit_export` v1:
//! Tabular format conversion entry points.
//!
//! Converts on-disk CSV files and in-memory columnar batches (polars
//! `DataFrame`s, including Polars-IPC-serialized frames) into XLSX workbooks,
//! and batches back into CSV files. Parsing and encoding are delegated to
//! `polars` and the `gridkit_io_xlsx` writer kernel:
//! - `spec`    : error taxonomy and conversion options
//! - `util`    : source loading, schema validation, error classification
//! - `convert` : the conversion operations

pub mod convert;
pub mod spec;
mod util;

pub use convert::{
    convert_batch_to_csv, convert_batch_to_spreadsheet,
    convert_batch_to_spreadsheet_with_options, convert_csv_to_spreadsheet,
    convert_csv_to_spreadsheet_with_options, convert_ipc_to_spreadsheet,
    convert_ipc_to_spreadsheet_with_options,
};
pub use spec::{ConvertError, SpecConvertOptions};
