//! `gridkit_io_xlsx` v1:
//! XLSX writer kernel over `rust_xlsxwriter`.
//!
//! Consumes polars `DataFrame`s and emits single-sheet workbooks:
//! - `conf`   : constants and default format presets
//! - `spec`   : format/options/report models
//! - `util`   : pure helper functions
//! - `writer` : workbook writer
pub mod conf;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use spec::{
    EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetSummary, SpecXlsxReport,
    SpecXlsxValuePolicy, SpecXlsxWriteOptions,
};
pub use util::{
    convert_cell_value, convert_nan_inf_to_str, estimate_width_len, sanitize_sheet_name,
    validate_unique_columns,
};
pub use writer::XlsxWriter;
