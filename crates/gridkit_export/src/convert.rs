//! Conversion entry points.
//!
//! Each operation is a synchronous pass-through: read the input, hand the
//! frame to the writer kernel, write the output. Failures propagate
//! immediately as [`ConvertError`]; an existing destination file is
//! overwritten. Because the workbook is buffered in memory, a source-side
//! failure leaves no destination file behind.

use std::path::Path;

use gridkit_io_xlsx::XlsxWriter;
use polars::prelude::{CsvWriter, DataFrame, SerWriter};

use crate::spec::{ConvertError, SpecConvertOptions};
use crate::util::{
    load_source_bytes, parse_csv_frame, parse_ipc_frame, validate_flat_columns,
    validate_within_sheet_limits,
};

////////////////////////////////////////////////////////////////////////////////
// #region BatchToSpreadsheet

/// Write an in-memory columnar batch as a single-sheet XLSX workbook.
///
/// Column order is preserved and a header row with the batch's column names
/// is emitted. Uses [`SpecConvertOptions::default`].
pub fn convert_batch_to_spreadsheet<P>(df: &DataFrame, path_file_dst: P) -> Result<(), ConvertError>
where
    P: AsRef<Path>,
{
    convert_batch_to_spreadsheet_with_options(df, path_file_dst, SpecConvertOptions::default())
}

/// [`convert_batch_to_spreadsheet`] with explicit sheet/write options.
pub fn convert_batch_to_spreadsheet_with_options<P>(
    df: &DataFrame,
    path_file_dst: P,
    spec_cv_options: SpecConvertOptions,
) -> Result<(), ConvertError>
where
    P: AsRef<Path>,
{
    let path_file_dst = path_file_dst.as_ref();

    validate_flat_columns(df)?;
    validate_within_sheet_limits(df)?;

    let derive_io_error = |message: String| ConvertError::Io {
        path: path_file_dst.to_path_buf(),
        message,
    };

    let mut writer = XlsxWriter::with_default_presets(
        path_file_dst.to_path_buf(),
        spec_cv_options.write_options,
    )
    .map_err(derive_io_error)?;
    writer
        .write_frame(df, &spec_cv_options.sheet_name)
        .map_err(derive_io_error)?;
    writer.close().map_err(derive_io_error)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CsvToSpreadsheet

/// Read a UTF-8 CSV file and write it as an XLSX workbook.
///
/// The CSV's first record is taken as the header; the schema is inferred.
/// No row-index column is added. Uses [`SpecConvertOptions::default`].
pub fn convert_csv_to_spreadsheet<P, Q>(
    path_file_src: P,
    path_file_dst: Q,
) -> Result<(), ConvertError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    convert_csv_to_spreadsheet_with_options(
        path_file_src,
        path_file_dst,
        SpecConvertOptions::default(),
    )
}

/// [`convert_csv_to_spreadsheet`] with explicit sheet/write options.
pub fn convert_csv_to_spreadsheet_with_options<P, Q>(
    path_file_src: P,
    path_file_dst: Q,
    spec_cv_options: SpecConvertOptions,
) -> Result<(), ConvertError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_file_src = path_file_src.as_ref();

    let v_bytes = load_source_bytes(path_file_src)?;
    let df = parse_csv_frame(path_file_src, v_bytes)?;
    convert_batch_to_spreadsheet_with_options(&df, path_file_dst, spec_cv_options)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region IpcToSpreadsheet

/// Write a Polars-IPC-serialized batch as an XLSX workbook.
///
/// `v_ipc_df` must be a valid Polars IPC payload. Uses
/// [`SpecConvertOptions::default`].
pub fn convert_ipc_to_spreadsheet<P>(v_ipc_df: &[u8], path_file_dst: P) -> Result<(), ConvertError>
where
    P: AsRef<Path>,
{
    convert_ipc_to_spreadsheet_with_options(v_ipc_df, path_file_dst, SpecConvertOptions::default())
}

/// [`convert_ipc_to_spreadsheet`] with explicit sheet/write options.
pub fn convert_ipc_to_spreadsheet_with_options<P>(
    v_ipc_df: &[u8],
    path_file_dst: P,
    spec_cv_options: SpecConvertOptions,
) -> Result<(), ConvertError>
where
    P: AsRef<Path>,
{
    let df = parse_ipc_frame(v_ipc_df)?;
    convert_batch_to_spreadsheet_with_options(&df, path_file_dst, spec_cv_options)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BatchToCsv

/// Write an in-memory columnar batch as a CSV file with header row.
pub fn convert_batch_to_csv<P>(df: &mut DataFrame, path_file_dst: P) -> Result<(), ConvertError>
where
    P: AsRef<Path>,
{
    let path_file_dst = path_file_dst.as_ref();

    validate_flat_columns(df)?;

    let file = std::fs::File::create(path_file_dst).map_err(|err| ConvertError::Io {
        path: path_file_dst.to_path_buf(),
        message: err.to_string(),
    })?;

    CsvWriter::new(file)
        .include_header(true)
        .finish(df)
        .map_err(|err| ConvertError::Io {
            path: path_file_dst.to_path_buf(),
            message: err.to_string(),
        })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use calamine::{Data, Reader, Xlsx, open_workbook};
    use gridkit_io_xlsx::N_NCOLS_EXCEL_MAX;
    use polars::df;
    use polars::prelude::{IntoColumn, IpcWriter, NamedFrom, SerWriter, Series};

    use super::*;
    use crate::spec::{ConvertError, SpecConvertOptions};

    struct TestDir {
        path: PathBuf,
    }

    impl TestDir {
        fn new() -> Self {
            let n = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos();
            let path = std::env::temp_dir().join(format!("gridkit_export_test_{n}"));
            std::fs::create_dir_all(&path).expect("create test dir");
            Self { path }
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for TestDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }

    fn read_sheet_range(path: &Path, sheet_name: &str) -> calamine::Range<Data> {
        let mut workbook: Xlsx<_> = open_workbook(path).expect("open workbook");
        workbook.worksheet_range(sheet_name).expect("sheet range")
    }

    #[test]
    fn csv_to_spreadsheet_preserves_cells_without_index_column() {
        let tmp = TestDir::new();
        let path_src = tmp.path().join("in.csv");
        let path_dst = tmp.path().join("out.xlsx");

        std::fs::write(&path_src, "a,b\n1,2\n3,4\n").expect("write csv");
        convert_csv_to_spreadsheet(&path_src, &path_dst).expect("convert csv");

        let range = read_sheet_range(&path_dst, "Sheet1");
        assert_eq!(range.get_size(), (3, 2));
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("a".to_string())));
        assert_eq!(range.get_value((0, 1)), Some(&Data::String("b".to_string())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(1.0)));
        assert_eq!(range.get_value((1, 1)), Some(&Data::Float(2.0)));
        assert_eq!(range.get_value((2, 0)), Some(&Data::Float(3.0)));
        assert_eq!(range.get_value((2, 1)), Some(&Data::Float(4.0)));
    }

    #[test]
    fn csv_round_trip_keeps_row_and_column_counts() {
        let tmp = TestDir::new();
        let path_src = tmp.path().join("in.csv");
        let path_dst = tmp.path().join("out.xlsx");

        std::fs::write(&path_src, "x,y,z\n1,a,0.5\n2,b,1.5\n3,c,2.5\n4,d,3.5\n")
            .expect("write csv");
        convert_csv_to_spreadsheet(&path_src, &path_dst).expect("convert csv");

        let range = read_sheet_range(&path_dst, "Sheet1");
        // 4 data rows + header, 3 columns
        assert_eq!(range.get_size(), (5, 3));
    }

    #[test]
    fn batch_to_spreadsheet_preserves_names_order_and_height() {
        let tmp = TestDir::new();
        let path_dst = tmp.path().join("out.xlsx");

        let df = df!(
            "id" => &[10i64, 20, 30],
            "name" => &["x", "y", "z"],
            "active" => &[true, false, true]
        )
        .expect("build frame");

        let spec_cv_options = SpecConvertOptions {
            sheet_name: "batch".to_string(),
            ..SpecConvertOptions::default()
        };
        convert_batch_to_spreadsheet_with_options(&df, &path_dst, spec_cv_options)
            .expect("convert batch");

        let range = read_sheet_range(&path_dst, "batch");
        assert_eq!(range.get_size(), (4, 3));
        assert_eq!(
            range.get_value((0, 0)),
            Some(&Data::String("id".to_string()))
        );
        assert_eq!(
            range.get_value((0, 1)),
            Some(&Data::String("name".to_string()))
        );
        assert_eq!(
            range.get_value((0, 2)),
            Some(&Data::String("active".to_string()))
        );
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(10.0)));
        assert_eq!(
            range.get_value((1, 2)),
            Some(&Data::String("True".to_string()))
        );
    }

    #[test]
    fn batch_wider_than_worksheet_limit_is_unsupported_schema() {
        let tmp = TestDir::new();
        let path_dst = tmp.path().join("out.xlsx");

        let l_cols = (0..N_NCOLS_EXCEL_MAX + 1)
            .map(|n_idx| Series::new(format!("c{n_idx}").into(), &[1i64]).into_column())
            .collect::<Vec<_>>();
        let df = DataFrame::new(l_cols).expect("build frame");

        let err = convert_batch_to_spreadsheet(&df, &path_dst).expect_err("must fail");
        assert!(matches!(err, ConvertError::UnsupportedSchema(_)));
        assert!(!path_dst.exists());
    }

    #[test]
    fn missing_source_is_not_found_and_leaves_no_output() {
        let tmp = TestDir::new();
        let path_src = tmp.path().join("does_not_exist.csv");
        let path_dst = tmp.path().join("out.xlsx");

        let err = convert_csv_to_spreadsheet(&path_src, &path_dst).expect_err("must fail");
        assert!(matches!(err, ConvertError::NotFound(_)));
        assert!(!path_dst.exists());
    }

    #[test]
    fn invalid_utf8_source_is_decode_error() {
        let tmp = TestDir::new();
        let path_src = tmp.path().join("in.csv");
        let path_dst = tmp.path().join("out.xlsx");

        std::fs::write(&path_src, [b'a', b',', b'b', b'\n', 0xff, 0xfe]).expect("write bytes");
        let err = convert_csv_to_spreadsheet(&path_src, &path_dst).expect_err("must fail");
        assert!(matches!(err, ConvertError::DecodeError { .. }));
        assert!(!path_dst.exists());
    }

    #[test]
    fn unwritable_destination_is_io_error() {
        let tmp = TestDir::new();
        let path_src = tmp.path().join("in.csv");
        let path_dst = tmp.path().join("missing_dir/out.xlsx");

        std::fs::write(&path_src, "a,b\n1,2\n").expect("write csv");
        let err = convert_csv_to_spreadsheet(&path_src, &path_dst).expect_err("must fail");
        assert!(matches!(err, ConvertError::Io { .. }));
    }

    #[test]
    fn existing_destination_is_overwritten() {
        let tmp = TestDir::new();
        let path_src = tmp.path().join("in.csv");
        let path_dst = tmp.path().join("out.xlsx");

        std::fs::write(&path_src, "a\n1\n").expect("write csv");
        std::fs::write(&path_dst, "stale").expect("seed destination");
        convert_csv_to_spreadsheet(&path_src, &path_dst).expect("convert csv");

        let range = read_sheet_range(&path_dst, "Sheet1");
        assert_eq!(range.get_size(), (2, 1));
    }

    #[test]
    fn ipc_payload_matches_in_memory_batch_path() {
        let tmp = TestDir::new();
        let path_dst = tmp.path().join("out.xlsx");

        let mut df = df!(
            "k" => &["p", "q"],
            "v" => &[1.5f64, 2.5]
        )
        .expect("build frame");

        let mut v_ipc = Vec::new();
        IpcWriter::new(&mut v_ipc).finish(&mut df).expect("serialize ipc");

        convert_ipc_to_spreadsheet(&v_ipc, &path_dst).expect("convert ipc");

        let range = read_sheet_range(&path_dst, "Sheet1");
        assert_eq!(range.get_size(), (3, 2));
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("k".to_string())));
        assert_eq!(range.get_value((2, 1)), Some(&Data::Float(2.5)));
    }

    #[test]
    fn garbage_ipc_payload_is_decode_error() {
        let tmp = TestDir::new();
        let path_dst = tmp.path().join("out.xlsx");

        let err = convert_ipc_to_spreadsheet(&[0u8; 8], &path_dst).expect_err("must fail");
        assert!(matches!(err, ConvertError::DecodeError { .. }));
        assert!(!path_dst.exists());
    }

    #[test]
    fn batch_to_csv_writes_header_and_rows() {
        let tmp = TestDir::new();
        let path_dst = tmp.path().join("out.csv");

        let mut df = df!(
            "a" => &[1i64, 3],
            "b" => &[2i64, 4]
        )
        .expect("build frame");

        convert_batch_to_csv(&mut df, &path_dst).expect("write csv");

        let c_written = std::fs::read_to_string(&path_dst).expect("read csv back");
        assert_eq!(c_written, "a,b\n1,2\n3,4\n");
    }

    #[test]
    fn batch_to_csv_on_missing_directory_is_io_error() {
        let tmp = TestDir::new();
        let path_dst = tmp.path().join("missing_dir/out.csv");

        let mut df = df!("a" => &[1i64]).expect("build frame");
        let err = convert_batch_to_csv(&mut df, &path_dst).expect_err("must fail");
        assert!(matches!(err, ConvertError::Io { .. }));
    }
}
