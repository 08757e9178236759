//! Stateless helper utilities used by the XLSX writer kernel.

use std::collections::{BTreeMap, BTreeSet};

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::{EnumCellValue, SpecXlsxValuePolicy};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Convert `NaN`/`Inf` to policy string; return error for finite values.
pub fn convert_nan_inf_to_str(
    x: f64,
    value_policy: &SpecXlsxValuePolicy,
) -> Result<String, String> {
    if x.is_nan() {
        return Ok(value_policy.nan_str.clone());
    }
    if x.is_infinite() {
        return Ok(if x.is_sign_positive() {
            value_policy.posinf_str.clone()
        } else {
            value_policy.neginf_str.clone()
        });
    }
    Err("Input is neither NaN nor Inf.".to_string())
}

/// Normalize cell value according to the numeric flag and value policy.
///
/// Non-numeric columns always emit text; numeric columns keep finite numbers
/// and route non-finite ones through the NaN/Inf policy.
pub fn convert_cell_value(
    value: &EnumCellValue,
    if_is_numeric_col: bool,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> EnumCellValue {
    if matches!(value, EnumCellValue::None) {
        return if if_keep_missing_values {
            EnumCellValue::String(value_policy.missing_value_str.clone())
        } else {
            EnumCellValue::None
        };
    }

    if !if_is_numeric_col {
        return match value {
            EnumCellValue::String(s) => EnumCellValue::String(s.clone()),
            EnumCellValue::Number(n) => EnumCellValue::String(n.to_string()),
            EnumCellValue::None => EnumCellValue::None,
        };
    }

    match value {
        EnumCellValue::Number(n) => {
            if n.is_finite() {
                EnumCellValue::Number(*n)
            } else if if_keep_missing_values {
                EnumCellValue::String(
                    convert_nan_inf_to_str(*n, value_policy)
                        .unwrap_or_else(|_| value_policy.nan_str.clone()),
                )
            } else {
                EnumCellValue::None
            }
        }
        EnumCellValue::String(s) => {
            if let Ok(v) = s.parse::<f64>() {
                if v.is_finite() {
                    EnumCellValue::Number(v)
                } else if if_keep_missing_values {
                    EnumCellValue::String(
                        convert_nan_inf_to_str(v, value_policy)
                            .unwrap_or_else(|_| value_policy.nan_str.clone()),
                    )
                } else {
                    EnumCellValue::None
                }
            } else {
                EnumCellValue::String(s.clone())
            }
        }
        EnumCellValue::None => EnumCellValue::None,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataFrameLikeUtils

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), String> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!(
                    "{c_name:?} x{} at indices {:?}",
                    l_pos.len(),
                    l_pos
                ))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(format!("Duplicate column names detected: {c_msg}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WidthEstimation

/// Estimate displayed width units for one header/cell text.
///
/// Non-ASCII characters count wider than ASCII ones.
pub fn estimate_width_len(text: &str) -> usize {
    let n_ascii = text.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = text.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_nan_inf_to_str_maps_policy_strings() {
        let policy = SpecXlsxValuePolicy::default();
        assert_eq!(convert_nan_inf_to_str(f64::NAN, &policy).unwrap(), "NaN");
        assert_eq!(
            convert_nan_inf_to_str(f64::INFINITY, &policy).unwrap(),
            "Inf"
        );
        assert_eq!(
            convert_nan_inf_to_str(f64::NEG_INFINITY, &policy).unwrap(),
            "-Inf"
        );
        assert!(convert_nan_inf_to_str(1.5, &policy).is_err());
    }

    #[test]
    fn test_convert_cell_value_numeric_and_text_columns() {
        let policy = SpecXlsxValuePolicy::default();

        assert_eq!(
            convert_cell_value(&EnumCellValue::Number(2.5), true, false, &policy),
            EnumCellValue::Number(2.5)
        );
        assert_eq!(
            convert_cell_value(&EnumCellValue::Number(2.5), false, false, &policy),
            EnumCellValue::String("2.5".to_string())
        );
        assert_eq!(
            convert_cell_value(
                &EnumCellValue::String("7".to_string()),
                true,
                false,
                &policy
            ),
            EnumCellValue::Number(7.0)
        );
        assert_eq!(
            convert_cell_value(&EnumCellValue::None, true, true, &policy),
            EnumCellValue::String("NA".to_string())
        );
        assert_eq!(
            convert_cell_value(&EnumCellValue::Number(f64::NAN), true, true, &policy),
            EnumCellValue::String("NaN".to_string())
        );
        assert_eq!(
            convert_cell_value(&EnumCellValue::Number(f64::NAN), true, false, &policy),
            EnumCellValue::None
        );
    }

    #[test]
    fn test_validate_unique_columns_reports_duplicates() {
        let ok = vec!["a".to_string(), "b".to_string()];
        assert!(validate_unique_columns(&ok).is_ok());

        let dup = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let err = validate_unique_columns(&dup).unwrap_err();
        assert!(err.contains("\"a\""));
        assert!(err.contains("x2"));
    }

    #[test]
    fn test_sanitize_sheet_name_rules() {
        assert_eq!(sanitize_sheet_name("users/2024", "_"), "users_2024");
        assert_eq!(sanitize_sheet_name("  ", "_"), "Sheet");
        let c_long = "x".repeat(64);
        assert_eq!(sanitize_sheet_name(&c_long, "_").chars().count(), 31);
    }

    #[test]
    fn test_estimate_width_len_counts_wide_chars() {
        assert_eq!(estimate_width_len("abc"), 3);
        assert!(estimate_width_len("数据") > 2);
    }
}
