//! Stateless helper utilities used by the template writer kernel.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::conf::{
    C_MASTER_HEADER_CODE, C_MASTER_LIST_DELIMITER, C_MASTER_USAGE_PREFIX,
    N_LEN_EXCEL_SHEET_NAME_MAX, N_MASTER_COLS_PER_LIST, N_MASTER_ROW_VALUES_START,
    N_MASTER_ROWS_HEADER, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{
    EnumRowWidthRule, SpecMasterHeader, SpecMasterListRange, SpecMasterListRecord,
    SpecMasterValue, SpecRow, SpecSheetTemplate,
};
use crate::style::{decode_style_directive, derive_comment};

////////////////////////////////////////////////////////////////////////////////
// #region CoordinateAllocation

/// Map a zero-based column index to its spreadsheet label (`0 -> A`, `26 -> AA`).
///
/// Bijective base-26: the alphabet has no zero digit, hence the `- 1` carry.
pub fn derive_column_label(col_idx: usize) -> String {
    let mut l_letters = Vec::new();
    let mut n_idx = col_idx;
    loop {
        l_letters.push(char::from(b'A' + (n_idx % 26) as u8));
        if n_idx < 26 {
            break;
        }
        n_idx = n_idx / 26 - 1;
    }
    l_letters.iter().rev().collect()
}

/// Relative A1 address, e.g. `C4`.
pub fn derive_cell_address(col_idx: usize, row_1based: usize) -> String {
    format!("{}{row_1based}", derive_column_label(col_idx))
}

/// Absolute A1 address, e.g. `$C$4`.
pub fn derive_absolute_cell_address(col_idx: usize, row_1based: usize) -> String {
    format!("${}${row_1based}", derive_column_label(col_idx))
}

/// Zero-based `(code, value)` columns reserved for master list `list_idx`.
///
/// Column `3 * list_idx` stays blank as a separator.
pub fn derive_master_columns(list_idx: usize) -> (usize, usize) {
    let n_col_base = N_MASTER_COLS_PER_LIST * list_idx;
    (n_col_base + 1, n_col_base + 2)
}

/// Reserve master-sheet ranges for `records`, in order.
pub fn plan_master_list_ranges(records: &[SpecMasterListRecord]) -> Vec<SpecMasterListRange> {
    records
        .iter()
        .enumerate()
        .map(|(n_idx, record)| {
            let (col_idx_code, col_idx_value) = derive_master_columns(n_idx);
            SpecMasterListRange {
                id: record.id.clone(),
                list_name: record.list_name.clone(),
                col_idx_code,
                col_idx_value,
                row_start: N_MASTER_ROW_VALUES_START,
                row_end: N_MASTER_ROWS_HEADER + record.values.len(),
            }
        })
        .collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MasterListPlanning

/// Split a delimited value string.
///
/// Codes are raw split positions, assigned before empty values are dropped.
pub fn derive_master_values(raw: &str) -> Vec<SpecMasterValue> {
    raw.split(C_MASTER_LIST_DELIMITER)
        .enumerate()
        .filter(|(_, value)| !value.is_empty())
        .map(|(code, value)| SpecMasterValue {
            code,
            value: value.to_string(),
        })
        .collect()
}

/// Collect master lists across `sheets` in first-seen order.
pub fn plan_master_lists(sheets: &[SpecSheetTemplate]) -> Vec<SpecMasterListRecord> {
    let mut l_records = Vec::new();
    for sheet in sheets {
        for column in &sheet.columns {
            let Some(l_values) = column.master_values_raw().map(derive_master_values) else {
                continue;
            };

            let comment = column
                .style_directive
                .as_deref()
                .and_then(|raw| decode_style_directive(raw).ok())
                .and_then(|directive| derive_comment(&directive).map(ToString::to_string));

            l_records.push(SpecMasterListRecord {
                id: column.display_name.clone(),
                list_name: column.display_name.clone(),
                usage: format!("{C_MASTER_USAGE_PREFIX} {}", sheet.sheet_name),
                header: SpecMasterHeader {
                    code: C_MASTER_HEADER_CODE.to_string(),
                    value: column.display_name.clone(),
                    comment,
                },
                values: l_values,
            });
        }
    }
    l_records
}

/// Unpadded `(code column, value column)` widths for one master list.
pub fn derive_master_column_widths(record: &SpecMasterListRecord) -> (usize, usize) {
    let n_width_code = record
        .values
        .iter()
        .map(|item| item.code.to_string().len())
        .fold(derive_text_width(&record.header.code), usize::max);
    let n_width_value = record
        .values
        .iter()
        .map(|item| derive_text_width(&item.value))
        .fold(derive_text_width(&record.header.value), usize::max);
    (n_width_code, n_width_value)
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
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Create suffixed sheet name (`base__2`, `base__3`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx: usize) -> String {
    let c_sheet_name_suffix = format!("__{part_idx}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValues

/// Display width of a text, in characters.
pub fn derive_text_width(text: &str) -> usize {
    text.chars().count()
}

/// Text a JSON cell value displays as; `None` for `null`.
pub fn derive_value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Plan final widths for columns touched by `rows`.
///
/// `header_widths` are the already padded header widths; columns past the
/// header start at zero.
pub fn plan_row_data_widths(
    header_widths: &[usize],
    rows: &[SpecRow],
    rule: EnumRowWidthRule,
    padding: usize,
) -> BTreeMap<usize, usize> {
    let mut dict_width_by_col = BTreeMap::new();
    for row in rows {
        for (n_idx_col, value) in row.values().enumerate() {
            let Some(c_text) = derive_value_text(value) else {
                continue;
            };
            let n_width = derive_text_width(&c_text) + padding;
            match rule {
                EnumRowWidthRule::LastRow => {
                    dict_width_by_col.insert(n_idx_col, n_width);
                }
                EnumRowWidthRule::RunningMax => {
                    let n_width_current = dict_width_by_col
                        .entry(n_idx_col)
                        .or_insert_with(|| header_widths.get(n_idx_col).copied().unwrap_or(0));
                    *n_width_current = usize::max(*n_width_current, n_width);
                }
            }
        }
    }
    dict_width_by_col
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
