//! Template constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::{SpecCellFormat, SpecTemplateOptions};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Separator between encoded values in a column's master-value string.
pub const C_MASTER_LIST_DELIMITER: char = '~';
/// Sheet name every dropdown validation formula points at.
pub const C_MASTER_SHEET_NAME: &str = "Master";
/// Header text above the code column of each master list.
pub const C_MASTER_HEADER_CODE: &str = "Sl No";
/// Prefix of the usage line written under each master list name.
pub const C_MASTER_USAGE_PREFIX: &str = "used in";

/// Columns reserved per master list: separator, codes, values.
pub const N_MASTER_COLS_PER_LIST: usize = 3;
/// 1-based row holding the first master value (rows 1-3 are the header block).
pub const N_MASTER_ROW_VALUES_START: usize = 4;
/// Height of the header block above the master values.
pub const N_MASTER_ROWS_HEADER: usize = N_MASTER_ROW_VALUES_START - 1;

/// Font color of the master list name row.
pub const N_RGB_MASTER_NAME_FONT: u32 = 0x548235;
/// Font color of the master list usage row.
pub const N_RGB_MASTER_USAGE_FONT: u32 = 0x2F75B5;

/// First 1-based data row on a template sheet (row 1 holds headers).
pub const N_TEMPLATE_ROW_DATA_START: usize = 2;

/// Error dialog title for out-of-list input.
pub const C_VALIDATION_ERROR_TITLE: &str = "Invalid input!";
/// Error dialog message for out-of-list input.
pub const C_VALIDATION_ERROR_MESSAGE: &str = "Please choose an input from the master list";

/// MIME type of produced artifacts.
pub const C_XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Sheet name used by the flat JSON export.
pub const C_JSON_EXPORT_SHEET_NAME: &str = "Sheet 1";

/// Build default master-sheet formats keyed by role.
///
/// Keys: `name`, `usage`, `header`, `code`, `value`.
pub fn derive_default_master_formats() -> BTreeMap<String, SpecCellFormat> {
    let cfg_base_fmt_spec = SpecCellFormat {
        border: Some(true),
        ..Default::default()
    };
    let cfg_title_fmt_spec = cfg_base_fmt_spec.with_(SpecCellFormat {
        bold: Some(true),
        align: Some("center".to_string()),
        ..Default::default()
    });

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(
        "name".to_string(),
        cfg_title_fmt_spec.with_(SpecCellFormat {
            font_color: Some(format!("{N_RGB_MASTER_NAME_FONT:06X}")),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        "usage".to_string(),
        cfg_title_fmt_spec.with_(SpecCellFormat {
            font_color: Some(format!("{N_RGB_MASTER_USAGE_FONT:06X}")),
            ..Default::default()
        }),
    );
    dict_fmt.insert("header".to_string(), cfg_title_fmt_spec);
    dict_fmt.insert(
        "code".to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            align: Some("center".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert("value".to_string(), cfg_base_fmt_spec);
    dict_fmt
}

/// Build default template options.
pub fn derive_default_template_options() -> SpecTemplateOptions {
    SpecTemplateOptions::default()
}
