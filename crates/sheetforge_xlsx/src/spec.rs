//! Shared template specification models.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rust_xlsxwriter::XlsxError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::conf::C_MASTER_SHEET_NAME;
use crate::util::derive_absolute_cell_address;

////////////////////////////////////////////////////////////////////////////////
// #region TemplateModels

/// Treat an explicit `null` like an absent field.
fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Root payload: groups of workbook templates to generate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpecWorkbookListTemplate {
    #[serde(
        rename = "fetchExcelGenerate",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub workbook_groups: Vec<SpecWorkbookGroupTemplate>,
}

impl SpecWorkbookListTemplate {
    /// Decode a template payload from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Iterate every workbook template across all groups, in document order.
    pub fn workbooks(&self) -> impl Iterator<Item = &SpecWorkbookTemplate> {
        self.workbook_groups
            .iter()
            .flat_map(|group| group.workbooks.iter())
    }
}

/// Module-level grouping of workbook templates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecWorkbookGroupTemplate {
    #[serde(rename = "moduleCode", deserialize_with = "deserialize_null_default")]
    pub module_code: String,
    #[serde(rename = "primModuleCode", deserialize_with = "deserialize_null_default")]
    pub prim_module_code: String,
    #[serde(rename = "templateCode", deserialize_with = "deserialize_null_default")]
    pub template_code: String,
    #[serde(rename = "modulesWrkBook", deserialize_with = "deserialize_null_default")]
    pub workbooks: Vec<SpecWorkbookTemplate>,
}

/// One workbook to generate; `workbook_name` doubles as the artifact file name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecWorkbookTemplate {
    #[serde(rename = "exlWBName", deserialize_with = "deserialize_null_default")]
    pub workbook_name: String,
    #[serde(rename = "exlWBProperties", deserialize_with = "deserialize_null_default")]
    pub properties: String,
    #[serde(rename = "exlWBVersion", deserialize_with = "deserialize_null_default")]
    pub version: String,
    #[serde(rename = "moduleCode", deserialize_with = "deserialize_null_default")]
    pub module_code: String,
    #[serde(rename = "primModuleCode", deserialize_with = "deserialize_null_default")]
    pub prim_module_code: String,
    #[serde(rename = "templateCode", deserialize_with = "deserialize_null_default")]
    pub template_code: String,
    #[serde(rename = "templateDesc", deserialize_with = "deserialize_null_default")]
    pub template_desc: String,
    #[serde(rename = "workBooKSheets", deserialize_with = "deserialize_null_default")]
    pub sheets: Vec<SpecSheetTemplate>,
}

/// One worksheet: ordered column definitions plus a validation row-count hint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecSheetTemplate {
    /// Number of data rows that receive dropdown validation.
    #[serde(rename = "customIntegerOutput1")]
    pub n_rows_hint: Option<i64>,
    #[serde(rename = "exlWBName", deserialize_with = "deserialize_null_default")]
    pub workbook_name: String,
    #[serde(rename = "exlWBSheetCode", deserialize_with = "deserialize_null_default")]
    pub sheet_code: String,
    #[serde(rename = "exlWBSheetName", deserialize_with = "deserialize_null_default")]
    pub sheet_name: String,
    #[serde(rename = "exlWBSheetProperties", deserialize_with = "deserialize_null_default")]
    pub properties: String,
    #[serde(rename = "wrkBookSheetsDtl", deserialize_with = "deserialize_null_default")]
    pub columns: Vec<SpecColumnTemplate>,
}

impl SpecSheetTemplate {
    /// Validated data row count; negative or missing hints mean zero.
    pub fn n_rows_validation(&self) -> usize {
        self.n_rows_hint
            .map_or(0, |n| usize::try_from(n).unwrap_or(0))
    }
}

/// One column definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecColumnTemplate {
    #[serde(rename = "exlWBName", deserialize_with = "deserialize_null_default")]
    pub workbook_name: String,
    #[serde(rename = "exlWBSheetCode", deserialize_with = "deserialize_null_default")]
    pub sheet_code: String,
    /// Header text; also the identity of the column's master list.
    #[serde(rename = "exlWBSheetColDispName", deserialize_with = "deserialize_null_default")]
    pub display_name: String,
    #[serde(rename = "exlWBSheetColDSType", deserialize_with = "deserialize_null_default")]
    pub data_source_type: String,
    /// `~`-delimited permitted values.
    #[serde(rename = "exlWBSheetColDSValue")]
    pub master_values: Option<String>,
    /// Serialized style directive.
    #[serde(rename = "exlWBSheetColFormat")]
    pub style_directive: Option<String>,
}

impl SpecColumnTemplate {
    /// Raw master-value string when it is long enough to describe a list.
    pub fn master_values_raw(&self) -> Option<&str> {
        self.master_values
            .as_deref()
            .filter(|raw| raw.chars().count() > 1)
    }
}

/// One row of caller-supplied data; column `k` is the row's `k`-th key.
pub type SpecRow = Map<String, Value>;

/// Row data written below template headers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum EnumRowData {
    /// Rows keyed by template sheet name.
    BySheet(Vec<(String, Vec<SpecRow>)>),
    /// Rows applied to every template sheet.
    Flat(Vec<SpecRow>),
}

impl EnumRowData {
    /// Decode row data from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(text)?)
    }
}

impl TryFrom<Value> for EnumRowData {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(l_rows) => Ok(Self::Flat(collect_row_objects(l_rows))),
            Value::Object(dict_sheets) => Ok(Self::BySheet(
                dict_sheets
                    .into_iter()
                    .filter_map(|(sheet_name, rows)| match rows {
                        Value::Array(l_rows) => Some((sheet_name, collect_row_objects(l_rows))),
                        _ => None,
                    })
                    .collect(),
            )),
            other => Err(format!(
                "Row data must be a JSON object or array, got: {other}"
            )),
        }
    }
}

fn collect_row_objects(l_rows: Vec<Value>) -> Vec<SpecRow> {
    l_rows
        .into_iter()
        .filter_map(|row| match row {
            Value::Object(dict_row) => Some(dict_row),
            other => {
                log::warn!("Skipping non-object row: {other}");
                None
            }
        })
        .collect()
}

/// Column definition for the flat JSON export.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpecJsonColumn {
    /// Header text in row 1.
    pub header: String,
    /// Row-object key feeding this column.
    pub key: String,
    /// Explicit column width.
    #[serde(default)]
    pub width: Option<f64>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MasterListModels

/// One permitted value; `code` is its position in the raw split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecMasterValue {
    pub code: usize,
    pub value: String,
}

/// Row-3 header pair of a master list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecMasterHeader {
    pub code: String,
    pub value: String,
    pub comment: Option<String>,
}

/// Normalized permitted-value list extracted from one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecMasterListRecord {
    /// Source column display name.
    pub id: String,
    pub list_name: String,
    /// `used in <sheet>` annotation.
    pub usage: String,
    pub header: SpecMasterHeader,
    pub values: Vec<SpecMasterValue>,
}

/// Cells reserved on the master sheet for one list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecMasterListRange {
    pub id: String,
    pub list_name: String,
    /// Zero-based column of the codes.
    pub col_idx_code: usize,
    /// Zero-based column of the values.
    pub col_idx_value: usize,
    /// 1-based first value row.
    pub row_start: usize,
    /// 1-based last value row; `row_start - 1` for an empty list.
    pub row_end: usize,
}

impl SpecMasterListRange {
    /// Absolute address of the first value cell (`$C$4`).
    pub fn start_ref(&self) -> String {
        derive_absolute_cell_address(self.col_idx_value, self.row_start)
    }

    /// Absolute address of the last value cell.
    pub fn end_ref(&self) -> String {
        derive_absolute_cell_address(self.col_idx_value, self.row_end)
    }

    /// Number of values in the range.
    pub fn n_values(&self) -> usize {
        (self.row_end + 1).saturating_sub(self.row_start)
    }

    /// List-validation source formula against `sheet_name`.
    pub fn formula(&self, sheet_name: &str) -> String {
        format!("{sheet_name}!{}:{}", self.start_ref(), self.end_ref())
    }

    /// Formula against the fixed master sheet name.
    pub fn master_formula(&self) -> String {
        self.formula(C_MASTER_SHEET_NAME)
    }
}

/// Master ranges keyed by list identity; the first range for an identity wins.
#[derive(Debug, Clone, Default)]
pub struct SpecMasterRangeLookup {
    l_ranges: Vec<SpecMasterListRange>,
    dict_idx_by_id: BTreeMap<String, usize>,
    l_ids_duplicate: Vec<String>,
}

impl SpecMasterRangeLookup {
    /// Index `ranges` by identity once.
    pub fn new(ranges: Vec<SpecMasterListRange>) -> Self {
        let mut dict_idx_by_id = BTreeMap::new();
        let mut l_ids_duplicate = Vec::new();
        for (n_idx, range) in ranges.iter().enumerate() {
            if dict_idx_by_id.contains_key(&range.id) {
                l_ids_duplicate.push(range.id.clone());
                continue;
            }
            dict_idx_by_id.insert(range.id.clone(), n_idx);
        }

        Self {
            l_ranges: ranges,
            dict_idx_by_id,
            l_ids_duplicate,
        }
    }

    pub fn get(&self, id: &str) -> Option<&SpecMasterListRange> {
        self.dict_idx_by_id
            .get(id)
            .and_then(|n_idx| self.l_ranges.get(*n_idx))
    }

    /// All ranges in master-sheet order, duplicates included.
    pub fn ranges(&self) -> &[SpecMasterListRange] {
        &self.l_ranges
    }

    /// Identities that appeared more than once (one entry per extra occurrence).
    pub fn duplicate_ids(&self) -> &[String] {
        &self.l_ids_duplicate
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StyleModels

/// Decoded per-column style directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecStyleDirective {
    pub font: SpecStyleFont,
}

/// Font-scoped styling block; fill, border, and comment live here upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecStyleFont {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub color: Option<SpecStyleColor>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub alignment: Option<SpecStyleAlignment>,
    pub fill: SpecStyleFill,
    pub border: Option<bool>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecStyleColor {
    /// Hex color, optionally `#`-prefixed, 6 (RGB) or 8 (ARGB) digits.
    pub argb: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecStyleAlignment {
    pub horizontal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecStyleFill {
    #[serde(rename = "type")]
    pub fill_type: Option<String>,
    pub pattern: Option<String>,
    #[serde(rename = "fgColor")]
    pub fg_color: SpecStyleColor,
}

/// Cell format consumed by the writer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<f64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,
    /// Single underline.
    pub underline: Option<bool>,
    /// Horizontal alignment.
    pub align: Option<String>,
    /// Thin border on all sides.
    pub border: Option<bool>,
    /// Background fill color, bare `RRGGBB`.
    pub bg_color: Option<String>,
    /// Font color, bare `RRGGBB`.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            underline: other.underline.or(self.underline),
            align: other.align.clone().or_else(|| self.align.clone()),
            border: other.border.or(self.border),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// How row data widens columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumRowWidthRule {
    /// Width follows the last row written to each column.
    LastRow,
    /// Width is the maximum over header and every row (default).
    #[default]
    RunningMax,
}

/// Per-call generation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTemplateOptions {
    /// Emit a styled, visible master sheet; otherwise it is written hidden.
    pub if_display_master_sheet: bool,
    /// Show an error dialog on out-of-list input instead of accepting it.
    pub if_show_error_message: bool,
    /// Column width rule for row data.
    pub rule_row_width: EnumRowWidthRule,
    /// Padding added to measured text widths.
    pub width_cell_padding: usize,
}

impl Default for SpecTemplateOptions {
    fn default() -> Self {
        Self {
            if_display_master_sheet: true,
            if_show_error_message: true,
            rule_row_width: EnumRowWidthRule::RunningMax,
            width_cell_padding: 2,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ArtifactAndReport

/// Serialized workbook handed to an artifact sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// One template sheet as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecTemplateSheet {
    /// Sheet name from the template.
    pub template_name: String,
    /// Actual sheet name in the workbook.
    pub sheet_name: String,
    pub n_cols: usize,
    /// Rows covered by dropdown validation.
    pub n_rows_validated: usize,
    /// Rows of caller data written.
    pub n_rows_data: usize,
}

/// Per-workbook generation report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SpecTemplateReport {
    pub workbook_name: String,
    pub sheets: Vec<SpecTemplateSheet>,
    pub master_lists: Vec<SpecMasterListRange>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecTemplateReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// "Generation call failed" errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template or row-data JSON could not be decoded.
    #[error("Failed to decode JSON input: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// Spreadsheet engine rejected a write or failed to serialize.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] XlsxError),
    /// Row/column index outside the engine's integer range.
    #[error("{axis} index overflow: {value}")]
    IndexOverflow { axis: &'static str, value: usize },
    /// Artifact delivery failed.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Style directive decode failure; recovered per column.
#[derive(Debug, Error)]
pub enum StyleDirectiveError {
    #[error("Style directive is empty.")]
    Empty,
    #[error("Style directive is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Style directive must decode to an encoded JSON string, got: {0}")]
    NotEncodedString(String),
    #[error("Invalid color value: {0:?}")]
    InvalidColor(String),
}

/// Artifact delivery failure.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Invalid artifact file name: {0:?}")]
    InvalidFileName(String),
    #[error("Failed to write artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Raised by caller-supplied sinks that refuse an artifact.
    #[error("Artifact rejected: {0}")]
    Rejected(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_template_decodes_wire_names_and_defaults() {
        let payload = json!({
            "fetchExcelGenerate": [{
                "moduleCode": "M1",
                "modulesWrkBook": [{
                    "exlWBName": "orders.xlsx",
                    "workBooKSheets": [{
                        "customIntegerOutput1": 3,
                        "exlWBSheetName": "Orders",
                        "wrkBookSheetsDtl": [
                            {"exlWBSheetColDispName": "Id", "exlWBSheetColFormat": null},
                            {"exlWBSheetColDispName": "Status", "exlWBSheetColDSValue": "x~y"}
                        ]
                    }]
                }]
            }]
        });

        let template: SpecWorkbookListTemplate =
            serde_json::from_value(payload).expect("decode template");
        let l_workbooks: Vec<_> = template.workbooks().collect();

        assert_eq!(l_workbooks.len(), 1);
        assert_eq!(l_workbooks[0].workbook_name, "orders.xlsx");
        let sheet = &l_workbooks[0].sheets[0];
        assert_eq!(sheet.n_rows_validation(), 3);
        assert_eq!(sheet.columns[0].style_directive, None);
        assert_eq!(sheet.columns[0].master_values_raw(), None);
        assert_eq!(sheet.columns[1].master_values_raw(), Some("x~y"));
    }

    #[test]
    fn test_template_decodes_null_metadata_as_defaults() {
        let text = r#"{
            "fetchExcelGenerate": [{
                "moduleCode": null,
                "primModuleCode": null,
                "templateCode": null,
                "modulesWrkBook": [{
                    "exlWBName": "orders.xlsx",
                    "exlWBProperties": null,
                    "exlWBVersion": null,
                    "templateDesc": null,
                    "workBooKSheets": [{
                        "customIntegerOutput1": null,
                        "exlWBSheetName": "Orders",
                        "exlWBSheetProperties": null,
                        "wrkBookSheetsDtl": [{
                            "exlWBSheetCode": null,
                            "exlWBSheetColDispName": "Status",
                            "exlWBSheetColDSType": null,
                            "exlWBSheetColDSValue": "x~y"
                        }]
                    }]
                }]
            }]
        }"#;

        let template = SpecWorkbookListTemplate::from_json_str(text).expect("decode template");
        let group = &template.workbook_groups[0];
        assert_eq!(group.module_code, "");
        assert_eq!(group.template_code, "");

        let workbook = &group.workbooks[0];
        assert_eq!(workbook.properties, "");
        assert_eq!(workbook.template_desc, "");

        let sheet = &workbook.sheets[0];
        assert_eq!(sheet.properties, "");
        assert_eq!(sheet.n_rows_validation(), 0);
        assert_eq!(sheet.columns[0].data_source_type, "");
        assert_eq!(sheet.columns[0].display_name, "Status");
        assert_eq!(sheet.columns[0].master_values_raw(), Some("x~y"));

        let empty = SpecWorkbookListTemplate::from_json_str(
            r#"{"fetchExcelGenerate": [{"modulesWrkBook": null}]}"#,
        )
        .expect("decode null workbooks");
        assert_eq!(empty.workbooks().count(), 0);
    }

    #[test]
    fn test_negative_row_hint_means_no_validation_rows() {
        let sheet = SpecSheetTemplate {
            n_rows_hint: Some(-4),
            ..Default::default()
        };
        assert_eq!(sheet.n_rows_validation(), 0);
    }

    #[test]
    fn test_row_data_modes() {
        let by_sheet = EnumRowData::from_json_str(
            r#"{"Orders": [{"b": "1", "a": "2"}], "Ignored": "not rows"}"#,
        )
        .expect("by-sheet rows");
        let EnumRowData::BySheet(l_sheets) = by_sheet else {
            panic!("expected by-sheet rows");
        };
        assert_eq!(l_sheets.len(), 1);
        assert_eq!(l_sheets[0].0, "Orders");
        let l_keys: Vec<_> = l_sheets[0].1[0].keys().cloned().collect();
        assert_eq!(l_keys, vec!["b".to_string(), "a".to_string()]);

        let flat = EnumRowData::from_json_str(r#"[{"a": 1}, 7, {"a": 2}]"#).expect("flat rows");
        let EnumRowData::Flat(l_rows) = flat else {
            panic!("expected flat rows");
        };
        assert_eq!(l_rows.len(), 2);

        assert!(EnumRowData::from_json_str("42").is_err());
    }

    #[test]
    fn test_range_lookup_first_match_wins() {
        let derive_range = |id: &str, n_col: usize| SpecMasterListRange {
            id: id.to_string(),
            list_name: id.to_string(),
            col_idx_code: n_col - 1,
            col_idx_value: n_col,
            row_start: 4,
            row_end: 5,
        };
        let lookup = SpecMasterRangeLookup::new(vec![
            derive_range("Status", 2),
            derive_range("Kind", 5),
            derive_range("Status", 8),
        ]);

        assert_eq!(lookup.get("Status").map(|r| r.col_idx_value), Some(2));
        assert_eq!(lookup.duplicate_ids(), &["Status".to_string()]);
        assert_eq!(lookup.ranges().len(), 3);
        assert!(lookup.get("Missing").is_none());
    }

    #[test]
    fn test_empty_range_has_zero_values() {
        let range = SpecMasterListRange {
            id: "Empty".to_string(),
            list_name: "Empty".to_string(),
            col_idx_code: 1,
            col_idx_value: 2,
            row_start: 4,
            row_end: 3,
        };
        assert_eq!(range.n_values(), 0);
        assert_eq!(range.master_formula(), "Master!$C$4:$C$3");
    }
}
