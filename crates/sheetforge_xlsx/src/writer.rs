//! XLSX writer kernel that turns workbook templates into dropdown-validated workbooks.

use std::collections::{BTreeMap, BTreeSet};

use rust_xlsxwriter::{DataValidation, Format, Formula, Note, Workbook, Worksheet};
use serde_json::Value;

use crate::conf::{
    C_JSON_EXPORT_SHEET_NAME, C_MASTER_SHEET_NAME, C_VALIDATION_ERROR_MESSAGE,
    C_VALIDATION_ERROR_TITLE, C_XLSX_MIME_TYPE, N_NROWS_EXCEL_MAX, N_TEMPLATE_ROW_DATA_START,
    derive_default_master_formats,
};
use crate::sink::ArtifactSink;
use crate::spec::{
    EnumRowData, SpecArtifact, SpecColumnTemplate, SpecJsonColumn, SpecMasterListRange,
    SpecMasterListRecord, SpecMasterRangeLookup, SpecRow, SpecSheetTemplate, SpecTemplateOptions,
    SpecTemplateReport, SpecTemplateSheet, SpecWorkbookListTemplate, SpecWorkbookTemplate,
    TemplateError,
};
use crate::style::{
    decode_style_directive, derive_comment, derive_header_format, derive_rust_xlsx_format,
};
use crate::util::{
    create_sheet_identifier, derive_master_column_widths, derive_text_width,
    plan_master_list_ranges, plan_master_lists, plan_row_data_widths, sanitize_sheet_name,
};

////////////////////////////////////////////////////////////////////////////////
// #region TemplateWriter

/// Stateful writer for one template workbook.
///
/// The workbook is buffered in memory until [`Self::finish`] serializes it.
pub struct TemplateXlsxWriter {
    workbook: Workbook,
    options: SpecTemplateOptions,
    set_sheet_names_existing: BTreeSet<String>,
    report: SpecTemplateReport,
}

impl TemplateXlsxWriter {
    /// Create a writer; the master sheet name is reserved up front.
    pub fn new(workbook_name: &str, options: SpecTemplateOptions) -> Self {
        let mut set_sheet_names_existing = BTreeSet::new();
        set_sheet_names_existing.insert(C_MASTER_SHEET_NAME.to_lowercase());

        Self {
            workbook: Workbook::new(),
            options,
            set_sheet_names_existing,
            report: SpecTemplateReport {
                workbook_name: workbook_name.to_string(),
                ..Default::default()
            },
        }
    }

    /// Report accumulated so far.
    pub fn report(&self) -> &SpecTemplateReport {
        &self.report
    }

    /// Log and record a non-fatal warning.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        log::warn!("{}: {}", self.report.workbook_name, msg.as_ref());
        self.report.warn(msg);
    }

    /// Write one template sheet: styled headers, dropdown validations, then `rows`.
    pub fn write_template_sheet(
        &mut self,
        sheet: &SpecSheetTemplate,
        lookup: &SpecMasterRangeLookup,
        rows: Option<&[SpecRow]>,
        if_fit_row_widths: bool,
    ) -> Result<(), TemplateError> {
        let sheet_name = self.derive_unique_sheet_name(&sanitize_sheet_name(&sheet.sheet_name, "_"));
        if sheet_name != sheet.sheet_name {
            log::debug!("Sheet {:?} written as {sheet_name:?}", sheet.sheet_name);
        }

        let mut worksheet = Worksheet::new();
        worksheet.set_name(&sheet_name)?;

        let n_rows_validated = self.derive_validation_row_count(sheet);
        let mut l_header_widths = Vec::with_capacity(sheet.columns.len());

        for (n_idx_col, column) in sheet.columns.iter().enumerate() {
            let n_col = cast_col_num(n_idx_col)?;
            let (fmt_header, comment) = self.derive_column_header_style(&sheet_name, column);

            match &fmt_header {
                Some(format) => {
                    worksheet.write_string_with_format(0, n_col, &column.display_name, format)?;
                }
                None => {
                    worksheet.write_string(0, n_col, &column.display_name)?;
                }
            }
            if let Some(c_comment) = comment {
                worksheet.insert_note(0, n_col, &Note::new(c_comment).add_author_prefix(false))?;
            }

            let n_width = derive_text_width(&column.display_name) + self.options.width_cell_padding;
            worksheet.set_column_width(n_col, n_width as f64)?;
            l_header_widths.push(n_width);

            if column.master_values_raw().is_none() {
                continue;
            }
            let Some(range) = lookup.get(&column.display_name) else {
                log::debug!(
                    "Column {:?} on {sheet_name:?} has no master list",
                    column.display_name
                );
                continue;
            };
            if range.n_values() == 0 {
                self.warn(format!(
                    "Master list {:?} has no values; column on sheet {sheet_name:?} left unvalidated.",
                    range.list_name
                ));
                continue;
            }
            if n_rows_validated == 0 {
                continue;
            }

            let validation = self.derive_list_validation(range)?;
            worksheet.add_data_validation(
                cast_row_num(N_TEMPLATE_ROW_DATA_START - 1)?,
                n_col,
                cast_row_num(n_rows_validated)?,
                n_col,
                &validation,
            )?;
        }

        let n_rows_data = match rows {
            Some(l_rows) => {
                write_row_data(&mut worksheet, l_rows)?;
                if if_fit_row_widths {
                    let dict_width_by_col = plan_row_data_widths(
                        &l_header_widths,
                        l_rows,
                        self.options.rule_row_width,
                        self.options.width_cell_padding,
                    );
                    for (n_idx_col, n_width) in dict_width_by_col {
                        worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width as f64)?;
                    }
                }
                l_rows.len()
            }
            None => 0,
        };

        self.workbook.push_worksheet(worksheet);
        self.report.sheets.push(SpecTemplateSheet {
            template_name: sheet.sheet_name.clone(),
            sheet_name,
            n_cols: sheet.columns.len(),
            n_rows_validated,
            n_rows_data,
        });
        Ok(())
    }

    /// Write the master sheet holding every list at its planned coordinates.
    ///
    /// Styled and visible when `if_display_master_sheet`; otherwise plain,
    /// hidden, and only written when some list exists.
    pub fn write_master_sheet(
        &mut self,
        records: &[SpecMasterListRecord],
        ranges: &[SpecMasterListRange],
    ) -> Result<(), TemplateError> {
        let if_display = self.options.if_display_master_sheet;
        if !if_display && records.is_empty() {
            return Ok(());
        }

        let dict_fmt = if if_display {
            derive_default_master_formats()
        } else {
            BTreeMap::new()
        };
        let derive_format = |key: &str| -> Format {
            dict_fmt
                .get(key)
                .map(derive_rust_xlsx_format)
                .unwrap_or_else(Format::new)
        };
        let fmt_name = derive_format("name");
        let fmt_usage = derive_format("usage");
        let fmt_header = derive_format("header");
        let fmt_code = derive_format("code");
        let fmt_value = derive_format("value");

        let mut worksheet = Worksheet::new();
        worksheet.set_name(C_MASTER_SHEET_NAME)?;

        for (record, range) in records.iter().zip(ranges) {
            let n_col_code = cast_col_num(range.col_idx_code)?;
            let n_col_value = cast_col_num(range.col_idx_value)?;

            worksheet.merge_range(0, n_col_code, 0, n_col_value, &record.list_name, &fmt_name)?;
            worksheet.merge_range(1, n_col_code, 1, n_col_value, &record.usage, &fmt_usage)?;
            worksheet.write_string_with_format(2, n_col_code, &record.header.code, &fmt_header)?;
            worksheet.write_string_with_format(
                2,
                n_col_value,
                &record.header.value,
                &fmt_header,
            )?;
            if let Some(c_comment) = &record.header.comment {
                worksheet.insert_note(
                    2,
                    n_col_value,
                    &Note::new(c_comment).add_author_prefix(false),
                )?;
            }

            for (n_idx, item) in record.values.iter().enumerate() {
                let n_row = cast_row_num(range.row_start - 1 + n_idx)?;
                worksheet.write_number_with_format(n_row, n_col_code, item.code as f64, &fmt_code)?;
                worksheet.write_string_with_format(n_row, n_col_value, &item.value, &fmt_value)?;
            }

            let (n_width_code, n_width_value) = derive_master_column_widths(record);
            let n_padding = self.options.width_cell_padding;
            worksheet.set_column_width(n_col_code, (n_width_code + n_padding) as f64)?;
            worksheet.set_column_width(n_col_value, (n_width_value + n_padding) as f64)?;
        }

        if !if_display {
            worksheet.set_hidden(true);
        }
        worksheet.protect();
        self.workbook.push_worksheet(worksheet);
        Ok(())
    }

    /// Serialize the workbook and hand back the final report.
    pub fn finish(mut self) -> Result<(Vec<u8>, SpecTemplateReport), TemplateError> {
        let bytes = self.workbook.save_to_buffer()?;
        Ok((bytes, self.report))
    }

    fn derive_column_header_style(
        &mut self,
        sheet_name: &str,
        column: &SpecColumnTemplate,
    ) -> (Option<Format>, Option<String>) {
        let Some(raw) = column
            .style_directive
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
        else {
            log::debug!("Column {:?} has no style directive", column.display_name);
            return (None, None);
        };

        let directive = match decode_style_directive(raw) {
            Ok(directive) => directive,
            Err(err) => {
                self.warn(format!(
                    "Column {:?} on sheet {sheet_name:?} left unstyled: {err}",
                    column.display_name
                ));
                return (None, None);
            }
        };

        let comment = derive_comment(&directive).map(ToString::to_string);
        match derive_header_format(&directive) {
            Ok(format) => (Some(format), comment),
            Err(err) => {
                self.warn(format!(
                    "Column {:?} on sheet {sheet_name:?} left unstyled: {err}",
                    column.display_name
                ));
                (None, comment)
            }
        }
    }

    fn derive_validation_row_count(&mut self, sheet: &SpecSheetTemplate) -> usize {
        let n_rows = sheet.n_rows_validation();
        let n_rows_max = N_NROWS_EXCEL_MAX - (N_TEMPLATE_ROW_DATA_START - 1);
        if n_rows > n_rows_max {
            self.warn(format!(
                "Sheet {:?} validation rows clamped from {n_rows} to {n_rows_max}.",
                sheet.sheet_name
            ));
            return n_rows_max;
        }
        n_rows
    }

    fn derive_list_validation(
        &self,
        range: &SpecMasterListRange,
    ) -> Result<DataValidation, TemplateError> {
        Ok(DataValidation::new()
            .allow_list_formula(Formula::new(range.master_formula()))
            .ignore_blank(true)
            .show_error_message(self.options.if_show_error_message)
            .set_error_title(C_VALIDATION_ERROR_TITLE)?
            .set_error_message(C_VALIDATION_ERROR_MESSAGE)?)
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        let c_key = name.to_lowercase();
        if !self.set_sheet_names_existing.contains(&c_key) {
            self.set_sheet_names_existing.insert(c_key);
            return name.to_string();
        }

        let mut n_idx = 2usize;
        loop {
            let candidate = create_sheet_identifier(name, n_idx);
            let c_key_candidate = candidate.to_lowercase();
            if !self.set_sheet_names_existing.contains(&c_key_candidate) {
                self.set_sheet_names_existing.insert(c_key_candidate);
                return candidate;
            }
            n_idx += 1;
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Generation

/// Build one template workbook in memory.
pub fn generate_workbook(
    template: &SpecWorkbookTemplate,
    row_data: Option<&EnumRowData>,
    options: &SpecTemplateOptions,
) -> Result<(Vec<u8>, SpecTemplateReport), TemplateError> {
    log::debug!(
        "Generating workbook {:?} with {} sheet(s)",
        template.workbook_name,
        template.sheets.len()
    );

    let l_records = plan_master_lists(&template.sheets);
    let lookup = SpecMasterRangeLookup::new(plan_master_list_ranges(&l_records));

    let mut writer = TemplateXlsxWriter::new(&template.workbook_name, options.clone());
    for id in lookup.duplicate_ids() {
        writer.warn(format!(
            "Duplicate master list {id:?}; validations use its first occurrence."
        ));
    }

    let l_rows_by_sheet = derive_rows_by_sheet(&template.sheets, row_data, &mut writer);
    let if_fit_row_widths = matches!(row_data, Some(EnumRowData::BySheet(_)));
    for (sheet, rows) in template.sheets.iter().zip(l_rows_by_sheet) {
        writer.write_template_sheet(sheet, &lookup, rows, if_fit_row_widths)?;
    }

    writer.write_master_sheet(&l_records, lookup.ranges())?;
    writer.report.master_lists = lookup.ranges().to_vec();
    writer.finish()
}

/// Generate every workbook in `list` and deliver each to `sink`, in order.
///
/// The first failure aborts the call.
pub fn generate_excel_template(
    list: &SpecWorkbookListTemplate,
    row_data: Option<&EnumRowData>,
    options: &SpecTemplateOptions,
    sink: &mut dyn ArtifactSink,
) -> Result<Vec<SpecTemplateReport>, TemplateError> {
    let mut l_reports = Vec::new();
    for template in list.workbooks() {
        let (bytes, report) = generate_workbook(template, row_data, options)?;
        sink.deliver(SpecArtifact {
            file_name: template.workbook_name.clone(),
            mime_type: C_XLSX_MIME_TYPE.to_string(),
            bytes,
        })?;
        l_reports.push(report);
    }
    Ok(l_reports)
}

/// Build a single-sheet workbook from plain row objects.
pub fn generate_workbook_from_json(
    rows: &[SpecRow],
    columns: &[SpecJsonColumn],
) -> Result<Vec<u8>, TemplateError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(C_JSON_EXPORT_SHEET_NAME)?;

    for (n_idx_col, column) in columns.iter().enumerate() {
        let n_col = cast_col_num(n_idx_col)?;
        worksheet.write_string(0, n_col, &column.header)?;
        if let Some(width) = column.width {
            worksheet.set_column_width(n_col, width)?;
        }
    }

    for (n_idx_row, row) in rows.iter().enumerate() {
        let n_row = cast_row_num(N_TEMPLATE_ROW_DATA_START - 1 + n_idx_row)?;
        for (n_idx_col, column) in columns.iter().enumerate() {
            if let Some(value) = row.get(&column.key) {
                write_json_value(worksheet, n_row, cast_col_num(n_idx_col)?, value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Export plain row objects and deliver the workbook as `excel_name`.
pub fn export_json_rows(
    rows: &[SpecRow],
    columns: &[SpecJsonColumn],
    excel_name: &str,
    sink: &mut dyn ArtifactSink,
) -> Result<(), TemplateError> {
    let bytes = generate_workbook_from_json(rows, columns)?;
    sink.deliver(SpecArtifact {
        file_name: excel_name.to_string(),
        mime_type: C_XLSX_MIME_TYPE.to_string(),
        bytes,
    })?;
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellWrites

/// Assign row data to template sheets by position.
///
/// Sheet-keyed rows go to the first sheet with that template name; flat rows
/// go to every sheet.
fn derive_rows_by_sheet<'a>(
    sheets: &[SpecSheetTemplate],
    row_data: Option<&'a EnumRowData>,
    writer: &mut TemplateXlsxWriter,
) -> Vec<Option<&'a [SpecRow]>> {
    let mut l_rows_by_sheet = vec![None; sheets.len()];
    match row_data {
        None => {}
        Some(EnumRowData::Flat(_)) if sheets.is_empty() => {
            writer.warn("Row data supplied but the workbook has no sheets.")
        }
        Some(EnumRowData::Flat(l_rows)) => l_rows_by_sheet.fill(Some(l_rows.as_slice())),
        Some(EnumRowData::BySheet(l_sheet_rows)) => {
            for (c_sheet_name, l_rows) in l_sheet_rows {
                match sheets
                    .iter()
                    .position(|sheet| &sheet.sheet_name == c_sheet_name)
                {
                    Some(n_idx) => l_rows_by_sheet[n_idx] = Some(l_rows.as_slice()),
                    None => writer.warn(format!(
                        "Row data for sheet {c_sheet_name:?} matches no template sheet."
                    )),
                }
            }
        }
    }
    l_rows_by_sheet
}

fn write_row_data(worksheet: &mut Worksheet, rows: &[SpecRow]) -> Result<(), TemplateError> {
    for (n_idx_row, row) in rows.iter().enumerate() {
        let n_row = cast_row_num(N_TEMPLATE_ROW_DATA_START - 1 + n_idx_row)?;
        for (n_idx_col, value) in row.values().enumerate() {
            write_json_value(worksheet, n_row, cast_col_num(n_idx_col)?, value)?;
        }
    }
    Ok(())
}

fn write_json_value(
    worksheet: &mut Worksheet,
    n_row: u32,
    n_col: u16,
    value: &Value,
) -> Result<(), TemplateError> {
    match value {
        Value::Null => {}
        Value::Bool(val) => {
            worksheet.write_boolean(n_row, n_col, *val)?;
        }
        Value::Number(val) => match val.as_f64() {
            Some(n_val) => {
                worksheet.write_number(n_row, n_col, n_val)?;
            }
            None => {
                worksheet.write_string(n_row, n_col, val.to_string())?;
            }
        },
        Value::String(val) => {
            worksheet.write_string(n_row, n_col, val)?;
        }
        Value::Array(_) | Value::Object(_) => {
            worksheet.write_string(n_row, n_col, value.to_string())?;
        }
    }
    Ok(())
}

fn cast_row_num(value: usize) -> Result<u32, TemplateError> {
    u32::try_from(value).map_err(|_| TemplateError::IndexOverflow {
        axis: "row",
        value,
    })
}

fn cast_col_num(value: usize) -> Result<u16, TemplateError> {
    u16::try_from(value).map_err(|_| TemplateError::IndexOverflow {
        axis: "column",
        value,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
