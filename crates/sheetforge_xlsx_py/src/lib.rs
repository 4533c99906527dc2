use std::collections::BTreeMap;

use pyo3::exceptions::{PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;
use sheetforge_xlsx::{
    EnumRowData, EnumRowWidthRule, MemorySink, SinkError, SpecJsonColumn, SpecRow,
    SpecTemplateOptions, SpecTemplateReport, SpecWorkbookListTemplate, TemplateError,
    derive_column_label, export_json_rows, generate_excel_template,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "sheetforge.xlsx.template.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "TemplateReport")]
#[derive(Debug, Clone)]
struct PyTemplateReport {
    #[pyo3(get)]
    workbook_name: String,
    #[pyo3(get)]
    sheet_names: Vec<String>,
    #[pyo3(get)]
    master_formulas: Vec<String>,
    #[pyo3(get)]
    warnings: Vec<String>,
}

impl From<SpecTemplateReport> for PyTemplateReport {
    fn from(report: SpecTemplateReport) -> Self {
        Self {
            workbook_name: report.workbook_name,
            sheet_names: report
                .sheets
                .into_iter()
                .map(|sheet| sheet.sheet_name)
                .collect(),
            master_formulas: report
                .master_lists
                .iter()
                .map(|range| range.master_formula())
                .collect(),
            warnings: report.warnings,
        }
    }
}

#[pymethods]
impl PyTemplateReport {
    #[getter]
    fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    fn to_dict(&self) -> BTreeMap<String, usize> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_sheets".to_string(), self.sheet_names.len());
        dict_counts.insert("cnt_master_lists".to_string(), self.master_formulas.len());
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count());
        dict_counts
    }

    fn __str__(&self) -> String {
        format!(
            "[TEMPLATE] {} sheets={} master_lists={} warnings={}",
            self.workbook_name,
            self.sheet_names.len(),
            self.master_formulas.len(),
            self.warning_count()
        )
    }
}

fn parse_rule_row_width(value: &str) -> PyResult<EnumRowWidthRule> {
    match value {
        "running_max" => Ok(EnumRowWidthRule::RunningMax),
        "last_row" => Ok(EnumRowWidthRule::LastRow),
        _ => Err(PyValueError::new_err(format!(
            "Invalid row width rule: `{value}`. Expected one of: ['running_max', 'last_row']"
        ))),
    }
}

fn map_template_error(exception: TemplateError) -> PyErr {
    match exception {
        TemplateError::InvalidJson(err) => PyValueError::new_err(format!("Invalid JSON: {err}")),
        TemplateError::IndexOverflow { .. } => PyValueError::new_err(exception.to_string()),
        TemplateError::Xlsx(err) => PyRuntimeError::new_err(format!("xlsx write error: {err}")),
        TemplateError::Sink(SinkError::Io { .. }) => PyOSError::new_err(exception.to_string()),
        TemplateError::Sink(err) => PyRuntimeError::new_err(err.to_string()),
    }
}

#[pyfunction(name = "generate_excel_template")]
#[pyo3(signature = (
    template_json,
    row_data_json = None,
    display_master_sheet = true,
    with_error_validation = true,
    row_width_rule = "running_max"
))]
fn generate_excel_template_py(
    py: Python<'_>,
    template_json: &str,
    row_data_json: Option<&str>,
    display_master_sheet: bool,
    with_error_validation: bool,
    row_width_rule: &str,
) -> PyResult<Vec<(String, Py<PyBytes>, PyTemplateReport)>> {
    let list = SpecWorkbookListTemplate::from_json_str(template_json).map_err(map_template_error)?;
    let row_data = row_data_json
        .map(EnumRowData::from_json_str)
        .transpose()
        .map_err(map_template_error)?;
    let options = SpecTemplateOptions {
        if_display_master_sheet: display_master_sheet,
        if_show_error_message: with_error_validation,
        rule_row_width: parse_rule_row_width(row_width_rule)?,
        ..Default::default()
    };

    let (sink, l_reports) = py
        .allow_threads(|| {
            let mut sink = MemorySink::default();
            generate_excel_template(&list, row_data.as_ref(), &options, &mut sink)
                .map(|l_reports| (sink, l_reports))
        })
        .map_err(map_template_error)?;

    Ok(sink
        .into_artifacts()
        .into_iter()
        .zip(l_reports)
        .map(|(artifact, report)| {
            (
                artifact.file_name,
                PyBytes::new(py, &artifact.bytes).unbind(),
                PyTemplateReport::from(report),
            )
        })
        .collect())
}

#[pyfunction(name = "generate_excel_from_json")]
fn generate_excel_from_json_py(
    py: Python<'_>,
    rows_json: &str,
    columns_json: &str,
    excel_name: &str,
) -> PyResult<(String, Py<PyBytes>)> {
    let rows: Vec<SpecRow> = serde_json::from_str(rows_json)
        .map_err(|err| map_template_error(TemplateError::InvalidJson(err)))?;
    let columns: Vec<SpecJsonColumn> = serde_json::from_str(columns_json)
        .map_err(|err| map_template_error(TemplateError::InvalidJson(err)))?;

    let sink = py
        .allow_threads(|| {
            let mut sink = MemorySink::default();
            export_json_rows(&rows, &columns, excel_name, &mut sink).map(|()| sink)
        })
        .map_err(map_template_error)?;

    let artifact = sink
        .into_artifacts()
        .pop()
        .ok_or_else(|| PyRuntimeError::new_err("Export produced no workbook."))?;
    Ok((artifact.file_name, PyBytes::new(py, &artifact.bytes).unbind()))
}

#[pyfunction(name = "column_label")]
fn column_label_py(index: usize) -> String {
    derive_column_label(index)
}

#[pymodule]
fn _sheetforge_xlsx_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyTemplateReport>()?;
    module.add_function(wrap_pyfunction!(generate_excel_template_py, module)?)?;
    module.add_function(wrap_pyfunction!(generate_excel_from_json_py, module)?)?;
    module.add_function(wrap_pyfunction!(column_label_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}

