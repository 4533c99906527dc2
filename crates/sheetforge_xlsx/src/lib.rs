//! `sheetforge_xlsx` v1:
//! Rust-side XLSX template generation kernel.
//!
//! Turns JSON workbook templates into workbooks with styled headers, a
//! `Master` sheet of permitted values, and dropdown validation.
//!
//! Modules:
//! - `conf`   : constants and default presets
//! - `spec`   : template/row-data models, options, reports, errors
//! - `util`   : coordinate allocation, master-list planning, pure helpers
//! - `style`  : style directive decoding and format derivation
//! - `writer` : workbook writer kernel and generation entry points
//! - `sink`   : artifact delivery targets
pub mod conf;
pub mod sink;
pub mod spec;
pub mod style;
pub mod util;
pub mod writer;

pub use conf::{
    C_MASTER_SHEET_NAME, C_XLSX_MIME_TYPE, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL, derive_default_master_formats,
    derive_default_template_options,
};
pub use sink::{ArtifactSink, DirectorySink, MemorySink};
pub use spec::{
    EnumRowData, EnumRowWidthRule, SinkError, SpecArtifact, SpecCellFormat, SpecColumnTemplate,
    SpecJsonColumn, SpecMasterListRange, SpecMasterListRecord, SpecMasterRangeLookup, SpecRow,
    SpecSheetTemplate, SpecStyleDirective, SpecTemplateOptions, SpecTemplateReport,
    SpecTemplateSheet, SpecWorkbookListTemplate, SpecWorkbookTemplate, StyleDirectiveError,
    TemplateError,
};
pub use style::{decode_style_directive, derive_color, derive_comment, derive_header_format};
pub use util::{
    derive_absolute_cell_address, derive_cell_address, derive_column_label,
    plan_master_list_ranges, plan_master_lists, sanitize_sheet_name,
};
pub use writer::{
    TemplateXlsxWriter, export_json_rows, generate_excel_template, generate_workbook,
    generate_workbook_from_json,
};
