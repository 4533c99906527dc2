//! sheetforge CLI - generate dropdown-validated XLSX templates from JSON

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use sheetforge_xlsx::{
    DirectorySink, EnumRowData, EnumRowWidthRule, SpecJsonColumn, SpecRow, SpecTemplateOptions,
    SpecWorkbookListTemplate, derive_column_label, export_json_rows, generate_excel_template,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetforge")]
#[command(
    author,
    version,
    about = "Generate XLSX templates with master lists and dropdown validation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate every workbook described by a template JSON file
    Template {
        /// Template JSON file (`fetchExcelGenerate` payload)
        template: PathBuf,

        /// Row data JSON file (object keyed by sheet name, or a flat array)
        #[arg(short, long)]
        rows: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Write the master sheet hidden and unstyled
        #[arg(long)]
        hide_master_sheet: bool,

        /// Accept out-of-list input without an error dialog
        #[arg(long)]
        no_error_message: bool,

        /// How row data widens columns
        #[arg(long, value_enum, default_value_t = WidthRule::RunningMax)]
        width_rule: WidthRule,

        /// Print generation reports as JSON to stdout
        #[arg(long)]
        report: bool,
    },

    /// Export a JSON array of row objects to a single-sheet workbook
    Json {
        /// Rows JSON file
        rows: PathBuf,

        /// Columns JSON file (`[{"header", "key", "width"}]`)
        #[arg(short, long)]
        columns: PathBuf,

        /// Output file name
        #[arg(short, long)]
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Print spreadsheet column labels for zero-based indices
    ColumnLabel {
        /// Zero-based column indices
        #[arg(required = true)]
        indices: Vec<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum WidthRule {
    LastRow,
    RunningMax,
}

impl From<WidthRule> for EnumRowWidthRule {
    fn from(rule: WidthRule) -> Self {
        match rule {
            WidthRule::LastRow => EnumRowWidthRule::LastRow,
            WidthRule::RunningMax => EnumRowWidthRule::RunningMax,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Template {
            template,
            rows,
            out_dir,
            hide_master_sheet,
            no_error_message,
            width_rule,
            report,
        } => {
            let options = SpecTemplateOptions {
                if_display_master_sheet: !hide_master_sheet,
                if_show_error_message: !no_error_message,
                rule_row_width: width_rule.into(),
                ..Default::default()
            };
            run_template(&template, rows.as_deref(), out_dir, &options, report)
        }
        Commands::Json {
            rows,
            columns,
            name,
            out_dir,
        } => run_json(&rows, &columns, &name, out_dir),
        Commands::ColumnLabel { indices } => {
            for index in indices {
                println!("{index}\t{}", derive_column_label(index));
            }
            Ok(())
        }
    }
}

fn run_template(
    template_path: &Path,
    rows_path: Option<&Path>,
    out_dir: PathBuf,
    options: &SpecTemplateOptions,
    if_print_report: bool,
) -> Result<()> {
    let list = SpecWorkbookListTemplate::from_json_str(&read_text(template_path)?)
        .with_context(|| format!("Failed to parse template '{}'", template_path.display()))?;
    let row_data = match rows_path {
        Some(path) => Some(
            EnumRowData::from_json_str(&read_text(path)?)
                .with_context(|| format!("Failed to parse row data '{}'", path.display()))?,
        ),
        None => None,
    };

    let mut sink = DirectorySink::new(out_dir);
    let l_reports = generate_excel_template(&list, row_data.as_ref(), options, &mut sink)
        .context("Failed to generate workbooks")?;

    if l_reports.is_empty() {
        bail!(
            "Template '{}' describes no workbooks",
            template_path.display()
        );
    }
    for (report, path) in l_reports.iter().zip(sink.paths_written()) {
        for warning in &report.warnings {
            eprintln!("Warning: {}: {warning}", report.workbook_name);
        }
        eprintln!(
            "Wrote {} sheet(s), {} master list(s) to '{}'",
            report.sheets.len(),
            report.master_lists.len(),
            path.display()
        );
    }
    if if_print_report {
        println!("{}", serde_json::to_string_pretty(&l_reports)?);
    }
    Ok(())
}

fn run_json(rows_path: &Path, columns_path: &Path, name: &str, out_dir: PathBuf) -> Result<()> {
    let rows: Vec<SpecRow> = serde_json::from_str(&read_text(rows_path)?)
        .with_context(|| format!("Failed to parse rows '{}'", rows_path.display()))?;
    let columns: Vec<SpecJsonColumn> = serde_json::from_str(&read_text(columns_path)?)
        .with_context(|| format!("Failed to parse columns '{}'", columns_path.display()))?;

    let mut sink = DirectorySink::new(out_dir);
    export_json_rows(&rows, &columns, name, &mut sink).context("Failed to export rows")?;

    for path in sink.paths_written() {
        eprintln!("Wrote {} rows to '{}'", rows.len(), path.display());
    }
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
}
