//! End-to-end template generation checked against the written XLSX package.

use std::io::{Cursor, Read};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use sheetforge_xlsx::spec::{SpecStyleColor, SpecStyleDirective, SpecStyleFill, SpecStyleFont};
use sheetforge_xlsx::style::encode_style_directive;
use sheetforge_xlsx::{
    C_XLSX_MIME_TYPE, DirectorySink, EnumRowData, EnumRowWidthRule, MemorySink, SpecArtifact,
    SpecTemplateOptions, SpecWorkbookListTemplate, generate_excel_template,
};

fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open xlsx package");
    let mut part = archive
        .by_name(name)
        .unwrap_or_else(|_| panic!("missing package part {name}"));
    let mut text = String::new();
    part.read_to_string(&mut text).expect("read package part");
    text
}

fn has_part(bytes: &[u8], name: &str) -> bool {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open xlsx package");
    archive.by_name(name).is_ok()
}

fn encoded_style(fill: &str, comment: Option<&str>) -> String {
    let directive = SpecStyleDirective {
        font: SpecStyleFont {
            name: Some("Calibri".to_string()),
            size: Some(11.0),
            color: None,
            bold: Some(true),
            italic: None,
            underline: None,
            alignment: None,
            fill: SpecStyleFill {
                fill_type: Some("pattern".to_string()),
                pattern: Some("solid".to_string()),
                fg_color: SpecStyleColor {
                    argb: fill.to_string(),
                },
            },
            border: Some(true),
            comment: comment.map(ToString::to_string),
        },
    };
    encode_style_directive(&directive).expect("encode style")
}

fn template_list(workbook: Value) -> SpecWorkbookListTemplate {
    serde_json::from_value(json!({
        "fetchExcelGenerate": [{"moduleCode": "M", "modulesWrkBook": [workbook]}]
    }))
    .expect("decode template")
}

fn two_column_template() -> SpecWorkbookListTemplate {
    template_list(json!({
        "exlWBName": "orders.xlsx",
        "workBooKSheets": [{
            "customIntegerOutput1": 3,
            "exlWBSheetName": "Orders",
            "wrkBookSheetsDtl": [
                {"exlWBSheetColDispName": "Reference"},
                {"exlWBSheetColDispName": "Status", "exlWBSheetColDSValue": "x~y"}
            ]
        }]
    }))
}

fn generate_one(
    list: &SpecWorkbookListTemplate,
    row_data: Option<&EnumRowData>,
    options: &SpecTemplateOptions,
) -> SpecArtifact {
    let mut sink = MemorySink::default();
    generate_excel_template(list, row_data, options, &mut sink).expect("generate");
    let mut l_artifacts = sink.into_artifacts();
    assert_eq!(l_artifacts.len(), 1);
    l_artifacts.remove(0)
}

#[test]
fn test_two_column_template_end_to_end() {
    let artifact = generate_one(
        &two_column_template(),
        None,
        &SpecTemplateOptions::default(),
    );
    assert_eq!(artifact.file_name, "orders.xlsx");
    assert_eq!(artifact.mime_type, C_XLSX_MIME_TYPE);

    let workbook_xml = read_part(&artifact.bytes, "xl/workbook.xml");
    assert!(workbook_xml.contains(r#"name="Orders""#));
    assert!(workbook_xml.contains(r#"name="Master""#));
    assert!(!workbook_xml.contains(r#"state="hidden""#));

    let data_xml = read_part(&artifact.bytes, "xl/worksheets/sheet1.xml");
    assert_eq!(data_xml.matches("<dataValidation ").count(), 1);
    assert!(data_xml.contains(r#"sqref="B2:B4""#));
    assert!(data_xml.contains("<formula1>Master!$C$4:$C$5</formula1>"));
    assert!(data_xml.contains(r#"errorTitle="Invalid input!""#));
    assert!(data_xml.contains(r#"error="Please choose an input from the master list""#));
    assert!(data_xml.contains(r#"showErrorMessage="1""#));

    let master_xml = read_part(&artifact.bytes, "xl/worksheets/sheet2.xml");
    assert!(master_xml.contains(r#"<mergeCell ref="B1:C1"/>"#));
    assert!(master_xml.contains(r#"<mergeCell ref="B2:C2"/>"#));
    assert!(master_xml.contains("<sheetProtection"));
    assert!(master_xml.contains(r#"r="C5""#));
    assert!(!master_xml.contains(r#"r="C6""#));

    let shared_strings = read_part(&artifact.bytes, "xl/sharedStrings.xml");
    for c_text in ["Reference", "Status", "used in Orders", "Sl No", ">x<", ">y<"] {
        assert!(shared_strings.contains(c_text), "missing {c_text:?}");
    }

    let styles_xml = read_part(&artifact.bytes, "xl/styles.xml");
    assert!(styles_xml.contains(r#"rgb="FF548235""#));
    assert!(styles_xml.contains(r#"rgb="FF2F75B5""#));
}

#[test]
fn test_second_and_third_lists_use_their_own_columns() {
    let list = template_list(json!({
        "exlWBName": "three.xlsx",
        "workBooKSheets": [{
            "customIntegerOutput1": 2,
            "exlWBSheetName": "S",
            "wrkBookSheetsDtl": [
                {"exlWBSheetColDispName": "A", "exlWBSheetColDSValue": "1~2"},
                {"exlWBSheetColDispName": "B", "exlWBSheetColDSValue": "p~q~r"},
                {"exlWBSheetColDispName": "C", "exlWBSheetColDSValue": "v~w~x~y~z"}
            ]
        }]
    }));

    let artifact = generate_one(&list, None, &SpecTemplateOptions::default());

    let data_xml = read_part(&artifact.bytes, "xl/worksheets/sheet1.xml");
    assert!(data_xml.contains("<formula1>Master!$C$4:$C$5</formula1>"));
    assert!(data_xml.contains("<formula1>Master!$F$4:$F$6</formula1>"));
    assert!(data_xml.contains("<formula1>Master!$I$4:$I$8</formula1>"));
    assert!(data_xml.contains(r#"sqref="C2:C3""#));

    let master_xml = read_part(&artifact.bytes, "xl/worksheets/sheet2.xml");
    assert!(master_xml.contains(r#"<mergeCell ref="H1:I1"/>"#));
    assert!(master_xml.contains(r#"r="I8""#));
}

#[test]
fn test_malformed_style_leaves_siblings_styled() {
    let list = template_list(json!({
        "exlWBName": "styled.xlsx",
        "workBooKSheets": [{
            "customIntegerOutput1": 1,
            "exlWBSheetName": "S",
            "wrkBookSheetsDtl": [
                {"exlWBSheetColDispName": "Broken", "exlWBSheetColFormat": "{not a directive"},
                {
                    "exlWBSheetColDispName": "Green",
                    "exlWBSheetColFormat": encoded_style("#00B050", Some("Pick a shade"))
                },
                {"exlWBSheetColDispName": "Plain", "exlWBSheetColFormat": ""}
            ]
        }]
    }));
    let mut sink = MemorySink::default();

    let l_reports =
        generate_excel_template(&list, None, &SpecTemplateOptions::default(), &mut sink)
            .expect("generate");

    assert_eq!(l_reports[0].warnings.len(), 1);
    assert!(l_reports[0].warnings[0].contains("\"Broken\""));

    let bytes = &sink.artifacts[0].bytes;
    let styles_xml = read_part(bytes, "xl/styles.xml");
    assert!(styles_xml.contains(r#"rgb="FF00B050""#));
    assert!(has_part(bytes, "xl/comments1.xml"));
    assert!(read_part(bytes, "xl/comments1.xml").contains("Pick a shade"));
}

#[test]
fn test_hidden_master_sheet_and_no_error_dialog() {
    let options = SpecTemplateOptions {
        if_display_master_sheet: false,
        if_show_error_message: false,
        ..Default::default()
    };

    let artifact = generate_one(&two_column_template(), None, &options);

    let workbook_xml = read_part(&artifact.bytes, "xl/workbook.xml");
    assert!(workbook_xml.contains(r#"name="Master""#));
    assert!(workbook_xml.contains(r#"state="hidden""#));

    let data_xml = read_part(&artifact.bytes, "xl/worksheets/sheet1.xml");
    assert!(data_xml.contains("<formula1>Master!$C$4:$C$5</formula1>"));
    assert!(!data_xml.contains(r#"showErrorMessage="1""#));

    let master_xml = read_part(&artifact.bytes, "xl/worksheets/sheet2.xml");
    assert!(master_xml.contains("<sheetProtection"));
}

#[test]
fn test_hidden_master_sheet_skipped_without_lists() {
    let list = template_list(json!({
        "exlWBName": "plain.xlsx",
        "workBooKSheets": [{
            "exlWBSheetName": "S",
            "wrkBookSheetsDtl": [{"exlWBSheetColDispName": "Only"}]
        }]
    }));
    let options = SpecTemplateOptions {
        if_display_master_sheet: false,
        ..Default::default()
    };

    let artifact = generate_one(&list, None, &options);

    let workbook_xml = read_part(&artifact.bytes, "xl/workbook.xml");
    assert!(!workbook_xml.contains(r#"name="Master""#));
    assert!(!has_part(&artifact.bytes, "xl/worksheets/sheet2.xml"));
}

#[test]
fn test_row_data_written_below_headers() {
    let row_data = EnumRowData::from_json_str(
        r#"{"Orders": [{"ref": "R-1", "status": "x"}, {"ref": 42, "status": null}]}"#,
    )
    .expect("row data");
    let options = SpecTemplateOptions {
        rule_row_width: EnumRowWidthRule::RunningMax,
        ..Default::default()
    };

    let artifact = generate_one(&two_column_template(), Some(&row_data), &options);

    let data_xml = read_part(&artifact.bytes, "xl/worksheets/sheet1.xml");
    assert!(data_xml.contains(r#"<c r="A2""#));
    assert!(data_xml.contains(r#"<c r="B2""#));
    assert!(data_xml.contains("<v>42</v>"));
    assert!(!data_xml.contains(r#"<c r="B3""#));

    let shared_strings = read_part(&artifact.bytes, "xl/sharedStrings.xml");
    assert!(shared_strings.contains("R-1"));
}

#[test]
fn test_flat_row_data_fills_every_sheet() {
    let list = template_list(json!({
        "exlWBName": "flat.xlsx",
        "workBooKSheets": [
            {"exlWBSheetName": "S1", "wrkBookSheetsDtl": [{"exlWBSheetColDispName": "h"}]},
            {"exlWBSheetName": "S2", "wrkBookSheetsDtl": [{"exlWBSheetColDispName": "h"}]}
        ]
    }));
    let row_data = EnumRowData::from_json_str(r#"[{"h": "ROWVAL"}]"#).expect("row data");

    let artifact = generate_one(&list, Some(&row_data), &SpecTemplateOptions::default());

    for c_part in ["xl/worksheets/sheet1.xml", "xl/worksheets/sheet2.xml"] {
        let data_xml = read_part(&artifact.bytes, c_part);
        assert!(data_xml.contains(r#"<c r="A2""#), "{c_part} has no A2");
        assert!(!data_xml.contains(r#"<c r="A3""#));
    }
    assert!(read_part(&artifact.bytes, "xl/sharedStrings.xml").contains("ROWVAL"));
}

#[test]
fn test_sheet_named_master_does_not_collide() {
    let list = template_list(json!({
        "exlWBName": "clash.xlsx",
        "workBooKSheets": [{
            "customIntegerOutput1": 1,
            "exlWBSheetName": "Master",
            "wrkBookSheetsDtl": [{"exlWBSheetColDispName": "K", "exlWBSheetColDSValue": "a~b"}]
        }]
    }));
    let mut sink = MemorySink::default();

    let l_reports =
        generate_excel_template(&list, None, &SpecTemplateOptions::default(), &mut sink)
            .expect("generate");

    assert_eq!(l_reports[0].sheets[0].sheet_name, "Master__2");
    let workbook_xml = read_part(&sink.artifacts[0].bytes, "xl/workbook.xml");
    assert!(workbook_xml.contains(r#"name="Master__2""#));
    assert!(workbook_xml.contains(r#"name="Master""#));
}

#[test]
fn test_directory_sink_receives_every_workbook() {
    let list: SpecWorkbookListTemplate = serde_json::from_value(json!({
        "fetchExcelGenerate": [
            {"modulesWrkBook": [{"exlWBName": "one.xlsx"}]},
            {"modulesWrkBook": [{"exlWBName": "two.xlsx"}]}
        ]
    }))
    .expect("decode template");
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sink = DirectorySink::new(dir.path());

    generate_excel_template(&list, None, &SpecTemplateOptions::default(), &mut sink)
        .expect("generate");

    for c_name in ["one.xlsx", "two.xlsx"] {
        let bytes = std::fs::read(dir.path().join(c_name)).expect("read workbook");
        assert!(bytes.starts_with(b"PK"));
    }
}

#[test]
fn test_invalid_file_name_aborts_generation() {
    let list = template_list(json!({"exlWBName": "../escape.xlsx"}));
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sink = DirectorySink::new(dir.path());

    let result = generate_excel_template(&list, None, &SpecTemplateOptions::default(), &mut sink);

    assert!(matches!(result, Err(sheetforge_xlsx::TemplateError::Sink(_))));
}
