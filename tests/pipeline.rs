//! Offline integration tests: raw model text → records → workbook.
//!
//! No network calls are made. The inference stage is represented by the raw
//! text it would return; the workbook is read back with calamine.

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use chrono::NaiveDate;
use edgequake_attendance::pipeline::export::{export, write_xlsx};
use edgequake_attendance::pipeline::infer::RawResponse;
use edgequake_attendance::{
    build_table, process_response, write_artifact, ColumnOrder, ExtractionConfig, XLSX_CONTENT_TYPE,
};
use std::io::Cursor;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn full_row(stt: &str, code: &str, name: &str) -> String {
    let mut parts = vec![
        format!("\"stt\":\"{stt}\""),
        format!("\"ma_nv\":\"{code}\""),
        format!("\"ten_nv\":\"{name}\""),
    ];
    for day in 1..=31 {
        let mark = match day % 7 {
            0 => "null".to_string(),
            3 => "\"P\"".to_string(),
            5 => "\"KP\"".to_string(),
            _ => "\"X\"".to_string(),
        };
        parts.push(format!("\"ngay_{day}\":{mark}"));
    }
    parts.push("\"tong\":\"22\"".to_string());
    format!("{{{}}}", parts.join(","))
}

fn read_sheet(bytes: &[u8], sheet: &str) -> Vec<Vec<String>> {
    let mut wb: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec())).expect("valid xlsx");
    assert_eq!(wb.sheet_names(), vec![sheet.to_string()]);
    let range = wb.worksheet_range(sheet).expect("sheet exists");
    range
        .rows()
        .map(|row| {
            row.iter()
                .map(|c| match c {
                    Data::Empty => String::new(),
                    Data::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, 5).unwrap()
}

// ── Normalizer + parser ──────────────────────────────────────────────────────

#[test]
fn fenced_single_row_yields_one_record() {
    let raw = "```json\n[{\"stt\":\"1\",\"ma_nv\":\"NV01\",\"ten_nv\":\"Nguyen A\",\"ngay_1\":\"X\",\"tong\":\"26\"}]\n```";
    let result = process_response(raw).expect("parses");
    assert_eq!(result.len(), 1);
    let r = &result.records()[0];
    assert_eq!(r.value("stt"), Some("1"));
    assert_eq!(r.value("ten_nv"), Some("Nguyen A"));
    assert_eq!(r.value("ngay_1"), Some("X"));
    assert_eq!(r.value("tong"), Some("26"));
}

#[test]
fn row_count_matches_array_length_with_and_without_fences() {
    let rows: Vec<String> = (1..=12)
        .map(|i| full_row(&i.to_string(), &format!("NV{i:02}"), "Trần Thị B"))
        .collect();
    let body = format!("[{}]", rows.join(","));
    assert_eq!(process_response(&body).unwrap().len(), 12);
    assert_eq!(process_response(&format!("```json\n{body}\n```")).unwrap().len(), 12);
    assert_eq!(process_response(&format!("```\n{body}```  ")).unwrap().len(), 12);
}

#[test]
fn invalid_candidates_are_malformed_not_panics() {
    for raw in [
        r#"[{"stt":"1""#,
        "",
        "Here is the table you asked for:",
        r#"{"stt":"1"}"#,
        "[1, 2, 3]",
        "null",
    ] {
        let err = process_response(raw).expect_err(raw);
        assert_eq!(err.raw, raw);
    }
}

#[test]
fn duplicate_and_gapped_stt_are_kept() {
    let raw = r#"[{"stt":"1"},{"stt":"1"},{"stt":"4"}]"#;
    let result = process_response(raw).unwrap();
    let stts: Vec<_> = result.iter().map(|r| r.value("stt").unwrap()).collect();
    assert_eq!(stts, ["1", "1", "4"]);
}

// ── End-to-end: inference fault ──────────────────────────────────────────────

#[test]
fn inference_timeout_becomes_malformed_extraction_with_raw_text() {
    let response = RawResponse::fault("timeout", 30_000);
    assert_eq!(response.text, "Error: timeout");

    let err = process_response(&response.text).expect_err("fault text is not JSON");
    assert_eq!(err.raw, "Error: timeout");
    assert!(err.is_inference_fault());
    assert!(err.to_string().contains("Could not read"));
}

// ── Exporter ─────────────────────────────────────────────────────────────────

#[test]
fn workbook_round_trips_through_calamine() {
    let raw = format!(
        "[{},{}]",
        full_row("1", "NV01", "Nguyễn Văn A"),
        full_row("2", "NV02", "Lê & <Co>")
    );
    let result = process_response(&raw).unwrap();
    let config = ExtractionConfig::default();
    let artifact = export(&result, &config, date()).unwrap();

    assert_eq!(artifact.file_name, "VKT_BangChamCong_20241005.xlsx");
    assert_eq!(artifact.content_type, XLSX_CONTENT_TYPE);

    let rows = read_sheet(&artifact.bytes, "ChamCong");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].len(), 35);
    assert_eq!(rows[0][0], "stt");
    assert_eq!(rows[0][34], "tong");
    assert_eq!(rows[1][2], "Nguyễn Văn A");
    assert_eq!(rows[2][2], "Lê & <Co>");
    // ngay_3 → P, ngay_5 → KP, ngay_7 → null (blank)
    assert_eq!(rows[1][5], "P");
    assert_eq!(rows[1][7], "KP");
    assert_eq!(rows[1][9], "");
}

#[test]
fn heterogeneous_rows_are_padded() {
    let raw = format!(
        "[{},{}]",
        full_row("1", "NV01", "A"),
        full_row("2", "NV02", "B").replace(",\"ngay_31\":\"P\"", "")
    );
    let result = process_response(&raw).unwrap();
    assert!(!result.records()[1].contains_key("ngay_31"));

    let table = build_table(&result, ColumnOrder::Observed);
    let col = table.header.iter().position(|h| h == "ngay_31").unwrap();
    assert_eq!(table.rows[0][col].as_deref(), Some("P"));
    assert_eq!(table.rows[1][col], None);

    let bytes = write_xlsx(&table, "ChamCong").unwrap();
    let rows = read_sheet(&bytes, "ChamCong");
    assert_eq!(rows[2][col], "");
}

#[test]
fn extra_keys_add_columns() {
    let raw = r#"[{"stt":"1","ghi_chu":"nghỉ phép"},{"stt":"2"}]"#;
    let result = process_response(raw).unwrap();
    let table = build_table(&result, ColumnOrder::Observed);
    assert_eq!(table.header, vec!["stt", "ghi_chu"]);
    assert_eq!(table.rows[1], vec![Some("2".to_string()), None]);
}

#[test]
fn export_is_idempotent() {
    let raw = format!("[{}]", full_row("1", "NV01", "A"));
    let result = process_response(&raw).unwrap();
    let config = ExtractionConfig::default();
    let a = export(&result, &config, date()).unwrap();
    let b = export(&result, &config, date()).unwrap();
    assert_eq!(a.bytes, b.bytes);
    assert_eq!(a.file_name, b.file_name);
    assert_eq!(
        build_table(&result, ColumnOrder::Observed),
        build_table(&result, ColumnOrder::Observed)
    );
}

#[test]
fn custom_prefix_and_sheet() {
    let result = process_response(r#"[{"stt":"1"}]"#).unwrap();
    let config = ExtractionConfig::builder()
        .file_prefix("Xuong2")
        .sheet_name("Thang10")
        .build()
        .unwrap();
    let artifact = export(&result, &config, date()).unwrap();
    assert_eq!(artifact.file_name, "Xuong2_20241005.xlsx");
    let rows = read_sheet(&artifact.bytes, "Thang10");
    assert_eq!(rows, vec![vec!["stt".to_string()], vec!["1".to_string()]]);
}

#[test]
fn artifact_is_written_to_disk() {
    let result = process_response(r#"[{"stt":"1","tong":"20"}]"#).unwrap();
    let artifact = export(&result, &ExtractionConfig::default(), date()).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let path = tokio_test::block_on(write_artifact(&artifact, dir.path())).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes, artifact.bytes);
    assert_eq!(read_sheet(&bytes, "ChamCong")[1], vec!["1", "20"]);
}
