//! Tabular export: records → table → single-sheet XLSX bytes.
//!
//! ## Table shape
//!
//! The header is the union of keys across records ([`ColumnOrder::Observed`],
//! first-seen order) or the canonical schema followed by extras
//! ([`ColumnOrder::Canonical`]). Every row is aligned to that header; an
//! absent key or a `null` becomes an empty cell. Rows with different key
//! sets are tolerated, never rejected.
//!
//! ## Workbook
//!
//! An XLSX file is a zip of SpreadsheetML parts. The sheet uses inline
//! strings, so no shared-strings table is needed, and every value is
//! written as text: `08` stays `08`. Zip timestamps are fixed, so the same
//! table always yields the same bytes.

use crate::config::ExtractionConfig;
use crate::error::AttendanceError;
use crate::record::ExtractionResult;
use crate::schema::{self, ColumnOrder};
use chrono::NaiveDate;
use quick_xml::escape::escape;
use serde::Serialize;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Content type declared for the download.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A header plus rows aligned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// The generated spreadsheet, ready to hand to the user.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Build the header and align every record to it. Input is not modified.
pub fn build_table(result: &ExtractionResult, order: ColumnOrder) -> Table {
    let header = match order {
        ColumnOrder::Observed => result.observed_keys(),
        ColumnOrder::Canonical => {
            let mut header = schema::fields().to_vec();
            header.extend(
                result
                    .observed_keys()
                    .into_iter()
                    .filter(|k| !schema::is_field(k)),
            );
            header
        }
    };

    let rows = result
        .iter()
        .map(|record| {
            header
                .iter()
                .map(|h| record.value(h).map(str::to_string))
                .collect()
        })
        .collect();

    Table { header, rows }
}

/// `<prefix>_<YYYYMMDD>.xlsx`
pub fn export_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}.xlsx", prefix, date.format("%Y%m%d"))
}

/// Build the table, serialise it, and name the file for `date`.
pub fn export(
    result: &ExtractionResult,
    config: &ExtractionConfig,
    date: NaiveDate,
) -> Result<ExportArtifact, AttendanceError> {
    let table = build_table(result, config.column_order);
    let bytes = write_xlsx(&table, &config.sheet_name)?;
    Ok(ExportArtifact {
        file_name: export_file_name(&config.file_prefix, date),
        content_type: XLSX_CONTENT_TYPE,
        bytes,
    })
}

/// Serialise `table` as a workbook with one sheet named `sheet_name`.
///
/// The header row is bold. An empty table produces an empty sheet.
pub fn write_xlsx(table: &Table, sheet_name: &str) -> Result<Vec<u8>, AttendanceError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let parts: [(&str, String); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", ROOT_RELS_XML.to_string()),
        ("xl/workbook.xml", workbook_xml(sheet_name)),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.to_string()),
        ("xl/styles.xml", STYLES_XML.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(table)),
    ];

    for (name, body) in &parts {
        zip.start_file(*name, opts)?;
        zip.write_all(body.as_bytes())
            .map_err(|e| AttendanceError::ExportFailed(format!("{name}: {e}")))?;
    }

    let bytes = zip.finish()?.into_inner();
    debug!(
        "Wrote workbook: {} columns, {} rows, {} bytes",
        table.header.len(),
        table.rows.len(),
        bytes.len()
    );
    Ok(bytes)
}

// ── SpreadsheetML parts ─────────────────────────────────────────────────────

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

// Style 0 = default, style 1 = bold (header row).
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape(sheet_name)
    )
}

fn sheet_xml(table: &Table) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    if !table.header.is_empty() {
        let header: Vec<Option<&str>> = table.header.iter().map(|h| Some(h.as_str())).collect();
        push_row(&mut xml, 1, &header, 1);
        for (i, row) in table.rows.iter().enumerate() {
            let cells: Vec<Option<&str>> = row.iter().map(|c| c.as_deref()).collect();
            push_row(&mut xml, i + 2, &cells, 0);
        }
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Append `<row>`; `None` cells are omitted, leaving them empty.
fn push_row(xml: &mut String, row_num: usize, cells: &[Option<&str>], style: u8) {
    xml.push_str(&format!(r#"<row r="{row_num}">"#));
    for (col, cell) in cells.iter().enumerate() {
        let Some(text) = cell else { continue };
        let style_attr = if style > 0 {
            format!(r#" s="{style}""#)
        } else {
            String::new()
        };
        xml.push_str(&format!(
            r#"<c r="{}{}" t="inlineStr"{}><is><t xml:space="preserve">{}</t></is></c>"#,
            column_letters(col),
            row_num,
            style_attr,
            escape(&xml_safe(text))
        ));
    }
    xml.push_str("</row>");
}

/// 0 → A, 25 → Z, 26 → AA, …
pub fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Drop control characters that XML 1.0 cannot represent.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}
