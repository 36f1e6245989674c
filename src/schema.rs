//! The fixed record shape every stage agrees on.
//!
//! An attendance sheet row has a sequence label, an employee code, an
//! employee name, one cell per day of the month and a total:
//!
//! ```text
//! stt | ma_nv | ten_nv | ngay_1 … ngay_31 | tong
//! ```
//!
//! Values are always text. Handwritten marks such as `X`, `P`, `KP` or `8`
//! are kept verbatim; nothing here coerces them to numbers.
//!
//! The schema is descriptive, not enforced: the parser accepts whatever keys
//! the model produced and [`conformance`] only reports deviations.

use crate::record::Record;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Number of day columns (`ngay_1` … `ngay_31`).
pub const DAY_COLUMNS: usize = 31;

/// Sequence number column.
pub const STT: &str = "stt";
/// Employee code column.
pub const EMPLOYEE_CODE: &str = "ma_nv";
/// Employee name column.
pub const EMPLOYEE_NAME: &str = "ten_nv";
/// Total column.
pub const TOTAL: &str = "tong";

static FIELDS: Lazy<Vec<String>> = Lazy::new(|| {
    let mut fields = Vec::with_capacity(DAY_COLUMNS + 4);
    fields.push(STT.to_string());
    fields.push(EMPLOYEE_CODE.to_string());
    fields.push(EMPLOYEE_NAME.to_string());
    fields.extend((1..=DAY_COLUMNS).map(day_field));
    fields.push(TOTAL.to_string());
    fields
});

/// All 35 field names in canonical order.
pub fn fields() -> &'static [String] {
    &FIELDS
}

/// Field name for a 1-indexed day of the month.
pub fn day_field(day: usize) -> String {
    format!("ngay_{day}")
}

/// Whether `name` is one of the canonical fields.
pub fn is_field(name: &str) -> bool {
    FIELDS.iter().any(|f| f == name)
}

/// How the exported header orders its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnOrder {
    /// Union of keys in first-seen order across records. (default)
    ///
    /// Matches what the model produced; a row with extra keys adds columns,
    /// a missing key is padded with an empty cell.
    #[default]
    Observed,
    /// The 35 canonical fields first, always present, followed by any
    /// unexpected keys in first-seen order.
    Canonical,
}

/// Deviations of one record from the canonical field set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Conformance {
    /// Canonical fields the record does not carry.
    pub missing: Vec<String>,
    /// Keys the record carries that are not canonical fields.
    pub unexpected: Vec<String>,
}

impl Conformance {
    pub fn is_exact(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Compare a record's keys against the canonical schema.
pub fn conformance(record: &Record) -> Conformance {
    let missing = FIELDS
        .iter()
        .filter(|f| !record.contains_key(f))
        .cloned()
        .collect();
    let unexpected = record
        .keys()
        .filter(|k| !is_field(k))
        .map(str::to_string)
        .collect();
    Conformance { missing, unexpected }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_35_fields_in_order() {
        let f = fields();
        assert_eq!(f.len(), 35);
        assert_eq!(f[0], "stt");
        assert_eq!(f[1], "ma_nv");
        assert_eq!(f[2], "ten_nv");
        assert_eq!(f[3], "ngay_1");
        assert_eq!(f[33], "ngay_31");
        assert_eq!(f[34], "tong");
    }

    #[test]
    fn conformance_reports_missing_and_extra() {
        let mut record = Record::new();
        for f in fields() {
            if f != "ngay_31" {
                record.insert(f.clone(), Some("X".into()));
            }
        }
        record.insert("ghi_chu", None);

        let c = conformance(&record);
        assert_eq!(c.missing, vec!["ngay_31".to_string()]);
        assert_eq!(c.unexpected, vec!["ghi_chu".to_string()]);
        assert!(!c.is_exact());
    }

    #[test]
    fn day_field_naming() {
        assert_eq!(day_field(7), "ngay_7");
        assert!(is_field(&day_field(31)));
        assert!(!is_field(&day_field(32)));
    }
}
