//! Column coercion with field-level failure tolerance.
//!
//! This is the one place that decides what counts as "not recorded". A
//! value that cannot be interpreted becomes `None` and is reported as a
//! `FieldWarning`; it never aborts the surrounding record.

use chrono::NaiveDate;

use crate::models::{FieldWarning, TableName, Temporal, Value};
use crate::pipeline::store::Row;

/// Textual markers the source exports use for missing numbers and dates.
fn is_null_marker(s: &str) -> bool {
    let s = s.trim();
    s.is_empty()
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("null")
        || s.eq_ignore_ascii_case("none")
        || s.eq_ignore_ascii_case("na")
        || s.eq_ignore_ascii_case("n/a")
}

/// Reads typed fields out of one row, collecting warnings as it goes.
pub struct FieldReader<'a> {
    table: TableName,
    row: Row<'a>,
    warnings: &'a mut Vec<FieldWarning>,
}

impl<'a> FieldReader<'a> {
    pub fn new(table: TableName, row: Row<'a>, warnings: &'a mut Vec<FieldWarning>) -> Self {
        Self {
            table,
            row,
            warnings,
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.row.record.contains(column)
    }

    /// Record a field-level problem for `column`.
    pub fn warn(&mut self, column: &str, raw: String, reason: &str) {
        tracing::warn!(
            table = %self.table,
            row = self.row.position,
            column,
            raw = %raw,
            reason,
            "Field recorded as absent"
        );
        self.warnings.push(FieldWarning {
            table: self.table,
            source_row: self.row.position,
            column: column.to_string(),
            raw,
            reason: reason.to_string(),
        });
    }

    /// A reference to another row (`PATIENT`, `PROVIDER`, ...).
    pub fn key(&self, column: &str) -> Option<String> {
        self.row.record.key(column)
    }

    /// Free text. An empty string stays an empty string.
    pub fn text(&mut self, column: &str) -> Option<String> {
        match self.row.record.get(column)? {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) if n.is_nan() => None,
            other => other.as_key(),
        }
    }

    /// First present column among `columns`, read as text.
    pub fn text_first(&mut self, columns: &[&str]) -> Option<String> {
        let column = columns.iter().find(|c| self.contains(c))?;
        self.text(column)
    }

    /// A terminology code (SNOMED, LOINC, CVX, ...).
    ///
    /// Numeric cells and float-formatted text such as `"10509002.0"` are
    /// normalised to their integer form; LOINC-style codes (`"8302-2"`) are
    /// kept verbatim.
    pub fn code(&mut self, column: &str) -> Option<String> {
        match self.row.record.get(column)? {
            Value::Null => None,
            Value::Number(n) if n.is_nan() => None,
            Value::Number(n) if !n.is_finite() => {
                self.warn(column, n.to_string(), "non-finite code");
                None
            }
            value @ Value::Number(_) => value.as_key(),
            Value::Text(s) if is_null_marker(s) => None,
            Value::Text(s) => {
                let trimmed = s.trim();
                match trimmed.strip_suffix(".0") {
                    Some(int) if !int.is_empty() && int.bytes().all(|b| b.is_ascii_digit()) => {
                        Some(int.to_string())
                    }
                    _ => Some(trimmed.to_string()),
                }
            }
            Value::Temporal(t) => {
                self.warn(column, t.to_string(), "expected a code, found a date");
                None
            }
        }
    }

    pub fn number(&mut self, column: &str) -> Option<f64> {
        match self.row.record.get(column)? {
            Value::Null => None,
            Value::Number(n) if n.is_nan() => None,
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Number(n) => {
                self.warn(column, n.to_string(), "non-finite number");
                None
            }
            Value::Text(s) if is_null_marker(s) => None,
            Value::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Some(n),
                _ => {
                    self.warn(column, s.clone(), "not a number");
                    None
                }
            },
            Value::Temporal(t) => {
                self.warn(column, t.to_string(), "expected a number, found a date");
                None
            }
        }
    }

    /// Non-negative whole number (dispense counts).
    pub fn count(&mut self, column: &str) -> Option<u32> {
        let n = self.number(column)?;
        if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) {
            Some(n as u32)
        } else {
            self.warn(column, n.to_string(), "not a whole non-negative count");
            None
        }
    }

    pub fn temporal(&mut self, column: &str) -> Option<Temporal> {
        match self.row.record.get(column)? {
            Value::Null => None,
            Value::Temporal(t) => Some(*t),
            Value::Text(s) if is_null_marker(s) => None,
            Value::Text(s) => match Temporal::parse(s) {
                Ok(t) => Some(t),
                Err(_) => {
                    self.warn(column, s.clone(), "unrecognised date/time");
                    None
                }
            },
            Value::Number(n) if n.is_nan() => None,
            Value::Number(n) => {
                self.warn(column, n.to_string(), "expected a date, found a number");
                None
            }
        }
    }

    /// Calendar date; a timestamp is reduced to its date.
    pub fn date(&mut self, column: &str) -> Option<NaiveDate> {
        self.temporal(column).map(|t| t.date())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    fn read<T>(record: &Record, f: impl FnOnce(&mut FieldReader) -> T) -> (T, Vec<FieldWarning>) {
        let mut warnings = Vec::new();
        let value = {
            let row = Row {
                position: 7,
                record,
            };
            let mut reader = FieldReader::new(TableName::Encounters, row, &mut warnings);
            f(&mut reader)
        };
        (value, warnings)
    }

    #[test]
    fn text_preserves_empty_and_null() {
        let record = Record::new().with("A", "").with("B", Value::Null).with("C", "x");
        let ((a, b, c, d), warnings) =
            read(&record, |r| (r.text("A"), r.text("B"), r.text("C"), r.text("D")));
        assert_eq!(a.as_deref(), Some(""));
        assert_eq!(b, None);
        assert_eq!(c.as_deref(), Some("x"));
        assert_eq!(d, None);
        assert!(warnings.is_empty());
    }

    #[test]
    fn code_normalises_float_formatting() {
        let record = Record::new()
            .with("REASONCODE", "10509002.0")
            .with("CODE", 185345009.0)
            .with("LOINC", "8302-2");
        let ((a, b, c), _) = read(&record, |r| (r.code("REASONCODE"), r.code("CODE"), r.code("LOINC")));
        assert_eq!(a.as_deref(), Some("10509002"));
        assert_eq!(b.as_deref(), Some("185345009"));
        assert_eq!(c.as_deref(), Some("8302-2"));
    }

    #[test]
    fn null_marker_code_is_absent_without_warning() {
        let record = Record::new()
            .with("REASONCODE", "")
            .with("OTHER", "NaN")
            .with("NUM", f64::NAN);
        let ((a, b, c), warnings) =
            read(&record, |r| (r.code("REASONCODE"), r.code("OTHER"), r.code("NUM")));
        assert_eq!((a, b, c), (None, None, None));
        assert!(warnings.is_empty());
    }

    #[test]
    fn malformed_number_warns_and_is_absent() {
        let record = Record::new().with("COST", "12,50 EUR").with("OK", " 12.5 ");
        let ((bad, ok), warnings) = read(&record, |r| (r.number("COST"), r.number("OK")));
        assert_eq!(bad, None);
        assert_eq!(ok, Some(12.5));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].column, "COST");
        assert_eq!(warnings[0].raw, "12,50 EUR");
        assert_eq!(warnings[0].source_row, 7);
        assert_eq!(warnings[0].table, TableName::Encounters);
    }

    #[test]
    fn count_rejects_fractions() {
        let record = Record::new().with("DISPENSES", "3").with("BAD", "2.5");
        let ((good, bad), warnings) = read(&record, |r| (r.count("DISPENSES"), r.count("BAD")));
        assert_eq!(good, Some(3));
        assert_eq!(bad, None);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn temporal_keeps_date_only_distinction() {
        let record = Record::new()
            .with("START", "2020-01-01")
            .with("DATE", "2020-01-01T10:00:00Z")
            .with("STOP", "")
            .with("BAD", "yesterday");
        let ((start, date, stop, bad), warnings) = read(&record, |r| {
            (r.temporal("START"), r.temporal("DATE"), r.temporal("STOP"), r.temporal("BAD"))
        });
        assert!(start.unwrap().is_date_only());
        assert!(!date.unwrap().is_date_only());
        assert_eq!(stop, None);
        assert_eq!(bad, None);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].column, "BAD");
    }

    #[test]
    fn text_first_uses_first_present_column() {
        let record = Record::new().with("STATE", "MA");
        let (v, _) = read(&record, |r| r.text_first(&["STATE_HEADQUARTERED", "STATE"]));
        assert_eq!(v.as_deref(), Some("MA"));
    }
}
