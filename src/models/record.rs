//! Generic table rows as handed over by the loading collaborator.
//!
//! A `Record` keeps three states apart: a column that is not in the row at
//! all, a column explicitly set to `Value::Null`, and a column holding an
//! empty string. Nothing in this module collapses one into another.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::temporal::Temporal;

/// A primitive cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Temporal(Temporal),
}

impl Value {
    /// String form used when the value acts as a join key.
    ///
    /// Null and empty text are not keys: a row carrying them is simply not
    /// linked through that column.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) if n.is_finite() => Some(format_number_key(*n)),
            Value::Number(_) => None,
            Value::Temporal(t) => Some(t.to_string()),
        }
    }
}

fn format_number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{n}"),
            Value::Temporal(t) => write!(f, "{t}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<Temporal> for Value {
    fn from(t: Temporal) -> Self {
        Value::Temporal(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One table row: column name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly used by fixtures and the CSV loader.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<Value>) {
        self.fields.insert(column.to_string(), value.into());
    }

    /// `None` when the column is absent; `Some(Value::Null)` when present but null.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn key(&self, column: &str) -> Option<String> {
        self.get(column).and_then(Value::as_key)
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k.as_ref(), v);
        }
        record
    }
}
