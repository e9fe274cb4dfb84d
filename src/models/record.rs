use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Borrowed view of one scalar cell of a record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    Int(i64),
    Float(f64),
    Text(&'a str),
}

impl<'a> FieldRef<'a> {
    /// Numeric value of the cell, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldRef::Int(v) => Some(*v as f64),
            FieldRef::Float(v) => Some(*v),
            FieldRef::Text(_) => None,
        }
    }

    /// Key used to look the cell up in a categorical vocabulary.
    ///
    /// Numbers are keyed by their decimal text so that fit and transform agree.
    pub fn category_key(&self) -> Cow<'a, str> {
        match *self {
            FieldRef::Text(s) => Cow::Borrowed(s),
            FieldRef::Int(v) => Cow::Owned(v.to_string()),
            FieldRef::Float(v) => Cow::Owned(v.to_string()),
        }
    }
}

/// Read-only access to the named fields of an input row.
///
/// Fields a record does not carry return `None`; whether that is an error is
/// decided by the fitted transform, not by the record.
pub trait Record {
    fn field(&self, column: &str) -> Option<FieldRef<'_>>;
}

impl<R: Record + ?Sized> Record for &R {
    fn field(&self, column: &str) -> Option<FieldRef<'_>> {
        (**self).field(column)
    }
}

/// Owned scalar cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Parse a raw text cell, preferring integers, then floats, then text
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            FieldValue::Int(v)
        } else if let Ok(v) = trimmed.parse::<f64>() {
            FieldValue::Float(v)
        } else {
            FieldValue::Text(trimmed.to_string())
        }
    }

    pub fn as_field(&self) -> FieldRef<'_> {
        match self {
            FieldValue::Int(v) => FieldRef::Int(*v),
            FieldValue::Float(v) => FieldRef::Float(*v),
            FieldValue::Text(s) => FieldRef::Text(s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// Untyped record keyed by column name (training tables, partial inputs)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(BTreeMap<String, FieldValue>);

impl RawRecord {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn remove(&mut self, column: &str) -> Option<FieldValue> {
        self.0.remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Record for RawRecord {
    fn field(&self, column: &str) -> Option<FieldRef<'_>> {
        self.0.get(column).map(FieldValue::as_field)
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
