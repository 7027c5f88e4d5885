//! Records: named, ordered fields extracted from one log line.

use std::fmt;
use std::sync::Arc;

use crate::error::{ArityMismatchError, PipelineError};

/// A field value. Starts as text and becomes typed through coercion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Text(String),
    Int(i64),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            Value::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{n}"),
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

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

/// Field names shared by every record of one stream.
pub type FieldNames = Arc<[String]>;

/// One structured log entry.
///
/// The field names are shared with every other record built from the same
/// pattern; only the values are per-record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: FieldNames,
    values: Vec<Value>,
}

impl Record {
    /// Bind `values` to `fields` positionally.
    pub fn new(fields: FieldNames, values: Vec<Value>) -> Result<Self, ArityMismatchError> {
        if fields.len() != values.len() {
            return Err(ArityMismatchError {
                expected: fields.len(),
                found: values.len(),
            });
        }
        Ok(Self { fields, values })
    }

    /// Build a record from `(name, value)` pairs. Handy for ad-hoc data.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let (fields, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            fields: fields.into(),
            values,
        }
    }

    pub fn field_names(&self) -> &FieldNames {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index_of(name).map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.index_of(name).map(|i| &mut self.values[i])
    }

    /// Like [`Record::get`] but a missing field is an error.
    pub fn try_get(&self, name: &str) -> Result<&Value, PipelineError> {
        self.get(name)
            .ok_or_else(|| PipelineError::missing_field(name))
    }

    /// Integer value of a coerced field.
    pub fn int(&self, name: &str) -> Result<i64, PipelineError> {
        let value = self.try_get(name)?;
        value.as_int().ok_or_else(|| PipelineError::NotNumeric {
            field: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Text value of a field, rendering typed values.
    pub fn text(&self, name: &str) -> Result<String, PipelineError> {
        self.try_get(name).map(Value::to_string)
    }

    /// Fields in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                Value::Text(s) => write!(f, "{name}: {s:?}")?,
                Value::Int(n) => write!(f, "{name}: {n}")?,
            }
        }
        f.write_str("}")
    }
}

/// Binds each captured tuple to the field names, producing records.
///
/// A tuple of the wrong length is an internal fault: it is yielded as an
/// `ArityMismatch` error and the stream ends.
pub struct BuildRecords<I> {
    tuples: I,
    fields: FieldNames,
    failed: bool,
}

impl<I> BuildRecords<I>
where
    I: Iterator<Item = Result<Vec<String>, PipelineError>>,
{
    pub fn new<S: AsRef<str>>(tuples: I, names: &[S]) -> Self {
        Self {
            tuples,
            fields: names.iter().map(|n| n.as_ref().to_string()).collect(),
            failed: false,
        }
    }

    pub fn field_names(&self) -> &FieldNames {
        &self.fields
    }
}

impl<I> Iterator for BuildRecords<I>
where
    I: Iterator<Item = Result<Vec<String>, PipelineError>>,
{
    type Item = Result<Record, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let tuple = match self.tuples.next()? {
            Ok(tuple) => tuple,
            Err(err) => return Some(Err(err)),
        };
        let values = tuple.into_iter().map(Value::Text).collect();
        match Record::new(Arc::clone(&self.fields), values) {
            Ok(record) => Some(Ok(record)),
            Err(err) => {
                self.failed = true;
                Some(Err(err.into()))
            }
        }
    }
}
