//! Field coercion: converting one field's raw text into a typed value.
//!
//! A `Coerce` stage rewrites a single named field of every record passing
//! through it. Stages compose, so converting `status` and `bytes` is two
//! stages in either order.

use crate::error::{FieldCoercionError, PipelineError};
use crate::record::{Record, Value};

/// Byte-count marker for "no data transferred".
pub const MISSING_BYTES: &str = "-";

/// Parse a decimal integer.
pub fn to_int(raw: &str) -> Result<Value, String> {
    raw.parse::<i64>().map(Value::Int).map_err(|e| e.to_string())
}

/// Parse a byte count, where [`MISSING_BYTES`] means zero.
///
/// Negative counts are rejected.
pub fn to_byte_count(raw: &str) -> Result<Value, String> {
    if raw == MISSING_BYTES {
        return Ok(Value::Int(0));
    }
    match raw.parse::<i64>() {
        Ok(n) if n < 0 => Err(format!("negative byte count {n}")),
        Ok(n) => Ok(Value::Int(n)),
        Err(e) => Err(e.to_string()),
    }
}

/// Applies `convert` to the named field of every record.
///
/// A failed conversion is yielded as an error for that record only; the
/// stream carries on so the caller can choose to skip or abort.
pub struct Coerce<I, F> {
    records: I,
    field: String,
    convert: F,
}

impl<I, F> Coerce<I, F>
where
    I: Iterator<Item = Result<Record, PipelineError>>,
    F: Fn(&str) -> Result<Value, String>,
{
    pub fn new(records: I, field: impl Into<String>, convert: F) -> Self {
        Self {
            records,
            field: field.into(),
            convert,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    fn apply(&self, record: &mut Record) -> Result<(), PipelineError> {
        let slot = record
            .get_mut(&self.field)
            .ok_or_else(|| PipelineError::missing_field(self.field.as_str()))?;

        let raw = match &*slot {
            Value::Text(raw) => raw.as_str(),
            typed => {
                return Err(FieldCoercionError {
                    field: self.field.clone(),
                    value: typed.to_string(),
                    reason: "value is not text".to_string(),
                }
                .into());
            }
        };

        let converted = (self.convert)(raw).map_err(|reason| FieldCoercionError {
            field: self.field.clone(),
            value: raw.to_string(),
            reason,
        })?;
        *slot = converted;
        Ok(())
    }
}

impl<I, F> Iterator for Coerce<I, F>
where
    I: Iterator<Item = Result<Record, PipelineError>>,
    F: Fn(&str) -> Result<Value, String>,
{
    type Item = Result<Record, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = match self.records.next()? {
            Ok(record) => record,
            Err(err) => return Some(Err(err)),
        };
        Some(self.apply(&mut record).map(|()| record))
    }
}
