//! One-pass folds over a finished record stream.
//!
//! Every function consumes its input exactly once and stops at the first
//! error. Inputs are any stream of `Result<R, PipelineError>` where `R`
//! borrows as a [`Record`], so the same folds run over a live pipeline
//! (owned records) or over a materialized run replayed with [`replay`]
//! (borrowed records).
//!
//! A live pipeline can be folded only once. Running several aggregations over
//! one run means materializing it first, which holds every record in memory.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};

use crate::error::PipelineError;
use crate::record::{Record, Value};

/// Replay a materialized run as a fallible stream of borrowed records.
pub fn replay(records: &[Record]) -> impl Iterator<Item = Result<&Record, PipelineError>> {
    records.iter().map(Ok::<_, PipelineError>)
}

/// Set of `field` values over records accepted by `keep`.
pub fn collect_set_where<I, R, P>(
    records: I,
    field: &str,
    mut keep: P,
) -> Result<HashSet<Value>, PipelineError>
where
    I: IntoIterator<Item = Result<R, PipelineError>>,
    R: Borrow<Record>,
    P: FnMut(&Record) -> bool,
{
    let mut set = HashSet::new();
    for record in records {
        let record = record?;
        let record = Borrow::<Record>::borrow(&record);
        if keep(record) {
            set.insert(record.try_get(field)?.clone());
        }
    }
    Ok(set)
}

/// Records accepted by `keep`, in stream order.
pub fn filter_records<I, R, P>(records: I, mut keep: P) -> Result<Vec<R>, PipelineError>
where
    I: IntoIterator<Item = Result<R, PipelineError>>,
    R: Borrow<Record>,
    P: FnMut(&Record) -> bool,
{
    let mut kept = Vec::new();
    for record in records {
        let record = record?;
        if keep(Borrow::<Record>::borrow(&record)) {
            kept.push(record);
        }
    }
    Ok(kept)
}

/// Record with the greatest integer `field`; the first one wins a tie.
pub fn max_by_field<I, R>(records: I, field: &str) -> Result<Option<R>, PipelineError>
where
    I: IntoIterator<Item = Result<R, PipelineError>>,
    R: Borrow<Record>,
{
    let mut best: Option<(i64, R)> = None;
    for record in records {
        let record = record?;
        let key = Borrow::<Record>::borrow(&record).int(field)?;
        if best.as_ref().is_none_or(|(max, _)| key > *max) {
            best = Some((key, record));
        }
    }
    Ok(best.map(|(_, record)| record))
}

/// Distinct values of `field` across all records.
pub fn distinct<I, R>(records: I, field: &str) -> Result<HashSet<Value>, PipelineError>
where
    I: IntoIterator<Item = Result<R, PipelineError>>,
    R: Borrow<Record>,
{
    collect_set_where(records, field, |_| true)
}

/// Number of records whose `field` equals `value`.
pub fn count_eq<I, R>(records: I, field: &str, value: &Value) -> Result<usize, PipelineError>
where
    I: IntoIterator<Item = Result<R, PipelineError>>,
    R: Borrow<Record>,
{
    let mut count = 0;
    for record in records {
        let record = record?;
        if Borrow::<Record>::borrow(&record).try_get(field)? == value {
            count += 1;
        }
    }
    Ok(count)
}

/// Sum of integer `field` over all records; zero for an empty stream.
///
/// A total outside the `i64` range is an `Overflow` error.
pub fn sum<I, R>(records: I, field: &str) -> Result<i64, PipelineError>
where
    I: IntoIterator<Item = Result<R, PipelineError>>,
    R: Borrow<Record>,
{
    let mut total: i64 = 0;
    for record in records {
        let record = record?;
        let value = Borrow::<Record>::borrow(&record).int(field)?;
        total = total
            .checked_add(value)
            .ok_or_else(|| PipelineError::Overflow {
                field: field.to_string(),
            })?;
    }
    Ok(total)
}

/// Occurrences of each distinct `field` value.
pub fn count_by<I, R>(records: I, field: &str) -> Result<HashMap<Value, usize>, PipelineError>
where
    I: IntoIterator<Item = Result<R, PipelineError>>,
    R: Borrow<Record>,
{
    let mut groups = HashMap::new();
    for record in records {
        let record = record?;
        let value = Borrow::<Record>::borrow(&record).try_get(field)?;
        if let Some(count) = groups.get_mut(value) {
            *count += 1;
        } else {
            groups.insert(value.clone(), 1);
        }
    }
    Ok(groups)
}
