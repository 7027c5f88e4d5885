//! Fluent wiring of the pipeline stages.
//!
//! `Pipeline` wraps an iterator and exposes the next stage that makes sense
//! for its item type:
//!
//! ```text
//! paths ─open─▶ lines ─extract─▶ tuples ─records─▶ records ─coerce(×k)─▶ records
//! ```
//!
//! Nothing is read until the finished pipeline is pulled, and dropping it at
//! any point closes whatever source is open.

use std::path::Path;

use tracing::debug;

use crate::coerce::{self, Coerce};
use crate::concat::Concat;
use crate::error::PipelineError;
use crate::pattern::{ACCESS_LOG_FIELDS, Extract, Pattern};
use crate::record::{BuildRecords, Record, Value};
use crate::source::{LineSource, SourceOpener};

/// A lazy stage chain. Iterating it pulls one item through every stage.
#[derive(Debug)]
pub struct Pipeline<I> {
    inner: I,
}

impl<I: Iterator> Pipeline<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> I {
        self.inner
    }
}

impl<I: Iterator> Iterator for Pipeline<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Line stream over files, opened and decoded one at a time in order.
pub fn open<P>(paths: P) -> Pipeline<Concat<SourceOpener<P::IntoIter>, LineSource>>
where
    P: IntoIterator,
    P::Item: AsRef<Path>,
{
    Pipeline::new(Concat::new(SourceOpener::new(paths)))
}

/// Line stream over in-memory text.
pub fn from_lines<T, S>(lines: T) -> Pipeline<impl Iterator<Item = Result<String, PipelineError>>>
where
    T: IntoIterator<Item = S>,
    S: Into<String>,
{
    Pipeline::new(
        lines
            .into_iter()
            .map(|line| Ok::<String, PipelineError>(line.into())),
    )
}

/// Typed access log records from files: `status` and `bytes` are integers.
pub fn access_log<P>(paths: P) -> Pipeline<impl Iterator<Item = Result<Record, PipelineError>>>
where
    P: IntoIterator,
    P::Item: AsRef<Path>,
{
    open(paths).access_log_records()
}

impl<I> Pipeline<I>
where
    I: Iterator<Item = Result<String, PipelineError>>,
{
    /// Keep matching lines as captured tuples.
    pub fn extract(self, pattern: &Pattern) -> Pipeline<Extract<I>> {
        Pipeline::new(Extract::new(self.inner, pattern.clone()))
    }

    /// The standard access log chain over this line stream.
    pub fn access_log_records(
        self,
    ) -> Pipeline<impl Iterator<Item = Result<Record, PipelineError>>> {
        self.extract(&Pattern::access_log())
            .records(&ACCESS_LOG_FIELDS)
            .coerce("status", coerce::to_int)
            .coerce("bytes", coerce::to_byte_count)
    }
}

impl<I> Pipeline<I>
where
    I: Iterator<Item = Result<Vec<String>, PipelineError>>,
{
    /// Bind tuples to field names.
    pub fn records<S: AsRef<str>>(self, names: &[S]) -> Pipeline<BuildRecords<I>> {
        Pipeline::new(BuildRecords::new(self.inner, names))
    }
}

impl<I> Pipeline<I>
where
    I: Iterator<Item = Result<Record, PipelineError>>,
{
    /// Convert one field of every record.
    pub fn coerce<F>(self, field: &str, convert: F) -> Pipeline<Coerce<I, F>>
    where
        F: Fn(&str) -> Result<Value, String>,
    {
        Pipeline::new(Coerce::new(self.inner, field, convert))
    }

    /// Drop records that fail coercion, handing each error to `on_error`.
    ///
    /// Fatal errors are still yielded.
    pub fn skip_malformed<E>(
        self,
        mut on_error: E,
    ) -> Pipeline<impl Iterator<Item = Result<Record, PipelineError>>>
    where
        E: FnMut(&PipelineError),
    {
        Pipeline::new(self.inner.filter(move |item| match item {
            Err(err) if !err.is_fatal() => {
                on_error(err);
                false
            }
            _ => true,
        }))
    }

    /// Pull the whole stream into memory so it can be aggregated repeatedly.
    ///
    /// Stops at the first error.
    pub fn materialize(self) -> Result<Vec<Record>, PipelineError> {
        let records = self.inner.collect::<Result<Vec<_>, _>>()?;
        debug!(records = records.len(), "materialized record stream");
        Ok(records)
    }
}
