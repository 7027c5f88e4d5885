//! # logpipe
//!
//! A lazy record pipeline over web-server access logs.
//!
//! Log directories tend to hold a mix of live plain-text logs and rotated
//! archives compressed with gzip or bzip2. This crate reads them all as one
//! stream of typed records without ever holding a whole file in memory.
//!
//! ## Overview
//!
//! The pipeline is a chain of pull-based stages, each an `Iterator` adapter:
//!
//! - **Sources** ([`source`]): open each path lazily, picking a decoder from
//!   its extension (`.gz`, `.bz2`, or plain)
//! - **Concatenation** ([`concat`]): drain the sources one after another
//!   into a single line stream
//! - **Extraction** ([`pattern`]): match each line against a capture-group
//!   pattern, silently dropping lines that do not match
//! - **Records** ([`record`]): bind captured groups to field names
//! - **Coercion** ([`coerce`]): turn text fields such as `status` and
//!   `bytes` into integers
//! - **Aggregation** ([`aggregate`]): single-pass folds such as sums,
//!   distinct sets and maxima
//!
//! ## Example
//!
//! ```
//! use logpipe::{aggregate, from_lines};
//!
//! let lines = [
//!     r#"81.107.39.38 - - [24/Feb/2008:00:08:59 -0600] "GET /ply/ HTTP/1.1" 200 7587"#,
//!     "not a log line",
//!     r#"81.107.39.38 - - [24/Feb/2008:00:09:01 -0600] "GET /favicon.ico HTTP/1.1" 404 -"#,
//! ];
//!
//! let total = aggregate::sum(from_lines(lines).access_log_records(), "bytes").unwrap();
//! assert_eq!(total, 7587);
//! ```

pub mod aggregate;
pub mod coerce;
pub mod concat;
pub mod discover;
pub mod error;
pub mod pattern;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod source;

pub use coerce::{Coerce, to_byte_count, to_int};
pub use concat::Concat;
pub use discover::discover;
pub use error::{ArityMismatchError, FieldCoercionError, PipelineError, SourceOpenError};
pub use pattern::{ACCESS_LOG_FIELDS, ACCESS_LOG_PATTERN, Extract, Pattern};
pub use pipeline::{Pipeline, access_log, from_lines, open};
pub use record::{BuildRecords, FieldNames, Record, Value};
pub use report::Report;
pub use source::{Compression, LineSource, SourceOpener};
