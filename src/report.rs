//! Summary report over a materialized run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::aggregate::{self, replay};
use crate::error::PipelineError;
use crate::record::{Record, Value};

/// Status code whose requests are listed as not found.
pub const NOT_FOUND: i64 = 404;

/// Aggregates reported for one run of access log records.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub records: usize,
    pub total_bytes: i64,
    pub not_found: BTreeSet<String>,
    pub hosts: BTreeSet<String>,
    /// Request and byte count of the largest transfer.
    pub largest: Option<(String, i64)>,
    pub large_threshold: i64,
    /// Requests that moved more than `large_threshold` bytes, in log order.
    pub large_transfers: Vec<(String, i64)>,
    pub statuses: BTreeMap<i64, usize>,
    /// Requests per path, most requested first.
    pub downloads: Vec<(String, usize)>,
}

impl Report {
    /// Each figure is a separate pass over `records`.
    pub fn build(records: &[Record], large_threshold: i64) -> Result<Self, PipelineError> {
        let not_found = aggregate::collect_set_where(replay(records), "request", |r| {
            r.get("status") == Some(&Value::Int(NOT_FOUND))
        })?;

        let largest = aggregate::max_by_field(replay(records), "bytes")?
            .map(|r| Ok::<_, PipelineError>((r.text("request")?, r.int("bytes")?)))
            .transpose()?;

        let large_transfers = aggregate::filter_records(replay(records), |r| {
            r.int("bytes").is_ok_and(|b| b > large_threshold)
        })?
        .into_iter()
        .map(|r| Ok::<_, PipelineError>((r.text("request")?, r.int("bytes")?)))
        .collect::<Result<Vec<_>, PipelineError>>()?;

        let statuses = aggregate::count_by(replay(records), "status")?
            .into_iter()
            .map(|(status, count)| {
                let code = status.as_int().ok_or_else(|| PipelineError::NotNumeric {
                    field: "status".to_string(),
                    value: status.to_string(),
                })?;
                Ok::<_, PipelineError>((code, count))
            })
            .collect::<Result<BTreeMap<_, _>, PipelineError>>()?;

        let mut downloads: Vec<(String, usize)> = aggregate::count_by(replay(records), "request")?
            .into_iter()
            .map(|(request, count)| (request.to_string(), count))
            .collect();
        downloads.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(Self {
            records: records.len(),
            total_bytes: aggregate::sum(replay(records), "bytes")?,
            not_found: texts(not_found),
            hosts: texts(aggregate::distinct(replay(records), "host")?),
            largest,
            large_threshold,
            large_transfers,
            statuses,
            downloads,
        })
    }

    /// Number of requests for `request`.
    pub fn downloads_of(&self, request: &str) -> usize {
        self.downloads
            .iter()
            .find(|(path, _)| path == request)
            .map_or(0, |(_, count)| *count)
    }

    /// A copy with at most `n` download entries.
    pub fn top(&self, n: usize) -> Self {
        let mut report = self.clone();
        report.downloads.truncate(n);
        report
    }
}

fn texts(values: impl IntoIterator<Item = Value>) -> BTreeSet<String> {
    values.into_iter().map(|v| v.to_string()).collect()
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Records:      {}", self.records)?;
        writeln!(f, "Total bytes:  {}", self.total_bytes)?;
        writeln!(f, "Unique hosts: {}", self.hosts.len())?;
        match &self.largest {
            Some((request, bytes)) => writeln!(f, "Largest:      {request} ({bytes} bytes)")?,
            None => writeln!(f, "Largest:      -")?,
        }

        writeln!(f)?;
        writeln!(f, "Status codes:")?;
        for (status, count) in &self.statuses {
            writeln!(f, "  {status}  {count}")?;
        }

        writeln!(f)?;
        writeln!(f, "Not found ({}):", self.not_found.len())?;
        for request in &self.not_found {
            writeln!(f, "  {request}")?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "Transfers over {} bytes ({}):",
            self.large_threshold,
            self.large_transfers.len()
        )?;
        for (request, bytes) in &self.large_transfers {
            writeln!(f, "  {bytes:>12}  {request}")?;
        }

        writeln!(f)?;
        writeln!(f, "Downloads:")?;
        for (request, count) in &self.downloads {
            writeln!(f, "  {count:>8}  {request}")?;
        }
        Ok(())
    }
}
