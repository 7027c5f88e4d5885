//! Pattern matching: turning raw lines into tuples of captured fields.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::PipelineError;

/// Access log line: `HOST IDENT USER [DATETIME] "METHOD REQUEST PROTO" STATUS BYTES`.
pub const ACCESS_LOG_PATTERN: &str =
    r#"(\S+) (\S+) (\S+) \[(.*?)\] "(\S+) (\S+) (\S+)" (\S+) (\S+)"#;

/// Field names bound to the capture groups of [`ACCESS_LOG_PATTERN`], in order.
pub const ACCESS_LOG_FIELDS: [&str; 9] = [
    "host", "ident", "user", "datetime", "method", "request", "proto", "status", "bytes",
];

static ACCESS_LOG: LazyLock<Pattern> = LazyLock::new(|| {
    Pattern::new(ACCESS_LOG_PATTERN).expect("access log pattern is a valid regex")
});

/// A compiled line pattern with a fixed number of capture groups.
///
/// The pattern is anchored at the start of the line; anything after the
/// last group is ignored. Clones share the compiled program.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    groups: usize,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, PipelineError> {
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        let groups = regex.captures_len() - 1;
        Ok(Self { regex, groups })
    }

    /// The shared access log pattern.
    pub fn access_log() -> Self {
        ACCESS_LOG.clone()
    }

    /// Number of capture groups, i.e. the length of every tuple produced.
    pub fn group_count(&self) -> usize {
        self.groups
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Captured substrings in group order, or `None` if the line does not match.
    ///
    /// A group that does not take part in the match yields an empty string.
    pub fn captures(&self, line: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(line)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_owned()))
                .collect(),
        )
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

/// Yields the captured tuple of every matching line.
///
/// Lines that do not match are skipped without trace. Upstream errors pass
/// through unchanged.
pub struct Extract<I> {
    lines: I,
    pattern: Pattern,
}

impl<I> Extract<I>
where
    I: Iterator<Item = Result<String, PipelineError>>,
{
    pub fn new(lines: I, pattern: Pattern) -> Self {
        Self { lines, pattern }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }
}

impl<I> Iterator for Extract<I>
where
    I: Iterator<Item = Result<String, PipelineError>>,
{
    type Item = Result<Vec<String>, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err)),
            };
            if let Some(fields) = self.pattern.captures(&line) {
                return Some(Ok(fields));
            }
        }
    }
}
