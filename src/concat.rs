//! Flattening a sequence of line sources into one line stream.

use crate::error::PipelineError;

/// Concatenates line sources end to end.
///
/// Each source is drained completely and dropped before the next one is
/// pulled from upstream, so at most one source is open at a time. The first
/// error (from opening or reading a source) is yielded and the stream then
/// ends.
pub struct Concat<S, L> {
    sources: S,
    current: Option<L>,
    failed: bool,
}

impl<S, L> Concat<S, L>
where
    S: Iterator<Item = Result<L, PipelineError>>,
    L: Iterator<Item = Result<String, PipelineError>>,
{
    pub fn new(sources: S) -> Self {
        Self {
            sources,
            current: None,
            failed: false,
        }
    }

    /// The source currently being drained, if any.
    pub fn current(&self) -> Option<&L> {
        self.current.as_ref()
    }

    fn fail(&mut self, err: PipelineError) -> Option<Result<String, PipelineError>> {
        self.current = None;
        self.failed = true;
        Some(Err(err))
    }
}

impl<S, L> Iterator for Concat<S, L>
where
    S: Iterator<Item = Result<L, PipelineError>>,
    L: Iterator<Item = Result<String, PipelineError>>,
{
    type Item = Result<String, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if let Some(source) = self.current.as_mut() {
                match source.next() {
                    Some(Ok(line)) => return Some(Ok(line)),
                    Some(Err(err)) => return self.fail(err),
                    // Drained: dropping it closes the handle.
                    None => self.current = None,
                }
            }

            match self.sources.next()? {
                Ok(source) => self.current = Some(source),
                Err(err) => return self.fail(err),
            }
        }
    }
}
