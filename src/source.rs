//! Log sources: opening files and decoding them into lines.
//!
//! `SourceOpener` turns an ordered list of paths into a lazy sequence of
//! `LineSource`s. A path is opened only when its source is pulled, and the
//! decoder is chosen from the final extension:
//!
//! | extension | decoder |
//! |-----------|---------|
//! | `.gz`     | gzip    |
//! | `.bz2`    | bzip2   |
//! | other     | plain   |

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use tracing::debug;

use crate::error::{PipelineError, SourceOpenError};

/// Compression format of a log source, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Plain,
    Gzip,
    Bzip2,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Self::Gzip,
            Some("bz2") => Self::Bzip2,
            _ => Self::Plain,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
        }
    }

    /// Wrap a raw reader in the matching streaming decoder.
    ///
    /// Concatenated gzip members and bzip2 streams are read through as one.
    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Box<dyn BufRead + 'a> {
        match self {
            Self::Plain => Box::new(BufReader::new(reader)),
            Self::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(reader))),
            Self::Bzip2 => Box::new(BufReader::new(MultiBzDecoder::new(reader))),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single opened log source yielding its lines in order.
///
/// Lines are split on `\n` with any trailing `\r` removed. Invalid UTF-8 is
/// replaced rather than rejected. The underlying reader is released as soon
/// as the source reaches its end or hits a read error, and in any case when
/// the source is dropped.
pub struct LineSource {
    path: PathBuf,
    compression: Compression,
    reader: Box<dyn BufRead>,
    buf: Vec<u8>,
    lines: u64,
    done: bool,
}

impl LineSource {
    /// Open `path` with the decoder its extension selects.
    pub fn open(path: &Path) -> Result<Self, SourceOpenError> {
        let compression = Compression::from_path(path);
        let file = File::open(path).map_err(|source| SourceOpenError {
            path: path.to_path_buf(),
            compression,
            source,
        })?;
        debug!(path = %path.display(), %compression, "opened log source");
        Ok(Self::new(path, compression, compression.decoder(file)))
    }

    /// Wrap an already decoded reader.
    pub fn new(
        path: impl Into<PathBuf>,
        compression: Compression,
        reader: impl BufRead + 'static,
    ) -> Self {
        Self::from_boxed(path.into(), compression, Box::new(reader))
    }

    fn from_boxed(path: PathBuf, compression: Compression, reader: Box<dyn BufRead>) -> Self {
        Self {
            path,
            compression,
            reader,
            buf: Vec::new(),
            lines: 0,
            done: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Number of lines yielded so far.
    pub fn lines_read(&self) -> u64 {
        self.lines
    }

    fn release(&mut self) {
        self.done = true;
        self.reader = Box::new(io::empty());
    }
}

impl Iterator for LineSource {
    type Item = Result<String, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                debug!(path = %self.path.display(), lines = self.lines, "log source drained");
                self.release();
                None
            }
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                self.lines += 1;
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(source) => {
                self.release();
                Some(Err(SourceOpenError {
                    path: self.path.clone(),
                    compression: self.compression,
                    source,
                }
                .into()))
            }
        }
    }
}

impl fmt::Debug for LineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineSource")
            .field("path", &self.path)
            .field("compression", &self.compression)
            .field("lines", &self.lines)
            .field("done", &self.done)
            .finish()
    }
}

/// Lazily opens each path in order as it is pulled.
pub struct SourceOpener<P> {
    paths: P,
}

impl<P> SourceOpener<P>
where
    P: Iterator,
    P::Item: AsRef<Path>,
{
    pub fn new<T>(paths: T) -> Self
    where
        T: IntoIterator<IntoIter = P>,
    {
        Self {
            paths: paths.into_iter(),
        }
    }
}

impl<P> Iterator for SourceOpener<P>
where
    P: Iterator,
    P::Item: AsRef<Path>,
{
    type Item = Result<LineSource, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        Some(LineSource::open(path.as_ref()).map_err(PipelineError::from))
    }
}
