//! Line-oriented reading sources.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader, Stdin};

use crate::monitor::Reading;
use crate::reading::{decode_line, DecodeError, MAX_LINE_BYTES};
use crate::source::{ReadingSource, SourceError};

/// Decodes one record per line from any buffered async reader.
/// End of input is reported as [`SourceError::Closed`].
///
/// Lines longer than [`MAX_LINE_BYTES`] are reported as malformed and the
/// rest of the line is skipped without being buffered.
pub struct LineReadingSource<R> {
    reader: R,
    name: String,
    buf: Vec<u8>,
}

impl<R> LineReadingSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
            buf: Vec::with_capacity(MAX_LINE_BYTES + 1),
        }
    }

    /// Discard input up to and including the next newline (or end of input).
    async fn skip_line(&mut self) -> std::io::Result<()> {
        loop {
            let (consumed, found_newline) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    return Ok(());
                }
                match available.iter().position(|byte| *byte == b'\n') {
                    Some(pos) => (pos + 1, true),
                    None => (available.len(), false),
                }
            };
            self.reader.consume(consumed);
            if found_newline {
                return Ok(());
            }
        }
    }
}

impl LineReadingSource<BufReader<Stdin>> {
    /// Read records piped in on standard input.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), "stdin")
    }
}

#[async_trait]
impl<R> ReadingSource for LineReadingSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn read_reading(&mut self) -> Result<Reading, SourceError> {
        self.buf.clear();
        let read = (&mut self.reader)
            .take(MAX_LINE_BYTES as u64 + 1)
            .read_until(b'\n', &mut self.buf)
            .await
            .map_err(|err| SourceError::Unavailable {
                message: err.to_string(),
            })?;
        if read == 0 {
            return Err(SourceError::Closed);
        }

        if self.buf.len() > MAX_LINE_BYTES && self.buf.last() != Some(&b'\n') {
            let prefix = String::from_utf8_lossy(&self.buf[..32]).into_owned();
            self.skip_line().await.map_err(|err| SourceError::Unavailable {
                message: err.to_string(),
            })?;
            return Err(SourceError::Malformed {
                line: format!("{}...", prefix),
                reason: DecodeError::LineTooLong {
                    limit: MAX_LINE_BYTES,
                },
            });
        }

        let line = std::str::from_utf8(&self.buf).map_err(|_| SourceError::Malformed {
            line: String::from_utf8_lossy(&self.buf).trim().to_string(),
            reason: DecodeError::InvalidEncoding,
        })?;

        decode_line(line, Utc::now()).map_err(|reason| SourceError::Malformed {
            line: line.trim().to_string(),
            reason,
        })
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// Reads from a serial character device, opening it lazily and reopening
/// after the stream ends or fails.
///
/// A regular file (a capture replayed through `READING_DEVICE`) is read
/// once: its end is reported as [`SourceError::Closed`] instead of being
/// reopened, so its records are not ingested again.
pub struct DeviceReadingSource {
    path: PathBuf,
    name: String,
    lines: Option<LineReadingSource<BufReader<File>>>,
    regular_file: bool,
    exhausted: bool,
}

impl DeviceReadingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self {
            path,
            name,
            lines: None,
            regular_file: false,
            exhausted: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.lines.is_some()
    }

    async fn open(&mut self) -> Result<(), SourceError> {
        let unavailable = |err: std::io::Error| SourceError::Unavailable {
            message: format!("cannot open {}: {}", self.name, err),
        };
        let file = File::open(&self.path).await.map_err(unavailable)?;
        self.regular_file = file.metadata().await.map_err(unavailable)?.is_file();

        if self.regular_file {
            tracing::info!("Replaying readings from file {}", self.name);
        } else {
            tracing::info!("Connected to sensor device {}", self.name);
        }
        self.lines = Some(LineReadingSource::new(BufReader::new(file), self.name.clone()));
        Ok(())
    }
}

#[async_trait]
impl ReadingSource for DeviceReadingSource {
    async fn read_reading(&mut self) -> Result<Reading, SourceError> {
        if self.exhausted {
            return Err(SourceError::Closed);
        }
        if self.lines.is_none() {
            self.open().await?;
        }

        let Some(lines) = self.lines.as_mut() else {
            return Err(SourceError::Closed);
        };

        match lines.read_reading().await {
            Err(SourceError::Closed) if self.regular_file => {
                self.lines = None;
                self.exhausted = true;
                Err(SourceError::Closed)
            }
            Err(SourceError::Closed) => {
                self.lines = None;
                Err(SourceError::Unavailable {
                    message: format!("{} reached end of stream", self.name),
                })
            }
            Err(err @ SourceError::Unavailable { .. }) => {
                self.lines = None;
                Err(err)
            }
            other => other,
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
