//! crates/logging-sink/src/file.rs
//! Buffered append-only log file.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use logging::LogRecord;

use crate::render::{LineMode, render_record};
use crate::sink::{LogSink, SinkKind, not_open};

/// Default write buffer; flushed when full or when the dispatcher goes idle.
const FILE_BUFFER_SIZE: usize = 64 * 1024;

/// Appends one rendered line per record to a file.
///
/// Writes are buffered; the dispatcher flushes once its queue is drained.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    line: String,
}

impl FileSink {
    /// Creates a closed sink for `path`. The file is created on `open`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            line: String::new(),
        }
    }

    /// Path the sink appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    fn open(&mut self) -> io::Result<()> {
        if self.writer.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.writer = Some(BufWriter::with_capacity(FILE_BUFFER_SIZE, file));
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    fn write(&mut self, record: &LogRecord) -> io::Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| not_open(SinkKind::File))?;
        render_record(record, LineMode::WithNewline, &mut self.line);
        writer.write_all(self.line.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(error) = writer.flush() {
                tracing::warn!(path = %self.path.display(), %error, "failed to flush log file on close");
            }
        }
    }

    fn buffered(&self) -> bool {
        true
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        self.close();
    }
}
