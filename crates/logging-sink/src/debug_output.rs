//! crates/logging-sink/src/debug_output.rs
//! Line-per-record output to a developer console or any other writer.

use std::io::{self, Write};

use logging::LogRecord;

use crate::render::{LineMode, render_record};
use crate::sink::{LogSink, SinkKind, not_open};

/// Writes rendered records to a [`Write`] implementor, unbuffered.
///
/// The default target is standard error. Tests and embedders can supply
/// any writer and recover it with [`into_inner`](Self::into_inner).
///
/// # Examples
///
/// ```
/// use logging::{LogRecord, ScopeId, Severity};
/// use logging_sink::{DebugOutputSink, LineMode, LogSink};
///
/// let mut sink = DebugOutputSink::with_line_mode(Vec::new(), LineMode::WithoutNewline);
/// sink.open()?;
/// sink.write(&LogRecord::text(ScopeId::of("demo"), Severity::Info, "ready"))?;
/// assert!(sink.into_inner().ends_with(b": ready"));
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct DebugOutputSink<W = io::Stderr> {
    writer: W,
    line_mode: LineMode,
    open: bool,
    line: String,
}

impl DebugOutputSink<io::Stderr> {
    /// Creates a sink writing to standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W> DebugOutputSink<W> {
    /// Creates a closed sink over `writer`, one record per line.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self::with_line_mode(writer, LineMode::WithNewline)
    }

    /// Creates a closed sink over `writer` using `line_mode`.
    #[must_use]
    pub fn with_line_mode(writer: W, line_mode: LineMode) -> Self {
        Self {
            writer,
            line_mode,
            open: false,
            line: String::new(),
        }
    }

    /// Line mode applied to every record.
    #[must_use]
    pub const fn line_mode(&self) -> LineMode {
        self.line_mode
    }

    /// Borrows the underlying writer.
    #[must_use]
    pub const fn writer(&self) -> &W {
        &self.writer
    }

    /// Consumes the sink and returns the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> LogSink for DebugOutputSink<W> {
    fn kind(&self) -> SinkKind {
        SinkKind::DebugOutput
    }

    fn open(&mut self) -> io::Result<()> {
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write(&mut self, record: &LogRecord) -> io::Result<()> {
        if !self.open {
            return Err(not_open(SinkKind::DebugOutput));
        }
        render_record(record, self.line_mode, &mut self.line);
        self.writer.write_all(self.line.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn close(&mut self) {
        if self.open {
            let _ = self.writer.flush();
            self.open = false;
        }
    }
}
