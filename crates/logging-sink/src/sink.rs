//! crates/logging-sink/src/sink.rs
//! The contract every backend sink satisfies.

use std::fmt;
use std::io;

use logging::{LogRecord, ScopeSnapshot};

/// Backend family a sink belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum SinkKind {
    /// Buffered log file.
    File,
    /// Operating-system debug output (stderr, syslog).
    DebugOutput,
    /// Remote observer connection.
    Remote,
    /// Database writer.
    Database,
}

impl SinkKind {
    /// Every kind, in the order the dispatcher opens them.
    pub const ALL: [Self; 4] = [Self::File, Self::DebugOutput, Self::Remote, Self::Database];

    /// Lower-case name used in configuration and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::DebugOutput => "debug-output",
            Self::Remote => "remote",
            Self::Database => "database",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Out-of-band events the dispatcher announces to every open sink.
///
/// Only sinks that mirror state elsewhere, such as the remote sink, act on
/// them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SinkNotice {
    /// The dispatcher started; carries the full scope table.
    ScopesRegistered(Vec<ScopeSnapshot>),
    /// Scope priorities changed; carries the full scope table.
    ScopesUpdated(Vec<ScopeSnapshot>),
    /// Scope priorities were persisted.
    ConfigurationSaved,
}

/// A destination for log records.
///
/// Sinks are owned and driven by the dispatcher thread alone. A sink that
/// fails to open is skipped until it is opened again; a failing `write` never
/// affects other sinks.
pub trait LogSink: Send {
    /// Backend family.
    fn kind(&self) -> SinkKind;

    /// Acquires the underlying resource.
    fn open(&mut self) -> io::Result<()>;

    /// Reports whether the sink currently accepts records.
    fn is_open(&self) -> bool;

    /// Writes one record.
    fn write(&mut self, record: &LogRecord) -> io::Result<()>;

    /// Pushes buffered records to the underlying resource.
    fn flush(&mut self) -> io::Result<()>;

    /// Flushes and releases the underlying resource.
    fn close(&mut self);

    /// Reports whether `write` buffers, so that the dispatcher flushes once
    /// the queue runs dry instead of after every record.
    fn buffered(&self) -> bool {
        false
    }

    /// Receives a dispatcher notice.
    fn notify(&mut self, _notice: &SinkNotice) -> io::Result<()> {
        Ok(())
    }
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn kind(&self) -> SinkKind {
        (**self).kind()
    }

    fn open(&mut self) -> io::Result<()> {
        (**self).open()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn write(&mut self, record: &LogRecord) -> io::Result<()> {
        (**self).write(record)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn buffered(&self) -> bool {
        (**self).buffered()
    }

    fn notify(&mut self, notice: &SinkNotice) -> io::Result<()> {
        (**self).notify(notice)
    }
}

/// Error returned by sinks that were asked to write while closed.
pub(crate) fn not_open(kind: SinkKind) -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, format!("{kind} sink is not open"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_have_stable_names() {
        let names: Vec<_> = SinkKind::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["file", "debug-output", "remote", "database"]);
    }

    #[test]
    fn not_open_error_names_the_sink() {
        let err = not_open(SinkKind::Remote);
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert_eq!(err.to_string(), "remote sink is not open");
    }
}
