//! crates/logging-sink/src/syslog.rs
//! Syslog backend for the debug-output sink kind.
//!
//! The ident string passed to openlog(3) must stay valid until closelog(3),
//! so the sink owns it for as long as it is open.

use std::ffi::CString;
use std::fmt;
use std::io;

use logging::{LogRecord, MessageKind, Severity};

use crate::render::{LineMode, render_record};
use crate::sink::{LogSink, SinkKind, not_open};

/// Default syslog tag.
pub const DEFAULT_SYSLOG_TAG: &str = "scopelog";

/// Syslog facility codes matching the POSIX syslog(3) constants.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(i32)]
pub enum SyslogFacility {
    /// User-level messages (LOG_USER).
    #[default]
    User = libc::LOG_USER,
    /// System daemons (LOG_DAEMON).
    Daemon = libc::LOG_DAEMON,
    /// Reserved for local use (LOG_LOCAL0).
    Local0 = libc::LOG_LOCAL0,
    /// Reserved for local use (LOG_LOCAL1).
    Local1 = libc::LOG_LOCAL1,
    /// Reserved for local use (LOG_LOCAL2).
    Local2 = libc::LOG_LOCAL2,
    /// Reserved for local use (LOG_LOCAL3).
    Local3 = libc::LOG_LOCAL3,
    /// Reserved for local use (LOG_LOCAL4).
    Local4 = libc::LOG_LOCAL4,
    /// Reserved for local use (LOG_LOCAL5).
    Local5 = libc::LOG_LOCAL5,
    /// Reserved for local use (LOG_LOCAL6).
    Local6 = libc::LOG_LOCAL6,
    /// Reserved for local use (LOG_LOCAL7).
    Local7 = libc::LOG_LOCAL7,
}

impl SyslogFacility {
    /// Parses a case-insensitive facility name.
    ///
    /// ```
    /// # #[cfg(unix)]
    /// # {
    /// use logging_sink::syslog::SyslogFacility;
    ///
    /// assert_eq!(SyslogFacility::from_name("LOCAL3"), Some(SyslogFacility::Local3));
    /// assert_eq!(SyslogFacility::from_name("kern"), None);
    /// # }
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "daemon" => Some(Self::Daemon),
            "local0" => Some(Self::Local0),
            "local1" => Some(Self::Local1),
            "local2" => Some(Self::Local2),
            "local3" => Some(Self::Local3),
            "local4" => Some(Self::Local4),
            "local5" => Some(Self::Local5),
            "local6" => Some(Self::Local6),
            "local7" => Some(Self::Local7),
            _ => None,
        }
    }

    /// Facility name as accepted by [`from_name`](Self::from_name).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Daemon => "daemon",
            Self::Local0 => "local0",
            Self::Local1 => "local1",
            Self::Local2 => "local2",
            Self::Local3 => "local3",
            Self::Local4 => "local4",
            Self::Local5 => "local5",
            Self::Local6 => "local6",
            Self::Local7 => "local7",
        }
    }
}

impl fmt::Display for SyslogFacility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a record to the syslog(3) severity it is logged at.
fn syslog_priority(record: &LogRecord) -> libc::c_int {
    if record.message_kind != MessageKind::Text {
        return libc::LOG_DEBUG;
    }
    match record.severity() {
        Some(Severity::Fatal) => libc::LOG_CRIT,
        Some(Severity::Error) => libc::LOG_ERR,
        Some(Severity::Warning) => libc::LOG_WARNING,
        Some(Severity::Info) => libc::LOG_INFO,
        Some(Severity::Debug) | None => libc::LOG_DEBUG,
    }
}

/// Routes records to syslog(3).
///
/// Only one syslog connection exists per process; opening a second
/// `SyslogSink` replaces the facility and tag of the first.
#[derive(Debug)]
pub struct SyslogSink {
    facility: SyslogFacility,
    tag: String,
    ident: Option<CString>,
    line: String,
}

impl SyslogSink {
    /// Creates a closed sink.
    pub fn new(facility: SyslogFacility, tag: impl Into<String>) -> Self {
        Self {
            facility,
            tag: tag.into(),
            ident: None,
            line: String::new(),
        }
    }

    /// Configured facility.
    pub const fn facility(&self) -> SyslogFacility {
        self.facility
    }

    /// Configured tag (ident string).
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl Default for SyslogSink {
    fn default() -> Self {
        Self::new(SyslogFacility::default(), DEFAULT_SYSLOG_TAG)
    }
}

impl LogSink for SyslogSink {
    fn kind(&self) -> SinkKind {
        SinkKind::DebugOutput
    }

    fn open(&mut self) -> io::Result<()> {
        if self.ident.is_some() {
            return Ok(());
        }
        let ident = CString::new(self.tag.as_str())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        // SAFETY: `ident` is stored in `self` and outlives the connection,
        // which `close` ends before dropping it.
        unsafe {
            libc::openlog(ident.as_ptr(), libc::LOG_PID, self.facility as libc::c_int);
        }
        self.ident = Some(ident);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.ident.is_some()
    }

    fn write(&mut self, record: &LogRecord) -> io::Result<()> {
        if self.ident.is_none() {
            return Err(not_open(SinkKind::DebugOutput));
        }
        render_record(record, LineMode::WithoutNewline, &mut self.line);
        // Interior NULs cannot cross the C boundary.
        let message = CString::new(self.line.replace('\0', " "))
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        // SAFETY: openlog has been called; the "%s" format keeps `%` in the
        // message from being interpreted.
        unsafe {
            libc::syslog(syslog_priority(record), c"%s".as_ptr(), message.as_ptr());
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) {
        if self.ident.take().is_some() {
            // SAFETY: closelog has no preconditions beyond a prior openlog.
            unsafe {
                libc::closelog();
            }
        }
    }
}

impl Drop for SyslogSink {
    fn drop(&mut self) {
        self.close();
    }
}
