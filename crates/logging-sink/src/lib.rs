#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! crates/logging-sink/src/lib.rs
//!
//! # Overview
//!
//! `logging-sink` provides the backends the log dispatcher writes to. Every
//! backend implements [`LogSink`], a small open/write/flush/close contract,
//! so the dispatcher can fan a record out to all of them uniformly.
//!
//! # Design
//!
//! - [`FileSink`] appends rendered lines through a buffered writer.
//! - [`DebugOutputSink`] writes rendered lines to standard error or any
//!   [`std::io::Write`] implementor; on Unix, [`syslog::SyslogSink`] is the
//!   operating-system alternative.
//! - [`RemoteSink`] encodes records and scope tables as wire messages and
//!   hands them to a [`Transport`], such as [`TcpTransport`].
//!
//! A database backend is part of [`SinkKind`] but not provided here;
//! embedders plug one in through the same trait.
//!
//! # Invariants
//!
//! - Sinks are driven by a single thread; none of them synchronise internally.
//! - A closed sink rejects writes with [`std::io::ErrorKind::NotConnected`].
//! - [`LogSink::buffered`] sinks are flushed by the caller, not per record.
//!
//! # Examples
//!
//! ```
//! use logging::{LogRecord, ScopeId, Severity};
//! use logging_sink::{DebugOutputSink, LogSink, SinkKind};
//!
//! let mut sinks: Vec<Box<dyn LogSink>> = vec![Box::new(DebugOutputSink::new(Vec::new()))];
//! for sink in &mut sinks {
//!     sink.open()?;
//! }
//! let record = LogRecord::text(ScopeId::of("demo"), Severity::Info, "hello");
//! for sink in sinks.iter_mut().filter(|sink| sink.is_open()) {
//!     sink.write(&record)?;
//! }
//! assert_eq!(sinks[0].kind(), SinkKind::DebugOutput);
//! # Ok::<(), std::io::Error>(())
//! ```

mod debug_output;
mod file;
mod remote;
mod render;
mod sink;
#[cfg(unix)]
#[allow(unsafe_code)]
pub mod syslog;
mod tcp;

pub use debug_output::DebugOutputSink;
pub use file::FileSink;
pub use remote::{RemoteEndpoint, RemoteSink, Transport};
pub use render::{LineMode, render_record};
pub use sink::{LogSink, SinkKind, SinkNotice};
pub use tcp::{DEFAULT_CONNECT_TIMEOUT, TcpTransport};
