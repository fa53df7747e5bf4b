//! crates/logging/src/message.rs
//! RAII scope-entry guard that gates text output on the scope's priority.

use std::fmt::{self, Write as _};

use crate::clock;
use crate::command::{CommandPriority, LogCommand};
use crate::priority::{Priority, Severity};
use crate::record::{LogRecord, MessageKind};
use crate::scope::LogScope;

/// Guard for one pass through a [`LogScope`].
///
/// `enter` caches the scope's priority, so a priority change made while the
/// guard is alive only affects later guards. When the cached priority has
/// the `SCOPE` flag, an enter record is emitted on creation and an exit
/// record carrying the elapsed time is emitted on drop.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use logging::{LogScope, Priority, ScopeMessage, ScopeRegistry, Severity};
///
/// let registry = Arc::new(ScopeRegistry::new());
/// let scope = LogScope::with_registry("ThreadCentral", &registry);
/// scope.set_priority(Priority::WARNING);
///
/// let message = ScopeMessage::enter(&scope);
/// assert!(message.is_enabled(Severity::Error));
/// assert!(!message.is_enabled(Severity::Info));
/// ```
#[derive(Debug)]
pub struct ScopeMessage<'a> {
    scope: &'a LogScope,
    priority: Priority,
    session_id: u32,
    entered_at: u64,
}

impl<'a> ScopeMessage<'a> {
    /// Enters `scope`.
    pub fn enter(scope: &'a LogScope) -> Self {
        let priority = scope.priority();
        let session_id = scope.next_session();
        let entered_at = clock::monotonic_nanos();
        let message = Self {
            scope,
            priority,
            session_id,
            entered_at,
        };
        if priority.has_flag(Priority::SCOPE) {
            let mut record = message.record(MessageKind::ScopeEnter, Priority::SCOPE);
            record.timestamp = entered_at;
            submit_record(scope, record);
        }
        message
    }

    /// Scope this guard belongs to.
    #[must_use]
    pub const fn scope(&self) -> &'a LogScope {
        self.scope
    }

    /// Priority cached at entry.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Session drawn at entry.
    #[must_use]
    pub const fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Monotonic timestamp taken at entry.
    #[must_use]
    pub const fn entered_at(&self) -> u64 {
        self.entered_at
    }

    /// Reports whether text at `severity` passes the cached priority.
    #[must_use]
    #[inline]
    pub const fn is_enabled(&self, severity: Severity) -> bool {
        self.priority.meets_severity(severity)
    }

    /// Emits a text record at `severity` if the cached priority admits it.
    ///
    /// Returns `true` when a record was handed to the dispatcher.
    pub fn log(&self, severity: Severity, args: fmt::Arguments<'_>) -> bool {
        if !self.is_enabled(severity) {
            return false;
        }
        let mut record = self.record(MessageKind::Text, severity.as_priority());
        let _ = record.message.write_fmt(args);
        submit_record(self.scope, record)
    }

    /// Emits a debug record.
    pub fn log_debug(&self, args: fmt::Arguments<'_>) -> bool {
        self.log(Severity::Debug, args)
    }

    /// Emits an info record.
    pub fn log_info(&self, args: fmt::Arguments<'_>) -> bool {
        self.log(Severity::Info, args)
    }

    /// Emits a warning record.
    pub fn log_warning(&self, args: fmt::Arguments<'_>) -> bool {
        self.log(Severity::Warning, args)
    }

    /// Emits an error record.
    pub fn log_error(&self, args: fmt::Arguments<'_>) -> bool {
        self.log(Severity::Error, args)
    }

    /// Emits a fatal record.
    pub fn log_fatal(&self, args: fmt::Arguments<'_>) -> bool {
        self.log(Severity::Fatal, args)
    }

    fn record(&self, kind: MessageKind, priority: Priority) -> LogRecord {
        let mut record = LogRecord::local(kind, priority, self.scope.id());
        record.session_id = self.session_id;
        record
    }
}

impl Drop for ScopeMessage<'_> {
    fn drop(&mut self) {
        if !self.priority.has_flag(Priority::SCOPE) {
            return;
        }
        let now = clock::monotonic_nanos();
        let mut record = self.record(MessageKind::ScopeExit, Priority::SCOPE);
        record.timestamp = now;
        record.duration = now.saturating_sub(self.entered_at);
        submit_record(self.scope, record);
    }
}

impl LogScope {
    /// Emits a single text record outside of any guard, gated on the live priority.
    ///
    /// The record carries session id `0`.
    pub fn log(&self, severity: Severity, args: fmt::Arguments<'_>) -> bool {
        if !self.priority().meets_severity(severity) {
            return false;
        }
        let mut record = LogRecord::local(MessageKind::Text, severity.as_priority(), self.id());
        let _ = record.message.write_fmt(args);
        submit_record(self, record)
    }
}

/// Stamps the producer identity into `record` and hands it to the submitter
/// attached to the scope's registry. Records are dropped when none is attached.
fn submit_record(scope: &LogScope, mut record: LogRecord) -> bool {
    let Some(registry) = scope.registry() else {
        return false;
    };
    let Some(submitter) = registry.submitter() else {
        return false;
    };
    record.module_name.set(&registry.module_name());
    clock::with_current_thread_name(|name| record.thread_name.set(name));
    submitter.submit(LogCommand::log_message(record), CommandPriority::Data)
}
