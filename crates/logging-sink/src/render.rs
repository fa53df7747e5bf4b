//! crates/logging-sink/src/render.rs
//! Text rendering of log records shared by the line-oriented sinks.

use std::fmt::Write as _;

use logging::{LogRecord, MessageKind};

/// Controls whether a rendered record ends with a newline.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LineMode {
    /// Append a newline terminator after each record.
    #[default]
    WithNewline,
    /// Emit the record without a trailing newline.
    WithoutNewline,
}

impl LineMode {
    /// Reports whether the mode appends a trailing newline.
    ///
    /// ```
    /// use logging_sink::LineMode;
    ///
    /// assert!(LineMode::WithNewline.append_newline());
    /// assert!(!LineMode::WithoutNewline.append_newline());
    /// ```
    #[must_use]
    pub const fn append_newline(self) -> bool {
        matches!(self, Self::WithNewline)
    }
}

impl From<bool> for LineMode {
    fn from(append_newline: bool) -> Self {
        if append_newline {
            Self::WithNewline
        } else {
            Self::WithoutNewline
        }
    }
}

/// Renders `record` into `out`, replacing its previous contents.
///
/// Layout: `seconds.micros level [scope:session] pid:tid(thread) module: text`.
/// Enter and exit records render as `>` and `< {duration}us` in place of
/// the text. Thread and module names are omitted when empty.
pub fn render_record(record: &LogRecord, line_mode: LineMode, out: &mut String) {
    out.clear();
    let micros = record.timestamp / 1_000;
    let level = match record.message_kind {
        MessageKind::Text => record.severity().map_or("?", |severity| severity.as_str()),
        MessageKind::ScopeEnter | MessageKind::ScopeExit => "scope",
    };
    let _ = write!(
        out,
        "{}.{:06} {level:<7} [{}:{}] {}:{}",
        micros / 1_000_000,
        micros % 1_000_000,
        record.scope_id,
        record.session_id,
        record.process_id,
        record.thread_id,
    );
    if !record.thread_name.is_empty() {
        let _ = write!(out, "({})", record.thread_name);
    }
    if !record.module_name.is_empty() {
        let _ = write!(out, " {}", record.module_name);
    }
    out.push_str(": ");
    match record.message_kind {
        MessageKind::Text => out.push_str(record.message.as_str()),
        MessageKind::ScopeEnter => out.push('>'),
        MessageKind::ScopeExit => {
            let _ = write!(out, "< {}us", record.duration / 1_000);
        }
    }
    if line_mode.append_newline() {
        out.push('\n');
    }
}
