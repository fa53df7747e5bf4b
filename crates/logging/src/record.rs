//! crates/logging/src/record.rs
//! Log records and the bounded text buffers they embed.

use std::fmt;

use crate::clock;
use crate::priority::{Priority, Severity};
use crate::scope_id::ScopeId;

/// Capacity of the message text carried by a record, in bytes.
pub const MESSAGE_CAPACITY: usize = 1024;
/// Capacity of the thread name carried by a record, in bytes.
pub const THREAD_NAME_CAPACITY: usize = 64;
/// Capacity of the module name carried by a record, in bytes.
pub const MODULE_NAME_CAPACITY: usize = 64;

/// Fixed-capacity text with an explicit length.
///
/// Writes past the capacity are truncated, never rejected. Text set from a
/// `&str` is cut at a character boundary; bytes taken from the wire are cut at
/// the byte boundary and [`as_str`](Self::as_str) then exposes the longest
/// valid UTF-8 prefix.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct BoundedText<const N: usize> {
    len: usize,
    bytes: [u8; N],
}

impl<const N: usize> BoundedText<N> {
    /// Maximum number of bytes the buffer holds.
    pub const CAPACITY: usize = N;

    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            len: 0,
            bytes: [0; N],
        }
    }

    /// Creates a buffer holding as much of `text` as fits.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut buffer = Self::new();
        buffer.push_str(text);
        buffer
    }

    /// Creates a buffer from raw bytes, keeping at most [`Self::CAPACITY`] of them.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut buffer = Self::new();
        let len = bytes.len().min(N);
        buffer.bytes[..len].copy_from_slice(&bytes[..len]);
        buffer.len = len;
        buffer
    }

    /// Replaces the contents with `text`. Returns `true` when `text` was truncated.
    pub fn set(&mut self, text: &str) -> bool {
        self.clear();
        self.push_str(text)
    }

    /// Appends as much of `text` as fits. Returns `true` when `text` was truncated.
    pub fn push_str(&mut self, text: &str) -> bool {
        let room = N - self.len;
        let mut take = text.len().min(room);
        while !text.is_char_boundary(take) {
            take -= 1;
        }
        self.bytes[self.len..self.len + take].copy_from_slice(&text.as_bytes()[..take]);
        self.len += take;
        take < text.len()
    }

    /// Empties the buffer.
    pub fn clear(&mut self) {
        self.bytes[..self.len].fill(0);
        self.len = 0;
    }

    /// Number of bytes currently stored.
    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Reports whether the buffer is empty.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reports whether no further byte fits.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    /// Returns the stored bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Returns the whole fixed-capacity backing array, padding included.
    #[must_use]
    pub const fn raw(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Returns the longest valid UTF-8 prefix of the stored bytes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        let bytes = self.as_bytes();
        match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => std::str::from_utf8(&bytes[..err.valid_up_to()]).unwrap_or_default(),
        }
    }
}

impl<const N: usize> Default for BoundedText<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for BoundedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{N}", self.as_str())
    }
}

impl<const N: usize> fmt::Display for BoundedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formatting into a full buffer silently truncates so that `write!` never fails mid-record.
impl<const N: usize> fmt::Write for BoundedText<N> {
    fn write_str(&mut self, text: &str) -> fmt::Result {
        self.push_str(text);
        Ok(())
    }
}

/// Where a record was produced, relative to the process holding it.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum DataOrigin {
    /// Produced by this process.
    #[default]
    Local = 0,
    /// Received from a connected peer.
    Remote = 1,
}

impl DataOrigin {
    /// Decodes the wire representation.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Local),
            1 => Some(Self::Remote),
            _ => None,
        }
    }
}

/// Shape of a record's content.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum MessageKind {
    /// Formatted text.
    #[default]
    Text = 0,
    /// A scope session started.
    ScopeEnter = 1,
    /// A scope session ended; `duration` is set.
    ScopeExit = 2,
}

impl MessageKind {
    /// Decodes the wire representation.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Text),
            1 => Some(Self::ScopeEnter),
            2 => Some(Self::ScopeExit),
            _ => None,
        }
    }
}

/// One log event, as queued to the dispatcher and shipped to observers.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LogRecord {
    /// Whether the record originated locally or was received.
    pub data_origin: DataOrigin,
    /// Text, enter or exit.
    pub message_kind: MessageKind,
    /// `SCOPE` for enter/exit records, a single severity bit for text.
    pub priority: Priority,
    /// Instance that produced the record.
    pub source_id: u32,
    /// Instance the record is addressed to.
    pub target_id: u32,
    /// Transport connection the record travelled on.
    pub connection_cookie: u64,
    /// Producing process.
    pub process_id: u32,
    /// Producing thread.
    pub thread_id: u64,
    /// Monotonic nanoseconds at production.
    pub timestamp: u64,
    /// Monotonic nanoseconds at reception, remote records only.
    pub received_timestamp: u64,
    /// Nanoseconds spent inside the scope, exit records only.
    pub duration: u64,
    /// Scope the record belongs to.
    pub scope_id: ScopeId,
    /// Session pairing an enter with its exit.
    pub session_id: u32,
    /// Formatted message.
    pub message: BoundedText<MESSAGE_CAPACITY>,
    /// Producing thread's name, populated for remote records.
    pub thread_name: BoundedText<THREAD_NAME_CAPACITY>,
    /// Producing module, populated for remote records.
    pub module_name: BoundedText<MODULE_NAME_CAPACITY>,
}

impl LogRecord {
    /// Creates a local record stamped with the current time, process and thread.
    #[must_use]
    pub fn local(message_kind: MessageKind, priority: Priority, scope_id: ScopeId) -> Self {
        Self {
            message_kind,
            priority,
            scope_id,
            process_id: clock::process_id(),
            thread_id: clock::current_thread_id(),
            timestamp: clock::monotonic_nanos(),
            ..Self::default()
        }
    }

    /// Creates a local text record carrying `message`.
    #[must_use]
    pub fn text(scope_id: ScopeId, severity: Severity, message: &str) -> Self {
        let mut record = Self::local(MessageKind::Text, severity.as_priority(), scope_id);
        record.message.set(message);
        record
    }

    /// Severity of a text record.
    #[must_use]
    pub const fn severity(&self) -> Option<Severity> {
        Severity::from_priority(self.priority)
    }

    /// Reports whether this is an enter or exit record.
    #[must_use]
    pub const fn is_scope_event(&self) -> bool {
        matches!(
            self.message_kind,
            MessageKind::ScopeEnter | MessageKind::ScopeExit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    #[test]
    fn push_truncates_at_capacity() {
        let mut text = BoundedText::<4>::new();
        assert!(!text.push_str("ab"));
        assert!(text.push_str("cdef"));
        assert_eq!(text.as_str(), "abcd");
        assert!(text.is_full());
        assert!(text.push_str("g"));
        assert_eq!(text.len(), 4);
    }

    #[test]
    fn exact_fit_is_not_truncation() {
        let mut text = BoundedText::<3>::new();
        assert!(!text.set("abc"));
        assert_eq!(text.as_bytes(), b"abc");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // "é" is two bytes; only one byte of room remains after "ab".
        let text = BoundedText::<3>::from_text("abé");
        assert_eq!(text.as_str(), "ab");
        assert_eq!(text.len(), 2);
    }

    #[test]
    fn raw_bytes_keep_valid_prefix_visible() {
        let text = BoundedText::<3>::from_bytes("abé".as_bytes());
        assert_eq!(text.len(), 3);
        assert_eq!(text.as_str(), "ab");
    }

    #[test]
    fn from_bytes_clamps_to_capacity() {
        let text = BoundedText::<2>::from_bytes(b"wxyz");
        assert_eq!(text.as_bytes(), b"wx");
    }

    #[test]
    fn set_clears_previous_contents() {
        let mut text = BoundedText::<8>::from_text("longer");
        text.set("ab");
        assert_eq!(text.as_str(), "ab");
        assert_eq!(&text.raw()[2..], &[0u8; 6]);
    }

    #[test]
    fn write_macro_truncates_without_error() {
        let mut text = BoundedText::<5>::new();
        write!(text, "{}-{}", 1234, 5678).expect("formatting never fails");
        assert_eq!(text.as_str(), "1234-");
    }

    #[test]
    fn text_record_carries_identity() {
        let record = LogRecord::text(ScopeId::of("app"), Severity::Warning, "careful");
        assert_eq!(record.message_kind, MessageKind::Text);
        assert_eq!(record.severity(), Some(Severity::Warning));
        assert_eq!(record.process_id, std::process::id());
        assert_eq!(record.thread_id, clock::current_thread_id());
        assert_eq!(record.message.as_str(), "careful");
        assert_eq!(record.data_origin, DataOrigin::Local);
        assert!(!record.is_scope_event());
    }

    #[test]
    fn enum_wire_values_decode() {
        assert_eq!(DataOrigin::from_u8(1), Some(DataOrigin::Remote));
        assert_eq!(DataOrigin::from_u8(9), None);
        assert_eq!(MessageKind::from_u8(2), Some(MessageKind::ScopeExit));
        assert_eq!(MessageKind::from_u8(3), None);
    }
}
