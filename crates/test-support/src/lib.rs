//! Shared test doubles for the scopelog workspace.
//!
//! Every double hands out cheap clones that share state, so a test can move
//! one clone into the dispatcher and inspect the other afterwards.

#![allow(clippy::missing_panics_doc)]

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use logging::{CommandPriority, CommandSubmitter, LogCommand, LogRecord, MessageKind};
use logging_sink::{LogSink, SinkKind, SinkNotice, Transport};
use protocol::WireMessage;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Polls `condition` every few milliseconds for up to five seconds.
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

// ============================================================================
// Submitter
// ============================================================================

/// Submitter that stores every command it is handed.
#[derive(Debug, Default)]
pub struct RecordingSubmitter {
    commands: Mutex<Vec<(LogCommand, CommandPriority)>>,
    refuse: Mutex<bool>,
}

impl RecordingSubmitter {
    /// Creates an accepting submitter.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes later submissions fail when `refuse` is set.
    pub fn set_refusing(&self, refuse: bool) {
        *lock(&self.refuse) = refuse;
    }

    /// Commands in submission order.
    pub fn commands(&self) -> Vec<(LogCommand, CommandPriority)> {
        lock(&self.commands).clone()
    }

    /// Records carried by `LogMessage` commands.
    pub fn records(&self) -> Vec<LogRecord> {
        lock(&self.commands)
            .iter()
            .filter_map(|(command, _)| match command {
                LogCommand::LogMessage(record) => Some((**record).clone()),
                _ => None,
            })
            .collect()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        lock(&self.commands).clear();
    }
}

impl CommandSubmitter for RecordingSubmitter {
    fn submit(&self, command: LogCommand, priority: CommandPriority) -> bool {
        if *lock(&self.refuse) {
            return false;
        }
        lock(&self.commands).push((command, priority));
        true
    }
}

// ============================================================================
// Sinks
// ============================================================================

#[derive(Debug, Default)]
struct MemorySinkState {
    open: bool,
    opens: usize,
    flushes: usize,
    records: Vec<LogRecord>,
    notices: Vec<SinkNotice>,
}

/// In-memory sink of any kind. Clones share the captured output.
#[derive(Clone, Debug)]
pub struct MemorySink {
    kind: SinkKind,
    buffered: bool,
    state: Arc<Mutex<MemorySinkState>>,
}

impl MemorySink {
    /// Creates a closed, buffered sink reporting `kind`.
    pub fn new(kind: SinkKind) -> Self {
        Self {
            kind,
            buffered: true,
            state: Arc::default(),
        }
    }

    /// Makes the sink report itself as unbuffered.
    pub fn unbuffered(mut self) -> Self {
        self.buffered = false;
        self
    }

    /// Every record written, in order.
    pub fn records(&self) -> Vec<LogRecord> {
        lock(&self.state).records.clone()
    }

    /// Texts of the text records written, in order.
    pub fn messages(&self) -> Vec<String> {
        lock(&self.state)
            .records
            .iter()
            .filter(|record| record.message_kind == MessageKind::Text)
            .map(|record| record.message.as_str().to_owned())
            .collect()
    }

    /// Notices received, in order.
    pub fn notices(&self) -> Vec<SinkNotice> {
        lock(&self.state).notices.clone()
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        lock(&self.state).opens
    }

    /// Number of flushes.
    pub fn flush_count(&self) -> usize {
        lock(&self.state).flushes
    }

    /// Whether the shared sink is open right now.
    pub fn is_open_now(&self) -> bool {
        lock(&self.state).open
    }
}

impl LogSink for MemorySink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn open(&mut self) -> io::Result<()> {
        let mut state = lock(&self.state);
        if !state.open {
            state.open = true;
            state.opens += 1;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.is_open_now()
    }

    fn write(&mut self, record: &LogRecord) -> io::Result<()> {
        let mut state = lock(&self.state);
        if !state.open {
            return Err(io::ErrorKind::NotConnected.into());
        }
        state.records.push(record.clone());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        lock(&self.state).flushes += 1;
        Ok(())
    }

    fn close(&mut self) {
        lock(&self.state).open = false;
    }

    fn buffered(&self) -> bool {
        self.buffered
    }

    fn notify(&mut self, notice: &SinkNotice) -> io::Result<()> {
        lock(&self.state).notices.push(notice.clone());
        Ok(())
    }
}

/// Sink that fails in a chosen way.
#[derive(Debug)]
pub struct FailingSink {
    kind: SinkKind,
    fail_open: bool,
    open: bool,
}

impl FailingSink {
    /// A sink whose `open` always fails.
    pub fn failing_open(kind: SinkKind) -> Self {
        Self {
            kind,
            fail_open: true,
            open: false,
        }
    }

    /// A sink that opens but fails every write and flush.
    pub fn failing_write(kind: SinkKind) -> Self {
        Self {
            kind,
            fail_open: false,
            open: false,
        }
    }
}

impl LogSink for FailingSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn open(&mut self) -> io::Result<()> {
        if self.fail_open {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "backend unavailable",
            ));
        }
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write(&mut self, _record: &LogRecord) -> io::Result<()> {
        Err(io::Error::other("write rejected"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::other("flush rejected"))
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn buffered(&self) -> bool {
        true
    }
}

// ============================================================================
// Transport
// ============================================================================

#[derive(Debug, Default)]
struct MemoryTransportState {
    connected: bool,
    refuse_connect: bool,
    connects: u64,
    frames: Vec<Vec<u8>>,
}

/// Transport that keeps every frame in memory. Clones share the frames.
#[derive(Clone, Debug, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryTransportState>>,
}

impl MemoryTransport {
    /// Creates a transport that accepts connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport whose `connect` fails.
    pub fn refusing() -> Self {
        let transport = Self::default();
        lock(&transport.state).refuse_connect = true;
        transport
    }

    /// Whether a connection is currently established.
    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    /// Raw frames sent so far.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        lock(&self.state).frames.clone()
    }

    /// Frames sent so far, decoded.
    pub fn messages(&self) -> Vec<WireMessage> {
        self.frames()
            .iter()
            .map(|frame| WireMessage::decode(frame).expect("frame decodes"))
            .collect()
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self) -> io::Result<u64> {
        let mut state = lock(&self.state);
        if state.refuse_connect {
            return Err(io::ErrorKind::ConnectionRefused.into());
        }
        state.connected = true;
        state.connects += 1;
        Ok(0x5C0E_0000 + state.connects)
    }

    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        let mut state = lock(&self.state);
        if !state.connected {
            return Err(io::ErrorKind::NotConnected.into());
        }
        state.frames.push(frame.to_vec());
        Ok(())
    }

    fn disconnect(&mut self) {
        lock(&self.state).connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logging::{ScopeId, Severity};

    #[test]
    fn memory_sink_clones_share_output() {
        let handle = MemorySink::new(SinkKind::File);
        let mut sink = handle.clone();
        assert!(sink.write(&LogRecord::default()).is_err());
        sink.open().expect("open");
        sink.write(&LogRecord::text(ScopeId::of("t"), Severity::Info, "hi"))
            .expect("write");
        assert_eq!(handle.messages(), ["hi"]);
        assert!(handle.is_open_now());
        sink.close();
        assert!(!handle.is_open_now());
    }

    #[test]
    fn recording_submitter_can_refuse() {
        let submitter = RecordingSubmitter::new();
        assert!(submitter.submit(LogCommand::Start, CommandPriority::Control));
        submitter.set_refusing(true);
        assert!(!submitter.submit(LogCommand::Stop, CommandPriority::Control));
        assert_eq!(submitter.commands().len(), 1);
    }

    #[test]
    fn memory_transport_refuses_when_asked() {
        let mut transport = MemoryTransport::refusing();
        assert!(transport.connect().is_err());
        assert!(transport.send(b"x").is_err());
        assert!(transport.frames().is_empty());
    }
}
