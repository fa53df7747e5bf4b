//! crates/dispatcher/src/queue.rs
//!
//! Producer side of the dispatcher's two channels, plus the state shared
//! between producers, the owning handle and the dispatch thread.
//!
//! Control commands travel on an unbounded channel so lifecycle requests are
//! never refused for lack of room. Data commands travel on a bounded channel
//! and are admitted with `try_send`; a full channel drops the command and
//! counts it rather than blocking the producer.

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use logging::{CommandPriority, CommandSubmitter, LogCommand};

/// Lifecycle state of a dispatcher.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum DispatcherState {
    /// No dispatch thread is processing commands.
    Stopped = 0,
    /// The thread is spawned and the start handshake is pending.
    Starting = 1,
    /// Commands are being processed.
    Running = 2,
    /// A stop was requested and the thread is draining.
    Stopping = 3,
}

impl DispatcherState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    /// Lower-case name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters observed at one instant.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DispatcherStats {
    /// Commands taken off either channel.
    pub commands: u64,
    /// Records fanned out to the sinks.
    pub records: u64,
    /// Individual sink writes that failed.
    pub sink_failures: u64,
    /// Data commands refused at admission.
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Shared {
    state: AtomicU8,
    commands: AtomicU64,
    records: AtomicU64,
    sink_failures: AtomicU64,
    dropped: AtomicU64,
}

impl Shared {
    pub(crate) fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: DispatcherState) {
        let previous = DispatcherState::from_u8(self.state.swap(state as u8, Ordering::AcqRel));
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "dispatcher state changed");
        }
    }

    /// Moves to `to` only if the current state is `from`.
    pub(crate) fn transition(&self, from: DispatcherState, to: DispatcherState) -> bool {
        let moved = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if moved {
            tracing::debug!(from = %from, to = %to, "dispatcher state changed");
        }
        moved
    }

    pub(crate) fn count_command(&self) {
        self.commands.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_record(&self) {
        self.records.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn count_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            commands: self.commands.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Receiving ends owned by the dispatch thread for one run.
pub(crate) struct Channels {
    pub(crate) control: Receiver<LogCommand>,
    pub(crate) data: Receiver<LogCommand>,
}

/// Producer handle attached to the scope registry while a run is active.
pub(crate) struct QueueSender {
    control: Sender<LogCommand>,
    data: Sender<LogCommand>,
    shared: std::sync::Arc<Shared>,
}

impl QueueSender {
    /// Creates the channel pair for one run.
    pub(crate) fn channel(capacity: usize, shared: std::sync::Arc<Shared>) -> (Self, Channels) {
        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let (data_tx, data_rx) = crossbeam_channel::bounded(capacity);
        (
            Self {
                control: control_tx,
                data: data_tx,
                shared,
            },
            Channels {
                control: control_rx,
                data: data_rx,
            },
        )
    }
}

impl CommandSubmitter for QueueSender {
    fn submit(&self, command: LogCommand, priority: CommandPriority) -> bool {
        match priority {
            CommandPriority::Control => self.control.send(command).is_ok(),
            CommandPriority::Data => {
                if !matches!(
                    self.shared.state(),
                    DispatcherState::Starting | DispatcherState::Running
                ) {
                    return false;
                }
                match self.data.try_send(command) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        self.shared.count_dropped();
                        false
                    }
                    Err(TrySendError::Disconnected(_)) => false,
                }
            }
        }
    }
}

impl fmt::Debug for QueueSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueSender")
            .field("control_len", &self.control.len())
            .field("data_len", &self.data.len())
            .finish()
    }
}
