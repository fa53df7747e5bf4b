//! crates/dispatcher/src/dispatcher.rs
//!
//! The dispatcher handle and the dispatch thread it drives.
//!
//! # Thread protocol
//!
//! ```text
//! Caller                              Dispatch thread
//! ──────                              ───────────────
//! start()   ── Start (control) ──▶    load config, activate scopes, open sinks
//!           ◀── ready ─────────────    state = Running
//! scopes    ── LogMessage (data) ─▶    write to every open sink
//!                                     (idle) flush buffered sinks
//! stop()    ── Stop (control) ───▶    deactivate scopes, drain data,
//!                                     flush and close sinks, exit
//! ```
//!
//! Control commands are always taken before data commands. Sinks, the
//! configuration store and scope activation are touched only by the dispatch
//! thread. Between runs they live in the handle, so a stopped dispatcher can
//! be started again with the same sinks.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Select, Sender, TryRecvError};
use logging::{
    CommandPriority, CommandSubmitter, LogCommand, LogRecord, ScopeId, ScopeRegistry,
    ScopeUpdate, Severity,
};
use logging_sink::{LogSink, SinkKind, SinkNotice};
use protocol::WireMessage;

use crate::config::ConfigStore;
use crate::options::{DISPATCH_THREAD_NAME, DispatcherOptions};
use crate::queue::{Channels, DispatcherState, DispatcherStats, QueueSender, Shared};
use crate::translate::command_for_message;

/// Single consumer that serialises every logging action and owns the sinks.
///
/// Producers reach it through the [`CommandSubmitter`] attached to its
/// [`ScopeRegistry`] while it runs, or directly through
/// [`submit`](Self::submit). Dropping the handle stops the thread and waits
/// for it.
pub struct LogDispatcher {
    registry: Arc<ScopeRegistry>,
    options: DispatcherOptions,
    shared: Arc<Shared>,
    slot: Mutex<Slot>,
}

enum Slot {
    /// Not running; the worker is parked here.
    Idle(Box<Worker>),
    /// A dispatch thread owns the worker and hands it back on exit.
    Active {
        sender: Arc<QueueSender>,
        join: JoinHandle<Box<Worker>>,
    },
    /// The worker was lost to a panicked or unspawnable thread.
    Lost,
}

impl LogDispatcher {
    /// Creates a stopped dispatcher over the process-wide registry.
    pub fn new(store: impl ConfigStore + 'static, options: DispatcherOptions) -> Self {
        Self::with_registry(Arc::clone(ScopeRegistry::global()), store, options)
    }

    /// Creates a stopped dispatcher over `registry`.
    pub fn with_registry(
        registry: Arc<ScopeRegistry>,
        store: impl ConfigStore + 'static,
        options: DispatcherOptions,
    ) -> Self {
        let shared = Arc::new(Shared::default());
        let worker = Worker {
            registry: Arc::clone(&registry),
            store: Box::new(store),
            sinks: Vec::new(),
            remote_enabled: true,
            started: false,
            dirty: false,
            module_name: options.module_name().to_owned(),
            shared: Arc::clone(&shared),
        };
        Self {
            registry,
            options,
            shared,
            slot: Mutex::new(Slot::Idle(Box::new(worker))),
        }
    }

    /// Adds a sink, builder style. See [`add_sink`](Self::add_sink).
    #[must_use]
    pub fn with_sink(self, sink: impl LogSink + 'static) -> Self {
        self.add_sink(sink);
        self
    }

    /// Adds a sink that is opened on the next start if its kind is enabled.
    ///
    /// Returns `false`, dropping the sink, while the dispatcher is running.
    pub fn add_sink(&self, sink: impl LogSink + 'static) -> bool {
        let mut slot = self.lock_slot();
        let Slot::Idle(worker) = &mut *slot else {
            tracing::warn!(sink = %sink.kind(), "sinks cannot be added while the dispatcher runs");
            return false;
        };
        worker.sinks.push(SinkSlot::new(Box::new(sink)));
        true
    }

    /// Registry whose scopes this dispatcher activates.
    #[must_use]
    pub fn registry(&self) -> &Arc<ScopeRegistry> {
        &self.registry
    }

    /// Options fixed at construction.
    #[must_use]
    pub const fn options(&self) -> &DispatcherOptions {
        &self.options
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DispatcherState {
        self.shared.state()
    }

    /// Reports whether commands are being processed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == DispatcherState::Running
    }

    /// Counters since construction.
    #[must_use]
    pub fn stats(&self) -> DispatcherStats {
        self.shared.stats()
    }

    /// Spawns the dispatch thread and waits for the start handshake.
    ///
    /// Returns whether the dispatcher is running when the handshake
    /// completes or the start timeout elapses. Starting a running dispatcher
    /// is a no-op that reports `true`.
    pub fn start(&self) -> bool {
        let mut slot = self.lock_slot();

        if let Slot::Active { .. } = &*slot {
            match self.shared.state() {
                DispatcherState::Running => return true,
                DispatcherState::Starting => return false,
                DispatcherState::Stopping | DispatcherState::Stopped => {}
            }
        }

        let Some(worker) = reclaim(&mut slot) else {
            tracing::error!("dispatcher cannot start: its sinks were lost with a failed thread");
            return false;
        };

        let (sender, channels) =
            QueueSender::channel(self.options.data_capacity(), Arc::clone(&self.shared));
        let sender = Arc::new(sender);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        self.shared.set_state(DispatcherState::Starting);
        self.registry.init();
        self.registry.attach(Arc::clone(&sender) as Arc<dyn CommandSubmitter>);

        let spawned = thread::Builder::new()
            .name(DISPATCH_THREAD_NAME.to_owned())
            .spawn(move || worker.run(channels, ready_tx));
        let join = match spawned {
            Ok(join) => join,
            Err(error) => {
                tracing::error!(%error, "failed to spawn dispatch thread");
                self.registry.detach();
                self.shared.set_state(DispatcherState::Stopped);
                *slot = Slot::Lost;
                return false;
            }
        };

        sender.submit(LogCommand::Start, CommandPriority::Control);
        let handshake = ready_rx.recv_timeout(self.options.start_timeout());
        *slot = Slot::Active { sender, join };

        if handshake.is_err() {
            tracing::warn!(
                timeout = ?self.options.start_timeout(),
                "dispatcher start handshake did not complete"
            );
        }
        self.is_running()
    }

    /// Requests shutdown; with `wait`, blocks until the thread has exited.
    ///
    /// Queued data commands are drained before the sinks close. Stopping a
    /// dispatcher that is not running is a no-op that reports `true`;
    /// `false` means the dispatch thread panicked.
    pub fn stop(&self, wait: bool) -> bool {
        let mut slot = self.lock_slot();
        let Slot::Active { sender, .. } = &*slot else {
            return true;
        };

        if self.shared.transition(DispatcherState::Running, DispatcherState::Stopping)
            || self.shared.transition(DispatcherState::Starting, DispatcherState::Stopping)
        {
            sender.submit(LogCommand::Stop, CommandPriority::Control);
        }

        if !wait {
            return true;
        }
        match reclaim(&mut slot) {
            Some(worker) => {
                *slot = Slot::Idle(worker);
                true
            }
            None => false,
        }
    }

    /// Hands `command` to the dispatch thread.
    ///
    /// Returns `false` when the command was not admitted: the dispatcher is
    /// not running, or the data channel is full.
    pub fn submit(&self, command: LogCommand, priority: CommandPriority) -> bool {
        let slot = self.lock_slot();
        match &*slot {
            Slot::Active { sender, .. } => sender.submit(command, priority),
            Slot::Idle(_) | Slot::Lost => false,
        }
    }

    /// Submits a single-scope or group priority change.
    pub fn update_scopes(&self, updates: Vec<ScopeUpdate>) -> bool {
        self.submit(LogCommand::UpdateScopes(updates), CommandPriority::Data)
    }

    /// Persists the current scope priorities through the configuration store.
    pub fn save_scopes(&self) -> bool {
        self.submit(LogCommand::SaveScopes, CommandPriority::Data)
    }

    /// Resumes or pauses delivery of records to remote sinks.
    ///
    /// The toggle is queued behind records already submitted from the
    /// calling thread, so it takes effect after they are delivered.
    pub fn set_remote_enabled(&self, enabled: bool) -> bool {
        let command = if enabled {
            LogCommand::EnableRemote
        } else {
            LogCommand::DisableRemote
        };
        self.submit(command, CommandPriority::Data)
    }

    /// Carries out a request received from an observer.
    ///
    /// Messages addressed to another instance, and messages that are not
    /// requests, are ignored and return `false`.
    pub fn handle_message(&self, message: &WireMessage) -> bool {
        if message.routing.target != self.options.instance_id() {
            tracing::trace!(
                target_id = message.routing.target,
                local_id = self.options.instance_id(),
                "ignoring message for another instance"
            );
            return false;
        }
        match command_for_message(message) {
            Some(command) => {
                let priority = command.default_priority();
                self.submit(command, priority)
            }
            None => false,
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LogDispatcher {
    fn drop(&mut self) {
        self.stop(true);
    }
}

impl fmt::Debug for LogDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogDispatcher")
            .field("state", &self.state())
            .field("options", &self.options)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Takes the worker back, joining the dispatch thread if one holds it.
///
/// Leaves `slot` as [`Slot::Lost`]; the caller stores the next state.
fn reclaim(slot: &mut Slot) -> Option<Box<Worker>> {
    match mem::replace(slot, Slot::Lost) {
        Slot::Idle(worker) => Some(worker),
        Slot::Active { join, .. } => match join.join() {
            Ok(worker) => Some(worker),
            Err(_) => {
                tracing::error!("dispatch thread panicked");
                None
            }
        },
        Slot::Lost => None,
    }
}

/// A sink plus the failure state used to rate-limit its diagnostics.
struct SinkSlot {
    sink: Box<dyn LogSink>,
    failing: bool,
}

impl SinkSlot {
    fn new(sink: Box<dyn LogSink>) -> Self {
        Self {
            sink,
            failing: false,
        }
    }

    fn record_result(&mut self, result: std::io::Result<()>, shared: &Shared) {
        match result {
            Ok(()) => {
                if mem::take(&mut self.failing) {
                    tracing::debug!(sink = %self.sink.kind(), "sink recovered");
                }
            }
            Err(error) => {
                shared.count_sink_failure();
                if !mem::replace(&mut self.failing, true) {
                    tracing::warn!(sink = %self.sink.kind(), %error, "sink write failed");
                }
            }
        }
    }
}

enum Flow {
    Continue,
    Exit,
}

/// State owned by the dispatch thread for the duration of a run.
struct Worker {
    registry: Arc<ScopeRegistry>,
    store: Box<dyn ConfigStore>,
    sinks: Vec<SinkSlot>,
    remote_enabled: bool,
    started: bool,
    dirty: bool,
    module_name: String,
    shared: Arc<Shared>,
}

impl Worker {
    fn run(mut self: Box<Self>, channels: Channels, ready: Sender<()>) -> Box<Self> {
        let mut ready = Some(ready);
        loop {
            let Some(command) = self.next_command(&channels) else {
                tracing::debug!("dispatcher channels disconnected");
                self.stop(&channels.data);
                break;
            };
            self.shared.count_command();
            if let Flow::Exit = self.handle(command, &channels, &mut ready) {
                break;
            }
        }
        self
    }

    /// Takes the next command, control first. Flushes buffered sinks before
    /// blocking on an empty queue. Returns `None` once the producers are gone.
    fn next_command(&mut self, channels: &Channels) -> Option<LogCommand> {
        loop {
            match channels.control.try_recv() {
                Ok(command) => return Some(command),
                Err(TryRecvError::Disconnected) => return None,
                Err(TryRecvError::Empty) => {}
            }
            match channels.data.try_recv() {
                Ok(command) => return Some(command),
                Err(TryRecvError::Disconnected) => return None,
                Err(TryRecvError::Empty) => {}
            }

            self.flush_buffered();
            // Wait without receiving so the next pass still prefers control.
            let mut select = Select::new();
            select.recv(&channels.control);
            select.recv(&channels.data);
            select.ready();
        }
    }

    fn handle(
        &mut self,
        command: LogCommand,
        channels: &Channels,
        ready: &mut Option<Sender<()>>,
    ) -> Flow {
        match command {
            LogCommand::Start => {
                self.start();
                if let Some(ready) = ready.take() {
                    let _ = ready.send(());
                }
            }
            LogCommand::Stop => {
                self.stop(&channels.data);
                return Flow::Exit;
            }
            command => self.handle_data(command),
        }
        Flow::Continue
    }

    fn handle_data(&mut self, command: LogCommand) {
        match command {
            LogCommand::LogMessage(record) => self.fan_out(&record),
            LogCommand::UpdateScopes(updates) => self.update_scopes(&updates),
            LogCommand::SaveScopes => self.save_scopes(),
            LogCommand::EnableRemote => self.set_remote(true),
            LogCommand::DisableRemote => self.set_remote(false),
            LogCommand::QueryScopes { target } => {
                tracing::trace!(target_id = target, "scope query is answered by the observer");
            }
            command => {
                tracing::trace!(action = ?command.action(), "lifecycle command on the data channel ignored");
            }
        }
    }

    fn start(&mut self) {
        if self.started {
            tracing::trace!("dispatcher already started");
            return;
        }

        let config = match self.store.load() {
            Ok(config) => Some(config),
            Err(error) => {
                tracing::warn!(%error, "logging configuration unavailable; logging disabled");
                None
            }
        };

        self.registry.set_module_name(&self.module_name);
        let mut failures = Vec::new();
        if let Some(config) = &config {
            self.registry.configure(config.profile());
            self.registry.activate();

            for slot in &mut self.sinks {
                let kind = slot.sink.kind();
                if !config.sinks.is_enabled(kind) {
                    continue;
                }
                match slot.sink.open() {
                    Ok(()) => tracing::debug!(sink = %kind, "sink opened"),
                    Err(error) => {
                        tracing::warn!(sink = %kind, %error, "sink failed to open");
                        failures.push(format!("{kind} sink failed to open: {error}"));
                    }
                }
            }
        }

        self.started = true;
        self.remote_enabled = true;
        self.shared.set_state(DispatcherState::Running);

        for failure in failures {
            let mut record = LogRecord::text(
                ScopeId::of(DISPATCH_THREAD_NAME),
                Severity::Error,
                &failure,
            );
            record.module_name.set(&self.module_name);
            record.thread_name.set(DISPATCH_THREAD_NAME);
            self.fan_out(&record);
        }
        self.notify(&SinkNotice::ScopesRegistered(self.registry.snapshot()));
    }

    fn stop(&mut self, data: &Receiver<LogCommand>) {
        // Producers are refused from here on, so the data queue only shrinks.
        self.shared.set_state(DispatcherState::Stopping);

        let mut drained = 0usize;
        while let Ok(command) = data.try_recv() {
            self.shared.count_command();
            self.handle_data(command);
            drained += 1;
        }
        if drained > 0 {
            tracing::debug!(commands = drained, "drained queued commands before stop");
        }

        self.registry.deactivate();
        self.registry.detach();

        for slot in &mut self.sinks {
            if slot.sink.is_open() {
                let result = slot.sink.flush();
                slot.record_result(result, &self.shared);
                slot.sink.close();
            }
            slot.failing = false;
        }
        self.dirty = false;
        self.started = false;
        self.shared.set_state(DispatcherState::Stopped);
    }

    fn set_remote(&mut self, enabled: bool) {
        if self.remote_enabled != enabled {
            tracing::debug!(enabled, "remote delivery toggled");
        }
        self.remote_enabled = enabled;
    }

    /// Writes `record` to every open sink. A failing sink does not keep the
    /// record from the others.
    fn fan_out(&mut self, record: &LogRecord) {
        let mut delivered = false;
        for slot in &mut self.sinks {
            if !slot.sink.is_open() {
                continue;
            }
            if slot.sink.kind() == SinkKind::Remote && !self.remote_enabled {
                continue;
            }
            let result = slot.sink.write(record);
            delivered |= result.is_ok() && slot.sink.buffered();
            slot.record_result(result, &self.shared);
        }
        self.dirty |= delivered;
        self.shared.count_record();
    }

    fn update_scopes(&mut self, updates: &[ScopeUpdate]) {
        let changed: usize = updates
            .iter()
            .map(|update| self.registry.apply_update(update))
            .sum();
        tracing::debug!(updates = updates.len(), changed, "scope priorities updated");
        self.notify(&SinkNotice::ScopesUpdated(self.registry.snapshot()));
    }

    fn save_scopes(&mut self) {
        let snapshot = self.registry.snapshot();
        match self.store.save_scopes(&snapshot) {
            Ok(()) => {
                tracing::debug!(scopes = snapshot.len(), "scope priorities saved");
                self.notify(&SinkNotice::ConfigurationSaved);
            }
            Err(error) => tracing::warn!(%error, "failed to save scope priorities"),
        }
    }

    fn notify(&mut self, notice: &SinkNotice) {
        for slot in &mut self.sinks {
            if slot.sink.is_open() {
                let result = slot.sink.notify(notice);
                slot.record_result(result, &self.shared);
            }
        }
        self.dirty = true;
    }

    fn flush_buffered(&mut self) {
        if !mem::take(&mut self.dirty) {
            return;
        }
        for slot in &mut self.sinks {
            if slot.sink.is_open() && slot.sink.buffered() {
                let result = slot.sink.flush();
                slot.record_result(result, &self.shared);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogConfig, MemoryConfigStore, SinkSwitches};
    use logging::{LogScope, Priority, ScopeMessage};
    use std::time::Duration;
    use test_support::{FailingSink, MemorySink, wait_for};

    fn config() -> LogConfig {
        LogConfig {
            sinks: SinkSwitches::all(),
            default_priority: Priority::INFO,
            scopes: Vec::new(),
        }
    }

    fn dispatcher(store: MemoryConfigStore) -> (Arc<ScopeRegistry>, LogDispatcher) {
        let registry = Arc::new(ScopeRegistry::new());
        let options = DispatcherOptions::builder()
            .module_name("unit")
            .start_timeout(Duration::from_secs(2))
            .build();
        let dispatcher = LogDispatcher::with_registry(Arc::clone(&registry), store, options);
        (registry, dispatcher)
    }

    #[test]
    fn start_and_stop_cycle_states() {
        let (registry, dispatcher) = dispatcher(MemoryConfigStore::new(config()));
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);
        assert!(dispatcher.start());
        assert!(dispatcher.start());
        assert!(registry.is_active());
        assert!(registry.submitter().is_some());

        assert!(dispatcher.stop(true));
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);
        assert!(!registry.is_active());
        assert!(registry.submitter().is_none());
        assert!(dispatcher.stop(true));
    }

    #[test]
    fn restart_reuses_sinks() {
        let sink = MemorySink::new(SinkKind::File);
        let (registry, dispatcher) = dispatcher(MemoryConfigStore::new(config()));
        dispatcher.add_sink(sink.clone());
        let scope = LogScope::with_registry("restart", &registry);

        for round in 0..2 {
            assert!(dispatcher.start());
            assert!(scope.log(Severity::Info, format_args!("round {round}")));
            assert!(dispatcher.stop(true));
        }
        assert_eq!(sink.messages(), ["round 0", "round 1"]);
        assert_eq!(sink.open_count(), 2);
    }

    #[test]
    fn records_reach_sinks_and_are_flushed() {
        let sink = MemorySink::new(SinkKind::File);
        let (registry, dispatcher) = dispatcher(MemoryConfigStore::new(config()));
        dispatcher.add_sink(sink.clone());
        assert!(dispatcher.start());

        let scope = LogScope::with_registry("unit", &registry);
        {
            let message = ScopeMessage::enter(&scope);
            assert!(message.log_info(format_args!("hello")));
        }
        assert!(dispatcher.stop(true));

        assert_eq!(sink.messages(), ["hello"]);
        assert!(sink.flush_count() >= 1);
        assert_eq!(dispatcher.stats().records, 1);
        assert!(!sink.is_open_now());
    }

    #[test]
    fn sinks_added_while_running_are_refused() {
        let (_registry, dispatcher) = dispatcher(MemoryConfigStore::new(config()));
        assert!(dispatcher.start());
        assert!(!dispatcher.add_sink(MemorySink::new(SinkKind::File)));
        assert!(dispatcher.stop(true));
        assert!(dispatcher.add_sink(MemorySink::new(SinkKind::File)));
    }

    #[test]
    fn disabled_kinds_stay_closed() {
        let file = MemorySink::new(SinkKind::File);
        let remote = MemorySink::new(SinkKind::Remote);
        let mut cfg = config();
        cfg.sinks.remote = false;
        let (_registry, dispatcher) = dispatcher(MemoryConfigStore::new(cfg));
        dispatcher.add_sink(file.clone());
        dispatcher.add_sink(remote.clone());
        assert!(dispatcher.start());
        assert!(file.is_open_now());
        assert!(!remote.is_open_now());
        assert!(dispatcher.stop(true));
    }

    #[test]
    fn missing_configuration_still_runs_with_logging_disabled() {
        let sink = MemorySink::new(SinkKind::File);
        let (registry, dispatcher) = dispatcher(MemoryConfigStore::empty());
        dispatcher.add_sink(sink.clone());
        let scope = LogScope::with_registry("quiet", &registry);

        assert!(dispatcher.start());
        assert!(dispatcher.is_running());
        assert!(!sink.is_open_now());
        assert_eq!(scope.priority(), Priority::UNSET);
        assert!(!scope.log(Severity::Fatal, format_args!("dropped")));
        assert!(dispatcher.stop(true));
    }

    #[test]
    fn open_failure_is_reported_to_healthy_sinks() {
        let healthy = MemorySink::new(SinkKind::DebugOutput);
        let (_registry, dispatcher) = dispatcher(MemoryConfigStore::new(config()));
        dispatcher.add_sink(FailingSink::failing_open(SinkKind::Database));
        dispatcher.add_sink(healthy.clone());
        assert!(dispatcher.start());
        assert!(dispatcher.stop(true));

        let records = healthy.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity(), Some(Severity::Error));
        assert!(records[0].message.as_str().starts_with("database sink failed to open"));
    }

    #[test]
    fn remote_toggle_gates_remote_sinks_only() {
        let remote = MemorySink::new(SinkKind::Remote);
        let file = MemorySink::new(SinkKind::File);
        let (registry, dispatcher) = dispatcher(MemoryConfigStore::new(config()));
        dispatcher.add_sink(remote.clone());
        dispatcher.add_sink(file.clone());
        assert!(dispatcher.start());
        let scope = LogScope::with_registry("toggle", &registry);

        assert!(scope.log(Severity::Info, format_args!("before")));
        assert!(dispatcher.set_remote_enabled(false));
        assert!(scope.log(Severity::Info, format_args!("local only")));
        assert!(dispatcher.set_remote_enabled(true));
        assert!(scope.log(Severity::Info, format_args!("everywhere")));
        assert!(dispatcher.stop(true));

        assert_eq!(remote.messages(), ["before", "everywhere"]);
        assert_eq!(file.messages(), ["before", "local only", "everywhere"]);
    }

    #[test]
    fn stop_drains_updates_and_saves_queued_before_it() {
        let store = MemoryConfigStore::new(config());
        let sink = MemorySink::new(SinkKind::Remote);
        let (registry, dispatcher) = dispatcher(store.clone());
        dispatcher.add_sink(sink.clone());
        let scope = LogScope::with_registry("drained", &registry);

        for round in 0..200 {
            let priority = if round % 2 == 0 {
                Priority::FATAL
            } else {
                Priority::WARNING
            };
            assert!(dispatcher.start());
            assert!(dispatcher.update_scopes(vec![ScopeUpdate::named("drained", priority)]));
            assert!(dispatcher.save_scopes());
            assert!(dispatcher.stop(true));

            let saved = store.config().expect("saved");
            assert_eq!(saved.profile().resolve("drained"), priority, "round {round}");
            assert_eq!(sink.notices().last(), Some(&SinkNotice::ConfigurationSaved));
        }
        assert_eq!(scope.priority(), Priority::UNSET);
    }

    #[test]
    fn notices_follow_lifecycle_and_updates() {
        let sink = MemorySink::new(SinkKind::Remote);
        let store = MemoryConfigStore::new(config());
        let (registry, dispatcher) = dispatcher(store.clone());
        dispatcher.add_sink(sink.clone());
        let _scope = LogScope::with_registry("noticed", &registry);

        assert!(dispatcher.start());
        assert!(dispatcher.update_scopes(vec![ScopeUpdate::named("noticed", Priority::DEBUG)]));
        assert!(dispatcher.save_scopes());
        assert!(dispatcher.stop(true));

        let notices = sink.notices();
        assert_eq!(notices.len(), 3);
        assert!(matches!(&notices[0], SinkNotice::ScopesRegistered(scopes) if scopes.len() == 1));
        let SinkNotice::ScopesUpdated(scopes) = &notices[1] else {
            panic!("expected scopes updated");
        };
        assert_eq!(scopes[0].priority, Priority::DEBUG);
        assert_eq!(notices[2], SinkNotice::ConfigurationSaved);

        let saved = store.config().expect("saved");
        assert_eq!(saved.profile().resolve("noticed"), Priority::DEBUG);
    }

    #[test]
    fn submit_is_refused_when_stopped() {
        let (_registry, dispatcher) = dispatcher(MemoryConfigStore::new(config()));
        assert!(!dispatcher.submit(LogCommand::SaveScopes, CommandPriority::Data));
        assert!(!dispatcher.save_scopes());
    }

    #[test]
    fn handle_message_checks_the_target() {
        let store = MemoryConfigStore::new(config());
        let (registry, dispatcher) = dispatcher(store.clone());
        let _scope = LogScope::with_registry("remote_ctl", &registry);
        assert!(dispatcher.start());

        let message = |target, body| WireMessage::new(protocol::Routing::new(target, 1, 0), body);
        let update = || {
            protocol::WireBody::UpdateScopes(vec![ScopeUpdate::named("remote_ctl", Priority::FATAL)])
        };
        assert!(!dispatcher.handle_message(&message(5, update())));
        assert!(!dispatcher.handle_message(&message(0, protocol::WireBody::ConfigurationSaved)));
        assert!(dispatcher.handle_message(&message(0, update())));
        assert!(dispatcher.handle_message(&message(0, protocol::WireBody::SaveConfiguration)));
        assert!(dispatcher.stop(true));

        let saved = store.config().expect("saved");
        assert_eq!(saved.profile().resolve("remote_ctl"), Priority::FATAL);
    }

    #[test]
    fn stop_without_wait_then_restart() {
        let (_registry, dispatcher) = dispatcher(MemoryConfigStore::new(config()));
        assert!(dispatcher.start());
        assert!(dispatcher.stop(false));
        assert!(dispatcher.start());
        assert!(dispatcher.is_running());
        assert!(dispatcher.stop(true));
    }
}
