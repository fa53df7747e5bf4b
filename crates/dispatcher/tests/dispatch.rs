//! Integration tests for the dispatch thread.
//!
//! These drive a [`LogDispatcher`] end to end through scopes registered on a
//! private registry and observe the effects through shared test sinks.

use std::sync::Arc;
use std::time::Duration;

use dispatcher::{
    DispatcherOptions, DispatcherState, LogConfig, LogDispatcher, MemoryConfigStore, SinkSwitches,
    TomlConfigStore,
};
use logging::{
    LogScope, MessageKind, Priority, ScopeId, ScopeMessage, ScopeRegistry, ScopeUpdate, Severity,
};
use logging_sink::{FileSink, LogSink, RemoteEndpoint, RemoteSink, SinkKind};
use protocol::WireBody;
use test_support::{FailingSink, MemorySink, MemoryTransport, wait_for};

fn options() -> DispatcherOptions {
    DispatcherOptions::builder()
        .module_name("itest")
        .instance_id(3)
        .start_timeout(Duration::from_secs(5))
        .build()
}

fn all_sinks(default_priority: Priority) -> LogConfig {
    LogConfig {
        sinks: SinkSwitches::all(),
        default_priority,
        scopes: Vec::new(),
    }
}

fn setup(config: LogConfig) -> (Arc<ScopeRegistry>, LogDispatcher) {
    let registry = Arc::new(ScopeRegistry::new());
    let dispatcher =
        LogDispatcher::with_registry(Arc::clone(&registry), MemoryConfigStore::new(config), options());
    (registry, dispatcher)
}

// ============================================================================
// Fan-out
// ============================================================================

/// A sink that never opened does not keep records from a healthy one.
#[test]
fn fan_out_reaches_healthy_sink_when_another_failed_to_open() {
    let healthy = MemorySink::new(SinkKind::File);
    let (registry, dispatcher) = setup(all_sinks(Priority::INFO));
    dispatcher.add_sink(healthy.clone());
    dispatcher.add_sink(FailingSink::failing_open(SinkKind::Remote));
    let scope = LogScope::with_registry("fanout", &registry);

    assert!(dispatcher.start());
    assert!(scope.log(Severity::Warning, format_args!("still delivered")));
    assert!(dispatcher.stop(true));

    let messages = healthy.messages();
    assert!(messages.iter().any(|m| m.starts_with("remote sink failed to open")));
    assert_eq!(messages.last().map(String::as_str), Some("still delivered"));
}

/// Write failures on one sink are counted and do not stop the others.
#[test]
fn write_failures_are_isolated_and_counted() {
    let healthy = MemorySink::new(SinkKind::DebugOutput);
    let (registry, dispatcher) = setup(all_sinks(Priority::INFO));
    dispatcher.add_sink(FailingSink::failing_write(SinkKind::File));
    dispatcher.add_sink(healthy.clone());
    let scope = LogScope::with_registry("isolated", &registry);

    assert!(dispatcher.start());
    for n in 0..3 {
        scope.log(Severity::Info, format_args!("record {n}"));
    }
    assert!(dispatcher.stop(true));

    assert_eq!(healthy.messages(), ["record 0", "record 1", "record 2"]);
    let stats = dispatcher.stats();
    assert_eq!(stats.records, 3);
    assert!(stats.sink_failures >= 3);
}

/// Records queued before stop are written before the sinks close.
#[test]
fn stop_drains_queued_records() {
    let sink = MemorySink::new(SinkKind::File);
    let (registry, dispatcher) = setup(all_sinks(Priority::DEBUG));
    dispatcher.add_sink(sink.clone());
    let scope = LogScope::with_registry("drain", &registry);

    assert!(dispatcher.start());
    for n in 0..200 {
        assert!(scope.log(Severity::Debug, format_args!("{n}")));
    }
    assert!(dispatcher.stop(true));

    assert_eq!(sink.messages().len(), 200);
    assert_eq!(dispatcher.state(), DispatcherState::Stopped);
}

/// Scope sessions arrive as one enter and one exit sharing a session id.
#[test]
fn scope_sessions_reach_sinks_in_pairs() {
    let sink = MemorySink::new(SinkKind::File);
    let mut config = all_sinks(Priority::UNSET);
    config = config.with_scope("ThreadCentral", Priority::DEBUG | Priority::SCOPE);
    let (registry, dispatcher) = setup(config);
    dispatcher.add_sink(sink.clone());
    let scope = LogScope::with_registry("ThreadCentral", &registry);

    assert!(dispatcher.start());
    {
        let message = ScopeMessage::enter(&scope);
        assert!(message.log_info(format_args!("x")));
    }
    assert!(dispatcher.stop(true));

    let records = sink.records();
    let kinds: Vec<_> = records.iter().map(|r| r.message_kind).collect();
    assert_eq!(
        kinds,
        [MessageKind::ScopeEnter, MessageKind::Text, MessageKind::ScopeExit]
    );
    assert!(records.iter().all(|r| r.scope_id == ScopeId::of("ThreadCentral")));
    assert!(records.iter().all(|r| r.session_id == 0));
    assert!(records.iter().all(|r| r.module_name.as_str() == "itest"));
    assert_eq!(records[2].duration, records[2].timestamp - records[0].timestamp);
}

// ============================================================================
// Scope updates
// ============================================================================

/// A group update changes every matching scope and nothing else.
#[test]
fn group_update_changes_matching_scopes_only() {
    let (registry, dispatcher) = setup(all_sinks(Priority::DEBUG));
    let tcp = LogScope::with_registry("net_tcp", &registry);
    let udp = LogScope::with_registry("net_udp", &registry);
    let core = LogScope::with_registry("app_core", &registry);

    assert!(dispatcher.start());
    assert_eq!(tcp.priority(), Priority::DEBUG);
    assert!(dispatcher.update_scopes(vec![ScopeUpdate::named("net_*", Priority::ERROR)]));
    assert!(wait_for(|| udp.priority() == Priority::ERROR));

    assert_eq!(tcp.priority(), Priority::ERROR);
    assert_eq!(core.priority(), Priority::DEBUG);
    assert!(dispatcher.stop(true));
}

/// A single update addresses its scope by id.
#[test]
fn single_update_targets_one_scope() {
    let (registry, dispatcher) = setup(all_sinks(Priority::INFO));
    let one = LogScope::with_registry("one", &registry);
    let two = LogScope::with_registry("two", &registry);

    assert!(dispatcher.start());
    assert!(dispatcher.update_scopes(vec![ScopeUpdate::named("one", Priority::FATAL)]));
    assert!(wait_for(|| one.priority() == Priority::FATAL));
    assert_eq!(two.priority(), Priority::INFO);
    assert!(dispatcher.stop(true));
}

/// Scopes created while the dispatcher runs pick up the configured profile.
#[test]
fn late_scopes_receive_configured_priority() {
    let config = all_sinks(Priority::ERROR).with_scope("plugin_*", Priority::DEBUG);
    let (registry, dispatcher) = setup(config);
    assert!(dispatcher.start());

    let plugin = LogScope::with_registry("plugin_audio", &registry);
    let other = LogScope::with_registry("loader", &registry);
    assert_eq!(plugin.priority(), Priority::DEBUG);
    assert_eq!(other.priority(), Priority::ERROR);

    assert!(dispatcher.stop(true));
    assert_eq!(plugin.priority(), Priority::UNSET);
}

// ============================================================================
// Backends
// ============================================================================

/// Configuration and output both live on disk.
#[test]
fn toml_configuration_drives_file_sink() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("logging.toml");
    let log_path = dir.path().join("logs").join("app.log");
    std::fs::write(
        &config_path,
        "default_priority = [\"warning\"]\n\n[sinks]\nfile = true\n",
    )
    .expect("write config");

    let registry = Arc::new(ScopeRegistry::new());
    let dispatcher = LogDispatcher::with_registry(
        Arc::clone(&registry),
        TomlConfigStore::new(&config_path),
        options(),
    )
    .with_sink(FileSink::new(&log_path));
    let scope = LogScope::with_registry("disk", &registry);

    assert!(dispatcher.start());
    assert!(!scope.log(Severity::Info, format_args!("filtered")));
    assert!(scope.log(Severity::Error, format_args!("kept")));
    assert!(dispatcher.update_scopes(vec![ScopeUpdate::named("disk", Priority::INFO)]));
    assert!(dispatcher.save_scopes());
    assert!(dispatcher.stop(true));

    let log = std::fs::read_to_string(&log_path).expect("read log");
    assert!(log.contains("kept"));
    assert!(!log.contains("filtered"));

    let saved = std::fs::read_to_string(&config_path).expect("read config");
    let saved = LogConfig::from_toml(&saved).expect("parse saved");
    assert!(saved.sinks.file);
    assert_eq!(saved.profile().resolve("disk"), Priority::INFO);
}

/// The remote sink announces the scope table and then streams records.
#[test]
fn remote_sink_announces_scopes_then_streams() {
    let transport = MemoryTransport::new();
    let remote = RemoteSink::new(
        transport.clone(),
        RemoteEndpoint {
            local_id: 3,
            observer_id: 1,
        },
    );
    let (registry, dispatcher) = setup(all_sinks(Priority::INFO));
    dispatcher.add_sink(remote);
    let scope = LogScope::with_registry("wired", &registry);

    assert!(dispatcher.start());
    assert!(scope.log(Severity::Info, format_args!("over the wire")));
    assert!(dispatcher.stop(true));
    assert!(!transport.is_connected());

    let messages = transport.messages();
    let WireBody::RegisterScopes(scopes) = &messages[0].body else {
        panic!("expected scope announcement first");
    };
    assert_eq!(scopes[0].name, "wired");
    assert_eq!(scopes[0].priority, Priority::INFO);

    let WireBody::LogMessage(record) = &messages[1].body else {
        panic!("expected log message");
    };
    assert_eq!(record.message.as_str(), "over the wire");
    assert!(!record.thread_name.as_str().is_empty());
    assert_eq!(messages[1].routing.source, 3);
}

/// A refused connection leaves the remote sink closed without failing start.
#[test]
fn unreachable_observer_does_not_fail_start() {
    let local = MemorySink::new(SinkKind::File);
    let remote = RemoteSink::new(MemoryTransport::refusing(), RemoteEndpoint::default());
    assert!(!remote.is_open());

    let (_registry, dispatcher) = setup(all_sinks(Priority::INFO));
    dispatcher.add_sink(remote);
    dispatcher.add_sink(local.clone());
    assert!(dispatcher.start());
    assert!(dispatcher.stop(true));

    assert!(local.messages()[0].starts_with("remote sink failed to open"));
}
