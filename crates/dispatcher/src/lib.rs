#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! crates/dispatcher/src/lib.rs
//!
//! # Overview
//!
//! `dispatcher` runs the single consumer thread that serialises every
//! logging action of a process. Producers never touch sinks: scopes queue
//! [`LogCommand`](logging::LogCommand)s through the submitter attached to
//! their registry, and the dispatch thread fans records out to the sinks,
//! applies scope priority changes and persists them.
//!
//! # Design
//!
//! - [`LogDispatcher`] owns the lifecycle
//!   (`Stopped -> Starting -> Running -> Stopping -> Stopped`) and the
//!   sinks between runs.
//! - Two channels feed the thread. Control commands (start, stop) are
//!   unbounded and always taken first; data commands (records, updates,
//!   saves, remote toggles) are bounded, refused when full and kept in
//!   submission order. Stop drains every queued data command before the
//!   sinks close.
//! - [`ConfigStore`] supplies a [`LogConfig`] at start and receives the scope
//!   table on save. [`TomlConfigStore`] keeps it in a TOML file.
//! - [`command_for_message`] maps requests arriving from an observer onto
//!   commands.
//!
//! # Errors
//!
//! Lifecycle calls report `bool`. Configuration and sink failures are
//! absorbed by the dispatch thread and reported through `tracing`; a missing
//! configuration leaves the dispatcher running with logging disabled.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use dispatcher::{DispatcherOptions, LogConfig, LogDispatcher, MemoryConfigStore, SinkSwitches};
//! use logging::{LogScope, Priority, ScopeRegistry, Severity};
//! use logging_sink::DebugOutputSink;
//!
//! let registry = Arc::new(ScopeRegistry::new());
//! let config = LogConfig {
//!     sinks: SinkSwitches { debug_output: true, ..SinkSwitches::default() },
//!     ..LogConfig::default()
//! }
//! .with_scope("app_*", Priority::INFO);
//!
//! let dispatcher = LogDispatcher::with_registry(
//!     Arc::clone(&registry),
//!     MemoryConfigStore::new(config),
//!     DispatcherOptions::builder().module_name("demo").build(),
//! )
//! .with_sink(DebugOutputSink::new(Vec::new()));
//!
//! assert!(dispatcher.start());
//! let scope = LogScope::with_registry("app_main", &registry);
//! assert!(scope.log(Severity::Info, format_args!("started")));
//! assert!(dispatcher.stop(true));
//! ```

mod config;
mod dispatcher;
mod options;
mod queue;
mod translate;

pub use config::{
    ConfigError, ConfigStore, LogConfig, MemoryConfigStore, ScopeConfig, SinkSwitches,
    TomlConfigStore,
};
pub use dispatcher::LogDispatcher;
pub use options::{
    DEFAULT_DATA_CAPACITY, DEFAULT_START_TIMEOUT, DISPATCH_THREAD_NAME, DispatcherOptions,
    DispatcherOptionsBuilder,
};
pub use queue::{DispatcherState, DispatcherStats};
pub use translate::command_for_message;
