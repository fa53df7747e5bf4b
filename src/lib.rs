#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `scopelog` gathers the workspace crates behind one dependency:
//!
//! - [`logging`]: scopes, priorities, the registry and the `ScopeMessage`
//!   guard that producers use.
//! - [`protocol`]: the observer wire format.
//! - [`logging_sink`]: the sink contract and the file, debug-output and
//!   remote sinks.
//! - [`dispatcher`]: the dispatch thread that owns the sinks.
//! - [`observer`]: the observer-side mirror of connected instances.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use scopelog::dispatcher::{DispatcherOptions, LogConfig, LogDispatcher, MemoryConfigStore, SinkSwitches};
//! use scopelog::logging::{LogScope, Priority, ScopeMessage, ScopeRegistry, scope_info};
//! use scopelog::logging_sink::DebugOutputSink;
//!
//! let config = LogConfig {
//!     sinks: SinkSwitches { debug_output: true, ..SinkSwitches::default() },
//!     default_priority: Priority::INFO | Priority::SCOPE,
//!     scopes: Vec::new(),
//! };
//! let registry = Arc::new(ScopeRegistry::new());
//! let dispatcher = LogDispatcher::with_registry(
//!     Arc::clone(&registry),
//!     MemoryConfigStore::new(config),
//!     DispatcherOptions::default(),
//! )
//! .with_sink(DebugOutputSink::new(Vec::new()));
//!
//! let scope = LogScope::with_registry("ThreadCentral", &registry);
//! assert!(dispatcher.start());
//! {
//!     let message = ScopeMessage::enter(&scope);
//!     scope_info!(message, "worker {} ready", 3);
//! }
//! assert!(dispatcher.stop(true));
//! ```

pub use dispatcher;
pub use logging;
pub use logging_sink;
pub use observer;
pub use protocol;
