#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` provides the producer side of scope-filtered logging: named
//! [`LogScope`]s whose [`Priority`] can be changed at runtime, the
//! [`ScopeRegistry`] that addresses them by [`ScopeId`], and the
//! [`ScopeMessage`] guard that gates text output and emits enter/exit records.
//!
//! # Design
//!
//! Producers never write anywhere themselves. A [`ScopeMessage`] builds a
//! [`LogRecord`] and hands it, wrapped in a [`LogCommand`], to the
//! [`CommandSubmitter`] attached to the scope's registry. The dispatcher crate
//! provides the submitter; when none is attached, records are dropped.
//!
//! # Invariants
//!
//! - A scope id is the xxh32 hash of the scope name; group names (ending in
//!   `*`) carry [`ScopeId::GROUP`].
//! - The registry holds weak references only. Dropping a scope removes its entry;
//!   dropping the registry first leaves scopes usable and silent.
//! - A guard caches the priority at entry, so `is_enabled` answers the same
//!   question for the guard's whole lifetime.
//! - Message text is truncated to [`MESSAGE_CAPACITY`] bytes, never rejected.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use logging::{LogScope, Priority, ScopeMessage, ScopeRegistry, scope_info};
//!
//! let registry = Arc::new(ScopeRegistry::new());
//! let scope = LogScope::with_registry("ThreadCentral", &registry);
//! scope.set_priority(Priority::INFO | Priority::SCOPE);
//!
//! let message = ScopeMessage::enter(&scope);
//! scope_info!(message, "worker {} ready", 3);
//! ```

pub mod clock;
mod command;
#[macro_use]
mod macros;
mod message;
mod priority;
mod record;
mod registry;
mod scope;
mod scope_id;
#[cfg(feature = "tracing")]
mod tracing_bridge;

pub use command::{CommandPriority, CommandSubmitter, LogAction, LogCommand, ScopeUpdate};
pub use message::ScopeMessage;
pub use priority::{ParsePriorityError, Priority, Severity};
pub use record::{
    BoundedText, DataOrigin, LogRecord, MESSAGE_CAPACITY, MODULE_NAME_CAPACITY, MessageKind,
    THREAD_NAME_CAPACITY,
};
pub use registry::{ProfileEntry, RegisterError, ScopeProfile, ScopeRegistry, ScopeSnapshot};
pub use scope::LogScope;
pub use scope_id::{GROUP_SUFFIX, ScopeId, group_matches, group_prefix, is_group_name};
#[cfg(feature = "tracing")]
pub use tracing_bridge::{ScopeLayer, init_tracing};
