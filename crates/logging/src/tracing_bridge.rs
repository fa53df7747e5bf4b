//! crates/logging/src/tracing_bridge.rs
//! Bridge between the tracing crate and scope-gated log records.
//!
//! [`ScopeLayer`] is a tracing-subscriber layer that turns every event into
//! a text record of a [`LogScope`] named after the event's target. The scope
//! is created on first use in the layer's registry, so it can be addressed by
//! name like any other scope and is gated by its live priority.
//!
//! Events from this workspace's own crates are ignored. The dispatcher logs
//! through `tracing` while it writes records, and feeding those events back
//! into the queue would loop.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logging::{ScopeRegistry, init_tracing};
//!
//! init_tracing(ScopeRegistry::global().clone())?;
//! tracing::info!(target: "renderer::frame", "frame presented");
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::priority::Severity;
use crate::record::{BoundedText, MESSAGE_CAPACITY};
use crate::registry::ScopeRegistry;
use crate::scope::LogScope;

/// Target prefixes whose events never become records.
const INTERNAL_TARGETS: &[&str] = &[
    "logging",
    "protocol",
    "logging_sink",
    "dispatcher",
    "observer",
];

/// A tracing layer that routes events into scopes of a [`ScopeRegistry`].
pub struct ScopeLayer {
    registry: Arc<ScopeRegistry>,
    scopes: DashMap<&'static str, Arc<LogScope>>,
}

impl ScopeLayer {
    /// Creates a layer whose scopes live in `registry`.
    #[must_use]
    pub fn new(registry: Arc<ScopeRegistry>) -> Self {
        Self {
            registry,
            scopes: DashMap::new(),
        }
    }

    /// Map a tracing level to a record severity.
    const fn level_to_severity(level: &Level) -> Severity {
        match *level {
            Level::ERROR => Severity::Error,
            Level::WARN => Severity::Warning,
            Level::INFO => Severity::Info,
            Level::DEBUG | Level::TRACE => Severity::Debug,
        }
    }

    fn is_internal(target: &str) -> bool {
        INTERNAL_TARGETS.iter().any(|prefix| {
            target
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
    }

    fn scope_for(&self, target: &'static str) -> Arc<LogScope> {
        if let Some(scope) = self.scopes.get(target) {
            return Arc::clone(scope.value());
        }
        let entry = self
            .scopes
            .entry(target)
            .or_insert_with(|| Arc::new(LogScope::with_registry(target, &self.registry)));
        Arc::clone(entry.value())
    }
}

impl<S> Layer<S> for ScopeLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();
        if Self::is_internal(target) {
            return;
        }

        let severity = Self::level_to_severity(metadata.level());
        let scope = self.scope_for(target);
        if !scope.priority().meets_severity(severity) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        scope.log(severity, format_args!("{}", visitor.text));
    }
}

/// Visitor collecting the `message` field followed by `key=value` pairs.
#[derive(Default)]
struct MessageVisitor {
    text: BoundedText<MESSAGE_CAPACITY>,
}

impl MessageVisitor {
    fn separate(&mut self) {
        if !self.text.is_empty() {
            self.text.push_str(" ");
        }
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.separate();
        if field.name() == "message" {
            let _ = write!(self.text, "{value:?}");
        } else {
            let _ = write!(self.text, "{}={value:?}", field.name());
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.separate();
        if field.name() == "message" {
            self.text.push_str(value);
        } else {
            let _ = write!(self.text, "{}={value}", field.name());
        }
    }
}

/// Installs a global subscriber with a [`ScopeLayer`] over `registry`.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing(
    registry: Arc<ScopeRegistry>,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(ScopeLayer::new(registry))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_severities() {
        assert_eq!(ScopeLayer::level_to_severity(&Level::ERROR), Severity::Error);
        assert_eq!(ScopeLayer::level_to_severity(&Level::WARN), Severity::Warning);
        assert_eq!(ScopeLayer::level_to_severity(&Level::INFO), Severity::Info);
        assert_eq!(ScopeLayer::level_to_severity(&Level::DEBUG), Severity::Debug);
        assert_eq!(ScopeLayer::level_to_severity(&Level::TRACE), Severity::Debug);
    }

    #[test]
    fn workspace_targets_are_internal() {
        assert!(ScopeLayer::is_internal("dispatcher"));
        assert!(ScopeLayer::is_internal("dispatcher::worker"));
        assert!(ScopeLayer::is_internal("logging::registry"));
        assert!(!ScopeLayer::is_internal("logging_extra"));
        assert!(!ScopeLayer::is_internal("renderer::frame"));
    }

    #[test]
    fn scopes_are_created_once_per_target() {
        let registry = Arc::new(ScopeRegistry::new());
        let layer = ScopeLayer::new(Arc::clone(&registry));
        let first = layer.scope_for("renderer::frame");
        let second = layer.scope_for("renderer::frame");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }
}
