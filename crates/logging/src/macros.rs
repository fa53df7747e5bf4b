//! crates/logging/src/macros.rs
//! Severity macros that skip formatting when the guard's priority rejects it.
//!
//! Each macro takes a [`ScopeMessage`](crate::ScopeMessage) followed by
//! `format!`-style arguments. The arguments are only evaluated when the
//! cached priority admits the severity.

/// Emit a debug record through a scope guard.
///
/// # Example
/// ```
/// use logging::{LogScope, ScopeMessage, scope_debug};
///
/// let scope = LogScope::detached("demo");
/// let message = ScopeMessage::enter(&scope);
/// scope_debug!(message, "frame {} took {}us", 7, 412);
/// ```
#[macro_export]
macro_rules! scope_debug {
    ($message:expr, $($arg:tt)+) => {{
        let message = &$message;
        if message.is_enabled($crate::Severity::Debug) {
            message.log_debug(::std::format_args!($($arg)+));
        }
    }};
}

/// Emit an info record through a scope guard.
#[macro_export]
macro_rules! scope_info {
    ($message:expr, $($arg:tt)+) => {{
        let message = &$message;
        if message.is_enabled($crate::Severity::Info) {
            message.log_info(::std::format_args!($($arg)+));
        }
    }};
}

/// Emit a warning record through a scope guard.
#[macro_export]
macro_rules! scope_warning {
    ($message:expr, $($arg:tt)+) => {{
        let message = &$message;
        if message.is_enabled($crate::Severity::Warning) {
            message.log_warning(::std::format_args!($($arg)+));
        }
    }};
}

/// Emit an error record through a scope guard.
#[macro_export]
macro_rules! scope_error {
    ($message:expr, $($arg:tt)+) => {{
        let message = &$message;
        if message.is_enabled($crate::Severity::Error) {
            message.log_error(::std::format_args!($($arg)+));
        }
    }};
}

/// Emit a fatal record through a scope guard.
#[macro_export]
macro_rules! scope_fatal {
    ($message:expr, $($arg:tt)+) => {{
        let message = &$message;
        if message.is_enabled($crate::Severity::Fatal) {
            message.log_fatal(::std::format_args!($($arg)+));
        }
    }};
}

#[cfg(test)]
mod tests {
    use crate::{LogScope, Priority, ScopeMessage};
    use std::cell::Cell;

    #[test]
    fn arguments_are_not_evaluated_when_disabled() {
        let scope = LogScope::detached("lazy");
        scope.set_priority(Priority::ERROR);
        let message = ScopeMessage::enter(&scope);
        let calls = Cell::new(0);
        let count = || {
            calls.set(calls.get() + 1);
            calls.get()
        };

        scope_debug!(message, "{}", count());
        scope_info!(message, "{}", count());
        scope_warning!(message, "{}", count());
        assert_eq!(calls.get(), 0);

        scope_error!(message, "{}", count());
        scope_fatal!(message, "{}", count());
        assert_eq!(calls.get(), 2);
    }
}
