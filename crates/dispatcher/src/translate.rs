//! crates/dispatcher/src/translate.rs
//! Mapping of inbound observer messages onto dispatcher commands.

use logging::LogCommand;
use protocol::{WireBody, WireMessage};

/// Translates a message received from an observer into the command that
/// carries it out locally.
///
/// Only requests addressed to an instance produce commands. Announcements,
/// acknowledgements and records return `None`.
///
/// ```
/// use dispatcher::command_for_message;
/// use logging::{LogCommand, Priority, ScopeUpdate};
/// use protocol::{Routing, WireBody, WireMessage};
///
/// let update = ScopeUpdate::named("net_*", Priority::ERROR);
/// let message = WireMessage::new(
///     Routing::new(7, 1, 0),
///     WireBody::UpdateScopes(vec![update.clone()]),
/// );
/// assert_eq!(
///     command_for_message(&message),
///     Some(LogCommand::UpdateScopes(vec![update])),
/// );
/// ```
#[must_use]
pub fn command_for_message(message: &WireMessage) -> Option<LogCommand> {
    match &message.body {
        WireBody::UpdateScopes(updates) => Some(LogCommand::UpdateScopes(updates.clone())),
        WireBody::QueryScopes { target } => Some(LogCommand::QueryScopes { target: *target }),
        WireBody::SaveConfiguration => Some(LogCommand::SaveScopes),
        WireBody::RegisterScopes(_)
        | WireBody::ScopesUpdated(_)
        | WireBody::LogMessage(_)
        | WireBody::QueryInstances { .. }
        | WireBody::ConfigurationSaved => None,
    }
}
