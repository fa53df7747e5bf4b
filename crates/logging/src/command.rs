//! crates/logging/src/command.rs
//! Units of work queued to the log dispatcher.

use crate::priority::Priority;
use crate::record::LogRecord;
use crate::scope_id::ScopeId;

/// Tag of a [`LogCommand`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LogAction {
    /// Load configuration, activate scopes, open sinks.
    Start,
    /// Deactivate scopes, drain, close sinks, terminate.
    Stop,
    /// Resume delivery to the remote sink.
    EnableRemote,
    /// Pause delivery to the remote sink without disconnecting.
    DisableRemote,
    /// Persist the current scope priorities.
    SaveScopes,
    /// Write one record to every open sink.
    LogMessage,
    /// Change the priority of scopes or scope groups.
    UpdateScopes,
    /// Scope table query; answered on the observer side.
    QueryScopes,
}

impl LogAction {
    /// Queue a command of this kind travels on unless the caller overrides it.
    #[must_use]
    pub const fn default_priority(self) -> CommandPriority {
        match self {
            Self::Start | Self::Stop => CommandPriority::Control,
            Self::EnableRemote
            | Self::DisableRemote
            | Self::LogMessage
            | Self::UpdateScopes
            | Self::SaveScopes
            | Self::QueryScopes => CommandPriority::Data,
        }
    }
}

/// One priority change addressed to a scope or scope group.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScopeUpdate {
    /// Scope name, or a group pattern ending in `*`.
    pub name: String,
    /// Scope id; ignored for group patterns.
    pub id: ScopeId,
    /// New priority.
    pub priority: Priority,
}

impl ScopeUpdate {
    /// Builds an update for `name`, deriving the id from the name.
    #[must_use]
    pub fn named(name: impl Into<String>, priority: Priority) -> Self {
        let name = name.into();
        let id = ScopeId::of(&name);
        Self { name, id, priority }
    }

    /// Reports whether the update targets a scope group.
    #[must_use]
    pub fn is_group(&self) -> bool {
        crate::scope_id::is_group_name(&self.name)
    }
}

/// A logging action handed to the dispatcher and consumed exactly once.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogCommand {
    /// See [`LogAction::Start`].
    Start,
    /// See [`LogAction::Stop`].
    Stop,
    /// See [`LogAction::EnableRemote`].
    EnableRemote,
    /// See [`LogAction::DisableRemote`].
    DisableRemote,
    /// See [`LogAction::SaveScopes`].
    SaveScopes,
    /// See [`LogAction::LogMessage`].
    LogMessage(Box<LogRecord>),
    /// See [`LogAction::UpdateScopes`].
    UpdateScopes(Vec<ScopeUpdate>),
    /// See [`LogAction::QueryScopes`].
    QueryScopes {
        /// Instance whose scope table is requested.
        target: u32,
    },
}

impl LogCommand {
    /// Wraps a record.
    #[must_use]
    pub fn log_message(record: LogRecord) -> Self {
        Self::LogMessage(Box::new(record))
    }

    /// Returns the command's tag.
    #[must_use]
    pub const fn action(&self) -> LogAction {
        match self {
            Self::Start => LogAction::Start,
            Self::Stop => LogAction::Stop,
            Self::EnableRemote => LogAction::EnableRemote,
            Self::DisableRemote => LogAction::DisableRemote,
            Self::SaveScopes => LogAction::SaveScopes,
            Self::LogMessage(_) => LogAction::LogMessage,
            Self::UpdateScopes(_) => LogAction::UpdateScopes,
            Self::QueryScopes { .. } => LogAction::QueryScopes,
        }
    }

    /// Queue this command travels on by default.
    #[must_use]
    pub const fn default_priority(&self) -> CommandPriority {
        self.action().default_priority()
    }
}

/// Queue selector for [`CommandSubmitter::submit`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CommandPriority {
    /// Lifecycle path, always drained before data.
    Control,
    /// Log records and scope maintenance.
    Data,
}

/// Entry point through which producers hand commands to the dispatcher.
///
/// Implementations must not wait for the command to be processed. Returning
/// `false` means the command was not admitted (dispatcher not running or
/// queue disconnected) and has been dropped.
pub trait CommandSubmitter: Send + Sync {
    /// Enqueues `command` on the queue selected by `priority`.
    fn submit(&self, command: LogCommand, priority: CommandPriority) -> bool;
}
