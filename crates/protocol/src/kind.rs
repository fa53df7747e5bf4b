//! crates/protocol/src/kind.rs
//! Message kinds exchanged between instances and the observer.

use std::fmt;

/// Tag carried in every [`MessageHeader`](crate::MessageHeader).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u16)]
pub enum WireKind {
    /// Full scope table announced by an instance.
    RegisterScopes = 1,
    /// Priority changes for single scopes or groups.
    UpdateScopes = 2,
    /// Request for an instance's scope table.
    QueryScopes = 3,
    /// Scope table pushed after a bulk or group change.
    ScopesUpdated = 4,
    /// One log record.
    LogMessage = 5,
    /// Request for an instance announcement.
    QueryInstances = 6,
    /// Request to persist scope priorities.
    SaveConfiguration = 7,
    /// Acknowledgement of [`WireKind::SaveConfiguration`].
    ConfigurationSaved = 8,
}

impl WireKind {
    /// Every kind, in tag order.
    pub const ALL: [Self; 8] = [
        Self::RegisterScopes,
        Self::UpdateScopes,
        Self::QueryScopes,
        Self::ScopesUpdated,
        Self::LogMessage,
        Self::QueryInstances,
        Self::SaveConfiguration,
        Self::ConfigurationSaved,
    ];

    /// Decodes a tag.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::RegisterScopes),
            2 => Some(Self::UpdateScopes),
            3 => Some(Self::QueryScopes),
            4 => Some(Self::ScopesUpdated),
            5 => Some(Self::LogMessage),
            6 => Some(Self::QueryInstances),
            7 => Some(Self::SaveConfiguration),
            8 => Some(Self::ConfigurationSaved),
            _ => None,
        }
    }

    /// Tag used on the wire.
    #[must_use]
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Mnemonic name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RegisterScopes => "register-scopes",
            Self::UpdateScopes => "update-scopes",
            Self::QueryScopes => "query-scopes",
            Self::ScopesUpdated => "scopes-updated",
            Self::LogMessage => "log-message",
            Self::QueryInstances => "query-instances",
            Self::SaveConfiguration => "save-configuration",
            Self::ConfigurationSaved => "configuration-saved",
        }
    }
}

impl fmt::Display for WireKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
