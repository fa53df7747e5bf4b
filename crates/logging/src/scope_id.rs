//! crates/logging/src/scope_id.rs
//! Content-hash identifiers for log scopes and scope groups.

use std::fmt;

use xxhash_rust::xxh32::xxh32;

/// Suffix that turns a scope name into a group pattern.
pub const GROUP_SUFFIX: char = '*';

/// Seed used when hashing scope names. Changing it breaks every persisted id.
const SCOPE_HASH_SEED: u32 = 0;

/// 32-bit identifier derived from a scope name.
///
/// Identical names always produce the same id, in every process, so the
/// observer can address scopes of an instance without a name lookup.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct ScopeId(u32);

impl ScopeId {
    /// Sentinel carried by group names; never matches a single scope.
    pub const GROUP: Self = Self(u32::MAX);

    /// Derives the id of `name`, or [`ScopeId::GROUP`] for group patterns.
    #[must_use]
    pub fn of(name: &str) -> Self {
        if is_group_name(name) {
            Self::GROUP
        } else {
            Self(xxh32(name.as_bytes(), SCOPE_HASH_SEED))
        }
    }

    /// Wraps an id received from the wire.
    #[must_use]
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the numeric value used on the wire.
    #[must_use]
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Reports whether this is the group sentinel.
    #[must_use]
    #[inline]
    pub const fn is_group(self) -> bool {
        self.0 == Self::GROUP.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Reports whether `name` denotes a scope group.
#[must_use]
pub fn is_group_name(name: &str) -> bool {
    name.ends_with(GROUP_SUFFIX)
}

/// Returns the prefix shared by members of the group `name`.
///
/// Returns `None` when `name` is not a group pattern.
#[must_use]
pub fn group_prefix(name: &str) -> Option<&str> {
    name.strip_suffix(GROUP_SUFFIX)
}

/// Reports whether the scope called `scope_name` belongs to `group`.
#[must_use]
pub fn group_matches(group: &str, scope_name: &str) -> bool {
    group_prefix(group).is_some_and(|prefix| scope_name.starts_with(prefix))
}
