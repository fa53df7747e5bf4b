//! crates/logging/src/registry.rs
//!
//! Thread-safe scope registry using DashMap for concurrent access.
//!
//! Every live [`LogScope`] registers here under its [`ScopeId`]. The registry
//! holds weak references only, so scopes are never kept alive by it, and
//! every bulk operation first collects strong references and then works on
//! that snapshot with no map shard locked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;

use crate::command::{CommandSubmitter, ScopeUpdate};
use crate::priority::Priority;
use crate::scope::ScopeState;
use crate::scope_id::{ScopeId, group_matches, group_prefix, is_group_name};

/// Reasons a scope was not admitted to a registry.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum RegisterError {
    /// A live scope with the same name is already registered.
    #[error("scope \"{name}\" is already registered as {id}")]
    DuplicateName {
        /// Rejected name.
        name: String,
        /// Id both scopes share.
        id: ScopeId,
    },
    /// A live scope with a different name hashes to the same id.
    #[error("scope \"{name}\" collides with \"{existing}\" on id {id}")]
    HashCollision {
        /// Rejected name.
        name: String,
        /// Name already holding the id.
        existing: String,
        /// Contested id.
        id: ScopeId,
    },
    /// The registry was shut down.
    #[error("scope registry is shut down")]
    RegistryClosed,
}

/// Point-in-time view of one registered scope.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScopeSnapshot {
    /// Scope id.
    pub id: ScopeId,
    /// Scope name.
    pub name: String,
    /// Priority at the time of the snapshot.
    pub priority: Priority,
}

/// One configured priority, addressed by exact name or group pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProfileEntry {
    /// Scope name, or a group pattern ending in `*`.
    pub pattern: String,
    /// Priority applied to matching scopes.
    pub priority: Priority,
}

/// Priorities applied to scopes when the registry is activated.
///
/// Resolution order for a scope name: the last exact entry, then the group
/// entry with the longest matching prefix (later entries win ties), then the
/// default.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScopeProfile {
    default: Priority,
    entries: Vec<ProfileEntry>,
}

impl ScopeProfile {
    /// Creates a profile with no entries.
    #[must_use]
    pub fn new(default: Priority) -> Self {
        Self {
            default,
            entries: Vec::new(),
        }
    }

    /// Adds an entry, builder style.
    #[must_use]
    pub fn with_entry(mut self, pattern: impl Into<String>, priority: Priority) -> Self {
        self.push(pattern, priority);
        self
    }

    /// Adds an entry.
    pub fn push(&mut self, pattern: impl Into<String>, priority: Priority) {
        self.entries.push(ProfileEntry {
            pattern: pattern.into(),
            priority,
        });
    }

    /// Priority for scopes no entry matches.
    #[must_use]
    pub const fn default_priority(&self) -> Priority {
        self.default
    }

    /// Configured entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[ProfileEntry] {
        &self.entries
    }

    /// Resolves the priority of the scope called `name`.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Priority {
        if let Some(exact) = self
            .entries
            .iter()
            .rev()
            .find(|entry| !is_group_name(&entry.pattern) && entry.pattern == name)
        {
            return exact.priority;
        }

        let mut best: Option<(usize, Priority)> = None;
        for entry in &self.entries {
            let Some(prefix) = group_prefix(&entry.pattern) else {
                continue;
            };
            if !name.starts_with(prefix) {
                continue;
            }
            if best.is_none_or(|(len, _)| prefix.len() >= len) {
                best = Some((prefix.len(), entry.priority));
            }
        }
        best.map_or(self.default, |(_, priority)| priority)
    }
}

/// Registry of live scopes, keyed by [`ScopeId`].
///
/// A process normally uses the shared instance from [`ScopeRegistry::global`];
/// tests and embedders can create private registries.
pub struct ScopeRegistry {
    scopes: DashMap<ScopeId, Weak<ScopeState>>,
    profile: RwLock<ScopeProfile>,
    active: AtomicBool,
    closed: AtomicBool,
    submitter: RwLock<Option<Arc<dyn CommandSubmitter>>>,
    module_name: RwLock<Arc<str>>,
}

impl ScopeRegistry {
    /// Creates an empty, open, inactive registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: DashMap::new(),
            profile: RwLock::new(ScopeProfile::default()),
            active: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            submitter: RwLock::new(None),
            module_name: RwLock::new(Arc::from("")),
        }
    }

    /// Process-wide registry used by [`LogScope::new`](crate::LogScope::new).
    pub fn global() -> &'static Arc<Self> {
        static GLOBAL: OnceLock<Arc<ScopeRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Self::new()))
    }

    pub(crate) fn register(&self, state: &Arc<ScopeState>) -> Result<(), RegisterError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RegisterError::RegistryClosed);
        }

        match self.scopes.entry(state.id) {
            Entry::Occupied(mut occupied) => {
                if let Some(existing) = occupied.get().upgrade() {
                    let name = state.name.to_string();
                    return Err(if existing.name == state.name {
                        RegisterError::DuplicateName { name, id: state.id }
                    } else {
                        RegisterError::HashCollision {
                            name,
                            existing: existing.name.to_string(),
                            id: state.id,
                        }
                    });
                }
                occupied.insert(Arc::downgrade(state));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::downgrade(state));
            }
        }

        if self.is_active() {
            state.store_priority(self.profile().resolve(&state.name));
        }
        tracing::trace!(scope = %state.name, scope_id = %state.id, "scope registered");
        Ok(())
    }

    /// Removes the entry for `state`, leaving entries of other scopes alone.
    pub(crate) fn unregister(&self, state: &Arc<ScopeState>) -> bool {
        self.scopes
            .remove_if(&state.id, |_, weak| {
                std::ptr::eq(weak.as_ptr(), Arc::as_ptr(state))
            })
            .is_some()
    }

    fn live(&self) -> Vec<Arc<ScopeState>> {
        self.scopes
            .iter()
            .filter_map(|entry| entry.value().upgrade())
            .collect()
    }

    fn get(&self, id: ScopeId) -> Option<Arc<ScopeState>> {
        self.scopes.get(&id).and_then(|weak| weak.upgrade())
    }

    /// Number of live registered scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }

    /// Reports whether no live scope is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reports whether a live scope is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: ScopeId) -> bool {
        self.get(id).is_some()
    }

    /// Returns a snapshot of the scope registered under `id`.
    #[must_use]
    pub fn lookup(&self, id: ScopeId) -> Option<ScopeSnapshot> {
        self.get(id).map(|state| snapshot_of(&state))
    }

    /// Sets the priority of the scope registered under `id`.
    ///
    /// Returns `false` when no such scope exists.
    pub fn set_priority(&self, id: ScopeId, priority: Priority) -> bool {
        match self.get(id) {
            Some(state) => {
                state.store_priority(priority);
                true
            }
            None => false,
        }
    }

    /// Sets the priority of every scope whose name matches the group pattern.
    ///
    /// Returns the number of scopes changed; `0` when `group` is not a pattern.
    pub fn set_group_priority(&self, group: &str, priority: Priority) -> usize {
        if !is_group_name(group) {
            return 0;
        }
        let mut changed = 0;
        for state in self.live() {
            if group_matches(group, &state.name) {
                state.store_priority(priority);
                changed += 1;
            }
        }
        changed
    }

    /// Applies one update, single or group. Returns the number of scopes changed.
    pub fn apply_update(&self, update: &ScopeUpdate) -> usize {
        if update.is_group() {
            self.set_group_priority(&update.name, update.priority)
        } else {
            usize::from(self.set_priority(update.id, update.priority))
        }
    }

    /// All live scopes, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ScopeSnapshot> {
        let mut scopes: Vec<ScopeSnapshot> =
            self.live().iter().map(|state| snapshot_of(state)).collect();
        scopes.sort_by(|a, b| a.name.cmp(&b.name));
        scopes
    }

    /// Replaces the profile applied on activation.
    ///
    /// Scopes already active keep their priority until the next activation.
    pub fn configure(&self, profile: ScopeProfile) {
        *self
            .profile
            .write()
            .unwrap_or_else(PoisonError::into_inner) = profile;
    }

    /// Current profile.
    #[must_use]
    pub fn profile(&self) -> ScopeProfile {
        self.profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies the profile to every live scope and to scopes registered later.
    pub fn activate(&self) {
        let profile = self.profile();
        self.active.store(true, Ordering::Release);
        for state in self.live() {
            state.store_priority(profile.resolve(&state.name));
        }
    }

    /// Resets every live scope to [`Priority::UNSET`].
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
        for state in self.live() {
            state.store_priority(Priority::UNSET);
        }
    }

    /// Reports whether the profile is currently applied.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Reopens a registry closed by [`shutdown`](Self::shutdown).
    pub fn init(&self) {
        self.closed.store(false, Ordering::Release);
    }

    /// Deactivates every scope, detaches the submitter and empties the registry.
    ///
    /// Later registrations fail with [`RegisterError::RegistryClosed`] until
    /// [`init`](Self::init); scopes dropped afterwards unregister as a no-op.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.deactivate();
        self.detach();
        self.scopes.clear();
    }

    /// Reports whether the registry is shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Routes records produced by this registry's scopes to `submitter`.
    pub fn attach(&self, submitter: Arc<dyn CommandSubmitter>) {
        *self
            .submitter
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(submitter);
    }

    /// Stops routing records; returns the submitter that was attached.
    pub fn detach(&self) -> Option<Arc<dyn CommandSubmitter>> {
        self.submitter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Submitter that records are currently routed to.
    #[must_use]
    pub fn submitter(&self) -> Option<Arc<dyn CommandSubmitter>> {
        self.submitter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sets the module name stamped into every record.
    pub fn set_module_name(&self, name: &str) {
        *self
            .module_name
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::from(name);
    }

    /// Module name stamped into every record.
    #[must_use]
    pub fn module_name(&self) -> Arc<str> {
        Arc::clone(
            &self
                .module_name
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeRegistry")
            .field("scopes", &self.len())
            .field("active", &self.is_active())
            .field("closed", &self.is_closed())
            .field("attached", &self.submitter().is_some())
            .finish()
    }
}

fn snapshot_of(state: &ScopeState) -> ScopeSnapshot {
    ScopeSnapshot {
        id: state.id,
        name: state.name.to_string(),
        priority: state.priority(),
    }
}
