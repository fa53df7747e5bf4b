//! crates/logging/src/scope.rs
//! Named log scopes with a live priority mask and a session counter.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use crate::priority::Priority;
use crate::registry::{RegisterError, ScopeRegistry};
use crate::scope_id::ScopeId;

/// State shared between a [`LogScope`] and the registry entry pointing at it.
pub(crate) struct ScopeState {
    pub(crate) id: ScopeId,
    pub(crate) name: Box<str>,
    priority: AtomicU32,
    session: AtomicU32,
}

impl ScopeState {
    fn new(name: String) -> Self {
        let id = ScopeId::of(&name);
        Self::with_id(name, id)
    }

    pub(crate) fn with_id(name: String, id: ScopeId) -> Self {
        Self {
            id,
            name: name.into_boxed_str(),
            priority: AtomicU32::new(Priority::UNSET.bits()),
            session: AtomicU32::new(0),
        }
    }

    #[inline]
    pub(crate) fn priority(&self) -> Priority {
        Priority::from_bits(self.priority.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn store_priority(&self, priority: Priority) {
        self.priority.store(priority.bits(), Ordering::Release);
    }
}

/// A named tracing point whose priority can change while the program runs.
///
/// Construction registers the scope with a [`ScopeRegistry`] and dropping it
/// unregisters it again. The registry only holds a weak reference, and the
/// scope only holds a weak reference back, so either may be dropped first.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use logging::{LogScope, Priority, ScopeId, ScopeRegistry};
///
/// let registry = Arc::new(ScopeRegistry::new());
/// let scope = LogScope::with_registry("ThreadCentral", &registry);
///
/// assert_eq!(scope.id(), ScopeId::of("ThreadCentral"));
/// assert_eq!(scope.priority(), Priority::UNSET);
///
/// registry.set_priority(scope.id(), Priority::DEBUG | Priority::SCOPE);
/// assert!(scope.priority().has_flag(Priority::SCOPE));
/// ```
pub struct LogScope {
    state: Arc<ScopeState>,
    registry: Weak<ScopeRegistry>,
    registration: Option<RegisterError>,
}

impl LogScope {
    /// Creates a scope registered with the process-wide [`ScopeRegistry::global`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_registry(name, ScopeRegistry::global())
    }

    /// Creates a scope registered with `registry`.
    ///
    /// A rejected registration (duplicate name, id collision, closed
    /// registry) is reported through `tracing` and kept available through
    /// [`registration_error`](Self::registration_error); the scope itself
    /// remains usable.
    #[must_use]
    pub fn with_registry(name: impl Into<String>, registry: &Arc<ScopeRegistry>) -> Self {
        Self::attach(Arc::new(ScopeState::new(name.into())), registry)
    }

    /// Creates a scope that belongs to no registry.
    ///
    /// Records produced through a detached scope are never delivered.
    #[must_use]
    pub fn detached(name: impl Into<String>) -> Self {
        Self {
            state: Arc::new(ScopeState::new(name.into())),
            registry: Weak::new(),
            registration: None,
        }
    }

    pub(crate) fn attach(state: Arc<ScopeState>, registry: &Arc<ScopeRegistry>) -> Self {
        let registration = registry.register(&state).err();
        if let Some(error) = &registration {
            tracing::warn!(
                scope = %state.name,
                scope_id = %state.id,
                %error,
                "scope registration rejected"
            );
        }
        Self {
            state,
            registry: Arc::downgrade(registry),
            registration,
        }
    }

    /// Content-hash id of the scope name.
    #[must_use]
    #[inline]
    pub fn id(&self) -> ScopeId {
        self.state.id
    }

    /// Scope name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Current priority mask.
    #[must_use]
    #[inline]
    pub fn priority(&self) -> Priority {
        self.state.priority()
    }

    /// Replaces the priority mask.
    pub fn set_priority(&self, priority: Priority) {
        self.state.store_priority(priority);
    }

    /// Adds `flags` to the priority mask.
    pub fn add_priority(&self, flags: Priority) {
        self.state
            .priority
            .fetch_or(flags.bits(), Ordering::AcqRel);
    }

    /// Clears `flags` from the priority mask.
    pub fn remove_priority(&self, flags: Priority) {
        self.state
            .priority
            .fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    /// Draws the next session id, returning the value before the increment.
    ///
    /// The counter wraps on overflow.
    pub fn next_session(&self) -> u32 {
        self.state.session.fetch_add(1, Ordering::Relaxed)
    }

    /// Reports whether the registry accepted this scope.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registration.is_none() && self.registry.strong_count() > 0
    }

    /// The error that prevented registration, if any.
    #[must_use]
    pub fn registration_error(&self) -> Option<&RegisterError> {
        self.registration.as_ref()
    }

    /// The registry this scope was created in, if it still exists.
    #[must_use]
    pub fn registry(&self) -> Option<Arc<ScopeRegistry>> {
        self.registry.upgrade()
    }
}

impl Drop for LogScope {
    fn drop(&mut self) {
        if self.registration.is_some() {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(&self.state);
        }
    }
}

impl fmt::Debug for LogScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogScope")
            .field("id", &self.state.id)
            .field("name", &self.state.name)
            .field("priority", &self.priority())
            .field("registered", &self.is_registered())
            .finish()
    }
}
