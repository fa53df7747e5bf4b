//! crates/observer/src/mirror.rs
//! Observer-side copy of one connected instance.

use logging::{Priority, ScopeId, ScopeSnapshot, ScopeUpdate, group_matches};

/// What the observer knows about one instance.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceMirror {
    /// Instance id taken from the routing header.
    pub id: u32,
    /// Cookie of the connection the last record arrived on; `0` until then.
    pub cookie: u64,
    /// Scope table, ordered by name.
    pub scopes: Vec<ScopeSnapshot>,
    /// Whether the instance acknowledged the last save request.
    pub configuration_saved: bool,
    /// Records received from the instance.
    pub records: u64,
}

impl InstanceMirror {
    /// Creates an empty mirror for `id`.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Replaces the scope table.
    pub fn replace_scopes(&mut self, mut scopes: Vec<ScopeSnapshot>) {
        scopes.sort_by(|a, b| a.name.cmp(&b.name));
        self.scopes = scopes;
    }

    /// Looks a scope up by id.
    #[must_use]
    pub fn scope(&self, id: ScopeId) -> Option<&ScopeSnapshot> {
        self.scopes.iter().find(|scope| scope.id == id)
    }

    /// Priority of the scope called `name`.
    #[must_use]
    pub fn priority_of(&self, name: &str) -> Option<Priority> {
        self.scopes
            .iter()
            .find(|scope| scope.name == name)
            .map(|scope| scope.priority)
    }

    /// Applies one update the way the instance will; returns the number of
    /// scopes changed.
    pub fn apply_update(&mut self, update: &ScopeUpdate) -> usize {
        let mut changed = 0;
        for scope in &mut self.scopes {
            let hit = if update.is_group() {
                group_matches(&update.name, &scope.name)
            } else {
                scope.id == update.id
            };
            if hit {
                scope.priority = update.priority;
                changed += 1;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mirror() -> InstanceMirror {
        let mut mirror = InstanceMirror::new(4);
        mirror.replace_scopes(
            ["net_udp", "app_core", "net_tcp"]
                .into_iter()
                .map(|name| ScopeSnapshot {
                    id: ScopeId::of(name),
                    name: name.to_owned(),
                    priority: Priority::DEBUG,
                })
                .collect(),
        );
        mirror
    }

    #[test]
    fn scopes_are_kept_sorted() {
        let names: Vec<_> = mirror().scopes.into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["app_core", "net_tcp", "net_udp"]);
    }

    #[test]
    fn group_update_touches_members() {
        let mut mirror = mirror();
        assert_eq!(mirror.apply_update(&ScopeUpdate::named("net_*", Priority::ERROR)), 2);
        assert_eq!(mirror.priority_of("net_tcp"), Some(Priority::ERROR));
        assert_eq!(mirror.priority_of("app_core"), Some(Priority::DEBUG));
    }

    #[test]
    fn single_update_matches_by_id() {
        let mut mirror = mirror();
        let update = ScopeUpdate::named("app_core", Priority::FATAL);
        assert_eq!(mirror.apply_update(&update), 1);
        assert_eq!(mirror.scope(ScopeId::of("app_core")).map(|s| s.priority), Some(Priority::FATAL));
        assert_eq!(mirror.apply_update(&ScopeUpdate::named("absent", Priority::FATAL)), 0);
    }
}
