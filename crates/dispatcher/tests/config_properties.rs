//! Properties of the configuration document and its stores.

use dispatcher::{ConfigStore, LogConfig, MemoryConfigStore};
use logging::{Priority, ScopeId, ScopeSnapshot};
use proptest::prelude::*;

fn any_table() -> impl Strategy<Value = Vec<ScopeSnapshot>> {
    prop::collection::btree_map("[a-z][a-z_]{0,11}", 0u32..64, 0..16).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(name, bits)| ScopeSnapshot {
                id: ScopeId::of(&name),
                name,
                priority: Priority::from_bits_truncate(bits),
            })
            .collect()
    })
}

proptest! {
    /// Whatever table is saved resolves to the same priorities after reload.
    #[test]
    fn saved_priorities_resolve_after_reload(table in any_table(), group_bits in 0u32..64) {
        let group = Priority::from_bits_truncate(group_bits);
        let mut store = MemoryConfigStore::new(LogConfig::default().with_scope("zz9_*", group));
        store.save_scopes(&table).expect("saves");

        let profile = store.load().expect("loads").profile();
        for scope in &table {
            prop_assert_eq!(profile.resolve(&scope.name), scope.priority);
        }
        prop_assert_eq!(profile.resolve("zz9_unsaved"), group);
    }

    /// The TOML rendering of any table parses back to the same document.
    #[test]
    fn rendered_document_parses_back(table in any_table(), default_bits in 0u32..64) {
        let mut config = LogConfig {
            default_priority: Priority::from_bits_truncate(default_bits),
            ..LogConfig::default()
        };
        config.merge_snapshot(&table);
        let text = config.to_toml().expect("renders");
        prop_assert_eq!(LogConfig::from_toml(&text).expect("parses"), config);
    }
}
