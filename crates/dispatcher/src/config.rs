//! crates/dispatcher/src/config.rs
//!
//! Configuration consumed by the dispatcher at start and updated on save.
//!
//! A [`ConfigStore`] supplies a [`LogConfig`]: which sink kinds to open and
//! which priority to give each scope or scope group. The TOML form is:
//!
//! ```toml
//! default_priority = ["error"]
//!
//! [sinks]
//! file = true
//! remote = true
//!
//! [[scopes]]
//! name = "net_*"
//! priority = ["warning"]
//!
//! [[scopes]]
//! name = "ThreadCentral"
//! priority = ["debug", "scope"]
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use logging::{Priority, ScopeProfile, ScopeSnapshot, is_group_name};
use logging_sink::SinkKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("configuration i/o failed: {0}")]
    Io(#[from] io::Error),
    /// The configuration document is malformed.
    #[error("configuration is malformed: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be rendered.
    #[error("configuration could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// The store refused the request.
    #[error("configuration store unavailable: {0}")]
    Unavailable(String),
}

/// Which sink kinds the dispatcher opens on start.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSwitches {
    /// Open file sinks.
    pub file: bool,
    /// Open debug-output sinks.
    pub debug_output: bool,
    /// Open remote observer sinks.
    pub remote: bool,
    /// Open database sinks.
    pub database: bool,
}

impl SinkSwitches {
    /// Switches with every kind enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            file: true,
            debug_output: true,
            remote: true,
            database: true,
        }
    }

    /// Reports whether sinks of `kind` should be opened.
    #[must_use]
    pub const fn is_enabled(&self, kind: SinkKind) -> bool {
        match kind {
            SinkKind::File => self.file,
            SinkKind::DebugOutput => self.debug_output,
            SinkKind::Remote => self.remote,
            SinkKind::Database => self.database,
        }
    }
}

/// Configured priority of one scope or scope group.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Scope name, or a group pattern ending in `*`.
    pub name: String,
    /// Priority flags.
    #[serde(with = "priority_names", default)]
    pub priority: Priority,
}

/// The dispatcher's configuration document.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Sink kinds to open.
    pub sinks: SinkSwitches,
    /// Priority of scopes no entry matches.
    #[serde(with = "priority_names")]
    pub default_priority: Priority,
    /// Entries in the order they were written.
    pub scopes: Vec<ScopeConfig>,
}

impl LogConfig {
    /// Adds a scope entry, builder style.
    #[must_use]
    pub fn with_scope(mut self, name: impl Into<String>, priority: Priority) -> Self {
        self.scopes.push(ScopeConfig {
            name: name.into(),
            priority,
        });
        self
    }

    /// Profile the registry applies on activation.
    #[must_use]
    pub fn profile(&self) -> ScopeProfile {
        self.scopes
            .iter()
            .fold(ScopeProfile::new(self.default_priority), |profile, entry| {
                profile.with_entry(entry.name.clone(), entry.priority)
            })
    }

    /// Replaces the exact-name entries with `scopes`, keeping group entries.
    pub fn merge_snapshot(&mut self, scopes: &[ScopeSnapshot]) {
        self.scopes.retain(|entry| is_group_name(&entry.name));
        self.scopes.extend(scopes.iter().map(|scope| ScopeConfig {
            name: scope.name.clone(),
            priority: scope.priority,
        }));
    }

    /// Parses a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Renders a TOML document.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Source and destination of dispatcher configuration.
pub trait ConfigStore: Send {
    /// Loads the configuration applied on start.
    fn load(&mut self) -> Result<LogConfig, ConfigError>;

    /// Persists the current scope priorities.
    fn save_scopes(&mut self, scopes: &[ScopeSnapshot]) -> Result<(), ConfigError>;
}

/// Configuration kept in a TOML file.
///
/// Saving rewrites the file with group entries preserved and one exact entry
/// per registered scope. A missing file is an error on load and is created
/// on save.
#[derive(Clone, Debug)]
pub struct TomlConfigStore {
    path: PathBuf,
}

impl TomlConfigStore {
    /// Creates a store for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&mut self) -> Result<LogConfig, ConfigError> {
        let text = std::fs::read_to_string(&self.path)?;
        LogConfig::from_toml(&text)
    }

    fn save_scopes(&mut self, scopes: &[ScopeSnapshot]) -> Result<(), ConfigError> {
        let mut config = match std::fs::read_to_string(&self.path) {
            Ok(text) => LogConfig::from_toml(&text)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => LogConfig::default(),
            Err(err) => return Err(err.into()),
        };
        config.merge_snapshot(scopes);
        std::fs::write(&self.path, config.to_toml()?)?;
        Ok(())
    }
}

/// In-process configuration shared with its creator.
///
/// Clones share the same document, so a test can hand one clone to the
/// dispatcher and inspect saves through the other.
#[derive(Clone, Debug, Default)]
pub struct MemoryConfigStore {
    config: Arc<Mutex<Option<LogConfig>>>,
}

impl MemoryConfigStore {
    /// Creates a store holding `config`.
    #[must_use]
    pub fn new(config: LogConfig) -> Self {
        Self {
            config: Arc::new(Mutex::new(Some(config))),
        }
    }

    /// Creates a store with no configuration; every load fails.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Current document, if any.
    #[must_use]
    pub fn config(&self) -> Option<LogConfig> {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the document.
    pub fn set(&self, config: LogConfig) {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = Some(config);
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&mut self) -> Result<LogConfig, ConfigError> {
        self.config()
            .ok_or_else(|| ConfigError::Unavailable("no configuration loaded".to_owned()))
    }

    fn save_scopes(&mut self, scopes: &[ScopeSnapshot]) -> Result<(), ConfigError> {
        let mut guard = self.config.lock().unwrap_or_else(PoisonError::into_inner);
        guard.get_or_insert_with(LogConfig::default).merge_snapshot(scopes);
        Ok(())
    }
}

/// Serde adapter writing a [`Priority`] as a list of flag names.
mod priority_names {
    use logging::Priority;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(priority: &Priority, serializer: S) -> Result<S::Ok, S::Error> {
        if priority.is_unset() {
            return serializer.collect_seq(std::iter::empty::<&str>());
        }
        let rendered = priority.to_string();
        serializer.collect_seq(rendered.split('|'))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Priority, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        names.join("|").parse().map_err(D::Error::custom)
    }
}
