//! crates/dispatcher/src/options.rs
//! Tunables fixed when a dispatcher is built.

use std::time::Duration;

/// Default capacity of the data channel.
///
/// Sized for bursts of a few thousand records between two dispatcher wakeups;
/// a producer that finds the channel full drops the record instead of
/// blocking.
pub const DEFAULT_DATA_CAPACITY: usize = 4096;

/// Default bound on the start handshake.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(5);

/// Name given to the dispatch thread.
pub const DISPATCH_THREAD_NAME: &str = "log-dispatcher";

/// Options applied to a [`LogDispatcher`](crate::LogDispatcher).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DispatcherOptions {
    data_capacity: usize,
    start_timeout: Duration,
    module_name: String,
    instance_id: u32,
}

impl DispatcherOptions {
    /// Creates a new [`DispatcherOptionsBuilder`].
    #[must_use]
    pub fn builder() -> DispatcherOptionsBuilder {
        DispatcherOptionsBuilder::default()
    }

    /// Capacity of the data channel.
    #[must_use]
    pub const fn data_capacity(&self) -> usize {
        self.data_capacity
    }

    /// How long `start` waits for the dispatch thread to become ready.
    #[must_use]
    pub const fn start_timeout(&self) -> Duration {
        self.start_timeout
    }

    /// Module name stamped into every record.
    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Id of this instance in wire routing headers.
    #[must_use]
    pub const fn instance_id(&self) -> u32 {
        self.instance_id
    }
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        DispatcherOptionsBuilder::default().build()
    }
}

/// Builder used to assemble [`DispatcherOptions`].
#[derive(Clone, Debug)]
pub struct DispatcherOptionsBuilder {
    data_capacity: usize,
    start_timeout: Duration,
    module_name: Option<String>,
    instance_id: u32,
}

impl Default for DispatcherOptionsBuilder {
    fn default() -> Self {
        Self {
            data_capacity: DEFAULT_DATA_CAPACITY,
            start_timeout: DEFAULT_START_TIMEOUT,
            module_name: None,
            instance_id: 0,
        }
    }
}

impl DispatcherOptionsBuilder {
    /// Sets the data channel capacity. Zero is raised to one.
    #[must_use]
    pub fn data_capacity(mut self, capacity: usize) -> Self {
        self.data_capacity = capacity.max(1);
        self
    }

    /// Sets the start handshake timeout.
    #[must_use]
    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    /// Sets the module name stamped into records.
    #[must_use]
    pub fn module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = Some(name.into());
        self
    }

    /// Sets the local instance id.
    #[must_use]
    pub fn instance_id(mut self, id: u32) -> Self {
        self.instance_id = id;
        self
    }

    /// Finalises the builder.
    ///
    /// Without an explicit module name, the file stem of the running
    /// executable is used.
    #[must_use]
    pub fn build(self) -> DispatcherOptions {
        DispatcherOptions {
            data_capacity: self.data_capacity,
            start_timeout: self.start_timeout,
            module_name: self.module_name.unwrap_or_else(executable_name),
            instance_id: self.instance_id,
        }
    }
}

fn executable_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = DispatcherOptions::default();
        assert_eq!(options.data_capacity(), DEFAULT_DATA_CAPACITY);
        assert_eq!(options.start_timeout(), DEFAULT_START_TIMEOUT);
        assert_eq!(options.instance_id(), 0);
    }

    #[test]
    fn builder_overrides() {
        let options = DispatcherOptions::builder()
            .data_capacity(0)
            .start_timeout(Duration::from_millis(250))
            .module_name("svc")
            .instance_id(9)
            .build();
        assert_eq!(options.data_capacity(), 1);
        assert_eq!(options.start_timeout(), Duration::from_millis(250));
        assert_eq!(options.module_name(), "svc");
        assert_eq!(options.instance_id(), 9);
    }
}
