/// Default namespace separator.
pub const DEFAULT_SEPARATOR: char = ':';

/// Default number of recent writes remembered for echo suppression.
pub const DEFAULT_ECHO_HISTORY: usize = 100;

/// Configuration shared by both stores of a [`WebStorage`](crate::WebStorage).
///
/// The separator is fixed when the stores are built. Entries written under
/// one separator are unreachable by namespace-scoped operations after
/// rebuilding with another, since their composite keys no longer parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Character joining namespace and key in a composite key.
    pub separator: char,
    /// Drop native change events that echo this context's own writes.
    ///
    /// Only needed for hosts that wrongly deliver a change notification to
    /// the context that performed the write.
    pub echo_suppression: bool,
    /// How many recent `(key, fingerprint)` pairs the echo filter keeps.
    pub echo_history: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            echo_suppression: false,
            echo_history: DEFAULT_ECHO_HISTORY,
        }
    }
}

impl StoreConfig {
    /// Use `separator` between namespace and key.
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Enable or disable dropping change events that echo our own writes.
    pub fn with_echo_suppression(mut self, enabled: bool) -> Self {
        self.echo_suppression = enabled;
        self
    }

    /// Keep up to `capacity` recent writes for echo matching. Zero disables
    /// recording, so nothing is ever filtered.
    pub fn with_echo_history(mut self, capacity: usize) -> Self {
        self.echo_history = capacity;
        self
    }
}
