use std::time::Duration;

/// Runtime configuration for a dispatcher and the expectations layered on it.
///
/// Controls the mailbox buffer size and the default deadlines of blocking
/// waits. Use the builder pattern to customize, or use [`Default`] for
/// sensible defaults.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use understudy::Config;
///
/// let config = Config::default()
///     .with_mailbox_capacity(256)                         // Larger submit buffer
///     .with_default_timeout(Duration::from_secs(5))       // Patient expectations
///     .with_ordered_grace(Duration::from_millis(50));     // Opt-in rescan window
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Size of the dispatcher's mailbox buffer.
    /// Determines how many submitted calls can be queued before producers
    /// block on submission. Default: 64
    mailbox_capacity: usize,

    /// Default deadline for expectation waits when `.within()` is not used.
    /// Default: 1s
    default_timeout: Duration,

    /// Optional grace window for ordered expectations: when set, an ordered
    /// expectation first waits this long for a matching call before taking
    /// the fail-fast claim-next-and-compare path. Default: disabled
    ordered_grace: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mailbox_capacity: 64,
            default_timeout: Duration::from_secs(1),
            ordered_grace: None,
        }
    }
}

impl Config {
    /// Set the mailbox buffer size.
    ///
    /// Larger buffers allow more in-flight submissions but use more memory.
    /// When the buffer is full, producers block on submit (backpressure).
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Returns the mailbox buffer size.
    pub fn mailbox_capacity(&self) -> usize {
        self.mailbox_capacity
    }

    /// Set the default deadline for expectation waits.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Returns the default deadline for expectation waits.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Enable the ordered-mode grace window.
    ///
    /// Fail-fast on the first mismatched call is the canonical ordered
    /// behavior. With a grace window, an ordered expectation tolerates
    /// earlier non-matching traffic for up to `grace`, failing fast only
    /// once the window expires.
    pub fn with_ordered_grace(mut self, grace: Duration) -> Self {
        self.ordered_grace = Some(grace);
        self
    }

    /// Returns the ordered-mode grace window, if enabled.
    pub fn ordered_grace(&self) -> Option<Duration> {
        self.ordered_grace
    }
}
