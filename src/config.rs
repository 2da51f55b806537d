use core::time::Duration;

/// Lock budget used by [`send`] and the other non-blocking operations.
///
/// [`send`]: crate::NotificationStore::send
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// Tuning knobs for a [`NotificationStore`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use keyslot::{Config, NotificationStore};
///
/// let config = Config::new()
///     .lock_timeout(Duration::from_millis(20))
///     .capacity(64);
///
/// let store: NotificationStore<u32> = NotificationStore::with_config(config);
/// assert_eq!(store.config().lock_timeout, Duration::from_millis(20));
/// ```
///
/// [`NotificationStore`]: crate::NotificationStore
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// How long `send`, `has`, `remove`, `clear` and `count` may wait for the store lock before
    /// giving up.
    pub lock_timeout: Duration,
    /// Number of keys to preallocate room for.
    pub capacity: usize,
}

impl Config {
    /// Creates a `Config` with a [`DEFAULT_LOCK_TIMEOUT`] lock budget and no preallocation.
    #[inline]
    pub const fn new() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            capacity: 0,
        }
    }

    /// Sets [`lock_timeout`](Self::lock_timeout).
    #[inline]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets [`capacity`](Self::capacity).
    #[inline]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
