use core::fmt::{self, Debug, Display, Formatter};

use std::error::Error as StdError;

/// The reason an operation on a [`NotificationStore`] failed.
///
/// Running out of time in a blocking call is not an error; those calls return `None` or `false`.
///
/// [`NotificationStore`]: crate::NotificationStore
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// The key was empty.
    InvalidKey,
    /// The store lock could not be acquired within the configured budget.
    Timeout,
    /// The store was closed.
    Closed,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey => f.write_str("invalid key"),
            Self::Timeout => f.write_str("lock timed out"),
            Self::Closed => f.write_str("store closed"),
        }
    }
}

impl StdError for Error {}

/// Error returned by [`send`] and [`send_signal`]. Carries the value that was not stored.
///
/// [`send`]: crate::NotificationStore::send
/// [`send_signal`]: crate::NotificationStore::send_signal
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct SendError<V> {
    kind: Error,
    value: V,
}

impl<V> SendError<V> {
    pub(crate) const fn new(kind: Error, value: V) -> Self {
        Self { kind, value }
    }

    /// Returns why the value was not sent.
    #[inline]
    pub const fn kind(&self) -> Error {
        self.kind
    }

    /// Returns `true` if the key was empty.
    pub const fn is_invalid_key(&self) -> bool {
        matches!(self.kind, Error::InvalidKey)
    }

    /// Returns `true` if the store lock was not acquired in time.
    pub const fn is_timeout(&self) -> bool {
        matches!(self.kind, Error::Timeout)
    }

    /// Returns `true` if the store was closed.
    pub const fn is_closed(&self) -> bool {
        matches!(self.kind, Error::Closed)
    }

    /// Returns the value that could not be sent.
    #[inline]
    pub fn into_inner(self) -> V {
        self.value
    }
}

// The value is opaque to the store and may not implement `Debug`.
impl<V> Debug for SendError<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<V> Display for SendError<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "failed to send: {}", self.kind)
    }
}

impl<V> StdError for SendError<V> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.kind)
    }
}
