use core::task::Waker;

use std::collections::HashMap;
use std::time::Instant;

/// The value held under a key of a [`NotificationStore`].
///
/// `Data` carries a caller-provided handle. The store moves the handle around but never looks
/// behind it; whatever it refers to stays owned by the caller.
///
/// [`NotificationStore`]: crate::NotificationStore
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Payload<T> {
    Data(T),
    Signal(i32),
}

impl<T> Payload<T> {
    /// Returns the variant of this payload.
    #[inline]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::Data(_) => Kind::Data,
            Self::Signal(_) => Kind::Signal,
        }
    }

    /// Returns `true` if this is a data handle.
    #[inline]
    pub const fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    /// Returns `true` if this is a signal.
    #[inline]
    pub const fn is_signal(&self) -> bool {
        matches!(self, Self::Signal(_))
    }

    /// Returns the data handle, or `None` if this is a signal.
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Data(value) => Some(value),
            Self::Signal(_) => None,
        }
    }

    /// Returns the signal value, or `None` if this is a data handle.
    pub fn into_signal(self) -> Option<i32> {
        match self {
            Self::Data(_) => None,
            Self::Signal(signal) => Some(signal),
        }
    }
}

/// The variant of a [`Payload`], without its contents.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Data,
    Signal,
}

impl Kind {
    /// Returns `true` if `payload` is accepted by the filter `kind`. `None` accepts both variants.
    #[inline]
    pub(crate) fn matches<T>(kind: Option<Self>, payload: &Payload<T>) -> bool {
        kind.map_or(true, |kind| payload.kind() == kind)
    }
}

#[derive(Debug)]
pub(crate) struct Entry<T> {
    pub payload: Payload<T>,
    pub created_at: Instant,
}

impl<T> Entry<T> {
    pub fn new(payload: Payload<T>) -> Self {
        Self {
            payload,
            created_at: Instant::now(),
        }
    }
}

/// Wakers of pending [`Notified`] futures, grouped by the key they wait on.
///
/// [`Notified`]: crate::Notified
#[derive(Debug, Default)]
pub(crate) struct Waiters {
    next_id: u64,
    by_key: HashMap<String, Vec<Waiter>>,
}

#[derive(Debug)]
struct Waiter {
    id: u64,
    waker: Waker,
}

impl Waiters {
    pub fn register(&mut self, key: &str, waker: &Waker) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let waiter = Waiter {
            id,
            waker: waker.clone(),
        };

        match self.by_key.get_mut(key) {
            Some(waiters) => waiters.push(waiter),
            None => {
                self.by_key.insert(key.to_owned(), vec![waiter]);
            }
        }

        id
    }

    /// Replaces the stored waker of `id` if it would not wake the same task.
    pub fn update(&mut self, key: &str, id: u64, waker: &Waker) {
        let Some(waiters) = self.by_key.get_mut(key) else {
            return;
        };

        if let Some(waiter) = waiters.iter_mut().find(|waiter| waiter.id == id) {
            if !waiter.waker.will_wake(waker) {
                waiter.waker = waker.clone();
            }
        }
    }

    pub fn remove(&mut self, key: &str, id: u64) {
        let Some(waiters) = self.by_key.get_mut(key) else {
            return;
        };

        waiters.retain(|waiter| waiter.id != id);
        if waiters.is_empty() {
            self.by_key.remove(key);
        }
    }

    /// Wakes every waiter of `key`. Waiters stay registered until their future completes or drops.
    pub fn wake(&self, key: &str) {
        if let Some(waiters) = self.by_key.get(key) {
            for waiter in waiters {
                waiter.waker.wake_by_ref();
            }
        }
    }

    pub fn wake_all(&mut self) {
        for (_, waiters) in self.by_key.drain() {
            for waiter in waiters {
                waiter.waker.wake();
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.by_key.values().map(Vec::len).sum()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Init,
    /// Registered in [`Waiters`] under the given id.
    Pending(u64),
    Done,
}
