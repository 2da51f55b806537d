use core::future::Future;
use core::mem;
use core::pin::Pin;
use core::task::{Context, Poll};
use core::time::Duration;

use std::collections::HashMap;
use std::time::Instant;

use futures::future::FusedFuture;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::errors::{Error, SendError};
use crate::utils::store::{Entry, Kind, Payload, State, Waiters};

/// A thread-safe map from string keys to at most one pending value or signal per key.
///
/// Producers [`send`] a value (or [`send_signal`] an integer) under a key, replacing whatever was
/// pending there. Consumers block on [`consume`] or [`signal`] until an entry of the matching
/// variant shows up or the timeout runs out. Consuming removes the entry, so every sent value is
/// delivered at most once.
///
/// `T` is a handle to caller-owned data, such as `&'static U` or `Arc<U>`. The store moves
/// handles in and out but never inspects what they point to. Replacing or clearing an entry drops
/// only the handle.
///
/// Share the store between threads or tasks by wrapping it in an [`Arc`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
/// use keyslot::NotificationStore;
///
/// static TEMPERATURE: i32 = 25;
///
/// let store = Arc::new(NotificationStore::new());
///
/// let producer = store.clone();
/// thread::spawn(move || {
///     producer.send("temperature", &TEMPERATURE).unwrap();
/// });
///
/// let value = store.consume("temperature", Duration::from_secs(5));
/// assert_eq!(value, Some(&25));
/// ```
///
/// [`Arc`]: std::sync::Arc
/// [`send`]: Self::send
/// [`send_signal`]: Self::send_signal
/// [`consume`]: Self::consume
/// [`signal`]: Self::signal
#[derive(Debug)]
pub struct NotificationStore<T> {
    inner: Mutex<Inner<T>>,
    // Notified on every insertion and on close. Blocked threads of all keys share it.
    cond: Condvar,
    config: Config,
}

#[derive(Debug)]
struct Inner<T> {
    entries: HashMap<String, Entry<T>>,
    waiters: Waiters,
    closed: bool,
}

impl<T> Inner<T> {
    /// Removes and returns the entry under `key` if its variant passes `kind`.
    fn take(&mut self, key: &str, kind: Option<Kind>) -> Option<Payload<T>> {
        match self.entries.get(key) {
            Some(entry) if Kind::matches(kind, &entry.payload) => {
                self.entries.remove(key).map(|entry| entry.payload)
            }
            _ => None,
        }
    }

    fn contains(&self, key: &str, kind: Option<Kind>) -> bool {
        self.entries
            .get(key)
            .map_or(false, |entry| Kind::matches(kind, &entry.payload))
    }
}

impl<T> NotificationStore<T> {
    /// Creates a new, empty `NotificationStore` with the default [`Config`].
    #[inline]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new, empty `NotificationStore` using `config`.
    pub fn with_config(config: Config) -> Self {
        debug!(
            lock_timeout = ?config.lock_timeout,
            capacity = config.capacity,
            "notification store created"
        );

        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(config.capacity),
                waiters: Waiters::default(),
                closed: false,
            }),
            cond: Condvar::new(),
            config,
        }
    }

    /// Returns the [`Config`] this store was created with.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stores `value` under `key`, replacing any pending entry for that key.
    ///
    /// Fails without touching the store if `key` is empty, the store is closed or the lock cannot
    /// be acquired within [`Config::lock_timeout`]. The value is handed back inside the error.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use keyslot::NotificationStore;
    ///
    /// let store = NotificationStore::new();
    /// store.send("status", "IDLE").unwrap();
    /// store.send("status", "ACTIVE").unwrap();
    ///
    /// assert_eq!(store.consume("status", Duration::ZERO), Some("ACTIVE"));
    /// assert_eq!(store.consume("status", Duration::ZERO), None);
    /// ```
    pub fn send(&self, key: &str, value: T) -> Result<(), SendError<T>> {
        self.insert(key, value, Payload::Data)
    }

    /// Stores the integer `signal` under `key`, replacing any pending entry for that key.
    ///
    /// Signals share the key space with [`send`]: a signal replaces a pending value and vice
    /// versa.
    ///
    /// [`send`]: Self::send
    pub fn send_signal(&self, key: &str, signal: i32) -> Result<(), SendError<i32>> {
        self.insert(key, signal, Payload::Signal)
    }

    fn insert<V, F>(&self, key: &str, value: V, wrap: F) -> Result<(), SendError<V>>
    where
        F: FnOnce(V) -> Payload<T>,
    {
        if key.is_empty() {
            return Err(SendError::new(Error::InvalidKey, value));
        }

        let mut inner = match self.lock() {
            Ok(inner) => inner,
            Err(err) => {
                if err == Error::Timeout {
                    warn!(key, "failed to acquire lock for send");
                }
                return Err(SendError::new(err, value));
            }
        };

        let payload = wrap(value);
        let kind = payload.kind();
        let old = inner.entries.insert(key.to_owned(), Entry::new(payload));
        inner.waiters.wake(key);
        drop(inner);

        self.cond.notify_all();

        // Replaced handles are dropped only after the lock is released.
        let replaced = old.is_some();
        drop(old);

        debug!(key, ?kind, replaced, "notification sent");
        Ok(())
    }

    /// Waits up to `timeout` for a value under `key` and removes it.
    ///
    /// Returns `None` if no value arrived in time, the key is empty or the store is closed. A
    /// pending signal under `key` is left alone and does not satisfy this call.
    ///
    /// A timeout of [`Duration::ZERO`] checks once without blocking.
    pub fn consume(&self, key: &str, timeout: Duration) -> Option<T> {
        self.take_kind(key, timeout, Some(Kind::Data))
            .and_then(Payload::into_data)
    }

    /// Waits up to `timeout` for a signal under `key` and removes it.
    ///
    /// Returns `None` if no signal arrived in time, the key is empty or the store is closed. A
    /// pending value under `key` is left alone and does not satisfy this call.
    pub fn signal(&self, key: &str, timeout: Duration) -> Option<i32> {
        self.take_kind(key, timeout, Some(Kind::Signal))
            .and_then(Payload::into_signal)
    }

    /// Waits up to `timeout` for an entry of either variant under `key` and removes it.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use keyslot::{NotificationStore, Payload};
    ///
    /// let store = NotificationStore::<&str>::new();
    /// store.send_signal("ready", 1).unwrap();
    ///
    /// match store.take("ready", Duration::ZERO) {
    ///     Some(Payload::Signal(code)) => assert_eq!(code, 1),
    ///     other => panic!("unexpected {:?}", other),
    /// }
    /// ```
    pub fn take(&self, key: &str, timeout: Duration) -> Option<Payload<T>> {
        self.take_kind(key, timeout, None)
    }

    fn take_kind(&self, key: &str, timeout: Duration, kind: Option<Kind>) -> Option<Payload<T>> {
        let payload = self.block_until(key, timeout, |inner| inner.take(key, kind))?;
        debug!(key, kind = ?payload.kind(), "notification consumed");
        Some(payload)
    }

    /// Waits up to `timeout` until an entry of either variant is pending under `key`.
    ///
    /// The entry is not removed. Another consumer may take it before the caller gets to, so a
    /// following [`consume`] or [`signal`] can still come back empty.
    ///
    /// [`consume`]: Self::consume
    /// [`signal`]: Self::signal
    pub fn wait(&self, key: &str, timeout: Duration) -> bool {
        self.block_until(key, timeout, |inner| inner.contains(key, None).then_some(()))
            .is_some()
    }

    /// Blocks until `check` yields a value, the deadline passes or the store is closed.
    ///
    /// `check` runs with the lock held: once on entry and after every wake-up.
    fn block_until<R, F>(&self, key: &str, timeout: Duration, mut check: F) -> Option<R>
    where
        F: FnMut(&mut Inner<T>) -> Option<R>,
    {
        if key.is_empty() {
            return None;
        }

        // An unrepresentable deadline waits forever.
        let deadline = Instant::now().checked_add(timeout);

        let mut inner = match deadline {
            Some(deadline) => self.inner.try_lock_until(deadline)?,
            None => self.inner.lock(),
        };

        loop {
            if inner.closed {
                return None;
            }

            if let Some(found) = check(&mut *inner) {
                return Some(found);
            }

            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut inner, deadline).timed_out() {
                        if inner.closed {
                            return None;
                        }

                        let found = check(&mut *inner);
                        if found.is_none() {
                            trace!(key, ?timeout, "timed out waiting for notification");
                        }
                        return found;
                    }
                }
                None => self.cond.wait(&mut inner),
            }
        }
    }

    /// Returns `true` if an entry of either variant is pending under `key`.
    ///
    /// Returns `false` if the key is empty, the store is closed or the lock is not acquired
    /// within [`Config::lock_timeout`].
    pub fn has(&self, key: &str) -> bool {
        self.contains(key, None)
    }

    /// Returns `true` if a value (not a signal) is pending under `key`.
    pub fn has_data(&self, key: &str) -> bool {
        self.contains(key, Some(Kind::Data))
    }

    /// Returns `true` if a signal (not a value) is pending under `key`.
    pub fn has_signal(&self, key: &str) -> bool {
        self.contains(key, Some(Kind::Signal))
    }

    fn contains(&self, key: &str, kind: Option<Kind>) -> bool {
        if key.is_empty() {
            return false;
        }

        match self.lock() {
            Ok(inner) => inner.contains(key, kind),
            Err(_) => false,
        }
    }

    /// Returns the time the entry under `key` was stored.
    pub fn created_at(&self, key: &str) -> Option<Instant> {
        if key.is_empty() {
            return None;
        }

        let inner = self.lock().ok()?;
        inner.entries.get(key).map(|entry| entry.created_at)
    }

    /// Removes the entry under `key` without returning it. Returns whether an entry existed.
    pub fn remove(&self, key: &str) -> Result<bool, Error> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }

        let mut inner = self.lock()?;
        let entry = inner.entries.remove(key);
        drop(inner);

        let removed = entry.is_some();
        drop(entry);
        if removed {
            debug!(key, "notification removed");
        }

        Ok(removed)
    }

    /// Removes all pending entries, returning how many there were.
    pub fn clear(&self) -> Result<usize, Error> {
        let mut inner = match self.lock() {
            Ok(inner) => inner,
            Err(err) => {
                if err == Error::Timeout {
                    warn!("failed to acquire lock for clear");
                }
                return Err(err);
            }
        };

        let drained = mem::take(&mut inner.entries);
        drop(inner);

        let count = drained.len();
        drop(drained);

        debug!(count, "notifications cleared");
        Ok(count)
    }

    /// Returns the number of pending entries across all keys.
    pub fn count(&self) -> Result<usize, Error> {
        let inner = self.lock()?;
        Ok(inner.entries.len())
    }

    /// Closes the store.
    ///
    /// Pending entries are dropped, blocked callers and pending futures return empty-handed, and
    /// every later operation fails. Closing an already closed store does nothing.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }

        inner.closed = true;
        let drained = mem::take(&mut inner.entries);
        inner.waiters.wake_all();
        drop(inner);

        self.cond.notify_all();

        let count = drained.len();
        drop(drained);

        debug!(dropped = count, "notification store closed");
    }

    /// Returns `true` if [`close`] was called.
    ///
    /// [`close`]: Self::close
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Waits for the next entry of either variant under `key` and removes it.
    ///
    /// The returned future resolves to `None` if the key is empty or the store is closed. It never
    /// times out by itself; wrap it in the timer of your executor.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use keyslot::{NotificationStore, Payload};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let store = Arc::new(NotificationStore::<u32>::new());
    ///
    ///     let clone = store.clone();
    ///     let handle = tokio::task::spawn(async move {
    ///         clone.notified("counter").await
    ///     });
    ///
    ///     store.send("counter", 1).unwrap();
    ///
    ///     assert_eq!(handle.await.unwrap(), Some(Payload::Data(1)));
    /// }
    /// ```
    #[inline]
    pub fn notified(&self, key: &str) -> Notified<'_, T> {
        Notified::new(self, key, None)
    }

    /// Waits for the next value under `key` and removes it. Signals under `key` are ignored.
    pub async fn consume_async(&self, key: &str) -> Option<T> {
        Notified::new(self, key, Some(Kind::Data))
            .await
            .and_then(Payload::into_data)
    }

    /// Waits for the next signal under `key` and removes it. Values under `key` are ignored.
    pub async fn signal_async(&self, key: &str) -> Option<i32> {
        Notified::new(self, key, Some(Kind::Signal))
            .await
            .and_then(Payload::into_signal)
    }

    /// Acquires the lock within the configured budget, failing if the store is closed.
    fn lock(&self) -> Result<MutexGuard<'_, Inner<T>>, Error> {
        let inner = self
            .inner
            .try_lock_for(self.config.lock_timeout)
            .ok_or(Error::Timeout)?;

        if inner.closed {
            return Err(Error::Closed);
        }

        Ok(inner)
    }
}

impl<T> Default for NotificationStore<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for NotificationStore<T> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        debug!(
            dropped = inner.entries.len(),
            "notification store destroyed"
        );
    }
}

/// A future waiting for an entry under a key. `Notified` is returned from
/// [`NotificationStore::notified`].
///
/// Resolves once with the removed entry. Dropping a pending `Notified` unregisters it.
#[derive(Debug)]
pub struct Notified<'a, T> {
    store: &'a NotificationStore<T>,
    key: String,
    kind: Option<Kind>,
    state: State,
}

impl<'a, T> Notified<'a, T> {
    fn new(store: &'a NotificationStore<T>, key: &str, kind: Option<Kind>) -> Self {
        Self {
            store,
            key: key.to_owned(),
            kind,
            state: State::Init,
        }
    }
}

impl<'a, T> Future for Notified<'a, T> {
    type Output = Option<Payload<T>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // `Notified` holds no self-references and is `Unpin`.
        let this = self.get_mut();

        if this.state == State::Done {
            return Poll::Ready(None);
        }

        if this.key.is_empty() {
            this.state = State::Done;
            return Poll::Ready(None);
        }

        let mut inner = this.store.inner.lock();

        let result = if inner.closed {
            Some(None)
        } else {
            inner.take(&this.key, this.kind).map(Some)
        };

        match result {
            Some(output) => {
                if let State::Pending(id) = this.state {
                    inner.waiters.remove(&this.key, id);
                }
                drop(inner);

                if let Some(payload) = &output {
                    debug!(key = %this.key, kind = ?payload.kind(), "notification consumed");
                }

                this.state = State::Done;
                Poll::Ready(output)
            }
            None => {
                if let State::Pending(id) = this.state {
                    inner.waiters.update(&this.key, id, cx.waker());
                } else {
                    let id = inner.waiters.register(&this.key, cx.waker());
                    this.state = State::Pending(id);
                }

                Poll::Pending
            }
        }
    }
}

impl<'a, T> Drop for Notified<'a, T> {
    fn drop(&mut self) {
        // Remove the waiter if necessary.
        if let State::Pending(id) = self.state {
            let mut inner = self.store.inner.lock();
            inner.waiters.remove(&self.key, id);
        }
    }
}

impl<'a, T> FusedFuture for Notified<'a, T> {
    #[inline]
    fn is_terminated(&self) -> bool {
        self.state == State::Done
    }
}
