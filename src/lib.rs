//! Key-addressed, single-slot mailboxes for passing values and signals between threads and tasks.
//!
//! A [`NotificationStore`] maps string keys to at most one pending entry each. An entry is either a
//! handle to caller-owned data or an integer signal (see [`Payload`]). Sending to an occupied key
//! replaces the pending entry; consuming removes it, so each entry is delivered at most once.
//!
//! Blocking consumers ([`consume`], [`signal`], [`wait`]) take an explicit timeout and report a miss
//! as `None`/`false`. Asynchronous consumers use [`notified`], which works with any executor.
//!
//! [`consume`]: NotificationStore::consume
//! [`signal`]: NotificationStore::signal
//! [`wait`]: NotificationStore::wait
//! [`notified`]: NotificationStore::notified
mod config;
mod errors;
mod store;
mod utils;

pub use config::{Config, DEFAULT_LOCK_TIMEOUT};
pub use errors::{Error, SendError};
pub use store::{NotificationStore, Notified};
pub use utils::store::{Kind, Payload};
