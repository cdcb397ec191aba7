//! The shared-store boundary.
//!
//! Everything the engine knows about the outside world goes through the
//! [`Store`] trait: a key-value store that applies small command batches
//! atomically. Any conforming implementation is substitutable —
//! [`MemoryStore`] for tests and single-process use, [`RedisStore`]
//! (feature `redis`) for real multi-process deployments.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

mod memory;

#[cfg(feature = "redis")]
mod redis;

pub use memory::MemoryStore;

#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// One command in an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// Create `key` with `value` only if it does not already exist.
    /// Replies [`StoreReply::Integer`]: 1 if created, 0 otherwise.
    SetIfAbsent { key: String, value: String },

    /// Read `key`. Replies [`StoreReply::Value`].
    Get { key: String },

    /// Write `value` to `key`, replacing any previous value and expiry,
    /// with an optional time-to-live. Replies [`StoreReply::Unit`].
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },

    /// Increment the integer at `key`, creating it at 0 first if
    /// absent. Replies [`StoreReply::Integer`] with the new value.
    Incr { key: String },

    /// Remove `key`. Replies [`StoreReply::Integer`] with the number of
    /// keys removed.
    Delete { key: String },

    /// Set a time-to-live on `key` only if it has none yet; an expiry
    /// that is already running is never shortened or extended. Replies
    /// [`StoreReply::Integer`]: 1 if the expiry was set.
    ExpireIfUnset { key: String, ttl: Duration },

    /// Read the remaining time-to-live of `key`. Replies
    /// [`StoreReply::Ttl`].
    RemainingTtl { key: String },
}

/// Reply to one [`StoreCommand`], matched positionally to the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreReply {
    /// A value read, or `None` if the key is absent or expired.
    Value(Option<String>),

    /// An integer result (counters, created/removed flags).
    Integer(i64),

    /// Remaining life of a key: `Some` only while positive.
    Ttl(Option<Duration>),

    /// Acknowledgement without a payload.
    Unit,
}

/// Errors from a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the batch.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// The store answered with something the engine cannot interpret.
    #[error("malformed store reply: {0}")]
    Reply(String),
}

#[cfg(feature = "redis")]
impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        StoreError::Connection(err.to_string())
    }
}

/// A shared key-value store that applies command batches atomically.
///
/// All commands in one `apply` take effect in order with no
/// interleaving from other clients, and no client ever observes a
/// partially-applied batch. That atomicity is the breaker's only
/// cross-process coordination mechanism, so it is load-bearing for
/// every implementation.
///
/// Connection lifecycle stays with the implementation and its caller:
/// the engine borrows the store for one batch at a time and holds
/// nothing across the wrapped call's execution.
#[async_trait]
pub trait Store: Send + Sync {
    /// Apply `commands` as one atomic unit and return one reply per
    /// command, in order.
    async fn apply(&self, commands: &[StoreCommand]) -> Result<Vec<StoreReply>, StoreError>;
}
