//! The breaker engine: guarded calls against a shared store.
//!
//! The engine implements the closed / open / half-open state machine.
//! Each transition is one atomic store batch; the decision logic itself
//! lives in `breakwater-core`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use breakwater_core::{
    keys::BreakerKeys, should_trip, CircuitSettings, CircuitState, SettingsError,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{Store, StoreCommand, StoreError, StoreReply};

/// Errors surfaced by a guarded call.
///
/// Only `Open` and `Store` originate in the breaker; `Service` is the
/// wrapped call's own failure, passed through unchanged.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit is open and the cooldown has not elapsed; the work
    /// was not executed. Callers branch on this for fallback logic.
    #[error("circuit `{0}` is open")]
    Open(String),

    /// A store operation failed before the work could be admitted; the
    /// breaker state is unchanged.
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    /// The wrapped call itself failed.
    #[error(transparent)]
    Service(E),
}

impl<E> BreakerError<E> {
    /// Whether this is the fast-fail "circuit open" outcome.
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open(_))
    }
}

/// A distributed circuit breaker engine.
///
/// All breaker state lives in the shared [`Store`]; any number of
/// processes may guard the same named dependency with their own engine
/// and observe one consistent circuit. The engine holds only immutable
/// tuning and a store handle, so it is cheap to clone and share across
/// tasks.
#[derive(Clone)]
pub struct Breaker {
    store: Arc<dyn Store>,
    settings: CircuitSettings,
}

impl Breaker {
    /// Create an engine over `store`.
    ///
    /// Settings are validated here and immutable afterwards.
    pub fn new(store: Arc<dyn Store>, settings: CircuitSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self { store, settings })
    }

    /// The engine's tuning.
    pub fn settings(&self) -> &CircuitSettings {
        &self.settings
    }

    /// Run `work` guarded by the breaker named `name`.
    ///
    /// Returns the work's own result unchanged, except when the circuit
    /// is open ([`BreakerError::Open`]) or the store cannot be reached
    /// during admission ([`BreakerError::Store`]). A work outcome of
    /// `Err` counts as a failure toward the rolling window; encode
    /// timeouts and cancellations as `Err` for them to count.
    ///
    /// Store failures in the post-outcome bookkeeping are logged and
    /// swallowed; they never mask the work's result.
    ///
    /// # Concurrency
    ///
    /// The span from admission to the outcome write covers two store
    /// batches with the wrapped call in between, and that window is
    /// deliberately unguarded: once a cooldown elapses, every
    /// concurrent caller may run as a recovery probe, and the last
    /// outcome written wins. Callers that need an exactly-one-probe
    /// guarantee must layer their own exclusion on top.
    pub async fn call<F, Fut, T, E>(&self, name: &str, work: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        let keys = BreakerKeys::new(name);

        // Effective state for this call, computed once up front.
        let (stored, marker_ttl) = self.init(&keys).await?;
        let state = match stored {
            CircuitState::Open if marker_ttl.is_some() => {
                return Err(BreakerError::Open(name.to_string()));
            }
            CircuitState::Open => {
                debug!(breaker = name, "cooldown elapsed, admitting recovery probe");
                CircuitState::HalfOpen
            }
            other => other,
        };

        let (request_count, error_count) = self.pre_run(&keys).await?;

        match work().await {
            Ok(value) => {
                if state == CircuitState::HalfOpen {
                    match self.flip_close(&keys).await {
                        Ok(()) => {
                            info!(breaker = name, "circuit closed after successful recovery")
                        }
                        Err(err) => warn!(
                            breaker = name,
                            error = %err,
                            "failed to close circuit after recovery"
                        ),
                    }
                }
                Ok(value)
            }
            Err(service_err) => {
                match state {
                    CircuitState::HalfOpen => match self.flip_open(&keys).await {
                        Ok(()) => warn!(
                            breaker = name,
                            "circuit reopened after failed recovery probe"
                        ),
                        Err(err) => {
                            warn!(breaker = name, error = %err, "failed to reopen circuit")
                        }
                    },
                    _ => {
                        if should_trip(request_count, error_count, &self.settings) {
                            match self.flip_open(&keys).await {
                                Ok(()) => warn!(
                                    breaker = name,
                                    request_count, error_count, "circuit opened"
                                ),
                                Err(err) => {
                                    warn!(breaker = name, error = %err, "failed to open circuit")
                                }
                            }
                        } else if let Err(err) = self.record_error(&keys).await {
                            warn!(breaker = name, error = %err, "failed to record error");
                        }
                    }
                }
                Err(BreakerError::Service(service_err))
            }
        }
    }

    /// Ensure the state key exists and read state plus cooldown clock.
    async fn init(
        &self,
        keys: &BreakerKeys,
    ) -> Result<(CircuitState, Option<Duration>), StoreError> {
        let replies = self
            .store
            .apply(&[
                StoreCommand::SetIfAbsent {
                    key: keys.current_state(),
                    value: CircuitState::Closed.as_wire().to_string(),
                },
                StoreCommand::Get {
                    key: keys.current_state(),
                },
                StoreCommand::RemainingTtl {
                    key: keys.open_marker(),
                },
            ])
            .await?;

        let state = match replies.get(1) {
            Some(StoreReply::Value(Some(raw))) => raw
                .parse::<CircuitState>()
                .map_err(|err| StoreError::Reply(err.to_string()))?,
            other => return Err(shape_error("current state", other)),
        };
        let marker_ttl = match replies.get(2) {
            Some(StoreReply::Ttl(ttl)) => *ttl,
            other => return Err(shape_error("marker ttl", other)),
        };
        Ok((state, marker_ttl))
    }

    /// Count this request into the rolling window and read back both
    /// counters. Expiries are set only when absent, so a mid-window
    /// increment never resets the window.
    async fn pre_run(&self, keys: &BreakerKeys) -> Result<(u64, u64), StoreError> {
        let interval = self.settings.interval;
        let replies = self
            .store
            .apply(&[
                StoreCommand::Incr {
                    key: keys.request_count(),
                },
                StoreCommand::SetIfAbsent {
                    key: keys.error_count(),
                    value: "0".to_string(),
                },
                StoreCommand::ExpireIfUnset {
                    key: keys.request_count(),
                    ttl: interval,
                },
                StoreCommand::ExpireIfUnset {
                    key: keys.error_count(),
                    ttl: interval,
                },
                StoreCommand::Get {
                    key: keys.request_count(),
                },
                StoreCommand::Get {
                    key: keys.error_count(),
                },
            ])
            .await?;

        let request_count = parse_count(replies.get(4), "request count")?;
        let error_count = parse_count(replies.get(5), "error count")?;
        Ok((request_count, error_count))
    }

    /// Close the circuit and end the cooldown early.
    async fn flip_close(&self, keys: &BreakerKeys) -> Result<(), StoreError> {
        self.store
            .apply(&[
                StoreCommand::Set {
                    key: keys.current_state(),
                    value: CircuitState::Closed.as_wire().to_string(),
                    ttl: None,
                },
                StoreCommand::Delete {
                    key: keys.open_marker(),
                },
            ])
            .await?;
        Ok(())
    }

    /// Open the circuit and (re)start the cooldown, replacing any stale
    /// marker.
    async fn flip_open(&self, keys: &BreakerKeys) -> Result<(), StoreError> {
        self.store
            .apply(&[
                StoreCommand::Set {
                    key: keys.current_state(),
                    value: CircuitState::Open.as_wire().to_string(),
                    ttl: None,
                },
                StoreCommand::Set {
                    key: keys.open_marker(),
                    value: "1".to_string(),
                    ttl: Some(self.settings.sleep_window),
                },
            ])
            .await?;
        Ok(())
    }

    /// Record a below-threshold failure. The request counter is
    /// re-created first in case the window expired while the work ran.
    async fn record_error(&self, keys: &BreakerKeys) -> Result<(), StoreError> {
        let interval = self.settings.interval;
        self.store
            .apply(&[
                StoreCommand::SetIfAbsent {
                    key: keys.request_count(),
                    value: "1".to_string(),
                },
                StoreCommand::Incr {
                    key: keys.error_count(),
                },
                StoreCommand::ExpireIfUnset {
                    key: keys.request_count(),
                    ttl: interval,
                },
                StoreCommand::ExpireIfUnset {
                    key: keys.error_count(),
                    ttl: interval,
                },
            ])
            .await?;
        Ok(())
    }
}

fn parse_count(reply: Option<&StoreReply>, what: &str) -> Result<u64, StoreError> {
    match reply {
        Some(StoreReply::Value(Some(raw))) => raw
            .parse::<u64>()
            .map_err(|_| StoreError::Reply(format!("{what} is not an integer: `{raw}`"))),
        Some(StoreReply::Value(None)) => Ok(0),
        other => Err(shape_error(what, other)),
    }
}

fn shape_error(what: &str, reply: Option<&StoreReply>) -> StoreError {
    StoreError::Reply(format!("unexpected {what} reply: {reply:?}"))
}
