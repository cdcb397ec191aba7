//! # breakwater-runtime
//!
//! Store-backed async engine for the breakwater distributed circuit
//! breaker.
//!
//! A [`Breaker`] wraps calls to an unreliable dependency. Circuit state
//! and rolling-window counters live in a shared key-value store behind
//! the [`store::Store`] trait, so any number of processes guarding the
//! same named dependency observe one consistent circuit: closed while
//! the dependency is healthy, open once the rolling error rate trips
//! the configured thresholds, half-open for a recovery probe after the
//! cooldown.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use breakwater_runtime::{store::MemoryStore, Breaker, BreakerError, CircuitSettings};
//!
//! let breaker = Breaker::new(Arc::new(MemoryStore::new()), CircuitSettings::default())?;
//!
//! match breaker.call("billing", || client.charge(&invoice)).await {
//!     Ok(receipt) => handle(receipt),
//!     Err(BreakerError::Open(_)) => serve_fallback(),
//!     Err(err) => return Err(err.into()),
//! }
//! ```
//!
//! ## Important
//!
//! The breaker is not a retry policy, not a rate limiter, and not a
//! bulkhead; layer those above it. It also does not guarantee that a
//! recovery probe runs exactly once — see [`Breaker::call`].

mod breaker;
pub mod store;

pub use breaker::{Breaker, BreakerError};
pub use breakwater_core::{CircuitSettings, CircuitState, SettingsError};
