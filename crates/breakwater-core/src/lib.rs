//! # breakwater-core
//!
//! Deterministic decision core for the breakwater distributed circuit
//! breaker.
//!
//! This crate answers the pure questions:
//! - Which store keys back a named breaker?
//! - What do the persisted state strings mean?
//! - Given the window counts, should a failure trip the circuit?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No I/O**: Nothing here touches the network or the clock
//! 3. **Parallel-safe**: Every function is pure
//!
//! The async engine that drives these decisions against a shared store
//! lives in `breakwater-runtime`.

pub mod config;
pub mod decision;
pub mod keys;
pub mod state;

// Re-export main types at crate root
pub use config::{CircuitSettings, SettingsError};
pub use decision::{error_percent, should_trip};
pub use keys::BreakerKeys;
pub use state::{CircuitState, UnknownState};
