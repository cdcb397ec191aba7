//! Circuit state and its wire encoding.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// State of a circuit.
///
/// Only `Closed` and `Open` are ever persisted. `HalfOpen` is inferred
/// per call, when a stored `Open` state has an expired cooldown marker,
/// and lives only for the duration of that call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, calls pass through.
    Closed,

    /// Circuit tripped; calls fail fast until the cooldown elapses.
    Open,

    /// Cooldown elapsed; the current call runs as a recovery probe.
    HalfOpen,
}

impl CircuitState {
    /// Wire encoding as written to the store.
    pub fn as_wire(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPENED",
            CircuitState::HalfOpen => "HALF_OPENED",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// A stored state string that is not a known encoding.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown circuit state `{0}`")]
pub struct UnknownState(pub String);

impl FromStr for CircuitState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CLOSED" => Ok(CircuitState::Closed),
            "OPENED" => Ok(CircuitState::Open),
            "HALF_OPENED" => Ok(CircuitState::HalfOpen),
            other => Err(UnknownState(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_round_trip() {
        for state in [CircuitState::Closed, CircuitState::Open] {
            assert_eq!(state.as_wire().parse::<CircuitState>(), Ok(state));
        }
    }

    #[test]
    fn test_unknown_state_is_rejected() {
        let err = "ajar".parse::<CircuitState>().unwrap_err();
        assert_eq!(err, UnknownState("ajar".to_string()));
    }
}
