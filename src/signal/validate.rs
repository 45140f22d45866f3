//! Signal validation against a protocol definition

use std::collections::BTreeSet;

use crate::protocol::{PhaseState, Protocol};

/// Outcome of checking a signal against the current phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// The phase declares the signal
    Transition {
        /// State to move to
        next_state: String,
    },
    /// The phase exists but doesn't declare the signal. Still valid, so a
    /// drifting agent never blocks the workflow; the caller falls back to
    /// its default transition.
    Unrecognized {
        warning: String,
    },
    /// The current phase id isn't in the protocol. This is a configuration
    /// or persisted-state defect and the only invalid outcome.
    UnknownPhase {
        warning: String,
    },
}

impl Validation {
    /// Whether the signal may be acted upon
    pub fn is_valid(&self) -> bool {
        !matches!(self, Validation::UnknownPhase { .. })
    }

    /// Next state, when the signal maps to one
    pub fn next_state(&self) -> Option<&str> {
        match self {
            Validation::Transition { next_state } => Some(next_state.as_str()),
            _ => None,
        }
    }

    /// Diagnostic for the two non-transition outcomes
    pub fn warning(&self) -> Option<&str> {
        match self {
            Validation::Transition { .. } => None,
            Validation::Unrecognized { warning } | Validation::UnknownPhase { warning } => {
                Some(warning.as_str())
            }
        }
    }
}

/// Validate a signal for the current state.
///
/// Only the phase id takes part in the lookup; the substate is ignored.
pub fn validate_signal(signal: &str, protocol: &Protocol, current: &PhaseState) -> Validation {
    let Some(phase) = protocol.phase(&current.phase) else {
        return Validation::UnknownPhase {
            warning: format!("Unknown phase: {}", current.phase),
        };
    };

    match phase.next_state(signal) {
        Some(next) => Validation::Transition {
            next_state: next.to_string(),
        },
        None => Validation::Unrecognized {
            warning: format!(
                "Signal \"{}\" not defined in protocol for phase {}",
                signal, current.phase
            ),
        },
    }
}

/// Signal names a phase declares; empty when the phase is absent or has none
pub fn valid_signals<'a>(protocol: &'a Protocol, phase_id: &str) -> BTreeSet<&'a str> {
    protocol
        .phase(phase_id)
        .map(|phase| phase.signals.keys().map(String::as_str).collect())
        .unwrap_or_default()
}
