//! Structured `phase[:substate]` state values

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Where a builder currently is within a protocol.
///
/// The textual form is `phaseId` or `phaseId:substate`. Only the phase id
/// takes part in signal lookup; the substate is carried along untouched
/// for the orchestrator (e.g. `specify:consult`, `implement:blocked`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhaseState {
    /// Phase identifier, matched exactly against `Phase::id`
    pub phase: String,
    /// Opaque substate, if any
    pub substate: Option<String>,
}

impl PhaseState {
    /// State at the top of a phase
    pub fn new(phase: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            substate: None,
        }
    }

    /// State inside a phase
    pub fn with_substate(phase: impl Into<String>, substate: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            substate: Some(substate.into()),
        }
    }

    /// Parse `phase` or `phase:substate`, splitting on the first `:` only.
    ///
    /// This never fails: an empty string yields an empty phase id, which
    /// simply won't match any phase during validation.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((phase, substate)) => Self {
                phase: phase.to_string(),
                substate: Some(substate.to_string()),
            },
            None => Self::new(raw),
        }
    }

    /// Substate as a string slice
    pub fn substate(&self) -> Option<&str> {
        self.substate.as_deref()
    }

    /// Whether the substate is one of the "waiting on a human" markers
    pub fn is_blocked(&self) -> bool {
        matches!(self.substate(), Some("blocked") | Some("awaiting_input"))
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.substate {
            Some(sub) => write!(f, "{}:{}", self.phase, sub),
            None => f.write_str(&self.phase),
        }
    }
}

impl FromStr for PhaseState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for PhaseState {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for PhaseState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PhaseState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_phase() {
        let state = PhaseState::parse("implement");
        assert_eq!(state.phase, "implement");
        assert_eq!(state.substate, None);
        assert_eq!(state.to_string(), "implement");
    }

    #[test]
    fn test_parse_substate_splits_on_first_colon() {
        let state = PhaseState::parse("specify:consult:round-2");
        assert_eq!(state.phase, "specify");
        assert_eq!(state.substate(), Some("consult:round-2"));
        assert_eq!(state.to_string(), "specify:consult:round-2");
    }

    #[test]
    fn test_blocked_substates() {
        assert!(PhaseState::parse("plan:blocked").is_blocked());
        assert!(PhaseState::parse("plan:awaiting_input").is_blocked());
        assert!(!PhaseState::parse("plan:consult").is_blocked());
        assert!(!PhaseState::parse("plan").is_blocked());
    }

    #[test]
    fn test_serde_as_string() {
        let state = PhaseState::with_substate("defend", "verify");
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"defend:verify\"");

        let back: PhaseState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
