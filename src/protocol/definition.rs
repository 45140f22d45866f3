//! Protocol definition parsing and structures

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::state::PhaseState;
use crate::{Error, Result};

/// A declarative phase/signal/transition table for one workflow kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    /// Protocol name ("standard", "tick", "bugfix", ...)
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Phases in their informative order
    #[serde(default)]
    pub phases: Vec<Phase>,
}

/// A single phase and its signal table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Phase id, unique within the protocol
    pub id: String,
    /// Human-readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Signal name → next state (`phase` or `phase:substate`)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub signals: BTreeMap<String, String>,
}

impl Phase {
    /// Create a phase with no signals
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            signals: BTreeMap::new(),
        }
    }

    /// Builder-style signal registration
    pub fn signal(mut self, name: impl Into<String>, next: impl Into<String>) -> Self {
        self.signals.insert(name.into(), next.into());
        self
    }

    /// Next state for a signal, if the phase declares it
    pub fn next_state(&self, signal: &str) -> Option<&str> {
        self.signals.get(signal).map(String::as_str)
    }

    /// A phase with no outgoing signals ends the protocol
    pub fn is_terminal(&self) -> bool {
        self.signals.is_empty()
    }
}

impl Protocol {
    /// Load a protocol definition, choosing the format from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Protocol(format!("Failed to read protocol {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::parse_toml(&content),
            Some("json") => Self::parse_json(&content),
            Some("yaml") | Some("yml") => Self::parse_yaml(&content),
            other => Err(Error::Protocol(format!(
                "Unsupported protocol format {:?} for {}",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }

    /// Parse a protocol from TOML
    pub fn parse_toml(content: &str) -> Result<Self> {
        let protocol: Protocol = toml::from_str(content)
            .map_err(|e| Error::Protocol(format!("Failed to parse protocol: {}", e)))?;
        protocol.check()?;
        Ok(protocol)
    }

    /// Parse a protocol from JSON
    pub fn parse_json(content: &str) -> Result<Self> {
        let protocol: Protocol = serde_json::from_str(content)
            .map_err(|e| Error::Protocol(format!("Failed to parse protocol: {}", e)))?;
        protocol.check()?;
        Ok(protocol)
    }

    /// Parse a protocol from YAML
    pub fn parse_yaml(content: &str) -> Result<Self> {
        let protocol: Protocol = serde_yaml::from_str(content)
            .map_err(|e| Error::Protocol(format!("Failed to parse protocol: {}", e)))?;
        protocol.check()?;
        Ok(protocol)
    }

    /// Check structural invariants: phase ids must be unique.
    ///
    /// Signal names outside the UPPER_SNAKE convention are allowed and only
    /// noted at debug level. Transitions into a phase the protocol doesn't
    /// declare are warned about here; a run taking one fails on its next turn.
    pub fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for phase in &self.phases {
            if !seen.insert(phase.id.as_str()) {
                return Err(Error::Protocol(format!(
                    "Duplicate phase id '{}' in protocol {}",
                    phase.id, self.name
                )));
            }

            for signal in phase.signals.keys() {
                if !signal_name_pattern().is_match(signal) {
                    debug!(
                        "Signal {:?} in {}/{} is not UPPER_SNAKE case",
                        signal, self.name, phase.id
                    );
                }
            }
        }

        for (phase, signal, target) in self.dangling_targets() {
            warn!(
                "Signal {} in {}/{} leads to unknown phase {:?}",
                signal, self.name, phase, target
            );
        }
        Ok(())
    }

    /// Transitions whose target phase isn't declared, as
    /// `(phase, signal, next_state)`
    pub fn dangling_targets(&self) -> Vec<(&str, &str, &str)> {
        self.phases
            .iter()
            .flat_map(|phase| {
                phase
                    .signals
                    .iter()
                    .map(move |(signal, next)| (phase.id.as_str(), signal.as_str(), next.as_str()))
            })
            .filter(|(_, _, next)| !self.has_phase(&PhaseState::parse(next).phase))
            .collect()
    }

    /// Look up a phase by id
    pub fn phase(&self, id: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == id)
    }

    /// Check if a phase exists
    pub fn has_phase(&self, id: &str) -> bool {
        self.phase(id).is_some()
    }

    /// All phase ids in declaration order
    pub fn phase_ids(&self) -> impl Iterator<Item = &str> {
        self.phases.iter().map(|p| p.id.as_str())
    }

    /// The phase a fresh run starts in
    pub fn first_phase(&self) -> Option<&Phase> {
        self.phases.first()
    }
}

fn signal_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("static signal name pattern"))
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<BTreeMap<String, String>> = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}
