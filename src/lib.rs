//! Porch: protocol orchestration for coding-agent builders
//!
//! Builders move through a declarative multi-phase protocol
//! (specify → plan → implement → defend → evaluate → review, or the
//! shorter tick and bugfix protocols). Agents announce progress with
//! inline markers in their free-text output:
//!
//! ```text
//! <signal>PLAN_READY</signal>
//! <signal type=BLOCKED>waiting on API keys</signal>
//! ```
//!
//! # Architecture
//!
//! ```text
//! agent output ──► signal::scanner ──► signal::extract ──┐
//!                                                         ▼
//!                 protocol::Protocol ──► signal::validate ──► SignalResult
//!                                                         │
//!                            workflow::WorkflowRun ◄──────┘
//!                                   │
//!                                   ▼
//!                         hq::BuilderUpdatePayload
//! ```
//!
//! The signal core is pure: no I/O, no shared state, and it never fails
//! on any input text. Unknown signals pass through with a warning so a
//! drifting agent can't stall the workflow; only an unknown phase id is
//! reported as invalid.

pub mod config;
pub mod hq;
pub mod protocol;
pub mod signal;
pub mod workflow;

// Re-exports for convenience
pub use config::Config;
pub use protocol::{Phase, PhaseState, Protocol};
pub use signal::{
    extract_all_signals, extract_signal, format_signal, has_signal, parse_signal,
    strip_signals, valid_signals, validate_signal, ExtractedSignal, SignalResult, Validation,
};
pub use workflow::{RunStatus, StateStore, TurnOutcome, WorkflowRun};

/// Crate-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    #[error("Workflow state error: {0}")]
    State(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
