//! Per-builder workflow run state
//!
//! A run tracks where one builder is within its protocol and applies the
//! signal engine to each agent turn:
//! - no signal, or an unrecognized one: stay put
//! - a declared signal: move to its next state
//! - an unknown current phase: fail the run and escalate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::hq::BuilderStatus;
use crate::protocol::{PhaseState, Protocol};
use crate::signal::{parse_signal, valid_signals};
use crate::{Error, Result};

/// Workflow run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Unique run ID
    pub id: String,
    /// Protocol name
    pub protocol: String,
    /// Builder executing this run
    pub builder_id: String,
    /// Project the builder works in
    pub project_path: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run was last updated
    pub updated_at: DateTime<Utc>,
    /// Current `phase[:substate]`
    pub state: PhaseState,
    /// Overall status
    pub status: RunStatus,
    /// Agent turns applied so far
    #[serde(default)]
    pub turns: u32,
    /// Every state change, oldest first
    #[serde(default)]
    pub history: Vec<TransitionRecord>,
    /// Most recent validation warning
    #[serde(default)]
    pub last_warning: Option<String>,
}

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Agent is working through phases
    Running,
    /// Waiting on a human (blocked or awaiting input)
    Blocked,
    /// Reached a terminal phase
    Completed,
    /// State no longer matches the protocol
    Failed,
}

/// A single state change caused by a signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: PhaseState,
    pub to: PhaseState,
    pub signal: String,
    /// Content of a typed signal, e.g. the blocking reason
    #[serde(default)]
    pub content: Option<String>,
    pub at: DateTime<Utc>,
}

/// What one agent turn did to the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// State changed
    Advanced(TransitionRecord),
    /// State unchanged: no signal, or a signal the phase doesn't declare
    Held {
        signal: Option<String>,
        warning: Option<String>,
    },
}

impl WorkflowRun {
    /// Start a run at the protocol's first phase
    pub fn new(protocol: &Protocol, builder_id: &str, project_path: &str) -> Result<Self> {
        let first = protocol.first_phase().ok_or_else(|| {
            Error::Protocol(format!("Protocol {} has no phases", protocol.name))
        })?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            protocol: protocol.name.clone(),
            builder_id: builder_id.to_string(),
            project_path: project_path.to_string(),
            started_at: now,
            updated_at: now,
            state: PhaseState::new(first.id.clone()),
            status: RunStatus::Running,
            turns: 0,
            history: Vec::new(),
            last_warning: None,
        })
    }

    /// Apply one agent turn's output
    pub fn apply_turn(&mut self, output: &str, protocol: &Protocol) -> Result<TurnOutcome> {
        if matches!(self.status, RunStatus::Completed | RunStatus::Failed) {
            return Err(Error::State(format!(
                "Run {} is {:?}; no further turns accepted",
                self.id, self.status
            )));
        }
        if protocol.name != self.protocol {
            warn!(
                "Run {} was started with protocol {} but is driven with {}",
                self.id, self.protocol, protocol.name
            );
        }

        self.turns += 1;
        self.updated_at = Utc::now();

        let result = parse_signal(output, protocol, &self.state);
        self.last_warning = result.error.clone();

        if !result.is_valid {
            self.status = RunStatus::Failed;
            return Err(Error::UnknownPhase(self.state.phase.clone()));
        }

        let (Some(signal), Some(next)) = (result.signal.clone(), result.next_state.as_deref())
        else {
            debug!("Run {} holds at {}", self.id, self.state);
            return Ok(TurnOutcome::Held {
                signal: result.signal,
                warning: result.error,
            });
        };

        let record = TransitionRecord {
            from: self.state.clone(),
            to: PhaseState::parse(next),
            signal,
            content: result.content,
            at: self.updated_at,
        };
        info!(
            "Run {}: {} --{}--> {}",
            self.id, record.from, record.signal, record.to
        );

        self.state = record.to.clone();
        self.status = self.status_for(protocol);
        self.history.push(record.clone());

        Ok(TurnOutcome::Advanced(record))
    }

    fn status_for(&self, protocol: &Protocol) -> RunStatus {
        match protocol.phase(&self.state.phase) {
            Some(phase) if phase.is_terminal() => RunStatus::Completed,
            _ if self.state.is_blocked() => RunStatus::Blocked,
            _ => RunStatus::Running,
        }
    }

    /// Status to report to the coordination hub
    pub fn builder_status(&self) -> BuilderStatus {
        match self.status {
            RunStatus::Completed => BuilderStatus::Complete,
            RunStatus::Blocked | RunStatus::Failed => BuilderStatus::Blocked,
            RunStatus::Running if self.turns == 0 => BuilderStatus::Spawning,
            RunStatus::Running => match self.state.phase.as_str() {
                "review" | "pr" => BuilderStatus::PrReady,
                _ => BuilderStatus::Implementing,
            },
        }
    }

    /// Signals the agent may emit next, for prompt construction
    pub fn valid_signals<'a>(&self, protocol: &'a Protocol) -> Vec<&'a str> {
        valid_signals(protocol, &self.state.phase).into_iter().collect()
    }

    /// Whether the run has reached a terminal phase
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Get summary of run progress
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Run: {} ({})", self.id, self.protocol),
            format!("Builder: {} @ {}", self.builder_id, self.project_path),
            format!("Status: {:?} / {}", self.status, self.builder_status()),
            format!("Current: {}", self.state),
            format!("Turns: {}", self.turns),
        ];

        if let Some(ref w) = self.last_warning {
            lines.push(format!("Warning: {}", w));
        }

        if !self.history.is_empty() {
            lines.push(String::new());
            lines.push("History:".to_string());
            for t in &self.history {
                let note = t
                    .content
                    .as_ref()
                    .map(|c| format!(" ({})", c))
                    .unwrap_or_default();
                lines.push(format!("  {} → {} [{}]{}", t.from, t.to, t.signal, note));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::builtin::{standard_protocol, tick_protocol};

    #[test]
    fn test_new_run_starts_at_first_phase() {
        let run = WorkflowRun::new(&standard_protocol(), "b1", "/p").unwrap();
        assert_eq!(run.state, PhaseState::new("specify"));
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.builder_status(), BuilderStatus::Spawning);
    }

    #[test]
    fn test_empty_protocol_rejected() {
        let protocol = Protocol {
            name: "empty".to_string(),
            description: None,
            phases: vec![],
        };
        assert!(matches!(
            WorkflowRun::new(&protocol, "b", "/p"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_tick_run_to_completion() {
        let protocol = tick_protocol();
        let mut run = WorkflowRun::new(&protocol, "b1", "/p").unwrap();

        for (output, expected) in [
            ("read it <signal>UNDERSTOOD</signal>", "implement"),
            ("<signal>IMPLEMENTED</signal>", "verify"),
            ("all green <signal>VERIFIED</signal>", "complete"),
        ] {
            let outcome = run.apply_turn(output, &protocol).unwrap();
            assert!(matches!(outcome, TurnOutcome::Advanced(_)));
            assert_eq!(run.state.to_string(), expected);
        }

        assert!(run.is_complete());
        assert_eq!(run.builder_status(), BuilderStatus::Complete);
        assert_eq!(run.history.len(), 3);
        assert!(run.apply_turn("more", &protocol).is_err());
    }

    #[test]
    fn test_no_signal_holds() {
        let protocol = tick_protocol();
        let mut run = WorkflowRun::new(&protocol, "b1", "/p").unwrap();

        let outcome = run.apply_turn("still reading...", &protocol).unwrap();
        assert_eq!(
            outcome,
            TurnOutcome::Held {
                signal: None,
                warning: None
            }
        );
        assert_eq!(run.state.phase, "understand");
        assert_eq!(run.builder_status(), BuilderStatus::Implementing);
    }

    #[test]
    fn test_unknown_signal_holds_with_warning() {
        let protocol = tick_protocol();
        let mut run = WorkflowRun::new(&protocol, "b1", "/p").unwrap();

        let outcome = run.apply_turn("<signal>FLUB</signal>", &protocol).unwrap();
        match outcome {
            TurnOutcome::Held { signal, warning } => {
                assert_eq!(signal.as_deref(), Some("FLUB"));
                assert!(warning.unwrap().contains("FLUB"));
            }
            other => panic!("expected hold, got {:?}", other),
        }
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.last_warning.is_some());
    }

    #[test]
    fn test_blocked_and_resume() {
        let protocol = tick_protocol();
        let mut run = WorkflowRun::new(&protocol, "b1", "/p").unwrap();

        let outcome = run
            .apply_turn("<signal type=BLOCKED>need creds</signal>", &protocol)
            .unwrap();
        let TurnOutcome::Advanced(record) = outcome else {
            panic!("expected transition");
        };
        assert_eq!(record.content.as_deref(), Some("need creds"));
        assert_eq!(run.state.to_string(), "understand:blocked");
        assert_eq!(run.status, RunStatus::Blocked);
        assert_eq!(run.builder_status(), BuilderStatus::Blocked);

        // substate is ignored for lookup, so the phase's signals still apply
        run.apply_turn("<signal>UNDERSTOOD</signal>", &protocol).unwrap();
        assert_eq!(run.state.to_string(), "implement");
        assert_eq!(run.status, RunStatus::Running);
    }

    #[test]
    fn test_unknown_phase_fails_run() {
        let protocol = tick_protocol();
        let mut run = WorkflowRun::new(&protocol, "b1", "/p").unwrap();
        run.state = PhaseState::parse("ghost_phase");

        let err = run.apply_turn("<signal>UNDERSTOOD</signal>", &protocol).unwrap_err();
        assert!(matches!(err, Error::UnknownPhase(ref p) if p == "ghost_phase"));
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.last_warning.as_deref(), Some("Unknown phase: ghost_phase"));
    }

    #[test]
    fn test_review_reports_pr_ready() {
        let protocol = standard_protocol();
        let mut run = WorkflowRun::new(&protocol, "b1", "/p").unwrap();
        run.state = PhaseState::new("evaluate");

        run.apply_turn("<signal>IMPLEMENTATION_COMPLETE</signal>", &protocol)
            .unwrap();
        assert_eq!(run.state.phase, "review");
        assert_eq!(run.builder_status(), BuilderStatus::PrReady);
        assert_eq!(
            run.valid_signals(&protocol),
            vec!["AWAITING_INPUT", "BLOCKED", "COMPLETE", "REVIEW_COMPLETE"]
        );
    }

    #[test]
    fn test_summary_mentions_history() {
        let protocol = tick_protocol();
        let mut run = WorkflowRun::new(&protocol, "b1", "/p").unwrap();
        run.apply_turn("<signal>UNDERSTOOD</signal>", &protocol).unwrap();

        let summary = run.summary();
        assert!(summary.contains("Current: implement"));
        assert!(summary.contains("understand → implement [UNDERSTOOD]"));
    }
}
