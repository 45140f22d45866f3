//! Combined extraction and validation

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::extract::{extract_all_signals, extract_signal};
use super::validate::validate_signal;
use crate::protocol::{PhaseState, Protocol};

/// Everything an orchestrator needs from one agent turn
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalResult {
    /// Governing signal, if any
    pub signal: Option<String>,
    /// Content of the governing signal (typed form only)
    pub content: Option<String>,
    /// Every signal seen, for diagnostics
    pub all_signals: Vec<String>,
    /// False only when the current phase is unknown
    pub is_valid: bool,
    /// State to move to, when the signal maps to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_state: Option<String>,
    /// Validation warning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SignalResult {
    /// Result for output carrying no signal. Valid: the caller applies its
    /// default transition.
    pub fn none() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }
}

/// Extract the governing signal from agent output and validate it
pub fn parse_signal(output: &str, protocol: &Protocol, current: &PhaseState) -> SignalResult {
    let Some(extracted) = extract_signal(output) else {
        debug!("No signal in output for {}", current);
        return SignalResult::none();
    };

    let validation = validate_signal(&extracted.kind, protocol, current);
    match validation.warning() {
        Some(w) if !validation.is_valid() => warn!("{} (protocol {})", w, protocol.name),
        Some(w) => warn!("{}", w),
        None => debug!(
            "Signal {} in {} → {}",
            extracted.kind,
            current,
            validation.next_state().unwrap_or_default()
        ),
    }

    SignalResult {
        is_valid: validation.is_valid(),
        next_state: validation.next_state().map(str::to_string),
        error: validation.warning().map(str::to_string),
        all_signals: extract_all_signals(output),
        signal: Some(extracted.kind),
        content: extracted.content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Phase;

    fn protocol() -> Protocol {
        Protocol {
            name: "test".to_string(),
            description: None,
            phases: vec![Phase::new("implement")
                .signal("COMPLETE", "review")
                .signal("BLOCKED", "implement:blocked")],
        }
    }

    #[test]
    fn test_no_signal_is_valid() {
        let result = parse_signal("nothing to see", &protocol(), &"implement".into());
        assert_eq!(result, SignalResult::none());
        assert!(result.is_valid);
        assert!(result.all_signals.is_empty());
    }

    #[test]
    fn test_no_signal_is_valid_even_for_unknown_phase() {
        let result = parse_signal("nothing", &protocol(), &"ghost".into());
        assert!(result.is_valid);
        assert_eq!(result.signal, None);
    }

    #[test]
    fn test_known_signal() {
        let result = parse_signal(
            "work done <signal>COMPLETE</signal>",
            &protocol(),
            &"implement".into(),
        );
        assert_eq!(result.signal.as_deref(), Some("COMPLETE"));
        assert!(result.is_valid);
        assert_eq!(result.next_state.as_deref(), Some("review"));
        assert_eq!(result.error, None);
        assert_eq!(result.all_signals, vec!["COMPLETE"]);
    }

    #[test]
    fn test_typed_signal_carries_content() {
        let result = parse_signal(
            "<signal type=BLOCKED>waiting on API keys</signal>",
            &protocol(),
            &"implement:working".into(),
        );
        assert_eq!(result.signal.as_deref(), Some("BLOCKED"));
        assert_eq!(result.content.as_deref(), Some("waiting on API keys"));
        assert_eq!(result.next_state.as_deref(), Some("implement:blocked"));
    }

    #[test]
    fn test_unknown_phase() {
        let result = parse_signal("<signal>COMPLETE</signal>", &protocol(), &"ghost_phase".into());
        assert!(!result.is_valid);
        assert_eq!(result.next_state, None);
        assert_eq!(result.error.as_deref(), Some("Unknown phase: ghost_phase"));
    }

    #[test]
    fn test_unknown_signal() {
        let result = parse_signal("<signal>FLUB</signal>", &protocol(), &"implement".into());
        assert!(result.is_valid);
        assert_eq!(result.next_state, None);
        assert!(result
            .error
            .as_deref()
            .unwrap()
            .starts_with("Signal \"FLUB\" not defined"));
    }

    #[test]
    fn test_all_signals_reported_with_last_governing() {
        let result = parse_signal(
            "<signal>FOO</signal> then <signal>BAR</signal>",
            &protocol(),
            &"implement".into(),
        );
        assert_eq!(result.signal.as_deref(), Some("BAR"));
        assert_eq!(result.all_signals, vec!["FOO", "BAR"]);
    }

    #[test]
    fn test_trailing_blank_marker_does_not_advance() {
        let result = parse_signal(
            "<signal>COMPLETE</signal> then <signal> </signal>",
            &protocol(),
            &"implement".into(),
        );
        assert_eq!(result.signal.as_deref(), Some(""));
        assert!(result.is_valid);
        assert_eq!(result.next_state, None);
        assert_eq!(
            result.error.as_deref(),
            Some("Signal \"\" not defined in protocol for phase implement")
        );
    }

    #[test]
    fn test_json_shape() {
        let result = parse_signal("<signal>COMPLETE</signal>", &protocol(), &"implement".into());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["signal"], "COMPLETE");
        assert_eq!(json["is_valid"], true);
        assert_eq!(json["next_state"], "review");
        assert!(json.get("error").is_none());
    }
}
