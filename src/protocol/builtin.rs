//! Built-in protocol definitions

use super::definition::{Phase, Protocol};
use crate::signal::vocabulary::*;

/// Names of the protocols that ship with porch
pub const BUILTIN_PROTOCOLS: &[&str] = &["standard", "tick", "bugfix"];

/// Look up a built-in protocol by name
pub fn builtin(name: &str) -> Option<Protocol> {
    match name {
        "standard" => Some(standard_protocol()),
        "tick" => Some(tick_protocol()),
        "bugfix" => Some(bugfix_protocol()),
        _ => None,
    }
}

/// Every working phase can block or ask for input without leaving the phase
fn working(id: &str, name: &str) -> Phase {
    let mut phase = Phase::new(id)
        .signal(BLOCKED, format!("{}:blocked", id))
        .signal(AWAITING_INPUT, format!("{}:awaiting_input", id));
    phase.name = Some(name.to_string());
    phase
}

fn terminal() -> Phase {
    let mut phase = Phase::new("complete");
    phase.name = Some("Complete".to_string());
    phase
}

/// Full specify → plan → implement → defend → evaluate → review protocol
pub fn standard_protocol() -> Protocol {
    Protocol {
        name: "standard".to_string(),
        description: Some("Specify, plan, implement, defend, evaluate, review".to_string()),
        phases: vec![
            working("specify", "Specify")
                .signal(SPEC_DRAFTED, "specify:consult")
                .signal(REVISION_COMPLETE, "specify:consult")
                .signal(NEEDS_CLARIFICATION, "specify:awaiting_input")
                .signal(SPEC_READY, "plan"),
            working("plan", "Plan")
                .signal(PLAN_DRAFTED, "plan:consult")
                .signal(REVISION_COMPLETE, "plan:consult")
                .signal(PLAN_READY, "implement"),
            working("implement", "Implement")
                .signal(PHASE_IMPLEMENTED, "defend")
                .signal(IMPLEMENTATION_COMPLETE, "defend"),
            working("defend", "Defend")
                .signal(TESTS_WRITTEN, "defend:verify")
                .signal(TESTS_PASSING, "evaluate"),
            working("evaluate", "Evaluate")
                .signal(EVALUATION_COMPLETE, "evaluate:consult")
                .signal(PHASE_COMPLETE, "implement")
                .signal(IMPLEMENTATION_COMPLETE, "review"),
            working("review", "Review")
                .signal(REVIEW_COMPLETE, "complete")
                .signal(COMPLETE, "complete"),
            terminal(),
        ],
    }
}

/// Quick-fix protocol for small amendments
pub fn tick_protocol() -> Protocol {
    Protocol {
        name: "tick".to_string(),
        description: Some("Understand, implement, verify".to_string()),
        phases: vec![
            working("understand", "Understand").signal(UNDERSTOOD, "implement"),
            working("implement", "Implement").signal(IMPLEMENTED, "verify"),
            working("verify", "Verify")
                .signal(VERIFIED, "complete")
                .signal(COMPLETE, "complete"),
            terminal(),
        ],
    }
}

/// Bug triage protocol ending in a pull request
pub fn bugfix_protocol() -> Protocol {
    Protocol {
        name: "bugfix".to_string(),
        description: Some("Diagnose, fix, test, open a PR".to_string()),
        phases: vec![
            working("diagnose", "Diagnose").signal(DIAGNOSED, "fix"),
            working("fix", "Fix").signal(FIXED, "test"),
            working("test", "Test").signal(TESTED, "pr"),
            working("pr", "Pull Request")
                .signal(PR_CREATED, "complete")
                .signal(COMPLETE, "complete"),
            terminal(),
        ],
    }
}
