//! Signal names commonly used across protocols
//!
//! Reference only: the authoritative set of signals for a phase is always
//! the protocol definition. Nothing in validation consults this list.

// Specify phase
pub const SPEC_DRAFTED: &str = "SPEC_DRAFTED";
pub const SPEC_READY: &str = "SPEC_READY";
pub const REVISION_COMPLETE: &str = "REVISION_COMPLETE";

// Plan phase
pub const PLAN_DRAFTED: &str = "PLAN_DRAFTED";
pub const PLAN_READY: &str = "PLAN_READY";

// Implement phase
pub const PHASE_IMPLEMENTED: &str = "PHASE_IMPLEMENTED";
pub const IMPLEMENTATION_COMPLETE: &str = "IMPLEMENTATION_COMPLETE";

// Defend phase
pub const TESTS_WRITTEN: &str = "TESTS_WRITTEN";
pub const TESTS_PASSING: &str = "TESTS_PASSING";

// Evaluate phase
pub const EVALUATION_COMPLETE: &str = "EVALUATION_COMPLETE";
pub const PHASE_COMPLETE: &str = "PHASE_COMPLETE";

// Review phase
pub const REVIEW_COMPLETE: &str = "REVIEW_COMPLETE";

// Tick protocol
pub const UNDERSTOOD: &str = "UNDERSTOOD";
pub const IMPLEMENTED: &str = "IMPLEMENTED";
pub const VERIFIED: &str = "VERIFIED";

// Bugfix protocol
pub const DIAGNOSED: &str = "DIAGNOSED";
pub const FIXED: &str = "FIXED";
pub const TESTED: &str = "TESTED";
pub const PR_CREATED: &str = "PR_CREATED";

// General
pub const COMPLETE: &str = "COMPLETE";
/// Typed form carries the reason: `<signal type=BLOCKED>reason</signal>`
pub const BLOCKED: &str = "BLOCKED";
pub const NEEDS_CLARIFICATION: &str = "NEEDS_CLARIFICATION";
/// Typed form carries the question for the human
pub const AWAITING_INPUT: &str = "AWAITING_INPUT";

/// All of the above, for documentation and completion
pub const COMMON_SIGNALS: &[&str] = &[
    SPEC_DRAFTED,
    SPEC_READY,
    REVISION_COMPLETE,
    PLAN_DRAFTED,
    PLAN_READY,
    PHASE_IMPLEMENTED,
    IMPLEMENTATION_COMPLETE,
    TESTS_WRITTEN,
    TESTS_PASSING,
    EVALUATION_COMPLETE,
    PHASE_COMPLETE,
    REVIEW_COMPLETE,
    UNDERSTOOD,
    IMPLEMENTED,
    VERIFIED,
    DIAGNOSED,
    FIXED,
    TESTED,
    PR_CREATED,
    COMPLETE,
    BLOCKED,
    NEEDS_CLARIFICATION,
    AWAITING_INPUT,
];

/// Whether a name is in the common vocabulary
pub fn is_common_signal(name: &str) -> bool {
    COMMON_SIGNALS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_lookup() {
        assert!(is_common_signal("BLOCKED"));
        assert!(!is_common_signal("blocked"));
        assert!(!is_common_signal("FLUB"));
        assert_eq!(COMMON_SIGNALS.len(), 23);
    }
}
