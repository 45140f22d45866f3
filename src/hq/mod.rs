//! Coordination hub message contract
//!
//! Local agent-runner instances exchange JSON envelopes with a central hub
//! to report builder status, gate completions, and heartbeats. Only the
//! message shapes live here; the transport is somebody else's problem.

pub mod messages;

pub use messages::{
    kind, ApprovalPayload, BuilderInfo, BuilderStatus, BuilderUpdatePayload, CommandKind,
    CommandPayload, GateCompletedPayload, Message, PingPayload, PongPayload, ProjectInfo,
    RegisterPayload, Response, StatusFile, StatusUpdatePayload,
};
