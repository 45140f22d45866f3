//! Hub envelopes and payloads

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::HqConfig;
use crate::workflow::{TransitionRecord, WorkflowRun};
use crate::Result;

/// Message `type` values
pub mod kind {
    // Local -> HQ
    pub const REGISTER: &str = "register";
    pub const STATUS_UPDATE: &str = "status_update";
    pub const BUILDER_UPDATE: &str = "builder_update";
    pub const GATE_COMPLETED: &str = "gate_completed";

    // HQ -> Local
    pub const APPROVAL: &str = "approval";
    pub const COMMAND: &str = "command";

    // Heartbeat
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
}

/// Envelope for every hub message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    /// Milliseconds since the Unix epoch
    pub ts: i64,
    pub payload: Map<String, Value>,
}

impl Message {
    /// Wrap a payload in a fresh envelope. The payload must serialize to a
    /// JSON object.
    pub fn new<P: Serialize>(kind: &str, payload: &P) -> Result<Self> {
        let payload = match serde_json::to_value(payload)? {
            Value::Object(map) => map,
            other => {
                return Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                    "payload for {} must be a JSON object, got {}",
                    kind, other
                ))
                .into())
            }
        };

        Ok(Self {
            kind: kind.to_string(),
            id: Uuid::new_v4().to_string(),
            ts: Utc::now().timestamp_millis(),
            payload,
        })
    }

    /// Decode the payload into a typed struct
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.payload.clone()))?)
    }

    /// Heartbeat ping
    pub fn ping() -> Self {
        let ts = Utc::now().timestamp_millis();
        let mut payload = Map::new();
        payload.insert("ts".to_string(), Value::from(ts));
        Self {
            kind: kind::PING.to_string(),
            id: Uuid::new_v4().to_string(),
            ts,
            payload,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Reply to a message, echoing its id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub ts: i64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
}

impl Response {
    /// Successful reply to `request`
    pub fn ok(request: &Message, payload: Option<Map<String, Value>>) -> Self {
        Self {
            kind: request.kind.clone(),
            id: request.id.clone(),
            ts: Utc::now().timestamp_millis(),
            success: true,
            error: None,
            payload,
        }
    }

    /// Failed reply to `request`
    pub fn failure(request: &Message, error: impl Into<String>) -> Self {
        Self {
            kind: request.kind.clone(),
            id: request.id.clone(),
            ts: Utc::now().timestamp_millis(),
            success: false,
            error: Some(error.into()),
            payload: None,
        }
    }
}

/// Project info sent during registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub path: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_remote: Option<String>,
}

impl ProjectInfo {
    /// Project named after the last component of its path
    pub fn from_path(path: &str) -> Self {
        let name = std::path::Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        Self {
            path: path.to_string(),
            name,
            git_remote: None,
        }
    }
}

/// Status file content from a local instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFile {
    pub path: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
}

/// Builder lifecycle as reported to the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuilderStatus {
    Spawning,
    Implementing,
    Blocked,
    PrReady,
    Complete,
}

impl std::fmt::Display for BuilderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BuilderStatus::Spawning => "spawning",
            BuilderStatus::Implementing => "implementing",
            BuilderStatus::Blocked => "blocked",
            BuilderStatus::PrReady => "pr-ready",
            BuilderStatus::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Builder state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderInfo {
    pub builder_id: String,
    pub status: BuilderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

// Message payloads: Local -> HQ

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPayload {
    pub instance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub projects: Vec<ProjectInfo>,
}

impl RegisterPayload {
    /// Registration for this instance under a fresh id
    pub fn new(hq: &HqConfig, projects: Vec<ProjectInfo>) -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            instance_name: hq.instance_name.clone(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            projects,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdatePayload {
    pub project_path: String,
    pub status_file: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderUpdatePayload {
    pub project_path: String,
    pub builder_id: String,
    pub status: BuilderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl BuilderUpdatePayload {
    /// Snapshot of a run's builder for the hub
    pub fn from_run(run: &WorkflowRun) -> Self {
        Self {
            project_path: run.project_path.clone(),
            builder_id: run.builder_id.clone(),
            status: run.builder_status(),
            phase: Some(run.state.to_string()),
            branch: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateCompletedPayload {
    pub project_path: String,
    pub project_id: String,
    pub gate: String,
    pub completed_by: String,
    pub completed_at: String,
}

impl GateCompletedPayload {
    /// A transition leaving a phase completes that phase's gate
    pub fn from_transition(
        run: &WorkflowRun,
        project_id: &str,
        transition: &TransitionRecord,
    ) -> Option<Self> {
        if transition.from.phase == transition.to.phase {
            return None;
        }
        Some(Self {
            project_path: run.project_path.clone(),
            project_id: project_id.to_string(),
            gate: transition.from.phase.clone(),
            completed_by: run.builder_id.clone(),
            completed_at: rfc3339(transition.at),
        })
    }
}

// Message payloads: HQ -> Local

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPayload {
    pub project_path: String,
    pub project_id: String,
    pub gate: String,
    pub approved_by: String,
    pub approved_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    SpawnBuilder,
    SendMessage,
    RunConsultation,
    SyncStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    pub project_path: String,
    pub command: CommandKind,
    #[serde(default)]
    pub args: Map<String, Value>,
}

// Ping/Pong for heartbeat

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingPayload {
    pub ts: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongPayload {
    pub ts: i64,
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}
