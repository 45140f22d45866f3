//! Workflow runs
//!
//! Thin glue over the signal engine: one [`WorkflowRun`] per builder,
//! advanced one agent turn at a time and persisted between turns.
//!
//! ```bash
//! porch run start --protocol tick --builder b-42
//! porch run turn <run-id> --file agent-output.txt
//! porch run status <run-id>
//! ```

pub mod run;
pub mod store;

pub use run::{RunStatus, TransitionRecord, TurnOutcome, WorkflowRun};
pub use store::StateStore;
