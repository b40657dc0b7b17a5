//! Per-actor workflow state machines.
//!
//! Each actor role walks a closed stage graph with statically declared
//! required fields per stage. Transitions are validated, context-sensitive
//! where a stage branches on its payload, and recorded in a full history
//! that includes rejected attempts.

mod stage;
mod state;

pub use stage::{
    is_packaging_area, revision_stages_for_area, role_sequence, Field, RequestType, Stage,
    GLOBAL_REQUIRED,
};
pub use state::{
    ActorState, CoordinationMeta, RunId, StagePayload, StageUpdates, StateDiagnostic,
    TransitionOutcome, TransitionRecord,
};
