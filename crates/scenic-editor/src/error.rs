//! Editor error type.
//!
//! Every failure here is a programming or protocol error: nothing is
//! retried, the caller's error boundary decides what to do.

use scenic_core::{Field, ObjectId};
use scenic_fsm::FsmError;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// A command was dispatched while the undo-stack top is a non-final
    /// command of another type (a forgotten finalize).
    #[error("previous command not finalized: pending {pending}, incoming {incoming}")]
    ProtocolViolation {
        pending: &'static str,
        incoming: &'static str,
    },

    /// A command referenced an id that is not in the registry.
    #[error("object {0} not found")]
    MissingEntity(ObjectId),

    /// Two commands could not be merged because their targets differ.
    #[error("cannot merge: expected {expected}, found {found}")]
    FieldMismatch { expected: String, found: String },

    #[error("{id} has no field {field}")]
    FieldNotApplicable { id: ObjectId, field: Field },

    /// `update_data` on a command type that does not coalesce.
    #[error("{0} commands cannot be merged")]
    NotUpdatable(&'static str),

    #[error("cannot move {id} under its own descendant {parent}")]
    Cycle { id: ObjectId, parent: ObjectId },

    #[error("object {0} already exists")]
    DuplicateEntity(ObjectId),

    #[error("the root object cannot be {0}")]
    RootImmutable(&'static str),

    #[error("malformed command bag: {0}")]
    InvalidBag(String),

    #[error(transparent)]
    Fsm(#[from] FsmError),

    #[error("history encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("history decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
