/// Errors raised by the state machine engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FsmError {
    /// `dispatch` was called for an event with no table entry in the current
    /// state. Callers are expected to guard with `can()` or `peek()`.
    #[error("no transition for {event} in state {state}")]
    InvalidTransition { state: String, event: String },
}
