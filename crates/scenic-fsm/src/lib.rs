//! Generic finite-state machines for interactive tools.
//!
//! [`StateMachine`] is a plain `(state, event) → (state, callback)` table.
//! [`ExclusiveMachine`] wraps one with a Blocked pseudostate and a set of
//! exclusive states whose entry and exit fire coordination hooks.

pub mod error;
pub mod exclusive;
pub mod machine;

pub use error::FsmError;
pub use exclusive::{Blockable, ExclusiveMachine, Hook};
pub use machine::{Callback, StateMachine, Transition};
