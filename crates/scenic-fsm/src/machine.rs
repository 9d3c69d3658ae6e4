//! Table-driven finite-state machine.
//!
//! A machine is a map from `(state, event)` to a [`Transition`]: the next
//! state plus an optional callback. Callbacks are plain function pointers
//! that receive a caller-owned context and the event arguments, so a table
//! can be built once and stored next to the data it drives.

use crate::error::FsmError;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Callback run after a transition has set the new state.
pub type Callback<Ctx, Args, Err> = fn(&mut Ctx, &Args) -> Result<(), Err>;

/// One table entry.
pub struct Transition<S, Ctx, Args, Err> {
    pub to: S,
    pub callback: Option<Callback<Ctx, Args, Err>>,
}

impl<S: Copy, Ctx, Args, Err> Clone for Transition<S, Ctx, Args, Err> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Copy, Ctx, Args, Err> Copy for Transition<S, Ctx, Args, Err> {}

/// A table-driven state machine.
pub struct StateMachine<S, Ev, Ctx, Args = (), Err = FsmError> {
    initial: S,
    state: S,
    table: HashMap<(S, Ev), Transition<S, Ctx, Args, Err>>,
}

impl<S, Ev, Ctx, Args, Err> StateMachine<S, Ev, Ctx, Args, Err>
where
    S: Copy + Eq + Hash + Debug,
    Ev: Copy + Eq + Hash + Debug,
    Err: From<FsmError>,
{
    /// Create an empty machine sitting in `initial`.
    pub fn new(initial: S) -> Self {
        Self {
            initial,
            state: initial,
            table: HashMap::new(),
        }
    }

    /// Add a transition without a callback.
    #[must_use]
    pub fn on(mut self, from: S, event: Ev, to: S) -> Self {
        self.table.insert((from, event), Transition { to, callback: None });
        self
    }

    /// Add a transition that runs `callback` once the state has changed.
    #[must_use]
    pub fn on_with(mut self, from: S, event: Ev, to: S, callback: Callback<Ctx, Args, Err>) -> Self {
        self.table.insert(
            (from, event),
            Transition {
                to,
                callback: Some(callback),
            },
        );
        self
    }

    pub fn state(&self) -> S {
        self.state
    }

    pub fn initial(&self) -> S {
        self.initial
    }

    /// Is there a table entry for `event` in the current state?
    pub fn can(&self, event: Ev) -> bool {
        self.table.contains_key(&(self.state, event))
    }

    /// The state `event` would lead to, without changing anything.
    pub fn peek(&self, event: Ev) -> Option<S> {
        self.table.get(&(self.state, event)).map(|t| t.to)
    }

    /// Take the transition for `event` and run its callback.
    ///
    /// Fails with [`FsmError::InvalidTransition`] (state untouched) when the
    /// table has no entry. A failing callback is propagated as-is; the state
    /// has already moved by then.
    pub fn dispatch(&mut self, event: Ev, ctx: &mut Ctx, args: &Args) -> Result<S, Err> {
        let Some(transition) = self.table.get(&(self.state, event)).copied() else {
            return Err(FsmError::InvalidTransition {
                state: format!("{:?}", self.state),
                event: format!("{event:?}"),
            }
            .into());
        };
        log::trace!("{:?} --{event:?}--> {:?}", self.state, transition.to);
        self.state = transition.to;
        if let Some(callback) = transition.callback {
            callback(ctx, args)?;
        }
        Ok(transition.to)
    }

    /// Jump to `state` regardless of the table.
    pub fn force(&mut self, state: S) {
        log::trace!("{:?} ==force==> {state:?}", self.state);
        self.state = state;
    }

    /// Every `(from, event, to)` entry, in no particular order.
    pub fn transitions(&self) -> impl Iterator<Item = (S, Ev, S)> + '_ {
        self.table.iter().map(|((from, ev), t)| (*from, *ev, t.to))
    }
}
