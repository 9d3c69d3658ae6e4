//! Exclusive-state wrapper.
//!
//! Several machines share the same pointer and keyboard stream. While one of
//! them is mid-gesture it must be able to suspend the others. The wrapper
//! tracks whether the current state belongs to a configured exclusive set:
//!
//! - entering the set from outside fires `on_exclusive` (before the
//!   transition callback runs),
//! - leaving the set fires `on_non_exclusive` (after it),
//! - moving between two exclusive states fires nothing.
//!
//! `block()` / `unblock()` park the machine in its `BLOCKED` state, which has
//! no table entries, so every event is inert until it is unblocked.

use crate::error::FsmError;
use crate::machine::StateMachine;
use smallvec::SmallVec;
use std::fmt::Debug;
use std::hash::Hash;

/// State enums usable with [`ExclusiveMachine`] name their parked state.
pub trait Blockable: Copy {
    const BLOCKED: Self;
}

/// Coordination hook fired on exclusivity changes.
pub type Hook<Ctx, Err> = fn(&mut Ctx) -> Result<(), Err>;

pub struct ExclusiveMachine<S, Ev, Ctx, Args = (), Err = FsmError> {
    machine: StateMachine<S, Ev, Ctx, Args, Err>,
    exclusive: SmallVec<[S; 4]>,
    on_exclusive: Option<Hook<Ctx, Err>>,
    on_non_exclusive: Option<Hook<Ctx, Err>>,
}

impl<S, Ev, Ctx, Args, Err> ExclusiveMachine<S, Ev, Ctx, Args, Err>
where
    S: Blockable + Eq + Hash + Debug,
    Ev: Copy + Eq + Hash + Debug,
    Err: From<FsmError>,
{
    pub fn new(
        machine: StateMachine<S, Ev, Ctx, Args, Err>,
        exclusive: impl IntoIterator<Item = S>,
    ) -> Self {
        let exclusive: SmallVec<[S; 4]> = exclusive.into_iter().collect();
        debug_assert!(
            !exclusive.contains(&S::BLOCKED),
            "the blocked state cannot be exclusive"
        );
        Self {
            machine,
            exclusive,
            on_exclusive: None,
            on_non_exclusive: None,
        }
    }

    /// Install the enter/leave hooks.
    #[must_use]
    pub fn with_hooks(mut self, on_exclusive: Hook<Ctx, Err>, on_non_exclusive: Hook<Ctx, Err>) -> Self {
        self.on_exclusive = Some(on_exclusive);
        self.on_non_exclusive = Some(on_non_exclusive);
        self
    }

    pub fn state(&self) -> S {
        self.machine.state()
    }

    pub fn is_blocked(&self) -> bool {
        self.machine.state() == S::BLOCKED
    }

    pub fn is_exclusive_state(&self, state: S) -> bool {
        self.exclusive.contains(&state)
    }

    /// Is the machine currently inside the exclusive set?
    pub fn in_exclusive(&self) -> bool {
        self.is_exclusive_state(self.machine.state())
    }

    pub fn can(&self, event: Ev) -> bool {
        self.machine.can(event)
    }

    pub fn peek(&self, event: Ev) -> Option<S> {
        self.machine.peek(event)
    }

    /// Dispatch through the base machine, firing the exclusivity hooks on
    /// entry into or exit from the exclusive set.
    pub fn dispatch(&mut self, event: Ev, ctx: &mut Ctx, args: &Args) -> Result<S, Err> {
        let Some(next) = self.machine.peek(event) else {
            // Let the base machine report the missing entry.
            return self.machine.dispatch(event, ctx, args);
        };
        let was = self.in_exclusive();
        let will = self.is_exclusive_state(next);

        if !was && will {
            log::trace!("{next:?} acquires exclusivity");
            Self::fire(self.on_exclusive, ctx)?;
        }
        let result = self.machine.dispatch(event, ctx, args);
        if was && !will {
            log::trace!("{next:?} releases exclusivity");
            Self::fire(self.on_non_exclusive, ctx)?;
        }
        result
    }

    /// Park the machine. Releases exclusivity if it was held, so a
    /// deactivated machine never leaves its siblings suspended.
    pub fn block(&mut self, ctx: &mut Ctx) -> Result<(), Err> {
        if self.is_blocked() {
            return Ok(());
        }
        let was = self.in_exclusive();
        self.machine.force(S::BLOCKED);
        if was {
            Self::fire(self.on_non_exclusive, ctx)?;
        }
        Ok(())
    }

    /// Leave the parked state for the initial state.
    pub fn unblock(&mut self, ctx: &mut Ctx) -> Result<(), Err> {
        if !self.is_blocked() {
            return Ok(());
        }
        let initial = self.machine.initial();
        self.machine.force(initial);
        if self.is_exclusive_state(initial) {
            Self::fire(self.on_exclusive, ctx)?;
        }
        Ok(())
    }

    /// Reset to the initial state without touching the hooks.
    pub fn reset(&mut self) {
        let initial = self.machine.initial();
        self.machine.force(initial);
    }

    pub fn machine(&self) -> &StateMachine<S, Ev, Ctx, Args, Err> {
        &self.machine
    }

    fn fire(hook: Option<Hook<Ctx, Err>>, ctx: &mut Ctx) -> Result<(), Err> {
        match hook {
            Some(hook) => hook(ctx),
            None => Ok(()),
        }
    }
}
