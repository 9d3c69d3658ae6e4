//! Viewport pan machine.
//!
//! Space + primary drag, or an auxiliary-button drag, pans the camera. The
//! machine is exclusive while panning is armed or in progress; its hooks
//! queue [`FocusSignal`]s that the editor drains to park and release the
//! active tool. Tools in turn [`suspend`](ViewportStore::suspend) the
//! viewport while they own a gesture.

use crate::cursor::{Cursor, CursorIcon, CursorStack};
use crate::error::{EditorError, Result};
use crate::input::{ToolEventKind, ToolInput};
use scenic_core::{Point, Vec2};
use scenic_fsm::{Blockable, ExclusiveMachine, StateMachine};
use std::cell::RefCell;
use std::rc::Rc;

const CURSOR_OWNER: &str = "viewport";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanState {
    Default,
    CanPan,
    Panning,
    PanningWithoutSpace,
    Blocked,
}

impl Blockable for PanState {
    const BLOCKED: Self = PanState::Blocked;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanEvent {
    SpaceDown,
    SpaceUp,
    PrimaryDown,
    Move,
    PrimaryUp,
    AuxiliaryDown,
    AuxiliaryUp,
}

impl PanEvent {
    pub fn from_input(input: &ToolInput) -> Option<Self> {
        let space = input.key_name() == Some(" ");
        match input.kind {
            ToolEventKind::KeyDown if space => Some(PanEvent::SpaceDown),
            ToolEventKind::KeyUp if space => Some(PanEvent::SpaceUp),
            ToolEventKind::Pointer1Down => Some(PanEvent::PrimaryDown),
            ToolEventKind::Pointer1Move => Some(PanEvent::Move),
            ToolEventKind::Pointer1Up => Some(PanEvent::PrimaryUp),
            ToolEventKind::Pointer3Down => Some(PanEvent::AuxiliaryDown),
            ToolEventKind::Pointer3Up => Some(PanEvent::AuxiliaryUp),
            _ => None,
        }
    }
}

/// Tells the editor whether the viewport took or gave back input focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusSignal {
    Acquire,
    Release,
}

/// Machine context: camera and pointer tracking.
pub struct PanCore {
    offset: Vec2,
    last_screen: Option<Point>,
    cursors: Rc<RefCell<CursorStack>>,
    signals: Vec<FocusSignal>,
}

type PanTable = StateMachine<PanState, PanEvent, PanCore, ToolInput, EditorError>;
type PanMachine = ExclusiveMachine<PanState, PanEvent, PanCore, ToolInput, EditorError>;

pub struct ViewportStore {
    machine: PanMachine,
    core: PanCore,
    suspensions: usize,
}

impl ViewportStore {
    pub fn new(cursors: Rc<RefCell<CursorStack>>) -> Self {
        use PanEvent::*;
        use PanState::*;

        let table = PanTable::new(Default)
            .on_with(Default, SpaceDown, CanPan, arm)
            .on_with(CanPan, SpaceUp, Default, disarm)
            .on_with(CanPan, PrimaryDown, Panning, grab)
            .on_with(Panning, Move, Panning, pan)
            .on_with(Panning, PrimaryUp, CanPan, release)
            .on(Panning, SpaceUp, PanningWithoutSpace)
            .on_with(PanningWithoutSpace, Move, PanningWithoutSpace, pan)
            .on_with(PanningWithoutSpace, PrimaryUp, Default, clear)
            .on_with(Default, AuxiliaryDown, PanningWithoutSpace, grab)
            .on_with(PanningWithoutSpace, AuxiliaryUp, Default, clear);

        Self {
            machine: ExclusiveMachine::new(table, [CanPan, Panning, PanningWithoutSpace])
                .with_hooks(acquire, release_focus),
            core: PanCore {
                offset: Vec2::ZERO,
                last_screen: None,
                cursors,
                signals: Vec::new(),
            },
            suspensions: 0,
        }
    }

    /// Feed a normalized event. Events with no entry for the current state
    /// are ignored.
    pub fn handle(&mut self, input: &ToolInput) -> Result<()> {
        let Some(event) = PanEvent::from_input(input) else {
            return Ok(());
        };
        if !self.machine.can(event) {
            log::trace!("viewport ignores {event:?} in {:?}", self.machine.state());
            return Ok(());
        }
        self.machine.dispatch(event, &mut self.core, input)?;
        Ok(())
    }

    /// Park the machine while a tool owns a gesture.
    pub fn suspend(&mut self) -> Result<()> {
        if self.machine.is_blocked() {
            return Ok(());
        }
        let queued = self.core.signals.len();
        self.machine.block(&mut self.core)?;
        // The tool asking is the one holding focus; nothing to hand back.
        self.core.signals.truncate(queued);
        self.core.cursors.borrow_mut().clear(CURSOR_OWNER);
        self.core.last_screen = None;
        self.suspensions += 1;
        log::debug!("viewport suspended ({})", self.suspensions);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if !self.machine.is_blocked() {
            return Ok(());
        }
        self.machine.unblock(&mut self.core)?;
        log::debug!("viewport resumed");
        Ok(())
    }

    pub fn is_suspended(&self) -> bool {
        self.machine.is_blocked()
    }

    /// How many times the viewport has been suspended.
    pub fn suspensions(&self) -> usize {
        self.suspensions
    }

    pub fn state(&self) -> PanState {
        self.machine.state()
    }

    pub fn is_exclusive(&self) -> bool {
        self.machine.in_exclusive()
    }

    pub fn offset(&self) -> Vec2 {
        self.core.offset
    }

    pub fn drain_signals(&mut self) -> Vec<FocusSignal> {
        std::mem::take(&mut self.core.signals)
    }
}

// ─── Transition callbacks ────────────────────────────────────────────────

type Outcome = Result<()>;

fn push_cursor(core: &PanCore, icon: CursorIcon) {
    core.cursors
        .borrow_mut()
        .push(Cursor::new(CURSOR_OWNER, icon));
}

fn arm(core: &mut PanCore, _: &ToolInput) -> Outcome {
    push_cursor(core, CursorIcon::Grab);
    Ok(())
}

fn disarm(core: &mut PanCore, _: &ToolInput) -> Outcome {
    core.cursors.borrow_mut().pop_owned(CURSOR_OWNER);
    Ok(())
}

fn grab(core: &mut PanCore, input: &ToolInput) -> Outcome {
    push_cursor(core, CursorIcon::Grabbing);
    core.last_screen = input.screen_position();
    Ok(())
}

fn pan(core: &mut PanCore, input: &ToolInput) -> Outcome {
    let Some(screen) = input.screen_position() else {
        return Ok(());
    };
    if let Some(last) = core.last_screen {
        core.offset += screen - last;
    }
    core.last_screen = Some(screen);
    Ok(())
}

fn release(core: &mut PanCore, _: &ToolInput) -> Outcome {
    core.cursors.borrow_mut().pop_owned(CURSOR_OWNER);
    core.last_screen = None;
    Ok(())
}

fn clear(core: &mut PanCore, _: &ToolInput) -> Outcome {
    core.cursors.borrow_mut().clear(CURSOR_OWNER);
    core.last_screen = None;
    Ok(())
}

fn acquire(core: &mut PanCore) -> Outcome {
    core.signals.push(FocusSignal::Acquire);
    Ok(())
}

fn release_focus(core: &mut PanCore) -> Outcome {
    core.signals.push(FocusSignal::Release);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn viewport() -> (ViewportStore, Rc<RefCell<CursorStack>>) {
        let cursors = Rc::new(RefCell::new(CursorStack::new()));
        (ViewportStore::new(cursors.clone()), cursors)
    }

    fn key(kind: ToolEventKind) -> ToolInput {
        ToolInput::key(kind, " ")
    }

    fn at(kind: ToolEventKind, x: f64, y: f64) -> ToolInput {
        ToolInput::pointer(kind, Point::new(x, y))
    }

    #[test]
    fn space_drag_pans() {
        let (mut vp, cursors) = viewport();
        vp.handle(&key(ToolEventKind::KeyDown)).unwrap();
        assert_eq!(vp.state(), PanState::CanPan);
        assert_eq!(cursors.borrow().current(), CursorIcon::Grab);
        assert_eq!(vp.drain_signals(), vec![FocusSignal::Acquire]);

        vp.handle(&at(ToolEventKind::Pointer1Down, 10.0, 10.0)).unwrap();
        assert_eq!(cursors.borrow().current(), CursorIcon::Grabbing);
        vp.handle(&at(ToolEventKind::Pointer1Move, 15.0, 12.0)).unwrap();
        vp.handle(&at(ToolEventKind::Pointer1Move, 20.0, 20.0)).unwrap();
        assert_eq!(vp.offset(), Vec2::new(10.0, 10.0));

        vp.handle(&at(ToolEventKind::Pointer1Up, 20.0, 20.0)).unwrap();
        assert_eq!(vp.state(), PanState::CanPan);
        assert_eq!(cursors.borrow().current(), CursorIcon::Grab);
        assert!(vp.drain_signals().is_empty());

        vp.handle(&key(ToolEventKind::KeyUp)).unwrap();
        assert_eq!(vp.state(), PanState::Default);
        assert!(cursors.borrow().is_empty());
        assert_eq!(vp.drain_signals(), vec![FocusSignal::Release]);
    }

    #[test]
    fn releasing_space_mid_pan_keeps_panning() {
        let (mut vp, cursors) = viewport();
        vp.handle(&key(ToolEventKind::KeyDown)).unwrap();
        vp.handle(&at(ToolEventKind::Pointer1Down, 0.0, 0.0)).unwrap();
        vp.handle(&key(ToolEventKind::KeyUp)).unwrap();
        assert_eq!(vp.state(), PanState::PanningWithoutSpace);
        vp.handle(&at(ToolEventKind::Pointer1Move, -4.0, 0.0)).unwrap();
        assert_eq!(vp.offset(), Vec2::new(-4.0, 0.0));
        vp.handle(&at(ToolEventKind::Pointer1Up, -4.0, 0.0)).unwrap();
        assert_eq!(vp.state(), PanState::Default);
        assert!(cursors.borrow().is_empty());
        assert_eq!(
            vp.drain_signals(),
            vec![FocusSignal::Acquire, FocusSignal::Release]
        );
    }

    #[test]
    fn auxiliary_drag_pans_without_space() {
        let (mut vp, _) = viewport();
        vp.handle(&at(ToolEventKind::Pointer3Down, 0.0, 0.0)).unwrap();
        assert_eq!(vp.state(), PanState::PanningWithoutSpace);
        vp.handle(&at(ToolEventKind::Pointer1Move, 3.0, 4.0)).unwrap();
        vp.handle(&at(ToolEventKind::Pointer3Up, 3.0, 4.0)).unwrap();
        assert_eq!(vp.state(), PanState::Default);
        assert_eq!(vp.offset(), Vec2::new(3.0, 4.0));
    }

    #[test]
    fn plain_pointer_events_are_ignored() {
        let (mut vp, _) = viewport();
        vp.handle(&at(ToolEventKind::Pointer1Down, 0.0, 0.0)).unwrap();
        vp.handle(&at(ToolEventKind::Pointer1Move, 9.0, 9.0)).unwrap();
        assert_eq!(vp.state(), PanState::Default);
        assert_eq!(vp.offset(), Vec2::ZERO);
        assert!(vp.drain_signals().is_empty());
    }

    #[test]
    fn suspended_viewport_is_inert() {
        let (mut vp, _) = viewport();
        vp.suspend().unwrap();
        vp.suspend().unwrap();
        assert_eq!(vp.suspensions(), 1);
        vp.handle(&key(ToolEventKind::KeyDown)).unwrap();
        assert_eq!(vp.state(), PanState::Blocked);

        vp.resume().unwrap();
        assert_eq!(vp.state(), PanState::Default);
        assert!(!vp.is_suspended());
        assert!(vp.drain_signals().is_empty());
    }
}
