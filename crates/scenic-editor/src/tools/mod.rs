//! Interactive tools.
//!
//! Each tool owns an exclusive state machine over its own state and event
//! enums. Normalized [`ToolInput`]s are refined into tool events, checked
//! with `can()` and dispatched; transition callbacks build commands and
//! send them to the scene store. While a tool is inside its exclusive set
//! (mid-drag, mid-typing) the viewport is suspended.
//!
//! | Tool    | Exclusive states | Gesture result                          |
//! |---------|------------------|-----------------------------------------|
//! | Select  | Moving           | select / move / delete                  |
//! | Box     | Drawing          | canvas, sized by a streamed set-field   |
//! | Ellipse | Drawing          | four-node vector                        |
//! | Pen     | Dragging         | vector grown node by node               |
//! | Text    | Editing          | text object, content streamed per key   |

mod box_tool;
mod ellipse;
mod pen;
mod select;
mod text;

pub use box_tool::{BoxState, BoxTool};
pub use ellipse::{EllipseState, EllipseTool};
pub use pen::{PenState, PenTool};
pub use select::{SelectState, SelectTool};
pub use text::{TextState, TextTool};

use crate::commands::Command;
use crate::config::EditorConfig;
use crate::cursor::{CursorIcon, CursorStack};
use crate::error::{EditorError, Result};
use crate::input::ToolInput;
use crate::scene::Scene;
use crate::store::SceneStore;
use crate::viewport::ViewportStore;
use scenic_core::{ObjectId, ObjectKind};
use scenic_fsm::{Blockable, ExclusiveMachine, StateMachine};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

/// The active tool determines how input events are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Select,
    Box,
    Ellipse,
    Pen,
    Text,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Select,
        ToolKind::Box,
        ToolKind::Ellipse,
        ToolKind::Pen,
        ToolKind::Text,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::Box => "box",
            ToolKind::Ellipse => "ellipse",
            ToolKind::Pen => "pen",
            ToolKind::Text => "text",
        }
    }

    /// Cursor shown while the tool is active.
    pub fn cursor(&self) -> CursorIcon {
        match self {
            ToolKind::Select => CursorIcon::Default,
            ToolKind::Box | ToolKind::Ellipse | ToolKind::Pen => CursorIcon::Crosshair,
            ToolKind::Text => CursorIcon::Text,
        }
    }
}

/// Trait for tools that turn input into scene commands.
pub trait Tool {
    fn kind(&self) -> ToolKind;

    /// Feed a normalized event. Events the current state has no entry for
    /// are ignored.
    fn handle(&mut self, input: &ToolInput) -> Result<()>;

    /// Park the tool. Releases the viewport if the tool held it.
    fn block(&mut self) -> Result<()>;

    /// Return to the idle state.
    fn unblock(&mut self) -> Result<()>;

    fn state_name(&self) -> String;

    fn is_exclusive(&self) -> bool;

    fn is_blocked(&self) -> bool;
}

// ─── Shared handles ──────────────────────────────────────────────────────

/// Handles every tool is constructed with.
#[derive(Clone)]
pub struct ToolEnv {
    pub scene: Rc<RefCell<SceneStore>>,
    pub viewport: Rc<RefCell<ViewportStore>>,
    pub cursors: Rc<RefCell<CursorStack>>,
    pub config: Rc<EditorConfig>,
}

impl ToolEnv {
    pub fn new(config: EditorConfig) -> Self {
        let cursors = Rc::new(RefCell::new(CursorStack::new()));
        Self {
            scene: Rc::new(RefCell::new(SceneStore::new(config.history_limit))),
            viewport: Rc::new(RefCell::new(ViewportStore::new(cursors.clone()))),
            cursors,
            config: Rc::new(config),
        }
    }

    pub fn dispatch(&self, command: Command) -> Result<()> {
        self.scene.borrow_mut().do_command(command)
    }

    pub fn commit(&self) -> bool {
        self.scene.borrow_mut().commit_pending()
    }

    pub fn cancel(&self) -> Result<bool> {
        self.scene.borrow_mut().cancel_pending()
    }

    /// Run `f` against the current scene.
    pub fn read<T>(&self, f: impl FnOnce(&Scene) -> T) -> T {
        f(self.scene.borrow().scene())
    }
}

/// Tool machine context.
pub(crate) trait ToolCore {
    fn env(&self) -> &ToolEnv;
}

fn suspend_viewport<C: ToolCore>(core: &mut C) -> Result<()> {
    core.env().viewport.borrow_mut().suspend()
}

fn resume_viewport<C: ToolCore>(core: &mut C) -> Result<()> {
    core.env().viewport.borrow_mut().resume()
}

/// Where new objects go: into an unlocked canvas under the pointer, or the
/// root.
pub(crate) fn drop_parent(scene: &Scene, target: Option<ObjectId>) -> ObjectId {
    let registry = scene.registry();
    target
        .filter(|id| {
            registry
                .get(*id)
                .is_some_and(|o| matches!(o.kind, ObjectKind::Canvas { .. }))
                && !registry.is_locked(*id)
        })
        .unwrap_or_else(|| registry.root())
}

// ─── Gesture driver ──────────────────────────────────────────────────────

/// Transition table of a tool machine.
pub(crate) type ToolTable<S, Ev, C> = StateMachine<S, Ev, C, ToolInput, EditorError>;

/// An exclusive machine plus its context, wired to suspend the viewport
/// while exclusive.
pub(crate) struct Gesture<S, Ev, C> {
    machine: ExclusiveMachine<S, Ev, C, ToolInput, EditorError>,
    core: C,
}

impl<S, Ev, C> Gesture<S, Ev, C>
where
    S: Blockable + Eq + Hash + Debug,
    Ev: Copy + Eq + Hash + Debug,
    C: ToolCore,
{
    pub(crate) fn new(
        table: ToolTable<S, Ev, C>,
        exclusive: impl IntoIterator<Item = S>,
        core: C,
    ) -> Self {
        Self {
            machine: ExclusiveMachine::new(table, exclusive)
                .with_hooks(suspend_viewport::<C>, resume_viewport::<C>),
            core,
        }
    }

    pub(crate) fn drive(&mut self, event: Option<Ev>, input: &ToolInput) -> Result<()> {
        let Some(event) = event else {
            return Ok(());
        };
        if !self.machine.can(event) {
            log::trace!("{event:?} ignored in {:?}", self.machine.state());
            return Ok(());
        }
        self.machine.dispatch(event, &mut self.core, input)?;
        Ok(())
    }

    pub(crate) fn core(&self) -> &C {
        &self.core
    }

    pub(crate) fn state(&self) -> S {
        self.machine.state()
    }

    pub(crate) fn block(&mut self) -> Result<()> {
        self.machine.block(&mut self.core)
    }

    pub(crate) fn unblock(&mut self) -> Result<()> {
        self.machine.unblock(&mut self.core)
    }

    pub(crate) fn is_exclusive(&self) -> bool {
        self.machine.in_exclusive()
    }

    pub(crate) fn is_blocked(&self) -> bool {
        self.machine.is_blocked()
    }
}

/// Build every tool against the same handles.
pub fn build_tools(env: &ToolEnv) -> Vec<Box<dyn Tool>> {
    ToolKind::ALL
        .into_iter()
        .map(|kind| -> Box<dyn Tool> {
            match kind {
                ToolKind::Select => Box::new(SelectTool::new(env.clone())),
                ToolKind::Box => Box::new(BoxTool::new(env.clone())),
                ToolKind::Ellipse => Box::new(EllipseTool::new(env.clone())),
                ToolKind::Pen => Box::new(PenTool::new(env.clone())),
                ToolKind::Text => Box::new(TextTool::new(env.clone())),
            }
        })
        .collect()
}

/// Implements [`Tool`] for a struct holding a `gesture` field.
macro_rules! delegate_tool {
    ($tool:ty, $kind:expr) => {
        impl $crate::tools::Tool for $tool {
            fn kind(&self) -> $crate::tools::ToolKind {
                $kind
            }

            fn handle(&mut self, input: &$crate::input::ToolInput) -> $crate::error::Result<()> {
                let event = self.event_for(input);
                self.gesture.drive(event, input)
            }

            fn block(&mut self) -> $crate::error::Result<()> {
                self.gesture.block()
            }

            fn unblock(&mut self) -> $crate::error::Result<()> {
                self.gesture.unblock()
            }

            fn state_name(&self) -> String {
                format!("{:?}", self.gesture.state())
            }

            fn is_exclusive(&self) -> bool {
                self.gesture.is_exclusive()
            }

            fn is_blocked(&self) -> bool {
                self.gesture.is_blocked()
            }
        }
    };
}
pub(crate) use delegate_tool;

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::input::ToolEventKind;
    use scenic_core::{ObjectTree, Placement, Point, SceneObject, Size};

    pub fn env() -> ToolEnv {
        ToolEnv::new(EditorConfig::default())
    }

    pub fn press(x: f64, y: f64) -> ToolInput {
        ToolInput::pointer(ToolEventKind::Pointer1Down, Point::new(x, y))
    }

    pub fn release(x: f64, y: f64) -> ToolInput {
        ToolInput::pointer(ToolEventKind::Pointer1Up, Point::new(x, y))
    }

    pub fn drag(kind: ToolEventKind, from: (f64, f64), to: (f64, f64)) -> ToolInput {
        ToolInput::pointer(kind, Point::new(to.0, to.1)).from_origin(Point::new(from.0, from.1))
    }

    /// Seed an untracked canvas under the root.
    pub fn seed_canvas(env: &ToolEnv, name: &str, at: Point) -> ObjectId {
        let id = ObjectId::intern(name);
        let mut store = env.scene.borrow_mut();
        let root = store.scene().registry().root();
        store.scene_mut().registry_mut().add_object(
            root,
            ObjectTree::leaf(
                SceneObject::new(id, ObjectKind::Canvas {
                    size: Size::new(10.0, 10.0),
                })
                .at(at),
            ),
            Placement::Last,
        );
        id
    }
}
