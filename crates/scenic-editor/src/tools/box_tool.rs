use super::{Gesture, ToolCore, ToolEnv, ToolKind, ToolTable, delegate_tool, drop_parent};
use crate::commands::Command;
use crate::error::Result;
use crate::input::{ToolEventKind, ToolInput};
use kurbo::Rect;
use scenic_core::{Field, FieldValue, ObjectId, ObjectKind, ObjectTree, Placement, Point, SceneObject, Size};
use scenic_fsm::Blockable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxState {
    Idle,
    PointerDown,
    Drawing,
    Blocked,
}

impl Blockable for BoxState {
    const BLOCKED: Self = BoxState::Blocked;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum BoxEvent {
    Press,
    Release,
    DragStart,
    DragMove,
    DragEnd,
}

struct BoxCore {
    env: ToolEnv,
    origin: Point,
    parent: ObjectId,
    drawing: Option<ObjectId>,
}

impl ToolCore for BoxCore {
    fn env(&self) -> &ToolEnv {
        &self.env
    }
}

/// Click to drop a default-size canvas, drag to draw one.
pub struct BoxTool {
    gesture: Gesture<BoxState, BoxEvent, BoxCore>,
}

impl BoxTool {
    pub fn new(env: ToolEnv) -> Self {
        use BoxEvent::*;
        use BoxState::*;

        let table = ToolTable::new(Idle)
            .on_with(Idle, Press, PointerDown, press)
            .on_with(PointerDown, Release, Idle, place)
            .on_with(PointerDown, DragStart, Drawing, begin_drawing)
            .on_with(Drawing, DragMove, Drawing, resize)
            .on_with(Drawing, DragEnd, Idle, finish);

        let core = BoxCore {
            env,
            origin: Point::ZERO,
            parent: ObjectId::root(),
            drawing: None,
        };
        Self {
            gesture: Gesture::new(table, [Drawing], core),
        }
    }

    pub fn state(&self) -> BoxState {
        self.gesture.state()
    }

    fn event_for(&self, input: &ToolInput) -> Option<BoxEvent> {
        match input.kind {
            ToolEventKind::Pointer1Down => Some(BoxEvent::Press),
            ToolEventKind::Pointer1Up => Some(BoxEvent::Release),
            ToolEventKind::Pointer1DragStart => Some(BoxEvent::DragStart),
            ToolEventKind::Pointer1DragMove => Some(BoxEvent::DragMove),
            ToolEventKind::Pointer1DragEnd => Some(BoxEvent::DragEnd),
            _ => None,
        }
    }
}

delegate_tool!(BoxTool, ToolKind::Box);

fn canvas_at(position: Point, size: Size) -> ObjectTree {
    ObjectTree::leaf(SceneObject::fresh(ObjectKind::Canvas { size }).at(position))
}

fn press(core: &mut BoxCore, input: &ToolInput) -> Result<()> {
    core.origin = input.position().unwrap_or(Point::ZERO);
    core.parent = core.env.read(|scene| drop_parent(scene, input.target()));
    Ok(())
}

fn place(core: &mut BoxCore, _: &ToolInput) -> Result<()> {
    let (w, h) = core.env.config.default_box_size;
    let tree = canvas_at(core.origin, Size::new(w, h));
    core.env
        .dispatch(Command::create(core.parent, tree, Placement::Last).named("place-box"))
}

fn begin_drawing(core: &mut BoxCore, _: &ToolInput) -> Result<()> {
    let tree = canvas_at(core.origin, Size::ZERO);
    core.drawing = Some(tree.id());
    core.env
        .dispatch(Command::create(core.parent, tree, Placement::Last).named("draw-box"))
}

fn resize(core: &mut BoxCore, input: &ToolInput) -> Result<()> {
    let (Some(id), Some(position)) = (core.drawing, input.position()) else {
        return Ok(());
    };
    // Dragging up or left moves the origin, so position and size travel
    // together in one streamed command.
    let rect = Rect::from_points(core.origin, position);
    let command = Command::multi(vec![
        Command::move_to(id, rect.origin()),
        Command::set_field(id, Field::Size, FieldValue::Size(rect.size())),
    ]);
    core.env
        .dispatch(command.named("resize-box").streaming())
}

fn finish(core: &mut BoxCore, _: &ToolInput) -> Result<()> {
    core.env.commit();
    core.drawing = None;
    Ok(())
}
