use super::{Gesture, ToolCore, ToolEnv, ToolKind, ToolTable, delegate_tool, drop_parent};
use crate::commands::Command;
use crate::error::Result;
use crate::input::{ToolEventKind, ToolInput};
use scenic_core::{
    Field, FieldValue, ObjectId, ObjectKind, ObjectTree, Placement, Point, SceneObject, Segment, Vertex,
};
use scenic_fsm::Blockable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PenState {
    Idle,
    Placing,
    Dragging,
    Blocked,
}

impl Blockable for PenState {
    const BLOCKED: Self = PenState::Blocked;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PenEvent {
    Press,
    DragStart,
    DragMove,
    DragEnd,
    Finish,
}

struct PenCore {
    env: ToolEnv,
    vector: Option<ObjectId>,
    /// The most recently placed node.
    last: Option<ObjectId>,
}

impl ToolCore for PenCore {
    fn env(&self) -> &ToolEnv {
        &self.env
    }
}

/// Click to place nodes, drag right after a click to reposition the node.
/// Enter, Escape or a double click ends the path.
pub struct PenTool {
    gesture: Gesture<PenState, PenEvent, PenCore>,
}

impl PenTool {
    pub fn new(env: ToolEnv) -> Self {
        use PenEvent::*;
        use PenState::*;

        let table = ToolTable::new(Idle)
            .on_with(Idle, Press, Placing, start_path)
            .on_with(Placing, Press, Placing, add_node)
            .on(Placing, DragStart, Dragging)
            .on_with(Dragging, DragMove, Dragging, drag_node)
            .on_with(Dragging, DragEnd, Placing, settle_node)
            .on_with(Placing, Finish, Idle, finish);

        let core = PenCore {
            env,
            vector: None,
            last: None,
        };
        Self {
            gesture: Gesture::new(table, [Dragging], core),
        }
    }

    pub fn state(&self) -> PenState {
        self.gesture.state()
    }

    /// The vector being drawn, if any.
    pub fn path(&self) -> Option<ObjectId> {
        self.gesture.core().vector
    }

    fn event_for(&self, input: &ToolInput) -> Option<PenEvent> {
        match input.kind {
            ToolEventKind::Pointer1Down => Some(PenEvent::Press),
            ToolEventKind::Pointer1DragStart => Some(PenEvent::DragStart),
            ToolEventKind::Pointer1DragMove => Some(PenEvent::DragMove),
            ToolEventKind::Pointer1DragEnd => Some(PenEvent::DragEnd),
            ToolEventKind::Pointer1DoubleClick => Some(PenEvent::Finish),
            ToolEventKind::KeyDown => match input.key_name()? {
                "Enter" | "Escape" => Some(PenEvent::Finish),
                _ => None,
            },
            _ => None,
        }
    }
}

delegate_tool!(PenTool, ToolKind::Pen);

fn start_path(core: &mut PenCore, input: &ToolInput) -> Result<()> {
    let position = input.position().unwrap_or(Point::ZERO);
    let parent = core.env.read(|scene| drop_parent(scene, input.target()));
    let node = SceneObject::fresh(ObjectKind::Node).at(position);
    let vector = SceneObject::fresh(ObjectKind::Vector {
        segments: Vec::new(),
    });
    core.vector = Some(vector.id);
    core.last = Some(node.id);
    let tree = ObjectTree::with_children(vector, vec![ObjectTree::leaf(node)]);
    core.env
        .dispatch(Command::create(parent, tree, Placement::Last).named("start-path"))
}

fn add_node(core: &mut PenCore, input: &ToolInput) -> Result<()> {
    let position = input.position().unwrap_or(Point::ZERO);
    let (Some(vector), Some(last)) = (core.vector, core.last) else {
        return start_path(core, input);
    };
    let current = core.env.read(|scene| {
        let registry = scene.registry();
        let segments = match registry.get(vector).map(|o| &o.kind) {
            Some(ObjectKind::Vector { segments }) => segments.clone(),
            _ => return None,
        };
        let from = registry.get(last)?.position;
        Some((segments, from))
    });
    // The path was undone out from under us: begin a new one.
    let Some((mut segments, from)) = current else {
        return start_path(core, input);
    };
    // A press on the last node is the second half of a double click, which
    // finishes the path instead.
    if position.distance(from) < core.env.config.drag_threshold {
        log::trace!("press on last node ignored");
        return Ok(());
    }

    let node = SceneObject::fresh(ObjectKind::Node).at(position);
    let edge = SceneObject::fresh(ObjectKind::VectorSegment {
        start: last,
        end: node.id,
    });
    segments.push(Segment::new(
        Vertex {
            node: last,
            position: from,
        },
        Vertex {
            node: node.id,
            position,
        },
    ));
    core.last = Some(node.id);
    let command = Command::multi(vec![
        Command::create(vector, ObjectTree::leaf(node), Placement::Last),
        Command::create(vector, ObjectTree::leaf(edge), Placement::Last),
        Command::set_field(vector, Field::Segments, FieldValue::Segments(segments)),
    ]);
    core.env.dispatch(command.named("add-node"))
}

fn drag_node(core: &mut PenCore, input: &ToolInput) -> Result<()> {
    let (Some(node), Some(position)) = (core.last, input.position()) else {
        return Ok(());
    };
    core.env
        .dispatch(Command::move_to(node, position).named("drag-node").streaming())
}

fn settle_node(core: &mut PenCore, _: &ToolInput) -> Result<()> {
    core.env.commit();
    Ok(())
}

fn finish(core: &mut PenCore, _: &ToolInput) -> Result<()> {
    core.env.commit();
    core.vector = None;
    core.last = None;
    Ok(())
}
