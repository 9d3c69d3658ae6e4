use super::{Gesture, ToolCore, ToolEnv, ToolKind, ToolTable, delegate_tool, drop_parent};
use crate::commands::Command;
use crate::error::Result;
use crate::input::{ToolEventKind, ToolInput};
use kurbo::{Rect, Vec2};
use scenic_core::{ObjectId, ObjectKind, ObjectTree, Placement, Point, SceneObject, Segment, Vertex};
use scenic_fsm::Blockable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EllipseState {
    Idle,
    PointerDown,
    Drawing,
    Blocked,
}

impl Blockable for EllipseState {
    const BLOCKED: Self = EllipseState::Blocked;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EllipseEvent {
    Press,
    Release,
    DragStart,
    DragMove,
    DragEnd,
    Escape,
}

struct EllipseCore {
    env: ToolEnv,
    origin: Point,
    parent: ObjectId,
    preview: Option<Rect>,
}

impl ToolCore for EllipseCore {
    fn env(&self) -> &ToolEnv {
        &self.env
    }
}

/// Drag out a bounding box; releasing creates the ellipse as one vector.
pub struct EllipseTool {
    gesture: Gesture<EllipseState, EllipseEvent, EllipseCore>,
}

impl EllipseTool {
    pub fn new(env: ToolEnv) -> Self {
        use EllipseEvent::*;
        use EllipseState::*;

        let table = ToolTable::new(Idle)
            .on_with(Idle, Press, PointerDown, press)
            .on(PointerDown, Release, Idle)
            .on_with(PointerDown, DragStart, Drawing, track)
            .on_with(Drawing, DragMove, Drawing, track)
            .on_with(Drawing, DragEnd, Idle, create)
            .on_with(Drawing, Escape, Idle, discard);

        let core = EllipseCore {
            env,
            origin: Point::ZERO,
            parent: ObjectId::root(),
            preview: None,
        };
        Self {
            gesture: Gesture::new(table, [Drawing], core),
        }
    }

    pub fn state(&self) -> EllipseState {
        self.gesture.state()
    }

    /// Bounding box of the ellipse being drawn.
    pub fn preview(&self) -> Option<Rect> {
        self.gesture.core().preview
    }

    fn event_for(&self, input: &ToolInput) -> Option<EllipseEvent> {
        match input.kind {
            ToolEventKind::Pointer1Down => Some(EllipseEvent::Press),
            ToolEventKind::Pointer1Up => Some(EllipseEvent::Release),
            ToolEventKind::Pointer1DragStart => Some(EllipseEvent::DragStart),
            ToolEventKind::Pointer1DragMove => Some(EllipseEvent::DragMove),
            ToolEventKind::Pointer1DragEnd => Some(EllipseEvent::DragEnd),
            ToolEventKind::KeyDown if input.key_name() == Some("Escape") => Some(EllipseEvent::Escape),
            _ => None,
        }
    }
}

delegate_tool!(EllipseTool, ToolKind::Ellipse);

/// A vector with nodes at the four extremes of the ellipse inscribed in
/// `rect`, joined by four segments.
fn ellipse_tree(rect: Rect) -> ObjectTree {
    let center = rect.center();
    let (rx, ry) = (rect.width() / 2.0, rect.height() / 2.0);
    let points = [
        center + Vec2::new(rx, 0.0),
        center + Vec2::new(0.0, ry),
        center - Vec2::new(rx, 0.0),
        center - Vec2::new(0.0, ry),
    ];
    let nodes: Vec<SceneObject> = points
        .iter()
        .map(|p| SceneObject::fresh(ObjectKind::Node).at(*p))
        .collect();
    let segments = (0..nodes.len())
        .map(|i| {
            let (a, b) = (&nodes[i], &nodes[(i + 1) % nodes.len()]);
            Segment::new(
                Vertex {
                    node: a.id,
                    position: a.position,
                },
                Vertex {
                    node: b.id,
                    position: b.position,
                },
            )
        })
        .collect();
    let vector = SceneObject::fresh(ObjectKind::Vector { segments }).at(rect.origin());
    ObjectTree::with_children(vector, nodes.into_iter().map(ObjectTree::leaf).collect())
}

fn press(core: &mut EllipseCore, input: &ToolInput) -> Result<()> {
    core.origin = input.position().unwrap_or(Point::ZERO);
    core.parent = core.env.read(|scene| drop_parent(scene, input.target()));
    Ok(())
}

fn track(core: &mut EllipseCore, input: &ToolInput) -> Result<()> {
    if let Some(position) = input.position() {
        core.preview = Some(Rect::from_points(core.origin, position));
    }
    Ok(())
}

fn create(core: &mut EllipseCore, input: &ToolInput) -> Result<()> {
    track(core, input)?;
    let Some(rect) = core.preview.take() else {
        return Ok(());
    };
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        log::debug!("degenerate ellipse dropped");
        return Ok(());
    }
    core.env.dispatch(
        Command::create(core.parent, ellipse_tree(rect), Placement::Last).named("draw-ellipse"),
    )
}

fn discard(core: &mut EllipseCore, _: &ToolInput) -> Result<()> {
    core.preview = None;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use crate::tools::testing::*;
    use crate::tools::testing::press;
    use pretty_assertions::assert_eq;

    fn draw(tool: &mut EllipseTool, to: (f64, f64)) {
        tool.handle(&press(0.0, 0.0)).unwrap();
        tool.handle(&drag(ToolEventKind::Pointer1DragStart, (0.0, 0.0), (5.0, 5.0)))
            .unwrap();
        tool.handle(&drag(ToolEventKind::Pointer1DragMove, (0.0, 0.0), to))
            .unwrap();
    }

    #[test]
    fn drag_creates_four_node_vector() {
        let env = env();
        let mut tool = EllipseTool::new(env.clone());
        draw(&mut tool, (40.0, 20.0));
        assert_eq!(tool.preview(), Some(Rect::new(0.0, 0.0, 40.0, 20.0)));
        assert!(!env.scene.borrow().can_undo());

        tool.handle(&drag(ToolEventKind::Pointer1DragEnd, (0.0, 0.0), (40.0, 20.0)))
            .unwrap();
        assert_eq!(tool.state(), EllipseState::Idle);
        assert_eq!(env.scene.borrow().undo_len(), 1);

        env.read(|scene| {
            let registry = scene.registry();
            let vector = registry.children(registry.root())[0];
            assert_eq!(registry.children(vector).len(), 4);
            let Some(ObjectKind::Vector { segments }) = registry.get(vector).map(|o| &o.kind) else {
                panic!("expected a vector");
            };
            assert_eq!(segments.len(), 4);
            assert_eq!(segments[0].start.position, Point::new(40.0, 10.0));
            assert_eq!(segments[0].end.position, Point::new(20.0, 20.0));
            assert_eq!(segments[3].end.node, segments[0].start.node);
            registry.validate().unwrap();
        });
    }

    #[test]
    fn escape_discards_preview() {
        let env = env();
        let mut tool = EllipseTool::new(env.clone());
        draw(&mut tool, (10.0, 10.0));
        tool.handle(&ToolInput::key(ToolEventKind::KeyDown, "Escape"))
            .unwrap();
        assert_eq!(tool.preview(), None);
        assert_eq!(tool.state(), EllipseState::Idle);
        assert!(!env.viewport.borrow().is_suspended());
        assert!(!env.scene.borrow().can_undo());
    }

    #[test]
    fn flat_drag_creates_nothing() {
        let env = env();
        let mut tool = EllipseTool::new(env.clone());
        draw(&mut tool, (30.0, 0.0));
        tool.handle(&drag(ToolEventKind::Pointer1DragEnd, (0.0, 0.0), (30.0, 0.0)))
            .unwrap();
        assert!(!env.scene.borrow().can_undo());
    }
}
