use super::{Gesture, ToolCore, ToolEnv, ToolKind, ToolTable, delegate_tool};
use crate::commands::Command;
use crate::error::Result;
use crate::input::{ToolEventKind, ToolInput};
use scenic_core::{ObjectId, Point};
use scenic_fsm::Blockable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectState {
    Idle,
    PointerDownOnElement,
    PointerDownOnCanvas,
    Moving,
    Blocked,
}

impl Blockable for SelectState {
    const BLOCKED: Self = SelectState::Blocked;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SelectEvent {
    PressElement,
    PressCanvas,
    Hover,
    Release,
    DragStart,
    DragMove,
    DragEnd,
    Escape,
    Delete,
}

struct SelectCore {
    env: ToolEnv,
    /// Drag origin in scene coordinates.
    origin: Point,
    /// Objects being moved with their positions at drag start.
    moving: Vec<(ObjectId, Point)>,
}

impl ToolCore for SelectCore {
    fn env(&self) -> &ToolEnv {
        &self.env
    }
}

/// Click to select, shift-click to toggle, drag to move the selection.
pub struct SelectTool {
    gesture: Gesture<SelectState, SelectEvent, SelectCore>,
}

impl SelectTool {
    pub fn new(env: ToolEnv) -> Self {
        use SelectEvent::*;
        use SelectState::*;

        let table = ToolTable::new(Idle)
            .on_with(Idle, PressElement, PointerDownOnElement, press_element)
            .on_with(Idle, PressCanvas, PointerDownOnCanvas, press_canvas)
            .on_with(Idle, Hover, Idle, hover)
            .on_with(Idle, Escape, Idle, clear_selection)
            .on_with(Idle, Delete, Idle, delete_selection)
            .on(PointerDownOnElement, Release, Idle)
            .on_with(PointerDownOnElement, DragStart, Moving, begin_move)
            .on(PointerDownOnCanvas, Release, Idle)
            .on_with(Moving, DragMove, Moving, move_selection)
            .on_with(Moving, DragEnd, Idle, finish_move)
            .on_with(Moving, Escape, Idle, cancel_move);

        let core = SelectCore {
            env,
            origin: Point::ZERO,
            moving: Vec::new(),
        };
        Self {
            gesture: Gesture::new(table, [Moving], core),
        }
    }

    pub fn state(&self) -> SelectState {
        self.gesture.state()
    }

    fn event_for(&self, input: &ToolInput) -> Option<SelectEvent> {
        match input.kind {
            ToolEventKind::Pointer1Down => {
                let env = &self.gesture.core().env;
                let on_element = input.target().is_some_and(|id| {
                    env.read(|scene| {
                        let registry = scene.registry();
                        id != registry.root() && registry.contains(id) && !registry.is_locked(id)
                    })
                });
                Some(if on_element {
                    SelectEvent::PressElement
                } else {
                    SelectEvent::PressCanvas
                })
            }
            ToolEventKind::Pointer1Move => Some(SelectEvent::Hover),
            ToolEventKind::Pointer1Up => Some(SelectEvent::Release),
            ToolEventKind::Pointer1DragStart => Some(SelectEvent::DragStart),
            ToolEventKind::Pointer1DragMove => Some(SelectEvent::DragMove),
            ToolEventKind::Pointer1DragEnd => Some(SelectEvent::DragEnd),
            ToolEventKind::KeyDown => match input.key_name()? {
                "Escape" => Some(SelectEvent::Escape),
                "Delete" | "Backspace" => Some(SelectEvent::Delete),
                _ => None,
            },
            _ => None,
        }
    }
}

delegate_tool!(SelectTool, ToolKind::Select);

fn selection(core: &SelectCore) -> Vec<ObjectId> {
    core.env.read(|scene| scene.selection().to_vec())
}

fn press_element(core: &mut SelectCore, input: &ToolInput) -> Result<()> {
    let Some(id) = input.target() else {
        return Ok(());
    };
    let selected = selection(core);
    let command = if input.modifiers().shift {
        if selected.contains(&id) {
            Command::deselect(vec![id])
        } else {
            Command::select(vec![id])
        }
    } else if selected.contains(&id) {
        // Keep the selection so a drag moves all of it.
        return Ok(());
    } else if selected.is_empty() {
        Command::select(vec![id])
    } else {
        Command::multi(vec![Command::deselect(selected), Command::select(vec![id])])
            .named("replace-selection")
    };
    core.env.dispatch(command)
}

fn press_canvas(core: &mut SelectCore, input: &ToolInput) -> Result<()> {
    if input.modifiers().shift {
        return Ok(());
    }
    clear_selection(core, input)
}

fn clear_selection(core: &mut SelectCore, _: &ToolInput) -> Result<()> {
    let selected = selection(core);
    if selected.is_empty() {
        return Ok(());
    }
    core.env.dispatch(Command::deselect(selected))
}

fn hover(core: &mut SelectCore, input: &ToolInput) -> Result<()> {
    let target = input.target();
    let mut store = core.env.scene.borrow_mut();
    let hovered = store.scene().hovered().to_vec();
    for id in hovered {
        if Some(id) != target {
            store.unhover(id);
        }
    }
    if let Some(id) = target
        && !store.scene().hovered().contains(&id)
        && store.scene().registry().contains(id)
    {
        store.hover(id);
    }
    Ok(())
}

fn delete_selection(core: &mut SelectCore, _: &ToolInput) -> Result<()> {
    let selected = selection(core);
    // Skip locked objects and objects whose ancestor is also going away.
    let doomed: Vec<ObjectId> = core.env.read(|scene| {
        let registry = scene.registry();
        selected
            .iter()
            .copied()
            .filter(|id| *id != registry.root() && !registry.is_locked(*id))
            .filter(|id| {
                !selected
                    .iter()
                    .any(|other| other != id && registry.is_descendant(*id, *other))
            })
            .collect()
    });
    if doomed.is_empty() {
        return Ok(());
    }
    let deletes = doomed.into_iter().map(Command::delete).collect();
    core.env
        .dispatch(Command::multi(deletes).named("delete-selection"))
}

fn begin_move(core: &mut SelectCore, input: &ToolInput) -> Result<()> {
    core.origin = input
        .drag_origin()
        .or(input.position())
        .unwrap_or(Point::ZERO);
    let selected = selection(core);
    core.moving = core.env.read(|scene| {
        selected
            .iter()
            .filter(|id| !scene.registry().is_locked(**id))
            .filter_map(|id| scene.registry().get(*id).map(|o| (*id, o.position)))
            .collect()
    });
    Ok(())
}

fn move_selection(core: &mut SelectCore, input: &ToolInput) -> Result<()> {
    let Some(position) = input.position() else {
        return Ok(());
    };
    if core.moving.is_empty() {
        return Ok(());
    }
    let delta = position - core.origin;
    let moves = core
        .moving
        .iter()
        .map(|(id, start)| Command::move_to(*id, *start + delta))
        .collect();
    core.env
        .dispatch(Command::multi(moves).named("move-selection").streaming())
}

fn finish_move(core: &mut SelectCore, _: &ToolInput) -> Result<()> {
    core.env.commit();
    core.moving.clear();
    Ok(())
}

fn cancel_move(core: &mut SelectCore, _: &ToolInput) -> Result<()> {
    core.env.cancel()?;
    core.moving.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use crate::tools::Tool;
    use crate::tools::testing::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn press_on_element_replaces_selection() {
        let env = env();
        let a = seed_canvas(&env, "sel_a", Point::ZERO);
        let b = seed_canvas(&env, "sel_b", Point::ZERO);
        let mut tool = SelectTool::new(env.clone());

        tool.handle(&press(0.0, 0.0).on(a)).unwrap();
        assert_eq!(tool.state(), SelectState::PointerDownOnElement);
        tool.handle(&release(0.0, 0.0)).unwrap();
        tool.handle(&press(0.0, 0.0).on(b)).unwrap();
        assert_eq!(env.read(|s| s.selection().to_vec()), vec![b]);

        tool.handle(&release(0.0, 0.0)).unwrap();
        tool.handle(&press(0.0, 0.0).on(a).with_modifiers(Modifiers::SHIFT))
            .unwrap();
        assert_eq!(env.read(|s| s.selection().to_vec()), vec![b, a]);
    }

    #[test]
    fn press_on_canvas_clears_selection() {
        let env = env();
        let a = seed_canvas(&env, "sel_clear", Point::ZERO);
        env.dispatch(Command::select(vec![a])).unwrap();
        let mut tool = SelectTool::new(env.clone());
        tool.handle(&press(50.0, 50.0)).unwrap();
        assert_eq!(tool.state(), SelectState::PointerDownOnCanvas);
        assert!(env.read(|s| s.selection().is_empty()));
    }

    #[test]
    fn drag_moves_selection_as_one_undo_entry() {
        let env = env();
        let a = seed_canvas(&env, "sel_drag", Point::new(10.0, 10.0));
        let mut tool = SelectTool::new(env.clone());

        tool.handle(&press(12.0, 12.0).on(a)).unwrap();
        tool.handle(&drag(ToolEventKind::Pointer1DragStart, (12.0, 12.0), (20.0, 12.0)))
            .unwrap();
        assert_eq!(tool.state(), SelectState::Moving);
        assert!(env.viewport.borrow().is_suspended());
        for x in [20.0, 30.0, 42.0] {
            tool.handle(&drag(ToolEventKind::Pointer1DragMove, (12.0, 12.0), (x, 12.0)))
                .unwrap();
        }
        tool.handle(&drag(ToolEventKind::Pointer1DragEnd, (12.0, 12.0), (42.0, 12.0)))
            .unwrap();
        assert_eq!(tool.state(), SelectState::Idle);
        assert!(!env.viewport.borrow().is_suspended());

        let position = env.read(|s| s.require(a).map(|o| o.position).unwrap());
        assert_eq!(position, Point::new(40.0, 10.0));
        // select + one merged move
        assert_eq!(env.scene.borrow().undo_len(), 2);
        env.scene.borrow_mut().undo().unwrap();
        let position = env.read(|s| s.require(a).map(|o| o.position).unwrap());
        assert_eq!(position, Point::new(10.0, 10.0));
    }

    #[test]
    fn escape_cancels_a_move() {
        let env = env();
        let a = seed_canvas(&env, "sel_esc", Point::ZERO);
        let mut tool = SelectTool::new(env.clone());
        tool.handle(&press(0.0, 0.0).on(a)).unwrap();
        tool.handle(&drag(ToolEventKind::Pointer1DragStart, (0.0, 0.0), (5.0, 0.0)))
            .unwrap();
        tool.handle(&drag(ToolEventKind::Pointer1DragMove, (0.0, 0.0), (5.0, 0.0)))
            .unwrap();
        tool.handle(&ToolInput::key(ToolEventKind::KeyDown, "Escape"))
            .unwrap();
        assert_eq!(tool.state(), SelectState::Idle);
        assert_eq!(env.read(|s| s.require(a).map(|o| o.position).unwrap()), Point::ZERO);
        assert_eq!(env.scene.borrow().undo_len(), 1);
    }

    #[test]
    fn locked_objects_are_canvas_presses() {
        let env = env();
        let a = seed_canvas(&env, "sel_locked", Point::ZERO);
        env.scene
            .borrow_mut()
            .scene_mut()
            .require_mut(a)
            .unwrap()
            .state
            .locked = true;
        let mut tool = SelectTool::new(env.clone());
        tool.handle(&press(0.0, 0.0).on(a)).unwrap();
        assert_eq!(tool.state(), SelectState::PointerDownOnCanvas);
    }

    #[test]
    fn delete_key_removes_selection() {
        let env = env();
        let a = seed_canvas(&env, "sel_del", Point::ZERO);
        env.dispatch(Command::select(vec![a])).unwrap();
        let mut tool = SelectTool::new(env.clone());
        tool.handle(&ToolInput::key(ToolEventKind::KeyDown, "Delete"))
            .unwrap();
        assert!(!env.read(|s| s.registry().contains(a)));
        assert!(env.read(|s| s.selection().is_empty()));

        env.scene.borrow_mut().undo().unwrap();
        assert_eq!(env.read(|s| s.selection().to_vec()), vec![a]);
    }

    #[test]
    fn hover_follows_pointer() {
        let env = env();
        let a = seed_canvas(&env, "sel_hov", Point::ZERO);
        let mut tool = SelectTool::new(env.clone());
        let over = ToolInput::pointer(ToolEventKind::Pointer1Move, Point::ZERO).on(a);
        tool.handle(&over).unwrap();
        assert_eq!(env.read(|s| s.hovered().to_vec()), vec![a]);
        tool.handle(&ToolInput::pointer(ToolEventKind::Pointer1Move, Point::new(90.0, 90.0)))
            .unwrap();
        assert!(env.read(|s| s.hovered().is_empty()));
        assert!(!env.scene.borrow().can_undo());
    }
}
