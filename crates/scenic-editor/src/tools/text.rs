use super::{Gesture, ToolCore, ToolEnv, ToolKind, ToolTable, delegate_tool, drop_parent};
use crate::commands::Command;
use crate::error::Result;
use crate::input::{ToolEventKind, ToolInput};
use scenic_core::{Field, FieldValue, ObjectId, ObjectKind, ObjectTree, Placement, Point, SceneObject};
use scenic_fsm::Blockable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextState {
    Idle,
    Editing,
    Blocked,
}

impl Blockable for TextState {
    const BLOCKED: Self = TextState::Blocked;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TextEvent {
    Press,
    Type,
    Erase,
    Finish,
}

struct TextCore {
    env: ToolEnv,
    editing: Option<ObjectId>,
    content: String,
}

impl ToolCore for TextCore {
    fn env(&self) -> &ToolEnv {
        &self.env
    }
}

/// Click to place a text object, then type into it.
pub struct TextTool {
    gesture: Gesture<TextState, TextEvent, TextCore>,
}

impl TextTool {
    pub fn new(env: ToolEnv) -> Self {
        use TextEvent::*;
        use TextState::*;

        let table = ToolTable::new(Idle)
            .on_with(Idle, Press, Editing, place)
            .on_with(Editing, Type, Editing, type_char)
            .on_with(Editing, Erase, Editing, erase)
            .on_with(Editing, Finish, Idle, finish)
            .on_with(Editing, Press, Idle, finish);

        let core = TextCore {
            env,
            editing: None,
            content: String::new(),
        };
        Self {
            gesture: Gesture::new(table, [Editing], core),
        }
    }

    pub fn state(&self) -> TextState {
        self.gesture.state()
    }

    /// The text object being edited.
    pub fn editing(&self) -> Option<ObjectId> {
        self.gesture.core().editing
    }

    fn event_for(&self, input: &ToolInput) -> Option<TextEvent> {
        match input.kind {
            ToolEventKind::Pointer1Down => Some(TextEvent::Press),
            ToolEventKind::KeyPress => {
                let key = input.key_name()?;
                let printable = key.chars().count() == 1 && !input.modifiers().command();
                printable.then_some(TextEvent::Type)
            }
            ToolEventKind::KeyDown => match input.key_name()? {
                "Backspace" => Some(TextEvent::Erase),
                "Enter" | "Escape" => Some(TextEvent::Finish),
                _ => None,
            },
            _ => None,
        }
    }
}

delegate_tool!(TextTool, ToolKind::Text);

fn place(core: &mut TextCore, input: &ToolInput) -> Result<()> {
    let position = input.position().unwrap_or(Point::ZERO);
    let (parent, selected) = core.env.read(|scene| {
        (
            drop_parent(scene, input.target()),
            scene.selection().to_vec(),
        )
    });
    let text = SceneObject::fresh(ObjectKind::Text {
        content: String::new(),
    })
    .at(position);
    let id = text.id;
    core.editing = Some(id);
    core.content.clear();

    let mut commands = Vec::new();
    if !selected.is_empty() {
        commands.push(Command::deselect(selected));
    }
    commands.push(Command::create(parent, ObjectTree::leaf(text), Placement::Last));
    commands.push(Command::select(vec![id]));
    core.env
        .dispatch(Command::multi(commands).named("place-text"))
}

fn write_content(core: &TextCore) -> Result<()> {
    let Some(id) = core.editing else {
        return Ok(());
    };
    let command = Command::set_field(id, Field::Content, FieldValue::Text(core.content.clone()));
    core.env
        .dispatch(command.named("edit-text").streaming())
}

fn type_char(core: &mut TextCore, input: &ToolInput) -> Result<()> {
    if let Some(key) = input.key_name() {
        core.content.push_str(key);
    }
    write_content(core)
}

fn erase(core: &mut TextCore, _: &ToolInput) -> Result<()> {
    if core.content.pop().is_none() {
        return Ok(());
    }
    write_content(core)
}

fn finish(core: &mut TextCore, _: &ToolInput) -> Result<()> {
    core.env.commit();
    core.editing = None;
    core.content.clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use crate::tools::testing::*;
    use pretty_assertions::assert_eq;

    fn key(kind: ToolEventKind, key: &str) -> ToolInput {
        ToolInput::key(kind, key)
    }

    fn content(env: &ToolEnv, id: ObjectId) -> String {
        env.read(|scene| match scene.require(id).map(|o| o.kind.clone()) {
            Ok(ObjectKind::Text { content }) => content,
            other => panic!("expected text, got {other:?}"),
        })
    }

    #[test]
    fn typing_is_one_undo_entry() {
        let env = env();
        let mut tool = TextTool::new(env.clone());
        tool.handle(&press(3.0, 4.0)).unwrap();
        assert_eq!(tool.state(), TextState::Editing);
        assert!(env.viewport.borrow().is_suspended());
        let id = tool.editing().unwrap();
        assert_eq!(env.read(|s| s.selection().to_vec()), vec![id]);

        for ch in ["h", "i", "!"] {
            tool.handle(&key(ToolEventKind::KeyPress, ch)).unwrap();
        }
        tool.handle(&key(ToolEventKind::KeyDown, "Backspace")).unwrap();
        tool.handle(&key(ToolEventKind::KeyDown, "Enter")).unwrap();
        assert_eq!(tool.state(), TextState::Idle);
        assert!(!env.viewport.borrow().is_suspended());
        assert_eq!(content(&env, id), "hi");

        // place + one merged edit
        assert_eq!(env.scene.borrow().undo_len(), 2);
        env.scene.borrow_mut().undo().unwrap();
        assert_eq!(content(&env, id), "");
    }

    #[test]
    fn press_elsewhere_commits() {
        let env = env();
        let mut tool = TextTool::new(env.clone());
        tool.handle(&press(0.0, 0.0)).unwrap();
        tool.handle(&key(ToolEventKind::KeyPress, "a")).unwrap();
        tool.handle(&press(50.0, 0.0)).unwrap();
        assert_eq!(tool.state(), TextState::Idle);
        assert!(!env.scene.borrow().has_pending());
    }

    #[test]
    fn command_chords_are_not_typed() {
        let env = env();
        let mut tool = TextTool::new(env.clone());
        tool.handle(&press(0.0, 0.0)).unwrap();
        let id = tool.editing().unwrap();
        let chord = key(ToolEventKind::KeyPress, "z").with_modifiers(crate::input::Modifiers {
            ctrl: true,
            ..Default::default()
        });
        tool.handle(&chord).unwrap();
        assert_eq!(content(&env, id), "");
    }
}
