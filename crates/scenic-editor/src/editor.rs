//! The root store.
//!
//! Every message carries a prefixed name (`scene:undo`, `tool:switch`,
//! `input:pointerdown`) used for routing and logging. Raw input is
//! normalized first, then each tool event goes to the viewport, then the
//! viewport's focus signals are applied, then the active tool sees it.

use crate::commands::Command;
use crate::config::EditorConfig;
use crate::cursor::{Cursor, CursorStack};
use crate::error::Result;
use crate::input::{InputStore, Normalized, RawKey, RawPointer, ToolEventKind, ToolInput};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::store::SceneStore;
use crate::tools::{Tool, ToolEnv, ToolKind, build_tools};
use crate::viewport::{FocusSignal, ViewportStore};
use scenic_core::ObjectId;
use serde::{Deserialize, Serialize};
use std::cell::Ref;

const TOOL_CURSOR: &str = "tool";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Message {
    Scene(SceneMessage),
    Tool(ToolMessage),
    Input(InputMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SceneMessage {
    DoCommand(Command),
    Undo,
    Redo,
    Commit,
    Cancel,
    Hover(ObjectId),
    Unhover(ObjectId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolMessage {
    Switch(ToolKind),
    PushCursor(Cursor),
    PopCursor,
    ClearCursor(String),
    Input(ToolInput),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMessage {
    PointerDown(RawPointer),
    PointerMove(RawPointer),
    PointerUp(RawPointer),
    KeyDown(RawKey),
    KeyUp(RawKey),
    KeyPress(RawKey),
}

impl Message {
    pub fn name(&self) -> &'static str {
        match self {
            Message::Scene(m) => match m {
                SceneMessage::DoCommand(_) => "scene:do-command",
                SceneMessage::Undo => "scene:undo",
                SceneMessage::Redo => "scene:redo",
                SceneMessage::Commit => "scene:commit",
                SceneMessage::Cancel => "scene:cancel",
                SceneMessage::Hover(_) => "scene:hover",
                SceneMessage::Unhover(_) => "scene:unhover",
            },
            Message::Tool(m) => match m {
                ToolMessage::Switch(_) => "tool:switch",
                ToolMessage::PushCursor(_) => "tool:push-cursor",
                ToolMessage::PopCursor => "tool:pop-cursor",
                ToolMessage::ClearCursor(_) => "tool:clear-cursor",
                ToolMessage::Input(_) => "tool:input",
            },
            Message::Input(m) => match m {
                InputMessage::PointerDown(_) => "input:pointerdown",
                InputMessage::PointerMove(_) => "input:pointermove",
                InputMessage::PointerUp(_) => "input:pointerup",
                InputMessage::KeyDown(_) => "input:keydown",
                InputMessage::KeyUp(_) => "input:keyup",
                InputMessage::KeyPress(_) => "input:keypress",
            },
        }
    }
}

impl From<SceneMessage> for Message {
    fn from(message: SceneMessage) -> Self {
        Message::Scene(message)
    }
}

impl From<ToolMessage> for Message {
    fn from(message: ToolMessage) -> Self {
        Message::Tool(message)
    }
}

impl From<InputMessage> for Message {
    fn from(message: InputMessage) -> Self {
        Message::Input(message)
    }
}

pub struct Editor {
    env: ToolEnv,
    input: InputStore,
    tools: Vec<Box<dyn Tool>>,
    active: ToolKind,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Result<Self> {
        let input = InputStore::new(&config);
        let active = config.initial_tool;
        let env = ToolEnv::new(config);
        let mut tools = build_tools(&env);
        for tool in &mut tools {
            if tool.kind() != active {
                tool.block()?;
            }
        }
        env.cursors
            .borrow_mut()
            .push(Cursor::new(TOOL_CURSOR, active.cursor()));
        Ok(Self {
            env,
            input,
            tools,
            active,
        })
    }

    pub fn dispatch(&mut self, message: impl Into<Message>) -> Result<()> {
        let message = message.into();
        log::debug!("{}", message.name());
        match message {
            Message::Scene(m) => self.dispatch_scene(m),
            Message::Tool(m) => self.dispatch_tool(m),
            Message::Input(m) => {
                let events = self.normalize(&m);
                for event in &events {
                    self.route(event)?;
                }
                Ok(())
            }
        }
    }

    fn dispatch_scene(&mut self, message: SceneMessage) -> Result<()> {
        let mut store = self.env.scene.borrow_mut();
        match message {
            SceneMessage::DoCommand(command) => store.do_command(command)?,
            SceneMessage::Undo => {
                store.undo()?;
            }
            SceneMessage::Redo => {
                store.redo()?;
            }
            SceneMessage::Commit => {
                store.commit_pending();
            }
            SceneMessage::Cancel => {
                store.cancel_pending()?;
            }
            SceneMessage::Hover(id) => {
                store.hover(id);
            }
            SceneMessage::Unhover(id) => {
                store.unhover(id);
            }
        }
        Ok(())
    }

    fn dispatch_tool(&mut self, message: ToolMessage) -> Result<()> {
        match message {
            ToolMessage::Switch(kind) => self.switch_tool(kind)?,
            ToolMessage::PushCursor(cursor) => self.env.cursors.borrow_mut().push(cursor),
            ToolMessage::PopCursor => {
                self.env.cursors.borrow_mut().pop();
            }
            ToolMessage::ClearCursor(id) => {
                self.env.cursors.borrow_mut().clear(&id);
            }
            ToolMessage::Input(input) => self.route(&input)?,
        }
        Ok(())
    }

    fn normalize(&mut self, message: &InputMessage) -> Normalized {
        match message {
            InputMessage::PointerDown(raw) => self.input.pointer_down(raw),
            InputMessage::PointerMove(raw) => self.input.pointer_move(raw),
            InputMessage::PointerUp(raw) => self.input.pointer_up(raw),
            InputMessage::KeyDown(raw) => self.input.key_down(raw),
            InputMessage::KeyUp(raw) => self.input.key_up(raw),
            InputMessage::KeyPress(raw) => self.input.key_press(raw),
        }
    }

    /// Deliver one normalized event: shortcuts, viewport, focus, tool.
    fn route(&mut self, input: &ToolInput) -> Result<()> {
        if input.kind == ToolEventKind::KeyDown
            && !self.active_tool().is_exclusive()
            && let Some(key) = input.key_name()
            && let Some(action) = ShortcutMap::resolve(key, input.modifiers())
        {
            log::debug!("shortcut {action:?}");
            return self.apply_shortcut(action);
        }

        self.env.viewport.borrow_mut().handle(input)?;
        let signals = self.env.viewport.borrow_mut().drain_signals();
        for signal in signals {
            match signal {
                FocusSignal::Acquire => self.active_tool_mut().block()?,
                FocusSignal::Release => self.active_tool_mut().unblock()?,
            }
        }
        self.active_tool_mut().handle(input)
    }

    fn apply_shortcut(&mut self, action: ShortcutAction) -> Result<()> {
        match action {
            ShortcutAction::Undo => self.dispatch_scene(SceneMessage::Undo),
            ShortcutAction::Redo => self.dispatch_scene(SceneMessage::Redo),
            ShortcutAction::SwitchTool(kind) => self.switch_tool(kind),
        }
    }

    /// Commit any pending edit, park the outgoing tool and wake the
    /// incoming one.
    pub fn switch_tool(&mut self, kind: ToolKind) -> Result<()> {
        if kind == self.active {
            return Ok(());
        }
        self.env.commit();
        self.active_tool_mut().block()?;
        log::debug!("tool {} -> {}", self.active.name(), kind.name());
        self.active = kind;
        // While the viewport holds focus the new tool stays parked; the
        // release signal wakes it.
        if !self.env.viewport.borrow().is_exclusive() {
            self.active_tool_mut().unblock()?;
        }
        let mut cursors = self.env.cursors.borrow_mut();
        cursors.clear(TOOL_CURSOR);
        cursors.push(Cursor::new(TOOL_CURSOR, kind.cursor()));
        Ok(())
    }

    pub fn active(&self) -> ToolKind {
        self.active
    }

    pub fn active_tool(&self) -> &dyn Tool {
        self.tool(self.active)
    }

    pub fn tool(&self, kind: ToolKind) -> &dyn Tool {
        self.tools[Self::slot(kind)].as_ref()
    }

    fn active_tool_mut(&mut self) -> &mut dyn Tool {
        self.tools[Self::slot(self.active)].as_mut()
    }

    fn slot(kind: ToolKind) -> usize {
        ToolKind::ALL.iter().position(|k| *k == kind).unwrap_or(0)
    }

    pub fn env(&self) -> &ToolEnv {
        &self.env
    }

    pub fn store(&self) -> Ref<'_, SceneStore> {
        self.env.scene.borrow()
    }

    pub fn viewport(&self) -> Ref<'_, ViewportStore> {
        self.env.viewport.borrow()
    }

    pub fn cursors(&self) -> Ref<'_, CursorStack> {
        self.env.cursors.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;
    use pretty_assertions::assert_eq;
    use scenic_core::Point;

    fn editor() -> Editor {
        Editor::new(EditorConfig::default()).unwrap()
    }

    #[test]
    fn only_the_initial_tool_is_awake() {
        let editor = editor();
        for kind in ToolKind::ALL {
            assert_eq!(editor.tool(kind).is_blocked(), kind != ToolKind::Select);
        }
    }

    #[test]
    fn messages_have_prefixed_names() {
        assert_eq!(Message::from(SceneMessage::Undo).name(), "scene:undo");
        assert_eq!(
            Message::from(ToolMessage::Switch(ToolKind::Pen)).name(),
            "tool:switch"
        );
        assert_eq!(
            Message::from(InputMessage::KeyDown(RawKey::new("a"))).name(),
            "input:keydown"
        );
    }

    #[test]
    fn messages_read_from_json() {
        let script = r#"[
            {"tool": {"switch": "box"}},
            {"input": {"pointerdown": {"position": {"x": 1.0, "y": 2.0}}}},
            {"scene": "undo"}
        ]"#;
        let messages: Vec<Message> = serde_json::from_str(script).unwrap();
        assert_eq!(messages[0], Message::Tool(ToolMessage::Switch(ToolKind::Box)));
        assert_eq!(
            messages[1],
            Message::Input(InputMessage::PointerDown(RawPointer::at(Point::new(1.0, 2.0))))
        );
        assert_eq!(messages[2], Message::Scene(SceneMessage::Undo));
    }

    #[test]
    fn letter_keys_switch_tools() {
        let mut editor = editor();
        editor
            .dispatch(InputMessage::KeyDown(RawKey::new("b")))
            .unwrap();
        assert_eq!(editor.active(), ToolKind::Box);
        assert!(editor.tool(ToolKind::Select).is_blocked());
        assert!(!editor.tool(ToolKind::Box).is_blocked());
        assert_eq!(editor.cursors().current(), ToolKind::Box.cursor());
    }

    #[test]
    fn undo_shortcut_reaches_the_store() {
        let mut editor = editor();
        editor.dispatch(ToolMessage::Switch(ToolKind::Box)).unwrap();
        editor
            .dispatch(InputMessage::PointerDown(RawPointer::at(Point::ZERO)))
            .unwrap();
        editor
            .dispatch(InputMessage::PointerUp(RawPointer::at(Point::ZERO)))
            .unwrap();
        assert_eq!(editor.store().undo_len(), 1);

        let ctrl_z = RawKey::new("z").with_modifiers(Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        });
        editor.dispatch(InputMessage::KeyDown(ctrl_z)).unwrap();
        assert_eq!(editor.store().undo_len(), 0);
        assert_eq!(editor.store().redo_len(), 1);
    }

    #[test]
    fn cursor_messages() {
        let mut editor = editor();
        editor
            .dispatch(ToolMessage::PushCursor(Cursor::new(
                "probe",
                crate::cursor::CursorIcon::Move,
            )))
            .unwrap();
        assert_eq!(editor.cursors().current(), crate::cursor::CursorIcon::Move);
        editor.dispatch(ToolMessage::PopCursor).unwrap();
        assert_eq!(editor.cursors().len(), 1);
        editor
            .dispatch(ToolMessage::ClearCursor("tool".into()))
            .unwrap();
        assert!(editor.cursors().is_empty());
    }
}
