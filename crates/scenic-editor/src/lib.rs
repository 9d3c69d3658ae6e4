//! Scenic editor: reversible scene commands with coalescing undo/redo, input
//! normalization, the viewport pan machine and the interactive tools.

pub mod bag;
pub mod commands;
pub mod config;
pub mod cursor;
pub mod editor;
pub mod error;
pub mod input;
pub mod scene;
pub mod shortcuts;
pub mod store;
pub mod tools;
pub mod viewport;

pub use bag::{Bag, decode_history, encode_history};
pub use commands::{Command, CommandOp, CommandType, ParentStrategy};
pub use config::EditorConfig;
pub use cursor::{Cursor, CursorIcon, CursorStack};
pub use editor::{Editor, InputMessage, Message, SceneMessage, ToolMessage};
pub use error::{EditorError, Result};
pub use input::{InputStore, Modifiers, PointerButton, RawKey, RawPointer, ToolEventKind, ToolInput};
pub use scene::Scene;
pub use store::{SceneChange, SceneStore};
pub use tools::{Tool, ToolEnv, ToolKind};
pub use viewport::{FocusSignal, PanState, ViewportStore};
