//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. Shortcuts are
//! only consulted on key-down while the active tool is not mid-gesture.

use crate::input::Modifiers;
use crate::tools::ToolKind;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Undo,
    Redo,
    SwitchTool(ToolKind),
}

/// Resolves key events into shortcut actions.
///
/// Platform-aware: on macOS `meta` is ⌘, elsewhere `ctrl` plays that role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Z"`).
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        if modifiers.command() && modifiers.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if modifiers.command() {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if modifiers.shift || modifiers.alt {
            return None;
        }

        let tool = match key {
            "v" | "V" => ToolKind::Select,
            "b" | "B" => ToolKind::Box,
            "e" | "E" => ToolKind::Ellipse,
            "p" | "P" => ToolKind::Pen,
            "t" | "T" => ToolKind::Text,
            _ => return None,
        };
        Some(ShortcutAction::SwitchTool(tool))
    }
}
