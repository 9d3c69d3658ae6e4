//! Cursor stack. The topmost entry is the cursor the host should show.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorIcon {
    #[default]
    Default,
    Pointer,
    Crosshair,
    Text,
    Move,
    Grab,
    Grabbing,
}

/// A cursor request. `id` names the owner so it can clear its own entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub id: String,
    pub icon: CursorIcon,
}

impl Cursor {
    pub fn new(id: impl Into<String>, icon: CursorIcon) -> Self {
        Self {
            id: id.into(),
            icon,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CursorStack {
    stack: Vec<Cursor>,
}

impl CursorStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cursor: Cursor) {
        log::trace!("cursor push {}:{:?}", cursor.id, cursor.icon);
        self.stack.push(cursor);
    }

    pub fn pop(&mut self) -> Option<Cursor> {
        self.stack.pop()
    }

    /// Pop the topmost entry owned by `id`, wherever it sits.
    pub fn pop_owned(&mut self, id: &str) -> Option<Cursor> {
        let index = self.stack.iter().rposition(|c| c.id == id)?;
        Some(self.stack.remove(index))
    }

    /// Drop every entry owned by `id`. Returns how many were removed.
    pub fn clear(&mut self, id: &str) -> usize {
        let before = self.stack.len();
        self.stack.retain(|c| c.id != id);
        before - self.stack.len()
    }

    pub fn current(&self) -> CursorIcon {
        self.stack.last().map(|c| c.icon).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
