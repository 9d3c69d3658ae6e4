//! Editor configuration.

use crate::error::Result;
use crate::tools::ToolKind;
use serde::{Deserialize, Serialize};

/// Tunables shared by the store, the input normalizer and the tools.
///
/// Every field has a default, so a partial JSON document is valid:
///
/// ```json
/// { "history_limit": 50, "drag_threshold": 4.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum undo depth. Oldest entries are dropped first.
    pub history_limit: usize,
    /// Screen pixels the pointer must travel before a press becomes a drag.
    pub drag_threshold: f64,
    /// Maximum delay between two clicks of a double click.
    pub double_click_ms: u64,
    /// Size of a canvas placed by a plain click with the box tool.
    pub default_box_size: (f64, f64),
    pub initial_tool: ToolKind,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 200,
            drag_threshold: 3.0,
            double_click_ms: 400,
            default_box_size: (100.0, 100.0),
            initial_tool: ToolKind::Select,
        }
    }
}

impl EditorConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
