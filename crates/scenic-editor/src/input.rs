//! Input normalization.
//!
//! Raw pointer and keyboard events are turned into the tool event
//! vocabulary (`pointer1-down`, `pointer1-dragstart`, `keypress`, …). The
//! [`InputStore`] tracks the primary button to synthesize clicks, double
//! clicks and drags; tools never see raw events.

use crate::config::EditorConfig;
use scenic_core::{ObjectId, Point};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

/// Keyboard modifier state at the time of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };

    /// Platform command key: ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    #[default]
    Primary,
    /// Middle button / wheel press.
    Auxiliary,
    Secondary,
}

/// A pointer event as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPointer {
    /// Scene coordinates.
    pub position: Point,
    /// Screen coordinates; defaults to `position`.
    #[serde(default)]
    pub screen_position: Option<Point>,
    #[serde(default)]
    pub button: PointerButton,
    /// Object under the pointer, as resolved by the host's hit test.
    #[serde(default)]
    pub target: Option<ObjectId>,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub time_ms: u64,
}

impl RawPointer {
    pub fn at(position: Point) -> Self {
        Self {
            position,
            screen_position: None,
            button: PointerButton::Primary,
            target: None,
            modifiers: Modifiers::NONE,
            time_ms: 0,
        }
    }

    #[must_use]
    pub fn on(mut self, target: ObjectId) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    #[must_use]
    pub fn at_time(mut self, time_ms: u64) -> Self {
        self.time_ms = time_ms;
        self
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn screen(&self) -> Point {
        self.screen_position.unwrap_or(self.position)
    }
}

/// A keyboard event; `key` uses `KeyboardEvent.key` names (`"z"`, `" "`,
/// `"Escape"`, `"Backspace"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawKey {
    pub key: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl RawKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::NONE,
        }
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

// ─── Tool event vocabulary ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolEventKind {
    #[serde(rename = "pointer1-down")]
    Pointer1Down,
    #[serde(rename = "pointer1-move")]
    Pointer1Move,
    #[serde(rename = "pointer1-up")]
    Pointer1Up,
    #[serde(rename = "pointer1-click")]
    Pointer1Click,
    #[serde(rename = "pointer1-doubleclick")]
    Pointer1DoubleClick,
    #[serde(rename = "pointer1-dragstart")]
    Pointer1DragStart,
    #[serde(rename = "pointer1-dragmove")]
    Pointer1DragMove,
    #[serde(rename = "pointer1-dragend")]
    Pointer1DragEnd,
    #[serde(rename = "pointer3-down")]
    Pointer3Down,
    #[serde(rename = "pointer3-up")]
    Pointer3Up,
    #[serde(rename = "keydown")]
    KeyDown,
    #[serde(rename = "keyup")]
    KeyUp,
    #[serde(rename = "keypress")]
    KeyPress,
}

impl ToolEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolEventKind::Pointer1Down => "pointer1-down",
            ToolEventKind::Pointer1Move => "pointer1-move",
            ToolEventKind::Pointer1Up => "pointer1-up",
            ToolEventKind::Pointer1Click => "pointer1-click",
            ToolEventKind::Pointer1DoubleClick => "pointer1-doubleclick",
            ToolEventKind::Pointer1DragStart => "pointer1-dragstart",
            ToolEventKind::Pointer1DragMove => "pointer1-dragmove",
            ToolEventKind::Pointer1DragEnd => "pointer1-dragend",
            ToolEventKind::Pointer3Down => "pointer3-down",
            ToolEventKind::Pointer3Up => "pointer3-up",
            ToolEventKind::KeyDown => "keydown",
            ToolEventKind::KeyUp => "keyup",
            ToolEventKind::KeyPress => "keypress",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerData {
    pub position: Point,
    pub screen_position: Point,
    #[serde(default)]
    pub target: Option<ObjectId>,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Scene position of the press that started the current drag.
    #[serde(default)]
    pub drag_origin: Option<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputData {
    Pointer(PointerData),
    Key(RawKey),
}

/// A normalized event, ready for the viewport and the active tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInput {
    pub kind: ToolEventKind,
    pub data: InputData,
}

impl ToolInput {
    pub fn pointer(kind: ToolEventKind, position: Point) -> Self {
        Self {
            kind,
            data: InputData::Pointer(PointerData {
                position,
                screen_position: position,
                target: None,
                modifiers: Modifiers::NONE,
                drag_origin: None,
            }),
        }
    }

    pub fn key(kind: ToolEventKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            data: InputData::Key(RawKey::new(key)),
        }
    }

    fn from_raw(kind: ToolEventKind, raw: &RawPointer, drag_origin: Option<Point>) -> Self {
        Self {
            kind,
            data: InputData::Pointer(PointerData {
                position: raw.position,
                screen_position: raw.screen(),
                target: raw.target,
                modifiers: raw.modifiers,
                drag_origin,
            }),
        }
    }

    #[must_use]
    pub fn on(mut self, target: ObjectId) -> Self {
        if let InputData::Pointer(p) = &mut self.data {
            p.target = Some(target);
        }
        self
    }

    #[must_use]
    pub fn from_origin(mut self, origin: Point) -> Self {
        if let InputData::Pointer(p) = &mut self.data {
            p.drag_origin = Some(origin);
        }
        self
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        match &mut self.data {
            InputData::Pointer(p) => p.modifiers = modifiers,
            InputData::Key(k) => k.modifiers = modifiers,
        }
        self
    }

    pub fn position(&self) -> Option<Point> {
        match &self.data {
            InputData::Pointer(p) => Some(p.position),
            InputData::Key(_) => None,
        }
    }

    pub fn screen_position(&self) -> Option<Point> {
        match &self.data {
            InputData::Pointer(p) => Some(p.screen_position),
            InputData::Key(_) => None,
        }
    }

    pub fn target(&self) -> Option<ObjectId> {
        match &self.data {
            InputData::Pointer(p) => p.target,
            InputData::Key(_) => None,
        }
    }

    pub fn drag_origin(&self) -> Option<Point> {
        match &self.data {
            InputData::Pointer(p) => p.drag_origin,
            InputData::Key(_) => None,
        }
    }

    pub fn key_name(&self) -> Option<&str> {
        match &self.data {
            InputData::Key(k) => Some(&k.key),
            InputData::Pointer(_) => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match &self.data {
            InputData::Pointer(p) => p.modifiers,
            InputData::Key(k) => k.modifiers,
        }
    }
}

pub type Normalized = SmallVec<[ToolInput; 3]>;

// ─── Normalizer ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Press {
    position: Point,
    screen: Point,
}

#[derive(Debug, Clone, Copy)]
struct Click {
    screen: Point,
    time_ms: u64,
}

/// Turns raw events into tool events, tracking the primary button.
#[derive(Debug, Clone)]
pub struct InputStore {
    drag_threshold: f64,
    double_click_ms: u64,
    pressed: Option<Press>,
    dragging: bool,
    last_click: Option<Click>,
}

impl InputStore {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            drag_threshold: config.drag_threshold,
            double_click_ms: config.double_click_ms,
            pressed: None,
            dragging: false,
            last_click: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn pointer_down(&mut self, raw: &RawPointer) -> Normalized {
        match raw.button {
            PointerButton::Primary => {
                self.pressed = Some(Press {
                    position: raw.position,
                    screen: raw.screen(),
                });
                self.dragging = false;
                smallvec![ToolInput::from_raw(ToolEventKind::Pointer1Down, raw, None)]
            }
            PointerButton::Auxiliary => {
                smallvec![ToolInput::from_raw(ToolEventKind::Pointer3Down, raw, None)]
            }
            PointerButton::Secondary => {
                log::trace!("secondary button ignored");
                SmallVec::new()
            }
        }
    }

    /// Every move is a `pointer1-move`; with the primary button held past
    /// the drag threshold it is followed by drag events.
    pub fn pointer_move(&mut self, raw: &RawPointer) -> Normalized {
        let mut out: Normalized = smallvec![ToolInput::from_raw(ToolEventKind::Pointer1Move, raw, None)];
        let Some(press) = self.pressed else {
            return out;
        };
        let origin = Some(press.position);
        if !self.dragging {
            if raw.screen().distance(press.screen) < self.drag_threshold {
                return out;
            }
            self.dragging = true;
            out.push(ToolInput::from_raw(ToolEventKind::Pointer1DragStart, raw, origin));
        }
        out.push(ToolInput::from_raw(ToolEventKind::Pointer1DragMove, raw, origin));
        out
    }

    pub fn pointer_up(&mut self, raw: &RawPointer) -> Normalized {
        match raw.button {
            PointerButton::Primary => {}
            PointerButton::Auxiliary => {
                return smallvec![ToolInput::from_raw(ToolEventKind::Pointer3Up, raw, None)];
            }
            PointerButton::Secondary => return SmallVec::new(),
        }

        let press = self.pressed.take();
        let origin = press.map(|p| p.position);
        if std::mem::take(&mut self.dragging) {
            self.last_click = None;
            return smallvec![
                ToolInput::from_raw(ToolEventKind::Pointer1DragEnd, raw, origin),
                ToolInput::from_raw(ToolEventKind::Pointer1Up, raw, origin),
            ];
        }

        let mut out: Normalized = smallvec![ToolInput::from_raw(ToolEventKind::Pointer1Up, raw, None)];
        if press.is_none() {
            return out;
        }
        out.push(ToolInput::from_raw(ToolEventKind::Pointer1Click, raw, None));

        let click = Click {
            screen: raw.screen(),
            time_ms: raw.time_ms,
        };
        let double = self.last_click.is_some_and(|last| {
            click.time_ms.saturating_sub(last.time_ms) <= self.double_click_ms
                && click.screen.distance(last.screen) < self.drag_threshold
        });
        if double {
            out.push(ToolInput::from_raw(ToolEventKind::Pointer1DoubleClick, raw, None));
            self.last_click = None;
        } else {
            self.last_click = Some(click);
        }
        out
    }

    pub fn key_down(&mut self, raw: &RawKey) -> Normalized {
        smallvec![Self::key_event(ToolEventKind::KeyDown, raw)]
    }

    pub fn key_up(&mut self, raw: &RawKey) -> Normalized {
        smallvec![Self::key_event(ToolEventKind::KeyUp, raw)]
    }

    pub fn key_press(&mut self, raw: &RawKey) -> Normalized {
        smallvec![Self::key_event(ToolEventKind::KeyPress, raw)]
    }

    fn key_event(kind: ToolEventKind, raw: &RawKey) -> ToolInput {
        ToolInput {
            kind,
            data: InputData::Key(raw.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(events: &Normalized) -> Vec<&'static str> {
        events.iter().map(|e| e.kind.name()).collect()
    }

    fn store() -> InputStore {
        InputStore::new(&EditorConfig::default())
    }

    #[test]
    fn small_wiggle_is_a_click() {
        let mut input = store();
        input.pointer_down(&RawPointer::at(Point::new(10.0, 10.0)));
        let moved = input.pointer_move(&RawPointer::at(Point::new(11.0, 10.0)));
        assert_eq!(kinds(&moved), vec!["pointer1-move"]);
        let up = input.pointer_up(&RawPointer::at(Point::new(11.0, 10.0)));
        assert_eq!(kinds(&up), vec!["pointer1-up", "pointer1-click"]);
    }

    #[test]
    fn drag_past_threshold() {
        let mut input = store();
        input.pointer_down(&RawPointer::at(Point::new(0.0, 0.0)));
        let first = input.pointer_move(&RawPointer::at(Point::new(10.0, 0.0)));
        assert_eq!(
            kinds(&first),
            vec!["pointer1-move", "pointer1-dragstart", "pointer1-dragmove"]
        );
        assert_eq!(first[1].drag_origin(), Some(Point::ZERO));

        let second = input.pointer_move(&RawPointer::at(Point::new(20.0, 0.0)));
        assert_eq!(kinds(&second), vec!["pointer1-move", "pointer1-dragmove"]);

        let up = input.pointer_up(&RawPointer::at(Point::new(20.0, 0.0)));
        assert_eq!(kinds(&up), vec!["pointer1-dragend", "pointer1-up"]);
        assert!(!input.is_dragging());
    }

    #[test]
    fn double_click_within_window() {
        let mut input = store();
        let p = RawPointer::at(Point::new(5.0, 5.0));
        input.pointer_down(&p);
        input.pointer_up(&p.at_time(100));
        input.pointer_down(&p.at_time(200));
        let up = input.pointer_up(&p.at_time(250));
        assert_eq!(
            kinds(&up),
            vec!["pointer1-up", "pointer1-click", "pointer1-doubleclick"]
        );

        // A third click starts a new pair.
        input.pointer_down(&p.at_time(300));
        let up = input.pointer_up(&p.at_time(320));
        assert_eq!(kinds(&up), vec!["pointer1-up", "pointer1-click"]);
    }

    #[test]
    fn slow_second_click_is_single() {
        let mut input = store();
        let p = RawPointer::at(Point::new(5.0, 5.0));
        input.pointer_down(&p);
        input.pointer_up(&p.at_time(0));
        input.pointer_down(&p.at_time(1000));
        let up = input.pointer_up(&p.at_time(1000));
        assert_eq!(kinds(&up), vec!["pointer1-up", "pointer1-click"]);
    }

    #[test]
    fn auxiliary_and_secondary_buttons() {
        let mut input = store();
        let aux = RawPointer::at(Point::ZERO).button(PointerButton::Auxiliary);
        assert_eq!(kinds(&input.pointer_down(&aux)), vec!["pointer3-down"]);
        assert_eq!(kinds(&input.pointer_up(&aux)), vec!["pointer3-up"]);

        let right = RawPointer::at(Point::ZERO).button(PointerButton::Secondary);
        assert!(input.pointer_down(&right).is_empty());
        assert!(input.pointer_up(&right).is_empty());
    }

    #[test]
    fn target_and_modifiers_are_carried() {
        let mut input = store();
        let id = ObjectId::intern("in_target");
        let down = input.pointer_down(&RawPointer::at(Point::ZERO).on(id).with_modifiers(Modifiers::SHIFT));
        assert_eq!(down[0].target(), Some(id));
        assert!(down[0].modifiers().shift);
    }

    #[test]
    fn tool_input_reads_from_json() {
        let json = r#"{
            "kind": "pointer1-down",
            "data": {"pointer": {"position": {"x": 1.0, "y": 2.0}, "screen_position": {"x": 1.0, "y": 2.0}}}
        }"#;
        let input: ToolInput = serde_json::from_str(json).unwrap();
        assert_eq!(input, ToolInput::pointer(ToolEventKind::Pointer1Down, Point::new(1.0, 2.0)));
    }
}
