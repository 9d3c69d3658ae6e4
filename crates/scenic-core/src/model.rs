//! Scene object model.
//!
//! The scene is a tree of `SceneObject` values stored flat in a
//! [`Registry`](crate::registry::Registry). Each object records its parent
//! and an ordered child list; child order is render order.

use crate::id::ObjectId;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Vector geometry ─────────────────────────────────────────────────────

/// One endpoint of a vector segment: the node object it belongs to and a
/// cached copy of that node's position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub node: ObjectId,
    pub position: Point,
}

/// A straight segment between two vertices of a vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Vertex,
    pub end: Vertex,
}

impl Segment {
    pub fn new(start: Vertex, end: Vertex) -> Self {
        Self { start, end }
    }

    /// Does either endpoint reference `node`?
    pub fn touches(&self, node: ObjectId) -> bool {
        self.start.node == node || self.end.node == node
    }
}

// ─── Objects ─────────────────────────────────────────────────────────────

/// The object kinds in the scene tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ObjectKind {
    /// Artboard-like container with an explicit size.
    Canvas { size: Size },

    /// Plain container. The scene root is a group.
    Group,

    /// Path made of segments between its child nodes.
    Vector { segments: Vec<Segment> },

    /// A vertex of the parent vector.
    Node,

    /// Text label.
    Text { content: String },

    /// Selectable handle for one segment of the parent vector.
    VectorSegment { start: ObjectId, end: ObjectId },
}

impl ObjectKind {
    /// Short kind name, also used as the prefix for generated ids.
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Canvas { .. } => "canvas",
            ObjectKind::Group => "group",
            ObjectKind::Vector { .. } => "vector",
            ObjectKind::Node => "node",
            ObjectKind::Text { .. } => "text",
            ObjectKind::VectorSegment { .. } => "vector-segment",
        }
    }
}

/// Per-object state flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    pub visible: bool,
    pub locked: bool,
    /// Locks the object itself but leaves its children editable.
    pub shallow_locked: bool,
    pub selected: bool,
    pub hovered: bool,
    pub name: String,
}

impl Default for ObjectState {
    fn default() -> Self {
        Self {
            visible: true,
            locked: false,
            shallow_locked: false,
            selected: false,
            hovered: false,
            name: String::new(),
        }
    }
}

/// A single object in the scene tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,

    /// `None` only for the root.
    pub parent: Option<ObjectId>,

    /// Child ids in render order.
    pub children: Vec<ObjectId>,

    pub position: Point,

    pub state: ObjectState,

    pub kind: ObjectKind,
}

impl SceneObject {
    pub fn new(id: ObjectId, kind: ObjectKind) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            position: Point::ZERO,
            state: ObjectState::default(),
            kind,
        }
    }

    /// Create an object with a freshly generated id prefixed by its kind.
    pub fn fresh(kind: ObjectKind) -> Self {
        Self::new(ObjectId::with_prefix(kind.name()), kind)
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.state.name = name.into();
        self
    }

    /// Read a settable field. `None` if this kind does not carry it.
    pub fn field(&self, field: Field) -> Option<FieldValue> {
        match (field, &self.kind) {
            (Field::Visible, _) => Some(FieldValue::Bool(self.state.visible)),
            (Field::Locked, _) => Some(FieldValue::Bool(self.state.locked)),
            (Field::ShallowLocked, _) => Some(FieldValue::Bool(self.state.shallow_locked)),
            (Field::Name, _) => Some(FieldValue::Text(self.state.name.clone())),
            (Field::Size, ObjectKind::Canvas { size }) => Some(FieldValue::Size(*size)),
            (Field::Content, ObjectKind::Text { content }) => {
                Some(FieldValue::Text(content.clone()))
            }
            (Field::Segments, ObjectKind::Vector { segments }) => {
                Some(FieldValue::Segments(segments.clone()))
            }
            _ => None,
        }
    }

    /// Write a settable field. Returns false if the kind does not carry the
    /// field or the value has the wrong shape; nothing is changed then.
    pub fn set_field(&mut self, field: Field, value: FieldValue) -> bool {
        match (field, &mut self.kind, value) {
            (Field::Visible, _, FieldValue::Bool(v)) => self.state.visible = v,
            (Field::Locked, _, FieldValue::Bool(v)) => self.state.locked = v,
            (Field::ShallowLocked, _, FieldValue::Bool(v)) => self.state.shallow_locked = v,
            (Field::Name, _, FieldValue::Text(v)) => self.state.name = v,
            (Field::Size, ObjectKind::Canvas { size }, FieldValue::Size(v)) => *size = v,
            (Field::Content, ObjectKind::Text { content }, FieldValue::Text(v)) => *content = v,
            (Field::Segments, ObjectKind::Vector { segments }, FieldValue::Segments(v)) => {
                *segments = v
            }
            _ => return false,
        }
        true
    }
}

// ─── Fields ──────────────────────────────────────────────────────────────

/// Fields that can be changed through a set-field command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Field {
    Visible,
    Locked,
    ShallowLocked,
    Name,
    Size,
    Content,
    Segments,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Visible => "visible",
            Field::Locked => "locked",
            Field::ShallowLocked => "shallow-locked",
            Field::Name => "name",
            Field::Size => "size",
            Field::Content => "content",
            Field::Segments => "segments",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value for a [`Field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
    Size(Size),
    Segments(Vec<Segment>),
}

// ─── Detached subtrees ───────────────────────────────────────────────────

/// A subtree detached from any registry: used to create objects and to
/// capture deleted ones verbatim.
///
/// The `children` list of `object` is ignored on insertion; the order of
/// `children` here is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectTree {
    pub object: SceneObject,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ObjectTree>,
}

impl ObjectTree {
    pub fn leaf(object: SceneObject) -> Self {
        Self {
            object,
            children: Vec::new(),
        }
    }

    pub fn with_children(object: SceneObject, children: Vec<ObjectTree>) -> Self {
        Self { object, children }
    }

    pub fn id(&self) -> ObjectId {
        self.object.id
    }

    /// All ids in the subtree, pre-order.
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids(&self, out: &mut Vec<ObjectId>) {
        out.push(self.object.id);
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}
