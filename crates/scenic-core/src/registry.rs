//! Flat object registry with parent/children adjacency.
//!
//! Objects live in a single `HashMap` keyed by id. Tree structure is carried
//! by each object's `parent` field and ordered `children` list. All
//! structural edits go through this type so the two stay consistent.
//!
//! The helpers here are forgiving: a missing id or parent logs a warning and
//! reports `false`. Commands built on top treat the same situations as hard
//! errors.

use crate::id::ObjectId;
use crate::model::{ObjectKind, ObjectTree, SceneObject};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

/// Where to splice a new subtree among its parent's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Placement {
    First,
    Last,
}

/// A violation of the tree invariant found by [`Registry::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("root object is missing")]
    MissingRoot,
    #[error("{child} names missing parent {parent}")]
    DanglingParent { child: ObjectId, parent: ObjectId },
    #[error("{child} appears {count} times in the children of {parent}")]
    ChildCount {
        child: ObjectId,
        parent: ObjectId,
        count: usize,
    },
    #[error("{parent} lists {child}, whose parent field disagrees")]
    ParentMismatch { child: ObjectId, parent: ObjectId },
    #[error("{0} has no parent but is not the root")]
    Orphan(ObjectId),
    #[error("{0} is not reachable from the root")]
    Unreachable(ObjectId),
}

/// The scene tree's storage.
#[derive(Debug, Clone)]
pub struct Registry {
    objects: HashMap<ObjectId, SceneObject>,
    root: ObjectId,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a registry holding only the root group.
    #[must_use]
    pub fn new() -> Self {
        let root = ObjectId::root();
        let mut objects = HashMap::new();
        objects.insert(root, SceneObject::new(root, ObjectKind::Group).named("root"));
        Self { objects, root }
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    /// Child ids of `id` in render order (empty if unknown).
    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.objects
            .get(&id)
            .map(|o| o.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.objects.get(&id).and_then(|o| o.parent)
    }

    /// Position of `id` within its parent's children.
    pub fn index_in_parent(&self, id: ObjectId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    // ─── Subtree insertion / removal ─────────────────────────────────────

    /// Add a subtree under `parent` at the given placement.
    ///
    /// If the top id is already registered its fields are updated in place
    /// and nothing is re-linked, so repeated calls are idempotent.
    pub fn add_object(&mut self, parent: ObjectId, tree: ObjectTree, placement: Placement) -> bool {
        if let Some(existing) = self.objects.get_mut(&tree.object.id) {
            log::debug!("upsert {} in place", tree.object.id);
            existing.position = tree.object.position;
            existing.state = tree.object.state;
            existing.kind = tree.object.kind;
            return true;
        }
        let index = match placement {
            Placement::First => 0,
            Placement::Last => self.children(parent).len(),
        };
        self.insert_subtree(parent, tree, index)
    }

    /// Register every node of `tree` (pre-order) and splice its top id into
    /// `parent`'s children at `index` (clamped to the child count).
    pub fn insert_subtree(&mut self, parent: ObjectId, tree: ObjectTree, index: usize) -> bool {
        if !self.objects.contains_key(&parent) {
            log::warn!("cannot insert {}: parent {parent} not found", tree.object.id);
            return false;
        }
        let top = tree.object.id;
        self.register(parent, tree);
        if let Some(p) = self.objects.get_mut(&parent) {
            let at = index.min(p.children.len());
            p.children.insert(at, top);
        }
        true
    }

    fn register(&mut self, parent: ObjectId, tree: ObjectTree) {
        let ObjectTree {
            mut object,
            children,
        } = tree;
        let id = object.id;
        object.parent = Some(parent);
        object.children = children.iter().map(ObjectTree::id).collect();
        self.objects.insert(id, object);
        for child in children {
            self.register(id, child);
        }
    }

    /// Unregister `id` and all its descendants, then unlink it from its
    /// parent. Returns false if the id or its parent cannot be resolved.
    pub fn delete_object(&mut self, id: ObjectId) -> bool {
        let Some(parent) = self.parent_of(id) else {
            log::warn!("cannot delete {id}: not found or has no parent");
            return false;
        };
        if !self.objects.contains_key(&parent) {
            log::warn!("cannot delete {id}: parent {parent} not found");
            return false;
        }
        for descendant in self.descendants(id) {
            self.objects.remove(&descendant);
        }
        if let Some(p) = self.objects.get_mut(&parent) {
            p.children.retain(|c| *c != id);
        }
        true
    }

    /// Clone `id` and its descendants into a detached tree.
    pub fn capture(&self, id: ObjectId) -> Option<ObjectTree> {
        let object = self.objects.get(&id)?.clone();
        let children = object
            .children
            .iter()
            .filter_map(|c| self.capture(*c))
            .collect();
        Some(ObjectTree { object, children })
    }

    // ─── Re-linking ──────────────────────────────────────────────────────

    /// Unlink `id` from its parent, keeping it registered. Returns the index
    /// it occupied. The object's parent field is cleared until re-attached.
    pub fn detach(&mut self, id: ObjectId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        let p = self.objects.get_mut(&parent)?;
        let index = p.children.iter().position(|c| *c == id)?;
        p.children.remove(index);
        if let Some(o) = self.objects.get_mut(&id) {
            o.parent = None;
        }
        Some(index)
    }

    /// Link a registered, detached object under `parent` at `index`
    /// (clamped). Returns false if either id is unknown.
    pub fn attach(&mut self, id: ObjectId, parent: ObjectId, index: usize) -> bool {
        if !self.objects.contains_key(&id) {
            log::warn!("cannot attach {id}: not found");
            return false;
        }
        let Some(p) = self.objects.get_mut(&parent) else {
            log::warn!("cannot attach {id}: parent {parent} not found");
            return false;
        };
        let at = index.min(p.children.len());
        p.children.insert(at, id);
        if let Some(o) = self.objects.get_mut(&id) {
            o.parent = Some(parent);
        }
        true
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Pre-order walk from `id`, resolving children through the registry.
    /// Dangling child ids are skipped.
    pub fn traverse<F>(&self, id: ObjectId, visit: &mut F)
    where
        F: FnMut(&SceneObject, usize),
    {
        self.traverse_at(id, 0, visit);
    }

    fn traverse_at<F>(&self, id: ObjectId, depth: usize, visit: &mut F)
    where
        F: FnMut(&SceneObject, usize),
    {
        let Some(object) = self.objects.get(&id) else {
            log::trace!("traverse skipped dangling id {id}");
            return;
        };
        visit(object, depth);
        for child in &object.children {
            self.traverse_at(*child, depth + 1, visit);
        }
    }

    /// `id` and all its descendants, pre-order.
    pub fn descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.traverse(id, &mut |o, _| out.push(o.id));
        out
    }

    /// Is `id` equal to `ancestor` or somewhere beneath it?
    pub fn is_descendant(&self, id: ObjectId, ancestor: ObjectId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent_of(current);
        }
        false
    }

    /// Locked for editing: the object is locked or shallow-locked itself, or
    /// any ancestor is (deep) locked.
    pub fn is_locked(&self, id: ObjectId) -> bool {
        let Some(object) = self.objects.get(&id) else {
            return false;
        };
        if object.state.locked || object.state.shallow_locked {
            return true;
        }
        let mut cursor = object.parent;
        while let Some(current) = cursor {
            match self.objects.get(&current) {
                Some(o) if o.state.locked => return true,
                Some(o) => cursor = o.parent,
                None => break,
            }
        }
        false
    }

    /// Check the tree invariant: every non-root object appears exactly once
    /// in its parent's children, every listed child points back at its
    /// parent, and everything is reachable from the root.
    pub fn validate(&self) -> Result<(), TreeError> {
        if !self.objects.contains_key(&self.root) {
            return Err(TreeError::MissingRoot);
        }
        for object in self.objects.values() {
            if object.id == self.root {
                continue;
            }
            let Some(parent) = object.parent else {
                return Err(TreeError::Orphan(object.id));
            };
            let Some(p) = self.objects.get(&parent) else {
                return Err(TreeError::DanglingParent {
                    child: object.id,
                    parent,
                });
            };
            let count = p.children.iter().filter(|c| **c == object.id).count();
            if count != 1 {
                return Err(TreeError::ChildCount {
                    child: object.id,
                    parent,
                    count,
                });
            }
        }
        for object in self.objects.values() {
            for child in &object.children {
                match self.objects.get(child) {
                    Some(c) if c.parent == Some(object.id) => {}
                    _ => {
                        return Err(TreeError::ParentMismatch {
                            child: *child,
                            parent: object.id,
                        });
                    }
                }
            }
        }
        let reachable: HashSet<ObjectId> = self.descendants(self.root).into_iter().collect();
        if let Some(lost) = self.objects.keys().find(|id| !reachable.contains(id)) {
            return Err(TreeError::Unreachable(*lost));
        }
        Ok(())
    }

    /// Indented text dump of the tree, one object per line.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.traverse(self.root, &mut |o, depth| {
            let _ = write!(out, "{}{} {}", "  ".repeat(depth), o.kind.name(), o.id);
            if !o.state.name.is_empty() && o.id != self.root {
                let _ = write!(out, " \"{}\"", o.state.name);
            }
            if o.state.selected {
                out.push_str(" [selected]");
            }
            if !o.state.visible {
                out.push_str(" [hidden]");
            }
            out.push('\n');
        });
        out
    }
}
