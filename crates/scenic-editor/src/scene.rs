//! The mutable scene: registry plus the flat selection and hover lists.
//!
//! Commands mutate a `Scene` only through the helpers here, which keep the
//! per-object `selected`/`hovered` flags and the flat lists in agreement.

use crate::error::{EditorError, Result};
use scenic_core::{ObjectId, ObjectKind, Point, Registry, SceneObject};

#[derive(Debug, Clone, Default)]
pub struct Scene {
    registry: Registry,
    selection: Vec<ObjectId>,
    hovered: Vec<ObjectId>,
}

/// List positions removed by [`Scene::forget`], in removal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forgotten {
    selection: Vec<(ObjectId, usize)>,
    hovered: Vec<(ObjectId, usize)>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Direct registry access. Changes made here bypass undo.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Selected ids, in selection order.
    pub fn selection(&self) -> &[ObjectId] {
        &self.selection
    }

    /// Selected objects, resolved through the registry.
    pub fn selected_objects(&self) -> Vec<&SceneObject> {
        self.selection
            .iter()
            .filter_map(|id| self.registry.get(*id))
            .collect()
    }

    pub fn hovered(&self) -> &[ObjectId] {
        &self.hovered
    }

    pub fn is_selected(&self, id: ObjectId) -> bool {
        self.selection.contains(&id)
    }

    pub fn require(&self, id: ObjectId) -> Result<&SceneObject> {
        self.registry.get(id).ok_or(EditorError::MissingEntity(id))
    }

    pub fn require_mut(&mut self, id: ObjectId) -> Result<&mut SceneObject> {
        self.registry
            .get_mut(id)
            .ok_or(EditorError::MissingEntity(id))
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Mark `id` selected. Returns false if it already was.
    pub(crate) fn select(&mut self, id: ObjectId) -> Result<bool> {
        let object = self.require_mut(id)?;
        object.state.selected = true;
        if self.selection.contains(&id) {
            return Ok(false);
        }
        self.selection.push(id);
        Ok(true)
    }

    /// Clear `id`'s selection. Returns the list index it occupied, or None
    /// if it was not selected.
    pub(crate) fn deselect(&mut self, id: ObjectId) -> Result<Option<usize>> {
        let object = self.require_mut(id)?;
        object.state.selected = false;
        let index = self.selection.iter().position(|s| *s == id);
        if let Some(index) = index {
            self.selection.remove(index);
        }
        Ok(index)
    }

    /// Re-select `id` at a specific list position (inverse of `deselect`).
    pub(crate) fn reselect_at(&mut self, id: ObjectId, index: usize) -> Result<()> {
        self.require_mut(id)?.state.selected = true;
        if !self.selection.contains(&id) {
            let at = index.min(self.selection.len());
            self.selection.insert(at, id);
        }
        Ok(())
    }

    // ─── Hover ───────────────────────────────────────────────────────────

    /// Returns false if `id` is unknown.
    pub(crate) fn set_hovered(&mut self, id: ObjectId, hovered: bool) -> bool {
        let Some(object) = self.registry.get_mut(id) else {
            return false;
        };
        object.state.hovered = hovered;
        let listed = self.hovered.iter().position(|h| *h == id);
        match (hovered, listed) {
            (true, None) => self.hovered.push(id),
            (false, Some(index)) => {
                self.hovered.remove(index);
            }
            _ => {}
        }
        true
    }

    // ─── Bulk list maintenance ───────────────────────────────────────────

    /// Drop `ids` from the selection and hover lists, leaving the objects'
    /// flags untouched. Used when the objects leave the registry.
    pub(crate) fn forget(&mut self, ids: &[ObjectId]) -> Forgotten {
        let mut forgotten = Forgotten::default();
        for id in ids {
            if let Some(index) = self.selection.iter().position(|s| s == id) {
                self.selection.remove(index);
                forgotten.selection.push((*id, index));
            }
            if let Some(index) = self.hovered.iter().position(|h| h == id) {
                self.hovered.remove(index);
                forgotten.hovered.push((*id, index));
            }
        }
        forgotten
    }

    /// Put back what `forget` removed, in reverse order so every index is
    /// valid again when it is used.
    pub(crate) fn remember(&mut self, forgotten: &Forgotten) {
        for (id, index) in forgotten.selection.iter().rev() {
            self.selection.insert((*index).min(self.selection.len()), *id);
        }
        for (id, index) in forgotten.hovered.iter().rev() {
            self.hovered.insert((*index).min(self.hovered.len()), *id);
        }
    }

    /// List objects among `ids` whose flags say selected/hovered.
    pub(crate) fn adopt_flags(&mut self, ids: &[ObjectId]) {
        for id in ids {
            let Some(object) = self.registry.get(*id) else {
                continue;
            };
            if object.state.selected && !self.selection.contains(id) {
                self.selection.push(*id);
            }
            if object.state.hovered && !self.hovered.contains(id) {
                self.hovered.push(*id);
            }
        }
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    /// Set an object's position. A vector node also rewrites every vertex
    /// that references it in the owning vector's segment list.
    pub(crate) fn place(&mut self, id: ObjectId, to: Point) -> Result<()> {
        let object = self.require_mut(id)?;
        object.position = to;
        let owner = match object.kind {
            ObjectKind::Node => object.parent,
            _ => None,
        };
        let Some(owner) = owner else {
            return Ok(());
        };
        if let Some(vector) = self.registry.get_mut(owner)
            && let ObjectKind::Vector { segments } = &mut vector.kind
        {
            for segment in segments.iter_mut() {
                for vertex in [&mut segment.start, &mut segment.end] {
                    if vertex.node == id {
                        vertex.position = to;
                    }
                }
            }
        }
        Ok(())
    }
}
