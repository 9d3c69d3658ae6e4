//! Reversible scene commands.
//!
//! A [`Command`] is one undoable edit. `perform` applies it and captures
//! whatever is needed to invert it, `undo` restores the captured state, and
//! `update_data` folds a newer command of the same type into this one while
//! keeping the original inversion data. Streamed edits (a drag, typing) send
//! a run of non-final commands that the [`SceneStore`](crate::store::SceneStore)
//! merges into one undo entry.
//!
//! Commands assume their ids were validated by the caller: a missing id is
//! an [`EditorError::MissingEntity`], never a silent no-op.

use crate::error::{EditorError, Result};
use crate::scene::{Forgotten, Scene};
use scenic_core::{Field, FieldValue, ObjectId, ObjectTree, Placement, Point};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Type tag of a command. Only commands with equal tags coalesce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    CreateObject,
    DeleteObject,
    SetField,
    MoveObject,
    SelectObjects,
    DeselectObjects,
    ParentObject,
    Multi,
}

impl CommandType {
    pub const ALL: [CommandType; 8] = [
        CommandType::CreateObject,
        CommandType::DeleteObject,
        CommandType::SetField,
        CommandType::MoveObject,
        CommandType::SelectObjects,
        CommandType::DeselectObjects,
        CommandType::ParentObject,
        CommandType::Multi,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            CommandType::CreateObject => "create-object",
            CommandType::DeleteObject => "delete-object",
            CommandType::SetField => "set-field",
            CommandType::MoveObject => "move-object",
            CommandType::SelectObjects => "select-objects",
            CommandType::DeselectObjects => "deselect-objects",
            CommandType::ParentObject => "parent-object",
            CommandType::Multi => "multi",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Can a non-final command of this type absorb a later one?
    pub fn updatable(&self) -> bool {
        !matches!(self, CommandType::CreateObject | CommandType::DeleteObject)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Index strategy for [`ParentObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParentStrategy {
    First,
    Last,
    /// Relative to the index the object had before the move.
    Offset(i64),
    /// Absolute index in the new parent, clamped to its child count.
    Absolute(usize),
}

// ─── Command envelope ────────────────────────────────────────────────────

/// One undoable edit: a diagnostic name, the final flag and the operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    name: String,
    is_final: bool,
    op: CommandOp,
}

/// The operation carried by a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOp {
    CreateObject(CreateObject),
    DeleteObject(DeleteObject),
    SetField(SetField),
    MoveObject(MoveObject),
    SelectObjects(SelectObjects),
    DeselectObjects(DeselectObjects),
    ParentObject(ParentObject),
    Multi(MultiCommand),
}

impl Command {
    pub fn from_op(op: CommandOp) -> Self {
        let kind = op.kind();
        Self {
            name: kind.tag().to_string(),
            is_final: true,
            op,
        }
    }

    pub fn create(parent: ObjectId, tree: ObjectTree, placement: Placement) -> Self {
        Self::from_op(CommandOp::CreateObject(CreateObject {
            parent,
            tree,
            placement,
        }))
    }

    pub fn delete(id: ObjectId) -> Self {
        Self::from_op(CommandOp::DeleteObject(DeleteObject { id, captured: None }))
    }

    pub fn set_field(id: ObjectId, field: Field, value: FieldValue) -> Self {
        Self::from_op(CommandOp::SetField(SetField {
            id,
            field,
            value,
            old: None,
        }))
    }

    pub fn move_to(id: ObjectId, to: Point) -> Self {
        Self::from_op(CommandOp::MoveObject(MoveObject { id, to, from: None }))
    }

    pub fn select(ids: Vec<ObjectId>) -> Self {
        Self::from_op(CommandOp::SelectObjects(SelectObjects { ids, captured: None }))
    }

    pub fn deselect(ids: Vec<ObjectId>) -> Self {
        Self::from_op(CommandOp::DeselectObjects(DeselectObjects { ids, captured: None }))
    }

    pub fn reparent(id: ObjectId, parent: ObjectId, strategy: ParentStrategy) -> Self {
        Self::from_op(CommandOp::ParentObject(ParentObject {
            id,
            parent,
            strategy,
            captured: None,
        }))
    }

    pub fn multi(commands: Vec<Command>) -> Self {
        Self::from_op(CommandOp::Multi(MultiCommand { commands }))
    }

    /// Replace the diagnostic name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the final flag. Types that cannot coalesce stay final.
    #[must_use]
    pub fn with_final(mut self, is_final: bool) -> Self {
        self.set_final(is_final);
        self
    }

    /// Shorthand for `with_final(false)`: part of a streamed edit.
    #[must_use]
    pub fn streaming(self) -> Self {
        self.with_final(false)
    }

    pub fn kind(&self) -> CommandType {
        self.op.kind()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn set_final(&mut self, is_final: bool) {
        self.is_final = is_final || !self.is_updatable();
    }

    pub fn is_updatable(&self) -> bool {
        self.kind().updatable()
    }

    pub fn op(&self) -> &CommandOp {
        &self.op
    }

    /// Apply the forward mutation, capturing inversion data first.
    pub fn perform(&mut self, scene: &mut Scene) -> Result<()> {
        log::trace!("perform {}", self.name);
        match &mut self.op {
            CommandOp::CreateObject(c) => c.perform(scene),
            CommandOp::DeleteObject(c) => c.perform(scene),
            CommandOp::SetField(c) => c.perform(scene),
            CommandOp::MoveObject(c) => c.perform(scene),
            CommandOp::SelectObjects(c) => c.perform(scene),
            CommandOp::DeselectObjects(c) => c.perform(scene),
            CommandOp::ParentObject(c) => c.perform(scene),
            CommandOp::Multi(c) => c.perform(scene),
        }
    }

    /// Restore the state captured by the last `perform`.
    pub fn undo(&mut self, scene: &mut Scene) -> Result<()> {
        log::trace!("undo {}", self.name);
        match &mut self.op {
            CommandOp::CreateObject(c) => c.undo(scene),
            CommandOp::DeleteObject(c) => c.undo(scene),
            CommandOp::SetField(c) => c.undo(scene),
            CommandOp::MoveObject(c) => c.undo(scene),
            CommandOp::SelectObjects(c) => c.undo(scene),
            CommandOp::DeselectObjects(c) => c.undo(scene),
            CommandOp::ParentObject(c) => c.undo(scene),
            CommandOp::Multi(c) => c.undo(scene),
        }
    }

    /// Fold `newer`'s effect into this command. Inversion data captured by
    /// this command is kept. The final flag is left to the caller.
    ///
    /// Nothing is changed unless the whole merge is valid.
    pub fn update_data(&mut self, newer: Command) -> Result<()> {
        self.check_update(&newer)?;
        match (&mut self.op, newer.op) {
            (CommandOp::SetField(a), CommandOp::SetField(b)) => a.value = b.value,
            (CommandOp::MoveObject(a), CommandOp::MoveObject(b)) => a.to = b.to,
            (CommandOp::SelectObjects(a), CommandOp::SelectObjects(b)) => a.ids = b.ids,
            (CommandOp::DeselectObjects(a), CommandOp::DeselectObjects(b)) => a.ids = b.ids,
            (CommandOp::ParentObject(a), CommandOp::ParentObject(b)) => {
                a.parent = b.parent;
                a.strategy = b.strategy;
            }
            (CommandOp::Multi(a), CommandOp::Multi(b)) => {
                for (mine, theirs) in a.commands.iter_mut().zip(b.commands) {
                    mine.update_data(theirs)?;
                }
            }
            (op, _) => return Err(EditorError::NotUpdatable(op.kind().tag())),
        }
        Ok(())
    }

    /// Would `update_data(newer)` succeed?
    pub fn check_update(&self, newer: &Command) -> Result<()> {
        match (&self.op, &newer.op) {
            (CommandOp::SetField(a), CommandOp::SetField(b)) => a.check(b),
            (CommandOp::MoveObject(a), CommandOp::MoveObject(b)) => a.check(b),
            (CommandOp::SelectObjects(_), CommandOp::SelectObjects(_))
            | (CommandOp::DeselectObjects(_), CommandOp::DeselectObjects(_)) => Ok(()),
            (CommandOp::ParentObject(a), CommandOp::ParentObject(b)) => a.check(b),
            (CommandOp::Multi(a), CommandOp::Multi(b)) => a.check(b),
            (op, _) if !op.kind().updatable() => Err(EditorError::NotUpdatable(op.kind().tag())),
            (op, found) => Err(EditorError::FieldMismatch {
                expected: op.kind().tag().to_string(),
                found: found.kind().tag().to_string(),
            }),
        }
    }
}

impl CommandOp {
    pub fn kind(&self) -> CommandType {
        match self {
            CommandOp::CreateObject(_) => CommandType::CreateObject,
            CommandOp::DeleteObject(_) => CommandType::DeleteObject,
            CommandOp::SetField(_) => CommandType::SetField,
            CommandOp::MoveObject(_) => CommandType::MoveObject,
            CommandOp::SelectObjects(_) => CommandType::SelectObjects,
            CommandOp::DeselectObjects(_) => CommandType::DeselectObjects,
            CommandOp::ParentObject(_) => CommandType::ParentObject,
            CommandOp::Multi(_) => CommandType::Multi,
        }
    }
}

// ─── Create / Delete ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct CreateObject {
    pub parent: ObjectId,
    pub tree: ObjectTree,
    pub placement: Placement,
}

impl CreateObject {
    fn perform(&mut self, scene: &mut Scene) -> Result<()> {
        scene.require(self.parent)?;
        // Every id in the subtree must be new, to the scene and to the tree.
        let mut seen = HashSet::new();
        for id in self.tree.ids() {
            if scene.registry().contains(id) || !seen.insert(id) {
                return Err(EditorError::DuplicateEntity(id));
            }
        }
        let id = self.tree.id();
        if !scene
            .registry_mut()
            .add_object(self.parent, self.tree.clone(), self.placement)
        {
            return Err(EditorError::MissingEntity(self.parent));
        }
        scene.adopt_flags(&self.tree.ids());
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<()> {
        let id = self.tree.id();
        scene.require(id)?;
        scene.forget(&self.tree.ids());
        if !scene.registry_mut().delete_object(id) {
            return Err(EditorError::MissingEntity(id));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteObject {
    pub id: ObjectId,
    captured: Option<Removed>,
}

/// Everything a delete needs to put the subtree back verbatim.
#[derive(Debug, Clone, PartialEq)]
struct Removed {
    tree: ObjectTree,
    parent: ObjectId,
    index: usize,
    lists: Forgotten,
}

impl DeleteObject {
    fn perform(&mut self, scene: &mut Scene) -> Result<()> {
        if self.id == scene.registry().root() {
            return Err(EditorError::RootImmutable("deleted"));
        }
        let object = scene.require(self.id)?;
        let parent = object.parent.ok_or(EditorError::MissingEntity(self.id))?;
        let index = scene
            .registry()
            .index_in_parent(self.id)
            .ok_or(EditorError::MissingEntity(parent))?;
        let tree = scene
            .registry()
            .capture(self.id)
            .ok_or(EditorError::MissingEntity(self.id))?;
        let lists = scene.forget(&tree.ids());
        scene.registry_mut().delete_object(self.id);
        self.captured = Some(Removed {
            tree,
            parent,
            index,
            lists,
        });
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<()> {
        let Some(removed) = &self.captured else {
            log::warn!("undo of delete {} before perform", self.id);
            return Ok(());
        };
        scene.require(removed.parent)?;
        scene
            .registry_mut()
            .insert_subtree(removed.parent, removed.tree.clone(), removed.index);
        scene.remember(&removed.lists);
        Ok(())
    }
}

// ─── SetField ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SetField {
    pub id: ObjectId,
    pub field: Field,
    pub value: FieldValue,
    old: Option<FieldValue>,
}

impl SetField {
    fn perform(&mut self, scene: &mut Scene) -> Result<()> {
        let not_applicable = EditorError::FieldNotApplicable {
            id: self.id,
            field: self.field,
        };
        let object = scene.require_mut(self.id)?;
        let Some(current) = object.field(self.field) else {
            return Err(not_applicable);
        };
        if !object.set_field(self.field, self.value.clone()) {
            return Err(not_applicable);
        }
        if self.old.is_none() {
            self.old = Some(current);
        }
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<()> {
        let Some(old) = self.old.clone() else {
            log::warn!("undo of set-field {}.{} before perform", self.id, self.field);
            return Ok(());
        };
        let object = scene.require_mut(self.id)?;
        object.set_field(self.field, old);
        Ok(())
    }

    fn check(&self, newer: &SetField) -> Result<()> {
        if newer.id != self.id || newer.field != self.field {
            return Err(EditorError::FieldMismatch {
                expected: format!("{}.{}", self.id, self.field),
                found: format!("{}.{}", newer.id, newer.field),
            });
        }
        Ok(())
    }
}

// ─── MoveObject ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct MoveObject {
    pub id: ObjectId,
    pub to: Point,
    from: Option<Point>,
}

impl MoveObject {
    fn perform(&mut self, scene: &mut Scene) -> Result<()> {
        let current = scene.require(self.id)?.position;
        self.from.get_or_insert(current);
        scene.place(self.id, self.to)
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<()> {
        match self.from {
            Some(from) => scene.place(self.id, from),
            None => {
                log::warn!("undo of move {} before perform", self.id);
                Ok(())
            }
        }
    }

    fn check(&self, newer: &MoveObject) -> Result<()> {
        if newer.id != self.id {
            return Err(EditorError::FieldMismatch {
                expected: format!("{}.position", self.id),
                found: format!("{}.position", newer.id),
            });
        }
        Ok(())
    }
}

// ─── Selection ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SelectObjects {
    pub ids: Vec<ObjectId>,
    /// Ids this command actually selected, in order.
    captured: Option<Vec<ObjectId>>,
}

impl SelectObjects {
    /// A second perform (after a merge) starts from the selection as it was
    /// before the first one.
    fn perform(&mut self, scene: &mut Scene) -> Result<()> {
        for id in &self.ids {
            scene.require(*id)?;
        }
        self.restore(scene)?;
        let mut captured = Vec::new();
        for id in &self.ids {
            if scene.select(*id)? {
                captured.push(*id);
            }
        }
        self.captured = Some(captured);
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<()> {
        if self.captured.is_none() {
            log::warn!("undo of select {:?} before perform", self.ids);
        }
        self.restore(scene)
    }

    fn restore(&mut self, scene: &mut Scene) -> Result<()> {
        for id in self.captured.take().unwrap_or_default().into_iter().rev() {
            scene.deselect(id)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeselectObjects {
    pub ids: Vec<ObjectId>,
    /// Ids this command actually deselected with the list index each one
    /// held at the moment it was removed.
    captured: Option<Vec<(ObjectId, usize)>>,
}

impl DeselectObjects {
    fn perform(&mut self, scene: &mut Scene) -> Result<()> {
        for id in &self.ids {
            scene.require(*id)?;
        }
        self.restore(scene)?;
        let mut captured = Vec::new();
        for id in &self.ids {
            if let Some(index) = scene.deselect(*id)? {
                captured.push((*id, index));
            }
        }
        self.captured = Some(captured);
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<()> {
        if self.captured.is_none() {
            log::warn!("undo of deselect {:?} before perform", self.ids);
        }
        self.restore(scene)
    }

    fn restore(&mut self, scene: &mut Scene) -> Result<()> {
        for (id, index) in self.captured.take().unwrap_or_default().into_iter().rev() {
            scene.reselect_at(id, index)?;
        }
        Ok(())
    }
}

// ─── ParentObject ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ParentObject {
    pub id: ObjectId,
    pub parent: ObjectId,
    pub strategy: ParentStrategy,
    /// Parent and index before the first perform.
    captured: Option<(ObjectId, usize)>,
}

impl ParentObject {
    fn perform(&mut self, scene: &mut Scene) -> Result<()> {
        if self.id == scene.registry().root() {
            return Err(EditorError::RootImmutable("reparented"));
        }
        scene.require(self.id)?;
        scene.require(self.parent)?;
        if scene.registry().is_descendant(self.parent, self.id) {
            return Err(EditorError::Cycle {
                id: self.id,
                parent: self.parent,
            });
        }
        let old_parent = scene
            .registry()
            .parent_of(self.id)
            .ok_or(EditorError::MissingEntity(self.id))?;

        // Detach first: the target index is computed against the new
        // parent's children without this object in them.
        let old_index = scene
            .registry_mut()
            .detach(self.id)
            .ok_or(EditorError::MissingEntity(old_parent))?;
        let (_, base) = *self.captured.get_or_insert((old_parent, old_index));

        let len = scene.registry().children(self.parent).len();
        let target = match self.strategy {
            ParentStrategy::First => 0,
            ParentStrategy::Last => len,
            ParentStrategy::Offset(delta) => {
                (base as i64).saturating_add(delta).clamp(0, len as i64) as usize
            }
            ParentStrategy::Absolute(index) => index.min(len),
        };
        scene.registry_mut().attach(self.id, self.parent, target);
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<()> {
        let Some((parent, index)) = self.captured else {
            log::warn!("undo of reparent {} before perform", self.id);
            return Ok(());
        };
        scene.require(self.id)?;
        scene.require(parent)?;
        scene.registry_mut().detach(self.id);
        scene.registry_mut().attach(self.id, parent, index);
        Ok(())
    }

    fn check(&self, newer: &ParentObject) -> Result<()> {
        if newer.id != self.id {
            return Err(EditorError::FieldMismatch {
                expected: format!("{}.parent", self.id),
                found: format!("{}.parent", newer.id),
            });
        }
        Ok(())
    }
}

// ─── MultiCommand ────────────────────────────────────────────────────────

/// An ordered composite. Performs forward, undoes in strict reverse.
///
/// There is no rollback: if a sub-command fails, the ones before it stay
/// applied and the error is returned.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiCommand {
    pub commands: Vec<Command>,
}

impl MultiCommand {
    fn perform(&mut self, scene: &mut Scene) -> Result<()> {
        for command in &mut self.commands {
            command.perform(scene)?;
        }
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<()> {
        for command in self.commands.iter_mut().rev() {
            command.undo(scene)?;
        }
        Ok(())
    }

    /// Same shape, and every child pair merges.
    fn check(&self, newer: &MultiCommand) -> Result<()> {
        let shape = |cs: &[Command]| cs.iter().map(|c| c.kind().tag()).collect::<Vec<_>>();
        if shape(&self.commands) != shape(&newer.commands) {
            return Err(EditorError::FieldMismatch {
                expected: format!("multi{:?}", shape(&self.commands)),
                found: format!("multi{:?}", shape(&newer.commands)),
            });
        }
        self.commands
            .iter()
            .zip(&newer.commands)
            .try_for_each(|(mine, theirs)| mine.check_update(theirs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scenic_core::{ObjectKind, SceneObject, Size};

    fn canvas(name: &str) -> ObjectTree {
        ObjectTree::leaf(SceneObject::new(ObjectId::intern(name), ObjectKind::Canvas {
            size: Size::new(10.0, 10.0),
        }))
    }

    fn scene_with(names: &[&str]) -> Scene {
        let mut scene = Scene::new();
        let root = scene.registry().root();
        for name in names {
            Command::create(root, canvas(name), Placement::Last)
                .perform(&mut scene)
                .unwrap();
        }
        scene
    }

    #[test]
    fn tags_round_trip() {
        for kind in CommandType::ALL {
            assert_eq!(CommandType::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(CommandType::from_tag("nope"), None);
    }

    #[test]
    fn create_stays_final() {
        let cmd = Command::create(ObjectId::root(), canvas("cmd_final"), Placement::Last).streaming();
        assert!(cmd.is_final());
        assert!(!cmd.is_updatable());
    }

    #[test]
    fn create_twice_is_duplicate() {
        let mut scene = scene_with(&["cmd_dup"]);
        let err = Command::create(scene.registry().root(), canvas("cmd_dup"), Placement::Last)
            .perform(&mut scene)
            .unwrap_err();
        assert!(matches!(err, EditorError::DuplicateEntity(_)));
    }

    #[test]
    fn set_field_keeps_first_old_value() {
        let mut scene = scene_with(&["cmd_sf"]);
        let id = ObjectId::intern("cmd_sf");
        let mut cmd = Command::set_field(id, Field::Name, FieldValue::Text("one".into()));
        cmd.perform(&mut scene).unwrap();
        cmd.update_data(Command::set_field(id, Field::Name, FieldValue::Text("two".into())))
            .unwrap();
        cmd.perform(&mut scene).unwrap();
        assert_eq!(scene.require(id).unwrap().state.name, "two");
        cmd.undo(&mut scene).unwrap();
        assert_eq!(scene.require(id).unwrap().state.name, "");
    }

    #[test]
    fn set_field_on_other_field_is_mismatch() {
        let id = ObjectId::intern("cmd_mm");
        let mut cmd = Command::set_field(id, Field::Visible, FieldValue::Bool(false));
        let err = cmd
            .update_data(Command::set_field(id, Field::Locked, FieldValue::Bool(true)))
            .unwrap_err();
        assert!(matches!(err, EditorError::FieldMismatch { .. }));
    }

    #[test]
    fn set_field_not_carried_by_kind() {
        let mut scene = scene_with(&["cmd_na"]);
        let err = Command::set_field(
            ObjectId::intern("cmd_na"),
            Field::Content,
            FieldValue::Text("x".into()),
        )
        .perform(&mut scene)
        .unwrap_err();
        assert!(matches!(err, EditorError::FieldNotApplicable { .. }));
    }

    #[test]
    fn missing_entity_is_fatal() {
        let mut scene = Scene::new();
        let ghost = ObjectId::intern("cmd_ghost");
        for mut cmd in [
            Command::move_to(ghost, Point::new(1.0, 1.0)),
            Command::delete(ghost),
            Command::select(vec![ghost]),
            Command::set_field(ghost, Field::Visible, FieldValue::Bool(true)),
        ] {
            let err = cmd.perform(&mut scene).unwrap_err();
            assert!(matches!(err, EditorError::MissingEntity(id) if id == ghost));
        }
    }

    #[test]
    fn deselect_restores_list_positions() {
        let mut scene = scene_with(&["cmd_s1", "cmd_s2", "cmd_s3"]);
        let ids: Vec<_> = ["cmd_s1", "cmd_s2", "cmd_s3"]
            .iter()
            .map(|n| ObjectId::intern(n))
            .collect();
        Command::select(ids.clone()).perform(&mut scene).unwrap();

        let mut cmd = Command::deselect(vec![ids[2], ids[0]]);
        cmd.perform(&mut scene).unwrap();
        assert_eq!(scene.selection(), &[ids[1]]);
        cmd.undo(&mut scene).unwrap();
        assert_eq!(scene.selection(), ids.as_slice());
    }

    #[test]
    fn select_undo_only_touches_captured_ids() {
        let mut scene = scene_with(&["cmd_p1", "cmd_p2"]);
        let a = ObjectId::intern("cmd_p1");
        let b = ObjectId::intern("cmd_p2");
        Command::select(vec![a]).perform(&mut scene).unwrap();

        let mut cmd = Command::select(vec![a, b]);
        cmd.perform(&mut scene).unwrap();
        cmd.undo(&mut scene).unwrap();
        assert_eq!(scene.selection(), &[a]);
        assert!(scene.require(a).unwrap().state.selected);
        assert!(!scene.require(b).unwrap().state.selected);
    }

    #[test]
    fn reparent_refuses_cycles() {
        let mut scene = scene_with(&["cmd_outer"]);
        let outer = ObjectId::intern("cmd_outer");
        Command::create(outer, canvas("cmd_inner"), Placement::Last)
            .perform(&mut scene)
            .unwrap();
        let err = Command::reparent(outer, ObjectId::intern("cmd_inner"), ParentStrategy::Last)
            .perform(&mut scene)
            .unwrap_err();
        assert!(matches!(err, EditorError::Cycle { .. }));
        scene.registry().validate().unwrap();
    }

    #[test]
    fn reparent_offset_is_relative_to_old_index() {
        let mut scene = scene_with(&["cmd_o1", "cmd_o2", "cmd_o3", "cmd_o4"]);
        let root = scene.registry().root();
        let o2 = ObjectId::intern("cmd_o2");
        let mut cmd = Command::reparent(o2, root, ParentStrategy::Offset(2));
        cmd.perform(&mut scene).unwrap();
        assert_eq!(scene.registry().index_in_parent(o2), Some(3));
        cmd.undo(&mut scene).unwrap();
        assert_eq!(scene.registry().index_in_parent(o2), Some(1));

        let mut far = Command::reparent(o2, root, ParentStrategy::Offset(-9));
        far.perform(&mut scene).unwrap();
        assert_eq!(scene.registry().index_in_parent(o2), Some(0));
    }

    #[test]
    fn undo_before_perform_changes_nothing() {
        let mut scene = scene_with(&["cmd_early"]);
        let id = ObjectId::intern("cmd_early");
        let root = scene.registry().root();
        scene.select(id).unwrap();
        for mut cmd in [
            Command::delete(id),
            Command::set_field(id, Field::Visible, FieldValue::Bool(false)),
            Command::move_to(id, Point::new(4.0, 4.0)),
            Command::select(vec![id]),
            Command::deselect(vec![id]),
            Command::reparent(id, root, ParentStrategy::First),
        ] {
            cmd.undo(&mut scene).unwrap();
        }
        assert_eq!(scene.selection(), &[id]);
        assert!(scene.require(id).unwrap().state.visible);
        scene.registry().validate().unwrap();
    }

    #[test]
    fn multi_merge_checks_every_child_first() {
        let [a, b, c] = ["cmd_mc_a", "cmd_mc_b", "cmd_mc_c"].map(ObjectId::intern);
        let mut multi = Command::multi(vec![
            Command::move_to(a, Point::ZERO),
            Command::move_to(b, Point::ZERO),
        ]);
        let before = multi.clone();
        let err = multi
            .update_data(Command::multi(vec![
                Command::move_to(a, Point::new(3.0, 3.0)),
                Command::move_to(c, Point::new(3.0, 3.0)),
            ]))
            .unwrap_err();
        assert!(matches!(err, EditorError::FieldMismatch { .. }));
        assert_eq!(multi, before);
    }

    #[test]
    fn multi_update_requires_same_shape() {
        let a = ObjectId::intern("cmd_ma");
        let mut multi = Command::multi(vec![Command::move_to(a, Point::ZERO)]);
        let err = multi
            .update_data(Command::multi(vec![
                Command::move_to(a, Point::ZERO),
                Command::move_to(a, Point::ZERO),
            ]))
            .unwrap_err();
        assert!(matches!(err, EditorError::FieldMismatch { .. }));
    }

    #[test]
    fn create_update_is_not_updatable() {
        let mut cmd = Command::create(ObjectId::root(), canvas("cmd_nu"), Placement::Last);
        let err = cmd
            .update_data(Command::create(ObjectId::root(), canvas("cmd_nu2"), Placement::Last))
            .unwrap_err();
        assert!(matches!(err, EditorError::NotUpdatable("create-object")));
    }
}
