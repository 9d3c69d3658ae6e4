//! Scene store: undo/redo stacks over a [`Scene`].
//!
//! Every edit goes through [`SceneStore::do_command`], which either pushes
//! a fresh command or merges it into a non-final stack top:
//!
//! | stack top            | incoming      | result                         |
//! |----------------------|---------------|--------------------------------|
//! | none / final         | any           | perform, push, clear redo      |
//! | non-final, same type | any           | merge into top, re-perform top |
//! | non-final, other type| any           | `ProtocolViolation`            |
//!
//! Observers are told about committed changes once the outermost batch
//! closes, never in the middle of a multi-step edit.

use crate::bag::Bag;
use crate::commands::Command;
use crate::error::{EditorError, Result};
use crate::scene::Scene;
use scenic_core::ObjectId;

/// What an observer is told after a batch commits.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneChange {
    Performed(String),
    Merged(String),
    Undone(String),
    Redone(String),
    Cancelled(String),
    Hovered(ObjectId),
    Unhovered(ObjectId),
}

pub type Observer = Box<dyn FnMut(&[SceneChange], &Scene)>;

pub struct SceneStore {
    scene: Scene,
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    history_limit: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Changes collected during the current batch.
    pending: Vec<SceneChange>,
    observers: Vec<Observer>,
}

impl SceneStore {
    pub fn new(history_limit: usize) -> Self {
        Self::with_scene(Scene::new(), history_limit)
    }

    pub fn with_scene(scene: Scene, history_limit: usize) -> Self {
        Self {
            scene,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            history_limit: history_limit.max(1),
            batch_depth: 0,
            pending: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Untracked access, for seeding a document. Nothing here is undoable.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&[SceneChange], &Scene) + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ─── Batching ────────────────────────────────────────────────────────

    /// Open a batch. Nested batches are folded into the outermost one.
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close a batch. Closing the outermost one notifies observers with
    /// every change collected since it opened.
    pub fn end_batch(&mut self) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 && !self.pending.is_empty() {
            let changes = std::mem::take(&mut self.pending);
            for observer in &mut self.observers {
                observer(&changes, &self.scene);
            }
        }
    }

    /// Run `f` inside a batch.
    pub fn batch<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.begin_batch();
        let out = f(self);
        self.end_batch();
        out
    }

    // ─── Dispatch ────────────────────────────────────────────────────────

    /// Push `command` as a fresh edit or merge it into a non-final top.
    pub fn do_command(&mut self, command: Command) -> Result<()> {
        self.batch(|store| store.apply(command))
    }

    fn apply(&mut self, command: Command) -> Result<()> {
        if let Some(top) = self.undo_stack.last_mut()
            && !top.is_final()
        {
            if top.kind() != command.kind() {
                return Err(EditorError::ProtocolViolation {
                    pending: top.kind().tag(),
                    incoming: command.kind().tag(),
                });
            }
            let is_final = command.is_final();
            top.update_data(command)?;
            top.set_final(is_final);
            top.perform(&mut self.scene)?;
            log::trace!("merged into {} (final: {is_final})", top.name());
            self.pending.push(SceneChange::Merged(top.name().to_string()));
            return Ok(());
        }

        let mut command = command;
        command.perform(&mut self.scene)?;
        log::debug!("push {} (final: {})", command.name(), command.is_final());
        self.pending
            .push(SceneChange::Performed(command.name().to_string()));
        self.undo_stack.push(command);
        if self.undo_stack.len() > self.history_limit {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        Ok(())
    }

    /// Undo the last command. A non-final top is finalized first.
    pub fn undo(&mut self) -> Result<Option<String>> {
        self.batch(|store| {
            let Some(mut command) = store.undo_stack.pop() else {
                return Ok(None);
            };
            command.set_final(true);
            if let Err(e) = command.undo(&mut store.scene) {
                store.undo_stack.push(command);
                return Err(e);
            }
            let name = command.name().to_string();
            log::debug!("undo {name}");
            store.pending.push(SceneChange::Undone(name.clone()));
            store.redo_stack.push(command);
            Ok(Some(name))
        })
    }

    /// Redo the last undone command.
    pub fn redo(&mut self) -> Result<Option<String>> {
        self.batch(|store| {
            let Some(mut command) = store.redo_stack.pop() else {
                return Ok(None);
            };
            if let Err(e) = command.perform(&mut store.scene) {
                store.redo_stack.push(command);
                return Err(e);
            }
            let name = command.name().to_string();
            log::debug!("redo {name}");
            store.pending.push(SceneChange::Redone(name.clone()));
            store.undo_stack.push(command);
            Ok(Some(name))
        })
    }

    /// End a streamed edit without sending another command.
    /// Returns true if a non-final top was finalized.
    pub fn commit_pending(&mut self) -> bool {
        match self.undo_stack.last_mut() {
            Some(top) if !top.is_final() => {
                top.set_final(true);
                log::debug!("commit {}", top.name());
                true
            }
            _ => false,
        }
    }

    /// Abandon a streamed edit: undo the non-final top and drop it.
    /// Returns true if there was one.
    pub fn cancel_pending(&mut self) -> Result<bool> {
        self.batch(|store| {
            let Some(top) = store.undo_stack.last() else {
                return Ok(false);
            };
            if top.is_final() {
                return Ok(false);
            }
            let Some(mut command) = store.undo_stack.pop() else {
                return Ok(false);
            };
            command.undo(&mut store.scene)?;
            log::debug!("cancel {}", command.name());
            store
                .pending
                .push(SceneChange::Cancelled(command.name().to_string()));
            Ok(true)
        })
    }

    /// Is the undo-stack top a streamed edit still waiting to be finalized?
    pub fn has_pending(&self) -> bool {
        self.undo_stack.last().is_some_and(|c| !c.is_final())
    }

    // ─── Hover (not undo-tracked) ────────────────────────────────────────

    pub fn hover(&mut self, id: ObjectId) -> bool {
        self.set_hover(id, true)
    }

    pub fn unhover(&mut self, id: ObjectId) -> bool {
        self.set_hover(id, false)
    }

    fn set_hover(&mut self, id: ObjectId, hovered: bool) -> bool {
        self.batch(|store| {
            if !store.scene.set_hovered(id, hovered) {
                log::warn!("cannot (un)hover {id}: not found");
                return false;
            }
            store.pending.push(if hovered {
                SceneChange::Hovered(id)
            } else {
                SceneChange::Unhovered(id)
            });
            true
        })
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn peek_undo(&self) -> Option<&Command> {
        self.undo_stack.last()
    }

    /// The undo stack as bags, oldest first.
    pub fn history_bags(&self) -> Result<Vec<Bag>> {
        self.undo_stack.iter().map(Command::to_bag).collect()
    }

    /// Rebuild commands from bags and dispatch them in order.
    pub fn replay(&mut self, bags: &[Bag]) -> Result<()> {
        self.batch(|store| {
            for bag in bags {
                store.apply(Command::from_bag(bag)?)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scenic_core::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store_with(names: &[&str]) -> SceneStore {
        let mut store = SceneStore::new(100);
        let root = store.scene().registry().root();
        for name in names {
            let object = SceneObject::new(ObjectId::intern(name), ObjectKind::Group);
            store
                .scene_mut()
                .registry_mut()
                .add_object(root, ObjectTree::leaf(object), Placement::Last);
        }
        store
    }

    #[test]
    fn fresh_push_clears_redo() {
        let mut store = store_with(&["st_a"]);
        let a = ObjectId::intern("st_a");
        store
            .do_command(Command::move_to(a, Point::new(1.0, 0.0)))
            .unwrap();
        store.undo().unwrap();
        assert!(store.can_redo());
        store
            .do_command(Command::move_to(a, Point::new(2.0, 0.0)))
            .unwrap();
        assert!(!store.can_redo());
    }

    #[test]
    fn history_limit_trims_oldest() {
        let mut store = SceneStore::new(3);
        let root = store.scene().registry().root();
        store.scene_mut().registry_mut().add_object(
            root,
            ObjectTree::leaf(SceneObject::new(ObjectId::intern("st_lim"), ObjectKind::Group)),
            Placement::Last,
        );
        for i in 0..5 {
            store
                .do_command(Command::move_to(
                    ObjectId::intern("st_lim"),
                    Point::new(i as f64, 0.0),
                ))
                .unwrap();
        }
        let mut undone = 0;
        while store.undo().unwrap().is_some() {
            undone += 1;
        }
        assert_eq!(undone, 3);
    }

    #[test]
    fn undo_on_empty_is_noop() {
        let mut store = SceneStore::new(10);
        assert_eq!(store.undo().unwrap(), None);
        assert_eq!(store.redo().unwrap(), None);
    }

    #[test]
    fn cancel_drops_the_streamed_edit() {
        let mut store = store_with(&["st_c"]);
        let c = ObjectId::intern("st_c");
        for x in [1.0, 2.0, 3.0] {
            store
                .do_command(Command::move_to(c, Point::new(x, 0.0)).streaming())
                .unwrap();
        }
        assert!(store.has_pending());
        assert!(store.cancel_pending().unwrap());
        assert_eq!(store.scene().require(c).unwrap().position, Point::ZERO);
        assert!(!store.can_undo());
        assert!(!store.can_redo());
        assert!(!store.cancel_pending().unwrap());
    }

    #[test]
    fn commit_finalizes_top() {
        let mut store = store_with(&["st_k"]);
        let k = ObjectId::intern("st_k");
        store
            .do_command(Command::move_to(k, Point::new(4.0, 4.0)).streaming())
            .unwrap();
        assert!(store.commit_pending());
        assert!(!store.commit_pending());
        // A different type may now follow.
        store.do_command(Command::select(vec![k])).unwrap();
        assert_eq!(store.undo_len(), 2);
    }

    #[test]
    fn undo_finalizes_a_pending_top() {
        let mut store = store_with(&["st_u"]);
        let u = ObjectId::intern("st_u");
        store
            .do_command(Command::move_to(u, Point::new(5.0, 0.0)).streaming())
            .unwrap();
        store.undo().unwrap();
        store.redo().unwrap();
        assert!(store.peek_undo().unwrap().is_final());
    }

    #[test]
    fn observers_see_one_notification_per_batch() {
        let mut store = store_with(&["st_o"]);
        let o = ObjectId::intern("st_o");
        let seen: Rc<RefCell<Vec<Vec<SceneChange>>>> = Rc::default();
        let sink = seen.clone();
        store.subscribe(move |changes, _| sink.borrow_mut().push(changes.to_vec()));

        store.begin_batch();
        store.do_command(Command::select(vec![o])).unwrap();
        store.hover(o);
        assert!(seen.borrow().is_empty());
        store.end_batch();

        assert_eq!(
            *seen.borrow(),
            vec![vec![
                SceneChange::Performed("select-objects".into()),
                SceneChange::Hovered(o),
            ]]
        );
    }

    #[test]
    fn hover_unknown_is_soft() {
        let mut store = SceneStore::new(10);
        assert!(!store.hover(ObjectId::intern("st_missing")));
        assert!(store.scene().hovered().is_empty());
    }

    #[test]
    fn replay_rebuilds_history() {
        let mut store = store_with(&["st_r"]);
        let r = ObjectId::intern("st_r");
        store
            .do_command(Command::move_to(r, Point::new(7.0, 1.0)))
            .unwrap();
        store.do_command(Command::select(vec![r])).unwrap();
        let bags = store.history_bags().unwrap();

        let mut fresh = store_with(&["st_r"]);
        fresh.replay(&bags).unwrap();
        assert_eq!(fresh.undo_len(), 2);
        assert_eq!(
            fresh.scene().require(r).unwrap().position,
            Point::new(7.0, 1.0)
        );
        assert_eq!(fresh.scene().selection(), &[r]);
    }
}
