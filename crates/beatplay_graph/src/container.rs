// SPDX-License-Identifier: MIT OR Apache-2.0
//! Owner of all playback objects.
//!
//! Parent references are stored by identifier and resolved to tree indices
//! lazily: a child whose parent does not exist yet waits until an object
//! with that identifier is inserted.

use crate::arena::{ArenaError, ArenaEvent, IndexedTree, Result};
use crate::identifier::Identifier;
use crate::object::PlaybackObject;
use crate::pipeline::DEFAULT_MAX_PARENT_DEPTH;
use crate::text_cache::ShapedTextCache;
use std::collections::{BTreeSet, HashMap};

/// Change that affects alive-object scheduling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleChange {
    /// Object stored at this index
    Inserted(usize),
    /// Object removed from this index
    Removed(usize),
    /// Start time, end time or visibility changed
    Updated(usize),
}

impl ScheduleChange {
    /// Affected index
    pub fn index(self) -> usize {
        match self {
            ScheduleChange::Inserted(index) | ScheduleChange::Removed(index) | ScheduleChange::Updated(index) => index,
        }
    }
}

/// Indexed tree of playback objects with scheduling notifications
#[derive(Debug, Default)]
pub struct PlaybackObjectContainer {
    tree: IndexedTree<PlaybackObject>,
    waiting: HashMap<Identifier, BTreeSet<usize>>,
    changes: Vec<ScheduleChange>,
    text_cache: ShapedTextCache,
}

impl PlaybackObjectContainer {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object, linking it to its parent and adopting children
    /// that were waiting for its identifier.
    pub fn insert(&mut self, object: PlaybackObject) -> Result<usize> {
        let id = object.id().clone();
        let parent = object.parent_id.clone();
        let index = self.tree.add(|_| object)?;
        self.collect_arena_events();
        self.text_cache.invalidate(&id);

        self.link_parent(index, parent.as_ref());
        if let Some(children) = self.waiting.remove(&id) {
            for child in children {
                self.tree.set_parent(child, Some(index))?;
            }
        }
        Ok(index)
    }

    /// Remove the object at `index`. Its children keep their parent
    /// identifier and wait for a replacement.
    pub fn remove(&mut self, index: usize) -> Option<PlaybackObject> {
        let parent = self.tree.get(index)?.parent_id.clone();
        if let Some(parent) = parent {
            self.unwait(&parent, index);
        }

        let children: Vec<usize> = self.tree.children_of(index).collect();
        let object = self.tree.remove(index)?;
        self.collect_arena_events();
        self.text_cache.invalidate(object.id());

        if !children.is_empty() {
            self.waiting.entry(object.id().clone()).or_default().extend(children);
        }
        Some(object)
    }

    /// Remove the object with `id`
    pub fn remove_by_id(&mut self, id: &Identifier) -> Option<(usize, PlaybackObject)> {
        let index = self.tree.index_of(id)?;
        self.remove(index).map(|object| (index, object))
    }

    /// Point the object at `index` to a parent identifier (or none)
    pub fn set_parent(&mut self, index: usize, parent: Option<Identifier>) -> Result<()> {
        let object = self.tree.get_mut(index).ok_or(ArenaError::UnknownIndex(index))?;
        let previous = std::mem::replace(&mut object.parent_id, parent.clone());
        if let Some(previous) = previous {
            self.unwait(&previous, index);
        }
        self.link_parent(index, parent.as_ref());
        Ok(())
    }

    /// Index of the resolved parent of `index`
    pub fn try_get_parent_index(&self, index: usize) -> Option<usize> {
        self.tree.parent_of(index)
    }

    /// Change the alive range of the object at `index`
    pub fn set_times(&mut self, index: usize, start_time: f32, end_time: f32) -> Result<()> {
        let object = self.tree.get_mut(index).ok_or(ArenaError::UnknownIndex(index))?;
        if object.start_time != start_time || object.end_time != end_time {
            object.start_time = start_time;
            object.end_time = end_time;
            self.changes.push(ScheduleChange::Updated(index));
        }
        Ok(())
    }

    /// Change the visibility of the object at `index`
    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        let object = self.tree.get_mut(index).ok_or(ArenaError::UnknownIndex(index))?;
        if object.visible != visible {
            object.visible = visible;
            self.changes.push(ScheduleChange::Updated(index));
        }
        Ok(())
    }

    /// Change the text of the object at `index`, invalidating its shaped text
    pub fn set_text(&mut self, index: usize, text: Option<String>) -> Result<()> {
        let object = self.tree.get_mut(index).ok_or(ArenaError::UnknownIndex(index))?;
        object.text = text;
        self.text_cache.invalidate(object.id());
        Ok(())
    }

    /// Take the pending scheduling changes
    pub fn take_schedule_changes(&mut self) -> Vec<ScheduleChange> {
        std::mem::take(&mut self.changes)
    }

    /// Whether scheduling changes are pending
    pub fn has_schedule_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Object at `index`
    pub fn get(&self, index: usize) -> Option<&PlaybackObject> {
        self.tree.get(index)
    }

    /// Mutable object at `index`.
    ///
    /// Times, visibility, parent and text are changed through the container
    /// methods instead.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut PlaybackObject> {
        self.tree.get_mut(index)
    }

    /// Object with `id`
    pub fn get_by_id(&self, id: &Identifier) -> Option<&PlaybackObject> {
        self.tree.arena().get_by_id(id)
    }

    /// Index of the object with `id`
    pub fn index_of(&self, id: &Identifier) -> Option<usize> {
        self.tree.index_of(id)
    }

    /// Live objects in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &PlaybackObject)> + '_ {
        self.tree.arena().iter()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.tree.arena().len()
    }

    /// Whether the container is empty
    pub fn is_empty(&self) -> bool {
        self.tree.arena().is_empty()
    }

    /// Number of slots, live or free
    pub fn capacity(&self) -> usize {
        self.tree.arena().capacity()
    }

    /// Children waiting for an object with `id` to appear
    pub fn waiting_children(&self, id: &Identifier) -> usize {
        self.waiting.get(id).map_or(0, BTreeSet::len)
    }

    /// Shaped-text cache
    pub fn text_cache(&self) -> &ShapedTextCache {
        &self.text_cache
    }

    fn link_parent(&mut self, index: usize, parent: Option<&Identifier>) {
        let resolved = match parent {
            Some(parent) => match self.tree.index_of(parent) {
                Some(parent_index) if parent_index != index => Some(parent_index),
                Some(_) => {
                    tracing::warn!("Object {} references itself as parent", parent);
                    None
                }
                None => {
                    self.waiting.entry(parent.clone()).or_default().insert(index);
                    None
                }
            },
            None => None,
        };
        // Both indices are live here
        if let Err(e) = self.tree.set_parent(index, resolved) {
            tracing::error!("Failed to link parent of {}: {}", index, e);
            return;
        }
        if let Some(parent_index) = resolved {
            if self
                .tree
                .ancestors(parent_index, DEFAULT_MAX_PARENT_DEPTH)
                .any(|ancestor| ancestor == index)
            {
                tracing::warn!("Parent chain of object {} forms a cycle", index);
            }
        }
    }

    fn unwait(&mut self, parent: &Identifier, index: usize) {
        if let Some(children) = self.waiting.get_mut(parent) {
            children.remove(&index);
            if children.is_empty() {
                self.waiting.remove(parent);
            }
        }
    }

    fn collect_arena_events(&mut self) {
        for event in self.tree.drain_events() {
            self.changes.push(match event {
                ArenaEvent::Inserted { index, .. } => ScheduleChange::Inserted(index),
                ArenaEvent::Removed { index, .. } => ScheduleChange::Removed(index),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(id: &str) -> PlaybackObject {
        PlaybackObject::new(Identifier::new(id))
    }

    #[test]
    fn test_parent_resolved_on_insert() {
        let mut container = PlaybackObjectContainer::new();
        let child = container
            .insert(object("child").with_parent(Some(Identifier::new("parent"))))
            .unwrap();
        assert_eq!(container.try_get_parent_index(child), None);
        assert_eq!(container.waiting_children(&Identifier::new("parent")), 1);

        let parent = container.insert(object("parent")).unwrap();
        assert_eq!(container.try_get_parent_index(child), Some(parent));
        assert_eq!(container.waiting_children(&Identifier::new("parent")), 0);
    }

    #[test]
    fn test_children_wait_after_parent_removed() {
        let mut container = PlaybackObjectContainer::new();
        let parent = container.insert(object("parent")).unwrap();
        let child = container
            .insert(object("child").with_parent(Some(Identifier::new("parent"))))
            .unwrap();
        assert_eq!(container.try_get_parent_index(child), Some(parent));

        container.remove(parent).unwrap();
        assert_eq!(container.try_get_parent_index(child), None);
        assert_eq!(container.get(child).unwrap().parent_id(), Some(&Identifier::new("parent")));

        let replacement = container.insert(object("parent")).unwrap();
        assert_eq!(container.try_get_parent_index(child), Some(replacement));
    }

    #[test]
    fn test_set_parent_moves_between_parents() {
        let mut container = PlaybackObjectContainer::new();
        let a = container.insert(object("a")).unwrap();
        let b = container.insert(object("b")).unwrap();
        let child = container.insert(object("child")).unwrap();

        container.set_parent(child, Some(Identifier::new("a"))).unwrap();
        assert_eq!(container.try_get_parent_index(child), Some(a));
        container.set_parent(child, Some(Identifier::new("b"))).unwrap();
        assert_eq!(container.try_get_parent_index(child), Some(b));
        container.set_parent(child, Some(Identifier::new("missing"))).unwrap();
        assert_eq!(container.try_get_parent_index(child), None);
        container.set_parent(child, None).unwrap();
        assert_eq!(container.waiting_children(&Identifier::new("missing")), 0);
    }

    #[test]
    fn test_schedule_changes() {
        let mut container = PlaybackObjectContainer::new();
        let index = container.insert(object("a")).unwrap();
        container.set_times(index, 1.0, 2.0).unwrap();
        container.set_times(index, 1.0, 2.0).unwrap();
        container.set_visible(index, false).unwrap();
        container.remove(index).unwrap();

        assert_eq!(
            container.take_schedule_changes(),
            vec![
                ScheduleChange::Inserted(index),
                ScheduleChange::Updated(index),
                ScheduleChange::Updated(index),
                ScheduleChange::Removed(index),
            ]
        );
        assert!(!container.has_schedule_changes());
        assert!(container.set_times(index, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut container = PlaybackObjectContainer::new();
        container.insert(object("a")).unwrap();
        assert_eq!(
            container.insert(object("a")).unwrap_err(),
            ArenaError::DuplicateId(Identifier::new("a"))
        );
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_text_edit_invalidates_cache() {
        let mut container = PlaybackObjectContainer::new();
        let index = container.insert(object("label").with_text(Some("hi".into()))).unwrap();
        let id = Identifier::new("label");
        container.text_cache().get_or_shape(&id, "hi", |_| Some(crate::text_cache::TextHandle(1)));
        assert_eq!(container.text_cache().len(), 1);

        container.set_text(index, Some("bye".into())).unwrap();
        assert!(container.text_cache().is_empty());
        assert_eq!(container.get(index).unwrap().text(), Some("bye"));
    }
}
