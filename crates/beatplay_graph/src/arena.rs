// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stable-index arena with identifier lookup, and its tree variant.
//!
//! Slots are tombstoned on removal and reused through a free list. Links
//! between items are plain indices, never owning pointers.

use crate::identifier::Identifier;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors raised by arena operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArenaError {
    /// An item with this identifier is already stored
    #[error("Duplicate identifier: {0}")]
    DuplicateId(Identifier),

    /// No live item at this index
    #[error("Unknown index: {0}")]
    UnknownIndex(usize),

    /// No live item with this identifier
    #[error("Unknown identifier: {0}")]
    UnknownId(Identifier),

    /// An item cannot be its own parent
    #[error("Item {0} cannot parent itself")]
    SelfParent(usize),
}

/// Result type for arena operations
pub type Result<T> = std::result::Result<T, ArenaError>;

/// Items stored in an [`IndexedArena`]
pub trait Identified {
    /// Unique identifier of the item
    fn id(&self) -> &Identifier;
}

/// Structural notification recorded by the arena
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArenaEvent {
    /// An item was stored at `index`
    Inserted {
        /// Slot index
        index: usize,
        /// Item identifier
        id: Identifier,
    },
    /// The item at `index` was removed
    Removed {
        /// Slot index
        index: usize,
        /// Item identifier
        id: Identifier,
    },
}

/// Dense slot vector with free-list reuse and identifier lookup
#[derive(Debug, Clone)]
pub struct IndexedArena<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
    lookup: HashMap<Identifier, usize>,
    occupied: Vec<usize>,
    events: Vec<ArenaEvent>,
}

impl<T> Default for IndexedArena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            lookup: HashMap::new(),
            occupied: Vec::new(),
            events: Vec::new(),
        }
    }
}

impl<T: Identified> IndexedArena<T> {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next [`add`](Self::add) will use
    pub fn next_index(&self) -> usize {
        self.free.last().copied().unwrap_or(self.slots.len())
    }

    /// Store the item built by `factory(index)`.
    ///
    /// Fails without consuming the index if the identifier is already taken.
    pub fn add(&mut self, factory: impl FnOnce(usize) -> T) -> Result<usize> {
        let index = self.next_index();
        let item = factory(index);
        if self.lookup.contains_key(item.id()) {
            return Err(ArenaError::DuplicateId(item.id().clone()));
        }

        let id = item.id().clone();
        if index == self.slots.len() {
            self.slots.push(Some(item));
        } else {
            self.free.pop();
            self.slots[index] = Some(item);
        }

        self.lookup.insert(id.clone(), index);
        if let Err(pos) = self.occupied.binary_search(&index) {
            self.occupied.insert(pos, index);
        }
        self.events.push(ArenaEvent::Inserted { index, id });
        Ok(index)
    }

    /// Remove the item at `index`, returning it. Unknown indices return `None`.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let item = self.slots.get_mut(index)?.take()?;
        let id = item.id().clone();
        self.lookup.remove(&id);
        if let Ok(pos) = self.occupied.binary_search(&index) {
            self.occupied.remove(pos);
        }
        self.free.push(index);
        self.events.push(ArenaEvent::Removed { index, id });
        Some(item)
    }

    /// Remove the item with `id`, returning its index and value
    pub fn remove_by_id(&mut self, id: &Identifier) -> Option<(usize, T)> {
        let index = self.index_of(id)?;
        self.remove(index).map(|item| (index, item))
    }
}

impl<T> IndexedArena<T> {
    /// Item at `index`
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Mutable item at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Index of the item with `id`
    pub fn index_of(&self, id: &Identifier) -> Option<usize> {
        self.lookup.get(id).copied()
    }

    /// Item with `id`
    pub fn get_by_id(&self, id: &Identifier) -> Option<&T> {
        self.index_of(id).and_then(|index| self.get(index))
    }

    /// Whether an item with `id` is stored
    pub fn contains_id(&self, id: &Identifier) -> bool {
        self.lookup.contains_key(id)
    }

    /// Whether `index` holds a live item
    pub fn contains(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Number of live items
    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    /// Whether the arena has no live items
    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Number of slots, live or tombstoned
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live indices in ascending order
    pub fn indices(&self) -> &[usize] {
        &self.occupied
    }

    /// Live items in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.occupied
            .iter()
            .filter_map(move |&index| self.get(index).map(|item| (index, item)))
    }

    /// Take the recorded structural events
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, ArenaEvent> {
        self.events.drain(..)
    }
}

/// Arena with parent / child bookkeeping
#[derive(Debug, Clone)]
pub struct IndexedTree<T> {
    arena: IndexedArena<T>,
    parents: Vec<Option<usize>>,
    children: Vec<BTreeSet<usize>>,
}

impl<T> Default for IndexedTree<T> {
    fn default() -> Self {
        Self {
            arena: IndexedArena::default(),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl<T: Identified> IndexedTree<T> {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new root item built by `factory(index)`
    pub fn add(&mut self, factory: impl FnOnce(usize) -> T) -> Result<usize> {
        let index = self.arena.add(factory)?;
        if self.parents.len() <= index {
            self.parents.resize(index + 1, None);
            self.children.resize_with(index + 1, BTreeSet::new);
        }
        self.parents[index] = None;
        self.children[index].clear();
        Ok(index)
    }

    /// Remove the item at `index`, detaching it from its parent and its children
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let item = self.arena.remove(index)?;
        if let Some(parent) = self.parents[index].take() {
            self.children[parent].remove(&index);
        }
        for child in std::mem::take(&mut self.children[index]) {
            self.parents[child] = None;
        }
        Some(item)
    }

    /// Remove the item with `id`
    pub fn remove_by_id(&mut self, id: &Identifier) -> Option<(usize, T)> {
        let index = self.arena.index_of(id)?;
        self.remove(index).map(|item| (index, item))
    }
}

impl<T> IndexedTree<T> {
    /// Set or clear the parent of `index`, detaching it from any previous parent first
    pub fn set_parent(&mut self, index: usize, parent: Option<usize>) -> Result<()> {
        if !self.arena.contains(index) {
            return Err(ArenaError::UnknownIndex(index));
        }
        if let Some(parent) = parent {
            if parent == index {
                return Err(ArenaError::SelfParent(index));
            }
            if !self.arena.contains(parent) {
                return Err(ArenaError::UnknownIndex(parent));
            }
        }

        if let Some(previous) = self.parents[index].take() {
            self.children[previous].remove(&index);
        }
        if let Some(parent) = parent {
            self.children[parent].insert(index);
        }
        self.parents[index] = parent;
        Ok(())
    }

    /// Parent index of `index`
    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    /// Children of `index` in ascending order
    pub fn children_of(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.children.get(index).into_iter().flatten().copied()
    }

    /// Ancestors of `index`, nearest first, stopping after `max_depth` hops
    pub fn ancestors(&self, index: usize, max_depth: usize) -> impl Iterator<Item = usize> + '_ {
        let mut current = index;
        std::iter::from_fn(move || {
            let parent = self.parent_of(current)?;
            current = parent;
            Some(parent)
        })
        .take(max_depth)
    }

    /// The underlying arena
    pub fn arena(&self) -> &IndexedArena<T> {
        &self.arena
    }

    /// Item at `index`
    pub fn get(&self, index: usize) -> Option<&T> {
        self.arena.get(index)
    }

    /// Mutable item at `index`
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.arena.get_mut(index)
    }

    /// Index of the item with `id`
    pub fn index_of(&self, id: &Identifier) -> Option<usize> {
        self.arena.index_of(id)
    }

    /// Take the recorded structural events
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, ArenaEvent> {
        self.arena.drain_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Item {
        id: Identifier,
        index: usize,
    }

    impl Identified for Item {
        fn id(&self) -> &Identifier {
            &self.id
        }
    }

    fn item(name: &str) -> impl FnOnce(usize) -> Item + '_ {
        move |index| Item {
            id: Identifier::new(name),
            index,
        }
    }

    #[test]
    fn test_add_assigns_index_to_factory() {
        let mut arena = IndexedArena::new();
        let a = arena.add(item("a")).unwrap();
        let b = arena.add(item("b")).unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(arena.get(b).unwrap().index, 1);
        assert_eq!(arena.index_of(&Identifier::new("a")), Some(0));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut arena = IndexedArena::new();
        arena.add(item("a")).unwrap();
        let err = arena.add(item("a")).unwrap_err();
        assert_eq!(err, ArenaError::DuplicateId(Identifier::new("a")));
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.next_index(), 1);
    }

    #[test]
    fn test_remove_tombstones_and_reuses() {
        let mut arena = IndexedArena::new();
        arena.add(item("a")).unwrap();
        arena.add(item("b")).unwrap();
        arena.add(item("c")).unwrap();

        assert!(arena.remove_by_id(&Identifier::new("b")).is_some());
        assert!(arena.remove_by_id(&Identifier::new("b")).is_none());
        assert!(arena.remove(99).is_none());
        assert_eq!(arena.indices(), &[0, 2]);
        assert!(arena.get_by_id(&Identifier::new("b")).is_none());

        // Id is reusable after full removal, and the tombstoned slot is reused
        let index = arena.add(item("b")).unwrap();
        assert_eq!(index, 1);
        assert_eq!(arena.indices(), &[0, 1, 2]);
        let names: Vec<&str> = arena.iter().map(|(_, item)| item.id.local()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_events_recorded() {
        let mut arena = IndexedArena::new();
        arena.add(item("a")).unwrap();
        arena.remove(0);
        let events: Vec<ArenaEvent> = arena.drain_events().collect();
        assert_eq!(
            events,
            vec![
                ArenaEvent::Inserted { index: 0, id: Identifier::new("a") },
                ArenaEvent::Removed { index: 0, id: Identifier::new("a") },
            ]
        );
        assert_eq!(arena.drain_events().count(), 0);
    }

    #[test]
    fn test_tree_reparenting() {
        let mut tree = IndexedTree::new();
        let root_a = tree.add(item("a")).unwrap();
        let root_b = tree.add(item("b")).unwrap();
        let child = tree.add(item("c")).unwrap();

        tree.set_parent(child, Some(root_a)).unwrap();
        assert_eq!(tree.parent_of(child), Some(root_a));
        assert_eq!(tree.children_of(root_a).collect::<Vec<_>>(), vec![child]);

        tree.set_parent(child, Some(root_b)).unwrap();
        assert_eq!(tree.children_of(root_a).count(), 0);
        assert_eq!(tree.children_of(root_b).collect::<Vec<_>>(), vec![child]);

        tree.set_parent(child, None).unwrap();
        assert_eq!(tree.parent_of(child), None);
        assert_eq!(tree.set_parent(child, Some(child)), Err(ArenaError::SelfParent(child)));
        assert_eq!(tree.set_parent(child, Some(42)), Err(ArenaError::UnknownIndex(42)));
    }

    #[test]
    fn test_tree_remove_detaches() {
        let mut tree = IndexedTree::new();
        let root = tree.add(item("root")).unwrap();
        let mid = tree.add(item("mid")).unwrap();
        let leaf = tree.add(item("leaf")).unwrap();
        tree.set_parent(mid, Some(root)).unwrap();
        tree.set_parent(leaf, Some(mid)).unwrap();
        assert_eq!(tree.ancestors(leaf, 16).collect::<Vec<_>>(), vec![mid, root]);

        tree.remove(mid);
        assert_eq!(tree.parent_of(leaf), None);
        assert_eq!(tree.children_of(root).count(), 0);
    }

    #[test]
    fn test_ancestors_bounded_on_cycle() {
        let mut tree = IndexedTree::new();
        let a = tree.add(item("a")).unwrap();
        let b = tree.add(item("b")).unwrap();
        tree.set_parent(a, Some(b)).unwrap();
        tree.set_parent(b, Some(a)).unwrap();
        assert_eq!(tree.ancestors(a, 5).count(), 5);
    }
}
