// SPDX-License-Identifier: MIT OR Apache-2.0
//! One-to-one projection of top-level beatmap objects.

use super::convert::{apply_field, build_object, main_identifier};
use super::{Result, SyncError};
use crate::container::PlaybackObjectContainer;
use crate::document::{Beatmap, ObjectField, ObjectId};
use beatplay_sequencer::RandomSeed;
use std::collections::{BTreeSet, HashSet};

/// Keeps one playback object per document object, under the same id
#[derive(Debug, Default)]
pub struct MainObjectSource {
    tracked: BTreeSet<ObjectId>,
    skipped: HashSet<ObjectId>,
}

impl MainObjectSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Project a newly inserted object
    pub fn insert(
        &mut self,
        doc: &Beatmap,
        id: &ObjectId,
        container: &mut PlaybackObjectContainer,
        seed: RandomSeed,
    ) -> Result<()> {
        let Some(object) = doc.object(id) else {
            // removed again before this change was applied
            tracing::debug!("Skipping stale insert of object {}", id);
            self.skipped.insert(id.clone());
            return Ok(());
        };
        let parent = object.parent.as_ref().map(main_identifier);
        container.insert(build_object(object, main_identifier(id), 0.0, parent, seed))?;
        self.tracked.insert(id.clone());
        Ok(())
    }

    /// Drop the projection of a removed object
    pub fn remove(&mut self, id: &ObjectId, container: &mut PlaybackObjectContainer) -> Result<()> {
        if self.tracked.remove(id) {
            container.remove_by_id(&main_identifier(id));
            return Ok(());
        }
        if self.skipped.remove(id) {
            return Ok(());
        }
        Err(SyncError::UnknownObject(id.clone()))
    }

    /// Push one edited field into the existing projection
    pub fn update(
        &mut self,
        doc: &Beatmap,
        id: &ObjectId,
        field: ObjectField,
        container: &mut PlaybackObjectContainer,
        seed: RandomSeed,
    ) -> Result<()> {
        let Some(object) = doc.object(id) else {
            return Ok(());
        };
        let index = match container.index_of(&main_identifier(id)) {
            Some(index) if self.tracked.contains(id) => index,
            _ => return Err(SyncError::UnknownObject(id.clone())),
        };

        if field == ObjectField::Parent {
            container.set_parent(index, object.parent.as_ref().map(main_identifier))?;
        } else {
            apply_field(container, index, object, field, 0.0, seed)?;
        }
        Ok(())
    }

    /// Project every document object
    pub fn rebuild(&mut self, doc: &Beatmap, container: &mut PlaybackObjectContainer, seed: RandomSeed) -> Result<()> {
        self.clear(container);
        for object in doc.objects() {
            self.insert(doc, &object.id, container, seed)?;
        }
        Ok(())
    }

    /// Drop every projection
    pub fn clear(&mut self, container: &mut PlaybackObjectContainer) {
        for id in std::mem::take(&mut self.tracked) {
            container.remove_by_id(&main_identifier(&id));
        }
        self.skipped.clear();
    }

    /// Number of projected objects
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    /// Whether nothing is projected
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}
