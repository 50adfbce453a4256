// SPDX-License-Identifier: MIT OR Apache-2.0
//! Synchronization of the runtime object container with the document.
//!
//! The [`ObjectSourceManager`] applies [`DocumentChange`]s one by one,
//! delegating main objects to [`MainObjectSource`] and prefab data to
//! [`PrefabInstanceObjectSource`]. A change naming an entity the document
//! no longer holds is stale (a later change in the same batch removed it)
//! and is skipped.

mod convert;
mod main_source;
mod prefab_source;

pub use main_source::MainObjectSource;
pub use prefab_source::{clone_id, intermediate_id, PrefabInstanceObjectSource};

use crate::arena::ArenaError;
use crate::container::PlaybackObjectContainer;
use crate::document::{Beatmap, DocumentChange, InstanceId, ObjectId, PrefabField, PrefabId};
use beatplay_sequencer::RandomSeed;
use thiserror::Error;

/// Structural synchronization failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Container rejected an operation
    #[error("Arena error: {0}")]
    Arena(#[from] ArenaError),

    /// Change names an object that was never projected
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),

    /// Change names a prefab that was never tracked
    #[error("Unknown prefab: {0}")]
    UnknownPrefab(PrefabId),

    /// Change names an instance that was never expanded
    #[error("Unknown instance: {0}")]
    UnknownInstance(InstanceId),

    /// Instance inserted twice
    #[error("Duplicate instance: {0}")]
    DuplicateInstance(InstanceId),

    /// Prefab object without clones in an expanded instance
    #[error("Unknown object {object} in prefab {prefab}")]
    UnknownPrefabObject {
        /// Prefab id
        prefab: PrefabId,
        /// Object id
        object: ObjectId,
    },
}

/// Result type for synchronization
pub type Result<T> = std::result::Result<T, SyncError>;

/// Keeps the playback object container consistent with a [`Beatmap`]
#[derive(Debug, Default)]
pub struct ObjectSourceManager {
    seed: RandomSeed,
    main: MainObjectSource,
    prefabs: PrefabInstanceObjectSource,
}

impl ObjectSourceManager {
    /// Create a manager resolving randomized keyframes with `seed`
    pub fn new(seed: RandomSeed) -> Self {
        Self {
            seed,
            main: MainObjectSource::new(),
            prefabs: PrefabInstanceObjectSource::new(),
        }
    }

    /// Randomization seed
    pub fn seed(&self) -> RandomSeed {
        self.seed
    }

    /// Main object source
    pub fn main(&self) -> &MainObjectSource {
        &self.main
    }

    /// Prefab instance source
    pub fn prefabs(&self) -> &PrefabInstanceObjectSource {
        &self.prefabs
    }

    /// Replace every projection with a full import of `doc`
    pub fn rebuild(&mut self, doc: &Beatmap, container: &mut PlaybackObjectContainer) -> Result<()> {
        self.main.rebuild(doc, container, self.seed)?;
        self.prefabs.rebuild(doc, container, self.seed)?;
        tracing::info!(
            "Imported {} objects and {} prefab instances ({} runtime objects)",
            self.main.len(),
            self.prefabs.instance_count(),
            container.len()
        );
        Ok(())
    }

    /// Apply every pending change of `doc`. All changes are applied; the
    /// first failure is returned.
    pub fn apply_pending(&mut self, doc: &mut Beatmap, container: &mut PlaybackObjectContainer) -> Result<usize> {
        let changes = doc.take_changes();
        let mut first_error = None;
        for change in &changes {
            if let Err(e) = self.apply(doc, change, container) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(changes.len()),
        }
    }

    /// Apply one change
    pub fn apply(
        &mut self,
        doc: &Beatmap,
        change: &DocumentChange,
        container: &mut PlaybackObjectContainer,
    ) -> Result<()> {
        tracing::debug!("Applying {:?}", change);
        let seed = self.seed;
        let result = match change {
            DocumentChange::ObjectInserted { id } => self.main.insert(doc, id, container, seed),
            DocumentChange::ObjectRemoved { id } => self.main.remove(id, container),
            DocumentChange::ObjectChanged { id, field } => self.main.update(doc, id, *field, container, seed),
            DocumentChange::PrefabInserted { id } => self.prefabs.insert_prefab(doc, id, container, seed),
            DocumentChange::PrefabRemoved { id } => self.prefabs.remove_prefab(id, container),
            DocumentChange::PrefabChanged { id, field } => match field {
                PrefabField::Offset => self.prefabs.update_prefab(doc, id, container),
                PrefabField::Name => Ok(()),
            },
            DocumentChange::PrefabObjectInserted { prefab, object } => {
                self.prefabs.insert_prefab_object(doc, prefab, object, container, seed)
            }
            DocumentChange::PrefabObjectRemoved { prefab, object } => {
                self.prefabs.remove_prefab_object(doc, prefab, object, container)
            }
            DocumentChange::PrefabObjectChanged { prefab, object, field } => {
                self.prefabs.update_prefab_object(doc, prefab, object, *field, container, seed)
            }
            DocumentChange::InstanceInserted { id } => self.prefabs.insert_instance(doc, id, container, seed),
            DocumentChange::InstanceRemoved { id } => self.prefabs.remove_instance(id, container),
            DocumentChange::InstanceChanged { id, field } => {
                self.prefabs.update_instance(doc, id, *field, container, seed)
            }
        };
        if let Err(e) = &result {
            tracing::error!("Failed to apply {:?}: {}", change, e);
        }
        result
    }
}
