// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editable beatmap document.
//!
//! Every mutation goes through a [`Beatmap`] method that records a
//! [`DocumentChange`]. The object source manager drains these changes and
//! projects them onto the runtime object container.

mod object;
mod prefab;

pub use object::{AutoKill, BeatmapObject, RandomKeyframe};
pub use prefab::{Prefab, PrefabInstance};

use beatplay_sequencer::{EventTracks, Sequence, ThemeSource};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new random id
            pub fn new() -> Self {
                Self(Uuid::new_v4().simple().to_string())
            }

            /// The id as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Unique identifier of a beatmap object
    ObjectId
);
string_id!(
    /// Unique identifier of a prefab
    PrefabId
);
string_id!(
    /// Unique identifier of a prefab instance
    InstanceId
);

/// Edited property of a beatmap object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectField {
    /// Start time
    StartTime,
    /// Auto-kill rule
    AutoKill,
    /// Visibility
    Visible,
    /// Parent reference
    Parent,
    /// Inherited parent channels
    ParentType,
    /// Parent channel delays
    ParentOffset,
    /// Render layer
    RenderMode,
    /// Pivot offset
    Origin,
    /// Draw order key
    RenderDepth,
    /// Shape reference
    Shape,
    /// Text
    Text,
    /// Position keyframes
    PositionKeyframes,
    /// Scale keyframes
    ScaleKeyframes,
    /// Rotation keyframes
    RotationKeyframes,
    /// Color keyframes
    ColorKeyframes,
}

/// Edited property of a prefab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefabField {
    /// Time offset
    Offset,
    /// Display name
    Name,
}

/// Edited property of a prefab instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceField {
    /// Start time
    StartTime,
    /// Anchor position
    Position,
    /// Anchor scale
    Scale,
    /// Anchor rotation
    Rotation,
    /// Instantiated prefab
    Prefab,
}

/// A recorded document mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentChange {
    /// Object added
    ObjectInserted {
        /// Object id
        id: ObjectId,
    },
    /// Object removed
    ObjectRemoved {
        /// Object id
        id: ObjectId,
    },
    /// Object property edited
    ObjectChanged {
        /// Object id
        id: ObjectId,
        /// Edited property
        field: ObjectField,
    },
    /// Prefab added
    PrefabInserted {
        /// Prefab id
        id: PrefabId,
    },
    /// Prefab removed
    PrefabRemoved {
        /// Prefab id
        id: PrefabId,
    },
    /// Prefab property edited
    PrefabChanged {
        /// Prefab id
        id: PrefabId,
        /// Edited property
        field: PrefabField,
    },
    /// Object added to a prefab
    PrefabObjectInserted {
        /// Prefab id
        prefab: PrefabId,
        /// Object id
        object: ObjectId,
    },
    /// Object removed from a prefab
    PrefabObjectRemoved {
        /// Prefab id
        prefab: PrefabId,
        /// Object id
        object: ObjectId,
    },
    /// Prefab object property edited
    PrefabObjectChanged {
        /// Prefab id
        prefab: PrefabId,
        /// Object id
        object: ObjectId,
        /// Edited property
        field: ObjectField,
    },
    /// Instance added
    InstanceInserted {
        /// Instance id
        id: InstanceId,
    },
    /// Instance removed
    InstanceRemoved {
        /// Instance id
        id: InstanceId,
    },
    /// Instance property edited
    InstanceChanged {
        /// Instance id
        id: InstanceId,
        /// Edited property
        field: InstanceField,
    },
}

/// Errors raised by document mutations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// An object with this id already exists
    #[error("Duplicate object: {0}")]
    DuplicateObject(ObjectId),

    /// No object with this id
    #[error("Unknown object: {0}")]
    UnknownObject(ObjectId),

    /// A prefab with this id already exists
    #[error("Duplicate prefab: {0}")]
    DuplicatePrefab(PrefabId),

    /// No prefab with this id
    #[error("Unknown prefab: {0}")]
    UnknownPrefab(PrefabId),

    /// An instance with this id already exists
    #[error("Duplicate instance: {0}")]
    DuplicateInstance(InstanceId),

    /// No instance with this id
    #[error("Unknown instance: {0}")]
    UnknownInstance(InstanceId),
}

/// Result type for document mutations
pub type Result<T> = std::result::Result<T, DocumentError>;

/// The animated scene document
#[derive(Debug, Clone, Default)]
pub struct Beatmap {
    objects: IndexMap<ObjectId, BeatmapObject>,
    prefabs: IndexMap<PrefabId, Prefab>,
    instances: IndexMap<InstanceId, PrefabInstance>,
    /// Palettes referenced by the theme track
    pub themes: ThemeSource,
    /// Keyframed theme indices
    pub theme_sequence: Sequence<usize>,
    /// Camera and post-processing tracks
    pub events: EventTracks,
    changes: Vec<DocumentChange>,
}

impl Beatmap {
    /// Create an empty beatmap
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object
    pub fn insert_object(&mut self, object: BeatmapObject) -> Result<()> {
        if self.objects.contains_key(&object.id) {
            return Err(DocumentError::DuplicateObject(object.id));
        }
        let id = object.id.clone();
        self.objects.insert(id.clone(), object);
        self.changes.push(DocumentChange::ObjectInserted { id });
        Ok(())
    }

    /// Remove an object
    pub fn remove_object(&mut self, id: &ObjectId) -> Result<BeatmapObject> {
        let object = self
            .objects
            .shift_remove(id)
            .ok_or_else(|| DocumentError::UnknownObject(id.clone()))?;
        self.changes.push(DocumentChange::ObjectRemoved { id: id.clone() });
        Ok(object)
    }

    /// Edit one property of an object
    pub fn update_object(
        &mut self,
        id: &ObjectId,
        field: ObjectField,
        edit: impl FnOnce(&mut BeatmapObject),
    ) -> Result<()> {
        let object = self
            .objects
            .get_mut(id)
            .ok_or_else(|| DocumentError::UnknownObject(id.clone()))?;
        edit(object);
        self.changes.push(DocumentChange::ObjectChanged { id: id.clone(), field });
        Ok(())
    }

    /// Add a prefab together with its objects
    pub fn insert_prefab(&mut self, prefab: Prefab) -> Result<()> {
        if self.prefabs.contains_key(&prefab.id) {
            return Err(DocumentError::DuplicatePrefab(prefab.id));
        }
        let id = prefab.id.clone();
        self.prefabs.insert(id.clone(), prefab);
        self.changes.push(DocumentChange::PrefabInserted { id });
        Ok(())
    }

    /// Remove a prefab. Its instances stay and expand to nothing.
    pub fn remove_prefab(&mut self, id: &PrefabId) -> Result<Prefab> {
        let prefab = self
            .prefabs
            .shift_remove(id)
            .ok_or_else(|| DocumentError::UnknownPrefab(id.clone()))?;
        self.changes.push(DocumentChange::PrefabRemoved { id: id.clone() });
        Ok(prefab)
    }

    /// Edit one property of a prefab
    pub fn update_prefab(&mut self, id: &PrefabId, field: PrefabField, edit: impl FnOnce(&mut Prefab)) -> Result<()> {
        let prefab = self
            .prefabs
            .get_mut(id)
            .ok_or_else(|| DocumentError::UnknownPrefab(id.clone()))?;
        edit(prefab);
        self.changes.push(DocumentChange::PrefabChanged { id: id.clone(), field });
        Ok(())
    }

    /// Add an object to a prefab
    pub fn insert_prefab_object(&mut self, prefab: &PrefabId, object: BeatmapObject) -> Result<()> {
        let target = self
            .prefabs
            .get_mut(prefab)
            .ok_or_else(|| DocumentError::UnknownPrefab(prefab.clone()))?;
        if target.objects.contains_key(&object.id) {
            return Err(DocumentError::DuplicateObject(object.id));
        }
        let id = object.id.clone();
        target.objects.insert(id.clone(), object);
        self.changes.push(DocumentChange::PrefabObjectInserted {
            prefab: prefab.clone(),
            object: id,
        });
        Ok(())
    }

    /// Remove an object from a prefab
    pub fn remove_prefab_object(&mut self, prefab: &PrefabId, object: &ObjectId) -> Result<BeatmapObject> {
        let target = self
            .prefabs
            .get_mut(prefab)
            .ok_or_else(|| DocumentError::UnknownPrefab(prefab.clone()))?;
        let removed = target
            .objects
            .shift_remove(object)
            .ok_or_else(|| DocumentError::UnknownObject(object.clone()))?;
        self.changes.push(DocumentChange::PrefabObjectRemoved {
            prefab: prefab.clone(),
            object: object.clone(),
        });
        Ok(removed)
    }

    /// Edit one property of a prefab object
    pub fn update_prefab_object(
        &mut self,
        prefab: &PrefabId,
        object: &ObjectId,
        field: ObjectField,
        edit: impl FnOnce(&mut BeatmapObject),
    ) -> Result<()> {
        let target = self
            .prefabs
            .get_mut(prefab)
            .ok_or_else(|| DocumentError::UnknownPrefab(prefab.clone()))?
            .objects
            .get_mut(object)
            .ok_or_else(|| DocumentError::UnknownObject(object.clone()))?;
        edit(target);
        self.changes.push(DocumentChange::PrefabObjectChanged {
            prefab: prefab.clone(),
            object: object.clone(),
            field,
        });
        Ok(())
    }

    /// Place a prefab instance
    pub fn insert_instance(&mut self, instance: PrefabInstance) -> Result<()> {
        if self.instances.contains_key(&instance.id) {
            return Err(DocumentError::DuplicateInstance(instance.id));
        }
        let id = instance.id.clone();
        self.instances.insert(id.clone(), instance);
        self.changes.push(DocumentChange::InstanceInserted { id });
        Ok(())
    }

    /// Remove a prefab instance
    pub fn remove_instance(&mut self, id: &InstanceId) -> Result<PrefabInstance> {
        let instance = self
            .instances
            .shift_remove(id)
            .ok_or_else(|| DocumentError::UnknownInstance(id.clone()))?;
        self.changes.push(DocumentChange::InstanceRemoved { id: id.clone() });
        Ok(instance)
    }

    /// Edit one property of a prefab instance
    pub fn update_instance(
        &mut self,
        id: &InstanceId,
        field: InstanceField,
        edit: impl FnOnce(&mut PrefabInstance),
    ) -> Result<()> {
        let instance = self
            .instances
            .get_mut(id)
            .ok_or_else(|| DocumentError::UnknownInstance(id.clone()))?;
        edit(instance);
        self.changes.push(DocumentChange::InstanceChanged { id: id.clone(), field });
        Ok(())
    }

    /// Object by id
    pub fn object(&self, id: &ObjectId) -> Option<&BeatmapObject> {
        self.objects.get(id)
    }

    /// All objects in insertion order
    pub fn objects(&self) -> impl Iterator<Item = &BeatmapObject> + '_ {
        self.objects.values()
    }

    /// Prefab by id
    pub fn prefab(&self, id: &PrefabId) -> Option<&Prefab> {
        self.prefabs.get(id)
    }

    /// All prefabs in insertion order
    pub fn prefabs(&self) -> impl Iterator<Item = &Prefab> + '_ {
        self.prefabs.values()
    }

    /// Instance by id
    pub fn instance(&self, id: &InstanceId) -> Option<&PrefabInstance> {
        self.instances.get(id)
    }

    /// All instances in insertion order
    pub fn instances(&self) -> impl Iterator<Item = &PrefabInstance> + '_ {
        self.instances.values()
    }

    /// Take the recorded changes
    pub fn take_changes(&mut self) -> Vec<DocumentChange> {
        std::mem::take(&mut self.changes)
    }

    /// Whether changes are pending
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutations_record_changes() {
        let mut doc = Beatmap::new();
        let id = ObjectId::from("a");
        doc.insert_object(BeatmapObject::new(id.clone(), "a")).unwrap();
        doc.update_object(&id, ObjectField::StartTime, |o| o.start_time = 2.0)
            .unwrap();
        doc.remove_object(&id).unwrap();

        assert_eq!(
            doc.take_changes(),
            vec![
                DocumentChange::ObjectInserted { id: id.clone() },
                DocumentChange::ObjectChanged {
                    id: id.clone(),
                    field: ObjectField::StartTime
                },
                DocumentChange::ObjectRemoved { id },
            ]
        );
        assert!(!doc.has_changes());
    }

    #[test]
    fn test_errors_record_nothing() {
        let mut doc = Beatmap::new();
        let id = ObjectId::from("a");
        doc.insert_object(BeatmapObject::new(id.clone(), "a")).unwrap();
        doc.take_changes();

        assert_eq!(
            doc.insert_object(BeatmapObject::new(id.clone(), "again")),
            Err(DocumentError::DuplicateObject(id))
        );
        assert_eq!(
            doc.update_instance(&InstanceId::from("nope"), InstanceField::Position, |_| {}),
            Err(DocumentError::UnknownInstance(InstanceId::from("nope")))
        );
        assert!(doc.remove_prefab(&PrefabId::from("nope")).is_err());
        assert!(!doc.has_changes());
    }

    #[test]
    fn test_prefab_object_changes() {
        let mut doc = Beatmap::new();
        let prefab = PrefabId::from("p");
        doc.insert_prefab(Prefab::new(prefab.clone(), "p")).unwrap();
        let object = ObjectId::from("o");
        doc.insert_prefab_object(&prefab, BeatmapObject::new(object.clone(), "o"))
            .unwrap();
        doc.update_prefab_object(&prefab, &object, ObjectField::Visible, |o| o.visible = false)
            .unwrap();

        assert!(!doc.prefab(&prefab).unwrap().objects[&object].visible);
        assert_eq!(doc.take_changes().len(), 3);
    }

    #[test]
    fn test_random_ids_are_unique() {
        assert_ne!(ObjectId::new(), ObjectId::new());
        assert_eq!(InstanceId::from("x").to_string(), "x");
    }
}
