// SPDX-License-Identifier: MIT OR Apache-2.0
//! Prefabs and their placed instances.

use super::{BeatmapObject, InstanceId, ObjectId, PrefabId};
use glam::Vec2;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A reusable group of objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefab {
    /// Unique id
    pub id: PrefabId,
    /// Display name
    pub name: String,
    /// Time offset subtracted from every instance start time
    pub offset: f32,
    /// Objects, with parent references local to the prefab where they resolve
    pub objects: IndexMap<ObjectId, BeatmapObject>,
}

impl Prefab {
    /// Create an empty prefab
    pub fn new(id: PrefabId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            offset: 0.0,
            objects: IndexMap::new(),
        }
    }

    /// Add an object, replacing any object with the same id
    pub fn with_object(mut self, object: BeatmapObject) -> Self {
        self.objects.insert(object.id.clone(), object);
        self
    }

    /// Whether `id` names an object of this prefab
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }
}

/// A placed, time-shifted use of a prefab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabInstance {
    /// Unique id, used as namespace of the cloned objects
    pub id: InstanceId,
    /// Instantiated prefab
    pub prefab: PrefabId,
    /// Song time the prefab's timeline starts at, before its offset
    pub start_time: f32,
    /// Anchor position
    pub position: Vec2,
    /// Anchor scale
    pub scale: Vec2,
    /// Anchor rotation in degrees
    pub rotation: f32,
}

impl PrefabInstance {
    /// Instance at the origin with unit scale
    pub fn new(id: InstanceId, prefab: PrefabId, start_time: f32) -> Self {
        Self {
            id,
            prefab,
            start_time,
            position: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
        }
    }

    /// Time shift applied to the prefab's objects
    pub fn time_shift(&self, prefab: &Prefab) -> f32 {
        self.start_time - prefab.offset
    }
}
