// SPDX-License-Identifier: MIT OR Apache-2.0
//! Prefab instance expansion.
//!
//! Each instance clones every object of its prefab under the namespaced id
//! `combine(instance, original)`. A clone whose parent is another object of
//! the same prefab links to that object's clone. Every other clone links to
//! an intermediate parent: an invisible object carrying the instance anchor
//! as constant keyframes, keyed by the external parent id (or `""` for
//! root objects) and reference-counted by the clones hanging on it. An
//! intermediate for an external id in turn parents to the main object with
//! that id.

use super::convert::{apply_field, build_object, main_identifier};
use super::{Result, SyncError};
use crate::container::PlaybackObjectContainer;
use crate::document::{Beatmap, BeatmapObject, InstanceField, InstanceId, ObjectField, ObjectId, Prefab, PrefabId, PrefabInstance};
use crate::identifier::Identifier;
use crate::object::{ParentType, PlaybackObject};
use beatplay_sequencer::{RandomSeed, Sequence};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Id of the clone of `object` in `instance`
pub fn clone_id(instance: &InstanceId, object: &ObjectId) -> Identifier {
    Identifier::combine(instance.as_str(), object.as_str())
}

/// Id of the intermediate parent `key` of `instance`
pub fn intermediate_id(instance: &InstanceId, key: &str) -> Identifier {
    Identifier::combine(instance.as_str(), key)
}

#[derive(Debug)]
struct InstanceState {
    prefab: PrefabId,
    /// Cloned original ids and the intermediate key each hangs on
    clones: BTreeMap<ObjectId, Option<String>>,
    /// Intermediate key to the clones hanging on it
    intermediates: BTreeMap<String, BTreeSet<ObjectId>>,
}

impl InstanceState {
    fn new(prefab: PrefabId) -> Self {
        Self {
            prefab,
            clones: BTreeMap::new(),
            intermediates: BTreeMap::new(),
        }
    }

    fn expand(
        &mut self,
        instance: &PrefabInstance,
        prefab: &Prefab,
        container: &mut PlaybackObjectContainer,
        seed: RandomSeed,
    ) -> Result<()> {
        for object in prefab.objects.values() {
            self.insert_clone(instance, prefab, object, container, seed)?;
        }
        tracing::debug!(
            "Expanded instance {}: {} clones, {} intermediates",
            instance.id,
            self.clones.len(),
            self.intermediates.len()
        );
        Ok(())
    }

    fn collapse(&mut self, instance: &InstanceId, container: &mut PlaybackObjectContainer) {
        for object in std::mem::take(&mut self.clones).into_keys() {
            container.remove_by_id(&clone_id(instance, &object));
        }
        for key in std::mem::take(&mut self.intermediates).into_keys() {
            container.remove_by_id(&intermediate_id(instance, &key));
        }
    }

    /// Parent id for the clone of `object` and the intermediate key it hangs on
    fn link_target(instance: &PrefabInstance, prefab: &Prefab, object: &BeatmapObject) -> (Identifier, Option<String>) {
        match &object.parent {
            Some(parent) if prefab.contains(parent) => (clone_id(&instance.id, parent), None),
            parent => {
                let key = parent.as_ref().map_or_else(String::new, |p| p.0.clone());
                (intermediate_id(&instance.id, &key), Some(key))
            }
        }
    }

    /// Clone `object` into the instance. An object that already has a clone
    /// (expanded from a later document state in the same batch) is left alone.
    fn insert_clone(
        &mut self,
        instance: &PrefabInstance,
        prefab: &Prefab,
        object: &BeatmapObject,
        container: &mut PlaybackObjectContainer,
        seed: RandomSeed,
    ) -> Result<()> {
        if self.clones.contains_key(&object.id) {
            return Ok(());
        }
        let id = clone_id(&instance.id, &object.id);
        let (parent, key) = Self::link_target(instance, prefab, object);
        container.insert(build_object(object, id.clone(), instance.time_shift(prefab), Some(parent), seed))?;
        if let Some(key) = &key {
            if let Err(e) = self.retain_intermediate(instance, prefab, key, &object.id, container) {
                container.remove_by_id(&id);
                return Err(e);
            }
        }
        self.clones.insert(object.id.clone(), key);
        Ok(())
    }

    fn remove_clone(&mut self, instance: &InstanceId, object: &ObjectId, container: &mut PlaybackObjectContainer) {
        let Some(key) = self.clones.remove(object) else {
            return;
        };
        container.remove_by_id(&clone_id(instance, object));
        if let Some(key) = key {
            self.release_intermediate(instance, &key, object, container);
        }
    }

    /// Re-resolve the parent of an existing clone
    fn relink_clone(
        &mut self,
        instance: &PrefabInstance,
        prefab: &Prefab,
        object: &BeatmapObject,
        container: &mut PlaybackObjectContainer,
    ) -> Result<()> {
        let Some(previous) = self.clones.get(&object.id).cloned() else {
            return Err(SyncError::UnknownPrefabObject {
                prefab: prefab.id.clone(),
                object: object.id.clone(),
            });
        };
        let index = container
            .index_of(&clone_id(&instance.id, &object.id))
            .ok_or_else(|| SyncError::UnknownPrefabObject {
                prefab: prefab.id.clone(),
                object: object.id.clone(),
            })?;

        let (parent, key) = Self::link_target(instance, prefab, object);
        container.set_parent(index, Some(parent))?;
        if let Some(key) = &key {
            self.retain_intermediate(instance, prefab, key, &object.id, container)?;
        }
        if let Some(previous) = previous {
            if key.as_ref() != Some(&previous) {
                self.release_intermediate(&instance.id, &previous, &object.id, container);
            }
        }
        self.clones.insert(object.id.clone(), key);
        Ok(())
    }

    fn retain_intermediate(
        &mut self,
        instance: &PrefabInstance,
        prefab: &Prefab,
        key: &str,
        child: &ObjectId,
        container: &mut PlaybackObjectContainer,
    ) -> Result<()> {
        if let Some(children) = self.intermediates.get_mut(key) {
            children.insert(child.clone());
            return Ok(());
        }
        container.insert(intermediate_object(instance, prefab, key))?;
        self.intermediates
            .insert(key.to_string(), BTreeSet::from([child.clone()]));
        tracing::debug!("Created intermediate parent {}", intermediate_id(&instance.id, key));
        Ok(())
    }

    fn release_intermediate(
        &mut self,
        instance: &InstanceId,
        key: &str,
        child: &ObjectId,
        container: &mut PlaybackObjectContainer,
    ) {
        let Some(children) = self.intermediates.get_mut(key) else {
            return;
        };
        children.remove(child);
        if children.is_empty() {
            self.intermediates.remove(key);
            container.remove_by_id(&intermediate_id(instance, key));
            tracing::debug!("Deleted intermediate parent {}", intermediate_id(instance, key));
        }
    }

    /// Delete the intermediate standing in for `object`, which is now part of the prefab.
    /// Its children keep pointing at the same id and link to the real clone.
    fn supersede(&mut self, instance: &InstanceId, object: &ObjectId, container: &mut PlaybackObjectContainer) {
        let Some(children) = self.intermediates.remove(object.as_str()) else {
            return;
        };
        container.remove_by_id(&intermediate_id(instance, object.as_str()));
        for child in children {
            if let Some(key) = self.clones.get_mut(&child) {
                *key = None;
            }
        }
        tracing::debug!("Intermediate parent {} superseded", intermediate_id(instance, object.as_str()));
    }

    /// Recompute clone alive ranges after a start time or offset edit
    fn retime(
        &self,
        instance: &PrefabInstance,
        prefab: &Prefab,
        container: &mut PlaybackObjectContainer,
    ) -> Result<()> {
        let time_shift = instance.time_shift(prefab);
        for id in self.clones.keys() {
            let (Some(object), Some(index)) = (prefab.objects.get(id), container.index_of(&clone_id(&instance.id, id)))
            else {
                continue;
            };
            container.set_times(index, object.start_time + time_shift, object.end_time(time_shift))?;
        }
        for key in self.intermediates.keys() {
            if let Some(index) = container.index_of(&intermediate_id(&instance.id, key)) {
                container.set_times(index, time_shift, f32::INFINITY)?;
            }
        }
        Ok(())
    }

    fn update_anchors(&self, instance: &PrefabInstance, container: &mut PlaybackObjectContainer) {
        for key in self.intermediates.keys() {
            let Some(index) = container.index_of(&intermediate_id(&instance.id, key)) else {
                continue;
            };
            if let Some(anchor) = container.get_mut(index) {
                set_anchor(anchor, instance);
            }
        }
    }
}

fn intermediate_object(instance: &PrefabInstance, prefab: &Prefab, key: &str) -> PlaybackObject {
    let parent = (!key.is_empty()).then(|| main_identifier(&ObjectId::from(key)));
    let mut anchor = PlaybackObject::new(intermediate_id(&instance.id, key))
        .with_times(instance.time_shift(prefab), f32::INFINITY)
        .with_visible(false)
        .with_parent(parent)
        .as_anchor();
    anchor.parent_type = ParentType::ALL;
    set_anchor(&mut anchor, instance);
    anchor
}

fn set_anchor(anchor: &mut PlaybackObject, instance: &PrefabInstance) {
    anchor.position = Sequence::constant(instance.position);
    anchor.scale = Sequence::constant(instance.scale);
    anchor.rotation = Sequence::constant(instance.rotation);
}

/// Projects prefab instances into clones and intermediate parents
#[derive(Debug, Default)]
pub struct PrefabInstanceObjectSource {
    instances: BTreeMap<InstanceId, InstanceState>,
    prefabs: BTreeSet<PrefabId>,
    skipped_instances: HashSet<InstanceId>,
    skipped_prefabs: HashSet<PrefabId>,
}

impl PrefabInstanceObjectSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a prefab and expand instances that were waiting for it
    pub fn insert_prefab(
        &mut self,
        doc: &Beatmap,
        id: &PrefabId,
        container: &mut PlaybackObjectContainer,
        seed: RandomSeed,
    ) -> Result<()> {
        let Some(prefab) = doc.prefab(id) else {
            self.skipped_prefabs.insert(id.clone());
            return Ok(());
        };
        self.prefabs.insert(id.clone());
        for (instance_id, state) in self.instances.iter_mut().filter(|(_, s)| s.prefab == *id) {
            let Some(instance) = doc.instance(instance_id) else {
                continue;
            };
            state.collapse(instance_id, container);
            state.expand(instance, prefab, container, seed)?;
        }
        Ok(())
    }

    /// Collapse every instance of a removed prefab
    pub fn remove_prefab(&mut self, id: &PrefabId, container: &mut PlaybackObjectContainer) -> Result<()> {
        if !self.prefabs.remove(id) && !self.skipped_prefabs.remove(id) {
            return Err(SyncError::UnknownPrefab(id.clone()));
        }
        for (instance_id, state) in self.instances.iter_mut().filter(|(_, s)| s.prefab == *id) {
            state.collapse(instance_id, container);
        }
        Ok(())
    }

    /// Apply a prefab property edit
    pub fn update_prefab(
        &mut self,
        doc: &Beatmap,
        id: &PrefabId,
        container: &mut PlaybackObjectContainer,
    ) -> Result<()> {
        let Some(prefab) = doc.prefab(id) else {
            return Ok(());
        };
        if !self.prefabs.contains(id) {
            return Err(SyncError::UnknownPrefab(id.clone()));
        }
        for (instance_id, state) in self.instances.iter().filter(|(_, s)| s.prefab == *id) {
            if let Some(instance) = doc.instance(instance_id) {
                state.retime(instance, prefab, container)?;
            }
        }
        Ok(())
    }

    /// Clone a new prefab object into every instance
    pub fn insert_prefab_object(
        &mut self,
        doc: &Beatmap,
        prefab_id: &PrefabId,
        object_id: &ObjectId,
        container: &mut PlaybackObjectContainer,
        seed: RandomSeed,
    ) -> Result<()> {
        let Some((prefab, object)) = self.lookup(doc, prefab_id, object_id)? else {
            return Ok(());
        };
        for (instance_id, state) in self.instances.iter_mut().filter(|(_, s)| s.prefab == *prefab_id) {
            let Some(instance) = doc.instance(instance_id) else {
                continue;
            };
            if state.clones.contains_key(object_id) {
                continue;
            }
            state.supersede(instance_id, object_id, container);
            state.insert_clone(instance, prefab, object, container, seed)?;
        }
        Ok(())
    }

    /// Drop the clones of a removed prefab object, re-synthesizing an
    /// intermediate for its children
    pub fn remove_prefab_object(
        &mut self,
        doc: &Beatmap,
        prefab_id: &PrefabId,
        object_id: &ObjectId,
        container: &mut PlaybackObjectContainer,
    ) -> Result<()> {
        let Some(prefab) = doc.prefab(prefab_id) else {
            return Ok(());
        };
        if !self.prefabs.contains(prefab_id) {
            return Err(SyncError::UnknownPrefab(prefab_id.clone()));
        }
        let orphans: Vec<&BeatmapObject> = prefab
            .objects
            .values()
            .filter(|object| object.parent.as_ref() == Some(object_id))
            .collect();

        for (instance_id, state) in self.instances.iter_mut().filter(|(_, s)| s.prefab == *prefab_id) {
            let Some(instance) = doc.instance(instance_id) else {
                continue;
            };
            state.remove_clone(instance_id, object_id, container);
            for orphan in &orphans {
                state.relink_clone(instance, prefab, orphan, container)?;
            }
        }
        Ok(())
    }

    /// Push one edited field into every clone of a prefab object
    pub fn update_prefab_object(
        &mut self,
        doc: &Beatmap,
        prefab_id: &PrefabId,
        object_id: &ObjectId,
        field: ObjectField,
        container: &mut PlaybackObjectContainer,
        seed: RandomSeed,
    ) -> Result<()> {
        let Some((prefab, object)) = self.lookup(doc, prefab_id, object_id)? else {
            return Ok(());
        };
        for (instance_id, state) in self.instances.iter_mut().filter(|(_, s)| s.prefab == *prefab_id) {
            let Some(instance) = doc.instance(instance_id) else {
                continue;
            };
            if field == ObjectField::Parent {
                state.relink_clone(instance, prefab, object, container)?;
                continue;
            }
            let index = container
                .index_of(&clone_id(instance_id, object_id))
                .filter(|_| state.clones.contains_key(object_id))
                .ok_or_else(|| SyncError::UnknownPrefabObject {
                    prefab: prefab_id.clone(),
                    object: object_id.clone(),
                })?;
            apply_field(container, index, object, field, instance.time_shift(prefab), seed)?;
        }
        Ok(())
    }

    /// Expand a new instance
    pub fn insert_instance(
        &mut self,
        doc: &Beatmap,
        id: &InstanceId,
        container: &mut PlaybackObjectContainer,
        seed: RandomSeed,
    ) -> Result<()> {
        let Some(instance) = doc.instance(id) else {
            tracing::debug!("Skipping stale insert of instance {}", id);
            self.skipped_instances.insert(id.clone());
            return Ok(());
        };
        if self.instances.contains_key(id) {
            return Err(SyncError::DuplicateInstance(id.clone()));
        }

        let mut state = InstanceState::new(instance.prefab.clone());
        match doc.prefab(&instance.prefab) {
            Some(prefab) => {
                if let Err(e) = state.expand(instance, prefab, container, seed) {
                    state.collapse(id, container);
                    return Err(e);
                }
            }
            None => tracing::warn!("Instance {} references unknown prefab {}", id, instance.prefab),
        }
        self.instances.insert(id.clone(), state);
        Ok(())
    }

    /// Collapse a removed instance
    pub fn remove_instance(&mut self, id: &InstanceId, container: &mut PlaybackObjectContainer) -> Result<()> {
        match self.instances.remove(id) {
            Some(mut state) => {
                state.collapse(id, container);
                Ok(())
            }
            None if self.skipped_instances.remove(id) => Ok(()),
            None => Err(SyncError::UnknownInstance(id.clone())),
        }
    }

    /// Apply an instance property edit
    pub fn update_instance(
        &mut self,
        doc: &Beatmap,
        id: &InstanceId,
        field: InstanceField,
        container: &mut PlaybackObjectContainer,
        seed: RandomSeed,
    ) -> Result<()> {
        let Some(instance) = doc.instance(id) else {
            return Ok(());
        };
        let Some(state) = self.instances.get_mut(id) else {
            return Err(SyncError::UnknownInstance(id.clone()));
        };

        match field {
            InstanceField::StartTime => {
                if let Some(prefab) = doc.prefab(&state.prefab) {
                    state.retime(instance, prefab, container)?;
                }
            }
            InstanceField::Position | InstanceField::Scale | InstanceField::Rotation => {
                state.update_anchors(instance, container);
            }
            InstanceField::Prefab => {
                state.collapse(id, container);
                state.prefab = instance.prefab.clone();
                match doc.prefab(&instance.prefab) {
                    Some(prefab) => state.expand(instance, prefab, container, seed)?,
                    None => tracing::warn!("Instance {} references unknown prefab {}", id, instance.prefab),
                }
            }
        }
        Ok(())
    }

    /// Expand every prefab instance of the document
    pub fn rebuild(&mut self, doc: &Beatmap, container: &mut PlaybackObjectContainer, seed: RandomSeed) -> Result<()> {
        self.clear(container);
        self.prefabs.extend(doc.prefabs().map(|prefab| prefab.id.clone()));
        for instance in doc.instances() {
            self.insert_instance(doc, &instance.id, container, seed)?;
        }
        Ok(())
    }

    /// Drop every clone and intermediate
    pub fn clear(&mut self, container: &mut PlaybackObjectContainer) {
        for (id, mut state) in std::mem::take(&mut self.instances) {
            state.collapse(&id, container);
        }
        self.prefabs.clear();
        self.skipped_instances.clear();
        self.skipped_prefabs.clear();
    }

    /// Number of expanded instances
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Number of live intermediate parents of `instance`
    pub fn intermediate_count(&self, instance: &InstanceId) -> usize {
        self.instances.get(instance).map_or(0, |state| state.intermediates.len())
    }

    /// Resolve a prefab object, or `None` if the change is stale
    fn lookup<'d>(
        &self,
        doc: &'d Beatmap,
        prefab_id: &PrefabId,
        object_id: &ObjectId,
    ) -> Result<Option<(&'d Prefab, &'d BeatmapObject)>> {
        let Some(prefab) = doc.prefab(prefab_id) else {
            return Ok(None);
        };
        if !self.prefabs.contains(prefab_id) {
            return Err(SyncError::UnknownPrefab(prefab_id.clone()));
        }
        Ok(prefab.objects.get(object_id).map(|object| (prefab, object)))
    }
}
