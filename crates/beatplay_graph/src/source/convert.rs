// SPDX-License-Identifier: MIT OR Apache-2.0
//! Projection of document objects onto playback objects.

use crate::arena::{ArenaError, Result};
use crate::container::PlaybackObjectContainer;
use crate::document::{BeatmapObject, ObjectField, ObjectId, RandomKeyframe};
use crate::identifier::Identifier;
use crate::object::{ColorSequence, PlaybackObject};
use beatplay_sequencer::{
    randomize_scalar, randomize_vec2, IndirectSequence, Keyframe, RandomIdentity, RandomSeed, RandomSetting,
};
use glam::Vec2;

/// Runtime identifier of a main object
pub(crate) fn main_identifier(id: &ObjectId) -> Identifier {
    Identifier::new(id.as_str())
}

/// Build the playback object for `object` shifted by `time_shift`
pub(crate) fn build_object(
    object: &BeatmapObject,
    id: Identifier,
    time_shift: f32,
    parent: Option<Identifier>,
    seed: RandomSeed,
) -> PlaybackObject {
    let mut playback = PlaybackObject::new(id)
        .with_times(object.start_time + time_shift, object.end_time(time_shift))
        .with_visible(object.visible)
        .with_parent(parent)
        .with_text(object.text.clone());
    copy_render_fields(&mut playback, object);
    for field in [
        ObjectField::PositionKeyframes,
        ObjectField::ScaleKeyframes,
        ObjectField::RotationKeyframes,
        ObjectField::ColorKeyframes,
    ] {
        load_channel(&mut playback, object, field, seed);
    }
    playback
}

/// Push one edited field into the playback object at `index`.
///
/// Parent links are resolved by the owning source and ignored here.
pub(crate) fn apply_field(
    container: &mut PlaybackObjectContainer,
    index: usize,
    object: &BeatmapObject,
    field: ObjectField,
    time_shift: f32,
    seed: RandomSeed,
) -> Result<()> {
    let start_time = object.start_time + time_shift;
    let end_time = object.end_time(time_shift);
    match field {
        ObjectField::StartTime | ObjectField::AutoKill => container.set_times(index, start_time, end_time),
        ObjectField::Visible => container.set_visible(index, object.visible),
        ObjectField::Text => container.set_text(index, object.text.clone()),
        ObjectField::Parent => Ok(()),
        ObjectField::PositionKeyframes
        | ObjectField::ScaleKeyframes
        | ObjectField::RotationKeyframes
        | ObjectField::ColorKeyframes => {
            let playback = container.get_mut(index).ok_or(ArenaError::UnknownIndex(index))?;
            load_channel(playback, object, field, seed);
            // the last keyframe may have moved
            container.set_times(index, start_time, end_time)
        }
        ObjectField::ParentType
        | ObjectField::ParentOffset
        | ObjectField::RenderMode
        | ObjectField::Origin
        | ObjectField::RenderDepth
        | ObjectField::Shape => {
            let playback = container.get_mut(index).ok_or(ArenaError::UnknownIndex(index))?;
            copy_render_fields(playback, object);
            Ok(())
        }
    }
}

fn copy_render_fields(playback: &mut PlaybackObject, object: &BeatmapObject) {
    playback.parent_type = object.parent_type;
    playback.parent_offset = object.parent_offset;
    playback.render_mode = object.render_mode;
    playback.origin = object.origin;
    playback.render_depth = object.render_depth;
    playback.shape = object.shape;
}

fn load_channel(playback: &mut PlaybackObject, object: &BeatmapObject, field: ObjectField, seed: RandomSeed) {
    let key = playback.id().key_bytes();
    match field {
        ObjectField::PositionKeyframes => playback
            .position
            .load_keyframes(resolve_vec2(seed, &key, "position", &object.position)),
        ObjectField::ScaleKeyframes => playback
            .scale
            .load_keyframes(resolve_vec2(seed, &key, "scale", &object.scale)),
        ObjectField::RotationKeyframes => playback
            .rotation
            .load_keyframes(resolve_scalar(seed, &key, "rotation", &object.rotation)),
        ObjectField::ColorKeyframes => {
            playback.color = ColorSequence::Themed(IndirectSequence::from_keyframes(object.color.iter().copied()));
        }
        _ => {}
    }
}

fn resolve_vec2(seed: RandomSeed, key: &[u8], channel: &str, keyframes: &[RandomKeyframe<Vec2>]) -> Vec<Keyframe<Vec2>> {
    resolve(key, channel, keyframes, |identity, value, random| {
        randomize_vec2(seed, identity, value, random)
    })
}

fn resolve_scalar(seed: RandomSeed, key: &[u8], channel: &str, keyframes: &[RandomKeyframe<f32>]) -> Vec<Keyframe<f32>> {
    resolve(key, channel, keyframes, |identity, value, random| {
        randomize_scalar(seed, identity, value, random)
    })
}

/// Randomize every keyframe with a per-keyframe channel tag such as `position#2`
fn resolve<T: Copy>(
    key: &[u8],
    channel: &str,
    keyframes: &[RandomKeyframe<T>],
    randomize: impl Fn(&RandomIdentity<'_>, T, &RandomSetting) -> T,
) -> Vec<Keyframe<T>> {
    keyframes
        .iter()
        .enumerate()
        .map(|(ordinal, keyframe)| {
            let tag = format!("{channel}#{ordinal}");
            let value = randomize(&RandomIdentity::new(key, &tag), keyframe.value, &keyframe.random);
            Keyframe::new(keyframe.time, keyframe.ease, value)
        })
        .collect()
}
