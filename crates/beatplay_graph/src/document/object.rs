// SPDX-License-Identifier: MIT OR Apache-2.0
//! Beatmap objects as authored in the document.

use super::ObjectId;
use crate::object::{ParentOffset, ParentType, RenderMode, ShapeIndex};
use beatplay_sequencer::{Easing, Keyframe, RandomSetting, ThemeColorKey};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// When an object stops being alive
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum AutoKill {
    /// Alive until the end of the song
    Never,
    /// Dies at its last keyframe
    #[default]
    LastKeyframe,
    /// Dies this many seconds after its last keyframe
    LastKeyframeOffset(f32),
    /// Lives for a fixed number of seconds
    Fixed(f32),
    /// Dies at an absolute song time
    SongTime(f32),
}

impl AutoKill {
    /// End time for an object starting at `start_time` whose last keyframe is
    /// `duration` seconds in. `time_shift` moves absolute song times along
    /// with prefab clones.
    pub fn end_time(self, start_time: f32, duration: f32, time_shift: f32) -> f32 {
        match self {
            AutoKill::Never => f32::INFINITY,
            AutoKill::LastKeyframe => start_time + duration,
            AutoKill::LastKeyframeOffset(offset) => start_time + duration + offset,
            AutoKill::Fixed(length) => start_time + length,
            AutoKill::SongTime(time) => time + time_shift,
        }
    }
}

/// Keyframe whose value may be randomized when loaded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomKeyframe<T> {
    /// Time relative to the object's start
    pub time: f32,
    /// Easing of the segment ending here
    pub ease: Easing,
    /// Base value
    pub value: T,
    /// Randomization settings
    pub random: RandomSetting,
}

impl<T> RandomKeyframe<T> {
    /// Keyframe without randomization
    pub fn new(time: f32, ease: Easing, value: T) -> Self {
        Self {
            time,
            ease,
            value,
            random: RandomSetting::NONE,
        }
    }

    /// Linear keyframe without randomization
    pub fn linear(time: f32, value: T) -> Self {
        Self::new(time, Easing::Linear, value)
    }

    /// Attach randomization settings
    pub fn with_random(mut self, random: RandomSetting) -> Self {
        self.random = random;
        self
    }
}

/// An authored object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatmapObject {
    /// Unique id
    pub id: ObjectId,
    /// Display name
    pub name: String,
    /// Start time in song seconds
    pub start_time: f32,
    /// End time rule
    pub autokill: AutoKill,
    /// Whether the object is drawn at all
    pub visible: bool,
    /// Parent object id
    pub parent: Option<ObjectId>,
    /// Channels inherited from the parent
    pub parent_type: ParentType,
    /// Per-channel parent delays
    pub parent_offset: ParentOffset,
    /// Render layer
    pub render_mode: RenderMode,
    /// Pivot offset
    pub origin: Vec2,
    /// Draw order key
    pub render_depth: i32,
    /// Shape reference
    pub shape: ShapeIndex,
    /// Text for text shapes
    pub text: Option<String>,
    /// Position keyframes
    pub position: Vec<RandomKeyframe<Vec2>>,
    /// Scale keyframes
    pub scale: Vec<RandomKeyframe<Vec2>>,
    /// Rotation keyframes in degrees
    pub rotation: Vec<RandomKeyframe<f32>>,
    /// Color keyframes referencing object palette slots
    pub color: Vec<Keyframe<ThemeColorKey>>,
}

impl BeatmapObject {
    /// Create an object with default settings
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            start_time: 0.0,
            autokill: AutoKill::default(),
            visible: true,
            parent: None,
            parent_type: ParentType::default(),
            parent_offset: ParentOffset::ZERO,
            render_mode: RenderMode::Normal,
            origin: Vec2::ZERO,
            render_depth: 0,
            shape: ShapeIndex::default(),
            text: None,
            position: Vec::new(),
            scale: Vec::new(),
            rotation: Vec::new(),
            color: Vec::new(),
        }
    }

    /// Time of the last keyframe over all channels
    pub fn duration(&self) -> f32 {
        self.position
            .iter()
            .map(|k| k.time)
            .chain(self.scale.iter().map(|k| k.time))
            .chain(self.rotation.iter().map(|k| k.time))
            .chain(self.color.iter().map(|k| k.time))
            .fold(0.0, f32::max)
    }

    /// End time when the object's timeline is shifted by `time_shift`
    pub fn end_time(&self, time_shift: f32) -> f32 {
        self.autokill
            .end_time(self.start_time + time_shift, self.duration(), time_shift)
    }
}
