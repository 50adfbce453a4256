// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback objects: the flat, evaluable runtime nodes.

use crate::arena::Identified;
use crate::identifier::Identifier;
use beatplay_sequencer::{GradientColor, IndirectSequence, Sequence, ThemeColorKey, ThemeColorState};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::ops::BitOr;

/// Which parent channels a child inherits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentType(u8);

impl ParentType {
    /// Inherit nothing
    pub const NONE: ParentType = ParentType(0);
    /// Inherit position
    pub const POSITION: ParentType = ParentType(1);
    /// Inherit scale
    pub const SCALE: ParentType = ParentType(1 << 1);
    /// Inherit rotation
    pub const ROTATION: ParentType = ParentType(1 << 2);
    /// Inherit every channel
    pub const ALL: ParentType = ParentType(0b111);

    /// Build from per-channel flags
    pub fn from_flags(position: bool, scale: bool, rotation: bool) -> Self {
        let mut bits = 0;
        if position {
            bits |= Self::POSITION.0;
        }
        if scale {
            bits |= Self::SCALE.0;
        }
        if rotation {
            bits |= Self::ROTATION.0;
        }
        ParentType(bits)
    }

    /// Whether every channel of `other` is set
    pub fn contains(self, other: ParentType) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bits
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl Default for ParentType {
    /// Position and rotation, without scale
    fn default() -> Self {
        ParentType::POSITION | ParentType::ROTATION
    }
}

impl BitOr for ParentType {
    type Output = ParentType;

    fn bitor(self, rhs: Self) -> Self {
        ParentType(self.0 | rhs.0)
    }
}

/// Per-channel time offsets applied when sampling the parent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ParentOffset {
    /// Position delay in seconds
    pub position: f32,
    /// Scale delay in seconds
    pub scale: f32,
    /// Rotation delay in seconds
    pub rotation: f32,
}

impl ParentOffset {
    /// No delay on any channel
    pub const ZERO: ParentOffset = ParentOffset {
        position: 0.0,
        scale: 0.0,
        rotation: 0.0,
    };
}

/// Render layer of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// Regular foreground object
    #[default]
    Normal,
    /// Drawn in the background layer
    Background,
}

/// Numeric shape reference resolved by the render registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ShapeIndex {
    /// Shape family
    pub shape: u16,
    /// Variant within the family
    pub option: u16,
}

impl ShapeIndex {
    /// Shape family rendered as text
    pub const TEXT: u16 = 4;

    /// Create a shape reference
    pub fn new(shape: u16, option: u16) -> Self {
        Self { shape, option }
    }

    /// Text shape reference
    pub fn text() -> Self {
        Self::new(Self::TEXT, 0)
    }

    /// Whether this shape is drawn as text
    pub fn is_text(self) -> bool {
        self.shape == Self::TEXT
    }
}

/// Color channel of a playback object
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSequence {
    /// Literal gradient colors
    Direct(Sequence<GradientColor>),
    /// Object palette references resolved against the current theme
    Themed(IndirectSequence<ThemeColorKey>),
}

impl Default for ColorSequence {
    fn default() -> Self {
        ColorSequence::Themed(IndirectSequence::default())
    }
}

impl ColorSequence {
    /// Evaluate at `time` against the current theme state
    pub fn compute_value_at(&self, time: f32, theme: &ThemeColorState) -> GradientColor {
        match self {
            ColorSequence::Direct(sequence) => sequence.compute_value_at(time, GradientColor::default()),
            ColorSequence::Themed(sequence) => sequence.compute_value_at(time, theme, GradientColor::default()),
        }
    }

    /// Time of the last keyframe
    pub fn duration(&self) -> f32 {
        match self {
            ColorSequence::Direct(sequence) => sequence.duration(),
            ColorSequence::Themed(sequence) => sequence.duration(),
        }
    }
}

/// A flat runtime node evaluated by the pipeline
///
/// Start time, end time, visibility, parent and text change only through
/// [`PlaybackObjectContainer`](crate::container::PlaybackObjectContainer) so
/// that the timeline, the parent links and the text cache stay consistent.
#[derive(Debug, Clone)]
pub struct PlaybackObject {
    id: Identifier,
    pub(crate) start_time: f32,
    pub(crate) end_time: f32,
    pub(crate) visible: bool,
    pub(crate) parent_id: Option<Identifier>,
    pub(crate) text: Option<String>,
    anchor: bool,
    /// Channels inherited from the parent
    pub parent_type: ParentType,
    /// Per-channel parent sampling delays
    pub parent_offset: ParentOffset,
    /// Render layer
    pub render_mode: RenderMode,
    /// Pivot offset applied before the object's own transform
    pub origin: Vec2,
    /// Author-set draw order key
    pub render_depth: i32,
    /// Shape reference
    pub shape: ShapeIndex,
    /// Position keyframes
    pub position: Sequence<Vec2>,
    /// Scale keyframes
    pub scale: Sequence<Vec2>,
    /// Rotation keyframes in degrees
    pub rotation: Sequence<f32>,
    /// Color keyframes
    pub color: ColorSequence,
}

impl PlaybackObject {
    /// Create a visible object alive forever from time 0
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            start_time: 0.0,
            end_time: f32::INFINITY,
            visible: true,
            parent_id: None,
            text: None,
            anchor: false,
            parent_type: ParentType::default(),
            parent_offset: ParentOffset::ZERO,
            render_mode: RenderMode::Normal,
            origin: Vec2::ZERO,
            render_depth: 0,
            shape: ShapeIndex::default(),
            position: Sequence::new(),
            scale: Sequence::new(),
            rotation: Sequence::new(),
            color: ColorSequence::default(),
        }
    }

    /// Set the alive range
    pub fn with_times(mut self, start_time: f32, end_time: f32) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    /// Set visibility
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set the parent reference
    pub fn with_parent(mut self, parent: Option<Identifier>) -> Self {
        self.parent_id = parent;
        self
    }

    /// Set the text
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text;
        self
    }

    /// Mark as a transform anchor.
    ///
    /// Children apply every channel of an anchor without delay, and the
    /// anchor's own parent link uses the inheritance settings of the child
    /// below it.
    pub fn as_anchor(mut self) -> Self {
        self.anchor = true;
        self
    }

    /// Whether this is a transform anchor
    pub fn is_anchor(&self) -> bool {
        self.anchor
    }

    /// Identifier
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    /// Start time in seconds
    pub fn start_time(&self) -> f32 {
        self.start_time
    }

    /// End time in seconds (exclusive)
    pub fn end_time(&self) -> f32 {
        self.end_time
    }

    /// Whether the object is ever scheduled
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Identifier of the parent, if any
    pub fn parent_id(&self) -> Option<&Identifier> {
        self.parent_id.as_ref()
    }

    /// Text for text shapes
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl Identified for PlaybackObject {
    fn id(&self) -> &Identifier {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatplay_sequencer::{Color, Keyframe, Theme};

    #[test]
    fn test_parent_type_flags() {
        let flags = ParentType::from_flags(true, false, true);
        assert!(flags.contains(ParentType::POSITION));
        assert!(!flags.contains(ParentType::SCALE));
        assert!(flags.contains(ParentType::ROTATION));
        assert_eq!(flags, ParentType::default());
        assert!(ParentType::ALL.contains(flags));
        assert!(!ParentType::NONE.contains(ParentType::POSITION));
    }

    #[test]
    fn test_themed_color() {
        let mut theme = ThemeColorState::from_theme(&Theme::uniform("t", Color::BLACK));
        theme.object[2] = Color::WHITE;
        let color = ColorSequence::Themed(IndirectSequence::from_keyframes([
            Keyframe::linear(0.0, ThemeColorKey::solid(0, 1.0)),
            Keyframe::linear(2.0, ThemeColorKey::solid(2, 0.0)),
        ]));
        let value = color.compute_value_at(1.0, &theme);
        assert_eq!(value.primary, Color::rgba(0.5, 0.5, 0.5, 1.0));
        assert_eq!(value.opacity, 0.5);
        assert_eq!(color.duration(), 2.0);
    }

    #[test]
    fn test_empty_color_is_opaque_white() {
        let color = ColorSequence::default();
        assert_eq!(color.compute_value_at(0.0, &ThemeColorState::default()), GradientColor::default());
    }
}
