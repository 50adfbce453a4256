// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera and post-processing event tracks.
//!
//! Each track is a keyframe sequence. Tracks whose values reference effect
//! palette slots are indirect and resolve against the current
//! [`ThemeColorState`].

use crate::keyframe::{lerp, Interpolate};
use crate::sequence::{IndirectSequence, ResolveValue, Sequence};
use crate::theme::{Color, EffectColorKey, ThemeColorState};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Camera zoom when the zoom track is empty
pub const DEFAULT_CAMERA_ZOOM: f32 = 20.0;

/// Kind of event track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTrackKind {
    /// Camera position
    CameraPosition,
    /// Camera zoom
    CameraZoom,
    /// Camera rotation
    CameraRotation,
    /// Screen shake
    Shake,
    /// Bloom
    Bloom,
    /// Vignette
    Vignette,
    /// Screen gradient
    Gradient,
    /// Glitch
    Glitch,
    /// Hue shift
    Hue,
    /// Lens distortion
    LensDistortion,
    /// Chromatic aberration
    ChromaticAberration,
}

impl EventTrackKind {
    /// All kinds
    pub const ALL: [EventTrackKind; 11] = [
        EventTrackKind::CameraPosition,
        EventTrackKind::CameraZoom,
        EventTrackKind::CameraRotation,
        EventTrackKind::Shake,
        EventTrackKind::Bloom,
        EventTrackKind::Vignette,
        EventTrackKind::Gradient,
        EventTrackKind::Glitch,
        EventTrackKind::Hue,
        EventTrackKind::LensDistortion,
        EventTrackKind::ChromaticAberration,
    ];

    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::CameraPosition => "Camera Position",
            Self::CameraZoom => "Camera Zoom",
            Self::CameraRotation => "Camera Rotation",
            Self::Shake => "Shake",
            Self::Bloom => "Bloom",
            Self::Vignette => "Vignette",
            Self::Gradient => "Gradient",
            Self::Glitch => "Glitch",
            Self::Hue => "Hue",
            Self::LensDistortion => "Lens Distortion",
            Self::ChromaticAberration => "Chromatic Aberration",
        }
    }
}

/// Screen shake
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Shake {
    /// Shake strength
    pub intensity: f32,
    /// Per-axis shake weight
    pub direction: Vec2,
    /// Shake frequency
    pub speed: f32,
}

impl Interpolate for Shake {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        Self {
            intensity: lerp(self.intensity, other.intensity, t),
            direction: self.direction.lerp(other.direction, t),
            speed: lerp(self.speed, other.speed, t),
        }
    }
}

/// Bloom keyframe value
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BloomKey {
    /// Bloom strength
    pub intensity: f32,
    /// Bloom spread
    pub diffusion: f32,
    /// Tint from the effect palette
    pub color: EffectColorKey,
}

/// Resolved bloom
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bloom {
    /// Bloom strength
    pub intensity: f32,
    /// Bloom spread
    pub diffusion: f32,
    /// Tint
    pub color: Color,
}

impl Default for Bloom {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            diffusion: 0.0,
            color: Color::WHITE,
        }
    }
}

impl ResolveValue<ThemeColorState> for BloomKey {
    type Output = Bloom;

    fn resolve(&self, ctx: &ThemeColorState) -> Bloom {
        Bloom {
            intensity: self.intensity,
            diffusion: self.diffusion,
            color: self.color.resolve(ctx),
        }
    }
}

impl Interpolate for Bloom {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        Self {
            intensity: lerp(self.intensity, other.intensity, t),
            diffusion: lerp(self.diffusion, other.diffusion, t),
            color: self.color.interpolate(&other.color, t),
        }
    }
}

/// Vignette keyframe value
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VignetteKey {
    /// Darkening strength
    pub intensity: f32,
    /// Edge softness
    pub smoothness: f32,
    /// Rounded vignette
    pub rounded: bool,
    /// Roundness when `rounded`
    pub roundness: f32,
    /// Center in viewport space
    pub center: Vec2,
    /// Tint from the effect palette
    pub color: EffectColorKey,
}

/// Resolved vignette
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vignette {
    /// Darkening strength
    pub intensity: f32,
    /// Edge softness
    pub smoothness: f32,
    /// Rounded vignette
    pub rounded: bool,
    /// Roundness
    pub roundness: f32,
    /// Center in viewport space
    pub center: Vec2,
    /// Tint
    pub color: Color,
}

impl Default for Vignette {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            smoothness: 0.0,
            rounded: false,
            roundness: 0.0,
            center: Vec2::splat(0.5),
            color: Color::BLACK,
        }
    }
}

impl ResolveValue<ThemeColorState> for VignetteKey {
    type Output = Vignette;

    fn resolve(&self, ctx: &ThemeColorState) -> Vignette {
        Vignette {
            intensity: self.intensity,
            smoothness: self.smoothness,
            rounded: self.rounded,
            roundness: self.roundness,
            center: self.center,
            color: self.color.resolve(ctx),
        }
    }
}

impl Interpolate for Vignette {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        Self {
            intensity: lerp(self.intensity, other.intensity, t),
            smoothness: lerp(self.smoothness, other.smoothness, t),
            rounded: self.rounded,
            roundness: lerp(self.roundness, other.roundness, t),
            center: self.center.lerp(other.center, t),
            color: self.color.interpolate(&other.color, t),
        }
    }
}

/// Blend mode of the screen gradient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GradientMode {
    /// Replace
    #[default]
    Linear,
    /// Add
    Additive,
    /// Multiply
    Multiply,
    /// Screen
    Screen,
}

/// Gradient keyframe value
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GradientKey {
    /// Gradient strength
    pub intensity: f32,
    /// Gradient angle in degrees
    pub rotation: f32,
    /// Top color from the effect palette
    pub top: EffectColorKey,
    /// Bottom color from the effect palette
    pub bottom: EffectColorKey,
    /// Blend mode
    pub mode: GradientMode,
}

/// Resolved screen gradient
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gradient {
    /// Gradient strength
    pub intensity: f32,
    /// Gradient angle in degrees
    pub rotation: f32,
    /// Top color
    pub top: Color,
    /// Bottom color
    pub bottom: Color,
    /// Blend mode
    pub mode: GradientMode,
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            rotation: 0.0,
            top: Color::TRANSPARENT,
            bottom: Color::TRANSPARENT,
            mode: GradientMode::Linear,
        }
    }
}

impl ResolveValue<ThemeColorState> for GradientKey {
    type Output = Gradient;

    fn resolve(&self, ctx: &ThemeColorState) -> Gradient {
        Gradient {
            intensity: self.intensity,
            rotation: self.rotation,
            top: self.top.resolve(ctx),
            bottom: self.bottom.resolve(ctx),
            mode: self.mode,
        }
    }
}

impl Interpolate for Gradient {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        Self {
            intensity: lerp(self.intensity, other.intensity, t),
            rotation: lerp(self.rotation, other.rotation, t),
            top: self.top.interpolate(&other.top, t),
            bottom: self.bottom.interpolate(&other.bottom, t),
            mode: self.mode,
        }
    }
}

/// Glitch effect
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Glitch {
    /// Glitch strength
    pub intensity: f32,
    /// Glitch speed
    pub speed: f32,
    /// Band width
    pub width: f32,
}

impl Interpolate for Glitch {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        Self {
            intensity: lerp(self.intensity, other.intensity, t),
            speed: lerp(self.speed, other.speed, t),
            width: lerp(self.width, other.width, t),
        }
    }
}

/// Lens distortion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LensDistortion {
    /// Distortion strength, negative for pincushion
    pub intensity: f32,
    /// Center in viewport space
    pub center: Vec2,
}

impl Default for LensDistortion {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            center: Vec2::splat(0.5),
        }
    }
}

impl Interpolate for LensDistortion {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        Self {
            intensity: lerp(self.intensity, other.intensity, t),
            center: self.center.lerp(other.center, t),
        }
    }
}

/// Resolved camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraState {
    /// World position
    pub position: Vec2,
    /// Orthographic half-height
    pub zoom: f32,
    /// Rotation in degrees
    pub rotation: f32,
}

/// Fully resolved event state for one time value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventState {
    /// Camera
    pub camera: CameraState,
    /// Shake
    pub shake: Shake,
    /// Bloom
    pub bloom: Bloom,
    /// Vignette
    pub vignette: Vignette,
    /// Gradient
    pub gradient: Gradient,
    /// Glitch
    pub glitch: Glitch,
    /// Hue shift in degrees
    pub hue: f32,
    /// Lens distortion
    pub lens_distortion: LensDistortion,
    /// Chromatic aberration strength
    pub chromatic_aberration: f32,
}

/// Camera and post-processing tracks of a beatmap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventTracks {
    /// Camera position
    pub camera_position: Sequence<Vec2>,
    /// Camera zoom
    pub camera_zoom: Sequence<f32>,
    /// Camera rotation in degrees
    pub camera_rotation: Sequence<f32>,
    /// Screen shake
    pub shake: Sequence<Shake>,
    /// Bloom
    pub bloom: IndirectSequence<BloomKey>,
    /// Vignette
    pub vignette: IndirectSequence<VignetteKey>,
    /// Gradient
    pub gradient: IndirectSequence<GradientKey>,
    /// Glitch
    pub glitch: Sequence<Glitch>,
    /// Hue shift
    pub hue: Sequence<f32>,
    /// Lens distortion
    pub lens_distortion: Sequence<LensDistortion>,
    /// Chromatic aberration
    pub chromatic_aberration: Sequence<f32>,
}

impl EventTracks {
    /// Create empty tracks
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every track at `time` against the current theme state
    pub fn resolve(&self, time: f32, theme: &ThemeColorState) -> EventState {
        EventState {
            camera: CameraState {
                position: self.camera_position.compute_value_at(time, Vec2::ZERO),
                zoom: self.camera_zoom.compute_value_at(time, DEFAULT_CAMERA_ZOOM),
                rotation: self.camera_rotation.compute_value_at(time, 0.0),
            },
            shake: self.shake.compute_value_at(time, Shake::default()),
            bloom: self.bloom.compute_value_at(time, theme, Bloom::default()),
            vignette: self.vignette.compute_value_at(time, theme, Vignette::default()),
            gradient: self.gradient.compute_value_at(time, theme, Gradient::default()),
            glitch: self.glitch.compute_value_at(time, Glitch::default()),
            hue: self.hue.compute_value_at(time, 0.0),
            lens_distortion: self.lens_distortion.compute_value_at(time, LensDistortion::default()),
            chromatic_aberration: self.chromatic_aberration.compute_value_at(time, 0.0),
        }
    }

    /// Number of keyframes on a track
    pub fn keyframe_count(&self, kind: EventTrackKind) -> usize {
        match kind {
            EventTrackKind::CameraPosition => self.camera_position.len(),
            EventTrackKind::CameraZoom => self.camera_zoom.len(),
            EventTrackKind::CameraRotation => self.camera_rotation.len(),
            EventTrackKind::Shake => self.shake.len(),
            EventTrackKind::Bloom => self.bloom.keyframes().len(),
            EventTrackKind::Vignette => self.vignette.keyframes().len(),
            EventTrackKind::Gradient => self.gradient.keyframes().len(),
            EventTrackKind::Glitch => self.glitch.len(),
            EventTrackKind::Hue => self.hue.len(),
            EventTrackKind::LensDistortion => self.lens_distortion.len(),
            EventTrackKind::ChromaticAberration => self.chromatic_aberration.len(),
        }
    }
}
