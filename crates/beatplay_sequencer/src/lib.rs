// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe primitives for beatplay.
//!
//! This crate provides the leaf building blocks of the animation engine:
//! - Named easing curves
//! - Keyframes and keyframe sequences with binary-search evaluation
//! - Indirect sequences resolved against a context before interpolation
//! - Deterministic, seed-driven keyframe randomization
//! - Palettes ("themes") and interpolated theme state
//! - Camera and post-processing event tracks
//!
//! ## Architecture
//!
//! Everything here is a pure function of keyframes and time. Mutable
//! scratch state only exists in [`ThemeResolver`], whose output is valid
//! until its next call.

pub mod easing;
pub mod keyframe;
pub mod random;
pub mod sequence;
pub mod theme;
pub mod track;

pub use easing::Easing;
pub use keyframe::{lerp, Interpolate, Keyframe};
pub use random::{randomize_scalar, randomize_vec2, RandomIdentity, RandomMode, RandomSeed, RandomSetting};
pub use sequence::{Bracket, IndirectSequence, ResolveValue, Sequence};
pub use theme::{
    Color, EffectColorKey, GradientColor, Theme, ThemeColorKey, ThemeColorState, ThemeResolver, ThemeSource,
};
pub use track::{
    Bloom, BloomKey, CameraState, EventState, EventTrackKind, EventTracks, Glitch, Gradient, GradientKey,
    GradientMode, LensDistortion, Shake, Vignette, VignetteKey,
};
