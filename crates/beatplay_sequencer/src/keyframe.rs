// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe definitions and value interpolation.

use crate::easing::Easing;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A single sample on a piecewise curve
///
/// Keyframes are immutable once built; sequences replace them wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<T> {
    /// Time in seconds, relative to the owner's start time
    pub time: f32,
    /// Easing applied on the segment that ends at this keyframe
    pub ease: Easing,
    /// Value at this keyframe
    pub value: T,
}

impl<T> Keyframe<T> {
    /// Create a new keyframe
    pub fn new(time: f32, ease: Easing, value: T) -> Self {
        Self { time, ease, value }
    }

    /// Create a linear keyframe
    pub fn linear(time: f32, value: T) -> Self {
        Self::new(time, Easing::Linear, value)
    }

    /// Map the value while keeping time and easing
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Keyframe<U> {
        Keyframe {
            time: self.time,
            ease: self.ease,
            value: f(self.value),
        }
    }
}

/// Values that can be blended between two keyframes
///
/// Interpolation is always a pure numeric blend; context-dependent values are
/// resolved into an `Interpolate` type before blending.
pub trait Interpolate: Clone {
    /// Blend from `self` towards `other` by `t`
    fn interpolate(&self, other: &Self, t: f32) -> Self;
}

/// Linear interpolation between two floats
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

impl Interpolate for f32 {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        lerp(*self, *other, t)
    }
}

impl Interpolate for Vec2 {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        self.lerp(*other, t)
    }
}

impl Interpolate for bool {
    fn interpolate(&self, _other: &Self, _t: f32) -> Self {
        *self // No interpolation for bool
    }
}

impl<A: Interpolate, B: Interpolate> Interpolate for (A, B) {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        (self.0.interpolate(&other.0, t), self.1.interpolate(&other.1, t))
    }
}
