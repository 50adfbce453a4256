// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe sequences.
//!
//! A [`Sequence`] is a time-sorted keyframe array evaluated by binary search.
//! An [`IndirectSequence`] stores keyframes whose values only become
//! interpolatable once resolved against a context (for example a palette
//! index resolved against the current theme state).

use crate::keyframe::{Interpolate, Keyframe};
use serde::{Deserialize, Serialize};

/// Result of locating a time inside a sequence
#[derive(Debug, Clone, Copy)]
pub enum Bracket<'a, T> {
    /// The sequence has no keyframes
    Empty,
    /// The time resolves to a single keyframe (endpoint clamp or single-key sequence)
    Single(&'a Keyframe<T>),
    /// The time lies strictly between two keyframes
    Between {
        /// Keyframe at or before the time
        left: &'a Keyframe<T>,
        /// Keyframe after the time
        right: &'a Keyframe<T>,
        /// Eased progress from `left` to `right`
        t: f32,
    },
}

/// A time-sorted keyframe array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence<T> {
    keyframes: Vec<Keyframe<T>>,
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self {
            keyframes: Vec::new(),
        }
    }
}

impl<T> Sequence<T> {
    /// Create an empty sequence
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sequence from keyframes in any order
    pub fn from_keyframes(keyframes: impl IntoIterator<Item = Keyframe<T>>) -> Self {
        let mut sequence = Self::new();
        sequence.load_keyframes(keyframes);
        sequence
    }

    /// Create a sequence holding one constant value
    pub fn constant(value: T) -> Self {
        Self {
            keyframes: vec![Keyframe::linear(0.0, value)],
        }
    }

    /// Replace all keyframes.
    ///
    /// The sort is stable: keyframes sharing a time keep their input order,
    /// and the last of them wins when evaluating exactly at that time.
    pub fn load_keyframes(&mut self, keyframes: impl IntoIterator<Item = Keyframe<T>>) {
        self.keyframes.clear();
        self.keyframes.extend(keyframes);
        self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// All keyframes, sorted by time
    pub fn keyframes(&self) -> &[Keyframe<T>] {
        &self.keyframes
    }

    /// Number of keyframes
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Whether the sequence has no keyframes
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Time of the last keyframe, or 0 when empty
    pub fn duration(&self) -> f32 {
        self.keyframes.last().map(|k| k.time).unwrap_or(0.0)
    }

    /// Locate `time` in the sequence.
    ///
    /// Times before the first keyframe or at-or-after the last one clamp to
    /// that endpoint; there is no extrapolation.
    pub fn bracket(&self, time: f32) -> Bracket<'_, T> {
        let (Some(first), Some(last)) = (self.keyframes.first(), self.keyframes.last()) else {
            return Bracket::Empty;
        };

        if self.keyframes.len() == 1 || time < first.time || time.is_nan() {
            return Bracket::Single(first);
        }
        if time >= last.time {
            return Bracket::Single(last);
        }

        // Clamped for NaN keyframe times, which sort to either end
        let idx = self
            .keyframes
            .partition_point(|k| k.time <= time)
            .clamp(1, self.keyframes.len() - 1);
        let left = &self.keyframes[idx - 1];
        let right = &self.keyframes[idx];
        let t = (time - left.time) / (right.time - left.time);

        Bracket::Between {
            left,
            right,
            t: right.ease.apply(t),
        }
    }
}

impl<T: Interpolate> Sequence<T> {
    /// Evaluate the sequence at `time`, returning `default` when empty
    pub fn compute_value_at(&self, time: f32, default: T) -> T {
        match self.bracket(time) {
            Bracket::Empty => default,
            Bracket::Single(key) => key.value.clone(),
            Bracket::Between { left, right, t } => left.value.interpolate(&right.value, t),
        }
    }
}

/// A keyframe value that must be resolved against a context before blending
pub trait ResolveValue<Ctx: ?Sized> {
    /// Interpolatable resolved form
    type Output: Interpolate;

    /// Resolve this value against `ctx`
    fn resolve(&self, ctx: &Ctx) -> Self::Output;
}

/// A sequence whose endpoint values are resolved per call before interpolation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndirectSequence<T> {
    inner: Sequence<T>,
}

impl<T> Default for IndirectSequence<T> {
    fn default() -> Self {
        Self {
            inner: Sequence::default(),
        }
    }
}

impl<T> IndirectSequence<T> {
    /// Create an indirect sequence from keyframes in any order
    pub fn from_keyframes(keyframes: impl IntoIterator<Item = Keyframe<T>>) -> Self {
        Self {
            inner: Sequence::from_keyframes(keyframes),
        }
    }

    /// Replace all keyframes
    pub fn load_keyframes(&mut self, keyframes: impl IntoIterator<Item = Keyframe<T>>) {
        self.inner.load_keyframes(keyframes);
    }

    /// The unresolved keyframes
    pub fn keyframes(&self) -> &[Keyframe<T>] {
        self.inner.keyframes()
    }

    /// Whether the sequence has no keyframes
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Time of the last keyframe, or 0 when empty
    pub fn duration(&self) -> f32 {
        self.inner.duration()
    }

    /// Evaluate at `time`, resolving both endpoints against `ctx` first
    pub fn compute_value_at<Ctx: ?Sized>(&self, time: f32, ctx: &Ctx, default: T::Output) -> T::Output
    where
        T: ResolveValue<Ctx>,
    {
        match self.inner.bracket(time) {
            Bracket::Empty => default,
            Bracket::Single(key) => key.value.resolve(ctx),
            Bracket::Between { left, right, t } => {
                let a = left.value.resolve(ctx);
                let b = right.value.resolve(ctx);
                a.interpolate(&b, t)
            }
        }
    }
}
