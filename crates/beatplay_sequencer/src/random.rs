// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deterministic keyframe randomization.
//!
//! Randomized keyframes are resolved once, when keyframes are loaded, from a
//! process-wide seed and a per-call identity. The draw hashes the seed, the
//! identity and the IEEE-754 bit patterns of the bounds with xxHash32, so the
//! same document and seed give the same values on every platform.

use crate::keyframe::lerp;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh32::Xxh32;

/// Component index used for the shared 50/50 draw of [`RandomMode::Select`]
const SELECT_COMPONENT: u32 = u32::MAX;

/// Separator between variable-length identity fields
const FIELD_SEPARATOR: [u8; 1] = [0xff];

/// Randomization mode of a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RandomMode {
    /// Use the base value
    #[default]
    None,
    /// Uniform sample between base and secondary, rounded to the interval
    Range,
    /// Uniform sample in `[base, base + interval]`, rounded to an integer
    Snap,
    /// Pick base or secondary with one shared draw
    Select,
    /// Multiply base by a scalar sampled from `[secondary.x, secondary.y]`
    Scale,
}

/// Randomization settings attached to a document keyframe
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RandomSetting {
    /// Mode
    pub mode: RandomMode,
    /// Secondary value (range end, alternative or scale bounds)
    pub secondary: Vec2,
    /// Rounding interval for `Range`, span for `Snap`
    pub interval: f32,
}

impl RandomSetting {
    /// Settings that leave the value untouched
    pub const NONE: RandomSetting = RandomSetting {
        mode: RandomMode::None,
        secondary: Vec2::ZERO,
        interval: 0.0,
    };

    /// Range randomization
    pub fn range(secondary: Vec2, interval: f32) -> Self {
        Self {
            mode: RandomMode::Range,
            secondary,
            interval,
        }
    }

    /// Snap randomization
    pub fn snap(interval: f32) -> Self {
        Self {
            mode: RandomMode::Snap,
            secondary: Vec2::ZERO,
            interval,
        }
    }

    /// Select randomization
    pub fn select(secondary: Vec2) -> Self {
        Self {
            mode: RandomMode::Select,
            secondary,
            interval: 0.0,
        }
    }

    /// Scale randomization
    pub fn scale(min: f32, max: f32) -> Self {
        Self {
            mode: RandomMode::Scale,
            secondary: Vec2::new(min, max),
            interval: 0.0,
        }
    }
}

/// Process-wide randomization seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RandomSeed(pub u64);

/// Identity of one randomized value: object id plus channel tag
///
/// The component index is supplied per draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RandomIdentity<'a> {
    /// Stable object id bytes
    pub object: &'a [u8],
    /// Channel tag, e.g. `position#2`
    pub channel: &'a str,
}

impl<'a> RandomIdentity<'a> {
    /// Create an identity
    pub fn new(object: &'a [u8], channel: &'a str) -> Self {
        Self { object, channel }
    }
}

/// Uniform draw in `[0, 1)` for one component
pub fn unit_draw(seed: RandomSeed, identity: &RandomIdentity<'_>, component: u32, min: f32, max: f32) -> f32 {
    let mut hasher = Xxh32::new(0);
    hasher.update(&seed.0.to_le_bytes());
    hasher.update(identity.object);
    hasher.update(&FIELD_SEPARATOR);
    hasher.update(identity.channel.as_bytes());
    hasher.update(&FIELD_SEPARATOR);
    hasher.update(&component.to_le_bytes());
    hasher.update(&min.to_bits().to_le_bytes());
    hasher.update(&max.to_bits().to_le_bytes());
    let hash = hasher.digest();

    // Top 24 bits fit the f32 mantissa exactly, so the result never reaches 1.0
    (hash >> 8) as f32 / (1u32 << 24) as f32
}

/// Uniform sample between `min` and `max`
pub fn sample(seed: RandomSeed, identity: &RandomIdentity<'_>, component: u32, min: f32, max: f32) -> f32 {
    lerp(min, max, unit_draw(seed, identity, component, min, max))
}

/// Round to the nearest multiple of `interval`; an interval of 0 disables rounding
pub fn round_to_interval(value: f32, interval: f32) -> f32 {
    if interval == 0.0 {
        value
    } else {
        (value / interval).round() * interval
    }
}

fn select_secondary(seed: RandomSeed, identity: &RandomIdentity<'_>) -> bool {
    unit_draw(seed, identity, SELECT_COMPONENT, 0.0, 1.0) >= 0.5
}

/// Resolve a randomized 2D value
pub fn randomize_vec2(seed: RandomSeed, identity: &RandomIdentity<'_>, base: Vec2, setting: &RandomSetting) -> Vec2 {
    match setting.mode {
        RandomMode::None => base,
        RandomMode::Range => Vec2::new(
            round_to_interval(sample(seed, identity, 0, base.x, setting.secondary.x), setting.interval),
            round_to_interval(sample(seed, identity, 1, base.y, setting.secondary.y), setting.interval),
        ),
        RandomMode::Snap => Vec2::new(
            sample(seed, identity, 0, base.x, base.x + setting.interval).round(),
            sample(seed, identity, 1, base.y, base.y + setting.interval).round(),
        ),
        RandomMode::Select => {
            if select_secondary(seed, identity) {
                setting.secondary
            } else {
                base
            }
        }
        RandomMode::Scale => base * sample(seed, identity, 0, setting.secondary.x, setting.secondary.y),
    }
}

/// Resolve a randomized scalar value. The secondary value is `setting.secondary.x`.
pub fn randomize_scalar(seed: RandomSeed, identity: &RandomIdentity<'_>, base: f32, setting: &RandomSetting) -> f32 {
    match setting.mode {
        RandomMode::None => base,
        RandomMode::Range => round_to_interval(
            sample(seed, identity, 0, base, setting.secondary.x),
            setting.interval,
        ),
        RandomMode::Snap => sample(seed, identity, 0, base, base + setting.interval).round(),
        RandomMode::Select => {
            if select_secondary(seed, identity) {
                setting.secondary.x
            } else {
                base
            }
        }
        RandomMode::Scale => base * sample(seed, identity, 0, setting.secondary.x, setting.secondary.y),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: RandomSeed = RandomSeed(0x5eed_1234_abcd_0001);

    #[test]
    fn test_none_passthrough() {
        let id = RandomIdentity::new(b"obj", "position#0");
        let base = Vec2::new(3.0, -2.0);
        assert_eq!(randomize_vec2(SEED, &id, base, &RandomSetting::NONE), base);
        assert_eq!(randomize_scalar(SEED, &id, 4.0, &RandomSetting::NONE), 4.0);
    }

    #[test]
    fn test_reproducible() {
        let id = RandomIdentity::new(b"obj", "position#0");
        let setting = RandomSetting::range(Vec2::new(10.0, 10.0), 0.0);
        let a = randomize_vec2(SEED, &id, Vec2::ZERO, &setting);
        let b = randomize_vec2(SEED, &RandomIdentity::new(b"obj", "position#0"), Vec2::ZERO, &setting);
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.y.to_bits(), b.y.to_bits());
    }

    #[test]
    fn test_identity_sensitivity() {
        let setting = RandomSetting::range(Vec2::new(1000.0, 1000.0), 0.0);
        let values: Vec<Vec2> = ["a", "b", "c", "d"]
            .iter()
            .map(|obj| randomize_vec2(SEED, &RandomIdentity::new(obj.as_bytes(), "position#0"), Vec2::ZERO, &setting))
            .collect();
        for i in 0..values.len() {
            for j in (i + 1)..values.len() {
                assert_ne!(values[i], values[j]);
            }
        }

        let other_channel = randomize_vec2(SEED, &RandomIdentity::new(b"a", "scale#0"), Vec2::ZERO, &setting);
        assert_ne!(values[0], other_channel);

        let other_seed = randomize_vec2(RandomSeed(7), &RandomIdentity::new(b"a", "position#0"), Vec2::ZERO, &setting);
        assert_ne!(values[0], other_seed);
    }

    #[test]
    fn test_range_bounds_and_rounding() {
        let setting = RandomSetting::range(Vec2::new(10.0, 20.0), 2.5);
        for i in 0..64 {
            let channel = format!("position#{i}");
            let v = randomize_vec2(SEED, &RandomIdentity::new(b"obj", &channel), Vec2::ZERO, &setting);
            assert!((0.0..=10.0).contains(&v.x));
            assert!((0.0..=20.0).contains(&v.y));
            assert_eq!((v.x / 2.5).fract(), 0.0);
            assert_eq!((v.y / 2.5).fract(), 0.0);
        }
    }

    #[test]
    fn test_snap_is_integral() {
        let setting = RandomSetting::snap(5.0);
        for i in 0..32 {
            let channel = format!("rotation#{i}");
            let v = randomize_scalar(SEED, &RandomIdentity::new(b"obj", &channel), 1.5, &setting);
            assert_eq!(v.fract(), 0.0);
            assert!((1.0..=7.0).contains(&v));
        }
    }

    #[test]
    fn test_select_is_shared_across_components() {
        let base = Vec2::new(1.0, 2.0);
        let secondary = Vec2::new(3.0, 4.0);
        let setting = RandomSetting::select(secondary);
        let mut saw_base = false;
        let mut saw_secondary = false;
        for i in 0..64 {
            let channel = format!("scale#{i}");
            let v = randomize_vec2(SEED, &RandomIdentity::new(b"obj", &channel), base, &setting);
            assert!(v == base || v == secondary, "components mixed: {v:?}");
            saw_base |= v == base;
            saw_secondary |= v == secondary;
        }
        assert!(saw_base && saw_secondary);
    }

    #[test]
    fn test_scale_uniform_factor() {
        let setting = RandomSetting::scale(0.5, 2.0);
        let base = Vec2::new(2.0, 4.0);
        let v = randomize_vec2(SEED, &RandomIdentity::new(b"obj", "scale#0"), base, &setting);
        let factor = v.x / base.x;
        assert!((0.5..=2.0).contains(&factor));
        assert!((v.y / base.y - factor).abs() < 1e-6);
    }

    #[test]
    fn test_unit_draw_range() {
        for i in 0..256u32 {
            let u = unit_draw(SEED, &RandomIdentity::new(b"obj", "x"), i, 0.0, 1.0);
            assert!((0.0..1.0).contains(&u));
        }
    }
}
