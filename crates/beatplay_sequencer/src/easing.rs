// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing functions applied to the normalized progress between two keyframes.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Named easing curve
///
/// Every variant is a pure map of progress `t` in `[0, 1]`. Back and Elastic
/// curves overshoot inside the interval but still start at 0 and end at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Easing {
    /// No easing
    #[default]
    Linear,
    /// Hold the left value until the right keyframe is reached
    Instant,
    /// Sine ease in
    InSine,
    /// Sine ease out
    OutSine,
    /// Sine ease in-out
    InOutSine,
    /// Elastic ease in
    InElastic,
    /// Elastic ease out
    OutElastic,
    /// Elastic ease in-out
    InOutElastic,
    /// Back ease in
    InBack,
    /// Back ease out
    OutBack,
    /// Back ease in-out
    InOutBack,
    /// Bounce ease in
    InBounce,
    /// Bounce ease out
    OutBounce,
    /// Bounce ease in-out
    InOutBounce,
    /// Quadratic ease in
    InQuad,
    /// Quadratic ease out
    OutQuad,
    /// Quadratic ease in-out
    InOutQuad,
    /// Circular ease in
    InCirc,
    /// Circular ease out
    OutCirc,
    /// Circular ease in-out
    InOutCirc,
    /// Exponential ease in
    InExpo,
    /// Exponential ease out
    OutExpo,
    /// Exponential ease in-out
    InOutExpo,
}

impl Easing {
    /// All easings in index order
    pub const ALL: [Easing; 23] = [
        Easing::Linear,
        Easing::Instant,
        Easing::InSine,
        Easing::OutSine,
        Easing::InOutSine,
        Easing::InElastic,
        Easing::OutElastic,
        Easing::InOutElastic,
        Easing::InBack,
        Easing::OutBack,
        Easing::InOutBack,
        Easing::InBounce,
        Easing::OutBounce,
        Easing::InOutBounce,
        Easing::InQuad,
        Easing::OutQuad,
        Easing::InOutQuad,
        Easing::InCirc,
        Easing::OutCirc,
        Easing::InOutCirc,
        Easing::InExpo,
        Easing::OutExpo,
        Easing::InOutExpo,
    ];

    /// Look up an easing by its serialized index. Unknown indices fall back to `Linear`.
    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or(Easing::Linear)
    }

    /// Index of this easing in [`Easing::ALL`]
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|e| *e == self).unwrap_or(0)
    }

    /// Look up an easing by name, e.g. `"OutBounce"`. Unknown names fall back to `Linear`.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(name))
            .unwrap_or(Easing::Linear)
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Easing::Linear => "Linear",
            Easing::Instant => "Instant",
            Easing::InSine => "InSine",
            Easing::OutSine => "OutSine",
            Easing::InOutSine => "InOutSine",
            Easing::InElastic => "InElastic",
            Easing::OutElastic => "OutElastic",
            Easing::InOutElastic => "InOutElastic",
            Easing::InBack => "InBack",
            Easing::OutBack => "OutBack",
            Easing::InOutBack => "InOutBack",
            Easing::InBounce => "InBounce",
            Easing::OutBounce => "OutBounce",
            Easing::InOutBounce => "InOutBounce",
            Easing::InQuad => "InQuad",
            Easing::OutQuad => "OutQuad",
            Easing::InOutQuad => "InOutQuad",
            Easing::InCirc => "InCirc",
            Easing::OutCirc => "OutCirc",
            Easing::InOutCirc => "InOutCirc",
            Easing::InExpo => "InExpo",
            Easing::OutExpo => "OutExpo",
            Easing::InOutExpo => "InOutExpo",
        }
    }

    /// Apply the easing to progress `t`
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,
            Easing::Instant => {
                if t >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Easing::InSine => 1.0 - (t * PI / 2.0).cos(),
            Easing::OutSine => (t * PI / 2.0).sin(),
            Easing::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Easing::InElastic => in_elastic(t),
            Easing::OutElastic => out_elastic(t),
            Easing::InOutElastic => in_out_elastic(t),
            Easing::InBack => {
                let (c1, c3) = back_constants();
                c3 * t * t * t - c1 * t * t
            }
            Easing::OutBack => {
                let (c1, c3) = back_constants();
                let u = t - 1.0;
                1.0 + c3 * u * u * u + c1 * u * u
            }
            Easing::InOutBack => in_out_back(t),
            Easing::InBounce => 1.0 - out_bounce(1.0 - t),
            Easing::OutBounce => out_bounce(t),
            Easing::InOutBounce => {
                if t < 0.5 {
                    (1.0 - out_bounce(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + out_bounce(2.0 * t - 1.0)) / 2.0
                }
            }
            Easing::InQuad => t * t,
            Easing::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::InCirc => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Easing::OutCirc => (1.0 - (t - 1.0) * (t - 1.0)).max(0.0).sqrt(),
            Easing::InOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).max(0.0).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
                }
            }
            Easing::InExpo => {
                if t <= 0.0 {
                    0.0
                } else {
                    2f32.powf(10.0 * t - 10.0)
                }
            }
            Easing::OutExpo => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * t)
                }
            }
            Easing::InOutExpo => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else if t < 0.5 {
                    2f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
        }
    }
}

#[inline]
fn back_constants() -> (f32, f32) {
    let c1 = 1.70158;
    (c1, c1 + 1.0)
}

fn in_out_back(t: f32) -> f32 {
    let c2 = 1.70158 * 1.525;
    if t < 0.5 {
        ((2.0 * t).powi(2) * ((c2 + 1.0) * 2.0 * t - c2)) / 2.0
    } else {
        ((2.0 * t - 2.0).powi(2) * ((c2 + 1.0) * (t * 2.0 - 2.0) + c2) + 2.0) / 2.0
    }
}

fn in_elastic(t: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let c4 = (2.0 * PI) / 3.0;
    -(2f32.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * c4).sin()
}

fn out_elastic(t: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let c4 = (2.0 * PI) / 3.0;
    2f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
}

fn in_out_elastic(t: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let c5 = (2.0 * PI) / 4.5;
    if t < 0.5 {
        -(2f32.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0
    } else {
        (2f32.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0 + 1.0
    }
}

fn out_bounce(t: f32) -> f32 {
    let n1 = 7.5625;
    let d1 = 2.75;
    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984375
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        for easing in Easing::ALL {
            if easing == Easing::Instant {
                continue;
            }
            assert!(easing.apply(0.0).abs() < 1e-4, "{} at 0", easing.name());
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-4, "{} at 1", easing.name());
        }
    }

    #[test]
    fn test_instant_holds() {
        assert_eq!(Easing::Instant.apply(0.0), 0.0);
        assert_eq!(Easing::Instant.apply(0.999), 0.0);
        assert_eq!(Easing::Instant.apply(1.0), 1.0);
    }

    #[test]
    fn test_unknown_index_is_linear() {
        assert_eq!(Easing::from_index(2), Easing::InSine);
        assert_eq!(Easing::from_index(999), Easing::Linear);
        assert_eq!(Easing::from_name("outbounce"), Easing::OutBounce);
        assert_eq!(Easing::from_name("nope"), Easing::Linear);
    }

    #[test]
    fn test_index_roundtrip() {
        for (i, easing) in Easing::ALL.iter().enumerate() {
            assert_eq!(easing.index(), i);
        }
    }
}
