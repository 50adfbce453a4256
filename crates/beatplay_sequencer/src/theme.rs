// SPDX-License-Identifier: MIT OR Apache-2.0
//! Colors, palettes ("themes") and theme resolution.
//!
//! A [`Theme`] is a static named palette. A [`ThemeColorState`] is the
//! time-interpolated runtime form of one or two themes; the resolver reuses a
//! single output state, so a returned state is only valid until the next
//! resolution call.

use crate::keyframe::{lerp, Interpolate};
use crate::sequence::{Bracket, ResolveValue, Sequence};
use serde::{Deserialize, Serialize};

/// Number of player colors in a palette
pub const PLAYER_COLOR_COUNT: usize = 4;
/// Number of object colors in a palette
pub const OBJECT_COLOR_COUNT: usize = 9;
/// Number of effect colors in a palette
pub const EFFECT_COLOR_COUNT: usize = 9;
/// Number of parallax colors in a palette
pub const PARALLAX_COLOR_COUNT: usize = 9;

/// Linear RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Color {
    /// Opaque white
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    /// Opaque black
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    /// Fully transparent black
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    /// Create a color from components
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color from a `0xRRGGBB` value
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
        Self::rgba(channel(16), channel(8), channel(0), 1.0)
    }

    /// The same color with a different alpha
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl Interpolate for Color {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        Color::rgba(
            lerp(self.r, other.r, t),
            lerp(self.g, other.g, t),
            lerp(self.b, other.b, t),
            lerp(self.a, other.a, t),
        )
    }
}

/// A static named palette
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    /// Display name
    pub name: String,
    /// Player colors
    pub player: [Color; PLAYER_COLOR_COUNT],
    /// Object colors
    pub object: [Color; OBJECT_COLOR_COUNT],
    /// Effect colors (bloom, vignette, gradient)
    pub effect: [Color; EFFECT_COLOR_COUNT],
    /// Parallax colors
    pub parallax: [Color; PARALLAX_COLOR_COUNT],
    /// Background color
    pub background: Color,
    /// GUI color
    pub gui: Color,
    /// GUI accent color
    pub gui_accent: Color,
}

impl Theme {
    /// Create a theme with every slot set to `color`
    pub fn uniform(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            player: [color; PLAYER_COLOR_COUNT],
            object: [color; OBJECT_COLOR_COUNT],
            effect: [color; EFFECT_COLOR_COUNT],
            parallax: [color; PARALLAX_COLOR_COUNT],
            background: color,
            gui: color,
            gui_accent: color,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        let grays = |count: usize| {
            let mut colors = [Color::WHITE; OBJECT_COLOR_COUNT];
            for (i, c) in colors.iter_mut().enumerate().take(count) {
                let v = 1.0 - i as f32 / count as f32;
                *c = Color::rgba(v, v, v, 1.0);
            }
            colors
        };
        Self {
            name: "Default".to_string(),
            player: [
                Color::from_hex(0xe57373),
                Color::from_hex(0x64b5f6),
                Color::from_hex(0x81c784),
                Color::from_hex(0xffb74d),
            ],
            object: grays(OBJECT_COLOR_COUNT),
            effect: grays(EFFECT_COLOR_COUNT),
            parallax: grays(PARALLAX_COLOR_COUNT),
            background: Color::from_hex(0x212121),
            gui: Color::WHITE,
            gui_accent: Color::from_hex(0xffb74d),
        }
    }
}

/// Interpolated palette snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeColorState {
    /// Player colors
    pub player: [Color; PLAYER_COLOR_COUNT],
    /// Object colors
    pub object: [Color; OBJECT_COLOR_COUNT],
    /// Effect colors
    pub effect: [Color; EFFECT_COLOR_COUNT],
    /// Parallax colors
    pub parallax: [Color; PARALLAX_COLOR_COUNT],
    /// Background color
    pub background: Color,
    /// GUI color
    pub gui: Color,
    /// GUI accent color
    pub gui_accent: Color,
}

impl Default for ThemeColorState {
    fn default() -> Self {
        Self::from_theme(&Theme::default())
    }
}

impl ThemeColorState {
    /// Snapshot a theme
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            player: theme.player,
            object: theme.object,
            effect: theme.effect,
            parallax: theme.parallax,
            background: theme.background,
            gui: theme.gui,
            gui_accent: theme.gui_accent,
        }
    }

    /// Overwrite this state with a theme's colors
    pub fn load_theme(&mut self, theme: &Theme) {
        self.player = theme.player;
        self.object = theme.object;
        self.effect = theme.effect;
        self.parallax = theme.parallax;
        self.background = theme.background;
        self.gui = theme.gui;
        self.gui_accent = theme.gui_accent;
    }

    /// Overwrite this state with the component-wise blend of `a` and `b`
    pub fn blend_from(&mut self, a: &ThemeColorState, b: &ThemeColorState, t: f32) {
        blend_slots(&mut self.player, &a.player, &b.player, t);
        blend_slots(&mut self.object, &a.object, &b.object, t);
        blend_slots(&mut self.effect, &a.effect, &b.effect, t);
        blend_slots(&mut self.parallax, &a.parallax, &b.parallax, t);
        self.background = a.background.interpolate(&b.background, t);
        self.gui = a.gui.interpolate(&b.gui, t);
        self.gui_accent = a.gui_accent.interpolate(&b.gui_accent, t);
    }

    /// Object color, clamping the index into range
    pub fn object_color(&self, index: usize) -> Color {
        self.object[index.min(OBJECT_COLOR_COUNT - 1)]
    }

    /// Effect color, clamping the index into range
    pub fn effect_color(&self, index: usize) -> Color {
        self.effect[index.min(EFFECT_COLOR_COUNT - 1)]
    }

    /// Player color, clamping the index into range
    pub fn player_color(&self, index: usize) -> Color {
        self.player[index.min(PLAYER_COLOR_COUNT - 1)]
    }

    /// Parallax color, clamping the index into range
    pub fn parallax_color(&self, index: usize) -> Color {
        self.parallax[index.min(PARALLAX_COLOR_COUNT - 1)]
    }
}

fn blend_slots<const N: usize>(out: &mut [Color; N], a: &[Color; N], b: &[Color; N], t: f32) {
    for ((o, a), b) in out.iter_mut().zip(a).zip(b) {
        *o = a.interpolate(b, t);
    }
}

/// Indexed palette container populated by the document
#[derive(Debug, Clone, Default)]
pub struct ThemeSource {
    themes: Vec<Theme>,
    fallback: Theme,
}

impl ThemeSource {
    /// Create a source from themes
    pub fn new(themes: Vec<Theme>) -> Self {
        Self {
            themes,
            fallback: Theme::default(),
        }
    }

    /// Replace all themes
    pub fn set_themes(&mut self, themes: Vec<Theme>) {
        self.themes = themes;
    }

    /// Append a theme and return its index
    pub fn push(&mut self, theme: Theme) -> usize {
        self.themes.push(theme);
        self.themes.len() - 1
    }

    /// Number of themes
    pub fn len(&self) -> usize {
        self.themes.len()
    }

    /// Whether the source has no themes
    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }

    /// Theme by index, clamped to the nearest valid index. An empty source
    /// yields the default theme.
    pub fn get_clamped(&self, index: usize) -> &Theme {
        match self.themes.len() {
            0 => &self.fallback,
            len => &self.themes[index.min(len - 1)],
        }
    }
}

/// Resolves a keyframed track of theme indices into a [`ThemeColorState`]
///
/// Holds three scratch states (left, right, output) that are overwritten on
/// every call.
#[derive(Debug, Clone, Default)]
pub struct ThemeResolver {
    left: ThemeColorState,
    right: ThemeColorState,
    output: ThemeColorState,
}

impl ThemeResolver {
    /// Create a resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `sequence` at `time`. The returned state is overwritten by the next call.
    pub fn resolve(&mut self, sequence: &Sequence<usize>, themes: &ThemeSource, time: f32) -> &ThemeColorState {
        match sequence.bracket(time) {
            Bracket::Empty => self.output.load_theme(themes.get_clamped(0)),
            Bracket::Single(key) => self.output.load_theme(themes.get_clamped(key.value)),
            Bracket::Between { left, right, t } => {
                self.left.load_theme(themes.get_clamped(left.value));
                self.right.load_theme(themes.get_clamped(right.value));
                self.output.blend_from(&self.left, &self.right, t);
            }
        }
        &self.output
    }

    /// The state produced by the last call
    pub fn current(&self) -> &ThemeColorState {
        &self.output
    }
}

/// Resolved two-color gradient with opacity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientColor {
    /// Primary color
    pub primary: Color,
    /// Secondary (gradient end) color
    pub secondary: Color,
    /// Opacity in `[0, 1]`
    pub opacity: f32,
}

impl GradientColor {
    /// A solid color
    pub fn solid(color: Color, opacity: f32) -> Self {
        Self {
            primary: color,
            secondary: color,
            opacity,
        }
    }
}

impl Default for GradientColor {
    fn default() -> Self {
        Self::solid(Color::WHITE, 1.0)
    }
}

impl Interpolate for GradientColor {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        Self {
            primary: self.primary.interpolate(&other.primary, t),
            secondary: self.secondary.interpolate(&other.secondary, t),
            opacity: lerp(self.opacity, other.opacity, t),
        }
    }
}

/// Object color keyframe value referencing object palette slots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThemeColorKey {
    /// Primary object color index
    pub index: usize,
    /// Secondary object color index
    pub secondary_index: usize,
    /// Opacity in `[0, 1]`
    pub opacity: f32,
}

impl ThemeColorKey {
    /// Solid palette color
    pub fn solid(index: usize, opacity: f32) -> Self {
        Self {
            index,
            secondary_index: index,
            opacity,
        }
    }
}

impl ResolveValue<ThemeColorState> for ThemeColorKey {
    type Output = GradientColor;

    fn resolve(&self, ctx: &ThemeColorState) -> GradientColor {
        GradientColor {
            primary: ctx.object_color(self.index),
            secondary: ctx.object_color(self.secondary_index),
            opacity: self.opacity,
        }
    }
}

/// Effect palette reference used by post-processing tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EffectColorKey(pub usize);

impl ResolveValue<ThemeColorState> for EffectColorKey {
    type Output = Color;

    fn resolve(&self, ctx: &ThemeColorState) -> Color {
        ctx.effect_color(self.0)
    }
}
