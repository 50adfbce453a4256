// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parallel hierarchical evaluator producing sorted draw items.
//!
//! Each alive object is evaluated independently on the worker pool into its
//! own pre-sized scratch slot, walking its parent chain to compose the final
//! transform. The results are compacted and sorted once on the calling
//! thread.

use crate::container::PlaybackObjectContainer;
use crate::object::{ParentOffset, ParentType, PlaybackObject, RenderMode, ShapeIndex};
use crate::text_cache::TextHandle;
use crate::timeline::Timeline;
use beatplay_sequencer::{Color, ThemeColorState};
use glam::{Affine2, Vec2};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use thiserror::Error;
use xxhash_rust::xxh32::xxh32;

/// Uniform scale applied to text leaves
pub const TEXT_SCALE: f32 = 0.25;

/// Default bound on parent chain length
pub const DEFAULT_MAX_PARENT_DEPTH: usize = 256;

/// Pipeline construction errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The worker pool could not be created
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Mesh and text lookups owned by the rendering side
pub trait ResourceRegistry: Sync {
    /// Whether a mesh exists for `shape`
    fn has_shape(&self, shape: ShapeIndex) -> bool;

    /// Shape `text`, returning an opaque handle or `None` if it cannot be shaped
    fn shape_text(&self, text: &str) -> Option<TextHandle>;
}

/// Registry without a renderer behind it: a fixed number of shape families
/// and text handles derived from the text content
#[derive(Debug, Clone, Copy)]
pub struct HeadlessRegistry {
    /// Number of known shape families
    pub shape_count: u16,
}

impl Default for HeadlessRegistry {
    fn default() -> Self {
        Self { shape_count: 10 }
    }
}

impl ResourceRegistry for HeadlessRegistry {
    fn has_shape(&self, shape: ShapeIndex) -> bool {
        shape.shape < self.shape_count
    }

    fn shape_text(&self, text: &str) -> Option<TextHandle> {
        Some(TextHandle(u64::from(xxh32(text.as_bytes(), 0))))
    }
}

/// What a draw item renders
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DrawShape {
    /// Registry mesh
    Mesh(ShapeIndex),
    /// Shaped text
    Text(TextHandle),
}

/// One evaluated object ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawItem {
    /// World transform
    pub transform: Affine2,
    /// Primary color
    pub color1: Color,
    /// Secondary (gradient) color
    pub color2: Color,
    /// Opacity
    pub opacity: f32,
    /// Author-set depth
    pub render_depth: i32,
    /// Number of parent hops
    pub parent_depth: u32,
    /// Container index of the object
    pub object_index: usize,
    /// Render layer
    pub render_mode: RenderMode,
    /// Mesh or text
    pub shape: DrawShape,
    /// Stable identifier hash used as sort tie-break
    pub sort_hash: u32,
}

/// Counters of the last evaluated frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    /// Alive objects
    pub alive: usize,
    /// Emitted draw items
    pub drawn: usize,
    /// Items dropped for missing resources
    pub skipped: usize,
}

/// Parallel per-frame evaluator with reusable scratch storage
pub struct AnimationPipeline {
    pool: rayon::ThreadPool,
    alive: Vec<usize>,
    slots: Vec<Option<DrawItem>>,
    items: Vec<DrawItem>,
    max_parent_depth: usize,
    stats: FrameStats,
}

impl std::fmt::Debug for AnimationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationPipeline")
            .field("threads", &self.pool.current_num_threads())
            .field("slots", &self.slots.len())
            .field("max_parent_depth", &self.max_parent_depth)
            .field("stats", &self.stats)
            .finish()
    }
}

impl AnimationPipeline {
    /// Create a pipeline with `parallelism` workers (0 = all cores)
    pub fn new(parallelism: usize, max_parent_depth: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .thread_name(|i| format!("beatplay-eval-{i}"))
            .build()?;
        Ok(Self {
            pool,
            alive: Vec::new(),
            slots: Vec::new(),
            items: Vec::new(),
            max_parent_depth,
            stats: FrameStats::default(),
        })
    }

    /// Evaluate every alive object at `time` into sorted draw items
    pub fn compute_draw_items(
        &mut self,
        time: f32,
        timeline: &mut Timeline,
        container: &mut PlaybackObjectContainer,
        theme: &ThemeColorState,
        registry: &dyn ResourceRegistry,
    ) -> &[DrawItem] {
        let alive = timeline.compute_alive_objects(time, container);
        self.alive.clear();
        self.alive.extend(alive.iter().copied());

        let count = self.alive.len();
        if self.slots.len() < count {
            self.slots.resize(count, None);
        }

        let container: &PlaybackObjectContainer = container;
        let max_depth = self.max_parent_depth;
        let slots = &mut self.slots[..count];
        let alive = &self.alive;
        self.pool.install(|| {
            slots.par_iter_mut().zip(alive.par_iter()).for_each(|(slot, &index)| {
                *slot = evaluate(index, time, container, theme, registry, max_depth);
            });
        });

        self.items.clear();
        self.items.extend(self.slots[..count].iter_mut().filter_map(Option::take));
        self.items.sort_by(|a, b| draw_order(a, b, container));

        self.stats = FrameStats {
            alive: count,
            drawn: self.items.len(),
            skipped: count - self.items.len(),
        };
        &self.items
    }

    /// Items of the last evaluated frame
    pub fn draw_items(&self) -> &[DrawItem] {
        &self.items
    }

    /// Counters of the last evaluated frame
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Worker count
    pub fn parallelism(&self) -> usize {
        self.pool.current_num_threads()
    }
}

fn draw_order(a: &DrawItem, b: &DrawItem, container: &PlaybackObjectContainer) -> Ordering {
    a.render_depth
        .cmp(&b.render_depth)
        .then(a.parent_depth.cmp(&b.parent_depth))
        .then(a.sort_hash.cmp(&b.sort_hash))
        .then_with(|| {
            let a_id = container.get(a.object_index).map(PlaybackObject::id);
            let b_id = container.get(b.object_index).map(PlaybackObject::id);
            a_id.cmp(&b_id)
        })
        .then(a.object_index.cmp(&b.object_index))
}

fn evaluate(
    index: usize,
    time: f32,
    container: &PlaybackObjectContainer,
    theme: &ThemeColorState,
    registry: &dyn ResourceRegistry,
    max_depth: usize,
) -> Option<DrawItem> {
    let object = container.get(index)?;

    let (shape, leaf) = if object.shape.is_text() {
        let text = object.text().unwrap_or_default();
        let handle = container
            .text_cache()
            .get_or_shape(object.id(), text, |text| registry.shape_text(text))?;
        (DrawShape::Text(handle), Affine2::from_scale(Vec2::splat(TEXT_SCALE)))
    } else {
        if !registry.has_shape(object.shape) {
            return None;
        }
        (DrawShape::Mesh(object.shape), Affine2::from_translation(object.origin))
    };

    let local_time = time - object.start_time();
    let mut transform = Affine2::from_scale_angle_translation(
        object.scale.compute_value_at(local_time, Vec2::ONE),
        object.rotation.compute_value_at(local_time, 0.0).to_radians(),
        object.position.compute_value_at(local_time, Vec2::ZERO),
    ) * leaf;

    let mut depth = 0u32;
    // Object whose inheritance settings apply to the next hop; anchors pass
    // through the settings of the object below them
    let mut inheritor = object;
    let mut current = index;
    while let Some(parent_index) = container.try_get_parent_index(current) {
        if depth as usize >= max_depth {
            break;
        }
        let Some(parent) = container.get(parent_index) else {
            break;
        };
        let link = if parent.is_anchor() {
            parent_link(ParentType::ALL, ParentOffset::ZERO, parent, time)
        } else {
            parent_link(inheritor.parent_type, inheritor.parent_offset, parent, time)
        };
        transform = link * transform;
        depth += 1;
        if !parent.is_anchor() {
            inheritor = parent;
        }
        current = parent_index;
    }

    let color = object.color.compute_value_at(local_time, theme);
    Some(DrawItem {
        transform,
        color1: color.primary,
        color2: color.secondary,
        opacity: color.opacity,
        render_depth: object.render_depth,
        parent_depth: depth,
        object_index: index,
        render_mode: object.render_mode,
        shape,
        sort_hash: object.id().stable_hash(),
    })
}

/// Parent transform restricted to the `inherits` channels, each sampled
/// `offset` seconds late
fn parent_link(inherits: ParentType, offset: ParentOffset, parent: &PlaybackObject, time: f32) -> Affine2 {
    let parent_time = time - parent.start_time();

    let position = if inherits.contains(ParentType::POSITION) {
        parent.position.compute_value_at(parent_time - offset.position, Vec2::ZERO)
    } else {
        Vec2::ZERO
    };
    let scale = if inherits.contains(ParentType::SCALE) {
        parent.scale.compute_value_at(parent_time - offset.scale, Vec2::ONE)
    } else {
        Vec2::ONE
    };
    let rotation = if inherits.contains(ParentType::ROTATION) {
        parent.rotation.compute_value_at(parent_time - offset.rotation, 0.0)
    } else {
        0.0
    };
    Affine2::from_scale_angle_translation(scale, rotation.to_radians(), position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Identifier;
    use beatplay_sequencer::{Keyframe, Sequence};

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    struct Scene {
        container: PlaybackObjectContainer,
        timeline: Timeline,
        pipeline: AnimationPipeline,
    }

    impl Scene {
        fn new() -> Self {
            Self {
                container: PlaybackObjectContainer::new(),
                timeline: Timeline::new(),
                pipeline: AnimationPipeline::new(2, DEFAULT_MAX_PARENT_DEPTH).unwrap(),
            }
        }

        fn frame(&mut self, time: f32) -> Vec<DrawItem> {
            self.pipeline
                .compute_draw_items(
                    time,
                    &mut self.timeline,
                    &mut self.container,
                    &ThemeColorState::default(),
                    &HeadlessRegistry::default(),
                )
                .to_vec()
        }

        fn item(&mut self, time: f32, id: &str) -> DrawItem {
            let index = self.container.index_of(&Identifier::new(id)).unwrap();
            self.frame(time).into_iter().find(|item| item.object_index == index).unwrap()
        }
    }

    fn rotated_parent() -> PlaybackObject {
        let mut parent = PlaybackObject::new(Identifier::new("parent"));
        parent.position = Sequence::constant(Vec2::new(10.0, 0.0));
        parent.rotation = Sequence::constant(90.0);
        parent.scale = Sequence::constant(Vec2::splat(2.0));
        parent
    }

    fn child(parent_type: ParentType) -> PlaybackObject {
        let mut child = PlaybackObject::new(Identifier::new("child")).with_parent(Some(Identifier::new("parent")));
        child.parent_type = parent_type;
        child.position = Sequence::constant(Vec2::new(1.0, 0.0));
        child
    }

    #[test]
    fn test_position_only_inheritance() {
        let mut scene = Scene::new();
        scene.container.insert(rotated_parent()).unwrap();
        scene.container.insert(child(ParentType::POSITION)).unwrap();

        let item = scene.item(0.0, "child");
        assert!(close(item.transform.transform_point2(Vec2::ZERO), Vec2::new(11.0, 0.0)));
        assert!(close(item.transform.transform_vector2(Vec2::X), Vec2::X));
        assert_eq!(item.parent_depth, 1);
    }

    #[test]
    fn test_full_inheritance() {
        let mut scene = Scene::new();
        scene.container.insert(rotated_parent()).unwrap();
        scene.container.insert(child(ParentType::ALL)).unwrap();

        let item = scene.item(0.0, "child");
        assert!(close(item.transform.transform_point2(Vec2::ZERO), Vec2::new(10.0, 2.0)));
        assert!(close(item.transform.transform_vector2(Vec2::X), Vec2::new(0.0, 2.0)));
    }

    #[test]
    fn test_parent_offset_delays_channel() {
        let mut scene = Scene::new();
        let mut parent = PlaybackObject::new(Identifier::new("parent"));
        parent.position = Sequence::from_keyframes([
            Keyframe::linear(0.0, Vec2::ZERO),
            Keyframe::linear(10.0, Vec2::new(10.0, 0.0)),
        ]);
        scene.container.insert(parent).unwrap();
        let mut delayed = child(ParentType::POSITION);
        delayed.position = Sequence::new();
        delayed.parent_offset.position = 2.0;
        scene.container.insert(delayed).unwrap();

        let item = scene.item(5.0, "child");
        assert!(close(item.transform.transform_point2(Vec2::ZERO), Vec2::new(3.0, 0.0)));
    }

    #[test]
    fn test_origin_and_text_leaf() {
        let mut scene = Scene::new();
        let mut shape = PlaybackObject::new(Identifier::new("shape"));
        shape.origin = Vec2::new(0.5, 0.0);
        scene.container.insert(shape).unwrap();
        let mut text = PlaybackObject::new(Identifier::new("text")).with_text(Some("hi".into()));
        text.shape = ShapeIndex::text();
        scene.container.insert(text).unwrap();

        let shape = scene.item(0.0, "shape");
        assert!(close(shape.transform.transform_point2(Vec2::ZERO), Vec2::new(0.5, 0.0)));
        let text = scene.item(0.0, "text");
        assert!(close(text.transform.transform_vector2(Vec2::X), Vec2::new(TEXT_SCALE, 0.0)));
        assert!(matches!(text.shape, DrawShape::Text(_)));
        assert_eq!(scene.container.text_cache().len(), 1);
    }

    #[test]
    fn test_unknown_shape_skipped() {
        let mut scene = Scene::new();
        let mut unknown = PlaybackObject::new(Identifier::new("unknown"));
        unknown.shape = ShapeIndex::new(99, 0);
        scene.container.insert(unknown).unwrap();
        scene.container.insert(PlaybackObject::new(Identifier::new("known"))).unwrap();

        assert_eq!(scene.frame(0.0).len(), 1);
        assert_eq!(
            scene.pipeline.stats(),
            FrameStats {
                alive: 2,
                drawn: 1,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_anchor_applies_all_channels_and_forwards_child_flags() {
        let mut scene = Scene::new();
        scene.container.insert(rotated_parent()).unwrap();
        let mut anchor = PlaybackObject::new(Identifier::new("anchor"))
            .with_visible(false)
            .with_parent(Some(Identifier::new("parent")))
            .as_anchor();
        anchor.scale = Sequence::constant(Vec2::splat(2.0));
        scene.container.insert(anchor).unwrap();

        let mut position_only = child(ParentType::POSITION).with_parent(Some(Identifier::new("anchor")));
        position_only.parent_offset.rotation = 3.0;
        scene.container.insert(position_only).unwrap();
        let mut full = PlaybackObject::new(Identifier::new("full")).with_parent(Some(Identifier::new("anchor")));
        full.parent_type = ParentType::ALL;
        full.position = Sequence::constant(Vec2::new(1.0, 0.0));
        scene.container.insert(full).unwrap();

        let item = scene.item(0.0, "child");
        assert!(close(item.transform.transform_point2(Vec2::ZERO), Vec2::new(12.0, 0.0)));
        assert!(close(item.transform.transform_vector2(Vec2::X), Vec2::new(2.0, 0.0)));
        assert_eq!(item.parent_depth, 2);

        let item = scene.item(0.0, "full");
        assert!(close(item.transform.transform_point2(Vec2::ZERO), Vec2::new(10.0, 4.0)));
        assert!(close(item.transform.transform_vector2(Vec2::X), Vec2::new(0.0, 4.0)));
    }

    #[test]
    fn test_anchor_hop_uses_child_offset() {
        let mut scene = Scene::new();
        let mut parent = PlaybackObject::new(Identifier::new("parent"));
        parent.position = Sequence::from_keyframes([
            Keyframe::linear(0.0, Vec2::ZERO),
            Keyframe::linear(10.0, Vec2::new(10.0, 0.0)),
        ]);
        scene.container.insert(parent).unwrap();
        scene
            .container
            .insert(
                PlaybackObject::new(Identifier::new("anchor"))
                    .with_visible(false)
                    .with_parent(Some(Identifier::new("parent")))
                    .as_anchor(),
            )
            .unwrap();
        let mut delayed = child(ParentType::POSITION).with_parent(Some(Identifier::new("anchor")));
        delayed.position = Sequence::new();
        delayed.parent_offset.position = 2.0;
        scene.container.insert(delayed).unwrap();

        let item = scene.item(5.0, "child");
        assert!(close(item.transform.transform_point2(Vec2::ZERO), Vec2::new(3.0, 0.0)));
    }

    #[test]
    fn test_parent_cycle_is_bounded() {
        let mut scene = Scene::new();
        scene.pipeline = AnimationPipeline::new(1, 8).unwrap();
        scene
            .container
            .insert(PlaybackObject::new(Identifier::new("a")).with_parent(Some(Identifier::new("b"))))
            .unwrap();
        scene
            .container
            .insert(PlaybackObject::new(Identifier::new("b")).with_parent(Some(Identifier::new("a"))))
            .unwrap();

        let items = scene.frame(0.0);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.parent_depth == 8));
    }

    #[test]
    fn test_sorted_by_render_then_parent_depth() {
        let mut scene = Scene::new();
        scene.container.insert(PlaybackObject::new(Identifier::new("root"))).unwrap();
        let mut deep = PlaybackObject::new(Identifier::new("deep")).with_parent(Some(Identifier::new("mid")));
        deep.render_depth = 1;
        scene.container.insert(deep).unwrap();
        let mut mid = PlaybackObject::new(Identifier::new("mid")).with_parent(Some(Identifier::new("root")));
        mid.render_depth = 1;
        scene.container.insert(mid).unwrap();
        let mut front = PlaybackObject::new(Identifier::new("front"));
        front.render_depth = -5;
        scene.container.insert(front).unwrap();

        let order: Vec<(i32, u32)> = scene
            .frame(0.0)
            .iter()
            .map(|item| (item.render_depth, item.parent_depth))
            .collect();
        assert_eq!(order, vec![(-5, 0), (0, 0), (1, 1), (1, 2)]);
    }
}
