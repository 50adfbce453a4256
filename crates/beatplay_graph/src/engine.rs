// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame orchestration.
//!
//! [`PlaybackEngine`] owns the container, the object sources, the timeline,
//! the pipeline and the theme resolver. Document synchronization and frame
//! evaluation happen on the calling thread and must not interleave; only
//! object evaluation fans out to the worker pool.

use crate::container::PlaybackObjectContainer;
use crate::document::Beatmap;
use crate::pipeline::{AnimationPipeline, DrawItem, FrameStats, PipelineError, ResourceRegistry, DEFAULT_MAX_PARENT_DEPTH};
use crate::source::{ObjectSourceManager, SyncError};
use crate::timeline::Timeline;
use beatplay_sequencer::{EventState, RandomSeed, ThemeColorState, ThemeResolver};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Pipeline construction failed
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Document synchronization failed
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Randomization seed
    pub seed: u64,
    /// Worker count, 0 for all cores
    pub parallelism: usize,
    /// Parent chain length after which the walk stops
    pub max_parent_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            parallelism: 0,
            max_parent_depth: DEFAULT_MAX_PARENT_DEPTH,
        }
    }
}

/// Everything evaluated for one time value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Song time in seconds
    pub time: f32,
    /// Sorted draw items
    pub draw_items: Vec<DrawItem>,
    /// Palette state
    pub theme: ThemeColorState,
    /// Camera and post-processing state
    pub events: EventState,
    /// Frame counters
    pub stats: FrameStats,
}

/// Animation evaluation engine
#[derive(Debug)]
pub struct PlaybackEngine {
    container: PlaybackObjectContainer,
    sources: ObjectSourceManager,
    timeline: Timeline,
    pipeline: AnimationPipeline,
    theme_resolver: ThemeResolver,
}

impl PlaybackEngine {
    /// Create an engine with no objects
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let pipeline = AnimationPipeline::new(config.parallelism, config.max_parent_depth)?;
        tracing::info!(
            "Playback engine ready: {} workers, seed {:#x}",
            pipeline.parallelism(),
            config.seed
        );
        Ok(Self {
            container: PlaybackObjectContainer::new(),
            sources: ObjectSourceManager::new(RandomSeed(config.seed)),
            timeline: Timeline::new(),
            pipeline,
            theme_resolver: ThemeResolver::new(),
        })
    }

    /// Replace all runtime objects with a full import of `doc`, discarding
    /// its pending changes
    pub fn load(&mut self, doc: &mut Beatmap) -> Result<()> {
        doc.take_changes();
        self.sources.rebuild(doc, &mut self.container)?;
        Ok(())
    }

    /// Apply the pending changes of `doc`, returning how many were applied
    pub fn sync(&mut self, doc: &mut Beatmap) -> Result<usize> {
        if !doc.has_changes() {
            return Ok(0);
        }
        Ok(self.sources.apply_pending(doc, &mut self.container)?)
    }

    /// Evaluate the scene at `time`
    pub fn compute_frame(&mut self, doc: &Beatmap, time: f32, registry: &dyn ResourceRegistry) -> Frame {
        let theme = self.theme_resolver.resolve(&doc.theme_sequence, &doc.themes, time);
        let events = doc.events.resolve(time, theme);
        let draw_items = self
            .pipeline
            .compute_draw_items(time, &mut self.timeline, &mut self.container, theme, registry)
            .to_vec();
        Frame {
            time,
            draw_items,
            theme: theme.clone(),
            events,
            stats: self.pipeline.stats(),
        }
    }

    /// Runtime objects
    pub fn container(&self) -> &PlaybackObjectContainer {
        &self.container
    }

    /// Object sources
    pub fn sources(&self) -> &ObjectSourceManager {
        &self.sources
    }

    /// Alive-object scheduler
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BeatmapObject, ObjectField, ObjectId};
    use crate::pipeline::HeadlessRegistry;
    use beatplay_sequencer::{Color, Keyframe, Sequence, Theme};

    #[test]
    fn test_config_ron_round_trip() {
        let config = EngineConfig {
            seed: 42,
            parallelism: 2,
            max_parent_depth: 16,
        };
        let text = ron::to_string(&config).unwrap();
        assert_eq!(ron::from_str::<EngineConfig>(&text).unwrap(), config);
        assert_eq!(ron::from_str::<EngineConfig>("(seed: 1)").unwrap().max_parent_depth, DEFAULT_MAX_PARENT_DEPTH);
    }

    #[test]
    fn test_frame_follows_edits() {
        let mut doc = Beatmap::new();
        let id = ObjectId::from("a");
        let mut object = BeatmapObject::new(id.clone(), "a");
        object.autokill = crate::document::AutoKill::Fixed(10.0);
        doc.insert_object(object).unwrap();
        doc.themes.push(Theme::uniform("dark", Color::BLACK));
        doc.themes.push(Theme::uniform("light", Color::WHITE));
        doc.theme_sequence = Sequence::from_keyframes([Keyframe::linear(0.0, 0), Keyframe::linear(4.0, 1)]);

        let mut engine = PlaybackEngine::new(&EngineConfig {
            parallelism: 1,
            ..EngineConfig::default()
        })
        .unwrap();
        engine.load(&mut doc).unwrap();
        let registry = HeadlessRegistry::default();

        let frame = engine.compute_frame(&doc, 2.0, &registry);
        assert_eq!(frame.draw_items.len(), 1);
        assert_eq!(frame.theme.background, Color::rgba(0.5, 0.5, 0.5, 1.0));

        doc.update_object(&id, ObjectField::StartTime, |o| o.start_time = 5.0)
            .unwrap();
        assert_eq!(engine.sync(&mut doc).unwrap(), 1);
        assert!(engine.compute_frame(&doc, 2.0, &registry).draw_items.is_empty());
        assert_eq!(engine.compute_frame(&doc, 6.0, &registry).stats.drawn, 1);
        assert_eq!(engine.sync(&mut doc).unwrap(), 0);
    }
}
