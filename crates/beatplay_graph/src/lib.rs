// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime object graph for beatplay.
//!
//! This crate turns an editable beatmap document into sorted draw items:
//! - Stable-index arena and tree of playback objects
//! - Event-scheduled alive-object timeline with bidirectional seeking
//! - Parallel hierarchical transform and color evaluation
//! - Incremental synchronization with the document, including prefab
//!   expansion and intermediate parents
//!
//! ## Architecture
//!
//! The document ([`document::Beatmap`]) records every mutation as a
//! [`document::DocumentChange`]. The [`source::ObjectSourceManager`] projects
//! those changes onto the flat [`container::PlaybackObjectContainer`]. Each
//! frame, the [`timeline::Timeline`] yields the alive objects and the
//! [`pipeline::AnimationPipeline`] evaluates them on a worker pool.
//! [`engine::PlaybackEngine`] ties these together.

pub mod arena;
pub mod container;
pub mod document;
pub mod engine;
pub mod identifier;
pub mod object;
pub mod pipeline;
pub mod source;
pub mod text_cache;
pub mod timeline;

pub use arena::{ArenaError, ArenaEvent, Identified, IndexedArena, IndexedTree};
pub use container::{PlaybackObjectContainer, ScheduleChange};
pub use document::{
    AutoKill, Beatmap, BeatmapObject, DocumentChange, DocumentError, InstanceField, InstanceId, ObjectField,
    ObjectId, Prefab, PrefabField, PrefabId, PrefabInstance, RandomKeyframe,
};
pub use engine::{EngineConfig, EngineError, Frame, PlaybackEngine};
pub use identifier::Identifier;
pub use object::{ColorSequence, ParentOffset, ParentType, PlaybackObject, RenderMode, ShapeIndex};
pub use pipeline::{
    AnimationPipeline, DrawItem, DrawShape, FrameStats, HeadlessRegistry, PipelineError, ResourceRegistry,
    DEFAULT_MAX_PARENT_DEPTH, TEXT_SCALE,
};
pub use source::{MainObjectSource, ObjectSourceManager, PrefabInstanceObjectSource, SyncError};
pub use text_cache::{ShapedTextCache, TextHandle};
pub use timeline::{EventKind, Timeline};
