// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for document sync + timeline + pipeline
//!
//! These tests verify that:
//! - Frames are reproducible across repeated calls and seeks
//! - Partial parent inheritance survives the full engine path
//! - Intermediate parents follow prefab edits
//! - Draw order does not depend on insertion or alive-set order
//! - Back-to-back alive ranges hand over at the shared instant
//! - Mixed instance and prefab edits sync in one batch

use beatplay_graph::{
    AutoKill, Beatmap, BeatmapObject, EngineConfig, Frame, HeadlessRegistry, Identifier, InstanceField, InstanceId,
    ObjectField, ObjectId, ParentType, PlaybackEngine, Prefab, PrefabId, PrefabInstance, RandomKeyframe,
};
use beatplay_sequencer::{Easing, RandomSetting};
use glam::Vec2;

fn engine(seed: u64) -> PlaybackEngine {
    PlaybackEngine::new(&EngineConfig {
        seed,
        parallelism: 4,
        ..EngineConfig::default()
    })
    .unwrap()
}

fn object(id: &str, start: f32, end: f32) -> BeatmapObject {
    let mut object = BeatmapObject::new(ObjectId::from(id), id);
    object.start_time = start;
    object.autokill = AutoKill::Fixed(end - start);
    object
}

fn drawn_ids(engine: &PlaybackEngine, frame: &Frame) -> Vec<String> {
    frame
        .draw_items
        .iter()
        .map(|item| engine.container().get(item.object_index).unwrap().id().to_string())
        .collect()
}

fn busy_scene() -> Beatmap {
    let mut doc = Beatmap::new();
    for i in 0..40 {
        let start = i as f32 * 0.5;
        let mut o = object(&format!("o{i}"), start, start + 3.0);
        o.render_depth = i % 3;
        o.position = vec![
            RandomKeyframe::linear(0.0, Vec2::ZERO).with_random(RandomSetting::range(Vec2::new(10.0, 5.0), 0.0)),
            RandomKeyframe::new(3.0, Easing::InOutSine, Vec2::new(4.0, -2.0)),
        ];
        o.rotation = vec![RandomKeyframe::linear(0.0, 0.0), RandomKeyframe::linear(3.0, 180.0)];
        if i > 0 {
            o.parent = Some(ObjectId::from(format!("o{}", i - 1).as_str()));
        }
        doc.insert_object(o).unwrap();
    }
    doc
}

/// Same time gives the same frame, whatever was evaluated before
#[test]
fn test_frames_reproducible_across_seeks() {
    let registry = HeadlessRegistry::default();
    let mut doc = busy_scene();
    let mut engine = engine(77);
    engine.load(&mut doc).unwrap();

    let first = engine.compute_frame(&doc, 7.25, &registry);
    assert!(!first.draw_items.is_empty());
    assert_eq!(engine.compute_frame(&doc, 7.25, &registry), first);

    for time in [12.0, 1.0, 19.5, 0.0, 7.0] {
        engine.compute_frame(&doc, time, &registry);
    }
    assert_eq!(engine.compute_frame(&doc, 7.25, &registry), first);

    let mut fresh_doc = busy_scene();
    let mut fresh = engine_with_doc(77, &mut fresh_doc);
    assert_eq!(fresh.compute_frame(&fresh_doc, 7.25, &registry), first);
}

fn engine_with_doc(seed: u64, doc: &mut Beatmap) -> PlaybackEngine {
    let mut engine = engine(seed);
    engine.load(doc).unwrap();
    engine
}

/// Randomized keyframes depend on the seed
#[test]
fn test_seed_changes_randomized_frames() {
    let registry = HeadlessRegistry::default();
    let mut a_doc = busy_scene();
    let mut b_doc = busy_scene();
    let mut a = engine_with_doc(1, &mut a_doc);
    let mut b = engine_with_doc(2, &mut b_doc);

    let a = a.compute_frame(&a_doc, 1.0, &registry);
    let b = b.compute_frame(&b_doc, 1.0, &registry);
    assert_eq!(a.draw_items.len(), b.draw_items.len());
    assert_ne!(a.draw_items, b.draw_items);
}

/// Alive range is half-open and seeks agree with a forward scan
#[test]
fn test_alive_range_through_engine() {
    let registry = HeadlessRegistry::default();
    let mut doc = Beatmap::new();
    doc.insert_object(object("a", 2.0, 5.0)).unwrap();
    let mut engine = engine_with_doc(0, &mut doc);

    assert_eq!(engine.compute_frame(&doc, 1.999, &registry).stats.alive, 0);
    assert_eq!(engine.compute_frame(&doc, 2.0, &registry).stats.alive, 1);
    assert_eq!(engine.compute_frame(&doc, 4.999, &registry).stats.alive, 1);
    assert_eq!(engine.compute_frame(&doc, 5.0, &registry).stats.alive, 0);
    assert_eq!(engine.compute_frame(&doc, 3.0, &registry).stats.alive, 1);
}

/// A position-only child translates with its parent but keeps its own axes
#[test]
fn test_position_only_child() {
    let registry = HeadlessRegistry::default();
    let mut doc = Beatmap::new();
    let mut parent = object("parent", 0.0, 10.0);
    parent.position = vec![RandomKeyframe::linear(0.0, Vec2::new(5.0, 5.0))];
    parent.rotation = vec![RandomKeyframe::linear(0.0, 45.0)];
    parent.scale = vec![RandomKeyframe::linear(0.0, Vec2::splat(3.0))];
    doc.insert_object(parent).unwrap();

    let mut child = object("child", 0.0, 10.0);
    child.parent = Some(ObjectId::from("parent"));
    child.parent_type = ParentType::POSITION;
    child.position = vec![RandomKeyframe::linear(0.0, Vec2::new(1.0, 0.0))];
    doc.insert_object(child).unwrap();

    let mut engine = engine_with_doc(0, &mut doc);
    let frame = engine.compute_frame(&doc, 1.0, &registry);
    let index = engine.container().index_of(&Identifier::new("child")).unwrap();
    let item = frame.draw_items.iter().find(|item| item.object_index == index).unwrap();

    assert!((item.transform.transform_point2(Vec2::ZERO) - Vec2::new(6.0, 5.0)).length() < 1e-4);
    assert!((item.transform.transform_vector2(Vec2::X) - Vec2::X).length() < 1e-4);
}

/// Intermediate parents are superseded, re-synthesized and deleted through document edits
#[test]
fn test_intermediate_parent_lifecycle() {
    let mut doc = Beatmap::new();
    let prefab = PrefabId::from("p");
    let mut child = object("child", 0.0, 10.0);
    child.parent = Some(ObjectId::from("anchor"));
    doc.insert_prefab(Prefab::new(prefab.clone(), "p").with_object(child)).unwrap();
    let instance = InstanceId::from("i");
    doc.insert_instance(PrefabInstance::new(instance.clone(), prefab.clone(), 0.0))
        .unwrap();

    let mut engine = engine_with_doc(0, &mut doc);
    let anchor_id = Identifier::combine("i", "anchor");
    let child_index = engine.container().index_of(&Identifier::combine("i", "child")).unwrap();
    assert!(!engine.container().get_by_id(&anchor_id).unwrap().is_visible());

    doc.insert_prefab_object(&prefab, object("anchor", 0.0, 10.0)).unwrap();
    engine.sync(&mut doc).unwrap();
    let real = engine.container().index_of(&anchor_id).unwrap();
    assert!(engine.container().get(real).unwrap().is_visible());
    assert_eq!(engine.container().try_get_parent_index(child_index), Some(real));

    doc.remove_prefab_object(&prefab, &ObjectId::from("anchor")).unwrap();
    engine.sync(&mut doc).unwrap();
    let synthesized = engine.container().index_of(&anchor_id).unwrap();
    assert!(!engine.container().get(synthesized).unwrap().is_visible());
    assert_eq!(engine.container().try_get_parent_index(child_index), Some(synthesized));

    doc.remove_prefab_object(&prefab, &ObjectId::from("child")).unwrap();
    engine.sync(&mut doc).unwrap();
    assert!(engine.container().get_by_id(&anchor_id).is_none());
    assert_eq!(engine.sources().prefabs().intermediate_count(&instance), 0);
}

/// Moving an instance moves its clones through the anchor
#[test]
fn test_instance_anchor_moves_clones() {
    let registry = HeadlessRegistry::default();
    let mut doc = Beatmap::new();
    let prefab = PrefabId::from("p");
    doc.insert_prefab(Prefab::new(prefab.clone(), "p").with_object(object("o", 0.0, 10.0)))
        .unwrap();
    let instance = InstanceId::from("i");
    doc.insert_instance(PrefabInstance::new(instance.clone(), prefab, 0.0))
        .unwrap();
    let mut engine = engine_with_doc(0, &mut doc);

    doc.update_instance(&instance, InstanceField::Position, |i| i.position = Vec2::new(2.0, 3.0))
        .unwrap();
    engine.sync(&mut doc).unwrap();
    let frame = engine.compute_frame(&doc, 1.0, &registry);

    assert_eq!(frame.draw_items.len(), 1);
    assert_eq!(frame.draw_items[0].parent_depth, 1);
    assert!((frame.draw_items[0].transform.transform_point2(Vec2::ZERO) - Vec2::new(2.0, 3.0)).length() < 1e-4);
}

/// Equal render depth sorts by parent depth regardless of insertion order
#[test]
fn test_draw_order_independent_of_insertion() {
    let registry = HeadlessRegistry::default();
    let build = |reversed: bool| {
        let mut objects = vec![object("root", 0.0, 10.0), object("one", 0.0, 10.0), object("two", 0.0, 10.0)];
        objects[1].parent = Some(ObjectId::from("root"));
        objects[2].parent = Some(ObjectId::from("one"));
        for o in &mut objects {
            o.render_depth = 2;
        }
        objects.push(object("solo", 0.0, 10.0));
        if reversed {
            objects.reverse();
        }
        let mut doc = Beatmap::new();
        for o in objects {
            doc.insert_object(o).unwrap();
        }
        doc
    };

    let mut forward_doc = build(false);
    let mut forward = engine_with_doc(0, &mut forward_doc);
    let mut reversed_doc = build(true);
    let mut reversed = engine_with_doc(0, &mut reversed_doc);

    let a = forward.compute_frame(&forward_doc, 1.0, &registry);
    let b = reversed.compute_frame(&reversed_doc, 1.0, &registry);
    let order = drawn_ids(&forward, &a);
    assert_eq!(order, drawn_ids(&reversed, &b));
    assert_eq!(&order[..1], ["solo"]);
    assert_eq!(&order[2..], ["one", "two"]);

    let depths: Vec<u32> = a.draw_items.iter().map(|item| item.parent_depth).collect();
    assert_eq!(depths, vec![0, 0, 1, 2]);
}

/// Edits after load reach the running engine field by field
#[test]
fn test_field_edits_keep_identity() {
    let registry = HeadlessRegistry::default();
    let mut doc = Beatmap::new();
    doc.insert_object(object("a", 0.0, 10.0)).unwrap();
    let mut engine = engine_with_doc(0, &mut doc);
    let index = engine.container().index_of(&Identifier::new("a")).unwrap();

    doc.update_object(&ObjectId::from("a"), ObjectField::RenderDepth, |o| o.render_depth = 9)
        .unwrap();
    doc.update_object(&ObjectId::from("a"), ObjectField::Visible, |o| o.visible = false)
        .unwrap();
    assert_eq!(engine.sync(&mut doc).unwrap(), 2);

    assert_eq!(engine.container().index_of(&Identifier::new("a")), Some(index));
    assert_eq!(engine.container().get(index).unwrap().render_depth, 9);
    assert!(engine.compute_frame(&doc, 1.0, &registry).draw_items.is_empty());
}

/// An object dying at t and one spawning at t never overlap, in either direction
#[test]
fn test_back_to_back_ranges_hand_over() {
    let registry = HeadlessRegistry::default();
    let mut doc = Beatmap::new();
    doc.insert_object(object("first", 0.0, 2.0)).unwrap();
    doc.insert_object(object("second", 2.0, 4.0)).unwrap();
    let mut engine = engine_with_doc(0, &mut doc);

    let mut forward = Vec::new();
    for time in [1.0, 1.999, 2.0, 3.0] {
        let frame = engine.compute_frame(&doc, time, &registry);
        forward.push((frame.stats.alive, drawn_ids(&engine, &frame)));
    }
    assert_eq!(forward[1], (1, vec!["first".to_string()]));
    assert_eq!(forward[2], (1, vec!["second".to_string()]));

    let mut backward = Vec::new();
    for time in [3.0, 2.0, 1.999, 1.0] {
        let frame = engine.compute_frame(&doc, time, &registry);
        backward.push((frame.stats.alive, drawn_ids(&engine, &frame)));
    }
    backward.reverse();
    assert_eq!(backward, forward);

    let frame = engine.compute_frame(&doc, 4.0, &registry);
    assert_eq!(frame.stats.alive, 0);
}

/// Instance and prefab object inserts in one batch are applied against the
/// final document without duplicating clones
#[test]
fn test_mixed_prefab_batch() {
    let registry = HeadlessRegistry::default();
    let mut doc = Beatmap::new();
    let prefab = PrefabId::from("p");
    doc.insert_prefab(Prefab::new(prefab.clone(), "p").with_object(object("a", 0.0, 10.0)))
        .unwrap();
    let mut engine = engine_with_doc(0, &mut doc);

    let instance = InstanceId::from("i");
    doc.insert_instance(PrefabInstance::new(instance.clone(), prefab.clone(), 0.0))
        .unwrap();
    doc.insert_prefab_object(&prefab, object("b", 0.0, 10.0)).unwrap();
    doc.update_instance(&instance, InstanceField::Scale, |i| i.scale = Vec2::splat(2.0))
        .unwrap();
    assert_eq!(engine.sync(&mut doc).unwrap(), 3);
    assert_eq!(engine.compute_frame(&doc, 1.0, &registry).stats.drawn, 2);

    doc.remove_prefab_object(&prefab, &ObjectId::from("a")).unwrap();
    engine.sync(&mut doc).unwrap();
    let anchor = engine.container().index_of(&Identifier::combine("i", "")).unwrap();
    let b = engine.container().index_of(&Identifier::combine("i", "b")).unwrap();
    assert_eq!(engine.container().try_get_parent_index(b), Some(anchor));

    // Default inheritance still picks up the instance scale through the anchor
    let frame = engine.compute_frame(&doc, 1.0, &registry);
    assert_eq!(frame.draw_items.len(), 1);
    assert!((frame.draw_items[0].transform.transform_vector2(Vec2::X) - Vec2::new(2.0, 0.0)).length() < 1e-4);
}

/// A clone parented outside its prefab follows only the channels it inherits
#[test]
fn test_external_parent_channels_through_anchor() {
    let registry = HeadlessRegistry::default();
    let mut doc = Beatmap::new();
    let mut external = object("ext", 0.0, 10.0);
    external.position = vec![RandomKeyframe::linear(0.0, Vec2::new(5.0, 0.0))];
    external.rotation = vec![RandomKeyframe::linear(0.0, 90.0)];
    doc.insert_object(external).unwrap();

    let prefab = PrefabId::from("p");
    let mut follower = object("follower", 0.0, 10.0);
    follower.parent = Some(ObjectId::from("ext"));
    follower.parent_type = ParentType::POSITION;
    doc.insert_prefab(Prefab::new(prefab.clone(), "p").with_object(follower)).unwrap();
    doc.insert_instance(PrefabInstance::new(InstanceId::from("i"), prefab, 0.0))
        .unwrap();

    let mut engine = engine_with_doc(0, &mut doc);
    let index = engine.container().index_of(&Identifier::combine("i", "follower")).unwrap();
    let frame = engine.compute_frame(&doc, 1.0, &registry);
    let item = frame.draw_items.iter().find(|item| item.object_index == index).unwrap();

    assert_eq!(item.parent_depth, 2);
    assert!((item.transform.transform_point2(Vec2::ZERO) - Vec2::new(5.0, 0.0)).length() < 1e-4);
    assert!((item.transform.transform_vector2(Vec2::X) - Vec2::X).length() < 1e-4);
}
