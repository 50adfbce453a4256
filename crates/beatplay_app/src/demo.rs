// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in demo beatmap.

use beatplay_graph::{
    AutoKill, Beatmap, BeatmapObject, DocumentError, InstanceField, InstanceId, ObjectField, ObjectId, ParentType,
    Prefab, PrefabId, PrefabInstance, RandomKeyframe, ShapeIndex,
};
use beatplay_sequencer::{
    BloomKey, Color, Easing, EffectColorKey, IndirectSequence, Keyframe, RandomSetting, Sequence, Shake, Theme,
    ThemeColorKey,
};
use glam::Vec2;

/// Prefab expanded by every demo instance
pub const BURST_PREFAB: &str = "burst";

type Result<T> = std::result::Result<T, DocumentError>;

fn timed(id: &str, start: f32, length: f32) -> BeatmapObject {
    let mut object = BeatmapObject::new(ObjectId::from(id), id);
    object.start_time = start;
    object.autokill = AutoKill::Fixed(length);
    object
}

fn themes(doc: &mut Beatmap) {
    let mut night = Theme::default();
    night.name = "Night".to_string();
    let mut dawn = Theme::uniform("Dawn", Color::from_hex(0xffe0b2));
    dawn.background = Color::from_hex(0x3e2723);
    dawn.object[1] = Color::from_hex(0xff7043);
    doc.themes.push(night);
    doc.themes.push(dawn);
    doc.theme_sequence = Sequence::from_keyframes([
        Keyframe::linear(0.0, 0),
        Keyframe::linear(4.0, 0),
        Keyframe::new(6.0, Easing::InOutSine, 1),
    ]);
}

fn events(doc: &mut Beatmap) {
    let events = &mut doc.events;
    events.camera_zoom = Sequence::from_keyframes([
        Keyframe::linear(0.0, 20.0),
        Keyframe::new(2.0, Easing::OutBack, 14.0),
        Keyframe::new(8.0, Easing::InOutQuad, 24.0),
    ]);
    events.camera_rotation = Sequence::from_keyframes([Keyframe::linear(0.0, 0.0), Keyframe::linear(10.0, 30.0)]);
    events.shake = Sequence::from_keyframes([
        Keyframe::linear(0.0, Shake::default()),
        Keyframe::new(
            3.0,
            Easing::Instant,
            Shake {
                intensity: 1.5,
                direction: Vec2::ONE,
                speed: 1.0,
            },
        ),
        Keyframe::new(3.5, Easing::OutExpo, Shake::default()),
    ]);
    events.bloom = IndirectSequence::from_keyframes([
        Keyframe::linear(0.0, BloomKey::default()),
        Keyframe::new(
            5.0,
            Easing::InSine,
            BloomKey {
                intensity: 0.6,
                diffusion: 7.0,
                color: EffectColorKey(0),
            },
        ),
    ]);
}

/// Spinning hub with two orbiting children and a caption
fn main_objects(doc: &mut Beatmap) -> Result<()> {
    let mut hub = timed("hub", 0.0, 10.0);
    hub.render_depth = 10;
    hub.rotation = vec![
        RandomKeyframe::linear(0.0, 0.0),
        RandomKeyframe::new(10.0, Easing::InOutSine, 720.0),
    ];
    hub.scale = vec![
        RandomKeyframe::linear(0.0, Vec2::splat(2.0)),
        RandomKeyframe::new(1.0, Easing::OutElastic, Vec2::splat(3.0)),
    ];
    hub.color = vec![
        Keyframe::linear(0.0, ThemeColorKey::solid(0, 1.0)),
        Keyframe::new(6.0, Easing::InQuad, ThemeColorKey::solid(1, 0.8)),
    ];
    doc.insert_object(hub)?;

    for (i, side) in [-1.0_f32, 1.0].into_iter().enumerate() {
        let mut moon = timed(&format!("moon{i}"), 0.5, 9.0);
        moon.parent = Some(ObjectId::from("hub"));
        moon.parent_type = ParentType::POSITION | ParentType::ROTATION;
        moon.parent_offset.rotation = 0.1 * i as f32;
        moon.render_depth = 5;
        moon.shape = ShapeIndex::new(1, 0);
        moon.position = vec![
            RandomKeyframe::linear(0.0, Vec2::new(side * 4.0, 0.0))
                .with_random(RandomSetting::range(Vec2::new(side * 6.0, 1.0), 0.5)),
        ];
        moon.rotation = vec![RandomKeyframe::linear(0.0, 0.0).with_random(RandomSetting::snap(45.0))];
        doc.insert_object(moon)?;
    }

    let mut caption = timed("caption", 1.0, 8.0);
    caption.shape = ShapeIndex::text();
    caption.text = Some("beatplay".to_string());
    caption.origin = Vec2::new(-0.5, 0.0);
    caption.position = vec![RandomKeyframe::new(0.0, Easing::OutBounce, Vec2::new(0.0, -6.0))];
    caption.color = vec![Keyframe::linear(0.0, ThemeColorKey::solid(2, 1.0))];
    doc.insert_object(caption)?;
    Ok(())
}

/// Short-lived particle burst. The shards parent to `core`, which the
/// prefab does not contain, so each instance gets an intermediate anchor.
fn burst_prefab() -> Prefab {
    let mut prefab = Prefab::new(PrefabId::from(BURST_PREFAB), "Burst");
    prefab.offset = 0.25;
    for i in 0..6 {
        let id = format!("shard{i}");
        let mut shard = BeatmapObject::new(ObjectId::from(id.as_str()), id.as_str());
        shard.autokill = AutoKill::LastKeyframeOffset(0.1);
        shard.parent = Some(ObjectId::from("core"));
        shard.shape = ShapeIndex::new(0, 2);
        shard.render_depth = 20;
        shard.position = vec![
            RandomKeyframe::linear(0.0, Vec2::ZERO),
            RandomKeyframe::new(1.2, Easing::OutCirc, Vec2::from_angle(i as f32 * 60_f32.to_radians()) * 5.0)
                .with_random(RandomSetting::scale(0.6, 1.4)),
        ];
        shard.scale = vec![
            RandomKeyframe::linear(0.0, Vec2::ONE),
            RandomKeyframe::new(1.2, Easing::InQuad, Vec2::ZERO),
        ];
        shard.color = vec![Keyframe::linear(0.0, ThemeColorKey::solid(1, 1.0))];
        prefab = prefab.with_object(shard);
    }
    prefab
}

/// Build the demo beatmap with `instances` bursts spread over ten seconds
pub fn build(instances: usize) -> Result<Beatmap> {
    let mut doc = Beatmap::new();
    themes(&mut doc);
    events(&mut doc);
    main_objects(&mut doc)?;
    doc.insert_prefab(burst_prefab())?;

    let prefab = PrefabId::from(BURST_PREFAB);
    for i in 0..instances {
        let t = i as f32 / instances.max(1) as f32;
        let mut instance = PrefabInstance::new(InstanceId::from(format!("burst{i}").as_str()), prefab.clone(), t * 9.0);
        instance.position = Vec2::from_angle(t * std::f32::consts::TAU) * 8.0;
        instance.rotation = t * 360.0;
        doc.insert_instance(instance)?;
    }

    tracing::debug!(
        "Demo beatmap: {} objects, {} prefabs, {} instances",
        doc.objects().count(),
        doc.prefabs().count(),
        doc.instances().count()
    );
    Ok(doc)
}

/// Scripted live edit for step `step`: drift the first burst instance and
/// pulse the hub's draw order
pub fn live_edit(doc: &mut Beatmap, step: usize) -> Result<()> {
    let instance = InstanceId::from("burst0");
    if doc.instance(&instance).is_some() {
        doc.update_instance(&instance, InstanceField::Position, |i| {
            i.position += Vec2::new(0.5, 0.0);
        })?;
    }
    let hub = ObjectId::from("hub");
    if doc.object(&hub).is_some() {
        doc.update_object(&hub, ObjectField::RenderDepth, |o| {
            o.render_depth = 10 + (step % 2) as i32;
        })?;
    }
    Ok(())
}
