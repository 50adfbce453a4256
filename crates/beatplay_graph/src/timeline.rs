// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event-scheduled alive-object set over a seekable playhead.
//!
//! Every visible object contributes a spawn event at its start time and a
//! kill event at its end time. The playhead cursor walks this list forward
//! or backward, so a frame costs only the events crossed since the last one.

use crate::container::PlaybackObjectContainer;
use indexmap::IndexSet;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Scheduling event kind. Spawn sorts before Kill at equal times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    /// Object becomes alive moving forward
    Spawn,
    /// Object dies moving forward
    Kill,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Event {
    time: f32,
    kind: EventKind,
    index: usize,
}

impl Event {
    fn cmp_order(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.kind.cmp(&other.kind))
            .then(self.index.cmp(&other.index))
    }
}

/// Alive-object scheduler
#[derive(Debug, Default)]
pub struct Timeline {
    events: Vec<Event>,
    cursor: usize,
    last_time: Option<f32>,
    counters: Vec<i32>,
    alive: IndexSet<usize>,
}

impl Timeline {
    /// Create an empty timeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Alive object indices at `time`, in no particular order
    pub fn compute_alive_objects(&mut self, time: f32, container: &mut PlaybackObjectContainer) -> &IndexSet<usize> {
        let changes = container.take_schedule_changes();
        if !changes.is_empty() {
            let dirty: BTreeSet<usize> = changes.iter().map(|change| change.index()).collect();
            self.rebuild(&dirty, container);
        }

        match self.last_time {
            Some(last) if time == last => {}
            Some(last) if time < last => self.walk_backward(time),
            _ => self.walk_forward(time),
        }
        self.last_time = Some(time);
        &self.alive
    }

    /// Number of objects alive after the last query
    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    /// Whether `index` was alive after the last query
    pub fn is_alive(&self, index: usize) -> bool {
        self.alive.contains(&index)
    }

    /// Number of scheduled events
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Drop the events of dirty objects, schedule the ones still present
    /// and reset the cursor.
    fn rebuild(&mut self, dirty: &BTreeSet<usize>, container: &PlaybackObjectContainer) {
        self.events.retain(|event| !dirty.contains(&event.index));
        for &index in dirty {
            let Some(object) = container.get(index) else {
                continue;
            };
            if !object.is_visible() {
                continue;
            }
            self.events.push(Event {
                time: object.start_time(),
                kind: EventKind::Spawn,
                index,
            });
            self.events.push(Event {
                time: object.end_time(),
                kind: EventKind::Kill,
                index,
            });
        }
        self.events.sort_by(Event::cmp_order);

        self.cursor = 0;
        self.last_time = None;
        self.alive.clear();
        self.counters.clear();
        self.counters.resize(container.capacity(), 0);
        tracing::debug!("Timeline rebuilt: {} events, {} dirty", self.events.len(), dirty.len());
    }

    fn walk_forward(&mut self, time: f32) {
        while let Some(event) = self.events.get(self.cursor).copied() {
            if event.time > time {
                break;
            }
            let delta = match event.kind {
                EventKind::Spawn => 1,
                EventKind::Kill => -1,
            };
            self.bump(event.index, delta);
            self.cursor += 1;
        }
    }

    fn walk_backward(&mut self, time: f32) {
        while self.cursor > 0 {
            let event = self.events[self.cursor - 1];
            if event.time <= time {
                break;
            }
            let delta = match event.kind {
                EventKind::Spawn => -1,
                EventKind::Kill => 1,
            };
            self.bump(event.index, delta);
            self.cursor -= 1;
        }
    }

    fn bump(&mut self, index: usize, delta: i32) {
        if self.counters.len() <= index {
            self.counters.resize(index + 1, 0);
        }
        let counter = &mut self.counters[index];
        *counter += delta;
        if *counter > 0 {
            self.alive.insert(index);
        } else {
            self.alive.swap_remove(&index);
        }
    }
}
