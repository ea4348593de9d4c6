//! Event routing.
//!
//! The router answers one question: which scripts start when an event fires?
//! Firing restarts a script's existing sequence or creates a new one, for every
//! sprite of the active scene (or one sprite, for scoped events such as
//! start-as-clone).
//!
//! Host events arrive between ticks, so firing them right away never
//! interleaves with a substep. Events that arrive before a scene is live
//! (first activation or a pending reload) are queued and delivered once it is.

use std::collections::VecDeque;

use marionette_script::event::{Event, EventId};
use marionette_script::sprite::Sprite;
use marionette_script::sprite_id::SpriteId;

/// A script that listens to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listener {
    pub sprite: SpriteId,
    pub script_index: usize,
}

/// Queues host events and fans events out to sprites.
#[derive(Debug, Default)]
pub struct EventRouter {
    pending: VecDeque<Event>,
    delivered: u64,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for the next delivery point.
    pub fn enqueue(&mut self, event: Event) {
        self.pending.push_back(event);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drop queued events without delivering them.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Deliver every queued event to `sprites`, in arrival order. Returns the
    /// number of scripts started.
    pub fn deliver_pending(&mut self, sprites: &mut [Sprite]) -> usize {
        let mut started = 0;
        while let Some(event) = self.pending.pop_front() {
            started += self.fire_to_all(&event.id, sprites);
        }
        started
    }

    /// Fire `event` at every live sprite.
    pub fn fire_to_all(&mut self, event: &EventId, sprites: &mut [Sprite]) -> usize {
        let started: usize = sprites.iter_mut().map(|s| s.fire(event)).sum();
        self.delivered += 1;
        tracing::debug!(%event, started, "event fired");
        started
    }

    /// Fire `event` at one sprite only.
    pub fn fire_to(&mut self, event: &EventId, sprite: &mut Sprite) -> usize {
        self.delivered += 1;
        sprite.fire(event)
    }

    /// Number of events fired so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

/// Every enabled script in `sprites` that `event` would start.
pub fn listeners(event: &EventId, sprites: &[Sprite]) -> Vec<Listener> {
    sprites
        .iter()
        .filter(|s| !s.is_invalidated())
        .flat_map(|sprite| {
            sprite
                .scripts()
                .iter()
                .enumerate()
                .filter(|(_, script)| script.listens_to(event))
                .map(move |(script_index, _)| Listener {
                    sprite: sprite.id(),
                    script_index,
                })
        })
        .collect()
}
