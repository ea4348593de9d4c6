//! Sprite identity and the roster of live sprites.
//!
//! A [`SpriteId`] names one sprite for as long as it lives. Its `slot` is
//! reused once the sprite is retired, but the slot's `generation` moves on,
//! so an id kept past a clone's deletion never resolves to the sprite that
//! took its place.
//!
//! The stage owns exactly one [`SpriteRoster`]. Sprite lists move between the
//! active scene and backups without re-enrolling, so the roster is the one
//! place that knows every sprite alive anywhere, and which of them are clones
//! of which authored sprite.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SpriteId
// ---------------------------------------------------------------------------

/// Identity of one sprite: roster slot plus the slot's generation at
/// enrolment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpriteId {
    slot: u32,
    generation: u32,
}

impl SpriteId {
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn slot(self) -> u32 {
        self.slot
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for SpriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot, self.generation)
    }
}

// ---------------------------------------------------------------------------
// Lineage
// ---------------------------------------------------------------------------

/// Where a live sprite came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lineage {
    /// Declared in a scene definition.
    Authored,
    /// Spawned at runtime. Always points at the authored root, never at an
    /// intermediate clone.
    CloneOf(SpriteId),
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    occupant: Option<Lineage>,
}

// ---------------------------------------------------------------------------
// SpriteRoster
// ---------------------------------------------------------------------------

/// Hands out [`SpriteId`]s and tracks every live sprite with its lineage.
#[derive(Debug, Default)]
pub struct SpriteRoster {
    slots: Vec<Slot>,
    vacant: Vec<u32>,
    clones: usize,
}

impl SpriteRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enrol an authored sprite.
    pub fn enroll(&mut self) -> SpriteId {
        self.occupy(Lineage::Authored)
    }

    /// Enrol a clone of `original`. If `original` is itself a clone its root
    /// is recorded instead.
    pub fn enroll_clone(&mut self, original: SpriteId) -> SpriteId {
        let root = match self.lineage(original) {
            Some(Lineage::CloneOf(root)) => root,
            _ => original,
        };
        self.clones += 1;
        self.occupy(Lineage::CloneOf(root))
    }

    fn occupy(&mut self, lineage: Lineage) -> SpriteId {
        match self.vacant.pop() {
            Some(slot) => {
                let entry = &mut self.slots[slot as usize];
                entry.occupant = Some(lineage);
                SpriteId::new(slot, entry.generation)
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    occupant: Some(lineage),
                });
                SpriteId::new(slot, 0)
            }
        }
    }

    /// Retire `id`. Returns the lineage it had, or `None` if `id` was already
    /// retired or never enrolled here.
    pub fn retire(&mut self, id: SpriteId) -> Option<Lineage> {
        let entry = self.slots.get_mut(id.slot() as usize)?;
        if entry.generation != id.generation() {
            return None;
        }
        let lineage = entry.occupant.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.vacant.push(id.slot());
        if matches!(lineage, Lineage::CloneOf(_)) {
            self.clones -= 1;
        }
        Some(lineage)
    }

    /// Lineage of a live sprite.
    pub fn lineage(&self, id: SpriteId) -> Option<Lineage> {
        self.slots
            .get(id.slot() as usize)
            .filter(|entry| entry.generation == id.generation())
            .and_then(|entry| entry.occupant)
    }

    pub fn is_alive(&self, id: SpriteId) -> bool {
        self.lineage(id).is_some()
    }

    /// Sprites alive anywhere: the active scene and every backup.
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.vacant.len()
    }

    /// Clones alive anywhere.
    pub fn live_clone_count(&self) -> usize {
        self.clones
    }
}
