//! Shared per-world resources that are not attached to any entity

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, TilePos};

/// Signed change to an entity's hp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDelta {
    pub entity_id: EntityId,
    pub amount: i32,
}

/// Damage and healing waiting to be applied by the health stage
///
/// Combat only pushes; the health stage only drains. Nothing writes `Health`
/// directly, so several hits landing in one tick are each applied once.
#[derive(Debug, Clone, Default)]
pub struct HealthUpdateQueue {
    pending: VecDeque<HealthDelta>,
}

impl HealthUpdateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: HealthDelta) {
        self.pending.push_back(delta);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = HealthDelta> + '_ {
        self.pending.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HealthDelta> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Remembers where the player stood when visibility last ran
#[derive(Debug, Clone, Default)]
pub struct VisibilityTracker {
    pub last_player_tile: Option<TilePos>,
    pub force_refresh: bool,
}

impl VisibilityTracker {
    pub fn request_refresh(&mut self) {
        self.force_refresh = true;
    }

    /// True when the passes have to run for a player standing on `tile`
    pub fn needs_update(&self, tile: TilePos) -> bool {
        self.force_refresh || self.last_player_tile != Some(tile)
    }

    pub fn mark_updated(&mut self, tile: TilePos) {
        self.last_player_tile = Some(tile);
        self.force_refresh = false;
    }
}
