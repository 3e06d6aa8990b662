//! Simulation events
//!
//! A closed set of typed events replaces string-tagged publish/subscribe.
//! Every variant maps to one [`EventKind`], which is the subscription key.

pub mod bus;

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Vec2};

pub use bus::{EventBus, Handler, SubscriptionId};

/// Destination of a human-readable log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogChannel {
    Combat,
    Loot,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerActionKind {
    KillMonster,
    KillBoss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PositionChanged { entity_id: EntityId, x: f32, y: f32 },
    MonsterAttack { entity_id: EntityId },
    MonsterRangedAttack { entity_id: EntityId, direction: Vec2 },
    MonsterWasHit { entity_id: EntityId, attacker_id: EntityId, damage_dealt: u32 },
    PlayerWasHit { entity_id: EntityId, attacker_id: EntityId, damage_dealt: u32 },
    /// Damage request; `weapon` is required when the player attacks
    CalculateDamage { attacker: EntityId, target: EntityId, weapon: Option<EntityId> },
    DropLoot { loot_source: EntityId },
    AwardXp { amount: u32 },
    PlayerAction { kind: PlayerActionKind },
    LogMessage { channel: LogChannel, message: String },
    TilesDiscovered { count: usize, total: usize },
    PlayerDied { entity_id: EntityId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PositionChanged,
    MonsterAttack,
    MonsterRangedAttack,
    MonsterWasHit,
    PlayerWasHit,
    CalculateDamage,
    DropLoot,
    AwardXp,
    PlayerAction,
    LogMessage,
    TilesDiscovered,
    PlayerDied,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::PositionChanged,
        EventKind::MonsterAttack,
        EventKind::MonsterRangedAttack,
        EventKind::MonsterWasHit,
        EventKind::PlayerWasHit,
        EventKind::CalculateDamage,
        EventKind::DropLoot,
        EventKind::AwardXp,
        EventKind::PlayerAction,
        EventKind::LogMessage,
        EventKind::TilesDiscovered,
        EventKind::PlayerDied,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::PositionChanged { .. } => EventKind::PositionChanged,
            GameEvent::MonsterAttack { .. } => EventKind::MonsterAttack,
            GameEvent::MonsterRangedAttack { .. } => EventKind::MonsterRangedAttack,
            GameEvent::MonsterWasHit { .. } => EventKind::MonsterWasHit,
            GameEvent::PlayerWasHit { .. } => EventKind::PlayerWasHit,
            GameEvent::CalculateDamage { .. } => EventKind::CalculateDamage,
            GameEvent::DropLoot { .. } => EventKind::DropLoot,
            GameEvent::AwardXp { .. } => EventKind::AwardXp,
            GameEvent::PlayerAction { .. } => EventKind::PlayerAction,
            GameEvent::LogMessage { .. } => EventKind::LogMessage,
            GameEvent::TilesDiscovered { .. } => EventKind::TilesDiscovered,
            GameEvent::PlayerDied { .. } => EventKind::PlayerDied,
        }
    }

    pub fn log(channel: LogChannel, message: impl Into<String>) -> Self {
        GameEvent::LogMessage { channel, message: message.into() }
    }
}
