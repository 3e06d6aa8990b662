//! Tick system - orchestrates simulation updates
//!
//! Stages run in a fixed order every frame:
//! clock -> combat timers -> monster AI -> collision detection -> movement ->
//! health updates -> removal flush -> visibility.
//!
//! Monster AI writes intents that movement consumes in the same frame, and
//! damage queued by attack events is applied before removal and visibility.
//! Player input intents are written by the caller before `tick`.

use serde::Serialize;

use crate::combat::reactions;
use crate::core::config::SimulationConfig;
use crate::core::error::{CoreError, Result};
use crate::core::types::{EntityId, Millis};
use crate::ecs::components::LightSource;
use crate::ecs::world::World;
use crate::events::{EventBus, EventKind, GameEvent};
use crate::visibility::{update_visibility, VisibilityReport};

use super::collision::detect_collisions;
use super::combat_timer::update_combat_timers;
use super::health::apply_health_updates;
use super::monster_ai::update_monsters;
use super::movement::resolve_movement;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Clock,
    CombatTimers,
    MonsterAi,
    CollisionDetection,
    Movement,
    HealthUpdates,
    Removal,
    Visibility,
}

impl Stage {
    pub const ORDER: [Stage; 8] = [
        Stage::Clock,
        Stage::CombatTimers,
        Stage::MonsterAi,
        Stage::CollisionDetection,
        Stage::Movement,
        Stage::HealthUpdates,
        Stage::Removal,
        Stage::Visibility,
    ];
}

/// What happened during one tick
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub now_ms: Millis,
    pub combat_expired: usize,
    pub collisions: usize,
    pub moved: usize,
    pub health_applied: usize,
    pub removed: Vec<EntityId>,
    pub newly_discovered: usize,
    pub render_zone: Option<usize>,
}

/// Owns the world, the event bus, and the configuration they run under
pub struct Simulation {
    pub config: SimulationConfig,
    pub world: World,
    pub bus: EventBus,
}

impl Simulation {
    /// Entropy-seeded simulation
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let world = World::new(&config);
        Ok(Self::assemble(config, world, EventBus::new()))
    }

    /// Deterministic simulation for tests and replays
    pub fn with_seed(config: SimulationConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let world = World::with_seed(&config, seed);
        Ok(Self::assemble(config, world, EventBus::new()))
    }

    /// Same as `with_seed` but the bus keeps a journal of every event
    pub fn recording(config: SimulationConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let world = World::with_seed(&config, seed);
        Ok(Self::assemble(config, world, EventBus::recording()))
    }

    fn assemble(config: SimulationConfig, world: World, mut bus: EventBus) -> Self {
        install(&mut bus, &config);
        Self { config, world, bus }
    }

    /// Publish an event from outside the pipeline (player input, UI)
    pub fn publish(&mut self, event: GameEvent) -> Result<()> {
        self.bus.publish(&mut self.world, event)
    }

    /// Change the player's light and force the visibility passes to rerun
    pub fn set_light_radius(&mut self, radius: u32) -> Result<()> {
        let player = self.world.player().ok_or(CoreError::NoPlayer)?;
        self.world.insert(player, LightSource { radius });
        self.world.visibility.request_refresh();
        Ok(())
    }

    /// Advance the simulation by one frame
    pub fn tick(&mut self, delta_seconds: f32) -> TickReport {
        let delta_ms = delta_seconds as Millis * 1000.0;
        let mut report = TickReport::default();
        let world = &mut self.world;
        let bus = &mut self.bus;
        let config = &self.config;

        for stage in Stage::ORDER {
            match stage {
                Stage::Clock => world.advance_clock(delta_ms),
                Stage::CombatTimers => report.combat_expired = update_combat_timers(world, delta_ms),
                Stage::MonsterAi => update_monsters(world, bus, config, delta_seconds),
                Stage::CollisionDetection => report.collisions = detect_collisions(world, config),
                Stage::Movement => report.moved = resolve_movement(world, bus, delta_seconds),
                Stage::HealthUpdates => report.health_applied = apply_health_updates(world, bus, config),
                Stage::Removal => report.removed = world.flush_removals(),
                Stage::Visibility => match update_visibility(world, bus, config) {
                    Ok(Some(VisibilityReport { newly_discovered, render_zone, .. })) => {
                        report.newly_discovered = newly_discovered;
                        report.render_zone = Some(render_zone);
                    }
                    Ok(None) => {}
                    Err(CoreError::NoPlayer) => {}
                    Err(err) => tracing::warn!("Visibility skipped: {}", err),
                },
            }
        }

        report.tick = world.current_tick;
        report.now_ms = world.now_ms;
        if !report.removed.is_empty() {
            tracing::debug!("Tick {}: removed {} entities", report.tick, report.removed.len());
        }
        report
    }
}

/// Subscribe the handlers every simulation needs
pub fn install(bus: &mut EventBus, config: &SimulationConfig) {
    bus.subscribe(EventKind::PositionChanged, rebucket_on_move);
    reactions::install(bus, config);
}

/// Keep the spatial index in step with committed positions
fn rebucket_on_move(world: &mut World, event: &GameEvent, _: &mut Vec<GameEvent>) -> Result<()> {
    if let GameEvent::PositionChanged { entity_id, .. } = event {
        // Read the component, not the payload, so a stale event can't rewind the index
        let Some(pos) = world.position(*entity_id) else {
            return Ok(());
        };
        if !world.spatial.update(*entity_id, pos) {
            world.track_spatial(*entity_id);
        }
    }
    Ok(())
}
