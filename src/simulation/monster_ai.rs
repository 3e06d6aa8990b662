//! Monster AI - per-tick behavior, aggro, attacks, and the death lifecycle
//!
//! Each monster runs one pass per tick:
//! health bar -> death handling (short-circuits) -> distance to player ->
//! cooldown -> aggro thresholds -> contagion -> ranged / melee / pursue / idle.
//!
//! Events are published right after each monster's pass so their reactions
//! (damage, hit latching) are visible to the monsters processed after it.

use rand::Rng;

use crate::combat::damage::experience_reward;
use crate::core::config::SimulationConfig;
use crate::core::constants::WANDER_STALL_TICKS;
use crate::core::error::{CoreError, Result};
use crate::core::types::{EntityId, Millis, TilePos, Vec2};
use crate::ecs::components::*;
use crate::ecs::world::World;
use crate::events::{EventBus, GameEvent, LogChannel, PlayerActionKind};
use crate::spatial::SpatialLayer;

/// Player position and the monster's relation to it
#[derive(Debug, Clone, Copy)]
struct Engagement {
    player_pos: Vec2,
    offset: Vec2,
    distance: f32,
}

impl Engagement {
    fn new(monster_pos: Vec2, player_pos: Vec2) -> Self {
        let offset = player_pos - monster_pos;
        Self { player_pos, offset, distance: offset.length() }
    }

    /// Unit vector toward the player; zero when standing on it
    fn direction(&self) -> Vec2 {
        if self.distance > 0.0 {
            self.offset * (1.0 / self.distance)
        } else {
            Vec2::ZERO
        }
    }
}

/// Run the controller for every monster
pub fn update_monsters(world: &mut World, bus: &mut EventBus, config: &SimulationConfig, delta_seconds: f32) {
    let delta_ms = delta_seconds as Millis * 1000.0;
    let player_pos = world.player().and_then(|p| world.position(p));

    for monster in world.ids::<MonsterData>() {
        if !world.is_alive(monster) {
            continue;
        }
        let events = match step_monster(world, config, monster, player_pos, delta_ms) {
            Ok(events) => events,
            Err(err) => {
                tracing::warn!("Skipping monster {} this tick: {}", monster, err);
                continue;
            }
        };
        if let Err(err) = bus.publish_all(world, events) {
            tracing::error!("Event handler failed for monster {}: {}", monster, err);
        }
    }
}

/// One controller pass for one monster
pub fn step_monster(
    world: &mut World,
    config: &SimulationConfig,
    monster: EntityId,
    player_pos: Option<Vec2>,
    delta_ms: Millis,
) -> Result<Vec<GameEvent>> {
    let mut events = Vec::new();

    refresh_health_bar(world, monster);

    if world.has::<Dead>(monster) {
        handle_death(world, config, monster, &mut events)?;
        return Ok(events);
    }

    let pos = world.position(monster).ok_or_else(|| CoreError::missing::<Position>(monster))?;
    let Some(player_pos) = player_pos else {
        idle(world, config, monster, pos)?;
        return Ok(events);
    };
    let engagement = Engagement::new(pos, player_pos);

    if let Some(speed) = world.get_mut::<AttackSpeed>(monster) {
        speed.elapsed_since_last_attack += delta_ms;
    }

    let aggro = apply_thresholds(world, config, monster, engagement.distance)?;
    if aggro {
        spread_aggro(world, config, monster, pos)?;
        engage(world, config, monster, &engagement, &mut events)?;
    } else {
        idle(world, config, monster, pos)?;
    }

    Ok(events)
}

fn refresh_health_bar(world: &mut World, monster: EntityId) {
    let Some(fraction) = world.get::<Health>(monster).map(Health::fraction) else {
        return;
    };
    if let Some(data) = world.get_mut::<MonsterData>(monster) {
        data.hp_bar_width = fraction;
    }
}

/// Detection latch, aggro rise, and aggro demotion. Returns the aggro flag.
fn apply_thresholds(world: &mut World, config: &SimulationConfig, monster: EntityId, distance: f32) -> Result<bool> {
    let in_combat = world.has::<InCombat>(monster);
    let data = world
        .get_mut::<MonsterData>(monster)
        .ok_or_else(|| CoreError::missing::<MonsterData>(monster))?;

    if distance <= config.detection_range() {
        data.is_detected = true;
    }
    if distance <= config.aggro_range() {
        data.is_aggro = true;
    }
    if distance > 2.0 * config.aggro_range() && !in_combat {
        data.is_aggro = false;
    }
    Ok(data.is_aggro)
}

/// Contagion: every other live monster within aggro range of this one joins in
fn spread_aggro(world: &mut World, config: &SimulationConfig, monster: EntityId, pos: Vec2) -> Result<()> {
    let recruits: Vec<EntityId> = world
        .spatial
        .query(SpatialLayer::Monster, pos, config.aggro_range())
        .into_iter()
        .filter(|&other| other != monster && !world.has::<Dead>(other))
        .collect();

    let in_combat = world.has::<InCombat>(monster);
    for &recruit in &recruits {
        if let Some(data) = world.get_mut::<MonsterData>(recruit) {
            data.is_aggro = true;
        }
        if in_combat {
            world.insert(recruit, InCombat::fresh(config.in_combat_duration_ms));
        }
    }

    if !recruits.is_empty() {
        tracing::trace!("Monster {} recruited {} neighbors", monster, recruits.len());
    }
    let data = world
        .get_mut::<MonsterData>(monster)
        .ok_or_else(|| CoreError::missing::<MonsterData>(monster))?;
    data.nearby_monsters = recruits;
    Ok(())
}

/// Ranged attack, melee attack, or pursuit
fn engage(
    world: &mut World,
    config: &SimulationConfig,
    monster: EntityId,
    engagement: &Engagement,
    events: &mut Vec<GameEvent>,
) -> Result<()> {
    let ranged_reach = world.get::<RangedAttack>(monster).map(|r| r.range * config.tile_size);

    let attack = match ranged_reach {
        Some(reach) if engagement.distance <= reach => Some(GameEvent::MonsterRangedAttack {
            entity_id: monster,
            direction: engagement.direction(),
        }),
        _ if engagement.distance <= config.melee_range() => Some(GameEvent::MonsterAttack { entity_id: monster }),
        _ => None,
    };

    match attack {
        Some(event) => {
            // Holds position whether or not the swing is ready
            set_behavior(world, monster, MonsterBehavior::Attacking)?;
            if try_consume_cooldown(world, monster) {
                events.push(event);
            }
        }
        None => {
            set_behavior(world, monster, MonsterBehavior::Pursuing)?;
            face_toward(world, monster, engagement.offset.x);
            world.insert(monster, MovementIntent::toward(engagement.player_pos));
        }
    }
    Ok(())
}

/// Reset the cooldown if it has elapsed
fn try_consume_cooldown(world: &mut World, monster: EntityId) -> bool {
    match world.get_mut::<AttackSpeed>(monster) {
        Some(speed) if speed.ready() => {
            speed.elapsed_since_last_attack = 0.0;
            true
        }
        _ => false,
    }
}

fn face_toward(world: &mut World, monster: EntityId, dx: f32) {
    if dx < 0.0 {
        world.insert(monster, Facing(HorizontalFacing::Left));
    } else if dx > 0.0 {
        world.insert(monster, Facing(HorizontalFacing::Right));
    }
}

fn set_behavior(world: &mut World, monster: EntityId, behavior: MonsterBehavior) -> Result<()> {
    let data = world
        .get_mut::<MonsterData>(monster)
        .ok_or_else(|| CoreError::missing::<MonsterData>(monster))?;
    data.behavior = behavior;
    Ok(())
}

fn behavior_of(world: &World, monster: EntityId) -> Result<MonsterBehavior> {
    world
        .get::<MonsterData>(monster)
        .map(|d| d.behavior)
        .ok_or_else(|| CoreError::missing::<MonsterData>(monster))
}

/// Not aggroed: stand still, or wander when the feature is on
fn idle(world: &mut World, config: &SimulationConfig, monster: EntityId, pos: Vec2) -> Result<()> {
    let behavior = behavior_of(world, monster)?;
    if !config.wander_enabled {
        if behavior != MonsterBehavior::Idle {
            set_behavior(world, monster, MonsterBehavior::Idle)?;
        }
        return Ok(());
    }

    let next = match behavior {
        MonsterBehavior::Wandering { tile, legs_remaining, closest_px, stalled_ticks } => {
            let target = tile.to_pixel(config.tile_size);
            let distance = pos.distance(&target);
            let distance_px = distance.round() as u32;
            let stalled_ticks = if distance_px < closest_px { 0 } else { stalled_ticks + 1 };

            // Arrived, or blocked for too long: either way the leg is over
            if distance < 1.0 || stalled_ticks >= WANDER_STALL_TICKS {
                let legs_remaining = legs_remaining.saturating_sub(1);
                match pick_wander_tile(world, config, TilePos::from_pixel(pos, config.tile_size)) {
                    Some(tile) if legs_remaining > 0 => MonsterBehavior::wander(tile, legs_remaining),
                    _ => MonsterBehavior::Idle,
                }
            } else {
                face_toward(world, monster, target.x - pos.x);
                world.insert(monster, MovementIntent::toward(target));
                MonsterBehavior::Wandering {
                    tile,
                    legs_remaining,
                    closest_px: closest_px.min(distance_px),
                    stalled_ticks,
                }
            }
        }
        MonsterBehavior::Idle => {
            if world.rng.gen_bool(config.wander_chance) {
                let legs = world.rng.gen_range(1..=config.wander_max_legs.max(1));
                match pick_wander_tile(world, config, TilePos::from_pixel(pos, config.tile_size)) {
                    Some(tile) => MonsterBehavior::wander(tile, legs),
                    None => MonsterBehavior::Idle,
                }
            } else {
                MonsterBehavior::Idle
            }
        }
        MonsterBehavior::Pursuing | MonsterBehavior::Attacking => MonsterBehavior::Idle,
    };
    set_behavior(world, monster, next)
}

/// Random floor tile near `from` with no wall on it
fn pick_wander_tile(world: &mut World, config: &SimulationConfig, from: TilePos) -> Option<TilePos> {
    const ATTEMPTS: usize = 8;
    let reach = config.wander_max_offset_tiles.max(1);
    for _ in 0..ATTEMPTS {
        let candidate = TilePos::new(
            from.x + world.rng.gen_range(-reach..=reach),
            from.y + world.rng.gen_range(-reach..=reach),
        );
        if candidate != from && is_walkable(world, candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_walkable(world: &World, tile: TilePos) -> bool {
    let mut floor = false;
    for &occupant in world.spatial.occupants(tile) {
        match world.get::<Tile>(occupant) {
            Some(Tile(TileKind::Wall)) => return false,
            Some(Tile(TileKind::Floor)) => floor = true,
            None => {}
        }
    }
    floor
}

/// Dead sub-machine: rewards on the first pass, removal once expired
fn handle_death(
    world: &mut World,
    config: &SimulationConfig,
    monster: EntityId,
    events: &mut Vec<GameEvent>,
) -> Result<()> {
    let dead = *world.get::<Dead>(monster).ok_or_else(|| CoreError::missing::<Dead>(monster))?;
    world.remove::<MovementIntent>(monster);

    if dead.state == DeathState::New {
        on_first_death_tick(world, config, monster, events)?;
        if let Some(d) = world.get_mut::<Dead>(monster) {
            d.state = DeathState::Handling;
        }
    }

    let state = world.get::<Dead>(monster).map(|d| d.state).unwrap_or(dead.state);
    let deadline = dead.expires_at + config.death_removal_grace_ms;
    if state == DeathState::Processed || world.now_ms >= deadline {
        world.schedule_removal(monster);
    }
    Ok(())
}

fn on_first_death_tick(
    world: &mut World,
    config: &SimulationConfig,
    monster: EntityId,
    events: &mut Vec<GameEvent>,
) -> Result<()> {
    let max_hp = match world.get_mut::<Health>(monster) {
        Some(health) => {
            health.hp = 0;
            health.updated = true;
            health.max_hp
        }
        None => 0,
    };

    let data = {
        let data = world
            .get_mut::<MonsterData>(monster)
            .ok_or_else(|| CoreError::missing::<MonsterData>(monster))?;
        data.is_aggro = false;
        data.behavior = MonsterBehavior::Idle;
        data.hp_bar_width = 0.0;
        data.clone()
    };
    let pos = world.position(monster).unwrap_or_default();

    let xp = experience_reward(max_hp, &data, config);
    let kind = if data.is_boss { PlayerActionKind::KillBoss } else { PlayerActionKind::KillMonster };

    let loot = world.spawn();
    world.insert(
        loot,
        LootSource {
            source: monster,
            tier: data.tier,
            position: pos,
            is_boss: data.is_boss,
            guaranteed_items: data.unique_items_dropped.clone(),
        },
    );

    tracing::debug!("{} ({}) died; awarding {} xp", data.name, monster, xp);
    events.push(GameEvent::log(LogChannel::Combat, format!("The {} dies.", data.name)));
    events.push(GameEvent::AwardXp { amount: xp });
    events.push(GameEvent::PlayerAction { kind });
    events.push(GameEvent::DropLoot { loot_source: loot });
    Ok(())
}
