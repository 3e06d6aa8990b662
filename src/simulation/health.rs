//! Health application - drains queued deltas into `Health`
//!
//! Damage resolution never writes `Health` directly; it queues a delta that
//! this stage clamps and applies. A monster reaching zero starts its death
//! animation here. The player reaching zero emits `PlayerDied` once.

use crate::core::config::SimulationConfig;
use crate::ecs::components::{Dead, DeathState, Health, MonsterData, Player};
use crate::ecs::world::World;
use crate::events::{EventBus, GameEvent};

/// Apply every queued delta. Returns the number applied.
pub fn apply_health_updates(world: &mut World, bus: &mut EventBus, config: &SimulationConfig) -> usize {
    let deltas: Vec<_> = world.health_updates.drain().collect();
    let mut applied = 0;
    let mut events = Vec::new();

    for delta in deltas {
        let Some(health) = world.get_mut::<Health>(delta.entity_id) else {
            tracing::warn!("Health delta for {} without Health; dropping", delta.entity_id);
            continue;
        };
        let was_alive = health.hp > 0;
        health.hp = (health.hp + delta.amount).clamp(0, health.max_hp);
        health.updated = true;
        let hp = health.hp;
        applied += 1;

        if !was_alive || hp > 0 {
            continue;
        }

        if world.has::<MonsterData>(delta.entity_id) {
            if !world.has::<Dead>(delta.entity_id) {
                let expires_at = world.now_ms + config.death_animation_ms;
                world.insert(delta.entity_id, Dead { state: DeathState::New, expires_at });
                tracing::debug!("Monster {} reached 0 hp", delta.entity_id);
            }
        } else if world.has::<Player>(delta.entity_id) {
            tracing::info!("Player {} died at tick {}", delta.entity_id, world.current_tick);
            events.push(GameEvent::PlayerDied { entity_id: delta.entity_id });
        }
    }

    if let Err(err) = bus.publish_all(world, events) {
        tracing::error!("PlayerDied handler failed: {}", err);
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec2;
    use crate::ecs::resources::HealthDelta;

    fn setup() -> (World, EventBus, SimulationConfig) {
        let config = SimulationConfig::default();
        (World::with_seed(&config, 5), EventBus::recording(), config)
    }

    #[test]
    fn test_deltas_clamp_to_range() {
        let (mut world, mut bus, config) = setup();
        let m = world.spawn_monster(Vec2::ZERO, MonsterData::new("bat", 0, 1, 1), 10);
        world.health_updates.push(HealthDelta { entity_id: m, amount: 25 });
        assert_eq!(apply_health_updates(&mut world, &mut bus, &config), 1);
        let health = world.get::<Health>(m).unwrap();
        assert_eq!(health.hp, 10);
        assert!(health.updated);
        assert!(world.health_updates.is_empty());
    }

    #[test]
    fn test_lethal_delta_marks_monster_dead() {
        let (mut world, mut bus, config) = setup();
        world.now_ms = 1000.0;
        let m = world.spawn_monster(Vec2::ZERO, MonsterData::new("bat", 0, 1, 1), 10);
        world.health_updates.push(HealthDelta { entity_id: m, amount: -4 });
        world.health_updates.push(HealthDelta { entity_id: m, amount: -40 });
        apply_health_updates(&mut world, &mut bus, &config);

        assert_eq!(world.get::<Health>(m).unwrap().hp, 0);
        let dead = world.get::<Dead>(m).unwrap();
        assert_eq!(dead.state, DeathState::New);
        assert_eq!(dead.expires_at, 1000.0 + config.death_animation_ms);
    }

    #[test]
    fn test_player_death_emits_once() {
        let (mut world, mut bus, config) = setup();
        let p = world.spawn_player(Vec2::ZERO);
        world.health_updates.push(HealthDelta { entity_id: p, amount: -150 });
        world.health_updates.push(HealthDelta { entity_id: p, amount: -5 });
        apply_health_updates(&mut world, &mut bus, &config);
        assert_eq!(bus.journal(), &[GameEvent::PlayerDied { entity_id: p }]);
    }

    #[test]
    fn test_delta_for_removed_entity_is_dropped() {
        let (mut world, mut bus, config) = setup();
        let m = world.spawn_monster(Vec2::ZERO, MonsterData::new("bat", 0, 1, 1), 10);
        world.despawn(m);
        world.health_updates.push(HealthDelta { entity_id: m, amount: -1 });
        assert_eq!(apply_health_updates(&mut world, &mut bus, &config), 0);
    }
}
