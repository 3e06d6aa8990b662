//! Event handlers that connect attacks, damage, and combat state
//!
//! Each returns a closure ready for [`EventBus::subscribe`]; configuration is
//! captured by value so handlers own everything they read.

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::Millis;
use crate::ecs::components::{InCombat, MonsterData};
use crate::ecs::world::World;
use crate::events::{EventBus, EventKind, GameEvent};

use super::damage::resolve_damage_request;

/// `MonsterAttack` / `MonsterRangedAttack` -> `CalculateDamage` against the player
pub fn route_monster_attack(world: &mut World, event: &GameEvent, out: &mut Vec<GameEvent>) -> Result<()> {
    let attacker = match event {
        GameEvent::MonsterAttack { entity_id } => *entity_id,
        GameEvent::MonsterRangedAttack { entity_id, .. } => *entity_id,
        _ => return Ok(()),
    };
    let Some(player) = world.player() else {
        tracing::debug!("Attack from {} has no player to land on", attacker);
        return Ok(());
    };
    out.push(GameEvent::CalculateDamage { attacker, target: player, weapon: None });
    Ok(())
}

pub fn damage_handler(
    config: SimulationConfig,
) -> impl FnMut(&mut World, &GameEvent, &mut Vec<GameEvent>) -> Result<()> {
    move |world, event, out| match event {
        GameEvent::CalculateDamage { attacker, target, weapon } => {
            resolve_damage_request(world, &config, *attacker, *target, *weapon, out)
        }
        _ => Ok(()),
    }
}

/// A struck monster engages immediately, whatever its distance to the player
pub fn monster_hit_handler(
    in_combat_ms: Millis,
) -> impl FnMut(&mut World, &GameEvent, &mut Vec<GameEvent>) -> Result<()> {
    move |world, event, _| {
        if let GameEvent::MonsterWasHit { entity_id, .. } = event {
            if let Some(monster) = world.get_mut::<MonsterData>(*entity_id) {
                monster.is_aggro = true;
                monster.is_detected = true;
            }
            world.insert(*entity_id, InCombat::fresh(in_combat_ms));
        }
        Ok(())
    }
}

pub fn player_hit_handler(
    in_combat_ms: Millis,
) -> impl FnMut(&mut World, &GameEvent, &mut Vec<GameEvent>) -> Result<()> {
    move |world, event, _| {
        if let GameEvent::PlayerWasHit { entity_id, .. } = event {
            world.insert(*entity_id, InCombat::fresh(in_combat_ms));
        }
        Ok(())
    }
}

/// Subscribe every combat reaction
pub fn install(bus: &mut EventBus, config: &SimulationConfig) {
    bus.subscribe(EventKind::MonsterAttack, route_monster_attack);
    bus.subscribe(EventKind::MonsterRangedAttack, route_monster_attack);
    bus.subscribe(EventKind::CalculateDamage, damage_handler(config.clone()));
    bus.subscribe(EventKind::MonsterWasHit, monster_hit_handler(config.in_combat_duration_ms));
    bus.subscribe(EventKind::PlayerWasHit, player_hit_handler(config.in_combat_duration_ms));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec2;
    use crate::ecs::components::{Weapon, WeaponKind};

    fn setup() -> (World, EventBus, SimulationConfig) {
        let config = SimulationConfig::default();
        let world = World::with_seed(&config, 21);
        let mut bus = EventBus::recording();
        install(&mut bus, &config);
        (world, bus, config)
    }

    #[test]
    fn test_melee_attack_chain_reaches_player() {
        let (mut world, mut bus, _) = setup();
        let player = world.spawn_player(Vec2::ZERO);
        let monster = world.spawn_monster(Vec2::new(32.0, 0.0), MonsterData::new("rat", 0, 2, 2), 5);

        bus.publish(&mut world, GameEvent::MonsterAttack { entity_id: monster }).unwrap();

        assert_eq!(world.health_updates.len(), 1);
        assert!(world.has::<InCombat>(player));
        let kinds: Vec<EventKind> = bus.journal().iter().map(GameEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::MonsterAttack,
                EventKind::CalculateDamage,
                EventKind::LogMessage,
                EventKind::PlayerWasHit,
            ]
        );
    }

    #[test]
    fn test_player_hit_latches_monster_aggro() {
        let (mut world, mut bus, _) = setup();
        let player = world.spawn_player(Vec2::ZERO);
        let weapon = world.spawn();
        world.insert(weapon, Weapon { kind: WeaponKind::Melee, min_damage: Some(3), max_damage: Some(5) });
        // far outside any trigger range
        let monster = world.spawn_monster(Vec2::new(2000.0, 0.0), MonsterData::new("imp", 1, 1, 2), 20);

        bus.publish(
            &mut world,
            GameEvent::CalculateDamage { attacker: player, target: monster, weapon: Some(weapon) },
        )
        .unwrap();

        let data = world.get::<MonsterData>(monster).unwrap();
        assert!(data.is_aggro);
        assert!(world.has::<InCombat>(monster));
        let delta = world.health_updates.iter().next().unwrap();
        assert!((-5..=-3).contains(&delta.amount));
    }

    #[test]
    fn test_ranged_attack_routes_like_melee() {
        let (mut world, mut bus, _) = setup();
        world.spawn_player(Vec2::ZERO);
        let archer = world.spawn_monster(Vec2::new(96.0, 0.0), MonsterData::new("archer", 0, 1, 1), 5);
        bus.publish(
            &mut world,
            GameEvent::MonsterRangedAttack { entity_id: archer, direction: Vec2::new(-1.0, 0.0) },
        )
        .unwrap();
        assert_eq!(world.health_updates.len(), 1);
    }
}
