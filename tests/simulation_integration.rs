//! End-to-end scenarios for the tick pipeline

use gloomcrawl::core::constants::WANDER_STALL_TICKS;
use gloomcrawl::core::types::{EntityId, TilePos, Vec2};
use gloomcrawl::ecs::components::{
    Dead, DeathState, Exploration, InCombat, MonsterBehavior, MonsterData, MovementIntent, MovementSpeed,
    Position, RenderState, TileKind,
};
use gloomcrawl::events::{EventKind, GameEvent};
use gloomcrawl::simulation::monster_ai::update_monsters;
use gloomcrawl::spatial::SpatialLayer;
use gloomcrawl::{Simulation, SimulationConfig};

const TILE: f32 = 32.0;

fn px(x: i32, y: i32) -> Vec2 {
    TilePos::new(x, y).to_pixel(TILE)
}

fn sim() -> Simulation {
    Simulation::recording(SimulationConfig::default(), 1234).unwrap()
}

fn floor(sim: &mut Simulation, size: i32) {
    for x in 0..size {
        for y in 0..size {
            sim.world.spawn_tile(TilePos::new(x, y), TileKind::Floor);
        }
    }
    sim.world.spawn_level(1);
}

fn monster(sim: &mut Simulation, x: i32, y: i32) -> EntityId {
    sim.world.spawn_monster(px(x, y), MonsterData::new("cultist", 1, 1, 2), 25)
}

#[test]
fn test_monster_two_tiles_away_aggroes_and_targets_player() {
    let mut sim = sim();
    let player = sim.world.spawn_player(px(10, 10));
    let m = monster(&mut sim, 12, 10);

    // controller only, so the intent is still there to inspect
    update_monsters(&mut sim.world, &mut sim.bus, &sim.config, 0.016);

    assert!(sim.world.get::<MonsterData>(m).unwrap().is_aggro);
    let intent = sim.world.get::<MovementIntent>(m).copied();
    assert_eq!(intent, Some(MovementIntent::toward(sim.world.position(player).unwrap())));
}

#[test]
fn test_contagion_reaches_monster_beyond_aggro_range() {
    let mut sim = sim();
    sim.world.spawn_player(px(10, 10));
    let a = monster(&mut sim, 13, 10);
    // 3 tiles from A, 6 from the player
    let b = monster(&mut sim, 16, 10);

    update_monsters(&mut sim.world, &mut sim.bus, &sim.config, 0.016);

    assert!(sim.world.get::<MonsterData>(a).unwrap().is_aggro);
    assert!(sim.world.get::<MonsterData>(b).unwrap().is_aggro);
}

#[test]
fn test_aggro_holds_between_one_and_two_ranges() {
    let mut sim = sim();
    sim.world.spawn_player(px(10, 10));
    let m = monster(&mut sim, 17, 10);
    sim.world.get_mut::<MonsterData>(m).unwrap().is_aggro = true;

    // 7 tiles: beyond aggro range, within twice of it
    update_monsters(&mut sim.world, &mut sim.bus, &sim.config, 0.016);
    assert!(sim.world.get::<MonsterData>(m).unwrap().is_aggro);

    // 9 tiles, but still in combat
    sim.world.insert(m, Position(px(19, 10)));
    sim.world.insert(m, InCombat::fresh(5000.0));
    update_monsters(&mut sim.world, &mut sim.bus, &sim.config, 0.016);
    assert!(sim.world.get::<MonsterData>(m).unwrap().is_aggro);

    sim.world.remove::<InCombat>(m);
    update_monsters(&mut sim.world, &mut sim.bus, &sim.config, 0.016);
    let data = sim.world.get::<MonsterData>(m).unwrap();
    assert!(!data.is_aggro);
    assert_eq!(data.behavior, MonsterBehavior::Idle);
}

#[test]
fn test_dead_monster_removed_by_grace_deadline_without_processing() {
    let mut sim = sim();
    sim.world.spawn_player(px(2, 2));
    let m = monster(&mut sim, 20, 20);
    sim.world.insert(m, Dead { state: DeathState::New, expires_at: 300.0 });

    let mut removed_at = None;
    for _ in 0..20 {
        // 62.5 ms, exact in binary
        let report = sim.tick(0.0625);
        if report.removed.contains(&m) {
            removed_at = Some(report.now_ms);
            break;
        }
    }
    let removed_at = removed_at.expect("monster removed");
    assert_eq!(removed_at, 300.0 + 200.0);
    assert!(!sim.world.is_alive(m));
    assert!(sim.world.spatial.query(SpatialLayer::Monster, px(20, 20), 64.0).is_empty());
}

#[test]
fn test_processed_monster_removed_before_deadline() {
    let mut sim = sim();
    let m = monster(&mut sim, 3, 3);
    sim.world.insert(m, Dead { state: DeathState::Processed, expires_at: 60_000.0 });
    let report = sim.tick(0.016);
    assert_eq!(report.removed, vec![m]);
}

#[test]
fn test_wall_visible_and_tile_behind_hidden() {
    let mut sim = sim();
    floor(&mut sim, 20);
    sim.world.spawn_tile(TilePos::new(12, 10), TileKind::Wall);
    let player = sim.world.spawn_player(px(10, 10));

    sim.tick(0.016);

    let zone = &sim.world.get::<RenderState>(player).unwrap().active_render_zone;
    assert!(zone.contains(&TilePos::new(12, 10)));
    assert!(!zone.contains(&TilePos::new(13, 10)));
    assert!(zone.contains(&TilePos::new(10, 13)));
}

#[test]
fn test_exploration_grows_and_never_shrinks() {
    let mut sim = sim();
    floor(&mut sim, 30);
    let player = sim.world.spawn_player(px(5, 5));
    let level = sim.world.current_level.unwrap();

    sim.tick(0.016);
    let first = sim.world.get::<Exploration>(level).unwrap().total();
    assert!(first > 0);

    let mut last = first;
    for step in 1..10 {
        sim.world.insert(player, MovementIntent::toward(px(5 + step, 5)));
        sim.tick(0.016);
        let total = sim.world.get::<Exploration>(level).unwrap().total();
        assert!(total >= last);
        last = total;
    }
    assert!(last > first);

    let discovered: Vec<_> = sim
        .bus
        .journal()
        .iter()
        .filter_map(|e| match e {
            GameEvent::TilesDiscovered { total, .. } => Some(*total),
            _ => None,
        })
        .collect();
    assert_eq!(discovered.last(), Some(&last));
}

#[test]
fn test_idle_player_skips_visibility() {
    let mut sim = sim();
    floor(&mut sim, 10);
    sim.world.spawn_player(px(4, 4));
    assert!(sim.tick(0.016).render_zone.is_some());
    for _ in 0..5 {
        assert!(sim.tick(0.016).render_zone.is_none());
    }
}

#[test]
fn test_pursuit_stops_at_wall() {
    let mut sim = sim();
    floor(&mut sim, 20);
    let player = sim.world.spawn_player(px(10, 10));
    let wall = sim.world.spawn_tile(TilePos::new(11, 10), TileKind::Wall);
    let m = monster(&mut sim, 12, 10);
    sim.world.insert(m, MovementSpeed { pixels_per_second: 64.0 });
    let start = sim.world.position(m).unwrap();

    sim.tick(0.016);

    // head-on into the wall: both monster and wall stay put
    assert_eq!(sim.world.position(m), Some(start));
    assert!(sim.world.is_alive(wall));
    assert!(sim.world.is_alive(player));
    assert!(sim.bus.journal().iter().all(|e| e.kind() != EventKind::PositionChanged));
}

#[test]
fn test_wander_blocked_by_wall_returns_to_idle() {
    let mut config = SimulationConfig::default();
    config.wander_enabled = true;
    config.wander_chance = 0.0;
    let mut sim = Simulation::recording(config, 77).unwrap();
    floor(&mut sim, 20);
    sim.world.spawn_tile(TilePos::new(11, 10), TileKind::Wall);
    let m = monster(&mut sim, 12, 10);
    sim.world.insert(m, MovementSpeed { pixels_per_second: 64.0 });
    sim.world.get_mut::<MonsterData>(m).unwrap().behavior = MonsterBehavior::wander(TilePos::new(9, 10), 1);
    let start = sim.world.position(m).unwrap();

    for _ in 0..WANDER_STALL_TICKS + 5 {
        sim.tick(0.016);
    }

    assert_eq!(sim.world.position(m), Some(start));
    assert_eq!(sim.world.get::<MonsterData>(m).unwrap().behavior, MonsterBehavior::Idle);
}

#[test]
fn test_many_monsters_run_without_panicking() {
    let mut sim = sim();
    floor(&mut sim, 40);
    sim.world.spawn_player(px(20, 20));
    for i in 0..60 {
        monster(&mut sim, 1 + (i * 7) % 38, 1 + (i * 11) % 38);
    }
    for _ in 0..120 {
        sim.tick(1.0 / 60.0);
    }
    assert_eq!(sim.world.current_tick, 120);
}
