//! Fog of war: permanent discovery and the per-tick render zone
//!
//! Discovery adds tiles to the current level's [`Exploration`] and never
//! removes them. The render zone is the player's transient visible set and is
//! cleared and refilled whenever the passes run.

use ahash::AHashSet;

use crate::core::config::SimulationConfig;
use crate::core::error::{CoreError, Result};
use crate::core::types::{EntityId, TilePos};
use crate::ecs::components::{Exploration, LightSource, Position, RenderState, Tile, TileKind};
use crate::ecs::world::World;
use crate::events::{EventBus, GameEvent};

use super::line_of_sight::has_line_of_sight;

/// Outcome of one visibility update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityReport {
    pub newly_discovered: usize,
    pub total_discovered: usize,
    pub render_zone: usize,
}

/// Kind of map tile at a position; a wall wins over a floor on the same tile
pub fn classify_tile(world: &World, tile: TilePos) -> Option<TileKind> {
    let mut kind = None;
    for &occupant in world.spatial.occupants(tile) {
        match world.get::<Tile>(occupant) {
            Some(Tile(TileKind::Wall)) => return Some(TileKind::Wall),
            Some(Tile(TileKind::Floor)) => kind = Some(TileKind::Floor),
            None => {}
        }
    }
    kind
}

pub fn is_wall(world: &World, tile: TilePos) -> bool {
    classify_tile(world, tile) == Some(TileKind::Wall)
}

/// Tiles within Euclidean `radius` of `center`
pub fn tiles_within(center: TilePos, radius: u32) -> impl Iterator<Item = TilePos> {
    let r = radius as i32;
    let limit = radius as f32;
    (-r..=r)
        .flat_map(move |dy| (-r..=r).map(move |dx| TilePos::new(center.x + dx, center.y + dy)))
        .filter(move |tile| tile.distance(&center) <= limit)
}

/// Exploration radius in tiles for the player
pub fn exploration_radius(world: &World, player: EntityId, config: &SimulationConfig) -> u32 {
    world
        .get::<LightSource>(player)
        .map(|light| light.radius)
        .unwrap_or(config.default_light_radius)
}

/// Discovery pass. Returns (newly discovered, running total).
pub fn discover_tiles(world: &mut World, level: EntityId, center: TilePos, radius: u32) -> Result<(usize, usize)> {
    let found: Vec<(TilePos, TileKind)> = {
        let exploration = world
            .get::<Exploration>(level)
            .ok_or_else(|| CoreError::missing::<Exploration>(level))?;
        tiles_within(center, radius)
            .filter(|tile| !exploration.is_discovered(tile))
            .filter_map(|tile| classify_tile(world, tile).map(|kind| (tile, kind)))
            .collect()
    };

    let exploration = world
        .get_mut::<Exploration>(level)
        .ok_or_else(|| CoreError::missing::<Exploration>(level))?;
    for (tile, kind) in &found {
        match kind {
            TileKind::Wall => exploration.discovered_walls.insert(*tile),
            TileKind::Floor => exploration.discovered_floors.insert(*tile),
        };
    }
    Ok((found.len(), exploration.total()))
}

/// Render-zone pass: every tile in `radius` with an unobstructed line
pub fn visible_tiles(world: &World, center: TilePos, radius: u32) -> AHashSet<TilePos> {
    tiles_within(center, radius)
        .filter(|&tile| has_line_of_sight(center, tile, |t| is_wall(world, t)))
        .collect()
}

/// Run both passes if the player changed tile or a refresh was requested
///
/// Returns `Ok(None)` when nothing needed recomputing.
pub fn update_visibility(
    world: &mut World,
    bus: &mut EventBus,
    config: &SimulationConfig,
) -> Result<Option<VisibilityReport>> {
    let player = world.player().ok_or(CoreError::NoPlayer)?;
    let center = world.tile_of(player).ok_or_else(|| CoreError::missing::<Position>(player))?;
    if !world.visibility.needs_update(center) {
        return Ok(None);
    }

    let light_radius = exploration_radius(world, player, config);
    let render_radius = light_radius + config.render_radius_modifier;
    let mut report = VisibilityReport::default();

    match world.current_level {
        Some(level) => match discover_tiles(world, level, center, light_radius) {
            Ok((count, total)) => {
                report.newly_discovered = count;
                report.total_discovered = total;
            }
            Err(err) => tracing::warn!("Discovery skipped for level {}: {}", level, err),
        },
        None => tracing::debug!("No current level; discovery skipped"),
    }

    let zone = visible_tiles(world, center, render_radius);
    report.render_zone = zone.len();
    match world.get_mut::<RenderState>(player) {
        Some(state) => {
            state.render_radius = render_radius;
            state.active_render_zone.clear();
            state.active_render_zone.extend(zone);
        }
        None => {
            world.insert(player, RenderState { render_radius, active_render_zone: zone });
        }
    }

    world.visibility.mark_updated(center);
    tracing::trace!(
        "Visibility at {}: {} new, {} visible",
        center,
        report.newly_discovered,
        report.render_zone
    );

    if report.newly_discovered > 0 {
        bus.publish(
            world,
            GameEvent::TilesDiscovered { count: report.newly_discovered, total: report.total_discovered },
        )?;
    }
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec2;

    const TILE: f32 = 32.0;

    fn room(world: &mut World, size: i32) {
        for x in 0..size {
            for y in 0..size {
                let edge = x == 0 || y == 0 || x == size - 1 || y == size - 1;
                world.spawn_tile(TilePos::new(x, y), if edge { TileKind::Wall } else { TileKind::Floor });
            }
        }
    }

    fn setup() -> (World, EventBus, SimulationConfig) {
        let config = SimulationConfig::default();
        let mut world = World::with_seed(&config, 3);
        room(&mut world, 20);
        world.spawn_level(1);
        (world, EventBus::recording(), config)
    }

    #[test]
    fn test_tiles_within_is_a_disc() {
        let tiles: Vec<_> = tiles_within(TilePos::new(0, 0), 1).collect();
        assert_eq!(tiles.len(), 5);
        assert!(!tiles.contains(&TilePos::new(1, 1)));
    }

    #[test]
    fn test_wall_beats_floor() {
        let (mut world, _, _) = setup();
        world.spawn_tile(TilePos::new(5, 5), TileKind::Wall);
        assert_eq!(classify_tile(&world, TilePos::new(5, 5)), Some(TileKind::Wall));
        assert_eq!(classify_tile(&world, TilePos::new(6, 5)), Some(TileKind::Floor));
        assert_eq!(classify_tile(&world, TilePos::new(50, 50)), None);
    }

    #[test]
    fn test_discovery_counts_only_new_tiles() {
        let (mut world, mut bus, config) = setup();
        let player = world.spawn_player(TilePos::new(10, 10).to_pixel(TILE));

        let first = update_visibility(&mut world, &mut bus, &config).unwrap().unwrap();
        assert!(first.newly_discovered > 0);
        assert_eq!(first.newly_discovered, first.total_discovered);

        // same tile, no refresh: skipped
        assert_eq!(update_visibility(&mut world, &mut bus, &config).unwrap(), None);

        world.insert(player, Position(TilePos::new(11, 10).to_pixel(TILE)));
        let second = update_visibility(&mut world, &mut bus, &config).unwrap().unwrap();
        assert!(second.newly_discovered > 0);
        assert_eq!(second.total_discovered, first.total_discovered + second.newly_discovered);

        let events: Vec<_> = bus
            .journal()
            .iter()
            .filter(|e| matches!(e, GameEvent::TilesDiscovered { .. }))
            .collect();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_forced_refresh_rebuilds_zone() {
        let (mut world, mut bus, config) = setup();
        let player = world.spawn_player(TilePos::new(10, 10).to_pixel(TILE));
        update_visibility(&mut world, &mut bus, &config).unwrap();

        world.insert(player, LightSource { radius: 1 });
        world.visibility.request_refresh();
        let report = update_visibility(&mut world, &mut bus, &config).unwrap().unwrap();
        assert_eq!(report.newly_discovered, 0);

        let state = world.get::<RenderState>(player).unwrap();
        assert_eq!(state.render_radius, 1 + config.render_radius_modifier);
        assert_eq!(state.active_render_zone.len(), report.render_zone);
    }

    #[test]
    fn test_wall_rendered_but_hides_tile_behind() {
        let (mut world, mut bus, config) = setup();
        world.spawn_tile(TilePos::new(12, 10), TileKind::Wall);
        let player = world.spawn_player(TilePos::new(10, 10).to_pixel(TILE));

        update_visibility(&mut world, &mut bus, &config).unwrap();
        let zone = &world.get::<RenderState>(player).unwrap().active_render_zone;
        assert!(zone.contains(&TilePos::new(11, 10)));
        assert!(zone.contains(&TilePos::new(12, 10)));
        assert!(!zone.contains(&TilePos::new(13, 10)));
    }

    #[test]
    fn test_no_player_is_an_error() {
        let (mut world, mut bus, config) = setup();
        assert!(matches!(update_visibility(&mut world, &mut bus, &config), Err(CoreError::NoPlayer)));
    }

    #[test]
    fn test_discovery_without_level_still_renders() {
        let config = SimulationConfig::default();
        let mut world = World::with_seed(&config, 3);
        let mut bus = EventBus::recording();
        let player = world.spawn_player(Vec2::new(64.0, 64.0));
        let report = update_visibility(&mut world, &mut bus, &config).unwrap().unwrap();
        assert_eq!(report.newly_discovered, 0);
        assert!(world.get::<RenderState>(player).unwrap().active_render_zone.contains(&TilePos::new(2, 2)));
    }

    #[test]
    fn test_level_without_exploration_still_renders() {
        let (mut world, mut bus, config) = setup();
        let level = world.current_level.unwrap();
        world.remove::<Exploration>(level);
        let player = world.spawn_player(TilePos::new(10, 10).to_pixel(TILE));

        let report = update_visibility(&mut world, &mut bus, &config).unwrap().unwrap();
        assert_eq!(report.newly_discovered, 0);
        assert!(report.render_zone > 0);
        assert!(world.get::<RenderState>(player).unwrap().active_render_zone.contains(&TilePos::new(10, 10)));

        // marked updated, so an idle player is not retried every tick
        assert_eq!(update_visibility(&mut world, &mut bus, &config).unwrap(), None);
    }
}
