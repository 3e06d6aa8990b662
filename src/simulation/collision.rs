//! Collision detection - fills `Collision` for entities that want to move
//!
//! Runs before movement resolution. Contacts are hitboxes that overlap or
//! share an edge at current positions; touching only at a corner is not a
//! contact, otherwise an entity sliding past a wall's corner would stick.

use crate::core::config::SimulationConfig;
use crate::core::types::{EntityId, Vec2};
use crate::ecs::components::{Collision, CollisionContact, ComponentKind, Hitbox, Position};
use crate::ecs::world::World;
use crate::spatial::SpatialLayer;

/// Overlapping, or edge-adjacent with positive overlap on the other axis
pub fn in_contact(a: (f32, f32, f32, f32), b: (f32, f32, f32, f32)) -> bool {
    let overlap_x = a.2.min(b.2) - a.0.max(b.0);
    let overlap_y = a.3.min(b.3) - a.1.max(b.1);
    (overlap_x >= 0.0 && overlap_y > 0.0) || (overlap_x > 0.0 && overlap_y >= 0.0)
}

/// Rebuild every `Collision` record. Returns the number of contacts found.
pub fn detect_collisions(world: &mut World, config: &SimulationConfig) -> usize {
    // Records are ephemeral: last tick's contacts never survive
    for stale in world.ids::<Collision>() {
        world.remove::<Collision>(stale);
    }

    let movers = world.entities_with(&[
        ComponentKind::Position,
        ComponentKind::MovementIntent,
        ComponentKind::Hitbox,
    ]);

    let mut total = 0;
    for mover in movers {
        let contacts = contacts_for(world, config, mover);
        total += contacts.len();
        world.insert(mover, Collision { contacts });
    }
    total
}

fn contacts_for(world: &World, config: &SimulationConfig, mover: EntityId) -> Vec<CollisionContact> {
    let (Some(pos), Some(hitbox)) = (world.position(mover), world.get::<Hitbox>(mover)) else {
        return Vec::new();
    };
    let own = hitbox.bounds(pos);

    world
        .spatial
        .query(SpatialLayer::General, pos, config.collision_query_radius)
        .into_iter()
        .filter(|&other| other != mover)
        .filter(|&other| {
            let Some(other_pos) = world.get::<Position>(other).map(|p| p.0) else {
                return false;
            };
            world
                .get::<Hitbox>(other)
                .map(|hb| in_contact(own, hb.bounds(other_pos)))
                .unwrap_or(false)
        })
        .map(|target_id| CollisionContact { target_id })
        .collect()
}

/// Hitbox bounds of an entity, if it has both a position and a hitbox
pub fn bounds_of(world: &World, entity: EntityId) -> Option<(f32, f32, f32, f32)> {
    let pos: Vec2 = world.position(entity)?;
    world.get::<Hitbox>(entity).map(|hb| hb.bounds(pos))
}
