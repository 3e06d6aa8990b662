//! Movement resolution - turns intents and contacts into committed positions
//!
//! Each axis is tested separately against every contact. A blocked axis is
//! dropped and the other one is kept, so entities slide along walls instead
//! of stopping dead on a near-diagonal approach.

use crate::core::types::{EntityId, Vec2};
use crate::ecs::components::{
    Collision, ComponentKind, LastPosition, MovementIntent, MovementSpeed, NeedsRender, Position,
    Projectile,
};
use crate::ecs::world::World;
use crate::events::{EventBus, GameEvent};

/// Which axes a proposed step would push into a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisBlock {
    pub x: bool,
    pub y: bool,
}

/// An axis blocks when stepping along it shrinks the separation to any contact
pub fn axis_blocks(pos: Vec2, step: Vec2, contacts: &[Vec2]) -> AxisBlock {
    let mut block = AxisBlock::default();
    for target in contacts {
        if (target.x - (pos.x + step.x)).abs() < (target.x - pos.x).abs() {
            block.x = true;
        }
        if (target.y - (pos.y + step.y)).abs() < (target.y - pos.y).abs() {
            block.y = true;
        }
    }
    block
}

/// Step actually taken after dropping blocked axes
pub fn resolve_step(pos: Vec2, step: Vec2, contacts: &[Vec2]) -> Vec2 {
    if contacts.is_empty() {
        return step;
    }
    match axis_blocks(pos, step, contacts) {
        AxisBlock { x: true, y: true } => Vec2::ZERO,
        AxisBlock { x: true, y: false } => Vec2::new(0.0, step.y),
        AxisBlock { x: false, y: true } => Vec2::new(step.x, 0.0),
        AxisBlock { x: false, y: false } => step,
    }
}

/// Round one axis of a step to whole pixels without stalling
///
/// A sub-pixel step still advances one pixel when at least one pixel of
/// distance remains on that axis.
fn snap_axis(step: f32, remaining: f32) -> f32 {
    if step == 0.0 {
        return 0.0;
    }
    let rounded = step.round();
    if rounded == 0.0 && remaining.abs() >= 1.0 {
        step.signum()
    } else {
        rounded
    }
}

/// Raw step toward the intent, capped by speed when the entity has one
pub fn intended_step(pos: Vec2, target: Vec2, speed: Option<f32>, delta_seconds: f32) -> Vec2 {
    let full = target - pos;
    let step = match speed {
        Some(pixels_per_second) => {
            let max = pixels_per_second * delta_seconds;
            let len = full.length();
            if len > max && len > 0.0 {
                full * (max / len)
            } else {
                full
            }
        }
        None => full,
    };
    Vec2::new(snap_axis(step.x, full.x), snap_axis(step.y, full.y))
}

/// Consume every `MovementIntent`. Returns the number of entities that moved.
pub fn resolve_movement(world: &mut World, bus: &mut EventBus, delta_seconds: f32) -> usize {
    let movers = world.entities_with(&[ComponentKind::Position, ComponentKind::MovementIntent]);
    let mut moved = 0;

    for entity in movers {
        // Consumed whether or not the move happens
        let Some(intent) = world.remove::<MovementIntent>(entity) else {
            continue;
        };
        let Some(pos) = world.position(entity) else {
            continue;
        };

        let speed = world.get::<MovementSpeed>(entity).map(|s| s.pixels_per_second);
        let step = intended_step(pos, intent.target, speed, delta_seconds);
        let contacts = contact_positions(world, entity);
        let taken = resolve_step(pos, step, &contacts);

        if taken == Vec2::ZERO {
            continue;
        }

        let next = pos + taken;
        world.insert(entity, LastPosition(pos));
        world.insert(entity, Position(next));
        if !world.has::<NeedsRender>(entity) {
            world.insert(entity, NeedsRender);
        }
        moved += 1;

        let event = GameEvent::PositionChanged { entity_id: entity, x: next.x, y: next.y };
        if let Err(err) = bus.publish(world, event) {
            tracing::error!("PositionChanged handler failed for {}: {}", entity, err);
        }
    }

    moved
}

/// Positions of solid contacts; clears an empty `Collision` record
fn contact_positions(world: &mut World, entity: EntityId) -> Vec<Vec2> {
    let Some(contacts) = world.get::<Collision>(entity).map(|c| c.contacts.clone()) else {
        return Vec::new();
    };
    if contacts.is_empty() {
        world.remove::<Collision>(entity);
        return Vec::new();
    }

    let is_projectile = world.has::<Projectile>(entity);
    let mut positions = Vec::with_capacity(contacts.len());
    for contact in &contacts {
        // Projectiles don't block anything but other projectiles
        if !is_projectile && world.has::<Projectile>(contact.target_id) {
            continue;
        }
        match world.position(contact.target_id) {
            Some(p) => positions.push(p),
            None => tracing::warn!(
                "Contact {} of {} has no position; skipping",
                contact.target_id,
                entity
            ),
        }
    }
    positions
}
