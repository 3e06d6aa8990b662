//! Combat timers - expire `InCombat` markers

use crate::core::types::Millis;
use crate::ecs::components::InCombat;
use crate::ecs::world::World;

/// Advance every `InCombat` marker and drop the expired ones.
/// Returns the number removed.
pub fn update_combat_timers(world: &mut World, delta_ms: Millis) -> usize {
    let mut expired = Vec::new();
    for entity in world.ids::<InCombat>() {
        if let Some(marker) = world.get_mut::<InCombat>(entity) {
            marker.elapsed += delta_ms;
            if marker.elapsed >= marker.duration {
                expired.push(entity);
            }
        }
    }
    for &entity in &expired {
        world.remove::<InCombat>(entity);
    }
    if !expired.is_empty() {
        tracing::debug!("{} entities left combat", expired.len());
    }
    expired.len()
}
