//! ECS World - manages all entities and their components

use ahash::AHashSet;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{EntityId, Millis, TilePos, Vec2};
use crate::ecs::components::*;
use crate::ecs::resources::{HealthUpdateQueue, VisibilityTracker};
use crate::spatial::sparse_hash::SparseHashGrid;

/// The game world containing all entities
pub struct World {
    pub current_tick: u64,
    /// Simulation clock in milliseconds
    pub now_ms: Millis,
    entities: AHashSet<EntityId>,
    components: Components,
    pending_removals: Vec<EntityId>,
    pub spatial: SparseHashGrid,
    pub health_updates: HealthUpdateQueue,
    pub visibility: VisibilityTracker,
    /// Level entity whose `Exploration` receives discoveries
    pub current_level: Option<EntityId>,
    pub rng: ChaCha8Rng,
    tile_size: f32,
}

impl World {
    /// Entropy-seeded world; damage rolls differ between runs
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_rng(config, ChaCha8Rng::from_entropy())
    }

    pub fn with_seed(config: &SimulationConfig, seed: u64) -> Self {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: &SimulationConfig, rng: ChaCha8Rng) -> Self {
        Self {
            current_tick: 0,
            now_ms: 0.0,
            entities: AHashSet::new(),
            components: Components::default(),
            pending_removals: Vec::new(),
            spatial: SparseHashGrid::from_config(config),
            health_updates: HealthUpdateQueue::new(),
            visibility: VisibilityTracker::default(),
            current_level: None,
            rng,
            tile_size: config.tile_size,
        }
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn spawn(&mut self) -> EntityId {
        let entity = EntityId::new();
        self.entities.insert(entity);
        entity
    }

    /// Register an externally chosen id. Returns false if it already exists.
    pub fn spawn_with_id(&mut self, entity: EntityId) -> bool {
        self.entities.insert(entity)
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.contains(&entity)
    }

    /// Remove an entity, its components, and its spatial entry
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        if !self.entities.remove(&entity) {
            return false;
        }
        self.components.remove_all(entity);
        self.spatial.remove(entity);
        if self.current_level == Some(entity) {
            self.current_level = None;
        }
        true
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn insert<T: Component>(&mut self, entity: EntityId, component: T) -> Option<T> {
        if !self.entities.contains(&entity) {
            tracing::warn!("Ignoring {:?} for unknown entity {}", T::KIND, entity);
            return None;
        }
        T::store_mut(&mut self.components).insert(entity, component)
    }

    #[inline]
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        T::store(&self.components).get(entity)
    }

    #[inline]
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        T::store_mut(&mut self.components).get_mut(entity)
    }

    #[inline]
    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        T::store(&self.components).contains(entity)
    }

    pub fn has_kind(&self, entity: EntityId, kind: ComponentKind) -> bool {
        self.components.contains_kind(entity, kind)
    }

    pub fn remove<T: Component>(&mut self, entity: EntityId) -> Option<T> {
        T::store_mut(&mut self.components).remove(entity)
    }

    /// All ids in one component store
    pub fn ids<T: Component>(&self) -> Vec<EntityId> {
        T::store(&self.components).ids().to_vec()
    }

    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        T::store(&self.components).iter()
    }

    /// Entities carrying every listed component kind
    pub fn entities_with(&self, kinds: &[ComponentKind]) -> Vec<EntityId> {
        // Drive the scan from the smallest store
        let Some(&driver) = kinds.iter().min_by_key(|&&k| self.components.len_of(k)) else {
            return self.entities.iter().copied().collect();
        };
        self.components
            .ids_of(driver)
            .iter()
            .copied()
            .filter(|&e| kinds.iter().all(|&k| self.components.contains_kind(e, k)))
            .collect()
    }

    /// The player entity, if one has been spawned
    pub fn player(&self) -> Option<EntityId> {
        self.components.ids_of(ComponentKind::Player).first().copied()
    }

    pub fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.get::<Position>(entity).map(|p| p.0)
    }

    pub fn tile_of(&self, entity: EntityId) -> Option<TilePos> {
        self.position(entity).map(|p| TilePos::from_pixel(p, self.tile_size))
    }

    /// Register (or re-register) an entity in the spatial index
    pub fn track_spatial(&mut self, entity: EntityId) -> bool {
        let Some(pos) = self.position(entity) else {
            return false;
        };
        let monster = self.has::<MonsterData>(entity);
        self.spatial.insert(entity, pos, monster);
        true
    }

    /// Queue an entity for the removal stage. Idempotent.
    pub fn schedule_removal(&mut self, entity: EntityId) {
        if !self.pending_removals.contains(&entity) {
            self.pending_removals.push(entity);
        }
    }

    pub fn is_removal_scheduled(&self, entity: EntityId) -> bool {
        self.pending_removals.contains(&entity)
    }

    /// Despawn everything queued by `schedule_removal`
    pub fn flush_removals(&mut self) -> Vec<EntityId> {
        let pending = std::mem::take(&mut self.pending_removals);
        pending.into_iter().filter(|&e| self.despawn(e)).collect()
    }

    pub fn advance_clock(&mut self, delta_ms: Millis) {
        self.current_tick += 1;
        self.now_ms += delta_ms;
    }

    // === Spawn helpers ===

    pub fn spawn_player(&mut self, pos: Vec2) -> EntityId {
        let entity = self.spawn();
        self.insert(entity, Player { level: 1 });
        self.insert(entity, Position(pos));
        self.insert(entity, LastPosition(pos));
        self.insert(entity, Hitbox::new(self.tile_size * 0.75, self.tile_size * 0.75));
        self.insert(entity, Health::new(100));
        self.insert(entity, Stats::default());
        self.insert(entity, RenderState::default());
        self.track_spatial(entity);
        self.visibility.request_refresh();
        entity
    }

    pub fn spawn_monster(&mut self, pos: Vec2, data: MonsterData, max_hp: i32) -> EntityId {
        let entity = self.spawn();
        self.insert(entity, data);
        self.insert(entity, Position(pos));
        self.insert(entity, LastPosition(pos));
        self.insert(entity, Hitbox::new(self.tile_size * 0.75, self.tile_size * 0.75));
        self.insert(entity, Health::new(max_hp));
        self.insert(entity, AttackSpeed::new(1000.0));
        self.insert(entity, Stats::default());
        self.track_spatial(entity);
        entity
    }

    pub fn spawn_tile(&mut self, tile: TilePos, kind: TileKind) -> EntityId {
        let entity = self.spawn();
        let pos = tile.to_pixel(self.tile_size);
        self.insert(entity, Tile(kind));
        self.insert(entity, Position(pos));
        if kind == TileKind::Wall {
            self.insert(entity, Hitbox::new(self.tile_size, self.tile_size));
        }
        self.track_spatial(entity);
        entity
    }

    /// Create a level entity and make it current
    pub fn spawn_level(&mut self, depth: u32) -> EntityId {
        let entity = self.spawn();
        self.insert(entity, DungeonLevel { depth });
        self.insert(entity, Exploration::default());
        self.current_level = Some(entity);
        self.visibility.request_refresh();
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::SpatialLayer;

    fn world() -> World {
        World::with_seed(&SimulationConfig::default(), 7)
    }

    #[test]
    fn test_insert_requires_live_entity() {
        let mut w = world();
        let ghost = EntityId::new();
        assert!(w.insert(ghost, Position(Vec2::ZERO)).is_none());
        assert!(!w.has::<Position>(ghost));
    }

    #[test]
    fn test_entities_with_filters_all_kinds() {
        let mut w = world();
        let a = w.spawn();
        let b = w.spawn();
        w.insert(a, Position(Vec2::ZERO));
        w.insert(a, MovementIntent::toward(Vec2::new(1.0, 0.0)));
        w.insert(b, Position(Vec2::ZERO));

        let found = w.entities_with(&[ComponentKind::Position, ComponentKind::MovementIntent]);
        assert_eq!(found, vec![a]);
    }

    #[test]
    fn test_despawn_clears_components_and_index() {
        let mut w = world();
        let m = w.spawn_monster(Vec2::new(64.0, 64.0), MonsterData::new("rat", 0, 1, 2), 10);
        assert!(w.spatial.contains(m));
        assert!(w.despawn(m));
        assert!(!w.has::<MonsterData>(m));
        assert!(!w.spatial.contains(m));
        assert!(!w.despawn(m));
    }

    #[test]
    fn test_flush_removals_once() {
        let mut w = world();
        let e = w.spawn();
        w.schedule_removal(e);
        w.schedule_removal(e);
        assert_eq!(w.flush_removals(), vec![e]);
        assert!(!w.is_alive(e));
        assert!(w.flush_removals().is_empty());
    }

    #[test]
    fn test_spawn_monster_joins_monster_layer() {
        let mut w = world();
        let m = w.spawn_monster(Vec2::new(32.0, 0.0), MonsterData::new("bat", 1, 1, 3), 8);
        let wall = w.spawn_tile(TilePos::new(2, 0), TileKind::Wall);
        let monsters = w.spatial.query(SpatialLayer::Monster, Vec2::ZERO, 100.0);
        assert_eq!(monsters, vec![m]);
        assert_eq!(w.spatial.occupants(TilePos::new(2, 0)), &[wall]);
    }

    #[test]
    fn test_player_lookup() {
        let mut w = world();
        assert!(w.player().is_none());
        let p = w.spawn_player(Vec2::new(320.0, 320.0));
        assert_eq!(w.player(), Some(p));
        assert_eq!(w.tile_of(p), Some(TilePos::new(10, 10)));
    }
}
