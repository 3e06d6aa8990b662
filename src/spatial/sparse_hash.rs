//! Sparse hash grid for proximity queries over live entity positions
//!
//! Entities are bucketed by `floor(pos / bucket_pixels)`. Monsters sit in
//! their own sub-index so aggro contagion never scans walls and floor tiles.
//! A per-tile occupancy map backs tile classification for visibility.

use ahash::{AHashMap, AHashSet};

use crate::core::config::SimulationConfig;
use crate::core::types::{EntityId, TilePos, Vec2};

pub type BucketKey = (i32, i32);

/// Which membership set a query scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialLayer {
    Monster,
    General,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    pos: Vec2,
    bucket: BucketKey,
    tile: TilePos,
    monster: bool,
}

/// Sparse hash grid with a monster sub-index
#[derive(Debug, Clone)]
pub struct SparseHashGrid {
    bucket_pixels: f32,
    tile_size: f32,
    general: AHashMap<BucketKey, AHashSet<EntityId>>,
    monsters: AHashMap<BucketKey, AHashSet<EntityId>>,
    tiles: AHashMap<TilePos, Vec<EntityId>>,
    entries: AHashMap<EntityId, Entry>,
}

impl SparseHashGrid {
    pub fn new(bucket_pixels: f32, tile_size: f32) -> Self {
        Self {
            bucket_pixels,
            tile_size,
            general: AHashMap::new(),
            monsters: AHashMap::new(),
            tiles: AHashMap::new(),
            entries: AHashMap::new(),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.bucket_pixels(), config.tile_size)
    }

    pub fn bucket_pixels(&self) -> f32 {
        self.bucket_pixels
    }

    #[inline]
    pub fn bucket_key(&self, pos: Vec2) -> BucketKey {
        (
            (pos.x / self.bucket_pixels).floor() as i32,
            (pos.y / self.bucket_pixels).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.general.clear();
        self.monsters.clear();
        self.tiles.clear();
        self.entries.clear();
    }

    /// Register an entity. Re-registering replaces the old entry.
    pub fn insert(&mut self, entity: EntityId, pos: Vec2, monster: bool) {
        self.remove(entity);
        let entry = Entry {
            pos,
            bucket: self.bucket_key(pos),
            tile: TilePos::from_pixel(pos, self.tile_size),
            monster,
        };
        self.link(entity, &entry);
        self.entries.insert(entity, entry);
    }

    /// Move a registered entity. Returns false if it was never registered.
    pub fn update(&mut self, entity: EntityId, pos: Vec2) -> bool {
        let Some(old) = self.entries.get(&entity).copied() else {
            return false;
        };
        let bucket = self.bucket_key(pos);
        let tile = TilePos::from_pixel(pos, self.tile_size);
        if bucket == old.bucket && tile == old.tile {
            if let Some(entry) = self.entries.get_mut(&entity) {
                entry.pos = pos;
            }
            return true;
        }

        self.unlink(entity, &old);
        let entry = Entry { pos, bucket, tile, monster: old.monster };
        self.link(entity, &entry);
        self.entries.insert(entity, entry);
        true
    }

    pub fn remove(&mut self, entity: EntityId) -> bool {
        match self.entries.remove(&entity) {
            Some(old) => {
                self.unlink(entity, &old);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entries.contains_key(&entity)
    }

    pub fn position_of(&self, entity: EntityId) -> Option<Vec2> {
        self.entries.get(&entity).map(|e| e.pos)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entities registered at a tile
    pub fn occupants(&self, tile: TilePos) -> &[EntityId] {
        self.tiles.get(&tile).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entities of `layer` within Euclidean `radius` of `center`
    ///
    /// The radius is rounded up to whole buckets before iterating, then every
    /// candidate is distance-filtered, so bucket granularity never hides a hit.
    pub fn query(&self, layer: SpatialLayer, center: Vec2, radius: f32) -> Vec<EntityId> {
        if radius < 0.0 {
            return Vec::new();
        }
        let buckets = match layer {
            SpatialLayer::Monster => &self.monsters,
            SpatialLayer::General => &self.general,
        };
        let reach = (radius / self.bucket_pixels).ceil() as i32;
        let (cx, cy) = self.bucket_key(center);

        let mut found = Vec::new();
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                let Some(members) = buckets.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &entity in members {
                    let within = self
                        .entries
                        .get(&entity)
                        .map(|e| center.distance(&e.pos) <= radius)
                        .unwrap_or(false);
                    if within {
                        found.push(entity);
                    }
                }
            }
        }
        found
    }

    /// Rebuild grid from positions
    pub fn rebuild(&mut self, entities: impl Iterator<Item = (EntityId, Vec2, bool)>) {
        self.clear();
        for (entity, pos, monster) in entities {
            self.insert(entity, pos, monster);
        }
    }

    fn link(&mut self, entity: EntityId, entry: &Entry) {
        self.general.entry(entry.bucket).or_default().insert(entity);
        if entry.monster {
            self.monsters.entry(entry.bucket).or_default().insert(entity);
        }
        self.tiles.entry(entry.tile).or_default().push(entity);
    }

    fn unlink(&mut self, entity: EntityId, entry: &Entry) {
        for buckets in [&mut self.general, &mut self.monsters] {
            if let Some(cell) = buckets.get_mut(&entry.bucket) {
                cell.remove(&entity);
                if cell.is_empty() {
                    buckets.remove(&entry.bucket);
                }
            }
        }
        if let Some(cell) = self.tiles.get_mut(&entry.tile) {
            cell.retain(|&e| e != entity);
            if cell.is_empty() {
                self.tiles.remove(&entry.tile);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SparseHashGrid {
        SparseHashGrid::new(512.0, 32.0)
    }

    #[test]
    fn test_bucket_key_floors_negative() {
        let g = grid();
        assert_eq!(g.bucket_key(Vec2::new(0.0, 511.0)), (0, 0));
        assert_eq!(g.bucket_key(Vec2::new(512.0, -1.0)), (1, -1));
    }

    #[test]
    fn test_query_across_bucket_boundary() {
        let mut g = grid();
        let near = EntityId::new();
        let far = EntityId::new();
        g.insert(near, Vec2::new(520.0, 10.0), true);
        g.insert(far, Vec2::new(1500.0, 10.0), true);

        let hits = g.query(SpatialLayer::Monster, Vec2::new(500.0, 10.0), 64.0);
        assert_eq!(hits, vec![near]);
    }

    #[test]
    fn test_radius_larger_than_bucket() {
        let mut g = grid();
        let e = EntityId::new();
        g.insert(e, Vec2::new(1100.0, 0.0), false);

        // 1100px away, more than two buckets
        let hits = g.query(SpatialLayer::General, Vec2::ZERO, 1100.0);
        assert_eq!(hits, vec![e]);
        assert!(g.query(SpatialLayer::General, Vec2::ZERO, 1099.0).is_empty());
    }

    #[test]
    fn test_monster_layer_excludes_general_entities() {
        let mut g = grid();
        let wall = EntityId::new();
        let monster = EntityId::new();
        g.insert(wall, Vec2::new(32.0, 0.0), false);
        g.insert(monster, Vec2::new(64.0, 0.0), true);

        assert_eq!(g.query(SpatialLayer::Monster, Vec2::ZERO, 100.0), vec![monster]);
        assert_eq!(g.query(SpatialLayer::General, Vec2::ZERO, 100.0).len(), 2);
    }

    #[test]
    fn test_update_moves_between_buckets_and_tiles() {
        let mut g = grid();
        let e = EntityId::new();
        g.insert(e, Vec2::new(10.0, 10.0), true);
        assert_eq!(g.occupants(TilePos::new(0, 0)), &[e]);

        assert!(g.update(e, Vec2::new(600.0, 10.0)));
        assert!(g.occupants(TilePos::new(0, 0)).is_empty());
        assert_eq!(g.occupants(TilePos::new(18, 0)), &[e]);
        assert!(g.query(SpatialLayer::Monster, Vec2::new(10.0, 10.0), 100.0).is_empty());
        assert_eq!(g.query(SpatialLayer::Monster, Vec2::new(600.0, 10.0), 1.0), vec![e]);
    }

    #[test]
    fn test_update_unknown_entity_is_noop() {
        let mut g = grid();
        assert!(!g.update(EntityId::new(), Vec2::ZERO));
        assert!(g.is_empty());
    }

    #[test]
    fn test_remove_clears_all_sets() {
        let mut g = grid();
        let e = EntityId::new();
        g.insert(e, Vec2::new(40.0, 40.0), true);
        assert!(g.remove(e));
        assert!(!g.remove(e));
        assert!(g.query(SpatialLayer::General, Vec2::new(40.0, 40.0), 10.0).is_empty());
        assert!(g.occupants(TilePos::new(1, 1)).is_empty());
    }
}
