//! Property tests: bucket queries agree with a brute-force scan

use gloomcrawl::core::types::{EntityId, Vec2};
use gloomcrawl::spatial::{SparseHashGrid, SpatialLayer};
use proptest::prelude::*;

fn point() -> impl Strategy<Value = (f32, f32)> {
    (-2000.0f32..2000.0, -2000.0f32..2000.0)
}

fn sorted(mut ids: Vec<EntityId>) -> Vec<EntityId> {
    ids.sort_by_key(|id| id.0);
    ids
}

proptest! {
    #[test]
    fn query_matches_brute_force(
        points in prop::collection::vec((point(), any::<bool>()), 0..120),
        center in point(),
        radius in 0.0f32..1500.0,
        bucket in prop::sample::select(vec![64.0f32, 256.0, 512.0]),
    ) {
        let mut grid = SparseHashGrid::new(bucket, 32.0);
        let entities: Vec<(EntityId, Vec2, bool)> = points
            .iter()
            .map(|&((x, y), monster)| (EntityId::new(), Vec2::new(x, y), monster))
            .collect();
        for &(id, pos, monster) in &entities {
            grid.insert(id, pos, monster);
        }
        let center = Vec2::new(center.0, center.1);

        let expected_general: Vec<EntityId> = entities
            .iter()
            .filter(|(_, pos, _)| center.distance(pos) <= radius)
            .map(|(id, _, _)| *id)
            .collect();
        let expected_monsters: Vec<EntityId> = entities
            .iter()
            .filter(|(_, pos, monster)| *monster && center.distance(pos) <= radius)
            .map(|(id, _, _)| *id)
            .collect();

        prop_assert_eq!(sorted(grid.query(SpatialLayer::General, center, radius)), sorted(expected_general));
        prop_assert_eq!(sorted(grid.query(SpatialLayer::Monster, center, radius)), sorted(expected_monsters));
    }

    #[test]
    fn update_keeps_query_consistent(
        start in point(),
        moves in prop::collection::vec(point(), 1..20),
    ) {
        let mut grid = SparseHashGrid::new(512.0, 32.0);
        let id = EntityId::new();
        grid.insert(id, Vec2::new(start.0, start.1), true);

        for (x, y) in moves {
            let pos = Vec2::new(x, y);
            prop_assert!(grid.update(id, pos));
            prop_assert_eq!(grid.query(SpatialLayer::Monster, pos, 0.5), vec![id]);
            prop_assert_eq!(grid.len(), 1);
        }
    }
}
