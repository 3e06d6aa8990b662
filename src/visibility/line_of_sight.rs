//! Integer line tracing between tiles

use crate::core::types::TilePos;

/// Tiles on the Bresenham line from `from` to `to`, both ends included
pub fn bresenham_line(from: TilePos, to: TilePos) -> Vec<TilePos> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };

    let mut line = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    let (mut x, mut y) = (from.x, from.y);
    let mut err = dx + dy;

    loop {
        line.push(TilePos::new(x, y));
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    line
}

/// True when no blocking tile lies strictly between the endpoints
///
/// The endpoints themselves never block, so a wall is visible but hides
/// whatever is behind it.
pub fn has_line_of_sight(from: TilePos, to: TilePos, blocks: impl Fn(TilePos) -> bool) -> bool {
    let line = bresenham_line(from, to);
    // Check all tiles except start and end
    line.iter()
        .skip(1)
        .take(line.len().saturating_sub(2))
        .all(|&tile| !blocks(tile))
}
