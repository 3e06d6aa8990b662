//! Fog of war and line of sight around the player

pub mod exploration;
pub mod line_of_sight;

pub use exploration::{update_visibility, VisibilityReport};
pub use line_of_sight::{bresenham_line, has_line_of_sight};
