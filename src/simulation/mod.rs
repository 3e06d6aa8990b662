//! Per-frame simulation systems and the pipeline that orders them

pub mod collision;
pub mod combat_timer;
pub mod health;
pub mod monster_ai;
pub mod movement;
pub mod tick;

pub use collision::detect_collisions;
pub use combat_timer::update_combat_timers;
pub use health::apply_health_updates;
pub use monster_ai::update_monsters;
pub use movement::resolve_movement;
pub use tick::{Simulation, Stage, TickReport};
