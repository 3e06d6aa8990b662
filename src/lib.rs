//! Gloomcrawl - per-frame simulation core for a dungeon crawler
//!
//! Entities live in an ECS [`ecs::World`]; systems in [`simulation`] run in a
//! fixed order each tick and talk to each other through [`events::EventBus`].

pub mod combat;
pub mod core;
pub mod ecs;
pub mod events;
pub mod simulation;
pub mod spatial;
pub mod visibility;

pub use crate::core::config::SimulationConfig;
pub use crate::core::error::{CoreError, Result};
pub use crate::simulation::tick::{Simulation, TickReport};
