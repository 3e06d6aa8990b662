pub mod components;
pub mod resources;
pub mod storage;
pub mod world;

pub use components::{Component, ComponentKind};
pub use resources::{HealthDelta, HealthUpdateQueue, VisibilityTracker};
pub use storage::ComponentStore;
pub use world::World;
