use thiserror::Error;

use crate::core::types::EntityId;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Entity {entity} is missing component {component}")]
    MissingComponent {
        entity: EntityId,
        component: &'static str,
    },

    #[error("Player attack request from {0} carries no weapon")]
    MissingWeapon(EntityId),

    #[error("Entity {0} is neither the player nor a monster and cannot attack")]
    InvalidAttacker(EntityId),

    #[error("No player entity in the world")]
    NoPlayer,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CoreError {
    pub fn missing<T>(entity: EntityId) -> Self {
        let full = std::any::type_name::<T>();
        let component = full.rsplit("::").next().unwrap_or(full);
        Self::MissingComponent { entity, component }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
