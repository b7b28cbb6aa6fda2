use thiserror::Error;

use crate::core::types::ActorId;

#[derive(Error, Debug)]
pub enum CombatError {
    #[error("Actor not found: {0:?}")]
    ActorNotFound(ActorId),

    #[error("Unknown ability: {0}")]
    UnknownAbility(String),

    #[error("Unknown archetype: {0}")]
    UnknownArchetype(String),

    #[error("Ability {ability} not ready for actor {actor:?}")]
    AbilityNotReady { actor: ActorId, ability: String },

    #[error("Ability {ability} out of range for actor {actor:?} ({distance:.1} > {range:.1})")]
    OutOfRange {
        actor: ActorId,
        ability: String,
        distance: f32,
        range: f32,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CombatError>;
