//! Persistence records - data only, no behavior
//!
//! The save format itself belongs to the persistence collaborator; these
//! structs are what the core hands over and accepts back.

use serde::{Deserialize, Serialize};

/// Snapshot of one actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub position: [f32; 3],
    pub health: f32,
    pub status_effects: Vec<StatusRecord>,
    pub cooldowns: Vec<CooldownRecord>,
}

/// A status effect still running at snapshot time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: String,
    pub remaining: f32,
}

/// A cooldown at snapshot time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownRecord {
    pub ability: String,
    pub remaining: f32,
    pub total: f32,
}
