//! Actor states, factions and per-tick intents

use serde::{Deserialize, Serialize};

use crate::core::types::{AbilityId, ActorId, Vec3};

/// AI state. Exactly one at a time, so "moving while casting" cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorState {
    #[default]
    Idle,
    Moving,
    Attacking,
    Casting,
    KnockedBack,
    Dead,
}

impl ActorState {
    pub fn is_dead(&self) -> bool {
        matches!(self, ActorState::Dead)
    }

    /// States from which a fresh decision can be made
    pub fn can_decide(&self) -> bool {
        matches!(self, ActorState::Idle | ActorState::Moving | ActorState::Attacking)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Player,
    Ally,
    Hostile,
}

impl Faction {
    /// Player and allies fight hostiles; nobody fights their own side
    pub fn is_opposed(&self, other: Faction) -> bool {
        match self {
            Faction::Player | Faction::Ally => other == Faction::Hostile,
            Faction::Hostile => other != Faction::Hostile,
        }
    }
}

/// What an actor decided to do this tick
#[derive(Debug, Clone, PartialEq)]
pub enum ActorIntent {
    BasicAttack {
        target: ActorId,
        damage: f32,
    },
    /// The actor has entered `Casting`; the world spawns the instance
    Cast {
        ability: AbilityId,
        target: Option<ActorId>,
        aim: Vec3,
    },
}
