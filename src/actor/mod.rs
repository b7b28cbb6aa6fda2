//! Actors - health, AI state machine, statuses and cooldowns

#[allow(clippy::module_inception)]
pub mod actor;
pub mod archetype;
pub mod state;

pub use actor::{ActiveCast, Actor, ActorContext, Aggression, DamageOutcome, Knockback, BASIC_ATTACK};
pub use archetype::{ActorArchetype, ArchetypeTable};
pub use state::{ActorIntent, ActorState, Faction};
