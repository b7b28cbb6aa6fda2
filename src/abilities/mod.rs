//! Ability definitions and per-actor cooldowns

pub mod catalog;
pub mod cooldown;

pub use catalog::{AbilityCatalog, AbilityDef};
pub use cooldown::{Cooldown, CooldownScheduler};
