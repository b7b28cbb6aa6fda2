//! Ashfall - real-time combat core
//!
//! Hostile actor AI, timed skill casts and status effects, driven one tick
//! at a time by [`simulation::CombatWorld`]. Rendering, input, audio and
//! save formats sit behind the traits in [`collab`].

pub mod abilities;
pub mod actor;
pub mod collab;
pub mod core;
pub mod schedule;
pub mod simulation;
pub mod skills;
pub mod spatial;
pub mod status;

pub use crate::core::config::CombatConfig;
pub use crate::core::error::{CombatError, Result};
pub use crate::simulation::CombatWorld;
