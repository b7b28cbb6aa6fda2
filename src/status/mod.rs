//! Status effects - timed modifiers, damage over time, heal over time
//!
//! Effects are declarative: `on_apply`, `on_tick` and `on_remove` are lists of
//! `EffectOp` records, never closures. Each actor owns one registry.

pub mod effect;
pub mod modifiers;
pub mod registry;

pub use effect::{ControlKind, EffectOp, StackPolicy, Stat, StatusEffect};
pub use modifiers::ModifierSet;
pub use registry::{AddOutcome, EffectHandle, RemovalReason, RemovedStatus, StatusEffectRegistry};
