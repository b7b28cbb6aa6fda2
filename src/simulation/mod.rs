//! Per-tick combat driver, damage requests and events

pub mod events;
pub mod requests;
pub mod world;

pub use events::{CombatEvent, EventLog, LoggedEvent};
pub use requests::{CombatRequest, HitKey, RequestKind};
pub use world::{CombatWorld, RewardGrant, TeardownReport, BURST_PULSE};
