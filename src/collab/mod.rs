//! Collaborator interfaces
//!
//! The combat core reads positions through `SpatialQuery`, asks a
//! `DamageResolver` how much damage or healing actually lands, grounds actors
//! through `Terrain`, and reports what happened to a `Notifier`. All of them
//! are injected into `CombatWorld::new`; nothing here is global.

pub mod persistence;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{ActorId, Vec3};
use crate::simulation::events::CombatEvent;

/// Damage school, used for resistances and variant overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageKind {
    #[default]
    Physical,
    Fire,
    Frost,
    Lightning,
    Poison,
    Shadow,
}

/// A located actor returned by spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorRef {
    pub id: ActorId,
    pub position: Vec3,
}

/// Read-only neighbor lookup
pub trait SpatialQuery {
    /// All actors whose planar distance to `position` is at most `radius`
    fn find_nearby(&self, position: Vec3, radius: f32) -> Vec<ActorRef>;
}

/// A spatial query that the world can refresh once per tick
pub trait SpatialIndex: SpatialQuery {
    fn sync(&mut self, actors: &[ActorRef]);
}

/// What a resolver is allowed to see about its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorView {
    pub id: ActorId,
    pub health: f32,
    pub max_health: f32,
    /// Product of the target's damage-taken modifiers
    pub damage_taken_multiplier: f32,
}

/// The only authority on how much health changes
///
/// Returns the amount actually applied. The core commits exactly that amount
/// and never assumes the request went through unmodified.
pub trait DamageResolver {
    fn request_damage(
        &mut self,
        target: &ActorView,
        amount: f32,
        kind: DamageKind,
        source: Option<ActorId>,
    ) -> f32;

    fn request_heal(&mut self, target: &ActorView, amount: f32, source: Option<ActorId>) -> f32;
}

/// Default resolver: per-school resistance, then clamp to what the target has
#[derive(Debug, Clone, Default)]
pub struct StandardResolver {
    /// Fraction of damage absorbed per school (0.0 = none, 1.0 = immune)
    pub resistances: AHashMap<DamageKind, f32>,
}

impl StandardResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resistance(mut self, kind: DamageKind, fraction: f32) -> Self {
        self.resistances.insert(kind, fraction.clamp(0.0, 1.0));
        self
    }
}

impl DamageResolver for StandardResolver {
    fn request_damage(
        &mut self,
        target: &ActorView,
        amount: f32,
        kind: DamageKind,
        _source: Option<ActorId>,
    ) -> f32 {
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let resistance = self.resistances.get(&kind).copied().unwrap_or(0.0);
        let mitigated = amount * (1.0 - resistance) * target.damage_taken_multiplier.max(0.0);
        mitigated.min(target.health.max(0.0))
    }

    fn request_heal(&mut self, target: &ActorView, amount: f32, _source: Option<ActorId>) -> f32 {
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        amount.min((target.max_health - target.health).max(0.0))
    }
}

/// Ground-height lookup, used only to keep actors on the terrain
pub trait Terrain {
    fn ground_height(&self, x: f32, z: f32) -> Option<f32>;
}

/// Terrain that is a flat plane at a fixed height
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTerrain {
    pub height: f32,
}

impl Terrain for FlatTerrain {
    fn ground_height(&self, _x: f32, _z: f32) -> Option<f32> {
        Some(self.height)
    }
}

/// Fire-and-forget sink for combat events (HUD, toasts, audio cues)
pub trait Notifier {
    fn notify(&mut self, event: &CombatEvent);
}

/// Notifier that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&mut self, _event: &CombatEvent) {}
}
