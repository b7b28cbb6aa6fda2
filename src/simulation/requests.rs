//! Damage and heal requests
//!
//! Nothing in the core writes health directly. Actors, effect instances and
//! status effects push requests; the world commits them through the
//! `DamageResolver` after each phase of a tick.

use crate::collab::DamageKind;
use crate::core::types::{ActorId, InstanceId};

/// Identifies one hit of one cast on one target
///
/// The world commits at most one request per key per tick, so two copies of
/// the same hit landing in the same frame count once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HitKey {
    pub instance: InstanceId,
    pub target: ActorId,
    pub pulse: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestKind {
    Damage { amount: f32, kind: DamageKind },
    Heal { amount: f32 },
}

/// A requested health change, not yet resolved
#[derive(Debug, Clone, PartialEq)]
pub struct CombatRequest {
    pub target: ActorId,
    pub source: Option<ActorId>,
    pub kind: RequestKind,
    pub hit_key: Option<HitKey>,
}

impl CombatRequest {
    pub fn damage(target: ActorId, amount: f32, kind: DamageKind, source: Option<ActorId>) -> Self {
        Self {
            target,
            source,
            kind: RequestKind::Damage { amount, kind },
            hit_key: None,
        }
    }

    pub fn heal(target: ActorId, amount: f32, source: Option<ActorId>) -> Self {
        Self {
            target,
            source,
            kind: RequestKind::Heal { amount },
            hit_key: None,
        }
    }

    pub fn with_hit_key(mut self, key: HitKey) -> Self {
        self.hit_key = Some(key);
        self
    }

    /// Requested amount regardless of kind
    pub fn amount(&self) -> f32 {
        match self.kind {
            RequestKind::Damage { amount, .. } | RequestKind::Heal { amount } => amount,
        }
    }
}
