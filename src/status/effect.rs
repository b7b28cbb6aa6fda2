//! Status effect definitions
//!
//! A status effect is pure data: an id, timing, a stacking rule and three
//! lists of declarative `EffectOp` records. The registry interprets them.

use serde::{Deserialize, Serialize};

use crate::collab::DamageKind;
use crate::core::types::ActorId;

/// What happens when an effect with an existing id is added again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackPolicy {
    /// Keep one instance; remaining = max(existing, new)
    #[default]
    Refresh,
    /// Keep both as independent timers
    Stack,
    /// Drop the new one
    Ignore,
}

/// Stats a status effect can scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    MoveSpeed,
    AttackSpeed,
    DamageDealt,
    DamageTaken,
}

/// Crowd-control flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// No actions at all; interrupts casts
    Stun,
    /// No movement
    Root,
    /// No special abilities
    Silence,
}

/// One declarative behavior record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EffectOp {
    /// Multiply a stat by `1 + amount` (-0.5 = half speed). Apply-only; undone on removal.
    ModifyStat { stat: Stat, amount: f32 },
    /// Set a crowd-control flag. Apply-only; undone on removal.
    Control { kind: ControlKind },
    /// Instant damage, scaled by magnitude
    Damage {
        amount: f32,
        #[serde(default)]
        kind: DamageKind,
    },
    /// Instant heal, scaled by magnitude
    Heal { amount: f32 },
    /// Periodic damage; each tick delivers `per_second * elapsed`
    DamageOverTime {
        per_second: f32,
        #[serde(default)]
        kind: DamageKind,
    },
    /// Periodic heal; each tick delivers `per_second * elapsed`
    HealOverTime { per_second: f32 },
}

impl EffectOp {
    /// Ops that install something which removal must undo
    pub fn is_persistent(&self) -> bool {
        matches!(self, EffectOp::ModifyStat { .. } | EffectOp::Control { .. })
    }
}

/// A timed modifier, DoT or HoT attached to an actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub id: String,
    /// Scales every instant and periodic amount (chain falloff, variants)
    #[serde(default = "default_magnitude")]
    pub magnitude: f32,
    pub duration: f32,
    #[serde(skip)]
    pub remaining: f32,
    /// Seconds between periodic ticks; zero ticks every update
    #[serde(default = "default_tick_interval")]
    pub tick_interval: f32,
    #[serde(skip)]
    pub tick_accumulator: f32,
    #[serde(skip)]
    pub source: Option<ActorId>,
    #[serde(default)]
    pub stack_policy: StackPolicy,
    #[serde(default)]
    pub on_apply: Vec<EffectOp>,
    #[serde(default)]
    pub on_tick: Vec<EffectOp>,
    #[serde(default)]
    pub on_remove: Vec<EffectOp>,
    /// Set when added; the first registry tick only clears it
    #[serde(skip)]
    pub(crate) fresh: bool,
}

fn default_magnitude() -> f32 {
    1.0
}

fn default_tick_interval() -> f32 {
    1.0
}

impl StatusEffect {
    pub fn new(id: impl Into<String>, duration: f32) -> Self {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        Self {
            id: id.into(),
            magnitude: 1.0,
            duration,
            remaining: duration,
            tick_interval: 1.0,
            tick_accumulator: 0.0,
            source: None,
            stack_policy: StackPolicy::Refresh,
            on_apply: Vec::new(),
            on_tick: Vec::new(),
            on_remove: Vec::new(),
            fresh: false,
        }
    }

    /// Damage over time: `per_second` for `duration`, ticking every `interval`
    pub fn damage_over_time(
        id: impl Into<String>,
        per_second: f32,
        duration: f32,
        interval: f32,
        kind: DamageKind,
    ) -> Self {
        Self::new(id, duration)
            .with_interval(interval)
            .on_tick(EffectOp::DamageOverTime { per_second, kind })
    }

    /// Heal over time
    pub fn heal_over_time(id: impl Into<String>, per_second: f32, duration: f32, interval: f32) -> Self {
        Self::new(id, duration)
            .with_interval(interval)
            .on_tick(EffectOp::HealOverTime { per_second })
    }

    /// Movement slow; `fraction` of 0.3 removes 30% of move speed
    pub fn slow(id: impl Into<String>, fraction: f32, duration: f32) -> Self {
        Self::new(id, duration).on_apply(EffectOp::ModifyStat {
            stat: Stat::MoveSpeed,
            amount: -fraction.clamp(0.0, 1.0),
        })
    }

    /// Crowd control for `duration`
    pub fn control(id: impl Into<String>, kind: ControlKind, duration: f32) -> Self {
        Self::new(id, duration).on_apply(EffectOp::Control { kind })
    }

    pub fn with_interval(mut self, interval: f32) -> Self {
        self.tick_interval = if interval.is_finite() { interval.max(0.0) } else { 0.0 };
        self
    }

    pub fn with_policy(mut self, policy: StackPolicy) -> Self {
        self.stack_policy = policy;
        self
    }

    pub fn with_magnitude(mut self, magnitude: f32) -> Self {
        self.magnitude = magnitude;
        self
    }

    pub fn on_apply(mut self, op: EffectOp) -> Self {
        self.on_apply.push(op);
        self
    }

    pub fn on_tick(mut self, op: EffectOp) -> Self {
        self.on_tick.push(op);
        self
    }

    pub fn on_remove(mut self, op: EffectOp) -> Self {
        self.on_remove.push(op);
        self
    }

    /// A fresh copy of this template, attributed to `source`, with a full timer
    pub fn instantiate(&self, source: Option<ActorId>, magnitude_scale: f32) -> Self {
        let mut effect = self.clone();
        effect.source = source;
        effect.magnitude *= magnitude_scale;
        effect.remaining = effect.duration;
        effect.tick_accumulator = 0.0;
        effect.fresh = false;
        effect
    }

    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Does this effect apply the given crowd control?
    pub fn applies_control(&self, kind: ControlKind) -> bool {
        self.on_apply
            .iter()
            .any(|op| matches!(op, EffectOp::Control { kind: k } if *k == kind))
    }
}
