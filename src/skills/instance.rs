//! One live cast of an ability
//!
//! An instance goes `Casting -> Active -> Disposed`. It never touches actors
//! directly: everything it does (damage, statuses, knockbacks, child casts,
//! delayed bursts) is written to a `SkillOutput` the world commits.

use crate::core::types::{planar_direction, AbilityId, ActorId, InstanceId, Vec3};
use crate::schedule::{ScheduledAction, TimerId};
use crate::simulation::requests::{CombatRequest, HitKey};
use crate::skills::targeting::{
    select_chain, select_line, select_radius, HitSet, TargetingContext, TargetingShape,
};
use crate::skills::variant::{CreateExtra, SkillExecutor};
use crate::status::StatusEffect;
use crate::collab::ActorRef;

/// Lifecycle phase of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectPhase {
    /// Windup; nothing has been hit yet
    Casting,
    Active,
    Disposed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusGrant {
    pub target: ActorId,
    pub effect: StatusEffect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnockbackGrant {
    pub target: ActorId,
    pub direction: Vec3,
}

/// A follow-up cast spawned at a hit position
#[derive(Debug, Clone, PartialEq)]
pub struct ChildSpawn {
    pub ability: AbilityId,
    pub caster: ActorId,
    pub position: Vec3,
    pub depth: u8,
}

/// A timer an instance wants scheduled on its behalf
#[derive(Debug, Clone, PartialEq)]
pub struct TimerRequest {
    pub instance: InstanceId,
    pub delay: f32,
    pub action: ScheduledAction,
}

/// Everything a batch of instance updates produced
#[derive(Debug, Default)]
pub struct SkillOutput {
    pub requests: Vec<CombatRequest>,
    pub statuses: Vec<StatusGrant>,
    pub knockbacks: Vec<KnockbackGrant>,
    pub children: Vec<ChildSpawn>,
    pub timers: Vec<TimerRequest>,
    pub hits: Vec<(InstanceId, ActorId)>,
    pub activated: Vec<InstanceId>,
    /// Disposed instances with the timers they still owned
    pub disposed: Vec<(InstanceId, Vec<TimerId>)>,
}

/// A live cast
#[derive(Debug, Clone)]
pub struct EffectInstance {
    id: InstanceId,
    caster: ActorId,
    executor: SkillExecutor,
    origin: Vec3,
    aim: Vec3,
    target: Option<ActorId>,
    power: f32,
    depth: u8,
    elapsed: f32,
    phase: EffectPhase,
    hit_set: HitSet,
    pulse: u32,
    pulse_accumulator: f32,
    timers: Vec<TimerId>,
}

impl EffectInstance {
    pub fn new(
        executor: SkillExecutor,
        caster: ActorId,
        origin: Vec3,
        aim: Vec3,
        target: Option<ActorId>,
    ) -> Self {
        Self {
            id: InstanceId::new(),
            caster,
            executor,
            origin,
            aim,
            target,
            power: 1.0,
            depth: 0,
            elapsed: 0.0,
            phase: EffectPhase::Casting,
            hit_set: HitSet::new(),
            pulse: 0,
            pulse_accumulator: 0.0,
            timers: Vec::new(),
        }
    }

    /// Scale every hit (caster damage modifiers)
    pub fn with_power(mut self, power: f32) -> Self {
        self.power = if power.is_finite() { power.max(0.0) } else { 1.0 };
        self
    }

    /// Spawn depth; 0 for casts made by actors
    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn caster(&self) -> ActorId {
        self.caster
    }

    pub fn ability(&self) -> &AbilityId {
        self.executor.id()
    }

    pub fn phase(&self) -> EffectPhase {
        self.phase
    }

    pub fn is_disposed(&self) -> bool {
        self.phase == EffectPhase::Disposed
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn aim(&self) -> Vec3 {
        self.aim
    }

    pub fn hit_set(&self) -> &HitSet {
        &self.hit_set
    }

    /// Timers still owned by this instance
    pub fn timers(&self) -> &[TimerId] {
        &self.timers
    }

    pub fn track_timer(&mut self, id: TimerId) {
        self.timers.push(id);
    }

    /// Dispose early. Returns the timers to cancel, or `None` if already disposed.
    pub fn cancel(&mut self) -> Option<Vec<TimerId>> {
        if self.is_disposed() {
            return None;
        }
        self.phase = EffectPhase::Disposed;
        tracing::debug!("Instance {:?} ({}) cancelled", self.id, self.ability());
        Some(std::mem::take(&mut self.timers))
    }

    pub fn update(&mut self, delta: f32, ctx: &dyn TargetingContext, out: &mut SkillOutput) {
        if self.is_disposed() {
            return;
        }
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        self.elapsed += delta;

        let def = self.executor.def();
        let windup = def.cast_time;
        let duration = def.duration;
        let pulse_interval = def.pulse_interval;

        if self.phase == EffectPhase::Casting {
            if self.elapsed < windup {
                return;
            }
            self.phase = EffectPhase::Active;
            self.pulse_accumulator = self.elapsed - windup;
            out.activated.push(self.id);
            self.run_create_extras(out);
            self.strike(ctx, out);
        } else {
            self.pulse_accumulator += delta;
        }

        if let Some(interval) = pulse_interval {
            while self.pulse_accumulator >= interval
                && (self.pulse + 1) as f32 * interval <= duration + 1.0e-4
            {
                self.pulse_accumulator -= interval;
                self.pulse += 1;
                self.strike(ctx, out);
            }
        }

        if self.elapsed >= windup + duration {
            self.phase = EffectPhase::Disposed;
            out.disposed.push((self.id, std::mem::take(&mut self.timers)));
        }
    }

    fn run_create_extras(&self, out: &mut SkillOutput) {
        for extra in self.executor.create_extras() {
            match extra {
                CreateExtra::CasterStatus { status } => out.statuses.push(StatusGrant {
                    target: self.caster,
                    effect: status.instantiate(Some(self.caster), 1.0),
                }),
                CreateExtra::DelayedBurst { delay, radius, damage, kind } => {
                    out.timers.push(TimerRequest {
                        instance: self.id,
                        delay: *delay,
                        action: ScheduledAction::DelayedBurst {
                            instance: self.id,
                            caster: self.caster,
                            position: self.aim,
                            radius: *radius,
                            damage: damage * self.power,
                            kind: *kind,
                        },
                    })
                }
            }
        }
    }

    fn strike(&mut self, ctx: &dyn TargetingContext, out: &mut SkillOutput) {
        let shape = self.executor.def().shape;
        match shape {
            TargetingShape::Point => {
                if self.pulse > 0 {
                    return;
                }
                let target = self.primary_target(ctx).filter(|t| {
                    t.id != self.caster && !self.hit_set.contains(t.id) && ctx.is_valid_target(self.caster, t.id)
                });
                if let Some(target) = target {
                    self.hit_set.insert(target.id);
                    self.hit(target, self.origin, 1.0, out);
                }
            }
            TargetingShape::Radius { radius } => {
                let found = select_radius(ctx, self.caster, self.aim, radius, &mut self.hit_set);
                for target in found {
                    self.hit(target, self.aim, 1.0, out);
                }
            }
            TargetingShape::Line { length, width } => {
                let Some(direction) = self.line_direction(ctx) else {
                    tracing::warn!("Line cast {} has no direction, skipping strike", self.ability());
                    return;
                };
                let found = select_line(ctx, self.caster, self.origin, direction, length, width, &mut self.hit_set);
                for target in found {
                    self.hit(target, self.origin, 1.0, out);
                }
            }
            TargetingShape::Chain { range, count, falloff } => {
                if self.pulse > 0 {
                    return;
                }
                let first = self.primary_target(ctx);
                let chain = select_chain(ctx, self.caster, self.aim, first, range, count, &mut self.hit_set);
                tracing::debug!(
                    "Chain {} hit {} targets in {} attempts",
                    self.ability(),
                    chain.hops.len(),
                    chain.attempts
                );
                let mut from = self.origin;
                for (hop, target) in chain.hops.into_iter().enumerate() {
                    self.hit(target, from, falloff.powi(hop as i32), out);
                    from = target.position;
                }
            }
        }
    }

    fn primary_target(&self, ctx: &dyn TargetingContext) -> Option<ActorRef> {
        let id = self.target?;
        ctx.locate(id).map(|position| ActorRef { id, position })
    }

    fn line_direction(&self, ctx: &dyn TargetingContext) -> Option<Vec3> {
        planar_direction(self.origin, self.aim).or_else(|| {
            let target = self.primary_target(ctx)?;
            planar_direction(self.origin, target.position)
        })
    }

    /// Apply one hit; `from` is where the blow came from, for knockback
    fn hit(&self, target: ActorRef, from: Vec3, scale: f32, out: &mut SkillOutput) {
        let (base, kind) = self.executor.hit_damage();
        let amount = base * scale * self.power;
        if amount > 0.0 {
            out.requests.push(
                CombatRequest::damage(target.id, amount, kind, Some(self.caster)).with_hit_key(HitKey {
                    instance: self.id,
                    target: target.id,
                    pulse: self.pulse,
                }),
            );
        }

        for status in self.executor.hit_statuses() {
            out.statuses.push(StatusGrant {
                target: target.id,
                effect: status.instantiate(Some(self.caster), scale),
            });
        }

        if self.executor.knocks_back() {
            match planar_direction(from, target.position).or_else(|| planar_direction(self.origin, self.aim)) {
                Some(direction) => out.knockbacks.push(KnockbackGrant {
                    target: target.id,
                    direction,
                }),
                None => tracing::debug!("No knockback direction for {:?}", target.id),
            }
        }

        for ability in self.executor.child_abilities() {
            out.children.push(ChildSpawn {
                ability: ability.clone(),
                caster: self.caster,
                position: target.position,
                depth: self.depth.saturating_add(1),
            });
        }

        out.hits.push((self.id, target.id));
    }
}
