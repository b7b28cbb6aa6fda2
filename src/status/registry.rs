//! Per-actor status effect registry
//!
//! Effects live in an arena with a free list. A handle carries the slot's
//! generation, so a stale handle can never cancel the effect that later reused
//! its slot. Removal is O(1) and never shifts other effects.

use serde::{Deserialize, Serialize};

use crate::collab::persistence::StatusRecord;
use crate::core::types::ActorId;
use crate::simulation::requests::CombatRequest;
use crate::status::effect::{EffectOp, StackPolicy, StatusEffect};
use crate::status::modifiers::ModifierSet;

/// Generational handle to an effect in a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectHandle {
    pub index: u32,
    pub generation: u32,
}

/// Result of `StatusEffectRegistry::add`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new instance was inserted and its `on_apply` fired
    Added(EffectHandle),
    /// An existing instance had its timer extended
    Refreshed(EffectHandle),
    /// Dropped by an `Ignore` policy, a dead target or the capacity cap
    Ignored,
}

impl AddOutcome {
    pub fn handle(&self) -> Option<EffectHandle> {
        match self {
            AddOutcome::Added(h) | AddOutcome::Refreshed(h) => Some(*h),
            AddOutcome::Ignored => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    Expired,
    Cancelled,
}

/// An effect that left the registry
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedStatus {
    pub handle: EffectHandle,
    pub id: String,
    pub source: Option<ActorId>,
    pub reason: RemovalReason,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    effect: Option<StatusEffect>,
}

/// Collection of timed effects owned by one actor
#[derive(Debug, Clone)]
pub struct StatusEffectRegistry {
    owner: ActorId,
    capacity: usize,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    modifiers: ModifierSet,
}

impl StatusEffectRegistry {
    pub fn new(owner: ActorId, capacity: usize) -> Self {
        Self {
            owner,
            capacity: capacity.max(1),
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            modifiers: ModifierSet::new(),
        }
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    pub fn modifiers(&self) -> &ModifierSet {
        &self.modifiers
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn get(&self, handle: EffectHandle) -> Option<&StatusEffect> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.effect.as_ref())
    }

    /// Live effects in slot order
    pub fn iter(&self) -> impl Iterator<Item = (EffectHandle, &StatusEffect)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.effect.as_ref().map(|effect| {
                (
                    EffectHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    effect,
                )
            })
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.iter().any(|(_, e)| e.id == id)
    }

    pub fn count(&self, id: &str) -> usize {
        self.iter().filter(|(_, e)| e.id == id).count()
    }

    fn find(&self, id: &str) -> Option<EffectHandle> {
        self.iter().find(|(_, e)| e.id == id).map(|(h, _)| h)
    }

    fn get_mut(&mut self, handle: EffectHandle) -> Option<&mut StatusEffect> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.effect.as_mut())
    }

    /// Add an effect, honoring the stack policy of the incoming effect
    ///
    /// `on_apply` fires exactly once, and only when a new instance is inserted.
    pub fn add(&mut self, mut effect: StatusEffect, out: &mut Vec<CombatRequest>) -> AddOutcome {
        if let Some(existing) = self.find(&effect.id) {
            match effect.stack_policy {
                StackPolicy::Ignore => return AddOutcome::Ignored,
                StackPolicy::Refresh => {
                    if let Some(current) = self.get_mut(existing) {
                        current.remaining = current.remaining.max(effect.remaining);
                        current.duration = current.duration.max(effect.duration);
                    }
                    return AddOutcome::Refreshed(existing);
                }
                StackPolicy::Stack => {}
            }
        }

        if self.live >= self.capacity {
            tracing::warn!(
                "Status effect '{}' dropped on {:?}: registry full ({} effects)",
                effect.id,
                self.owner,
                self.capacity
            );
            return AddOutcome::Ignored;
        }

        effect.fresh = true;
        effect.tick_accumulator = 0.0;

        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.effect = Some(effect);
                EffectHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    effect: Some(effect),
                });
                EffectHandle {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.live += 1;

        if let Some(effect) = self.get(handle).cloned() {
            self.run_apply(handle, &effect, out);
        }

        AddOutcome::Added(handle)
    }

    fn run_apply(&mut self, handle: EffectHandle, effect: &StatusEffect, out: &mut Vec<CombatRequest>) {
        for op in &effect.on_apply {
            match op {
                EffectOp::ModifyStat { stat, amount } => {
                    self.modifiers
                        .add_stat(handle, effect.source, *stat, amount * effect.magnitude);
                }
                EffectOp::Control { kind } => {
                    self.modifiers.add_control(handle, effect.source, *kind);
                }
                EffectOp::Damage { .. } | EffectOp::Heal { .. } => {
                    self.push_instant(op, effect, out);
                }
                EffectOp::DamageOverTime { .. } | EffectOp::HealOverTime { .. } => {
                    tracing::warn!(
                        "Periodic op in on_apply of '{}' ignored; use on_tick",
                        effect.id
                    );
                }
            }
        }
    }

    fn push_instant(&self, op: &EffectOp, effect: &StatusEffect, out: &mut Vec<CombatRequest>) {
        match op {
            EffectOp::Damage { amount, kind } => out.push(CombatRequest::damage(
                self.owner,
                amount * effect.magnitude,
                *kind,
                effect.source,
            )),
            EffectOp::Heal { amount } => out.push(CombatRequest::heal(
                self.owner,
                amount * effect.magnitude,
                effect.source,
            )),
            _ => {}
        }
    }

    /// Fire `on_tick` with the real time elapsed since the previous tick
    fn run_tick(&self, effect: &StatusEffect, elapsed: f32, out: &mut Vec<CombatRequest>) {
        for op in &effect.on_tick {
            match op {
                EffectOp::DamageOverTime { per_second, kind } => out.push(CombatRequest::damage(
                    self.owner,
                    per_second * elapsed * effect.magnitude,
                    *kind,
                    effect.source,
                )),
                EffectOp::HealOverTime { per_second } => out.push(CombatRequest::heal(
                    self.owner,
                    per_second * elapsed * effect.magnitude,
                    effect.source,
                )),
                EffectOp::Damage { .. } | EffectOp::Heal { .. } => self.push_instant(op, effect, out),
                EffectOp::ModifyStat { .. } | EffectOp::Control { .. } => {
                    tracing::warn!(
                        "Persistent op in on_tick of '{}' ignored; use on_apply",
                        effect.id
                    );
                }
            }
        }
    }

    /// Advance every effect by `delta` seconds
    ///
    /// Effects added since the previous call are skipped once, so an effect
    /// never ticks inside the same update that created it.
    pub fn tick(&mut self, delta: f32, out: &mut Vec<CombatRequest>) -> Vec<RemovedStatus> {
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        let mut expired = Vec::new();
        let mut ticks: Vec<(usize, f32)> = Vec::new();

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(effect) = slot.effect.as_mut() else {
                continue;
            };
            if effect.fresh {
                effect.fresh = false;
                continue;
            }

            let dt = delta.min(effect.remaining);
            effect.remaining -= dt;
            effect.tick_accumulator += dt;

            let interval_reached = effect.tick_interval <= 0.0
                || effect.tick_accumulator >= effect.tick_interval;
            let finished = effect.remaining <= 0.0;

            // Expiry flushes the partial interval so nothing is lost
            if effect.tick_accumulator > 0.0 && (interval_reached || finished) {
                ticks.push((index, effect.tick_accumulator));
                effect.tick_accumulator = 0.0;
            }
            if finished {
                expired.push(EffectHandle {
                    index: index as u32,
                    generation: slot.generation,
                });
            }
        }

        for (index, elapsed) in ticks {
            if let Some(effect) = self.slots[index].effect.as_ref() {
                self.run_tick(effect, elapsed, out);
            }
        }

        expired
            .into_iter()
            .filter_map(|handle| self.remove(handle, RemovalReason::Expired, out))
            .collect()
    }

    /// Remove one effect; reverses its `on_apply` by key, then fires `on_remove`
    fn remove(
        &mut self,
        handle: EffectHandle,
        reason: RemovalReason,
        out: &mut Vec<CombatRequest>,
    ) -> Option<RemovedStatus> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let effect = slot.effect.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;

        self.modifiers.remove(handle);

        for op in &effect.on_remove {
            if op.is_persistent() {
                tracing::warn!(
                    "Persistent op in on_remove of '{}' ignored; it could never be undone",
                    effect.id
                );
                continue;
            }
            match op {
                EffectOp::Damage { .. } | EffectOp::Heal { .. } => self.push_instant(op, &effect, out),
                _ => {}
            }
        }

        Some(RemovedStatus {
            handle,
            id: effect.id,
            source: effect.source,
            reason,
        })
    }

    /// Cancel one effect by handle
    pub fn cancel(&mut self, handle: EffectHandle, out: &mut Vec<CombatRequest>) -> Option<RemovedStatus> {
        self.remove(handle, RemovalReason::Cancelled, out)
    }

    /// Cancel every instance with this id
    pub fn cancel_id(&mut self, id: &str, out: &mut Vec<CombatRequest>) -> Vec<RemovedStatus> {
        let handles: Vec<EffectHandle> = self
            .iter()
            .filter(|(_, e)| e.id == id)
            .map(|(h, _)| h)
            .collect();
        handles
            .into_iter()
            .filter_map(|h| self.remove(h, RemovalReason::Cancelled, out))
            .collect()
    }

    /// Cancel every effect applied by `source`
    pub fn cancel_from_source(&mut self, source: ActorId, out: &mut Vec<CombatRequest>) -> Vec<RemovedStatus> {
        let handles: Vec<EffectHandle> = self
            .iter()
            .filter(|(_, e)| e.source == Some(source))
            .map(|(h, _)| h)
            .collect();
        handles
            .into_iter()
            .filter_map(|h| self.remove(h, RemovalReason::Cancelled, out))
            .collect()
    }

    /// Cancel everything (death, teardown)
    pub fn clear(&mut self, out: &mut Vec<CombatRequest>) -> Vec<RemovedStatus> {
        let handles: Vec<EffectHandle> = self.iter().map(|(h, _)| h).collect();
        handles
            .into_iter()
            .filter_map(|h| self.remove(h, RemovalReason::Cancelled, out))
            .collect()
    }

    /// Persistence view: id and remaining time of every live effect
    pub fn snapshot(&self) -> Vec<StatusRecord> {
        self.iter()
            .map(|(_, e)| StatusRecord {
                id: e.id.clone(),
                remaining: e.remaining,
            })
            .collect()
    }
}
