//! Per-actor ability readiness

use ahash::AHashMap;

use crate::actor::state::ActorState;
use crate::collab::persistence::CooldownRecord;
use crate::core::types::AbilityId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cooldown {
    pub remaining: f32,
    pub total: f32,
}

/// Map of ability -> remaining time
#[derive(Debug, Clone, Default)]
pub struct CooldownScheduler {
    cooldowns: AHashMap<AbilityId, Cooldown>,
}

impl CooldownScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) an ability with its full cooldown, ready now
    pub fn register(&mut self, ability: AbilityId, total: f32) {
        let total = if total.is_finite() { total.max(0.0) } else { 0.0 };
        self.cooldowns.insert(ability, Cooldown { remaining: 0.0, total });
    }

    /// Change the full cooldown without touching what is left of the current one
    pub fn set_total(&mut self, ability: &AbilityId, total: f32) {
        if let Some(cd) = self.cooldowns.get_mut(ability) {
            cd.total = if total.is_finite() { total.max(0.0) } else { cd.total };
        }
    }

    pub fn get(&self, ability: &AbilityId) -> Option<Cooldown> {
        self.cooldowns.get(ability).copied()
    }

    pub fn remaining(&self, ability: &AbilityId) -> Option<f32> {
        self.cooldowns.get(ability).map(|cd| cd.remaining)
    }

    /// Decrement every cooldown, clamped at zero
    pub fn tick(&mut self, delta: f32) {
        if !delta.is_finite() || delta <= 0.0 {
            return;
        }
        for cd in self.cooldowns.values_mut() {
            cd.remaining = (cd.remaining - delta).max(0.0);
        }
    }

    /// Off cooldown and the actor is in a state that may act
    pub fn is_ready(&self, ability: &AbilityId, state: ActorState) -> bool {
        if matches!(state, ActorState::Casting | ActorState::KnockedBack | ActorState::Dead) {
            return false;
        }
        match self.cooldowns.get(ability) {
            Some(cd) => cd.remaining <= 0.0,
            None => {
                tracing::warn!("Cooldown lookup for unregistered ability '{}'", ability);
                false
            }
        }
    }

    /// Start the cooldown: remaining = total
    pub fn consume(&mut self, ability: &AbilityId) -> bool {
        match self.cooldowns.get_mut(ability) {
            Some(cd) => {
                cd.remaining = cd.total;
                true
            }
            None => {
                tracing::warn!("Tried to consume unregistered ability '{}'", ability);
                false
            }
        }
    }

    /// Check readiness and start the cooldown in one step
    ///
    /// A second call in the same tick always fails, so one decision can never
    /// produce two casts.
    pub fn try_consume(&mut self, ability: &AbilityId, state: ActorState) -> bool {
        self.is_ready(ability, state) && self.consume(ability)
    }

    /// Put an ability back to ready (used when a cast is refused downstream)
    pub fn reset(&mut self, ability: &AbilityId) {
        if let Some(cd) = self.cooldowns.get_mut(ability) {
            cd.remaining = 0.0;
        }
    }

    pub fn snapshot(&self) -> Vec<CooldownRecord> {
        let mut records: Vec<CooldownRecord> = self
            .cooldowns
            .iter()
            .map(|(ability, cd)| CooldownRecord {
                ability: ability.0.clone(),
                remaining: cd.remaining,
                total: cd.total,
            })
            .collect();
        records.sort_by(|a, b| a.ability.cmp(&b.ability));
        records
    }

    pub fn restore(&mut self, records: &[CooldownRecord]) {
        for record in records {
            let total = record.total.max(0.0);
            self.cooldowns.insert(
                AbilityId::new(record.ability.clone()),
                Cooldown {
                    remaining: record.remaining.max(0.0),
                    total,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fireball() -> AbilityId {
        AbilityId::from("fireball")
    }

    #[test]
    fn test_ready_after_register() {
        let mut cds = CooldownScheduler::new();
        cds.register(fireball(), 2.0);
        assert!(cds.is_ready(&fireball(), ActorState::Idle));
    }

    #[test]
    fn test_consume_then_tick_down() {
        let mut cds = CooldownScheduler::new();
        cds.register(fireball(), 2.0);
        assert!(cds.try_consume(&fireball(), ActorState::Idle));
        assert!(!cds.try_consume(&fireball(), ActorState::Idle)); // same tick

        cds.tick(1.5);
        assert!(!cds.is_ready(&fireball(), ActorState::Idle));
        cds.tick(1.0);
        assert!(cds.is_ready(&fireball(), ActorState::Idle));
        assert_eq!(cds.remaining(&fireball()), Some(0.0)); // clamped
    }

    #[test]
    fn test_not_ready_in_blocking_states() {
        let mut cds = CooldownScheduler::new();
        cds.register(fireball(), 1.0);
        for state in [ActorState::Casting, ActorState::KnockedBack, ActorState::Dead] {
            assert!(!cds.is_ready(&fireball(), state));
        }
        assert!(cds.is_ready(&fireball(), ActorState::Moving));
        assert!(cds.is_ready(&fireball(), ActorState::Attacking));
    }

    #[test]
    fn test_unknown_ability_not_ready() {
        let mut cds = CooldownScheduler::new();
        assert!(!cds.is_ready(&fireball(), ActorState::Idle));
        assert!(!cds.consume(&fireball()));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut cds = CooldownScheduler::new();
        cds.register(fireball(), 4.0);
        cds.consume(&fireball());
        cds.tick(1.0);

        let mut restored = CooldownScheduler::new();
        restored.restore(&cds.snapshot());
        assert_eq!(restored.get(&fireball()), Some(Cooldown { remaining: 3.0, total: 4.0 }));
    }
}
