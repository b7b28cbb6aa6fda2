//! A single combat actor and its AI state machine

use ahash::AHashMap;
use serde::Serialize;

use crate::abilities::catalog::AbilityDef;
use crate::abilities::cooldown::CooldownScheduler;
use crate::actor::archetype::ActorArchetype;
use crate::actor::state::{ActorIntent, ActorState, Faction};
use crate::collab::persistence::ActorRecord;
use crate::collab::{ActorRef, ActorView, Terrain};
use crate::core::config::CombatConfig;
use crate::core::types::{
    planar_direction, planar_distance, yaw_of, AbilityId, ActorId, GameTime, InstanceId, Vec3,
    DIRECTION_EPSILON,
};
use crate::simulation::requests::CombatRequest;
use crate::status::{
    AddOutcome, ControlKind, EffectHandle, RemovedStatus, Stat, StatusEffect, StatusEffectRegistry,
};

/// Cooldown key of the basic attack
pub const BASIC_ATTACK: &str = "basic_attack";

/// What the world tells an actor about its surroundings for one update
pub struct ActorContext<'a> {
    pub now: GameTime,
    /// Nearest living opposed actor within detection range
    pub nearest_enemy: Option<ActorRef>,
    /// Current position of the remembered target, if it is still alive
    pub tracked: Option<ActorRef>,
    pub terrain: &'a dyn Terrain,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggression {
    pub active: bool,
    pub expiry: GameTime,
    pub persistent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knockback {
    pub direction: Vec3,
    pub expiry: GameTime,
}

#[derive(Debug, Clone)]
struct CastProfile {
    range: f32,
    cast_time: f32,
    windup: Option<StatusEffect>,
}

/// The cast an actor is winding up
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCast {
    pub ability: AbilityId,
    pub instance: Option<InstanceId>,
    pub until: GameTime,
    windup: Option<EffectHandle>,
}

/// How a damage call changed the actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Already dead
    Ignored,
    Damaged { applied: f32 },
    /// This call killed the actor. Reported once per actor.
    Killed { applied: f32, reward: u32 },
}

#[derive(Debug, Clone)]
pub struct Actor {
    id: ActorId,
    archetype: String,
    faction: Faction,
    ai_controlled: bool,
    position: Vec3,
    rotation: f32,
    health: f32,
    max_health: f32,
    move_speed: f32,
    attack_range: f32,
    attack_speed: f32,
    attack_damage: f32,
    detection_range: f32,
    aggression_timeout: f32,
    aggression: Aggression,
    knockback: Option<Knockback>,
    knockback_duration: f32,
    knockback_speed: f32,
    attack_recovery: f32,
    recover_until: GameTime,
    cooldowns: CooldownScheduler,
    statuses: StatusEffectRegistry,
    state: ActorState,
    target: Option<ActorId>,
    special: Option<AbilityId>,
    profiles: AHashMap<AbilityId, CastProfile>,
    casting: Option<ActiveCast>,
    interrupted: Vec<InstanceId>,
    outbox: Vec<CombatRequest>,
    reward: u32,
    died_at: Option<GameTime>,
    basic_attack: AbilityId,
}

impl Actor {
    pub fn new(archetype: &ActorArchetype, position: Vec3, config: &CombatConfig) -> Self {
        let id = ActorId::new();
        let basic_attack = AbilityId::from(BASIC_ATTACK);
        let mut cooldowns = CooldownScheduler::new();
        cooldowns.register(basic_attack.clone(), 1.0 / archetype.attack_speed.max(0.01));

        Self {
            id,
            archetype: archetype.name.clone(),
            faction: archetype.faction,
            ai_controlled: archetype.ai_controlled,
            position,
            rotation: 0.0,
            health: archetype.max_health,
            max_health: archetype.max_health,
            move_speed: archetype.move_speed,
            attack_range: archetype.attack_range,
            attack_speed: archetype.attack_speed,
            attack_damage: archetype.attack_damage,
            detection_range: archetype.detection_range,
            aggression_timeout: archetype.aggression_timeout,
            aggression: Aggression {
                active: false,
                expiry: 0.0,
                persistent: archetype.persistent_aggression,
            },
            knockback: None,
            knockback_duration: config.knockback_duration,
            knockback_speed: config.knockback_speed,
            attack_recovery: config.attack_recovery,
            recover_until: 0.0,
            cooldowns,
            statuses: StatusEffectRegistry::new(id, config.max_status_effects),
            state: ActorState::Idle,
            target: None,
            special: archetype.special_ability.clone(),
            profiles: AHashMap::new(),
            casting: None,
            interrupted: Vec::new(),
            outbox: Vec::new(),
            reward: archetype.reward,
            died_at: None,
            basic_attack,
        }
    }

    /// Make an ability castable under `id` (its own id, or a variant's)
    pub fn learn_ability(&mut self, id: &AbilityId, def: &AbilityDef) {
        self.cooldowns.register(id.clone(), def.cooldown);
        self.profiles.insert(
            id.clone(),
            CastProfile {
                range: def.range,
                cast_time: def.cast_time,
                windup: def.windup_status.clone(),
            },
        );
    }

    pub fn knows_ability(&self, id: &AbilityId) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn archetype(&self) -> &str {
        &self.archetype
    }

    pub fn faction(&self) -> Faction {
        self.faction
    }

    pub fn is_ai_controlled(&self) -> bool {
        self.ai_controlled
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Yaw in radians around +y
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.state.is_dead()
    }

    pub fn state(&self) -> ActorState {
        self.state
    }

    pub fn target(&self) -> Option<ActorId> {
        self.target
    }

    pub fn aggression(&self) -> Aggression {
        self.aggression
    }

    pub fn knockback(&self) -> Option<Knockback> {
        self.knockback
    }

    pub fn casting(&self) -> Option<&ActiveCast> {
        self.casting.as_ref()
    }

    pub fn cooldowns(&self) -> &CooldownScheduler {
        &self.cooldowns
    }

    pub fn statuses(&self) -> &StatusEffectRegistry {
        &self.statuses
    }

    pub fn reward(&self) -> u32 {
        self.reward
    }

    pub fn attack_range(&self) -> f32 {
        self.attack_range
    }

    pub fn detection_range(&self) -> f32 {
        self.detection_range
    }

    pub fn died_at(&self) -> Option<GameTime> {
        self.died_at
    }

    pub fn special_ability(&self) -> Option<&AbilityId> {
        self.special.as_ref()
    }

    pub fn actor_ref(&self) -> ActorRef {
        ActorRef {
            id: self.id,
            position: self.position,
        }
    }

    pub fn view(&self) -> ActorView {
        ActorView {
            id: self.id,
            health: self.health,
            max_health: self.max_health,
            damage_taken_multiplier: self.statuses.modifiers().multiplier(Stat::DamageTaken),
        }
    }

    /// Outgoing damage multiplier from status effects
    pub fn power(&self) -> f32 {
        self.statuses.modifiers().multiplier(Stat::DamageDealt)
    }

    pub fn effective_move_speed(&self) -> f32 {
        if self.statuses.modifiers().has_control(ControlKind::Root) {
            return 0.0;
        }
        self.move_speed * self.statuses.modifiers().multiplier(Stat::MoveSpeed)
    }

    pub fn effective_attack_speed(&self) -> f32 {
        (self.attack_speed * self.statuses.modifiers().multiplier(Stat::AttackSpeed)).max(0.01)
    }

    fn has_control(&self, kind: ControlKind) -> bool {
        self.statuses.modifiers().has_control(kind)
    }

    /// Requests produced by status effects since the last drain
    pub fn drain_requests(&mut self) -> Vec<CombatRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// Casts interrupted since the last call; the world disposes them
    pub fn take_interrupted_casts(&mut self) -> Vec<InstanceId> {
        std::mem::take(&mut self.interrupted)
    }

    /// Advance timers and, for AI actors, decide what to do
    pub fn update(&mut self, delta: f32, ctx: &ActorContext) -> Option<ActorIntent> {
        if self.is_dead() {
            return None;
        }
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        let now = ctx.now;

        self.cooldowns.tick(delta);
        let attack_interval = 1.0 / self.effective_attack_speed();
        self.cooldowns.set_total(&self.basic_attack, attack_interval);

        let stunned = self.has_control(ControlKind::Stun);
        if stunned && self.state == ActorState::Casting {
            self.interrupt_cast();
            self.state = ActorState::Idle;
        }

        match self.state {
            ActorState::KnockedBack => {
                match self.knockback {
                    Some(kb) if now < kb.expiry => {
                        self.displace(kb.direction * self.knockback_speed * delta, ctx.terrain);
                    }
                    _ => {
                        self.knockback = None;
                        self.state = ActorState::Idle;
                        tracing::debug!("{:?} recovered from knockback", self.id);
                    }
                }
                return None;
            }
            ActorState::Casting => {
                match &self.casting {
                    Some(cast) if now < cast.until => {}
                    _ => self.finish_cast(),
                }
                return None;
            }
            _ => {}
        }

        if stunned {
            self.state = ActorState::Idle;
            return None;
        }

        let recovering = self.state == ActorState::Attacking && now < self.recover_until;
        if self.state == ActorState::Attacking && !recovering {
            self.state = ActorState::Idle;
        }

        if !self.ai_controlled {
            return None;
        }

        self.expire_aggression(now);
        let Some(target) = self.choose_target(ctx, now) else {
            if !recovering {
                self.state = ActorState::Idle;
            }
            return None;
        };

        self.face(target.position);
        let distance = planar_distance(self.position, target.position);

        if let Some(intent) = self.try_special(target, distance, now) {
            return Some(intent);
        }
        if recovering {
            return None;
        }

        if distance <= self.attack_range {
            if self.cooldowns.try_consume(&self.basic_attack, self.state) {
                self.state = ActorState::Attacking;
                let recovery = self.attack_recovery.min(attack_interval);
                self.recover_until = now + recovery as GameTime;
                return Some(ActorIntent::BasicAttack {
                    target: target.id,
                    damage: self.attack_damage * self.power(),
                });
            }
            self.state = ActorState::Idle;
            return None;
        }

        let speed = self.effective_move_speed();
        match planar_direction(self.position, target.position) {
            Some(direction) if speed > 0.0 => {
                // Stop at attack range rather than walking into the target
                let travel = (speed * delta).min(distance - self.attack_range).max(0.0);
                self.displace(direction * travel, ctx.terrain);
                self.state = ActorState::Moving;
            }
            _ => self.state = ActorState::Idle,
        }
        None
    }

    fn expire_aggression(&mut self, now: GameTime) {
        if self.aggression.active && !self.aggression.persistent && now >= self.aggression.expiry {
            self.aggression.active = false;
            tracing::debug!("{:?} calmed down", self.id);
        }
    }

    fn choose_target(&mut self, ctx: &ActorContext, now: GameTime) -> Option<ActorRef> {
        let detected = ctx
            .nearest_enemy
            .filter(|e| planar_distance(self.position, e.position) <= self.detection_range);

        if let Some(enemy) = detected {
            let remembered_alive = ctx.tracked.map(|t| Some(t.id) == self.target).unwrap_or(false);
            if !self.aggression.active || !remembered_alive {
                self.target = Some(enemy.id);
            }
            self.provoke(now);
        }

        if self.aggression.active {
            if let Some(tracked) = ctx.tracked.filter(|t| Some(t.id) == self.target) {
                return Some(tracked);
            }
        }
        detected
    }

    fn try_special(&mut self, target: ActorRef, distance: f32, now: GameTime) -> Option<ActorIntent> {
        let ability = self.special.clone()?;
        let profile = self.profiles.get(&ability)?;
        let self_centered = profile.range <= 0.0;
        let reach = if self_centered { self.attack_range } else { profile.range };
        if distance > reach {
            return None;
        }
        let aim = if self_centered { self.position } else { target.position };
        if self.start_cast(&ability, now) {
            Some(ActorIntent::Cast {
                ability,
                target: Some(target.id),
                aim,
            })
        } else {
            None
        }
    }

    /// Enter `Casting` if the ability is known, ready and not blocked by crowd control
    pub fn start_cast(&mut self, ability: &AbilityId, now: GameTime) -> bool {
        if self.is_dead() || self.has_control(ControlKind::Stun) || self.has_control(ControlKind::Silence) {
            return false;
        }
        let Some(profile) = self.profiles.get(ability).cloned() else {
            tracing::warn!("{:?} does not know ability '{}'", self.id, ability);
            return false;
        };
        if !self.cooldowns.try_consume(ability, self.state) {
            return false;
        }

        let windup = profile.windup.and_then(|status| {
            self.statuses
                .add(status.instantiate(Some(self.id), 1.0), &mut self.outbox)
                .handle()
        });
        self.casting = Some(ActiveCast {
            ability: ability.clone(),
            instance: None,
            until: now + profile.cast_time as GameTime,
            windup,
        });
        self.state = ActorState::Casting;
        tracing::debug!("{:?} casting '{}'", self.id, ability);
        true
    }

    /// Record the instance spawned for the current cast
    pub fn attach_cast(&mut self, instance: InstanceId) {
        if let Some(cast) = self.casting.as_mut() {
            cast.instance = Some(instance);
        }
    }

    /// The world could not spawn the cast: refund the cooldown and go idle
    pub fn abort_cast(&mut self) {
        if let Some(cast) = self.casting.take() {
            self.cooldowns.reset(&cast.ability);
            if let Some(handle) = cast.windup {
                self.statuses.cancel(handle, &mut self.outbox);
            }
            self.state = ActorState::Idle;
        }
    }

    /// Interrupt the current cast, if any
    pub fn cancel_cast(&mut self) -> Option<InstanceId> {
        if self.state != ActorState::Casting {
            return None;
        }
        let instance = self.interrupt_cast();
        self.state = ActorState::Idle;
        instance
    }

    fn interrupt_cast(&mut self) -> Option<InstanceId> {
        let cast = self.casting.take()?;
        if let Some(handle) = cast.windup {
            self.statuses.cancel(handle, &mut self.outbox);
        }
        tracing::debug!("{:?} cast of '{}' interrupted", self.id, cast.ability);
        if let Some(instance) = cast.instance {
            self.interrupted.push(instance);
        }
        cast.instance
    }

    fn finish_cast(&mut self) {
        if let Some(cast) = self.casting.take() {
            if let Some(handle) = cast.windup {
                self.statuses.cancel(handle, &mut self.outbox);
            }
        }
        self.state = ActorState::Idle;
    }

    /// Observe a resolved amount of damage
    pub fn take_damage(&mut self, amount: f32, source: Option<ActorId>, now: GameTime) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::Ignored;
        }
        let amount = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        let before = self.health;
        self.health = (self.health - amount).max(0.0);
        let applied = before - self.health;

        if let Some(source) = source.filter(|s| *s != self.id) {
            if !self.aggression.active || self.target.is_none() {
                self.target = Some(source);
            }
            self.provoke(now);
        }

        if self.health <= 0.0 {
            self.die(now);
            return DamageOutcome::Killed {
                applied,
                reward: self.reward,
            };
        }
        DamageOutcome::Damaged { applied }
    }

    fn die(&mut self, now: GameTime) {
        self.health = 0.0;
        self.interrupt_cast();
        self.knockback = None;
        self.aggression.active = false;
        self.state = ActorState::Dead;
        self.died_at = Some(now);
        self.statuses.clear(&mut self.outbox);
        tracing::debug!("{:?} ({}) died", self.id, self.archetype);
    }

    /// Observe a resolved heal; returns what was actually restored
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.is_dead() {
            return 0.0;
        }
        let amount = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        let before = self.health;
        self.health = (self.health + amount).min(self.max_health);
        self.health - before
    }

    /// Push the actor along `direction` for the configured duration.
    /// Re-applying restarts the timer.
    pub fn apply_knockback(&mut self, direction: Vec3, now: GameTime) -> bool {
        if self.is_dead() {
            return false;
        }
        let planar = Vec3::new(direction.x, 0.0, direction.z);
        let direction = if planar.length() > DIRECTION_EPSILON && planar.is_finite() {
            planar.normalize()
        } else {
            tracing::warn!("Knockback on {:?} with no direction, staying in place", self.id);
            Vec3::ZERO
        };
        if self.state == ActorState::Casting {
            self.interrupt_cast();
        }
        self.knockback = Some(Knockback {
            direction,
            expiry: now + self.knockback_duration as GameTime,
        });
        self.state = ActorState::KnockedBack;
        true
    }

    pub fn add_status_effect(&mut self, effect: StatusEffect) -> AddOutcome {
        if self.is_dead() {
            return AddOutcome::Ignored;
        }
        let stuns = effect.applies_control(ControlKind::Stun);
        let outcome = self.statuses.add(effect, &mut self.outbox);
        if stuns && matches!(outcome, AddOutcome::Added(_)) && self.state == ActorState::Casting {
            self.interrupt_cast();
            self.state = ActorState::Idle;
        }
        outcome
    }

    pub fn tick_status(&mut self, delta: f32) -> Vec<RemovedStatus> {
        if self.is_dead() {
            return Vec::new();
        }
        self.statuses.tick(delta, &mut self.outbox)
    }

    /// Become (or stay) aggressive
    pub fn provoke(&mut self, now: GameTime) {
        if self.is_dead() {
            return;
        }
        if !self.aggression.active {
            tracing::debug!("{:?} is now aggressive", self.id);
        }
        self.aggression.active = true;
        self.aggression.expiry = now + self.aggression_timeout as GameTime;
    }

    fn face(&mut self, point: Vec3) {
        if let Some(direction) = planar_direction(self.position, point) {
            self.rotation = yaw_of(direction);
        }
    }

    fn displace(&mut self, offset: Vec3, terrain: &dyn Terrain) {
        if !offset.is_finite() {
            return;
        }
        self.position += offset;
        if let Some(height) = terrain.ground_height(self.position.x, self.position.z) {
            if height.is_finite() {
                self.position.y = height;
            }
        }
    }

    pub fn record(&self) -> ActorRecord {
        ActorRecord {
            position: self.position.to_array(),
            health: self.health,
            status_effects: self.statuses.snapshot(),
            cooldowns: self.cooldowns.snapshot(),
        }
    }

    /// Load a saved record. Status ids are rebuilt through `template`;
    /// unknown ids are skipped. Instant `on_apply` effects do not fire again.
    ///
    /// Dead actors are left untouched. Returns true when a record with zero
    /// health killed the actor; the caller owns its death timer.
    pub fn restore(
        &mut self,
        record: &ActorRecord,
        now: GameTime,
        template: impl Fn(&str) -> Option<StatusEffect>,
    ) -> bool {
        if self.is_dead() {
            tracing::warn!("{:?} is dead, saved record ignored", self.id);
            return false;
        }
        let position = Vec3::from_array(record.position);
        if position.is_finite() {
            self.position = position;
        }

        let mut discarded = Vec::new();
        self.statuses.clear(&mut discarded);
        for saved in &record.status_effects {
            match template(&saved.id) {
                Some(status) => {
                    let mut effect = status.instantiate(None, 1.0);
                    effect.remaining = saved.remaining.max(0.0);
                    self.statuses.add(effect, &mut discarded);
                }
                None => tracing::warn!("Unknown status '{}' in saved record, skipped", saved.id),
            }
        }
        self.cooldowns.restore(&record.cooldowns);

        let health = if record.health.is_finite() { record.health } else { 0.0 };
        self.health = health.clamp(0.0, self.max_health);
        if self.health <= 0.0 {
            self.die(now);
            self.outbox.clear();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::FlatTerrain;
    use crate::skills::targeting::TargetingShape;

    const TERRAIN: FlatTerrain = FlatTerrain { height: 0.0 };

    fn skeleton() -> ActorArchetype {
        ActorArchetype {
            max_health: 50.0,
            move_speed: 2.0,
            attack_range: 1.5,
            attack_speed: 1.0,
            detection_range: 10.0,
            aggression_timeout: 2.0,
            reward: 10,
            ..ActorArchetype::new("skeleton", Faction::Hostile)
        }
    }

    fn enemy_at(x: f32) -> ActorRef {
        ActorRef {
            id: ActorId::new(),
            position: Vec3::new(x, 0.0, 0.0),
        }
    }

    fn ctx(now: GameTime, enemy: Option<ActorRef>) -> ActorContext<'static> {
        ActorContext {
            now,
            nearest_enemy: enemy,
            tracked: enemy,
            terrain: &TERRAIN,
        }
    }

    #[test]
    fn test_overkill_clamps_and_reports_once() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        let outcome = actor.take_damage(60.0, None, 0.0);
        assert_eq!(outcome, DamageOutcome::Killed { applied: 50.0, reward: 10 });
        assert_eq!(actor.health(), 0.0);
        assert!(actor.is_dead());
        assert_eq!(actor.take_damage(10.0, None, 0.0), DamageOutcome::Ignored);
    }

    #[test]
    fn test_nan_damage_is_zero() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        assert_eq!(actor.take_damage(f32::NAN, None, 0.0), DamageOutcome::Damaged { applied: 0.0 });
        assert_eq!(actor.take_damage(-5.0, None, 0.0), DamageOutcome::Damaged { applied: 0.0 });
        assert_eq!(actor.health(), 50.0);
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        actor.take_damage(20.0, None, 0.0);
        assert_eq!(actor.heal(100.0), 20.0);
        assert_eq!(actor.health(), 50.0);
    }

    #[test]
    fn test_chase_stops_at_attack_range() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        let enemy = enemy_at(3.0);
        actor.update(1.0, &ctx(0.0, Some(enemy)));
        assert_eq!(actor.state(), ActorState::Moving);
        // 3.0 away, range 1.5, speed 2: stops at 1.5, not 2.0
        assert!((actor.position().x - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_attack_in_range_then_recover() {
        let config = CombatConfig::default();
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &config);
        let enemy = enemy_at(1.0);
        let intent = actor.update(0.016, &ctx(0.0, Some(enemy)));
        assert!(matches!(intent, Some(ActorIntent::BasicAttack { target, .. }) if target == enemy.id));
        assert_eq!(actor.state(), ActorState::Attacking);

        // Still recovering
        assert!(actor.update(0.016, &ctx(0.1, Some(enemy))).is_none());
        assert_eq!(actor.state(), ActorState::Attacking);

        // Recovery over, cooldown not yet
        actor.update(0.5, &ctx(config.attack_recovery as GameTime + 0.01, Some(enemy)));
        assert_eq!(actor.state(), ActorState::Idle);
    }

    #[test]
    fn test_zero_delta_is_idempotent() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        let enemy = enemy_at(5.0);
        actor.update(0.0, &ctx(0.0, Some(enemy)));
        let state = actor.state();
        let position = actor.position();
        for _ in 0..5 {
            assert!(actor.update(0.0, &ctx(0.0, Some(enemy))).is_none());
        }
        assert_eq!(actor.state(), state);
        assert_eq!(actor.position(), position);
    }

    #[test]
    fn test_coincident_target_keeps_rotation() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        let enemy = enemy_at(0.0);
        actor.update(0.1, &ctx(0.0, Some(enemy)));
        assert_eq!(actor.rotation(), 0.0);
        assert!(actor.rotation().is_finite());
    }

    #[test]
    fn test_knockback_duration() {
        let config = CombatConfig::default();
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &config);
        assert!(actor.apply_knockback(Vec3::X, 0.0));
        assert_eq!(actor.state(), ActorState::KnockedBack);

        actor.update(0.1, &ctx(0.1, None));
        assert_eq!(actor.state(), ActorState::KnockedBack);
        assert!(actor.position().x > 0.0);

        actor.update(0.2, &ctx(config.knockback_duration as GameTime, None));
        assert_eq!(actor.state(), ActorState::Idle);
    }

    #[test]
    fn test_zero_knockback_direction_degrades() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        assert!(actor.apply_knockback(Vec3::ZERO, 0.0));
        assert_eq!(actor.knockback().map(|k| k.direction), Some(Vec3::ZERO));
    }

    #[test]
    fn test_aggression_expires() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        actor.provoke(0.0);
        assert!(actor.aggression().active);
        actor.update(0.1, &ctx(1.0, None));
        assert!(actor.aggression().active);
        actor.update(0.1, &ctx(2.5, None));
        assert!(!actor.aggression().active);
    }

    #[test]
    fn test_persistent_aggression_never_expires() {
        let archetype = ActorArchetype {
            persistent_aggression: true,
            ..skeleton()
        };
        let mut actor = Actor::new(&archetype, Vec3::ZERO, &CombatConfig::default());
        actor.provoke(0.0);
        actor.update(0.1, &ctx(1000.0, None));
        assert!(actor.aggression().active);
    }

    #[test]
    fn test_damage_provokes_and_targets_source() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        let attacker = ActorId::new();
        actor.take_damage(1.0, Some(attacker), 3.0);
        assert!(actor.aggression().active);
        assert_eq!(actor.aggression().expiry, 5.0);
        assert_eq!(actor.target(), Some(attacker));
    }

    fn caster_with(def: &AbilityDef) -> Actor {
        let archetype = ActorArchetype {
            special_ability: Some(def.id.clone()),
            ..skeleton()
        };
        let mut actor = Actor::new(&archetype, Vec3::ZERO, &CombatConfig::default());
        actor.learn_ability(&def.id, def);
        actor
    }

    fn bolt() -> AbilityDef {
        AbilityDef {
            cooldown: 5.0,
            cast_time: 0.5,
            range: 8.0,
            windup_status: Some(StatusEffect::slow("focus", 0.5, 5.0)),
            ..AbilityDef::new("bolt", TargetingShape::Point)
        }
    }

    #[test]
    fn test_special_takes_priority_over_attack() {
        let mut actor = caster_with(&bolt());
        let enemy = enemy_at(1.0);
        let intent = actor.update(0.016, &ctx(0.0, Some(enemy)));
        assert!(matches!(intent, Some(ActorIntent::Cast { ref ability, .. }) if ability.as_str() == "bolt"));
        assert_eq!(actor.state(), ActorState::Casting);
        assert!(actor.statuses().contains("focus"));

        // Windup completes, windup status removed
        actor.update(0.5, &ctx(0.5, Some(enemy)));
        assert_eq!(actor.state(), ActorState::Idle);
        assert!(!actor.statuses().contains("focus"));
    }

    #[test]
    fn test_stun_interrupts_cast() {
        let mut actor = caster_with(&bolt());
        let enemy = enemy_at(1.0);
        actor.update(0.016, &ctx(0.0, Some(enemy)));
        let instance = InstanceId::new();
        actor.attach_cast(instance);

        actor.add_status_effect(StatusEffect::control("stun", ControlKind::Stun, 1.0));
        assert_eq!(actor.state(), ActorState::Idle);
        assert_eq!(actor.take_interrupted_casts(), vec![instance]);
        assert!(!actor.statuses().contains("focus"));
        assert_eq!(actor.statuses().modifiers().multiplier(Stat::MoveSpeed), 1.0);
    }

    #[test]
    fn test_silence_blocks_special() {
        let mut actor = caster_with(&bolt());
        actor.add_status_effect(StatusEffect::control("hush", ControlKind::Silence, 5.0));
        let intent = actor.update(0.016, &ctx(0.0, Some(enemy_at(1.0))));
        assert!(matches!(intent, Some(ActorIntent::BasicAttack { .. })));
    }

    #[test]
    fn test_root_blocks_movement() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        actor.add_status_effect(StatusEffect::control("roots", ControlKind::Root, 5.0));
        actor.update(1.0, &ctx(0.0, Some(enemy_at(5.0))));
        assert_eq!(actor.position(), Vec3::ZERO);
        assert_eq!(actor.state(), ActorState::Idle);
    }

    #[test]
    fn test_record_restore() {
        let def = bolt();
        let mut actor = caster_with(&def);
        actor.take_damage(15.0, None, 0.0);
        actor.start_cast(&def.id, 0.0);
        let record = actor.record();

        let mut copy = caster_with(&def);
        let focus = |id: &str| (id == "focus").then(|| StatusEffect::slow("focus", 0.5, 5.0));
        assert!(!copy.restore(&record, 0.0, focus));
        assert_eq!(copy.health(), 35.0);
        assert!(copy.statuses().contains("focus"));
        assert_eq!(copy.cooldowns().remaining(&def.id), Some(5.0));
    }

    #[test]
    fn test_restore_zero_health_dies_at_now() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        let record = ActorRecord {
            health: 0.0,
            ..actor.record()
        };
        assert!(actor.restore(&record, 7.5, |_| None));
        assert!(actor.is_dead());
        assert_eq!(actor.died_at(), Some(7.5));
    }

    #[test]
    fn test_restore_leaves_dead_actor_dead() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        let alive = actor.record();
        actor.take_damage(500.0, None, 1.0);

        assert!(!actor.restore(&alive, 2.0, |_| None));
        assert!(actor.is_dead());
        assert_eq!(actor.health(), 0.0);
        assert_eq!(actor.died_at(), Some(1.0));
    }

    #[test]
    fn test_stun_resets_movement_state() {
        let mut actor = Actor::new(&skeleton(), Vec3::ZERO, &CombatConfig::default());
        actor.update(0.1, &ctx(0.0, Some(enemy_at(5.0))));
        assert_eq!(actor.state(), ActorState::Moving);

        actor.add_status_effect(StatusEffect::control("daze", ControlKind::Stun, 2.0));
        let moved_to = actor.position();
        assert!(actor.update(0.1, &ctx(0.1, Some(enemy_at(5.0)))).is_none());
        assert_eq!(actor.state(), ActorState::Idle);
        assert_eq!(actor.position(), moved_to);
    }

    #[test]
    fn test_player_only_ticks_timers() {
        let archetype = ActorArchetype {
            ai_controlled: false,
            ..ActorArchetype::new("player", Faction::Player)
        };
        let mut actor = Actor::new(&archetype, Vec3::ZERO, &CombatConfig::default());
        assert!(actor.update(1.0, &ctx(0.0, Some(enemy_at(1.0)))).is_none());
        assert_eq!(actor.state(), ActorState::Idle);
    }
}
