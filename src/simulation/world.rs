//! The combat world: owns actors and live casts, and drives one tick
//!
//! Tick order:
//! 1. advance the game clock and fire due timers
//! 2. sync the spatial index
//! 3. update actors in spawn order and act on their intents
//! 4. update live effect instances
//! 5. tick status effects
//!
//! Requests produced by each phase are committed through the damage
//! resolver before the next phase starts.

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::abilities::catalog::AbilityCatalog;
use crate::actor::{Actor, ActorContext, ActorIntent, ArchetypeTable, DamageOutcome};
use crate::collab::persistence::ActorRecord;
use crate::collab::{
    ActorRef, DamageKind, DamageResolver, FlatTerrain, Notifier, NullNotifier, SpatialIndex,
    SpatialQuery, StandardResolver, Terrain,
};
use crate::core::config::CombatConfig;
use crate::core::error::{CombatError, Result};
use crate::core::types::{planar_distance, AbilityId, ActorId, GameTime, InstanceId, Vec3};
use crate::schedule::{FiredTimer, ScheduledAction, Scheduler, TimerId, TimerOwner};
use crate::simulation::events::{CombatEvent, EventLog, LoggedEvent};
use crate::simulation::requests::{CombatRequest, HitKey, RequestKind};
use crate::skills::{EffectInstance, SkillOutput, TargetingContext};
use crate::spatial::SparseHashGrid;
use crate::status::{AddOutcome, RemovedStatus, StatusEffect};

/// Pulse number used in the hit key of delayed bursts
pub const BURST_PULSE: u32 = u32::MAX;

/// Commit rounds per phase; follow-up requests past this wait for the next phase
const MAX_COMMIT_ROUNDS: usize = 8;

/// A kill and who earned it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RewardGrant {
    pub victim: ActorId,
    pub killer: Option<ActorId>,
    pub reward: u32,
}

/// What `teardown` released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TeardownReport {
    pub timers_cancelled: usize,
    pub instances_disposed: usize,
    pub actors_removed: usize,
}

/// Read-only view handed to effect instances while they select targets
struct WorldView<'a> {
    spatial: &'a dyn SpatialIndex,
    actors: &'a AHashMap<ActorId, Actor>,
}

impl SpatialQuery for WorldView<'_> {
    fn find_nearby(&self, position: Vec3, radius: f32) -> Vec<ActorRef> {
        self.spatial.find_nearby(position, radius)
    }
}

impl TargetingContext for WorldView<'_> {
    fn is_valid_target(&self, caster: ActorId, target: ActorId) -> bool {
        is_hostile_pair(self.actors, caster, target)
    }

    fn locate(&self, id: ActorId) -> Option<Vec3> {
        self.actors
            .get(&id)
            .filter(|a| !a.is_dead())
            .map(|a| a.position())
    }
}

/// `target` is alive and on the other side from `caster`.
/// A caster that has left the world can still hit anyone alive.
fn is_hostile_pair(actors: &AHashMap<ActorId, Actor>, caster: ActorId, target: ActorId) -> bool {
    let Some(target) = actors.get(&target).filter(|a| !a.is_dead()) else {
        return false;
    };
    match actors.get(&caster) {
        Some(caster) => caster.faction().is_opposed(target.faction()),
        None => true,
    }
}

pub struct CombatWorld {
    config: CombatConfig,
    archetypes: ArchetypeTable,
    catalog: AbilityCatalog,
    resolver: Box<dyn DamageResolver>,
    terrain: Box<dyn Terrain>,
    notifier: Box<dyn Notifier>,
    spatial: Box<dyn SpatialIndex>,
    scheduler: Scheduler,
    actors: AHashMap<ActorId, Actor>,
    order: Vec<ActorId>,
    instances: Vec<EffectInstance>,
    requests: Vec<CombatRequest>,
    committed_hits: AHashSet<HitKey>,
    events: EventLog,
    rewards: Vec<RewardGrant>,
    tick_count: u64,
}

impl CombatWorld {
    pub fn new(
        config: CombatConfig,
        archetypes: ArchetypeTable,
        catalog: AbilityCatalog,
        resolver: Box<dyn DamageResolver>,
        terrain: Box<dyn Terrain>,
        notifier: Box<dyn Notifier>,
        spatial: Box<dyn SpatialIndex>,
    ) -> Result<Self> {
        config.validate()?;
        let events = EventLog::new(config.event_log_capacity);
        Ok(Self {
            config,
            archetypes,
            catalog,
            resolver,
            terrain,
            notifier,
            spatial,
            scheduler: Scheduler::new(),
            actors: AHashMap::new(),
            order: Vec::new(),
            instances: Vec::new(),
            requests: Vec::new(),
            committed_hits: AHashSet::new(),
            events,
            rewards: Vec::new(),
            tick_count: 0,
        })
    }

    /// Built-in archetypes and abilities, flat ground, standard resolver,
    /// hash-grid spatial index, no notifier
    pub fn with_defaults(config: CombatConfig) -> Result<Self> {
        let spatial = SparseHashGrid::new(config.grid_cell_size);
        Self::new(
            config,
            ArchetypeTable::builtin(),
            AbilityCatalog::builtin(),
            Box::new(StandardResolver::new()),
            Box::new(FlatTerrain::default()),
            Box::new(NullNotifier),
            Box::new(spatial),
        )
    }

    // ---- accessors ----

    pub fn now(&self) -> GameTime {
        self.scheduler.now()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AbilityCatalog {
        &self.catalog
    }

    pub fn archetypes(&self) -> &ArchetypeTable {
        &self.archetypes
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    /// Actors in spawn order
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.order.iter().filter_map(|id| self.actors.get(id))
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn living_count(&self) -> usize {
        self.actors.values().filter(|a| !a.is_dead()).count()
    }

    pub fn instances(&self) -> &[EffectInstance] {
        &self.instances
    }

    pub fn instance(&self, id: InstanceId) -> Option<&EffectInstance> {
        self.instances.iter().find(|i| i.id() == id)
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn is_timer_pending(&self, id: TimerId) -> bool {
        self.scheduler.is_pending(id)
    }

    pub fn rewards(&self) -> &[RewardGrant] {
        &self.rewards
    }

    /// Total reward earned by `killer`
    pub fn reward_for(&self, killer: ActorId) -> u32 {
        self.rewards
            .iter()
            .filter(|r| r.killer == Some(killer))
            .map(|r| r.reward)
            .sum()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<LoggedEvent> {
        self.events.drain()
    }

    fn emit(&mut self, event: CombatEvent) {
        self.notifier.notify(&event);
        self.events.push(self.scheduler.now(), event);
    }

    // ---- actor lifecycle ----

    /// Spawn an actor of a named archetype
    pub fn spawn(&mut self, archetype: &str, position: Vec3) -> Result<ActorId> {
        let archetype = self.archetypes.require(archetype)?.clone();
        let mut position = position;
        if let Some(height) = self.terrain.ground_height(position.x, position.z) {
            position.y = height;
        }

        let mut actor = Actor::new(&archetype, position, &self.config);
        for ability in archetype.all_abilities() {
            match self.catalog.get(ability) {
                Some(exec) => actor.learn_ability(ability, exec.def()),
                None => tracing::warn!(
                    "Archetype '{}' lists unknown ability '{}'",
                    archetype.name,
                    ability
                ),
            }
        }

        let id = actor.id();
        self.actors.insert(id, actor);
        self.order.push(id);
        tracing::debug!("Spawned {} {:?} at {:?}", archetype.name, id, position);
        self.emit(CombatEvent::Spawned {
            actor: id,
            archetype: archetype.name,
        });
        Ok(id)
    }

    /// Death animation finished: remove the actor now
    pub fn signal_animation_complete(&mut self, id: ActorId) -> bool {
        match self.actors.get(&id) {
            Some(actor) if actor.is_dead() => self.remove_actor(id).is_some(),
            _ => false,
        }
    }

    /// Remove an actor, cancelling its timers and every cast it made
    pub fn remove_actor(&mut self, id: ActorId) -> Option<Actor> {
        let actor = self.actors.remove(&id)?;
        self.order.retain(|a| *a != id);
        self.scheduler.cancel_owner(TimerOwner::Actor(id));

        let mut disposed = Vec::new();
        for instance in self.instances.iter_mut().filter(|i| i.caster() == id) {
            if let Some(timers) = instance.cancel() {
                for timer in timers {
                    self.scheduler.cancel(timer);
                }
                disposed.push(instance.id());
            }
        }
        for instance in disposed {
            self.emit(CombatEvent::EffectDisposed { instance });
        }
        self.instances.retain(|i| !i.is_disposed());

        tracing::debug!("Removed {:?} ({})", id, actor.archetype());
        self.emit(CombatEvent::Despawned { actor: id });
        Some(actor)
    }

    /// End the encounter: cancel every timer and cast, remove every actor
    pub fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport {
            timers_cancelled: self.scheduler.clear(),
            ..TeardownReport::default()
        };
        for instance in self.instances.iter_mut() {
            if instance.cancel().is_some() {
                report.instances_disposed += 1;
            }
        }
        self.instances.clear();
        report.actors_removed = self.actors.len();
        self.actors.clear();
        self.order.clear();
        self.requests.clear();
        self.committed_hits.clear();
        tracing::info!(
            "Teardown: {} timers, {} instances, {} actors",
            report.timers_cancelled,
            report.instances_disposed,
            report.actors_removed
        );
        report
    }

    // ---- external commands ----

    /// Cast an ability on behalf of an actor (player input)
    pub fn request_cast(
        &mut self,
        caster: ActorId,
        ability: &AbilityId,
        target: Option<ActorId>,
        aim: Option<Vec3>,
    ) -> Result<InstanceId> {
        let actor = self
            .actors
            .get(&caster)
            .filter(|a| !a.is_dead())
            .ok_or(CombatError::ActorNotFound(caster))?;
        let exec = self
            .catalog
            .get(ability)
            .filter(|_| actor.knows_ability(ability))
            .ok_or_else(|| CombatError::UnknownAbility(ability.to_string()))?;

        let target_position = target
            .and_then(|t| self.actors.get(&t))
            .filter(|t| !t.is_dead())
            .map(|t| t.position());
        let aim = if exec.def().is_self_centered() {
            actor.position()
        } else {
            aim.or(target_position).unwrap_or_else(|| actor.position())
        };
        let range = exec.def().range;
        let distance = planar_distance(actor.position(), aim);
        if !exec.def().is_self_centered() && distance > range {
            return Err(CombatError::OutOfRange {
                actor: caster,
                ability: ability.to_string(),
                distance,
                range,
            });
        }

        let now = self.now();
        let started = self
            .actors
            .get_mut(&caster)
            .map(|a| a.start_cast(ability, now))
            .unwrap_or(false);
        if !started {
            return Err(CombatError::AbilityNotReady {
                actor: caster,
                ability: ability.to_string(),
            });
        }
        self.spawn_cast(caster, ability, target, aim)
            .ok_or_else(|| CombatError::UnknownAbility(ability.to_string()))
    }

    /// Interrupt the actor's cast, if it is winding one up
    pub fn cancel_cast(&mut self, caster: ActorId) -> Result<bool> {
        let cancelled = self
            .actors
            .get_mut(&caster)
            .ok_or(CombatError::ActorNotFound(caster))?
            .cancel_cast()
            .is_some();
        self.flush_interrupts();
        self.commit_requests();
        Ok(cancelled)
    }

    /// Apply a status effect from outside a cast (items, scripted events)
    pub fn add_status_effect(
        &mut self,
        target: ActorId,
        effect: StatusEffect,
        source: Option<ActorId>,
    ) -> Result<AddOutcome> {
        let actor = self
            .actors
            .get_mut(&target)
            .ok_or(CombatError::ActorNotFound(target))?;
        let status = effect.id.clone();
        let outcome = actor.add_status_effect(effect.instantiate(source, 1.0));
        if outcome != AddOutcome::Ignored {
            self.emit(CombatEvent::StatusApplied { target, status });
        }
        self.flush_interrupts();
        self.commit_requests();
        Ok(outcome)
    }

    /// Knock an actor back from outside a cast
    pub fn apply_knockback(&mut self, target: ActorId, direction: Vec3) -> Result<bool> {
        let now = self.now();
        let applied = self
            .actors
            .get_mut(&target)
            .ok_or(CombatError::ActorNotFound(target))?
            .apply_knockback(direction, now);
        if applied {
            self.emit(CombatEvent::KnockedBack { target, direction });
            self.flush_interrupts();
        }
        Ok(applied)
    }

    /// Route damage through the resolver immediately. Returns the amount applied.
    pub fn deal_damage(
        &mut self,
        target: ActorId,
        amount: f32,
        kind: DamageKind,
        source: Option<ActorId>,
    ) -> Result<f32> {
        if !self.actors.contains_key(&target) {
            return Err(CombatError::ActorNotFound(target));
        }
        Ok(self.commit_one(CombatRequest::damage(target, amount, kind, source)))
    }

    /// Route a heal through the resolver immediately. Returns the amount restored.
    pub fn heal(&mut self, target: ActorId, amount: f32, source: Option<ActorId>) -> Result<f32> {
        if !self.actors.contains_key(&target) {
            return Err(CombatError::ActorNotFound(target));
        }
        Ok(self.commit_one(CombatRequest::heal(target, amount, source)))
    }

    /// Queue a request for the next commit
    pub fn queue_request(&mut self, request: CombatRequest) {
        self.requests.push(request);
    }

    pub fn snapshot_actor(&self, id: ActorId) -> Option<ActorRecord> {
        self.actors.get(&id).map(Actor::record)
    }

    /// Load a record onto a living actor. Dead or missing actors are rejected.
    pub fn restore_actor(&mut self, id: ActorId, record: &ActorRecord) -> Result<()> {
        let now = self.now();
        let catalog = &self.catalog;
        let actor = self
            .actors
            .get_mut(&id)
            .filter(|a| !a.is_dead())
            .ok_or(CombatError::ActorNotFound(id))?;
        if actor.restore(record, now, |status| catalog.status_template(status).cloned()) {
            // Dead on load: no reward, but still on the safety timeout
            self.flush_interrupts();
            self.scheduler.schedule(
                TimerOwner::Actor(id),
                self.config.death_safety_timeout,
                ScheduledAction::DeathTimeout(id),
            );
        }
        Ok(())
    }

    // ---- the tick ----

    pub fn tick(&mut self, delta: f32) {
        let delta = if delta.is_finite() { delta.max(0.0) } else { 0.0 };
        self.committed_hits.clear();

        // 1. clock and timers
        let fired = self.scheduler.advance(delta);
        for timer in fired {
            self.handle_timer(timer);
        }
        self.commit_requests();
        let now = self.now();

        // 2. spatial index
        self.sync_spatial();

        // 3. actors
        let born = self.update_actors(delta, now);
        self.commit_requests();

        // 4. live casts
        self.sync_spatial();
        self.update_instances(delta, now, &born);
        self.commit_requests();

        // 5. status effects
        self.tick_statuses(delta);
        self.commit_requests();

        self.instances.retain(|i| !i.is_disposed());
        self.tick_count += 1;
    }

    fn sync_spatial(&mut self) {
        let living: Vec<ActorRef> = self
            .order
            .iter()
            .filter_map(|id| self.actors.get(id))
            .filter(|a| !a.is_dead())
            .map(Actor::actor_ref)
            .collect();
        self.spatial.sync(&living);
    }

    fn nearest_enemy(&self, actor: &Actor) -> Option<ActorRef> {
        self.spatial
            .find_nearby(actor.position(), actor.detection_range())
            .into_iter()
            .filter(|c| c.id != actor.id() && is_hostile_pair(&self.actors, actor.id(), c.id))
            .min_by_key(|c| (OrderedFloat(planar_distance(actor.position(), c.position)), c.id))
    }

    fn tracked_target(&self, actor: &Actor) -> Option<ActorRef> {
        let target = actor.target()?;
        if !is_hostile_pair(&self.actors, actor.id(), target) {
            return None;
        }
        self.actors.get(&target).map(Actor::actor_ref)
    }

    /// Returns instances spawned this phase
    fn update_actors(&mut self, delta: f32, now: GameTime) -> AHashSet<InstanceId> {
        let mut born = AHashSet::new();
        let order = self.order.clone();

        for id in order {
            let Some(actor) = self.actors.get(&id) else {
                continue;
            };
            if actor.is_dead() {
                continue;
            }
            let (nearest_enemy, tracked) = if actor.is_ai_controlled() {
                (self.nearest_enemy(actor), self.tracked_target(actor))
            } else {
                (None, None)
            };

            let terrain: &dyn Terrain = self.terrain.as_ref();
            let ctx = ActorContext {
                now,
                nearest_enemy,
                tracked,
                terrain,
            };
            let Some(actor) = self.actors.get_mut(&id) else {
                continue;
            };
            let before = actor.state();
            let intent = actor.update(delta, &ctx);
            let after = actor.state();
            let position = actor.position();

            if before != after {
                tracing::debug!("{:?}: {:?} -> {:?}", id, before, after);
                self.emit(CombatEvent::StateChanged {
                    actor: id,
                    from: before,
                    to: after,
                });
            }
            self.flush_interrupts();

            match intent {
                Some(ActorIntent::BasicAttack { target, damage }) => {
                    self.requests
                        .push(CombatRequest::damage(target, damage, DamageKind::Physical, Some(id)));
                }
                Some(ActorIntent::Cast { ability, target, aim }) => {
                    let aim = if aim.is_finite() { aim } else { position };
                    if let Some(instance) = self.spawn_cast(id, &ability, target, aim) {
                        born.insert(instance);
                    }
                }
                None => {}
            }
        }
        born
    }

    /// Create the instance for a cast the actor has already started
    fn spawn_cast(
        &mut self,
        caster: ActorId,
        ability: &AbilityId,
        target: Option<ActorId>,
        aim: Vec3,
    ) -> Option<InstanceId> {
        let Some(exec) = self.catalog.get(ability).cloned() else {
            tracing::warn!("Cast of unknown ability '{}' refused", ability);
            if let Some(actor) = self.actors.get_mut(&caster) {
                actor.abort_cast();
            }
            return None;
        };
        let actor = self.actors.get_mut(&caster)?;
        let instance = EffectInstance::new(exec, caster, actor.position(), aim, target).with_power(actor.power());
        let id = instance.id();
        actor.attach_cast(id);
        self.instances.push(instance);
        self.emit(CombatEvent::CastStarted {
            caster,
            ability: ability.clone(),
            instance: id,
        });
        Some(id)
    }

    fn update_instances(&mut self, delta: f32, now: GameTime, born: &AHashSet<InstanceId>) {
        let mut output = SkillOutput::default();
        {
            let view = WorldView {
                spatial: self.spatial.as_ref(),
                actors: &self.actors,
            };
            for instance in self.instances.iter_mut() {
                // Casts made this tick start aging next tick
                let dt = if born.contains(&instance.id()) { 0.0 } else { delta };
                instance.update(dt, &view, &mut output);
            }
        }
        self.apply_skill_output(output, now);
    }

    fn apply_skill_output(&mut self, output: SkillOutput, now: GameTime) {
        let SkillOutput {
            requests,
            statuses,
            knockbacks,
            children,
            timers,
            hits: _,
            activated,
            disposed,
        } = output;

        for instance in activated {
            self.emit(CombatEvent::EffectActivated { instance });
        }

        self.requests.extend(requests);

        for grant in statuses {
            let status = grant.effect.id.clone();
            let Some(actor) = self.actors.get_mut(&grant.target) else {
                continue;
            };
            if actor.add_status_effect(grant.effect) != AddOutcome::Ignored {
                self.emit(CombatEvent::StatusApplied {
                    target: grant.target,
                    status,
                });
            }
        }

        for knockback in knockbacks {
            let applied = self
                .actors
                .get_mut(&knockback.target)
                .map(|a| a.apply_knockback(knockback.direction, now))
                .unwrap_or(false);
            if applied {
                self.emit(CombatEvent::KnockedBack {
                    target: knockback.target,
                    direction: knockback.direction,
                });
            }
        }

        for request in timers {
            let Some(instance) = self.instances.iter_mut().find(|i| i.id() == request.instance) else {
                tracing::debug!("Timer for unknown instance {:?} not scheduled", request.instance);
                continue;
            };
            if instance.is_disposed() {
                // Instant casts finish in the update that requested the timer
                self.scheduler
                    .schedule(TimerOwner::Actor(instance.caster()), request.delay, request.action);
            } else {
                let id = self
                    .scheduler
                    .schedule(TimerOwner::Instance(request.instance), request.delay, request.action);
                instance.track_timer(id);
            }
        }

        for (instance, timers) in disposed {
            let caster = self.instance(instance).map(EffectInstance::caster);
            for timer in timers {
                match caster {
                    Some(caster) => {
                        self.scheduler.transfer(timer, TimerOwner::Actor(caster));
                    }
                    None => {
                        self.scheduler.cancel(timer);
                    }
                }
            }
            if let Some(caster) = caster {
                self.scheduler.schedule(
                    TimerOwner::Actor(caster),
                    self.config.effect_fade_delay,
                    ScheduledAction::FadeOut { instance },
                );
            }
            self.emit(CombatEvent::EffectDisposed { instance });
        }

        for child in children {
            if child.depth > self.config.max_child_depth {
                tracing::debug!("Child '{}' at depth {} not spawned", child.ability, child.depth);
                continue;
            }
            let Some(exec) = self.catalog.get(&child.ability).cloned() else {
                tracing::warn!("Child ability '{}' not in catalog", child.ability);
                continue;
            };
            let power = self.actors.get(&child.caster).map(Actor::power).unwrap_or(1.0);
            let instance = EffectInstance::new(exec, child.caster, child.position, child.position, None)
                .with_depth(child.depth)
                .with_power(power);
            self.emit(CombatEvent::CastStarted {
                caster: child.caster,
                ability: child.ability,
                instance: instance.id(),
            });
            self.instances.push(instance);
        }

        self.flush_interrupts();
    }

    fn tick_statuses(&mut self, delta: f32) {
        let order = self.order.clone();
        for id in order {
            let Some(actor) = self.actors.get_mut(&id) else {
                continue;
            };
            let removed = actor.tick_status(delta);
            self.report_removed(id, removed);
        }
        self.flush_interrupts();
    }

    fn report_removed(&mut self, target: ActorId, removed: Vec<RemovedStatus>) {
        for status in removed {
            self.emit(CombatEvent::StatusRemoved {
                target,
                status: status.id,
                reason: status.reason,
            });
        }
    }

    /// Dispose casts that their casters abandoned (stun, knockback, death)
    fn flush_interrupts(&mut self) {
        let mut interrupted = Vec::new();
        for id in &self.order {
            if let Some(actor) = self.actors.get_mut(id) {
                for instance in actor.take_interrupted_casts() {
                    interrupted.push((*id, instance));
                }
            }
        }
        for (caster, instance_id) in interrupted {
            let Some(instance) = self.instances.iter_mut().find(|i| i.id() == instance_id) else {
                continue;
            };
            if let Some(timers) = instance.cancel() {
                for timer in timers {
                    self.scheduler.cancel(timer);
                }
                self.emit(CombatEvent::CastInterrupted {
                    caster,
                    instance: instance_id,
                });
            }
        }
    }

    fn handle_timer(&mut self, timer: FiredTimer) {
        let owner_valid = match timer.owner {
            TimerOwner::Actor(id) => self.actors.contains_key(&id),
            TimerOwner::Instance(id) => self.instances.iter().any(|i| i.id() == id && !i.is_disposed()),
        };
        if !owner_valid {
            tracing::debug!("Timer {:?} fired for a missing owner, dropped", timer.id);
            return;
        }

        match timer.action {
            ScheduledAction::DeathTimeout(id) => {
                if self.actors.get(&id).map(Actor::is_dead).unwrap_or(false) {
                    tracing::warn!("Death animation for {:?} never completed, removing", id);
                    self.remove_actor(id);
                }
            }
            ScheduledAction::DelayedBurst {
                instance,
                caster,
                position,
                radius,
                damage,
                kind,
            } => {
                let targets: Vec<ActorId> = self
                    .spatial
                    .find_nearby(position, radius)
                    .into_iter()
                    .filter(|c| c.id != caster && is_hostile_pair(&self.actors, caster, c.id))
                    .map(|c| c.id)
                    .collect();
                for target in targets {
                    self.requests.push(
                        CombatRequest::damage(target, damage, kind, Some(caster)).with_hit_key(HitKey {
                            instance,
                            target,
                            pulse: BURST_PULSE,
                        }),
                    );
                }
            }
            ScheduledAction::FadeOut { instance } => {
                self.emit(CombatEvent::EffectFaded { instance });
            }
        }
    }

    // ---- request commit ----

    fn drain_outboxes(&mut self) {
        for id in &self.order {
            if let Some(actor) = self.actors.get_mut(id) {
                self.requests.extend(actor.drain_requests());
            }
        }
    }

    /// Commit every pending request in FIFO order
    fn commit_requests(&mut self) {
        for _ in 0..MAX_COMMIT_ROUNDS {
            self.drain_outboxes();
            if self.requests.is_empty() {
                return;
            }
            let batch = std::mem::take(&mut self.requests);
            for request in batch {
                self.commit_one(request);
            }
            self.flush_interrupts();
        }
        if !self.requests.is_empty() {
            tracing::warn!("{} requests deferred to the next commit", self.requests.len());
        }
    }

    /// Resolve and apply one request. Returns the amount applied.
    fn commit_one(&mut self, request: CombatRequest) -> f32 {
        if let Some(key) = request.hit_key {
            if !self.committed_hits.insert(key) {
                tracing::debug!("Duplicate hit {:?} dropped", key);
                return 0.0;
            }
        }
        let now = self.now();
        let Some(target) = self.actors.get_mut(&request.target) else {
            return 0.0;
        };
        if target.is_dead() {
            return 0.0;
        }
        let view = target.view();

        match request.kind {
            RequestKind::Damage { amount, kind } => {
                let resolved = self.resolver.request_damage(&view, amount, kind, request.source);
                let resolved = if resolved.is_finite() { resolved.max(0.0) } else { 0.0 };
                match target.take_damage(resolved, request.source, now) {
                    DamageOutcome::Ignored => 0.0,
                    DamageOutcome::Damaged { applied } => {
                        if applied > 0.0 {
                            self.emit(CombatEvent::Damaged {
                                target: request.target,
                                source: request.source,
                                amount: applied,
                                kind,
                            });
                        }
                        applied
                    }
                    DamageOutcome::Killed { applied, reward } => {
                        self.emit(CombatEvent::Damaged {
                            target: request.target,
                            source: request.source,
                            amount: applied,
                            kind,
                        });
                        self.on_death(request.target, request.source, reward);
                        applied
                    }
                }
            }
            RequestKind::Heal { amount } => {
                let resolved = self.resolver.request_heal(&view, amount, request.source);
                let resolved = if resolved.is_finite() { resolved.max(0.0) } else { 0.0 };
                let healed = target.heal(resolved);
                if healed > 0.0 {
                    self.emit(CombatEvent::Healed {
                        target: request.target,
                        amount: healed,
                    });
                }
                healed
            }
        }
    }

    fn on_death(&mut self, victim: ActorId, killer: Option<ActorId>, reward: u32) {
        self.rewards.push(RewardGrant { victim, killer, reward });
        tracing::info!("{:?} killed by {:?} (reward {})", victim, killer, reward);
        self.emit(CombatEvent::Killed {
            actor: victim,
            killer,
            reward,
        });
        self.flush_interrupts();
        self.scheduler.schedule(
            TimerOwner::Actor(victim),
            self.config.death_safety_timeout,
            ScheduledAction::DeathTimeout(victim),
        );
    }
}
