//! Game clock and cancellable delayed callbacks
//!
//! Every delayed operation in the core (death-animation safety timeout,
//! delayed bursts, visual fades) goes through one `Scheduler`. Each timer has
//! an owner, and the `TimerId` returned by `schedule` is its cancellation
//! token. Cancelled or removed owners cancel their timers; an effect that ends
//! normally hands its pending timers to its caster. Timers that still fire for
//! an owner that no longer exists are dropped by the world.

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

use crate::collab::DamageKind;
use crate::core::types::{ActorId, GameTime, InstanceId, Vec3};

/// Cancellation token for a scheduled callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Who a timer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    Actor(ActorId),
    Instance(InstanceId),
}

/// What happens when a timer fires
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledAction {
    /// Remove a dead actor whose death-animation signal never arrived
    DeathTimeout(ActorId),
    /// Area damage that lands some time after a cast went active
    DelayedBurst {
        instance: InstanceId,
        caster: ActorId,
        position: Vec3,
        radius: f32,
        damage: f32,
        kind: DamageKind,
    },
    /// Tell the presentation layer a disposed effect has finished fading
    FadeOut { instance: InstanceId },
}

#[derive(Debug, Clone)]
struct Timer {
    owner: TimerOwner,
    action: ScheduledAction,
}

/// A timer that came due during `advance`
#[derive(Debug, Clone)]
pub struct FiredTimer {
    pub id: TimerId,
    pub owner: TimerOwner,
    pub action: ScheduledAction,
}

/// Single-threaded timer queue driven by the game clock
#[derive(Debug, Default)]
pub struct Scheduler {
    now: GameTime,
    next_id: u64,
    queue: BTreeMap<(OrderedFloat<GameTime>, TimerId), Timer>,
    due_at: AHashMap<TimerId, OrderedFloat<GameTime>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current game-clock time
    pub fn now(&self) -> GameTime {
        self.now
    }

    /// Queue `action` to fire `delay` seconds from now
    pub fn schedule(&mut self, owner: TimerOwner, delay: f32, action: ScheduledAction) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
        let fire_at = OrderedFloat(self.now + delay as GameTime);
        self.queue.insert((fire_at, id), Timer { owner, action });
        self.due_at.insert(id, fire_at);
        id
    }

    /// Cancel one timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.due_at.remove(&id) {
            Some(fire_at) => self.queue.remove(&(fire_at, id)).is_some(),
            None => false,
        }
    }

    /// Hand a pending timer to a new owner. Returns false if it is no longer pending.
    pub fn transfer(&mut self, id: TimerId, owner: TimerOwner) -> bool {
        let Some(fire_at) = self.due_at.get(&id) else {
            return false;
        };
        match self.queue.get_mut(&(*fire_at, id)) {
            Some(timer) => {
                timer.owner = owner;
                true
            }
            None => false,
        }
    }

    /// Cancel every timer belonging to `owner`
    pub fn cancel_owner(&mut self, owner: TimerOwner) -> usize {
        let ids: Vec<TimerId> = self
            .queue
            .iter()
            .filter(|(_, timer)| timer.owner == owner)
            .map(|((_, id), _)| *id)
            .collect();
        ids.into_iter().filter(|id| self.cancel(*id)).count()
    }

    /// Drop every pending timer
    pub fn clear(&mut self) -> usize {
        let count = self.queue.len();
        self.queue.clear();
        self.due_at.clear();
        count
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.due_at.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Advance the clock and return every timer now due, earliest first
    pub fn advance(&mut self, delta: f32) -> Vec<FiredTimer> {
        if delta.is_finite() && delta > 0.0 {
            self.now += delta as GameTime;
        }

        let mut fired = Vec::new();
        while let Some(entry) = self.queue.first_entry() {
            let (fire_at, id) = *entry.key();
            if fire_at.0 > self.now {
                break;
            }
            let timer = entry.remove();
            self.due_at.remove(&id);
            fired.push(FiredTimer {
                id,
                owner: timer.owner,
                action: timer.action,
            });
        }
        fired
    }
}
