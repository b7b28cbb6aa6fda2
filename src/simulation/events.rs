//! Combat events reported to the notifier and kept in a bounded log

use std::collections::VecDeque;

use serde::Serialize;

use crate::actor::state::ActorState;
use crate::collab::DamageKind;
use crate::core::types::{AbilityId, ActorId, GameTime, InstanceId, Vec3};
use crate::status::RemovalReason;

/// Something observable that happened during a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    Spawned {
        actor: ActorId,
        archetype: String,
    },
    StateChanged {
        actor: ActorId,
        from: ActorState,
        to: ActorState,
    },
    Damaged {
        target: ActorId,
        source: Option<ActorId>,
        amount: f32,
        kind: DamageKind,
    },
    Healed {
        target: ActorId,
        amount: f32,
    },
    Killed {
        actor: ActorId,
        killer: Option<ActorId>,
        reward: u32,
    },
    Despawned {
        actor: ActorId,
    },
    CastStarted {
        caster: ActorId,
        ability: AbilityId,
        instance: InstanceId,
    },
    CastInterrupted {
        caster: ActorId,
        instance: InstanceId,
    },
    EffectActivated {
        instance: InstanceId,
    },
    EffectDisposed {
        instance: InstanceId,
    },
    EffectFaded {
        instance: InstanceId,
    },
    StatusApplied {
        target: ActorId,
        status: String,
    },
    StatusRemoved {
        target: ActorId,
        status: String,
        reason: RemovalReason,
    },
    KnockedBack {
        target: ActorId,
        direction: Vec3,
    },
}

/// A stamped event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedEvent {
    pub time: GameTime,
    #[serde(flatten)]
    pub event: CombatEvent,
}

/// Ring buffer of recent events; the oldest are dropped first
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<LoggedEvent>,
    capacity: usize,
    dropped: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, time: GameTime, event: CombatEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(LoggedEvent { time, event });
    }

    pub fn drain(&mut self) -> Vec<LoggedEvent> {
        self.events.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events lost to the capacity limit since creation
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
