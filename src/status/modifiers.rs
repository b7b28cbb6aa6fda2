//! Keyed stat modifiers and crowd-control flags
//!
//! Every entry is keyed by the handle of the status effect that installed it.
//! Removing an effect removes exactly its own entries, so two slows from
//! different casters never clobber each other.

use ahash::AHashMap;

use crate::core::types::ActorId;
use crate::status::effect::{ControlKind, Stat};
use crate::status::registry::EffectHandle;

#[derive(Debug, Clone, Default)]
struct Applied {
    source: Option<ActorId>,
    stats: Vec<(Stat, f32)>,
    controls: Vec<ControlKind>,
}

/// Modifiers currently in force on one actor
#[derive(Debug, Clone, Default)]
pub struct ModifierSet {
    entries: AHashMap<EffectHandle, Applied>,
}

impl ModifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stat(&mut self, key: EffectHandle, source: Option<ActorId>, stat: Stat, amount: f32) {
        let entry = self.entries.entry(key).or_default();
        entry.source = source;
        entry.stats.push((stat, amount));
    }

    pub fn add_control(&mut self, key: EffectHandle, source: Option<ActorId>, kind: ControlKind) {
        let entry = self.entries.entry(key).or_default();
        entry.source = source;
        entry.controls.push(kind);
    }

    /// Remove everything installed under `key`
    pub fn remove(&mut self, key: EffectHandle) -> bool {
        self.entries.remove(&key).is_some()
    }

    /// Product of `1 + amount` over all modifiers of `stat`, never negative
    pub fn multiplier(&self, stat: Stat) -> f32 {
        self.entries
            .values()
            .flat_map(|applied| applied.stats.iter())
            .filter(|(s, _)| *s == stat)
            .fold(1.0_f32, |acc, (_, amount)| acc * (1.0 + amount))
            .max(0.0)
    }

    pub fn has_control(&self, kind: ControlKind) -> bool {
        self.entries
            .values()
            .any(|applied| applied.controls.contains(&kind))
    }

    /// Number of modifiers a given source currently has on this actor
    pub fn count_from(&self, source: ActorId) -> usize {
        self.entries
            .values()
            .filter(|applied| applied.source == Some(source))
            .map(|applied| applied.stats.len() + applied.controls.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
