//! Actor archetypes and their default properties
//!
//! Built-in archetypes cover the usual cast (player, skeletons, golems).
//! `data/archetypes.toml` can add more or override them by name.

use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::actor::state::Faction;
use crate::core::error::{CombatError, Result};
use crate::core::types::AbilityId;

fn default_true() -> bool {
    true
}

/// Properties shared by every actor of one kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorArchetype {
    pub name: String,
    pub faction: Faction,
    pub max_health: f32,
    pub move_speed: f32,
    pub attack_range: f32,
    /// Basic attacks per second
    pub attack_speed: f32,
    pub attack_damage: f32,
    pub detection_range: f32,
    /// Seconds an actor stays aggressive after the last provocation
    #[serde(default)]
    pub aggression_timeout: f32,
    /// Aggression never expires
    #[serde(default)]
    pub persistent_aggression: bool,
    /// Cast by the AI whenever ready and in range
    #[serde(default)]
    pub special_ability: Option<AbilityId>,
    /// Castable through `CombatWorld::request_cast`
    #[serde(default)]
    pub abilities: Vec<AbilityId>,
    /// Granted to the killer, once
    #[serde(default)]
    pub reward: u32,
    #[serde(default = "default_true")]
    pub ai_controlled: bool,
}

impl ActorArchetype {
    pub fn new(name: impl Into<String>, faction: Faction) -> Self {
        Self {
            name: name.into(),
            faction,
            max_health: 100.0,
            move_speed: 4.0,
            attack_range: 1.5,
            attack_speed: 1.0,
            attack_damage: 10.0,
            detection_range: 12.0,
            aggression_timeout: 5.0,
            persistent_aggression: false,
            special_ability: None,
            abilities: Vec::new(),
            reward: 0,
            ai_controlled: true,
        }
    }

    /// Every ability this archetype can cast, special first
    pub fn all_abilities(&self) -> impl Iterator<Item = &AbilityId> {
        self.special_ability
            .iter()
            .chain(self.abilities.iter().filter(move |a| Some(*a) != self.special_ability.as_ref()))
    }

    /// Replace unusable values with safe ones, warning for each
    fn sanitized(mut self) -> Self {
        let name = self.name.clone();
        let fix = |value: f32, min: f32, fallback: f32, field: &str| {
            if value.is_finite() && value >= min {
                value
            } else {
                tracing::warn!("Archetype '{}' has invalid {} {}, using {}", name, field, value, fallback);
                fallback
            }
        };
        self.max_health = fix(self.max_health, f32::MIN_POSITIVE, 1.0, "max_health");
        self.move_speed = fix(self.move_speed, 0.0, 0.0, "move_speed");
        self.attack_range = fix(self.attack_range, 0.0, 0.0, "attack_range");
        self.attack_speed = fix(self.attack_speed, f32::MIN_POSITIVE, 1.0, "attack_speed");
        self.attack_damage = fix(self.attack_damage, 0.0, 0.0, "attack_damage");
        self.detection_range = fix(self.detection_range, 0.0, 0.0, "detection_range");
        self.aggression_timeout = fix(self.aggression_timeout, 0.0, 0.0, "aggression_timeout");
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct ArchetypeFile {
    #[serde(default)]
    archetypes: Vec<ActorArchetype>,
}

/// Archetypes by name
#[derive(Debug, Clone, Default)]
pub struct ArchetypeTable {
    archetypes: AHashMap<String, ActorArchetype>,
}

impl ArchetypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut table = Self::new();
        for archetype in builtin_archetypes() {
            table.insert(archetype);
        }
        table
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut table = Self::new();
        table.merge_toml_str(contents)?;
        Ok(table)
    }

    pub fn merge_toml_str(&mut self, contents: &str) -> Result<()> {
        let file: ArchetypeFile = toml::from_str(contents)?;
        for archetype in file.archetypes {
            self.insert(archetype);
        }
        Ok(())
    }

    /// Built-ins overlaid with the contents of `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut table = Self::builtin();
        table.merge_toml_str(&contents)?;
        tracing::info!("Loaded {} archetypes", table.len());
        Ok(table)
    }

    pub fn insert(&mut self, archetype: ActorArchetype) {
        let archetype = archetype.sanitized();
        self.archetypes.insert(archetype.name.clone(), archetype);
    }

    pub fn get(&self, name: &str) -> Option<&ActorArchetype> {
        self.archetypes.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&ActorArchetype> {
        self.get(name)
            .ok_or_else(|| CombatError::UnknownArchetype(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.archetypes.keys().cloned().collect();
        names.sort();
        names
    }
}

fn builtin_archetypes() -> Vec<ActorArchetype> {
    vec![
        ActorArchetype {
            max_health: 200.0,
            move_speed: 5.0,
            attack_range: 2.0,
            attack_speed: 1.5,
            attack_damage: 12.0,
            detection_range: 0.0,
            aggression_timeout: 0.0,
            abilities: ["fireball", "frost_nova", "chain_lightning", "bone_spear", "blizzard"]
                .into_iter()
                .map(AbilityId::from)
                .collect(),
            ai_controlled: false,
            ..ActorArchetype::new("player", Faction::Player)
        },
        ActorArchetype {
            max_health: 50.0,
            move_speed: 3.5,
            attack_range: 1.5,
            attack_speed: 1.0,
            attack_damage: 6.0,
            detection_range: 10.0,
            aggression_timeout: 4.0,
            reward: 10,
            ..ActorArchetype::new("skeleton", Faction::Hostile)
        },
        ActorArchetype {
            max_health: 40.0,
            move_speed: 3.0,
            attack_range: 1.5,
            attack_speed: 0.8,
            attack_damage: 4.0,
            detection_range: 14.0,
            aggression_timeout: 6.0,
            special_ability: Some(AbilityId::from("shadow_bolt")),
            reward: 15,
            ..ActorArchetype::new("skeleton_mage", Faction::Hostile)
        },
        ActorArchetype {
            max_health: 300.0,
            move_speed: 2.0,
            attack_range: 2.5,
            attack_speed: 0.5,
            attack_damage: 25.0,
            detection_range: 8.0,
            persistent_aggression: true,
            special_ability: Some(AbilityId::from("ground_slam")),
            reward: 50,
            ..ActorArchetype::new("bone_golem", Faction::Hostile)
        },
        ActorArchetype {
            max_health: 80.0,
            move_speed: 4.0,
            attack_range: 1.5,
            attack_speed: 1.2,
            attack_damage: 8.0,
            detection_range: 10.0,
            aggression_timeout: 5.0,
            ..ActorArchetype::new("militia", Faction::Ally)
        },
    ]
}
