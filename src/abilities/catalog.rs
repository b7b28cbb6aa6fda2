//! Ability definitions and the catalog that holds them
//!
//! The catalog starts from a built-in table and can be extended or
//! overridden from `data/abilities.toml`.

use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::collab::DamageKind;
use crate::core::error::{CombatError, Result};
use crate::core::types::AbilityId;
use crate::skills::targeting::TargetingShape;
use crate::skills::variant::{CreateExtra, HitExtra, SkillExecutor, SkillVariant, VariantHook};
use crate::status::{ControlKind, EffectOp, StackPolicy, Stat, StatusEffect};

/// Static description of one ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDef {
    pub id: AbilityId,
    #[serde(default)]
    pub cooldown: f32,
    /// Windup before the cast goes active
    #[serde(default)]
    pub cast_time: f32,
    /// How long the cast stays active after the windup
    #[serde(default)]
    pub duration: f32,
    /// Re-strike interval while active (areas only)
    #[serde(default)]
    pub pulse_interval: Option<f32>,
    /// Max distance from caster to aim point; 0 means self-centered
    #[serde(default)]
    pub range: f32,
    pub shape: TargetingShape,
    #[serde(default)]
    pub damage: f32,
    #[serde(default)]
    pub damage_kind: DamageKind,
    #[serde(default)]
    pub on_hit: Vec<StatusEffect>,
    #[serde(default)]
    pub knockback: bool,
    /// Status on the caster for the length of the windup
    #[serde(default)]
    pub windup_status: Option<StatusEffect>,
}

impl AbilityDef {
    pub fn new(id: impl Into<String>, shape: TargetingShape) -> Self {
        Self {
            id: AbilityId::new(id),
            cooldown: 0.0,
            cast_time: 0.0,
            duration: 0.0,
            pulse_interval: None,
            range: 0.0,
            shape,
            damage: 0.0,
            damage_kind: DamageKind::Physical,
            on_hit: Vec::new(),
            knockback: false,
            windup_status: None,
        }
    }

    pub fn is_self_centered(&self) -> bool {
        self.range <= 0.0
    }

    /// Clamp nonsense values to something castable
    fn sanitized(mut self) -> Self {
        let fix = |value: f32, field: &str, id: &AbilityId| {
            if value.is_finite() && value >= 0.0 {
                value
            } else {
                tracing::warn!("Ability '{}' has invalid {} {}, using 0", id, field, value);
                0.0
            }
        };
        self.cooldown = fix(self.cooldown, "cooldown", &self.id);
        self.cast_time = fix(self.cast_time, "cast_time", &self.id);
        self.duration = fix(self.duration, "duration", &self.id);
        self.range = fix(self.range, "range", &self.id);
        self.damage = fix(self.damage, "damage", &self.id);
        if let Some(interval) = self.pulse_interval {
            if !interval.is_finite() || interval <= 0.0 {
                tracing::warn!("Ability '{}' has invalid pulse interval, disabling pulses", self.id);
                self.pulse_interval = None;
            }
        }
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
struct VariantDef {
    id: AbilityId,
    base: AbilityId,
    #[serde(default)]
    hooks: Vec<VariantHook>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    abilities: Vec<AbilityDef>,
    #[serde(default)]
    variants: Vec<VariantDef>,
}

/// Every castable ability, base and variant, by id
#[derive(Debug, Clone, Default)]
pub struct AbilityCatalog {
    executors: AHashMap<AbilityId, SkillExecutor>,
}

impl AbilityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in abilities and variants
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for def in builtin_abilities() {
            catalog.insert(def);
        }
        for (id, base, hooks) in builtin_variants() {
            // Bases are inserted above
            if let Err(e) = catalog.insert_variant(AbilityId::from(id), &AbilityId::from(base), hooks) {
                tracing::warn!("Built-in variant '{}' skipped: {}", id, e);
            }
        }
        catalog
    }

    /// Parse a catalog file; variants may reference abilities from the same file
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut catalog = Self::new();
        catalog.merge_toml_str(contents)?;
        Ok(catalog)
    }

    /// Add (or override) abilities and variants from TOML
    pub fn merge_toml_str(&mut self, contents: &str) -> Result<()> {
        let file: CatalogFile = toml::from_str(contents)?;
        for def in file.abilities {
            self.insert(def);
        }
        for variant in file.variants {
            self.insert_variant(variant.id, &variant.base, variant.hooks)?;
        }
        Ok(())
    }

    /// Built-ins overlaid with the contents of `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut catalog = Self::builtin();
        catalog.merge_toml_str(&contents)?;
        tracing::info!("Loaded ability catalog ({} abilities)", catalog.len());
        Ok(catalog)
    }

    pub fn insert(&mut self, def: AbilityDef) {
        let def = def.sanitized();
        let id = def.id.clone();
        self.executors.insert(id, SkillExecutor::base(Arc::new(def)));
    }

    /// Register `id` as `base` plus hooks. The base must already be present.
    pub fn insert_variant(&mut self, id: AbilityId, base: &AbilityId, hooks: Vec<VariantHook>) -> Result<()> {
        let def = self
            .executors
            .get(base)
            .filter(|exec| exec.variant().is_none())
            .map(|exec| Arc::new(exec.def().clone()))
            .ok_or_else(|| CombatError::UnknownAbility(base.to_string()))?;
        let variant = SkillVariant::new(id.as_str(), hooks);
        self.executors
            .insert(id.clone(), SkillExecutor::with_variant(id, def, variant));
        Ok(())
    }

    pub fn get(&self, id: &AbilityId) -> Option<&SkillExecutor> {
        self.executors.get(id)
    }

    pub fn contains(&self, id: &AbilityId) -> bool {
        self.executors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    /// Ids in sorted order
    pub fn ids(&self) -> Vec<AbilityId> {
        let mut ids: Vec<AbilityId> = self.executors.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Any status template with this id, searched across every ability.
    /// Used to rebuild statuses from persisted records.
    pub fn status_template(&self, id: &str) -> Option<&StatusEffect> {
        let mut ids: Vec<&AbilityId> = self.executors.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|ability| self.executors.get(ability))
            .find_map(|exec| {
                exec.hit_statuses()
                    .chain(exec.def().windup_status.iter())
                    .chain(exec.create_extras().filter_map(|extra| match extra {
                        CreateExtra::CasterStatus { status } => Some(status),
                        _ => None,
                    }))
                    .find(|status| status.id == id)
            })
    }
}

fn chill() -> StatusEffect {
    StatusEffect::slow("chill", 0.3, 3.0).with_policy(StackPolicy::Stack)
}

fn builtin_abilities() -> Vec<AbilityDef> {
    vec![
        AbilityDef {
            cooldown: 4.0,
            cast_time: 0.6,
            range: 12.0,
            damage: 30.0,
            damage_kind: DamageKind::Fire,
            on_hit: vec![StatusEffect::damage_over_time("burn", 5.0, 3.0, 1.0, DamageKind::Fire)],
            ..AbilityDef::new("fireball", TargetingShape::Radius { radius: 2.5 })
        },
        AbilityDef {
            cooldown: 8.0,
            duration: 1.5,
            damage: 10.0,
            damage_kind: DamageKind::Frost,
            on_hit: vec![chill()],
            ..AbilityDef::new("frost_nova", TargetingShape::Radius { radius: 4.0 })
        },
        AbilityDef {
            cooldown: 6.0,
            cast_time: 0.4,
            range: 10.0,
            damage: 24.0,
            damage_kind: DamageKind::Lightning,
            ..AbilityDef::new(
                "chain_lightning",
                TargetingShape::Chain { range: 6.0, count: 3, falloff: 0.75 },
            )
        },
        AbilityDef {
            cooldown: 3.0,
            cast_time: 0.5,
            range: 14.0,
            damage: 12.0,
            damage_kind: DamageKind::Shadow,
            on_hit: vec![StatusEffect::damage_over_time("shadow_rot", 4.0, 4.0, 1.0, DamageKind::Shadow)],
            ..AbilityDef::new("shadow_bolt", TargetingShape::Point)
        },
        AbilityDef {
            cooldown: 5.0,
            cast_time: 0.3,
            range: 10.0,
            damage: 20.0,
            knockback: true,
            ..AbilityDef::new("bone_spear", TargetingShape::Line { length: 10.0, width: 1.5 })
        },
        AbilityDef {
            cooldown: 12.0,
            cast_time: 0.8,
            duration: 3.0,
            pulse_interval: Some(0.5),
            range: 12.0,
            damage: 6.0,
            damage_kind: DamageKind::Frost,
            on_hit: vec![chill()],
            ..AbilityDef::new("blizzard", TargetingShape::Radius { radius: 3.5 })
        },
        AbilityDef {
            cooldown: 7.0,
            cast_time: 0.5,
            damage: 15.0,
            knockback: true,
            windup_status: Some(
                StatusEffect::new("bracing", 0.5)
                    .on_apply(EffectOp::ModifyStat { stat: Stat::MoveSpeed, amount: -0.5 }),
            ),
            ..AbilityDef::new("ground_slam", TargetingShape::Radius { radius: 3.0 })
        },
        AbilityDef {
            cooldown: 10.0,
            cast_time: 0.2,
            range: 8.0,
            on_hit: vec![StatusEffect::control("stunned", ControlKind::Stun, 1.0)],
            ..AbilityDef::new("stun_bolt", TargetingShape::Point)
        },
        AbilityDef {
            duration: 2.0,
            pulse_interval: Some(0.5),
            damage: 4.0,
            damage_kind: DamageKind::Fire,
            ..AbilityDef::new("burning_ground", TargetingShape::Radius { radius: 2.0 })
        },
    ]
}

fn builtin_variants() -> Vec<(&'static str, &'static str, Vec<VariantHook>)> {
    vec![
        (
            "chain_lightning_frost",
            "chain_lightning",
            vec![
                VariantHook::ModifyDamage { multiplier: 0.8, kind: Some(DamageKind::Frost) },
                VariantHook::OnHitExtra { extra: HitExtra::ApplyStatus { status: chill() } },
            ],
        ),
        (
            "fireball_inferno",
            "fireball",
            vec![
                VariantHook::ModifyDamage { multiplier: 1.2, kind: None },
                VariantHook::OnHitExtra {
                    extra: HitExtra::SpawnChild { ability: AbilityId::from("burning_ground") },
                },
            ],
        ),
        (
            "frost_nova_shatter",
            "frost_nova",
            vec![VariantHook::OnCreateExtra {
                extra: CreateExtra::DelayedBurst {
                    delay: 1.0,
                    radius: 4.0,
                    damage: 12.0,
                    kind: DamageKind::Frost,
                },
            }],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_bases_and_variants() {
        let catalog = AbilityCatalog::builtin();
        for id in ["fireball", "frost_nova", "chain_lightning", "shadow_bolt", "bone_spear", "blizzard"] {
            assert!(catalog.contains(&AbilityId::from(id)), "missing {}", id);
        }
        let frost = catalog.get(&AbilityId::from("chain_lightning_frost")).unwrap();
        assert_eq!(frost.def().id.as_str(), "chain_lightning");
        assert!(frost.variant().is_some());
    }

    #[test]
    fn test_variant_requires_base() {
        let mut catalog = AbilityCatalog::new();
        let err = catalog.insert_variant(AbilityId::from("x"), &AbilityId::from("missing"), vec![]);
        assert!(matches!(err, Err(CombatError::UnknownAbility(_))));
    }

    #[test]
    fn test_sanitize_bad_values() {
        let mut catalog = AbilityCatalog::new();
        catalog.insert(AbilityDef {
            cooldown: -3.0,
            damage: f32::NAN,
            pulse_interval: Some(0.0),
            ..AbilityDef::new("broken", TargetingShape::Point)
        });
        let def = catalog.get(&AbilityId::from("broken")).unwrap().def();
        assert_eq!(def.cooldown, 0.0);
        assert_eq!(def.damage, 0.0);
        assert_eq!(def.pulse_interval, None);
    }

    #[test]
    fn test_from_toml_str() {
        let catalog = AbilityCatalog::from_toml_str(
            r#"
            [[abilities]]
            id = "spark"
            cooldown = 1.0
            range = 6.0
            damage = 5.0
            damage_kind = "lightning"
            shape = { kind = "chain", range = 4.0, count = 2, falloff = 0.5 }

            [[variants]]
            id = "spark_heavy"
            base = "spark"
            hooks = [{ hook = "modify_damage", multiplier = 2.0 }]
            "#,
        )
        .unwrap();
        assert_eq!(catalog.ids(), vec![AbilityId::from("spark"), AbilityId::from("spark_heavy")]);
        let heavy = catalog.get(&AbilityId::from("spark_heavy")).unwrap();
        assert_eq!(heavy.hit_damage(), (10.0, DamageKind::Lightning));
    }

    #[test]
    fn test_status_template_lookup() {
        let catalog = AbilityCatalog::builtin();
        assert_eq!(catalog.status_template("burn").map(|s| s.duration), Some(3.0));
        assert!(catalog.status_template("bracing").is_some());
        assert!(catalog.status_template("nothing").is_none());
    }

    #[test]
    fn test_load_data_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/abilities.toml");
        let catalog = AbilityCatalog::load(path).unwrap();
        assert!(catalog.contains(&AbilityId::from("fireball")));
        assert!(catalog.contains(&AbilityId::from("poison_nova")));
    }
}
