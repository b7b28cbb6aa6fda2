//! Skill variants and the executor that composes them
//!
//! A variant never subclasses its base ability. It is a short list of hooks
//! applied on top of a shared `AbilityDef`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::abilities::catalog::AbilityDef;
use crate::collab::DamageKind;
use crate::core::types::AbilityId;
use crate::status::StatusEffect;

/// Most hooks one variant may carry
pub const MAX_VARIANT_HOOKS: usize = 3;

fn unit_multiplier() -> f32 {
    1.0
}

/// Extra behavior when a cast hits a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HitExtra {
    ApplyStatus { status: StatusEffect },
    Knockback,
    /// Spawn another ability at the hit position
    SpawnChild { ability: AbilityId },
}

/// Extra behavior when a cast goes active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CreateExtra {
    /// Status applied to the caster
    CasterStatus { status: StatusEffect },
    /// Area damage at the aim point after `delay` seconds
    DelayedBurst {
        delay: f32,
        radius: f32,
        damage: f32,
        #[serde(default, rename = "school")]
        kind: DamageKind,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hook", rename_all = "snake_case")]
pub enum VariantHook {
    ModifyDamage {
        #[serde(default = "unit_multiplier")]
        multiplier: f32,
        #[serde(default)]
        kind: Option<DamageKind>,
    },
    OnHitExtra { extra: HitExtra },
    OnCreateExtra { extra: CreateExtra },
}

/// Named set of hooks layered on a base ability
#[derive(Debug, Clone, PartialEq)]
pub struct SkillVariant {
    name: String,
    hooks: Vec<VariantHook>,
}

impl SkillVariant {
    /// Hooks past `MAX_VARIANT_HOOKS` are dropped with a warning
    pub fn new(name: impl Into<String>, mut hooks: Vec<VariantHook>) -> Self {
        let name = name.into();
        if hooks.len() > MAX_VARIANT_HOOKS {
            tracing::warn!(
                "Variant '{}' has {} hooks, keeping the first {}",
                name,
                hooks.len(),
                MAX_VARIANT_HOOKS
            );
            hooks.truncate(MAX_VARIANT_HOOKS);
        }
        Self { name, hooks }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hooks(&self) -> &[VariantHook] {
        &self.hooks
    }

    /// Fold every `ModifyDamage` hook over a base amount and school
    pub fn modify_damage(&self, amount: f32, kind: DamageKind) -> (f32, DamageKind) {
        self.hooks.iter().fold((amount, kind), |(amount, kind), hook| match hook {
            VariantHook::ModifyDamage { multiplier, kind: over } => {
                (amount * multiplier, over.unwrap_or(kind))
            }
            _ => (amount, kind),
        })
    }

    pub fn hit_extras(&self) -> impl Iterator<Item = &HitExtra> {
        self.hooks.iter().filter_map(|hook| match hook {
            VariantHook::OnHitExtra { extra } => Some(extra),
            _ => None,
        })
    }

    pub fn create_extras(&self) -> impl Iterator<Item = &CreateExtra> {
        self.hooks.iter().filter_map(|hook| match hook {
            VariantHook::OnCreateExtra { extra } => Some(extra),
            _ => None,
        })
    }
}

/// A castable ability: the shared base definition plus an optional variant
#[derive(Debug, Clone)]
pub struct SkillExecutor {
    id: AbilityId,
    def: Arc<AbilityDef>,
    variant: Option<Arc<SkillVariant>>,
}

impl SkillExecutor {
    pub fn base(def: Arc<AbilityDef>) -> Self {
        Self {
            id: def.id.clone(),
            def,
            variant: None,
        }
    }

    pub fn with_variant(id: AbilityId, def: Arc<AbilityDef>, variant: SkillVariant) -> Self {
        Self {
            id,
            def,
            variant: Some(Arc::new(variant)),
        }
    }

    /// Id this executor is cast by (the variant's id for variants)
    pub fn id(&self) -> &AbilityId {
        &self.id
    }

    pub fn def(&self) -> &AbilityDef {
        &self.def
    }

    pub fn variant(&self) -> Option<&SkillVariant> {
        self.variant.as_deref()
    }

    /// Damage and school of one hit before falloff and caster power
    pub fn hit_damage(&self) -> (f32, DamageKind) {
        let base = (self.def.damage, self.def.damage_kind);
        match &self.variant {
            Some(variant) => variant.modify_damage(base.0, base.1),
            None => base,
        }
    }

    pub fn knocks_back(&self) -> bool {
        self.def.knockback
            || self
                .variant()
                .map(|v| v.hit_extras().any(|e| matches!(e, HitExtra::Knockback)))
                .unwrap_or(false)
    }

    /// Statuses applied to each target hit: base first, then the variant's
    pub fn hit_statuses(&self) -> impl Iterator<Item = &StatusEffect> {
        let extra = self.variant().into_iter().flat_map(|v| {
            v.hit_extras().filter_map(|e| match e {
                HitExtra::ApplyStatus { status } => Some(status),
                _ => None,
            })
        });
        self.def.on_hit.iter().chain(extra)
    }

    pub fn child_abilities(&self) -> impl Iterator<Item = &AbilityId> {
        self.variant().into_iter().flat_map(|v| {
            v.hit_extras().filter_map(|e| match e {
                HitExtra::SpawnChild { ability } => Some(ability),
                _ => None,
            })
        })
    }

    pub fn create_extras(&self) -> impl Iterator<Item = &CreateExtra> {
        self.variant().into_iter().flat_map(|v| v.create_extras())
    }
}
