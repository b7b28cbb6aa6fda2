//! Skill casts: targeting, variants and live effect instances

pub mod instance;
pub mod targeting;
pub mod variant;

pub use instance::{
    ChildSpawn, EffectInstance, EffectPhase, KnockbackGrant, SkillOutput, StatusGrant, TimerRequest,
};
pub use targeting::{HitSet, TargetingContext, TargetingShape};
pub use variant::{CreateExtra, HitExtra, SkillExecutor, SkillVariant, VariantHook, MAX_VARIANT_HOOKS};
