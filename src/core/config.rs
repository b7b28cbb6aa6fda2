//! Combat configuration with documented constants
//!
//! Every timing value here is in game-clock seconds, never frames, so the
//! simulation behaves the same at 30 or 144 updates per second.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{CombatError, Result};

/// Tunables shared by every actor and effect in a `CombatWorld`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    // === ACTOR TIMING ===
    /// How long a knockback stuns and displaces an actor
    ///
    /// During this window the actor neither moves on its own nor attacks.
    pub knockback_duration: f32,

    /// Displacement speed while knocked back (world units per second)
    pub knockback_speed: f32,

    /// Upper bound on the time an actor spends in the Attacking state
    ///
    /// Fast attackers use `1 / attack_speed` when that is shorter, so the
    /// recovery window never outlasts the attack cooldown.
    pub attack_recovery: f32,

    /// Safety timeout before a dead actor is removed
    ///
    /// Removal normally follows the death-animation signal. If that signal is
    /// lost, the actor is removed after this long anyway.
    pub death_safety_timeout: f32,

    // === EFFECTS ===
    /// Delay between an effect's disposal and its fade-out notification
    pub effect_fade_delay: f32,

    /// Maximum nesting of child effects spawned by other effects
    pub max_child_depth: u8,

    /// Maximum concurrent status effects on a single actor
    ///
    /// New effects beyond the cap are dropped with a warning.
    pub max_status_effects: usize,

    // === SPATIAL ===
    /// Cell size of the default spatial hash (world units)
    ///
    /// Roughly the typical detection range; smaller cells mean more cells
    /// to visit per query, larger ones mean more candidates to filter.
    pub grid_cell_size: f32,

    // === EVENTS ===
    /// Number of combat events kept before the oldest are discarded
    pub event_log_capacity: usize,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            knockback_duration: 0.3,
            knockback_speed: 6.0,
            attack_recovery: 0.4,
            death_safety_timeout: 3.0,

            effect_fade_delay: 0.5,
            max_child_depth: 2,
            max_status_effects: 64,

            grid_cell_size: 8.0,

            event_log_capacity: 1024,
        }
    }
}

impl CombatConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: CombatConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("knockback_duration", self.knockback_duration),
            ("attack_recovery", self.attack_recovery),
            ("death_safety_timeout", self.death_safety_timeout),
            ("effect_fade_delay", self.effect_fade_delay),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(CombatError::InvalidConfig(format!(
                    "{} must be a non-negative number of seconds (got {})",
                    name, value
                )));
            }
        }

        if !self.grid_cell_size.is_finite() || self.grid_cell_size <= 0.0 {
            return Err(CombatError::InvalidConfig(format!(
                "grid_cell_size must be positive (got {})",
                self.grid_cell_size
            )));
        }

        if self.knockback_speed < 0.0 {
            return Err(CombatError::InvalidConfig(
                "knockback_speed must not be negative".into(),
            ));
        }

        if self.max_status_effects == 0 {
            return Err(CombatError::InvalidConfig(
                "max_status_effects must allow at least one effect".into(),
            ));
        }

        Ok(())
    }
}
