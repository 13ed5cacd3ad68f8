//! Engine tunables. Every field has a default so a partial JSON document
//! only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::adventure::rng::DETERMINISTIC_BLEND;
use crate::error::CoreError;

/// How many templates each category contributes to the pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateCounts {
    pub normal: usize,
    pub lucky: usize,
    pub secret_realm: usize,
    pub sect_challenge: usize,
}

impl Default for TemplateCounts {
    fn default() -> Self {
        // 60 / 10 / 25 / 5
        Self {
            normal: 600,
            lucky: 100,
            secret_realm: 250,
            sect_challenge: 50,
        }
    }
}

impl TemplateCounts {
    pub fn total(&self) -> usize {
        self.normal + self.lucky + self.secret_realm + self.sect_challenge
    }
}

/// Chance that an adventure of each category is resolved as a battle
/// instead of a template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleChances {
    pub normal: f64,
    pub lucky: f64,
    pub secret_realm: f64,
    pub sect_challenge: f64,
}

impl Default for BattleChances {
    fn default() -> Self {
        Self {
            normal: 0.25,
            lucky: 0.0,
            secret_realm: 0.35,
            sect_challenge: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub template_counts: TemplateCounts,
    /// Maximum number of ultimate rules a player may hold.
    pub max_rules: usize,
    pub max_inheritance_level: u32,
    /// Share of a blended draw that comes from the seeded generator; the
    /// rest comes from the caller's true random source.
    pub deterministic_blend: f64,
    /// Chance of a technique unlock when the story does not mention one.
    pub art_base_chance: f64,
    /// Per-action drop chance for advanced materials, tier 1 to 4.
    pub advanced_drop_chances: [f64; 4],
    pub battle_chances: BattleChances,
    /// Log reputation events and move on instead of asking the player.
    pub skip_reputation_events: bool,
    pub harvest_interval_ms: u64,
    pub harvest_debounce_ms: u64,
    /// Emit content-integrity diagnostics.
    pub diagnostics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_counts: TemplateCounts::default(),
            max_rules: 3,
            max_inheritance_level: 4,
            deterministic_blend: DETERMINISTIC_BLEND,
            art_base_chance: 0.06,
            advanced_drop_chances: [0.03, 0.02, 0.01, 0.005],
            battle_chances: BattleChances::default(),
            skip_reputation_events: false,
            harvest_interval_ms: 30_000,
            harvest_debounce_ms: 5_000,
            diagnostics: cfg!(debug_assertions),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.template_counts.total() == 0 {
            return Err(CoreError::invalid_config("template pool would be empty"));
        }
        if self.max_rules == 0 {
            return Err(CoreError::invalid_config("max_rules must be at least 1"));
        }
        let probabilities = [
            ("deterministic_blend", self.deterministic_blend),
            ("art_base_chance", self.art_base_chance),
            ("battle_chances.normal", self.battle_chances.normal),
            ("battle_chances.lucky", self.battle_chances.lucky),
            ("battle_chances.secret_realm", self.battle_chances.secret_realm),
            ("battle_chances.sect_challenge", self.battle_chances.sect_challenge),
        ];
        for (name, p) in probabilities
            .into_iter()
            .chain(self.advanced_drop_chances.iter().map(|&p| ("advanced_drop_chances", p)))
        {
            if !(0.0..=1.0).contains(&p) {
                return Err(CoreError::invalid_config(format!(
                    "{} must be within [0, 1], got {}",
                    name, p
                )));
            }
        }
        if self.harvest_debounce_ms > self.harvest_interval_ms {
            return Err(CoreError::invalid_config(
                "harvest_debounce_ms cannot exceed harvest_interval_ms",
            ));
        }
        Ok(())
    }
}
