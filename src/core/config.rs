//! Simulation configuration with documented constants
//!
//! Every tunable the tick pipeline reads is collected here. Defaults come
//! from [`crate::core::constants`]; a TOML file may override any subset.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::constants::*;
use crate::core::error::{CoreError, Result};

/// Configuration for the simulation systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === MAP SCALE ===
    /// Side of one tile in pixels
    pub tile_size: f32,

    /// Side of one spatial bucket in tiles
    ///
    /// Bucket pixels = bucket_tiles * tile_size. Larger buckets mean fewer
    /// lookups per query but more candidates to distance-filter.
    pub bucket_tiles: u32,

    // === MONSTER BEHAVIOR ===
    /// Distance (tiles) at which a monster engages the player
    ///
    /// Also the contagion radius: an aggroed monster recruits every other
    /// monster within this range of itself.
    pub aggro_range_tiles: f32,

    /// Distance (tiles) at which a monster stops and swings
    pub melee_range_tiles: f32,

    /// Extra tiles beyond aggro range at which a monster counts as detected
    pub detection_margin_tiles: f32,

    /// Idle wandering. Off by default.
    pub wander_enabled: bool,

    /// Per-tick probability that an idle monster starts wandering
    pub wander_chance: f64,

    /// Maximum tile offset (each axis) of a wander destination
    pub wander_max_offset_tiles: i32,

    /// Maximum number of legs in one wander before returning to idle
    pub wander_max_legs: u32,

    // === TIMING (ms) ===
    /// Extra time after `Dead.expires_at` before removal is forced
    pub death_removal_grace_ms: f64,

    /// Length of the death animation; sets `Dead.expires_at`
    pub death_animation_ms: f64,

    /// Lifetime of an `InCombat` marker
    pub in_combat_duration_ms: f64,

    // === COLLISION ===
    /// Radius (pixels) used to gather collision candidates from the index
    ///
    /// Must cover the largest hitbox pair, measured between top-left corners.
    pub collision_query_radius: f32,

    // === VISIBILITY ===
    /// Exploration radius (tiles) when no light source component is present
    pub default_light_radius: u32,

    /// Added to the exploration radius to get the render radius
    pub render_radius_modifier: u32,

    // === DAMAGE ===
    pub tier_damage_multiplier: f64,
    pub armor_base_coefficient: f64,
    pub armor_tier_coefficient: f64,
    pub defense_coefficient: f64,
    pub monster_crit_threshold: f64,
    pub monster_crit_multiplier: f64,
    pub primary_stat_scaling: f64,
    pub agility_crit_chance: f64,
    pub player_crit_multiplier: f64,
    pub xp_tier_multiplier: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            bucket_tiles: BUCKET_SIZE_TILES,

            aggro_range_tiles: AGGRO_RANGE_TILES,
            melee_range_tiles: MELEE_RANGE_TILES,
            detection_margin_tiles: DETECTION_MARGIN_TILES,
            wander_enabled: false,
            wander_chance: 0.002,
            wander_max_offset_tiles: 3,
            wander_max_legs: 3,

            death_removal_grace_ms: DEATH_REMOVAL_GRACE_MS,
            death_animation_ms: DEATH_ANIMATION_MS,
            in_combat_duration_ms: IN_COMBAT_DURATION_MS,

            collision_query_radius: TILE_SIZE * 3.0,

            default_light_radius: DEFAULT_LIGHT_RADIUS,
            render_radius_modifier: RENDER_RADIUS_MODIFIER,

            tier_damage_multiplier: TIER_DAMAGE_MULTIPLIER,
            armor_base_coefficient: ARMOR_BASE_COEFFICIENT,
            armor_tier_coefficient: ARMOR_TIER_COEFFICIENT,
            defense_coefficient: DEFENSE_COEFFICIENT,
            monster_crit_threshold: MONSTER_CRIT_THRESHOLD,
            monster_crit_multiplier: MONSTER_CRIT_MULTIPLIER,
            primary_stat_scaling: PRIMARY_STAT_SCALING,
            agility_crit_chance: AGILITY_CRIT_CHANCE,
            player_crit_multiplier: PLAYER_CRIT_MULTIPLIER,
            xp_tier_multiplier: XP_TIER_MULTIPLIER,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) TOML document and validate the result
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn bucket_pixels(&self) -> f32 {
        self.bucket_tiles as f32 * self.tile_size
    }

    pub fn aggro_range(&self) -> f32 {
        self.aggro_range_tiles * self.tile_size
    }

    pub fn melee_range(&self) -> f32 {
        self.melee_range_tiles * self.tile_size
    }

    pub fn detection_range(&self) -> f32 {
        (self.aggro_range_tiles + self.detection_margin_tiles) * self.tile_size
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.tile_size < 1.0 {
            return Err(CoreError::InvalidConfig(format!(
                "tile_size ({}) must be at least one pixel",
                self.tile_size
            )));
        }

        if self.bucket_tiles == 0 {
            return Err(CoreError::InvalidConfig("bucket_tiles must be positive".into()));
        }

        if self.melee_range_tiles >= self.aggro_range_tiles {
            return Err(CoreError::InvalidConfig(format!(
                "melee_range_tiles ({}) should be < aggro_range_tiles ({})",
                self.melee_range_tiles, self.aggro_range_tiles
            )));
        }

        if !(0.0..=1.0).contains(&self.wander_chance) {
            return Err(CoreError::InvalidConfig(format!(
                "wander_chance ({}) must be a probability",
                self.wander_chance
            )));
        }

        if self.death_removal_grace_ms < 0.0 || self.in_combat_duration_ms <= 0.0 {
            return Err(CoreError::InvalidConfig("timing values must be positive".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bucket_pixels(), 512.0);
        assert_eq!(config.aggro_range(), 128.0);
        assert_eq!(config.melee_range(), 48.0);
        assert_eq!(config.detection_range(), 192.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str("wander_enabled = true\naggro_range_tiles = 5.0")
            .expect("valid toml");
        assert!(config.wander_enabled);
        assert_eq!(config.aggro_range_tiles, 5.0);
        assert_eq!(config.tile_size, TILE_SIZE);
    }

    #[test]
    fn test_melee_beyond_aggro_rejected() {
        let result = SimulationConfig::from_toml_str("melee_range_tiles = 6.0");
        assert!(matches!(result, Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = SimulationConfig::from_toml_str("tile_size = \"big\"");
        assert!(matches!(result, Err(CoreError::ConfigParse(_))));
    }
}
