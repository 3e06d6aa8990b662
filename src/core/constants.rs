//! Simulation constants - the fixed values the default config is built from

// Map scale
pub const TILE_SIZE: f32 = 32.0;
pub const BUCKET_SIZE_TILES: u32 = 16;

// Monster behavior (tiles)
pub const AGGRO_RANGE_TILES: f32 = 4.0;
pub const MELEE_RANGE_TILES: f32 = 1.5;
pub const DETECTION_MARGIN_TILES: f32 = 2.0;
/// Passes without getting closer before a wander leg is abandoned
pub const WANDER_STALL_TICKS: u32 = 30;

// Timing (milliseconds)
pub const DEATH_REMOVAL_GRACE_MS: f64 = 200.0;
pub const DEATH_ANIMATION_MS: f64 = 600.0;
pub const IN_COMBAT_DURATION_MS: f64 = 5000.0;

// Monster -> player damage
pub const TIER_DAMAGE_MULTIPLIER: f64 = 0.20;
pub const ARMOR_BASE_COEFFICIENT: f64 = 0.02;
pub const ARMOR_TIER_COEFFICIENT: f64 = 0.001;
pub const DEFENSE_COEFFICIENT: f64 = 0.025;
pub const MONSTER_CRIT_THRESHOLD: f64 = 95.0;
pub const MONSTER_CRIT_MULTIPLIER: f64 = 1.2;

// Player -> monster damage
pub const PRIMARY_STAT_SCALING: f64 = 0.02;
pub const AGILITY_CRIT_CHANCE: f64 = 0.01;
pub const PLAYER_CRIT_MULTIPLIER: f64 = 1.5;

// Experience
pub const XP_TIER_MULTIPLIER: f64 = 0.1;

// Visibility (tiles)
pub const DEFAULT_LIGHT_RADIUS: u32 = 4;
pub const RENDER_RADIUS_MODIFIER: u32 = 2;
