//! Damage formulas and the `CalculateDamage` request handler
//!
//! Formulas are split into a roll (random) and an evaluation (pure) so the
//! evaluation can be tested exactly. Rolls are total: reversed bounds are
//! swapped and probabilities clamped, they never fail.

use rand::Rng;

use crate::core::config::SimulationConfig;
use crate::core::error::{CoreError, Result};
use crate::core::types::EntityId;
use crate::ecs::components::{Dead, MonsterData, Player, Stats, Weapon};
use crate::ecs::resources::HealthDelta;
use crate::ecs::world::World;
use crate::events::{GameEvent, LogChannel};

/// Weapon damage bounds when the weapon doesn't define them
pub const DEFAULT_WEAPON_MIN: u32 = 1;
pub const DEFAULT_WEAPON_MAX: u32 = 2;

/// Outcome of one damage roll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageRoll {
    pub amount: u32,
    pub critical: bool,
}

/// Inclusive uniform integer; tolerates `min > max`
pub fn roll_between<R: Rng + ?Sized>(rng: &mut R, min: u32, max: u32) -> u32 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    rng.gen_range(lo..=hi)
}

/// Player hitting a monster, given an already rolled weapon value
pub fn player_damage(
    base_roll: u32,
    level: u32,
    stats: &Stats,
    weapon: &Weapon,
    critical: bool,
    config: &SimulationConfig,
) -> u32 {
    let base = (base_roll + level) as f64;
    let (stat_bonus, primary_stat) = if weapon.is_ranged() {
        (stats.ranged_bonus, stats.intellect)
    } else {
        (stats.melee_bonus, stats.prowess)
    };
    let pre_crit = (base + stats.damage_bonus as f64 + stat_bonus as f64)
        * (1.0 + primary_stat as f64 * config.primary_stat_scaling);
    let total = if critical { pre_crit * config.player_crit_multiplier } else { pre_crit };
    total.round().max(0.0) as u32
}

pub fn roll_player_damage<R: Rng + ?Sized>(
    rng: &mut R,
    level: u32,
    stats: &Stats,
    weapon: &Weapon,
    config: &SimulationConfig,
) -> DamageRoll {
    let base_roll = roll_between(
        rng,
        weapon.min_damage.unwrap_or(DEFAULT_WEAPON_MIN),
        weapon.max_damage.unwrap_or(DEFAULT_WEAPON_MAX),
    );
    let chance = (stats.agility as f64 * config.agility_crit_chance).clamp(0.0, 1.0);
    let critical = rng.gen_bool(chance);
    DamageRoll {
        amount: player_damage(base_roll, level, stats, weapon, critical, config),
        critical,
    }
}

/// Monster base damage scaled by tier, before crit and mitigation
pub fn scaled_monster_damage(base: u32, tier: u32, config: &SimulationConfig) -> u32 {
    (base as f64 * (1.0 + tier as f64 * config.tier_damage_multiplier)).round() as u32
}

/// Monster hitting the player, given an already rolled base value
pub fn monster_damage(
    base: u32,
    tier: u32,
    armor: u32,
    defense: u32,
    critical: bool,
    config: &SimulationConfig,
) -> u32 {
    let scaled = scaled_monster_damage(base, tier, config) as f64;
    let pre_reduction = if critical { scaled * config.monster_crit_multiplier } else { scaled };

    let armor_reduction = if armor > 0 {
        let coefficient = config.armor_base_coefficient + config.armor_tier_coefficient * tier as f64 / 10.0;
        (pre_reduction * coefficient * armor as f64).floor().max(1.0)
    } else {
        0.0
    };
    let defense_reduction = (pre_reduction * config.defense_coefficient * defense as f64).round();

    (pre_reduction - armor_reduction - defense_reduction).round().max(0.0) as u32
}

pub fn roll_monster_damage<R: Rng + ?Sized>(
    rng: &mut R,
    monster: &MonsterData,
    target: &Stats,
    config: &SimulationConfig,
) -> DamageRoll {
    let base = roll_between(rng, monster.min_base_damage, monster.max_base_damage);
    let critical = rng.gen_range(0.0..100.0) >= config.monster_crit_threshold;
    DamageRoll {
        amount: monster_damage(base, monster.tier, target.armor, target.defense, critical, config),
        critical,
    }
}

/// Experience granted for a kill
pub fn experience_reward(max_hp: i32, monster: &MonsterData, config: &SimulationConfig) -> u32 {
    let raw = max_hp as f64 / 3.0
        + monster.min_base_damage as f64
        + monster.max_base_damage as f64 * 1.5;
    (raw * (1.0 + monster.tier as f64 * config.xp_tier_multiplier)).round().max(0.0) as u32
}

/// Handle one `CalculateDamage` request
///
/// Pushes a health delta instead of touching `Health`, then emits a log line
/// and the matching hit notification. Missing components on either side are
/// an upstream bug and come back as errors.
pub fn resolve_damage_request(
    world: &mut World,
    config: &SimulationConfig,
    attacker: EntityId,
    target: EntityId,
    weapon: Option<EntityId>,
    out: &mut Vec<GameEvent>,
) -> Result<()> {
    if world.has::<Dead>(target) {
        tracing::debug!("Ignoring hit on dead entity {}", target);
        return Ok(());
    }

    if let Some(player) = world.get::<Player>(attacker).copied() {
        let weapon_id = weapon.ok_or(CoreError::MissingWeapon(attacker))?;
        let weapon = *world.get::<Weapon>(weapon_id).ok_or_else(|| CoreError::missing::<Weapon>(weapon_id))?;
        let stats = *world.get::<Stats>(attacker).ok_or_else(|| CoreError::missing::<Stats>(attacker))?;
        let name = world
            .get::<MonsterData>(target)
            .map(|m| m.name.clone())
            .ok_or_else(|| CoreError::missing::<MonsterData>(target))?;

        let roll = roll_player_damage(&mut world.rng, player.level, &stats, &weapon, config);
        world.health_updates.push(HealthDelta { entity_id: target, amount: -(roll.amount as i32) });

        let crit = if roll.critical { " Critical hit!" } else { "" };
        out.push(GameEvent::log(LogChannel::Combat, format!("You hit the {} for {} damage.{}", name, roll.amount, crit)));
        out.push(GameEvent::MonsterWasHit { entity_id: target, attacker_id: attacker, damage_dealt: roll.amount });
        return Ok(());
    }

    if let Some(monster) = world.get::<MonsterData>(attacker).cloned() {
        let stats = *world.get::<Stats>(target).ok_or_else(|| CoreError::missing::<Stats>(target))?;

        let roll = roll_monster_damage(&mut world.rng, &monster, &stats, config);
        world.health_updates.push(HealthDelta { entity_id: target, amount: -(roll.amount as i32) });

        let verb = if roll.critical { "crushes" } else { "hits" };
        out.push(GameEvent::log(LogChannel::Combat, format!("The {} {} you for {} damage.", monster.name, verb, roll.amount)));
        out.push(GameEvent::PlayerWasHit { entity_id: target, attacker_id: attacker, damage_dealt: roll.amount });
        return Ok(());
    }

    Err(CoreError::InvalidAttacker(attacker))
}
