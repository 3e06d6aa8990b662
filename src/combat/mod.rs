pub mod damage;
pub mod reactions;

pub use damage::{
    experience_reward, monster_damage, player_damage, resolve_damage_request, roll_monster_damage,
    roll_player_damage, DamageRoll,
};
