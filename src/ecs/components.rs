//! Component records and the component-type registry
//!
//! Components are plain data. An entity's role follows from which components
//! it carries: a monster is anything with [`MonsterData`], a wall is a
//! [`Tile`] of kind [`TileKind::Wall`], and so on.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Millis, TilePos, Vec2};
use crate::ecs::storage::ComponentStore;

/// Current pixel position. Written only by movement resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec2);

/// Position before the most recent committed move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastPosition(pub Vec2);

/// One-shot request to move toward a pixel target. Removed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementIntent {
    pub target: Vec2,
}

impl MovementIntent {
    pub fn toward(target: Vec2) -> Self {
        Self { target }
    }
}

/// Caps the distance covered per tick. Entities without it move the whole
/// intent in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementSpeed {
    pub pixels_per_second: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionContact {
    pub target_id: EntityId,
}

/// Contacts found by the collision pass this tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collision {
    pub contacts: Vec<CollisionContact>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hitbox {
    pub width: f32,
    pub height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Hitbox {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height, offset_x: 0.0, offset_y: 0.0 }
    }

    /// (min_x, min_y, max_x, max_y) of the box at `pos`
    pub fn bounds(&self, pos: Vec2) -> (f32, f32, f32, f32) {
        let min_x = pos.x + self.offset_x;
        let min_y = pos.y + self.offset_y;
        (min_x, min_y, min_x + self.width, min_y + self.height)
    }
}

/// Explicit monster behavior state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MonsterBehavior {
    #[default]
    Idle,
    Wandering {
        tile: TilePos,
        legs_remaining: u32,
        /// Closest whole-pixel distance to `tile` reached on this leg
        closest_px: u32,
        /// Consecutive passes without beating `closest_px`
        stalled_ticks: u32,
    },
    Pursuing,
    Attacking,
}

impl MonsterBehavior {
    /// Fresh wander leg toward `tile`
    pub fn wander(tile: TilePos, legs_remaining: u32) -> Self {
        MonsterBehavior::Wandering { tile, legs_remaining, closest_px: u32::MAX, stalled_ticks: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterData {
    pub name: String,
    pub tier: u32,
    pub is_boss: bool,
    pub is_elite: bool,
    /// One-way latch
    pub is_detected: bool,
    pub is_aggro: bool,
    pub behavior: MonsterBehavior,
    /// Monsters recruited by the last contagion query
    pub nearby_monsters: Vec<EntityId>,
    /// Health-bar fill, 0.0..=1.0
    pub hp_bar_width: f32,
    pub min_base_damage: u32,
    pub max_base_damage: u32,
    pub unique_items_dropped: Vec<String>,
}

impl MonsterData {
    pub fn new(name: impl Into<String>, tier: u32, min_base_damage: u32, max_base_damage: u32) -> Self {
        Self {
            name: name.into(),
            tier,
            is_boss: false,
            is_elite: false,
            is_detected: false,
            is_aggro: false,
            behavior: MonsterBehavior::Idle,
            nearby_monsters: Vec::new(),
            hp_bar_width: 1.0,
            min_base_damage,
            max_base_damage,
            unique_items_dropped: Vec::new(),
        }
    }

    pub fn is_wandering(&self) -> bool {
        matches!(self.behavior, MonsterBehavior::Wandering { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathState {
    New,
    Handling,
    Processed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dead {
    pub state: DeathState,
    pub expires_at: Millis,
}

/// Timed combat marker; presence blocks aggro demotion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InCombat {
    pub elapsed: Millis,
    pub duration: Millis,
}

impl InCombat {
    pub fn fresh(duration: Millis) -> Self {
        Self { elapsed: 0.0, duration }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub hp: i32,
    pub max_hp: i32,
    pub updated: bool,
}

impl Health {
    pub fn new(max_hp: i32) -> Self {
        Self { hp: max_hp, max_hp, updated: false }
    }

    pub fn fraction(&self) -> f32 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        (self.hp as f32 / self.max_hp as f32).clamp(0.0, 1.0)
    }
}

/// Attack cooldown in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttackSpeed {
    pub attack_speed: Millis,
    pub elapsed_since_last_attack: Millis,
}

impl AttackSpeed {
    pub fn new(attack_speed: Millis) -> Self {
        // Ready to swing on first contact
        Self { attack_speed, elapsed_since_last_attack: attack_speed }
    }

    pub fn ready(&self) -> bool {
        self.elapsed_since_last_attack >= self.attack_speed
    }
}

/// Ranged capability; range in tiles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangedAttack {
    pub range: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub armor: u32,
    pub defense: u32,
    pub prowess: u32,
    pub intellect: u32,
    pub agility: u32,
    pub damage_bonus: u32,
    pub melee_bonus: u32,
    pub ranged_bonus: u32,
}

/// Marks the player entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponKind {
    Melee,
    Ranged,
}

/// Weapon item; missing damage bounds fall back to 1..=2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub kind: WeaponKind,
    pub min_damage: Option<u32>,
    pub max_damage: Option<u32>,
}

impl Weapon {
    pub fn is_ranged(&self) -> bool {
        self.kind == WeaponKind::Ranged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalFacing {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facing(pub HorizontalFacing);

/// Marker: entity must be redrawn this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedsRender;

/// Marker: non-solid to everything that isn't itself a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Floor,
    Wall,
}

/// Map tile entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile(pub TileKind);

/// Pending drop, expanded into items by the loot system. Carries no
/// `Position`; whoever handles `DropLoot` owns the entity and despawns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootSource {
    pub source: EntityId,
    pub tier: u32,
    pub position: Vec2,
    pub is_boss: bool,
    pub guaranteed_items: Vec<String>,
}

/// Light carried by the player; drives the exploration radius (tiles)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSource {
    pub radius: u32,
}

/// Level entity marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonLevel {
    pub depth: u32,
}

/// Discovered tiles of one dungeon level. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exploration {
    pub discovered_floors: AHashSet<TilePos>,
    pub discovered_walls: AHashSet<TilePos>,
}

impl Exploration {
    pub fn is_discovered(&self, tile: &TilePos) -> bool {
        self.discovered_floors.contains(tile) || self.discovered_walls.contains(tile)
    }

    pub fn total(&self) -> usize {
        self.discovered_floors.len() + self.discovered_walls.len()
    }
}

/// Transient visible set, rebuilt from scratch on every qualifying tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    pub render_radius: u32,
    pub active_render_zone: AHashSet<TilePos>,
}

/// Implemented for every registered component type
pub trait Component: Sized + 'static {
    const KIND: ComponentKind;
    fn store(components: &Components) -> &ComponentStore<Self>;
    fn store_mut(components: &mut Components) -> &mut ComponentStore<Self>;
}

macro_rules! component_registry {
    ($($field:ident: $ty:ty => $kind:ident),* $(,)?) => {
        /// Stable identifier for each component type
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ComponentKind {
            $($kind),*
        }

        /// One sparse-set store per component type
        #[derive(Debug, Default)]
        pub struct Components {
            $($field: ComponentStore<$ty>,)*
        }

        impl Components {
            pub fn contains_kind(&self, entity: EntityId, kind: ComponentKind) -> bool {
                match kind {
                    $(ComponentKind::$kind => self.$field.contains(entity),)*
                }
            }

            pub fn ids_of(&self, kind: ComponentKind) -> &[EntityId] {
                match kind {
                    $(ComponentKind::$kind => self.$field.ids(),)*
                }
            }

            pub fn len_of(&self, kind: ComponentKind) -> usize {
                match kind {
                    $(ComponentKind::$kind => self.$field.len(),)*
                }
            }

            pub fn remove_all(&mut self, entity: EntityId) {
                $(self.$field.remove(entity);)*
            }
        }

        $(
            impl Component for $ty {
                const KIND: ComponentKind = ComponentKind::$kind;
                #[inline]
                fn store(components: &Components) -> &ComponentStore<Self> {
                    &components.$field
                }
                #[inline]
                fn store_mut(components: &mut Components) -> &mut ComponentStore<Self> {
                    &mut components.$field
                }
            }
        )*
    };
}

component_registry! {
    positions: Position => Position,
    last_positions: LastPosition => LastPosition,
    intents: MovementIntent => MovementIntent,
    speeds: MovementSpeed => MovementSpeed,
    collisions: Collision => Collision,
    hitboxes: Hitbox => Hitbox,
    monsters: MonsterData => MonsterData,
    dead: Dead => Dead,
    in_combat: InCombat => InCombat,
    health: Health => Health,
    attack_speeds: AttackSpeed => AttackSpeed,
    ranged_attacks: RangedAttack => RangedAttack,
    stats: Stats => Stats,
    players: Player => Player,
    weapons: Weapon => Weapon,
    facings: Facing => Facing,
    needs_render: NeedsRender => NeedsRender,
    projectiles: Projectile => Projectile,
    tiles: Tile => Tile,
    loot_sources: LootSource => LootSource,
    light_sources: LightSource => LightSource,
    levels: DungeonLevel => DungeonLevel,
    explorations: Exploration => Exploration,
    render_states: RenderState => RenderState,
}
