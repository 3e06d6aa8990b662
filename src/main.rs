//! Gloomcrawl - headless runner
//!
//! Builds a walled room, drops the player and a pack of monsters into it,
//! and runs the tick pipeline. Combat log lines go through `tracing`; a JSON
//! summary is printed at the end.

use std::cell::RefCell;
use std::rc::Rc;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use gloomcrawl::core::error::Result;
use gloomcrawl::core::types::{EntityId, TilePos};
use gloomcrawl::ecs::components::{
    Dead, Health, LootSource, MonsterData, MovementSpeed, RangedAttack, TileKind, Weapon, WeaponKind,
};
use gloomcrawl::events::{EventKind, GameEvent, LogChannel};
use gloomcrawl::{Simulation, SimulationConfig};

/// Headless dungeon runner
#[derive(Parser, Debug)]
#[command(name = "gloomcrawl")]
#[command(about = "Run the dungeon simulation without a renderer")]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Monsters to spawn
    #[arg(long, default_value_t = 6)]
    monsters: usize,

    /// Side of the square room in tiles
    #[arg(long, default_value_t = 24)]
    room: i32,

    /// Frames per second; sets the tick delta
    #[arg(long, default_value_t = 60.0)]
    fps: f32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// TOML file overriding simulation config
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

/// Totals gathered from the event stream
#[derive(Debug, Default, Serialize)]
struct RunSummary {
    seed: u64,
    ticks: u64,
    monsters_spawned: usize,
    monsters_killed: usize,
    monsters_remaining: usize,
    xp_awarded: u64,
    loot_dropped: usize,
    player_hp: i32,
    player_died: bool,
    tiles_discovered: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gloomcrawl=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SimulationConfig::from_toml_file(path)?,
        None => SimulationConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    tracing::info!("Gloomcrawl starting (seed {})", seed);

    let mut sim = Simulation::with_seed(config, seed)?;
    let summary = Rc::new(RefCell::new(RunSummary { seed, ..Default::default() }));
    subscribe_reporting(&mut sim, &summary);

    let (player, spawned) = build_dungeon(&mut sim, &args, seed);
    summary.borrow_mut().monsters_spawned = spawned;

    let weapon = sim.world.spawn();
    sim.world.insert(weapon, Weapon { kind: WeaponKind::Melee, min_damage: Some(4), max_damage: Some(9) });

    let delta = 1.0 / args.fps.max(1.0);
    let swing_every = ((args.fps as u64) / 2).max(1);
    for _ in 0..args.ticks {
        if sim.world.current_tick % swing_every == 0 {
            player_swing(&mut sim, player, weapon);
        }
        sim.tick(delta);
        if summary.borrow().player_died {
            tracing::info!("Player fell at tick {}", sim.world.current_tick);
            break;
        }
    }

    let mut summary = summary.borrow_mut();
    summary.ticks = sim.world.current_tick;
    summary.monsters_remaining = sim.world.ids::<MonsterData>().len();
    summary.player_hp = sim.world.get::<Health>(player).map(|h| h.hp).unwrap_or(0);

    if args.json {
        match serde_json::to_string_pretty(&*summary) {
            Ok(json) => println!("{}", json),
            Err(err) => tracing::error!("Failed to serialize summary: {}", err),
        }
    } else {
        println!("{:#?}", *summary);
    }
    Ok(())
}

/// Forward log events to tracing and count rewards
fn subscribe_reporting(sim: &mut Simulation, summary: &Rc<RefCell<RunSummary>>) {
    sim.bus.subscribe(EventKind::LogMessage, |_, event, _| {
        if let GameEvent::LogMessage { channel, message } = event {
            match channel {
                LogChannel::Combat => tracing::info!(target: "gloomcrawl::combat", "{}", message),
                LogChannel::Loot => tracing::info!(target: "gloomcrawl::loot", "{}", message),
                LogChannel::System => tracing::info!("{}", message),
            }
        }
        Ok(())
    });

    let totals = Rc::clone(summary);
    sim.bus.subscribe(EventKind::AwardXp, move |_, event, _| {
        if let GameEvent::AwardXp { amount } = event {
            let mut totals = totals.borrow_mut();
            totals.xp_awarded += u64::from(*amount);
            totals.monsters_killed += 1;
        }
        Ok(())
    });

    // Stands in for the loot system: claims the drop and clears its source
    let totals = Rc::clone(summary);
    sim.bus.subscribe(EventKind::DropLoot, move |world, event, _| {
        if let GameEvent::DropLoot { loot_source } = event {
            if let Some(loot) = world.get::<LootSource>(*loot_source) {
                tracing::debug!(target: "gloomcrawl::loot", "Tier {} drop from {}", loot.tier, loot.source);
                totals.borrow_mut().loot_dropped += 1;
            }
            world.despawn(*loot_source);
        }
        Ok(())
    });

    let totals = Rc::clone(summary);
    sim.bus.subscribe(EventKind::TilesDiscovered, move |_, event, _| {
        if let GameEvent::TilesDiscovered { total, .. } = event {
            totals.borrow_mut().tiles_discovered = *total;
        }
        Ok(())
    });

    let totals = Rc::clone(summary);
    sim.bus.subscribe(EventKind::PlayerDied, move |_, _, _| {
        totals.borrow_mut().player_died = true;
        Ok(())
    });
}

/// Walled square room with the player in the middle. Returns the player and
/// the number of monsters placed.
fn build_dungeon(sim: &mut Simulation, args: &Args, seed: u64) -> (EntityId, usize) {
    let size = args.room.max(5);
    let tile = sim.config.tile_size;
    for x in 0..size {
        for y in 0..size {
            let edge = x == 0 || y == 0 || x == size - 1 || y == size - 1;
            let kind = if edge { TileKind::Wall } else { TileKind::Floor };
            sim.world.spawn_tile(TilePos::new(x, y), kind);
        }
    }
    sim.world.spawn_level(1);

    let center = TilePos::new(size / 2, size / 2);
    let player = sim.world.spawn_player(center.to_pixel(tile));

    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);
    let mut spawned = 0;
    for i in 0..args.monsters {
        let spot = TilePos::new(rng.gen_range(1..size - 1), rng.gen_range(1..size - 1));
        if spot == center {
            continue;
        }
        let tier = rng.gen_range(1..=4);
        let mut data = MonsterData::new(format!("skeleton #{}", i + 1), tier, 2, 5);
        data.is_elite = rng.gen_bool(0.2);
        let monster = sim.world.spawn_monster(spot.to_pixel(tile), data, 20 + 10 * tier as i32);
        sim.world.insert(monster, MovementSpeed { pixels_per_second: 64.0 });
        if i % 3 == 2 {
            sim.world.insert(monster, RangedAttack { range: 3.0 });
        }
        spawned += 1;
    }
    (player, spawned)
}

/// Player attacks the nearest live monster in melee range
fn player_swing(sim: &mut Simulation, player: EntityId, weapon: EntityId) {
    let Some(pos) = sim.world.position(player) else {
        return;
    };
    let reach = sim.config.melee_range();
    let target = sim
        .world
        .iter::<MonsterData>()
        .map(|(id, _)| id)
        .filter(|&id| !sim.world.has::<Dead>(id))
        .filter_map(|id| sim.world.position(id).map(|p| (id, p.distance(&pos))))
        .filter(|&(_, d)| d <= reach)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id);

    if let Some(target) = target {
        let event = GameEvent::CalculateDamage { attacker: player, target, weapon: Some(weapon) };
        if let Err(err) = sim.publish(event) {
            tracing::warn!("Player attack failed: {}", err);
        }
    }
}
