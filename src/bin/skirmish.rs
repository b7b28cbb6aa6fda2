//! Headless Skirmish Runner
//!
//! One player against waves of undead. The player casts a random ready
//! ability at the nearest enemy each tick; everything else is AI. Prints a
//! JSON summary at the end.

use ashfall::abilities::AbilityCatalog;
use ashfall::actor::{ArchetypeTable, Faction};
use ashfall::collab::{FlatTerrain, NullNotifier, StandardResolver};
use ashfall::core::types::{planar_distance, AbilityId, ActorId, Vec3};
use ashfall::simulation::CombatEvent;
use ashfall::spatial::SparseHashGrid;
use ashfall::{CombatConfig, CombatWorld, Result};
use clap::Parser;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Headless Skirmish - player vs undead, AI on the other side
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Run a headless combat skirmish and print a JSON summary")]
struct Args {
    /// Combat tuning file (TOML)
    #[arg(long)]
    config: Option<String>,

    /// Extra abilities and variants (TOML), merged over the built-ins
    #[arg(long)]
    abilities: Option<String>,

    /// Extra archetypes (TOML), merged over the built-ins
    #[arg(long)]
    archetypes: Option<String>,

    /// Enemies to spawn
    #[arg(long, default_value_t = 12)]
    enemies: usize,

    /// Maximum ticks before the skirmish ends in a draw
    #[arg(long, default_value_t = 3600)]
    max_ticks: u64,

    /// Ticks per second of game time
    #[arg(long, default_value_t = 30)]
    tick_rate: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Include every logged event in the output
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Serialize)]
struct SkirmishResult {
    outcome: String,
    seed: u64,
    ticks: u64,
    game_time: f64,
    player_health: f32,
    enemies_spawned: usize,
    enemies_killed: usize,
    reward: u32,
    casts: usize,
    events_dropped: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    events: Vec<serde_json::Value>,
}

const ENEMY_MIX: [&str; 4] = ["skeleton", "skeleton", "skeleton_mage", "bone_golem"];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let config = match &args.config {
        Some(path) => CombatConfig::load(path)?,
        None => CombatConfig::default(),
    };
    let catalog = match &args.abilities {
        Some(path) => AbilityCatalog::load(path)?,
        None => AbilityCatalog::builtin(),
    };
    let archetypes = match &args.archetypes {
        Some(path) => ArchetypeTable::load(path)?,
        None => ArchetypeTable::builtin(),
    };
    let spatial = SparseHashGrid::new(config.grid_cell_size);
    let mut world = CombatWorld::new(
        config,
        archetypes,
        catalog,
        Box::new(StandardResolver::new()),
        Box::new(FlatTerrain::default()),
        Box::new(NullNotifier),
        Box::new(spatial),
    )?;

    let player = world.spawn("player", Vec3::ZERO)?;
    let player_abilities: Vec<AbilityId> = world
        .archetypes()
        .require("player")?
        .all_abilities()
        .cloned()
        .collect();

    let mut enemies = Vec::with_capacity(args.enemies);
    for _ in 0..args.enemies {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = rng.gen_range(8.0..16.0);
        let position = Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance);
        let archetype = ENEMY_MIX.choose(&mut rng).copied().unwrap_or("skeleton");
        enemies.push(world.spawn(archetype, position)?);
    }
    tracing::info!("Skirmish seed {} with {} enemies", seed, enemies.len());

    let delta = 1.0 / args.tick_rate.max(1) as f32;
    let mut casts = 0;
    let mut events = Vec::new();
    let mut outcome = "draw";

    for _ in 0..args.max_ticks {
        if let Some(target) = nearest_enemy(&world, player) {
            if let Some(ability) = player_abilities.choose(&mut rng) {
                match world.request_cast(player, ability, Some(target.0), Some(target.1)) {
                    Ok(_) => casts += 1,
                    Err(e) => tracing::trace!("Player cast skipped: {}", e),
                }
            }
        }

        world.tick(delta);

        for logged in world.drain_events() {
            if let CombatEvent::Despawned { actor } = logged.event {
                enemies.retain(|e| *e != actor);
            }
            if args.verbose {
                events.push(serde_json::to_value(&logged)?);
            }
        }

        if world.actor(player).map_or(true, |p| p.is_dead()) {
            outcome = "defeat";
            break;
        }
        if enemies.iter().all(|e| world.actor(*e).map_or(true, |a| a.is_dead())) {
            outcome = "victory";
            break;
        }
    }

    let result = SkirmishResult {
        outcome: outcome.to_string(),
        seed,
        ticks: world.tick_count(),
        game_time: world.now(),
        player_health: world.actor(player).map_or(0.0, |p| p.health()),
        enemies_spawned: args.enemies,
        enemies_killed: world.rewards().iter().filter(|r| r.victim != player).count(),
        reward: world.reward_for(player),
        casts,
        events_dropped: world.events().dropped(),
        events,
    };
    world.teardown();

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Closest living hostile to `player`, with its position
fn nearest_enemy(world: &CombatWorld, player: ActorId) -> Option<(ActorId, Vec3)> {
    let origin = world.actor(player)?.position();
    world
        .actors()
        .filter(|a| !a.is_dead() && a.faction() == Faction::Hostile)
        .map(|a| (a.id(), a.position()))
        .min_by(|a, b| planar_distance(origin, a.1).total_cmp(&planar_distance(origin, b.1)))
}
