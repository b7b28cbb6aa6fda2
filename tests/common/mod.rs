//! Shared fixtures for the integration tests

#![allow(dead_code)]

use ashfall::abilities::AbilityCatalog;
use ashfall::actor::{ActorArchetype, ArchetypeTable, Faction};
use ashfall::collab::{FlatTerrain, NullNotifier, StandardResolver};
use ashfall::core::types::{AbilityId, ActorId, Vec3};
use ashfall::simulation::CombatEvent;
use ashfall::spatial::SparseHashGrid;
use ashfall::{CombatConfig, CombatWorld};

pub const FRAME: f32 = 1.0 / 30.0;

/// A hostile that never moves or attacks
pub fn dummy() -> ActorArchetype {
    ActorArchetype {
        max_health: 100.0,
        move_speed: 0.0,
        attack_damage: 0.0,
        detection_range: 0.0,
        reward: 5,
        ..ActorArchetype::new("dummy", Faction::Hostile)
    }
}

/// A player-side caster that knows every built-in variant
pub fn variant_mage() -> ActorArchetype {
    ActorArchetype {
        max_health: 150.0,
        detection_range: 0.0,
        abilities: [
            "chain_lightning",
            "chain_lightning_frost",
            "fireball_inferno",
            "frost_nova_shatter",
            "blizzard",
        ]
        .into_iter()
        .map(AbilityId::from)
        .collect(),
        ai_controlled: false,
        ..ActorArchetype::new("variant_mage", Faction::Player)
    }
}

pub fn archetypes() -> ArchetypeTable {
    let mut table = ArchetypeTable::builtin();
    table.insert(dummy());
    table.insert(variant_mage());
    table
}

pub fn world() -> CombatWorld {
    world_from(AbilityCatalog::builtin(), archetypes())
}

/// Default collaborators around a custom catalog and archetype table
pub fn world_from(catalog: AbilityCatalog, table: ArchetypeTable) -> CombatWorld {
    let config = CombatConfig::default();
    let spatial = SparseHashGrid::new(config.grid_cell_size);
    CombatWorld::new(
        config,
        table,
        catalog,
        Box::new(StandardResolver::new()),
        Box::new(FlatTerrain::default()),
        Box::new(NullNotifier),
        Box::new(spatial),
    )
    .unwrap()
}

/// A non-AI player-side caster that knows exactly `abilities`
pub fn caster(name: &str, abilities: &[&str]) -> ActorArchetype {
    ActorArchetype {
        detection_range: 0.0,
        abilities: abilities.iter().map(|a| AbilityId::from(*a)).collect(),
        ai_controlled: false,
        ..ActorArchetype::new(name, Faction::Player)
    }
}

pub fn at(x: f32, z: f32) -> Vec3 {
    Vec3::new(x, 0.0, z)
}

pub fn run(world: &mut CombatWorld, seconds: f32) {
    let frames = (seconds / FRAME).ceil() as usize;
    for _ in 0..frames {
        world.tick(FRAME);
    }
}

/// Targets damaged by `source`, in event order
pub fn damaged_by(events: &[CombatEvent], source: ActorId) -> Vec<ActorId> {
    events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::Damaged { target, source: Some(s), .. } if *s == source => Some(*target),
            _ => None,
        })
        .collect()
}

pub fn drain(world: &mut CombatWorld) -> Vec<CombatEvent> {
    world.drain_events().into_iter().map(|logged| logged.event).collect()
}
