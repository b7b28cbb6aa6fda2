//! Skill casts through the world: chaining, pulsing areas and variants

mod common;

use ashfall::abilities::AbilityCatalog;
use ashfall::actor::ActorArchetype;
use ashfall::collab::DamageKind;
use ashfall::core::types::{AbilityId, ActorId};
use ashfall::simulation::CombatEvent;
use ashfall::skills::{CreateExtra, HitExtra, VariantHook};
use ashfall::{CombatConfig, CombatWorld};
use common::*;

/// Five dummies in a line, two units apart, starting four units out
fn row_of_dummies(world: &mut CombatWorld) -> Vec<ActorId> {
    (0..5)
        .map(|i| world.spawn("dummy", at(4.0 + 2.0 * i as f32, 0.0)).unwrap())
        .collect()
}

fn cast(world: &mut CombatWorld, caster: ActorId, ability: &str, target: ActorId) {
    world
        .request_cast(caster, &AbilityId::from(ability), Some(target), None)
        .unwrap();
}

#[test]
fn test_chain_hits_count_plus_one_distinct_targets() {
    let mut world = world();
    let player = world.spawn("player", at(0.0, 0.0)).unwrap();
    let dummies = row_of_dummies(&mut world);
    drain(&mut world);

    cast(&mut world, player, "chain_lightning", dummies[0]);
    run(&mut world, 1.0);

    let hits = damaged_by(&drain(&mut world), player);
    assert_eq!(hits.len(), 4);
    let mut distinct = hits.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), 4);
    assert_eq!(hits, dummies[..4].to_vec());
    assert_eq!(world.actor(dummies[4]).unwrap().health(), 100.0);
}

#[test]
fn test_chain_damage_falls_off_per_hop() {
    let mut world = world();
    let player = world.spawn("player", at(0.0, 0.0)).unwrap();
    let dummies = row_of_dummies(&mut world);

    cast(&mut world, player, "chain_lightning", dummies[0]);
    run(&mut world, 1.0);

    let expected = [24.0, 18.0, 13.5, 10.125];
    for (dummy, damage) in dummies.iter().zip(expected) {
        let health = world.actor(*dummy).unwrap().health();
        assert!((100.0 - health - damage).abs() < 1.0e-3, "{} vs {}", 100.0 - health, damage);
    }
}

#[test]
fn test_chain_stops_when_no_candidate_in_range() {
    let mut world = world();
    let player = world.spawn("player", at(0.0, 0.0)).unwrap();
    let near = world.spawn("dummy", at(4.0, 0.0)).unwrap();
    let far = world.spawn("dummy", at(30.0, 0.0)).unwrap();
    drain(&mut world);

    cast(&mut world, player, "chain_lightning", near);
    run(&mut world, 1.0);

    assert_eq!(damaged_by(&drain(&mut world), player), vec![near]);
    assert_eq!(world.actor(far).unwrap().health(), 100.0);
}

#[test]
fn test_chain_skips_allies() {
    let mut world = world();
    let player = world.spawn("player", at(0.0, 0.0)).unwrap();
    let first = world.spawn("dummy", at(4.0, 0.0)).unwrap();
    let ally = world.spawn("militia", at(5.0, 0.0)).unwrap();
    let second = world.spawn("dummy", at(8.0, 0.0)).unwrap();
    drain(&mut world);

    cast(&mut world, player, "chain_lightning", first);
    world.tick(0.5);

    let hits = damaged_by(&drain(&mut world), player);
    assert_eq!(hits, vec![first, second]);
    assert_eq!(world.actor(ally).unwrap().health(), 80.0);
}

#[test]
fn test_pulsing_area_hits_each_target_once() {
    let mut world = world();
    let player = world.spawn("player", at(0.0, 0.0)).unwrap();
    let dummy = world.spawn("dummy", at(6.0, 0.0)).unwrap();
    drain(&mut world);

    world
        .request_cast(player, &AbilityId::from("blizzard"), None, Some(at(6.0, 0.0)))
        .unwrap();
    run(&mut world, 4.5);

    let hits = damaged_by(&drain(&mut world), player);
    assert_eq!(hits, vec![dummy]);
    assert!(world.instances().is_empty());
}

#[test]
fn test_frost_variant_changes_kind_and_applies_chill() {
    let mut world = world();
    let mage = world.spawn("variant_mage", at(0.0, 0.0)).unwrap();
    let dummies = row_of_dummies(&mut world);
    drain(&mut world);

    cast(&mut world, mage, "chain_lightning_frost", dummies[0]);
    world.tick(0.5);

    let events = drain(&mut world);
    let frost_hits = events
        .iter()
        .filter(|e| matches!(e, CombatEvent::Damaged { kind: DamageKind::Frost, .. }))
        .count();
    assert_eq!(frost_hits, 4);
    let first = world.actor(dummies[0]).unwrap();
    assert!((first.health() - (100.0 - 24.0 * 0.8)).abs() < 1.0e-3);
    assert!(first.statuses().contains("chill"));
}

#[test]
fn test_inferno_spawns_burning_ground_child() {
    let mut world = world();
    let mage = world.spawn("variant_mage", at(0.0, 0.0)).unwrap();
    let dummy = world.spawn("dummy", at(6.0, 0.0)).unwrap();
    drain(&mut world);

    cast(&mut world, mage, "fireball_inferno", dummy);
    world.tick(0.7);

    let child = world
        .instances()
        .iter()
        .find(|i| i.ability().as_str() == "burning_ground")
        .expect("no burning ground");
    assert_eq!(child.depth(), 1);
    assert_eq!(child.elapsed(), 0.0);

    world.tick(FRAME);
    let events = drain(&mut world);
    let fire_hits = events
        .iter()
        .filter(|e| matches!(
            e,
            CombatEvent::Damaged { target, kind: DamageKind::Fire, .. } if *target == dummy
        ))
        .count();
    assert_eq!(fire_hits, 2);
}

#[test]
fn test_shatter_burst_lands_after_delay() {
    let mut world = world();
    let mage = world.spawn("variant_mage", at(0.0, 0.0)).unwrap();
    let dummy = world.spawn("dummy", at(2.0, 0.0)).unwrap();

    world
        .request_cast(mage, &AbilityId::from("frost_nova_shatter"), None, None)
        .unwrap();
    world.tick(FRAME);
    assert_eq!(world.actor(dummy).unwrap().health(), 90.0);
    assert_eq!(world.pending_timers(), 1);

    run(&mut world, 1.2);
    assert_eq!(world.actor(dummy).unwrap().health(), 78.0);
}

#[test]
fn test_child_depth_is_capped() {
    let mut catalog = AbilityCatalog::builtin();
    // Every hit spawns another copy of itself
    catalog
        .insert_variant(
            AbilityId::from("ember_storm"),
            &AbilityId::from("fireball"),
            vec![VariantHook::OnHitExtra {
                extra: HitExtra::SpawnChild { ability: AbilityId::from("ember_storm") },
            }],
        )
        .unwrap();
    let mut table = archetypes();
    table.insert(caster("pyromancer", &["ember_storm"]));
    table.insert(ActorArchetype {
        max_health: 10_000.0,
        ..dummy()
    });

    let max_depth = CombatConfig::default().max_child_depth;
    let mut world = world_from(catalog, table);

    let pyromancer = world.spawn("pyromancer", at(0.0, 0.0)).unwrap();
    let dummy = world.spawn("dummy", at(6.0, 0.0)).unwrap();
    drain(&mut world);

    cast(&mut world, pyromancer, "ember_storm", dummy);
    run(&mut world, 5.0);

    let casts = drain(&mut world)
        .into_iter()
        .filter(|e| matches!(e, CombatEvent::CastStarted { ability, .. } if ability.as_str() == "ember_storm"))
        .count();
    assert_eq!(casts, 1 + max_depth as usize);
    assert!(world.instances().is_empty());
}

/// Catalog with a burst variant of `base` landing `delay` seconds after activation
fn burst_catalog(id: &str, base: &str, delay: f32) -> AbilityCatalog {
    let mut catalog = AbilityCatalog::builtin();
    catalog
        .insert_variant(
            AbilityId::from(id),
            &AbilityId::from(base),
            vec![VariantHook::OnCreateExtra {
                extra: CreateExtra::DelayedBurst {
                    delay,
                    radius: 4.0,
                    damage: 12.0,
                    kind: DamageKind::Frost,
                },
            }],
        )
        .unwrap();
    catalog
}

#[test]
fn test_burst_outliving_its_effect_still_lands() {
    let mut table = archetypes();
    table.insert(caster("warden", &["frost_nova_lingering"]));
    // Burst at 2.0s, nova itself ends at 1.5s
    let mut world = world_from(burst_catalog("frost_nova_lingering", "frost_nova", 2.0), table);
    let warden = world.spawn("warden", at(0.0, 0.0)).unwrap();
    let dummy = world.spawn("dummy", at(2.0, 0.0)).unwrap();

    world
        .request_cast(warden, &AbilityId::from("frost_nova_lingering"), None, None)
        .unwrap();
    run(&mut world, 1.7);
    assert!(world.instances().iter().all(|i| i.ability().as_str() != "frost_nova_lingering"));
    assert_eq!(world.actor(dummy).unwrap().health(), 90.0);

    run(&mut world, 1.0);
    assert_eq!(world.actor(dummy).unwrap().health(), 78.0);
}

#[test]
fn test_burst_on_instant_cast_lands() {
    let mut table = archetypes();
    table.insert(caster("hexer", &["stun_bolt_echo"]));
    let mut world = world_from(burst_catalog("stun_bolt_echo", "stun_bolt", 0.5), table);
    let hexer = world.spawn("hexer", at(0.0, 0.0)).unwrap();
    let dummy = world.spawn("dummy", at(4.0, 0.0)).unwrap();

    cast(&mut world, hexer, "stun_bolt_echo", dummy);
    run(&mut world, 0.4);
    assert_eq!(world.actor(dummy).unwrap().health(), 100.0);
    assert!(world.pending_timers() >= 1);

    run(&mut world, 1.0);
    assert_eq!(world.actor(dummy).unwrap().health(), 88.0);
}

#[test]
fn test_handed_over_burst_dies_with_its_caster() {
    let mut table = archetypes();
    table.insert(caster("warden", &["frost_nova_lingering"]));
    let mut world = world_from(burst_catalog("frost_nova_lingering", "frost_nova", 2.0), table);
    let warden = world.spawn("warden", at(0.0, 0.0)).unwrap();
    let dummy = world.spawn("dummy", at(2.0, 0.0)).unwrap();

    world
        .request_cast(warden, &AbilityId::from("frost_nova_lingering"), None, None)
        .unwrap();
    run(&mut world, 1.7);
    assert!(world.pending_timers() >= 1);

    world.remove_actor(warden).unwrap();
    assert_eq!(world.pending_timers(), 0);
    run(&mut world, 1.0);
    assert_eq!(world.actor(dummy).unwrap().health(), 90.0);
}
