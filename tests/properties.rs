//! Property tests for stacking, periodic delivery and chain selection

use ashfall::collab::{ActorRef, DamageKind, SpatialQuery};
use ashfall::core::types::{planar_distance, ActorId, Vec3};
use ashfall::simulation::CombatRequest;
use ashfall::skills::targeting::select_chain;
use ashfall::skills::{HitSet, TargetingContext};
use ashfall::status::{StackPolicy, StatusEffect, StatusEffectRegistry};
use proptest::prelude::*;

fn delivered(requests: &[CombatRequest]) -> f32 {
    requests.iter().map(CombatRequest::amount).sum()
}

struct Field {
    actors: Vec<ActorRef>,
}

impl SpatialQuery for Field {
    fn find_nearby(&self, position: Vec3, radius: f32) -> Vec<ActorRef> {
        self.actors
            .iter()
            .filter(|a| planar_distance(position, a.position) <= radius)
            .copied()
            .collect()
    }
}

impl TargetingContext for Field {
    fn is_valid_target(&self, caster: ActorId, target: ActorId) -> bool {
        caster != target
    }

    fn locate(&self, id: ActorId) -> Option<Vec3> {
        self.actors.iter().find(|a| a.id == id).map(|a| a.position)
    }
}

proptest! {
    #[test]
    fn refresh_never_duplicates(
        durations in prop::collection::vec(0.1f32..10.0, 1..20),
        gaps in prop::collection::vec(0.0f32..2.0, 1..20),
    ) {
        let mut registry = StatusEffectRegistry::new(ActorId::new(), 64);
        let mut out = Vec::new();
        for (duration, gap) in durations.iter().zip(gaps.iter().cycle()) {
            let effect = StatusEffect::slow("chill", 0.2, *duration).with_policy(StackPolicy::Refresh);
            registry.add(effect, &mut out);
            prop_assert!(registry.count("chill") <= 1);
            registry.tick(*gap, &mut out);
            prop_assert!(registry.count("chill") <= 1);
        }
    }

    #[test]
    fn periodic_delivery_matches_rate_times_duration(
        rate in 1.0f32..50.0,
        duration in 0.5f32..6.0,
        interval in 0.1f32..2.0,
        deltas in prop::collection::vec(0.001f32..0.7, 1..200),
    ) {
        let mut registry = StatusEffectRegistry::new(ActorId::new(), 8);
        let mut out = Vec::new();
        registry.add(
            StatusEffect::damage_over_time("venom", rate, duration, interval, DamageKind::Poison),
            &mut out,
        );
        // The tick it was added in does not count
        registry.tick(0.0, &mut out);

        let mut step = 0;
        while registry.contains("venom") {
            registry.tick(deltas[step % deltas.len()], &mut out);
            step += 1;
        }

        let expected = rate * duration;
        let total = delivered(&out);
        prop_assert!((total - expected).abs() <= expected * 1.0e-3 + 1.0e-3,
            "delivered {} expected {}", total, expected);

        // One big step delivers the same
        let mut registry = StatusEffectRegistry::new(ActorId::new(), 8);
        let mut single = Vec::new();
        registry.add(
            StatusEffect::damage_over_time("venom", rate, duration, interval, DamageKind::Poison),
            &mut single,
        );
        registry.tick(0.0, &mut single);
        registry.tick(duration + 1.0, &mut single);
        prop_assert!((delivered(&single) - expected).abs() <= expected * 1.0e-3 + 1.0e-3);
    }

    #[test]
    fn chain_never_repeats_and_terminates(
        points in prop::collection::vec((-20.0f32..20.0, -20.0f32..20.0), 0..30),
        range in 0.5f32..15.0,
        count in 0u32..8,
    ) {
        let caster = ActorRef { id: ActorId::new(), position: Vec3::ZERO };
        let mut actors: Vec<ActorRef> = points
            .iter()
            .map(|(x, z)| ActorRef { id: ActorId::new(), position: Vec3::new(*x, 0.0, *z) })
            .collect();
        actors.push(caster);
        let field = Field { actors };

        let mut hits = HitSet::new();
        let chain = select_chain(&field, caster.id, Vec3::ZERO, None, range, count, &mut hits);

        prop_assert!(chain.attempts <= count + 1);
        prop_assert!(chain.hops.len() <= count as usize + 1);
        let mut ids: Vec<ActorId> = chain.hops.iter().map(|h| h.id).collect();
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), chain.hops.len());
        prop_assert!(chain.hops.iter().all(|h| h.id != caster.id));
        for pair in chain.hops.windows(2) {
            prop_assert!(planar_distance(pair[0].position, pair[1].position) <= range);
        }
    }
}
