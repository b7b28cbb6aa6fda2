//! Target selection for skill shapes
//!
//! All selectors share one monotonic `HitSet` per cast: an actor that has been
//! hit is never selected again by the same cast.

use ahash::AHashSet;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::collab::{ActorRef, SpatialQuery};
use crate::core::types::{planar_distance, planar_distance_to_segment, ActorId, Vec3};

/// Area a skill covers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetingShape {
    /// The primary target only
    Point,
    /// Everything within `radius` of the aim point
    Radius { radius: f32 },
    /// A strip from the caster toward the aim point
    Line { length: f32, width: f32 },
    /// Jump from target to nearest target, `count` times
    Chain { range: f32, count: u32, falloff: f32 },
}

/// World access a cast needs while it selects targets
pub trait TargetingContext: SpatialQuery {
    /// Can `caster`'s skills hit `target` right now?
    fn is_valid_target(&self, caster: ActorId, target: ActorId) -> bool;

    /// Current position of a living actor
    fn locate(&self, id: ActorId) -> Option<Vec3>;
}

/// Actors already hit by one cast. Only grows.
#[derive(Debug, Clone, Default)]
pub struct HitSet {
    members: AHashSet<ActorId>,
    order: Vec<ActorId>,
}

impl HitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the actor was already in the set
    pub fn insert(&mut self, id: ActorId) -> bool {
        if self.members.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Members in the order they were hit
    pub fn iter(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.order.iter().copied()
    }
}

/// Outcome of a chain selection
#[derive(Debug, Clone, Default)]
pub struct ChainSelection {
    /// Targets in hit order; index is the hop number
    pub hops: Vec<ActorRef>,
    /// Number of nearest-candidate searches performed
    pub attempts: u32,
}

fn nearest_candidate(
    ctx: &dyn TargetingContext,
    caster: ActorId,
    from: Vec3,
    range: f32,
    hit_set: &HitSet,
) -> Option<ActorRef> {
    ctx.find_nearby(from, range)
        .into_iter()
        .filter(|c| c.id != caster && !hit_set.contains(c.id) && ctx.is_valid_target(caster, c.id))
        .min_by_key(|c| (OrderedFloat(planar_distance(from, c.position)), c.id))
}

/// Chain from `first` (or from the candidate nearest `origin`) to up to
/// `count` further targets, each the nearest unhit candidate within `range`
/// of the previous one.
///
/// Performs at most `count + 1` searches and never revisits a target.
pub fn select_chain(
    ctx: &dyn TargetingContext,
    caster: ActorId,
    origin: Vec3,
    first: Option<ActorRef>,
    range: f32,
    count: u32,
    hit_set: &mut HitSet,
) -> ChainSelection {
    let mut selection = ChainSelection::default();

    let start = match first {
        Some(target)
            if target.id != caster
                && !hit_set.contains(target.id)
                && ctx.is_valid_target(caster, target.id) =>
        {
            Some(target)
        }
        _ => {
            selection.attempts += 1;
            nearest_candidate(ctx, caster, origin, range, hit_set)
        }
    };

    let Some(start) = start else {
        return selection;
    };
    hit_set.insert(start.id);
    selection.hops.push(start);

    let mut current = start.position;
    while selection.hops.len() <= count as usize {
        selection.attempts += 1;
        match nearest_candidate(ctx, caster, current, range, hit_set) {
            Some(next) => {
                hit_set.insert(next.id);
                current = next.position;
                selection.hops.push(next);
            }
            None => break,
        }
    }
    selection
}

/// Every valid, unhit actor within `radius` of `center`, nearest first
pub fn select_radius(
    ctx: &dyn TargetingContext,
    caster: ActorId,
    center: Vec3,
    radius: f32,
    hit_set: &mut HitSet,
) -> Vec<ActorRef> {
    let mut found: Vec<ActorRef> = ctx
        .find_nearby(center, radius)
        .into_iter()
        .filter(|c| c.id != caster && !hit_set.contains(c.id) && ctx.is_valid_target(caster, c.id))
        .collect();
    found.sort_by_key(|c| (OrderedFloat(planar_distance(center, c.position)), c.id));
    for target in &found {
        hit_set.insert(target.id);
    }
    found
}

/// Every valid, unhit actor within `width / 2` of the segment from `origin`
/// along `direction` for `length`
pub fn select_line(
    ctx: &dyn TargetingContext,
    caster: ActorId,
    origin: Vec3,
    direction: Vec3,
    length: f32,
    width: f32,
    hit_set: &mut HitSet,
) -> Vec<ActorRef> {
    let end = origin + direction * length;
    let half_width = width * 0.5;
    let mut found: Vec<ActorRef> = ctx
        .find_nearby(origin, length + half_width)
        .into_iter()
        .filter(|c| c.id != caster && !hit_set.contains(c.id) && ctx.is_valid_target(caster, c.id))
        .filter(|c| planar_distance_to_segment(c.position, origin, end) <= half_width)
        .collect();
    found.sort_by_key(|c| (OrderedFloat(planar_distance(origin, c.position)), c.id));
    for target in &found {
        hit_set.insert(target.id);
    }
    found
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_chain_visits_nearest_in_order() {
        let a = actor_at(0.0, 0.0);
        let b = actor_at(2.0, 0.0);
        let c = actor_at(4.0, 0.0);
        let field = OpenField { actors: vec![c, a, b] };
        let mut hits = HitSet::new();

        let chain = select_chain(&field, ActorId::new(), a.position, Some(a), 3.0, 5, &mut hits);
        let ids: Vec<ActorId> = chain.hops.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
        assert!(chain.attempts <= 6);
    }

    #[test]
    fn test_chain_stops_at_count() {
        let actors: Vec<ActorRef> = (0..5).map(|i| actor_at(i as f32, 0.0)).collect();
        let field = OpenField { actors: actors.clone() };
        let mut hits = HitSet::new();

        let chain = select_chain(&field, ActorId::new(), Vec3::ZERO, Some(actors[0]), 10.0, 3, &mut hits);
        assert_eq!(chain.hops.len(), 4);
        assert_eq!(hits.len(), 4);
        assert!(chain.attempts <= 4);
    }

    #[test]
    fn test_chain_out_of_range_stops() {
        let a = actor_at(0.0, 0.0);
        let far = actor_at(50.0, 0.0);
        let field = OpenField { actors: vec![a, far] };
        let mut hits = HitSet::new();

        let chain = select_chain(&field, ActorId::new(), a.position, Some(a), 5.0, 3, &mut hits);
        assert_eq!(chain.hops.len(), 1);
    }

    #[test]
    fn test_chain_skips_caster() {
        let caster = actor_at(0.0, 0.0);
        let other = actor_at(1.0, 0.0);
        let field = OpenField { actors: vec![caster, other] };
        let mut hits = HitSet::new();

        let chain = select_chain(&field, caster.id, caster.position, None, 5.0, 3, &mut hits);
        assert_eq!(chain.hops.len(), 1);
        assert_eq!(chain.hops[0].id, other.id);
    }

    #[test]
    fn test_radius_respects_hit_set() {
        let a = actor_at(1.0, 0.0);
        let b = actor_at(0.0, 1.0);
        let field = OpenField { actors: vec![a, b] };
        let mut hits = HitSet::new();
        hits.insert(a.id);

        let found = select_radius(&field, ActorId::new(), Vec3::ZERO, 2.0, &mut hits);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, b.id);
        assert!(select_radius(&field, ActorId::new(), Vec3::ZERO, 2.0, &mut hits).is_empty());
    }

    #[test]
    fn test_line_selects_strip() {
        let on_line = actor_at(5.0, 0.3);
        let off_line = actor_at(5.0, 3.0);
        let behind = actor_at(-2.0, 0.0);
        let field = OpenField { actors: vec![on_line, off_line, behind] };
        let mut hits = HitSet::new();

        let found = select_line(&field, ActorId::new(), Vec3::ZERO, Vec3::X, 10.0, 1.0, &mut hits);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, on_line.id);
    }

    #[test]
    fn test_hit_set_insert_once() {
        let mut hits = HitSet::new();
        let id = ActorId::new();
        assert!(hits.insert(id));
        assert!(!hits.insert(id));
        assert_eq!(hits.len(), 1);
    }
}
