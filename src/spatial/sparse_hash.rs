//! Sparse hash grid for efficient spatial queries

use ahash::AHashMap;

use crate::collab::{ActorRef, SpatialIndex, SpatialQuery};
use crate::core::types::{planar_distance, ActorId, Vec3};

/// Sparse hash grid over the ground plane (x, z)
pub struct SparseHashGrid {
    cell_size: f32,
    cells: AHashMap<(i32, i32), Vec<ActorRef>>,
}

impl SparseHashGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            cells: AHashMap::new(),
        }
    }

    #[inline]
    fn cell_coord(&self, pos: Vec3) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn insert(&mut self, id: ActorId, position: Vec3) {
        let coord = self.cell_coord(position);
        self.cells.entry(coord).or_default().push(ActorRef { id, position });
    }

    /// Rebuild grid from positions
    pub fn rebuild(&mut self, actors: impl Iterator<Item = ActorRef>) {
        self.clear();
        for actor in actors {
            self.insert(actor.id, actor.position);
        }
    }
}

impl SpatialQuery for SparseHashGrid {
    fn find_nearby(&self, position: Vec3, radius: f32) -> Vec<ActorRef> {
        if !radius.is_finite() || radius < 0.0 {
            return Vec::new();
        }
        let (cx, cz) = self.cell_coord(position);
        let reach = (radius / self.cell_size).ceil() as i32;

        let mut found = Vec::new();
        for dx in -reach..=reach {
            for dz in -reach..=reach {
                let Some(cell) = self.cells.get(&(cx + dx, cz + dz)) else {
                    continue;
                };
                found.extend(
                    cell.iter()
                        .filter(|a| planar_distance(position, a.position) <= radius)
                        .copied(),
                );
            }
        }
        found
    }
}

impl SpatialIndex for SparseHashGrid {
    fn sync(&mut self, actors: &[ActorRef]) {
        self.rebuild(actors.iter().copied());
    }
}
