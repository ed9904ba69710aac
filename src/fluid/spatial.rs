//! Uniform grid for neighbor search.
//!
//! The grid covers the bounding volume plus one padding cell on each side,
//! with cells of edge `h`. A 3x3x3 block query around a particle's cell is a
//! superset of its true `h`-neighborhood. Particles outside the grid are
//! clamped into the nearest edge cell; clamping is monotone per axis so the
//! superset property still holds for them.

use bevy::log::debug;
use bevy::prelude::*;

use super::boundary::BoundingVolume;
use super::particle::Particle;

/// Geometry of the spatial grid.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialGridConfig {
    /// Size of each grid cell (should be >= smoothing_radius).
    pub cell_size: f32,

    /// Number of cells in each dimension.
    pub grid_size: UVec3,

    /// Origin of the grid (minimum corner).
    pub grid_origin: Vec3,
}

impl SpatialGridConfig {
    /// Create a configuration that covers `bounds` with one padding cell per side.
    pub fn for_bounds(bounds: &BoundingVolume, cell_size: f32) -> Self {
        let size = bounds.max() - bounds.min();
        let grid_size = (size / cell_size).ceil().as_uvec3().max(UVec3::ONE) + UVec3::splat(2);

        Self {
            cell_size,
            grid_size,
            grid_origin: bounds.min() - Vec3::splat(cell_size),
        }
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.grid_size.x as usize * self.grid_size.y as usize * self.grid_size.z as usize
    }

    /// Calculate the (unclamped) grid cell for a position.
    pub fn position_to_cell(&self, position: Vec3) -> IVec3 {
        let relative = position - self.grid_origin;
        (relative / self.cell_size).floor().as_ivec3()
    }

    /// Check if a cell coordinate is within the grid bounds.
    pub fn is_valid_cell(&self, cell: IVec3) -> bool {
        cell.cmpge(IVec3::ZERO).all() && cell.as_uvec3().cmplt(self.grid_size).all()
    }

    /// Nearest valid cell.
    pub fn clamp_cell(&self, cell: IVec3) -> IVec3 {
        cell.clamp(IVec3::ZERO, self.grid_size.as_ivec3() - IVec3::ONE)
    }

    /// Linear index of a valid cell.
    pub fn cell_index(&self, cell: IVec3) -> usize {
        let size = self.grid_size.as_ivec3();
        ((cell.z * size.y + cell.y) * size.x + cell.x) as usize
    }

    /// Cell coordinate of a linear index.
    pub fn index_to_cell(&self, index: usize) -> IVec3 {
        let sx = self.grid_size.x as usize;
        let sy = self.grid_size.y as usize;
        IVec3::new(
            (index % sx) as i32,
            ((index / sx) % sy) as i32,
            (index / (sx * sy)) as i32,
        )
    }

    /// Get neighboring cell offsets for 3x3x3 neighborhood.
    pub fn neighbor_offsets() -> &'static [IVec3; 27] {
        static OFFSETS: [IVec3; 27] = {
            let mut offsets = [IVec3::ZERO; 27];
            let mut i = 0;
            while i < 27 {
                offsets[i] = IVec3::new(i as i32 / 9 - 1, (i as i32 / 3) % 3 - 1, i as i32 % 3 - 1);
                i += 1;
            }
            offsets
        };
        &OFFSETS
    }
}

/// Bucket grid mapping cells to particle indices.
#[derive(Debug)]
pub struct SpatialGrid {
    config: SpatialGridConfig,
    cells: Vec<Vec<usize>>,
    /// Particles that fell outside the grid during the last refresh.
    clamped: usize,
}

impl SpatialGrid {
    /// Create an empty grid.
    pub fn new(config: SpatialGridConfig) -> Self {
        let cells = vec![Vec::new(); config.cell_count()];
        Self {
            config,
            cells,
            clamped: 0,
        }
    }

    pub fn config(&self) -> &SpatialGridConfig {
        &self.config
    }

    /// Number of particles clamped into edge cells during the last refresh.
    pub fn clamped_count(&self) -> usize {
        self.clamped
    }

    /// Bucket contents of a cell.
    pub fn bucket(&self, index: usize) -> &[usize] {
        self.cells.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of bucketed entries.
    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Vec::is_empty)
    }

    /// Linear cell index for a position, and whether it had to be clamped.
    pub fn locate(&self, position: Vec3) -> (usize, bool) {
        let cell = self.config.position_to_cell(position);
        let clamped = self.config.clamp_cell(cell);
        (self.config.cell_index(clamped), clamped != cell)
    }

    /// Empty every bucket and forget cached cell ids.
    pub fn clear(&mut self, particles: &mut [Particle]) {
        for cell in &mut self.cells {
            cell.clear();
        }
        for particle in particles {
            particle.cell = None;
        }
        self.clamped = 0;
    }

    /// Rebuild every bucket from scratch.
    pub fn rebuild(&mut self, particles: &mut [Particle]) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.clamped = 0;

        for (i, particle) in particles.iter_mut().enumerate() {
            let (index, clamped) = self.locate(particle.position);
            self.clamped += clamped as usize;
            self.cells[index].push(i);
            particle.cell = Some(index);
        }

        if self.clamped > 0 {
            debug!("{} particles clamped into edge cells", self.clamped);
        }
    }

    /// Move particles whose cell changed. Returns how many moved.
    ///
    /// Every index in `particles` must either be unassigned or bucketed in the
    /// cell its cached id names; the simulation rebuilds after any arena change.
    pub fn update(&mut self, particles: &mut [Particle]) -> usize {
        let mut moved = 0;
        self.clamped = 0;

        for (i, particle) in particles.iter_mut().enumerate() {
            let (index, clamped) = self.locate(particle.position);
            self.clamped += clamped as usize;

            if particle.cell == Some(index) {
                continue;
            }
            if let Some(old) = particle.cell {
                let bucket = &mut self.cells[old];
                if let Some(slot) = bucket.iter().position(|&j| j == i) {
                    bucket.swap_remove(slot);
                }
            }
            self.cells[index].push(i);
            particle.cell = Some(index);
            moved += 1;
        }

        if self.clamped > 0 {
            debug!("{} particles clamped into edge cells", self.clamped);
        }
        moved
    }

    /// Particle indices in the 3x3x3 block around `cell`. Out-of-grid cells
    /// contribute nothing.
    pub fn candidates(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        let center = self.config.index_to_cell(cell);
        SpatialGridConfig::neighbor_offsets()
            .iter()
            .map(move |offset| center + *offset)
            .filter(move |neighbor| self.config.is_valid_cell(*neighbor))
            .flat_map(move |neighbor| {
                self.cells[self.config.cell_index(neighbor)]
                    .iter()
                    .copied()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn unit_grid() -> SpatialGrid {
        let bounds = BoundingVolume::new(Vec3::splat(-5.0), Vec3::splat(5.0)).unwrap();
        SpatialGrid::new(SpatialGridConfig::for_bounds(&bounds, 1.0))
    }

    fn particles_at(positions: &[Vec3]) -> Vec<Particle> {
        positions.iter().map(|&p| Particle::new(p, 1.0, 1.0)).collect()
    }

    #[test]
    fn test_grid_config_pads_bounds() {
        let bounds = BoundingVolume::new(Vec3::splat(-10.0), Vec3::splat(10.0)).unwrap();
        let config = SpatialGridConfig::for_bounds(&bounds, 0.5);

        assert_eq!(config.grid_size, UVec3::new(42, 42, 42));
        assert_eq!(config.grid_origin, Vec3::splat(-10.5));
    }

    #[test]
    fn test_position_to_cell() {
        let config = SpatialGridConfig {
            cell_size: 1.0,
            grid_size: UVec3::splat(4),
            grid_origin: Vec3::ZERO,
        };

        let cell = |x: f32, y: f32, z: f32| config.position_to_cell(Vec3::new(x, y, z));
        assert_eq!(cell(0.5, 0.5, 0.5), IVec3::ZERO);
        assert_eq!(cell(1.5, 0.5, 0.5), IVec3::new(1, 0, 0));
        assert_eq!(cell(-0.5, 0.0, 0.0), IVec3::new(-1, 0, 0));
        assert!(!config.is_valid_cell(IVec3::new(-1, 0, 0)));
        assert!(!config.is_valid_cell(IVec3::new(0, 4, 0)));
    }

    #[test]
    fn test_cell_index_roundtrip() {
        let config = SpatialGridConfig {
            cell_size: 1.0,
            grid_size: UVec3::new(3, 4, 5),
            grid_origin: Vec3::ZERO,
        };
        for index in 0..config.cell_count() {
            assert_eq!(config.cell_index(config.index_to_cell(index)), index);
        }
    }

    #[test]
    fn test_neighbor_offsets_cover_block() {
        let offsets = SpatialGridConfig::neighbor_offsets();
        for x in -1..=1 {
            for y in -1..=1 {
                for z in -1..=1 {
                    assert!(offsets.contains(&IVec3::new(x, y, z)));
                }
            }
        }
    }

    #[test]
    fn test_rebuild_buckets_each_particle_once() {
        let mut grid = unit_grid();
        let mut particles = particles_at(&[
            Vec3::ZERO,
            Vec3::new(0.1, 0.1, 0.1),
            Vec3::new(4.9, 4.9, 4.9),
            Vec3::new(-4.9, 0.0, 2.0),
        ]);

        grid.rebuild(&mut particles);

        assert_eq!(grid.len(), particles.len());
        for (i, particle) in particles.iter().enumerate() {
            let cell = particle.cell().unwrap();
            assert_eq!(grid.bucket(cell).iter().filter(|&&j| j == i).count(), 1);
        }
        assert_eq!(particles[0].cell(), particles[1].cell());
        assert_eq!(grid.clamped_count(), 0);
    }

    #[test]
    fn test_out_of_range_particles_are_clamped() {
        let mut grid = unit_grid();
        let mut particles = particles_at(&[Vec3::new(1000.0, 0.0, 0.0), Vec3::splat(-1.0e9)]);

        grid.rebuild(&mut particles);

        assert_eq!(grid.clamped_count(), 2);
        assert_eq!(grid.len(), 2);
        let far = grid.config().index_to_cell(particles[0].cell().unwrap());
        assert_eq!(far.x, grid.config().grid_size.x as i32 - 1);
        let near = grid.config().index_to_cell(particles[1].cell().unwrap());
        assert_eq!(near, IVec3::ZERO);
    }

    #[test]
    fn test_incremental_update_moves_between_buckets() {
        let mut grid = unit_grid();
        let mut particles = particles_at(&[Vec3::ZERO, Vec3::new(0.2, 0.0, 0.0)]);
        grid.rebuild(&mut particles);
        let old_cell = particles[0].cell().unwrap();

        particles[0].position = Vec3::new(3.5, 0.0, 0.0);
        let moved = grid.update(&mut particles);

        assert_eq!(moved, 1);
        let new_cell = particles[0].cell().unwrap();
        assert_ne!(new_cell, old_cell);
        assert!(!grid.bucket(old_cell).contains(&0));
        assert!(grid.bucket(old_cell).contains(&1));
        assert_eq!(grid.bucket(new_cell), &[0]);
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_update_matches_rebuild() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut incremental = unit_grid();
        let mut full = unit_grid();
        let mut particles: Vec<Particle> = (0..200)
            .map(|_| Particle::new(random_point(&mut rng, 6.0), 1.0, 1.0))
            .collect();
        incremental.rebuild(&mut particles);

        for _ in 0..5 {
            for particle in &mut particles {
                particle.position += random_point(&mut rng, 0.8);
            }
            incremental.update(&mut particles);
            let mut copy = particles.clone();
            full.rebuild(&mut copy);

            for (a, b) in particles.iter().zip(&copy) {
                assert_eq!(a.cell(), b.cell());
            }
            for index in 0..incremental.config().cell_count() {
                let mut x = incremental.bucket(index).to_vec();
                let mut y = full.bucket(index).to_vec();
                x.sort_unstable();
                y.sort_unstable();
                assert_eq!(x, y);
            }
            assert_eq!(incremental.clamped_count(), full.clamped_count());
        }
    }

    #[test]
    fn test_query_is_superset_of_true_neighbors() {
        let mut rng = StdRng::seed_from_u64(42);
        let h = 1.0;
        let mut grid = unit_grid();
        // Some points stray outside the grid to exercise clamping.
        let mut particles: Vec<Particle> = (0..300)
            .map(|_| Particle::new(random_point(&mut rng, 7.5), 1.0, 1.0))
            .collect();
        grid.rebuild(&mut particles);

        for (i, pi) in particles.iter().enumerate() {
            let candidates: Vec<usize> = grid.candidates(pi.cell().unwrap()).collect();
            assert!(candidates.contains(&i));
            for (j, pj) in particles.iter().enumerate() {
                if (pi.position - pj.position).length() <= h {
                    assert!(candidates.contains(&j), "{j} missing from neighbors of {i}");
                }
            }
        }
    }

    #[test]
    fn test_corner_query_stays_in_bounds() {
        let mut grid = unit_grid();
        let mut particles = particles_at(&[Vec3::splat(-100.0), Vec3::splat(100.0)]);
        grid.rebuild(&mut particles);

        let corner: Vec<usize> = grid.candidates(0).collect();
        assert_eq!(corner, vec![0]);
        let last = grid.config().cell_count() - 1;
        let far: Vec<usize> = grid.candidates(last).collect();
        assert_eq!(far, vec![1]);
        assert!(grid.bucket(usize::MAX).is_empty());
    }

    fn random_point(rng: &mut StdRng, extent: f32) -> Vec3 {
        Vec3::new(
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
            rng.gen_range(-extent..extent),
        )
    }
}
