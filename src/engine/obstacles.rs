// Obstacle placement: the only code allowed to make a tile unwalkable.
//
// Rocks are scattered greedily with a Chebyshev clearance between them, so
// every rock keeps at least one ring of open ground and the grid stays
// navigable. Randomness is derived from (seed, chunk), which keeps a chunk's
// scenery identical no matter in which order the world was explored.

use std::collections::HashMap;

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::chunk_index::ChunkGenerator;
use super::config::ObstacleConfig;
use super::grid::{Chunk, ChunkCoord, TileCoord};

/// Local tile index inside a chunk: (local_x, local_z).
pub type LocalTile = (u32, u32);

#[derive(Debug, Clone)]
pub struct ObstacleRegistry {
    seed: u64,
    placed: HashMap<ChunkCoord, Vec<TileCoord>>,
}

impl ObstacleRegistry {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            placed: HashMap::new(),
        }
    }

    /// Tiles blocked so far in a chunk, in placement order.
    pub fn obstacles_in(&self, chunk: ChunkCoord) -> &[TileCoord] {
        self.placed.get(&chunk).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_placed(&self) -> usize {
        self.placed.values().map(Vec::len).sum()
    }

    /// Greedily block tiles from `candidates` so that no two blocked tiles in
    /// the chunk end up within `clearance` (Chebyshev) of each other. Tiles
    /// that were already blocked count against the check. Candidates are
    /// visited in random order, each at most once.
    pub fn place_obstacles(
        &mut self,
        chunk: &mut Chunk,
        candidates: &[LocalTile],
        clearance: u32,
    ) -> Vec<TileCoord> {
        self.place_obstacles_near(chunk, candidates, clearance, &[])
    }

    /// `place_obstacles` for a chunk with built neighbours: `nearby` are
    /// tiles already blocked just across its border, and count against the
    /// clearance check like the chunk's own.
    pub fn place_obstacles_near(
        &mut self,
        chunk: &mut Chunk,
        candidates: &[LocalTile],
        clearance: u32,
        nearby: &[TileCoord],
    ) -> Vec<TileCoord> {
        let mut rng = self.chunk_rng(chunk.coord());
        self.place_with(&mut rng, chunk, candidates, clearance, nearby)
    }

    /// Roll `count` candidate sites at least `edge_margin` tiles away from
    /// the chunk border and place rocks on them.
    pub fn scatter(
        &mut self,
        chunk: &mut Chunk,
        count: usize,
        edge_margin: u32,
        clearance: u32,
    ) -> Vec<TileCoord> {
        let side = chunk.side();
        if count == 0 || 2 * edge_margin >= side {
            return Vec::new();
        }

        let mut rng = self.chunk_rng(chunk.coord());
        let candidates: Vec<LocalTile> = (0..count)
            .map(|_| {
                (
                    rng.gen_range(edge_margin..side - edge_margin),
                    rng.gen_range(edge_margin..side - edge_margin),
                )
            })
            .collect();
        self.place_with(&mut rng, chunk, &candidates, clearance, &[])
    }

    /// Block exactly the given tiles, no clearance. For authored scenery
    /// such as walls and buildings.
    pub fn place_fixed(&mut self, chunk: &mut Chunk, tiles: &[LocalTile]) -> Vec<TileCoord> {
        let coord = chunk.coord();
        let mut placed = Vec::new();
        for &(lx, lz) in tiles {
            let open = chunk.tile(lx, lz).is_some_and(|t| t.is_walkable());
            if open && chunk.set_walkable(lx, lz, false) {
                placed.push(TileCoord::new(coord, lx, lz));
            }
        }
        self.record(coord, &placed);
        placed
    }

    fn place_with(
        &mut self,
        rng: &mut StdRng,
        chunk: &mut Chunk,
        candidates: &[LocalTile],
        clearance: u32,
        nearby: &[TileCoord],
    ) -> Vec<TileCoord> {
        let clearance = if clearance == 0 {
            warn!("[OBSTACLE] Clearance 0 would let rocks touch; using 1");
            1
        } else {
            clearance
        };

        let mut order: Vec<LocalTile> = candidates.to_vec();
        order.sort_unstable();
        order.dedup();
        order.shuffle(rng);

        let side = chunk.side();
        let mut blocked: Vec<TileCoord> = chunk
            .tiles()
            .filter(|t| !t.is_walkable())
            .map(|t| t.coord())
            .chain(nearby.iter().copied())
            .collect();

        let coord = chunk.coord();
        let mut placed = Vec::new();
        for (lx, lz) in order {
            if !chunk.tile(lx, lz).is_some_and(|t| t.is_walkable()) {
                continue;
            }
            let tile = TileCoord::new(coord, lx, lz);
            let crowded = blocked.iter().any(|b| b.chebyshev(tile, side) <= clearance);
            if crowded {
                continue;
            }
            chunk.set_walkable(lx, lz, false);
            blocked.push(tile);
            placed.push(tile);
        }

        debug!(
            "[OBSTACLE] Chunk ({}, {}): placed {}/{} candidates (clearance {})",
            coord.x,
            coord.z,
            placed.len(),
            candidates.len(),
            clearance
        );
        self.record(coord, &placed);
        placed
    }

    fn record(&mut self, coord: ChunkCoord, placed: &[TileCoord]) {
        if !placed.is_empty() {
            self.placed.entry(coord).or_default().extend_from_slice(placed);
        }
    }

    /// Deterministic per-chunk stream. Salted by how much was already placed
    /// so repeated calls on one chunk don't replay the same rolls.
    fn chunk_rng(&self, coord: ChunkCoord) -> StdRng {
        let salt = self.obstacles_in(coord).len() as u64;
        let mixed = self.seed
            ^ (coord.x as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (coord.z as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ salt.rotate_left(32);
        StdRng::seed_from_u64(mixed)
    }
}

// ============================================================================
// ROCK SCATTER GENERATOR
// ============================================================================

/// Chunk generator that drops rock clusters on every new chunk.
#[derive(Debug, Clone, Copy)]
pub struct RockScatter {
    pub rocks_per_chunk: usize,
    pub edge_margin: u32,
    pub clearance: u32,
}

impl RockScatter {
    pub fn new(config: &ObstacleConfig) -> Self {
        Self {
            rocks_per_chunk: config.rocks_per_chunk,
            edge_margin: config.edge_margin,
            clearance: config.clearance,
        }
    }
}

impl ChunkGenerator for RockScatter {
    fn populate(&mut self, chunk: &mut Chunk, obstacles: &mut ObstacleRegistry) {
        obstacles.scatter(chunk, self.rocks_per_chunk, self.edge_margin, self.clearance);
    }
}
