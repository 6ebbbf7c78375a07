// Chunk storage, lazy generation and the active set around the player.
//
// Chunks are created on first touch and kept for the whole session. Which
// of them are "active" (built and shown) is recomputed from the player's
// position every frame; hiding/showing meshes is the renderer's business,
// we only report the diff.

use std::collections::{BTreeSet, HashMap};

use glam::{IVec2, Vec3};
use log::{debug, trace};

use super::config::{GenerationPolicy, NavConfig};
use super::grid::{Chunk, ChunkCoord, GridLayout, Tile, TileCoord};
use super::obstacles::{LocalTile, ObstacleRegistry};

// ============================================================================
// GENERATION HOOK
// ============================================================================

/// Fills a freshly created chunk. Runs exactly once per chunk, before any
/// lookup can observe it. Scenery goes through `obstacles`.
pub trait ChunkGenerator {
    fn populate(&mut self, chunk: &mut Chunk, obstacles: &mut ObstacleRegistry);
}

/// Leaves every tile walkable.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatGenerator;

impl ChunkGenerator for FlatGenerator {
    fn populate(&mut self, _chunk: &mut Chunk, _obstacles: &mut ObstacleRegistry) {}
}

// ============================================================================
// TILE SOURCE
// ============================================================================

/// The read surface the neighbour resolver and planner work against.
///
/// `tile_at` takes `&mut self` because a lookup may generate the chunk it
/// lands in. It returns a copy so callers can hold several tiles at once.
pub trait TileSource {
    fn layout(&self) -> GridLayout;
    fn tile_at(&mut self, pos: Vec3) -> Option<Tile>;
}

// ============================================================================
// CHUNK INDEX
// ============================================================================

/// Chunks that became active or inactive during one `update`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChunkDelta {
    pub entered: Vec<ChunkCoord>,
    pub left: Vec<ChunkCoord>,
}

impl ChunkDelta {
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.left.is_empty()
    }
}

pub struct ChunkIndex {
    layout: GridLayout,
    policy: GenerationPolicy,
    world_bound: Option<i32>,
    chunks: HashMap<ChunkCoord, Chunk>,
    active: BTreeSet<ChunkCoord>,
    generator: Box<dyn ChunkGenerator>,
    obstacles: ObstacleRegistry,
}

impl ChunkIndex {
    /// Index with an all-walkable world.
    pub fn new(config: &NavConfig) -> Self {
        Self::with_generator(config, FlatGenerator)
    }

    pub fn with_generator(config: &NavConfig, generator: impl ChunkGenerator + 'static) -> Self {
        Self {
            layout: GridLayout::new(config.grid.tile_size, config.grid.chunk_tiles),
            policy: config.grid.generation,
            world_bound: config.grid.world_bound,
            chunks: HashMap::new(),
            active: BTreeSet::new(),
            generator: Box::new(generator),
            obstacles: ObstacleRegistry::new(config.obstacles.seed),
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// True if the coordinate lies inside the configured world bound.
    pub fn in_bounds(&self, coord: ChunkCoord) -> bool {
        match self.world_bound {
            Some(bound) => coord.chebyshev(ChunkCoord::new(0, 0)) <= bound,
            None => true,
        }
    }

    /// Get a chunk, building and populating it first if needed.
    /// `None` only for coordinates outside the world bound.
    pub fn ensure_chunk(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        if !self.in_bounds(coord) {
            return None;
        }
        let layout = self.layout;
        let generator = &mut self.generator;
        let obstacles = &mut self.obstacles;
        Some(self.chunks.entry(coord).or_insert_with(|| {
            trace!("[CHUNK] Creating chunk ({}, {})", coord.x, coord.z);
            let mut chunk = Chunk::new(coord, &layout);
            generator.populate(&mut chunk, obstacles);
            chunk
        }))
    }

    pub fn obstacles(&self) -> &ObstacleRegistry {
        &self.obstacles
    }

    /// Clearance-respecting placement on a chunk, building it if needed.
    /// Meant for chunk-construction time; paths already planned are not
    /// revisited.
    pub fn place_obstacles(
        &mut self,
        coord: ChunkCoord,
        candidates: &[LocalTile],
        clearance: u32,
    ) -> Vec<TileCoord> {
        if !self.in_bounds(coord) {
            return Vec::new();
        }
        self.ensure_chunk(coord);
        let nearby = self.blocked_near(coord, clearance.max(1));
        match self.chunks.get_mut(&coord) {
            Some(chunk) => self
                .obstacles
                .place_obstacles_near(chunk, candidates, clearance, &nearby),
            None => Vec::new(),
        }
    }

    /// Blocked tiles of already built neighbour chunks lying within `reach`
    /// tiles of `coord`'s border. Only the 8 surrounding chunks are looked
    /// at, so `reach` is effectively capped at one chunk side.
    fn blocked_near(&self, coord: ChunkCoord, reach: u32) -> Vec<TileCoord> {
        let n = self.layout.chunk_tiles;
        let side = n as i32;
        let lo = IVec2::new(coord.x * side - side / 2, coord.z * side - side / 2) - IVec2::splat(reach as i32);
        let hi = lo + IVec2::splat(side - 1 + 2 * reach as i32);

        let mut nearby = Vec::new();
        for dz in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dz == 0 {
                    continue;
                }
                let Some(chunk) = self.chunks.get(&ChunkCoord::new(coord.x + dx, coord.z + dz)) else {
                    continue;
                };
                nearby.extend(
                    chunk
                        .tiles()
                        .filter(|t| !t.is_walkable())
                        .map(|t| t.coord())
                        .filter(|t| {
                            let g = t.global(n);
                            g.cmpge(lo).all() && g.cmple(hi).all()
                        }),
                );
            }
        }
        nearby
    }

    /// Block exactly the given tiles (walls, buildings).
    pub fn place_fixed(&mut self, coord: ChunkCoord, tiles: &[LocalTile]) -> Vec<TileCoord> {
        if !self.in_bounds(coord) {
            return Vec::new();
        }
        self.ensure_chunk(coord);
        match self.chunks.get_mut(&coord) {
            Some(chunk) => self.obstacles.place_fixed(chunk, tiles),
            None => Vec::new(),
        }
    }

    /// Lookup that never generates anything.
    pub fn peek_tile(&self, pos: Vec3) -> Option<Tile> {
        let coord = self.layout.locate(pos)?;
        self.chunks
            .get(&coord.chunk)?
            .tile(coord.local_x, coord.local_z)
            .copied()
    }

    /// Chebyshev neighbourhood of the chunk containing `position`.
    pub fn active_chunks_for(&self, position: Vec3, view_radius: i32) -> BTreeSet<ChunkCoord> {
        let center = self.layout.chunk_of(position);
        let r = view_radius.max(0);
        let mut set = BTreeSet::new();
        for dz in -r..=r {
            for dx in -r..=r {
                set.insert(ChunkCoord::new(center.x + dx, center.z + dz));
            }
        }
        set
    }

    /// Currently active chunks, as of the last `update`.
    pub fn active(&self) -> &BTreeSet<ChunkCoord> {
        &self.active
    }

    /// Recompute the active set, build any chunk that just entered it, and
    /// report what changed. Chunks outside the world bound are skipped.
    pub fn update(&mut self, position: Vec3, view_radius: i32) -> ChunkDelta {
        let wanted: BTreeSet<ChunkCoord> = self
            .active_chunks_for(position, view_radius)
            .into_iter()
            .filter(|c| self.in_bounds(*c))
            .collect();

        let delta = ChunkDelta {
            entered: wanted.difference(&self.active).copied().collect(),
            left: self.active.difference(&wanted).copied().collect(),
        };
        for &coord in &delta.entered {
            self.ensure_chunk(coord);
        }
        if !delta.is_empty() {
            debug!(
                "[CHUNK] Active set changed: +{} -{} ({} active, {} built)",
                delta.entered.len(),
                delta.left.len(),
                wanted.len(),
                self.chunks.len()
            );
        }
        self.active = wanted;
        delta
    }
}

impl TileSource for ChunkIndex {
    fn layout(&self) -> GridLayout {
        self.layout
    }

    fn tile_at(&mut self, pos: Vec3) -> Option<Tile> {
        let coord = self.layout.locate(pos)?;
        let chunk = match self.policy {
            GenerationPolicy::OnDemand => self.ensure_chunk(coord.chunk)?,
            GenerationPolicy::Streamed => self.chunks.get_mut(&coord.chunk)?,
        };
        chunk.tile(coord.local_x, coord.local_z).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts populate calls and blocks local (0, 0).
    struct Counting {
        calls: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl ChunkGenerator for Counting {
        fn populate(&mut self, chunk: &mut Chunk, obstacles: &mut ObstacleRegistry) {
            self.calls.set(self.calls.get() + 1);
            obstacles.place_fixed(chunk, &[(0, 0)]);
        }
    }

    #[test]
    fn test_tile_at_creates_chunk_once() {
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let mut index = ChunkIndex::with_generator(&NavConfig::default(), Counting { calls: calls.clone() });

        let a = index.tile_at(Vec3::new(1.0, 0.0, 1.0)).unwrap();
        let b = index.tile_at(Vec3::new(1.2, 0.0, 1.3)).unwrap();
        assert_eq!(a, b);
        index.tile_at(Vec3::new(-3.0, 0.0, 7.0));
        assert_eq!(index.chunk_count(), 1);
        assert_eq!(calls.get(), 1);

        let corner = index.tile_at(Vec3::new(-15.5, 0.0, -15.5)).unwrap();
        assert!(!corner.is_walkable());
        assert_eq!(index.obstacles().obstacles_in(ChunkCoord::new(0, 0)), &[corner.coord()]);
    }

    #[test]
    fn test_place_fixed_builds_chunk_and_blocks() {
        let mut index = ChunkIndex::new(&NavConfig::default());
        let placed = index.place_fixed(ChunkCoord::new(1, 0), &[(2, 3), (2, 4)]);
        assert_eq!(placed.len(), 2);
        assert_eq!(index.chunk_count(), 1);
        // Chunk (1,0) tile (2,3): x = 32 - 16 + 2.5, z = -16 + 3.5
        let tile = index.peek_tile(Vec3::new(18.5, 0.0, -12.5)).unwrap();
        assert!(!tile.is_walkable());
    }

    #[test]
    fn test_clearance_holds_across_chunk_seams() {
        let mut index = ChunkIndex::new(&NavConfig::default());
        let east_edge = index.place_obstacles(ChunkCoord::new(0, 0), &[(31, 5)], 1);
        assert_eq!(east_edge.len(), 1);

        assert!(index.place_obstacles(ChunkCoord::new(1, 0), &[(0, 5)], 1).is_empty());
        assert!(index.place_obstacles(ChunkCoord::new(1, 0), &[(0, 6)], 1).is_empty());
        assert!(index.peek_tile(Vec3::new(16.5, 0.0, -10.5)).unwrap().is_walkable());
        assert_eq!(index.place_obstacles(ChunkCoord::new(1, 0), &[(1, 5)], 1).len(), 1);

        // Diagonal neighbour across a chunk corner.
        index.place_obstacles(ChunkCoord::new(0, 0), &[(31, 31)], 1);
        assert!(index.place_obstacles(ChunkCoord::new(1, 1), &[(0, 0)], 1).is_empty());
    }

    #[test]
    fn test_place_outside_bound_is_noop() {
        let mut config = NavConfig::default();
        config.grid.world_bound = Some(1);
        let mut index = ChunkIndex::new(&config);
        assert!(index.place_obstacles(ChunkCoord::new(5, 0), &[(3, 3)], 1).is_empty());
        assert_eq!(index.chunk_count(), 0);
    }

    #[test]
    fn test_peek_does_not_generate() {
        let mut index = ChunkIndex::new(&NavConfig::default());
        assert!(index.peek_tile(Vec3::ZERO).is_none());
        index.tile_at(Vec3::ZERO);
        assert!(index.peek_tile(Vec3::ZERO).is_some());
        assert_eq!(index.chunk_count(), 1);
    }

    #[test]
    fn test_world_bound_limits_generation() {
        let mut config = NavConfig::default();
        config.grid.world_bound = Some(0);
        let mut index = ChunkIndex::new(&config);
        assert!(index.tile_at(Vec3::new(10.0, 0.0, 0.0)).is_some());
        assert!(index.tile_at(Vec3::new(20.0, 0.0, 0.0)).is_none());
        assert_eq!(index.chunk_count(), 1);
    }

    #[test]
    fn test_streamed_policy_only_resolves_built_chunks() {
        let mut config = NavConfig::default();
        config.grid.generation = GenerationPolicy::Streamed;
        let mut index = ChunkIndex::new(&config);
        assert!(index.tile_at(Vec3::ZERO).is_none());

        index.update(Vec3::ZERO, 1);
        assert!(index.tile_at(Vec3::new(40.0, 0.0, 40.0)).is_some());
        assert!(index.tile_at(Vec3::new(60.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_active_chunks_chebyshev_square() {
        let index = ChunkIndex::new(&NavConfig::default());
        let set = index.active_chunks_for(Vec3::new(33.0, 0.0, 0.0), 1);
        assert_eq!(set.len(), 9);
        assert!(set.contains(&ChunkCoord::new(0, -1)));
        assert!(set.contains(&ChunkCoord::new(2, 1)));
        assert!(!set.contains(&ChunkCoord::new(3, 0)));

        assert_eq!(index.active_chunks_for(Vec3::ZERO, 0).len(), 1);
    }

    #[test]
    fn test_update_reports_delta() {
        let mut index = ChunkIndex::new(&NavConfig::default());
        let first = index.update(Vec3::ZERO, 1);
        assert_eq!(first.entered.len(), 9);
        assert!(first.left.is_empty());
        assert_eq!(index.chunk_count(), 9);

        assert!(index.update(Vec3::new(5.0, 0.0, 5.0), 1).is_empty());

        // One chunk east: a column enters, a column leaves.
        let moved = index.update(Vec3::new(32.0, 0.0, 0.0), 1);
        assert_eq!(moved.entered, vec![ChunkCoord::new(2, -1), ChunkCoord::new(2, 0), ChunkCoord::new(2, 1)]);
        assert_eq!(moved.left.len(), 3);
        assert!(moved.left.iter().all(|c| c.x == -1));
        // Left chunks are hidden, not evicted.
        assert_eq!(index.chunk_count(), 12);
    }
}
