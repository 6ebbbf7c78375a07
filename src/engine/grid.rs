// Tile/chunk coordinate model.
//
// The world is an unbounded XZ plane cut into square chunks of N×N tiles.
// Chunk (cx, cz) is centred on (cx·E, 0, cz·E) where E = N·tile_size, so its
// tiles cover [-N/2, +N/2) tile units around that origin. Local tile indices
// run 0..N on both axes, local (0, 0) being the -X/-Z corner.

use glam::{IVec2, Vec3};

// ============================================================================
// COORDINATES
// ============================================================================

/// Chunk address on the XZ plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chebyshev distance in chunks.
    pub fn chebyshev(self, other: ChunkCoord) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

/// Full address of a tile: owning chunk plus local index inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub chunk: ChunkCoord,
    pub local_x: u32,
    pub local_z: u32,
}

impl TileCoord {
    pub const fn new(chunk: ChunkCoord, local_x: u32, local_z: u32) -> Self {
        Self { chunk, local_x, local_z }
    }

    /// Position on the seamless world-wide tile lattice. Adjacent tiles in
    /// neighbouring chunks differ by exactly one here.
    pub fn global(self, chunk_tiles: u32) -> IVec2 {
        let n = chunk_tiles as i32;
        IVec2::new(
            self.chunk.x * n + self.local_x as i32 - n / 2,
            self.chunk.z * n + self.local_z as i32 - n / 2,
        )
    }

    /// Chebyshev distance in tiles, across chunk seams.
    pub fn chebyshev(self, other: TileCoord, chunk_tiles: u32) -> u32 {
        let d = (self.global(chunk_tiles) - other.global(chunk_tiles)).abs();
        d.x.max(d.y) as u32
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

/// Pure coordinate math for a given tile size and chunk side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub tile_size: f32,
    pub chunk_tiles: u32,
}

impl GridLayout {
    pub fn new(tile_size: f32, chunk_tiles: u32) -> Self {
        Self { tile_size, chunk_tiles }
    }

    /// World-space edge length of one chunk.
    #[inline]
    pub fn chunk_extent(&self) -> f32 {
        self.tile_size * self.chunk_tiles as f32
    }

    /// Chunk containing a world position (floor division, origin-centred).
    pub fn chunk_of(&self, pos: Vec3) -> ChunkCoord {
        let extent = self.chunk_extent();
        let half = extent * 0.5;
        ChunkCoord::new(
            ((pos.x + half) / extent).floor() as i32,
            ((pos.z + half) / extent).floor() as i32,
        )
    }

    /// World-space centre of a chunk (y = 0).
    pub fn chunk_origin(&self, chunk: ChunkCoord) -> Vec3 {
        let extent = self.chunk_extent();
        Vec3::new(chunk.x as f32 * extent, 0.0, chunk.z as f32 * extent)
    }

    /// Tile address for a world position, or `None` when float rounding at a
    /// chunk seam pushes the local index outside `0..N`.
    pub fn locate(&self, pos: Vec3) -> Option<TileCoord> {
        let chunk = self.chunk_of(pos);
        let origin = self.chunk_origin(chunk);
        let half_n = self.chunk_tiles as f32 * 0.5;
        let lx = ((pos.x - origin.x) / self.tile_size + half_n).floor();
        let lz = ((pos.z - origin.z) / self.tile_size + half_n).floor();

        let n = self.chunk_tiles as f32;
        if !(0.0..n).contains(&lx) || !(0.0..n).contains(&lz) {
            return None;
        }
        Some(TileCoord::new(chunk, lx as u32, lz as u32))
    }

    /// World-space centre of a tile (y = 0, on the ground plane).
    pub fn tile_center(&self, coord: TileCoord) -> Vec3 {
        let origin = self.chunk_origin(coord.chunk);
        let half_n = self.chunk_tiles as f32 * 0.5;
        Vec3::new(
            origin.x + (coord.local_x as f32 - half_n + 0.5) * self.tile_size,
            0.0,
            origin.z + (coord.local_z as f32 - half_n + 0.5) * self.tile_size,
        )
    }
}

// ============================================================================
// TILE & CHUNK
// ============================================================================

/// Smallest navigable unit. Position and centre are fixed at creation; only
/// walkability changes, and only through `ObstacleRegistry`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    coord: TileCoord,
    center: Vec3,
    walkable: bool,
}

impl Tile {
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn is_walkable(&self) -> bool {
        self.walkable
    }
}

/// Square block of tiles, the unit of generation and streaming.
#[derive(Debug, Clone)]
pub struct Chunk {
    coord: ChunkCoord,
    side: u32,
    /// Row-major: index = local_z * side + local_x.
    tiles: Vec<Tile>,
}

impl Chunk {
    /// Fully walkable chunk with every tile centre precomputed.
    pub fn new(coord: ChunkCoord, layout: &GridLayout) -> Self {
        let side = layout.chunk_tiles;
        let mut tiles = Vec::with_capacity((side * side) as usize);
        for lz in 0..side {
            for lx in 0..side {
                let tile_coord = TileCoord::new(coord, lx, lz);
                tiles.push(Tile {
                    coord: tile_coord,
                    center: layout.tile_center(tile_coord),
                    walkable: true,
                });
            }
        }
        Self { coord, side, tiles }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    #[inline]
    fn idx(&self, local_x: u32, local_z: u32) -> Option<usize> {
        (local_x < self.side && local_z < self.side).then(|| (local_z * self.side + local_x) as usize)
    }

    pub fn tile(&self, local_x: u32, local_z: u32) -> Option<&Tile> {
        self.idx(local_x, local_z).map(|i| &self.tiles[i])
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    pub fn walkable_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.walkable).count()
    }

    /// Returns false if the local index is out of range.
    pub(crate) fn set_walkable(&mut self, local_x: u32, local_z: u32, walkable: bool) -> bool {
        match self.idx(local_x, local_z) {
            Some(i) => {
                self.tiles[i].walkable = walkable;
                true
            }
            None => false,
        }
    }
}
