// Tile-graph navigation for a single agent.
//
// Layer 1: neighbors8, walkable 8-connected neighbours with corner-cut
//          prevention. Lookups go through world positions, so chunk seams
//          are invisible to everything above this layer.
// Layer 2: PathPlanner, A* over that graph. Edge cost and heuristic are both
//          Euclidean distance between tile centres (consistent), so the first
//          time the goal is dequeued its path is optimal.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use glam::Vec3;
use log::{debug, trace};

use super::chunk_index::TileSource;
use super::config::PlannerConfig;
use super::error::{Endpoint, NavError, Result};
use super::grid::{Tile, TileCoord};

// ============================================================================
// NEIGHBOUR RESOLUTION
// ============================================================================

/// (dx, dz) offsets in the order neighbours are reported: row by row along Z,
/// -X to +X within a row.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (-1,  0),          (1,  0),
    (-1,  1), (0,  1), (1,  1),
];

/// Walkable neighbours of `tile`. A diagonal is only reported when both
/// orthogonal tiles it passes between are walkable too.
///
/// `tile` itself does not need to be walkable.
pub fn neighbors8<S: TileSource + ?Sized>(source: &mut S, tile: &Tile) -> Vec<Tile> {
    let step = source.layout().tile_size;
    let center = tile.center();
    let mut out = Vec::with_capacity(8);

    for (dx, dz) in NEIGHBOR_OFFSETS {
        let Some(neighbor) = walkable_at(source, center, dx, dz, step) else {
            continue;
        };
        if dx != 0 && dz != 0 {
            let side_x = walkable_at(source, center, dx, 0, step);
            let side_z = walkable_at(source, center, 0, dz, step);
            if side_x.is_none() || side_z.is_none() {
                continue;
            }
        }
        out.push(neighbor);
    }
    out
}

fn walkable_at<S: TileSource + ?Sized>(
    source: &mut S,
    center: Vec3,
    dx: i32,
    dz: i32,
    step: f32,
) -> Option<Tile> {
    let pos = center + Vec3::new(dx as f32 * step, 0.0, dz as f32 * step);
    source.tile_at(pos).filter(Tile::is_walkable)
}

// ============================================================================
// PATH
// ============================================================================

/// Tile-centre waypoints from just after the start tile up to and including
/// the goal tile. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    waypoints: Vec<Vec3>,
    /// Sum of segment lengths, measured from the start tile's centre.
    length: f32,
}

impl Path {
    /// `None` for an empty waypoint list.
    pub fn new(origin: Vec3, waypoints: Vec<Vec3>) -> Option<Self> {
        if waypoints.is_empty() {
            return None;
        }
        let mut length = 0.0;
        let mut prev = origin;
        for &wp in &waypoints {
            length += prev.distance(wp);
            prev = wp;
        }
        Some(Self { waypoints, length })
    }

    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn goal(&self) -> Vec3 {
        self.waypoints[self.waypoints.len() - 1]
    }
}

// ============================================================================
// A* PLANNER
// ============================================================================

/// Open-set entry. Ordered so `BinaryHeap` (a max-heap) pops the lowest `f`
/// first, and among equal `f` the earliest pushed.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    f: f32,
    g: f32,
    seq: u64,
    coord: TileCoord,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

#[derive(Debug, Clone)]
pub struct PathPlanner {
    max_expansions: usize,
}

impl Default for PathPlanner {
    fn default() -> Self {
        Self::new(&PlannerConfig::default())
    }
}

impl PathPlanner {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            max_expansions: config.max_expansions,
        }
    }

    /// Plan and discard the failure cause. This is what input handlers call:
    /// every failure means "don't move".
    pub fn find_path<S: TileSource + ?Sized>(&self, source: &mut S, start: Vec3, end: Vec3) -> Option<Path> {
        match self.plan(source, start, end) {
            Ok(path) => Some(path),
            Err(err) => {
                debug!(
                    "[PATH] No path ({:.2}, {:.2}) -> ({:.2}, {:.2}): {}",
                    start.x, start.z, end.x, end.z, err
                );
                None
            }
        }
    }

    /// A* from the tile under `start` to the tile under `end`.
    pub fn plan<S: TileSource + ?Sized>(&self, source: &mut S, start: Vec3, end: Vec3) -> Result<Path> {
        let start_tile = source
            .tile_at(start)
            .ok_or(NavError::TileNotFound { which: Endpoint::Start })?;
        let goal_tile = source
            .tile_at(end)
            .ok_or(NavError::TileNotFound { which: Endpoint::Goal })?;

        if !goal_tile.is_walkable() {
            return Err(NavError::InvalidGoal);
        }
        let start_coord = start_tile.coord();
        let goal_coord = goal_tile.coord();
        if start_coord == goal_coord {
            return Err(NavError::AlreadyAtGoal);
        }

        // A goal with no way in can't be reached, and in an unbounded world
        // the search would otherwise only stop at the expansion cap.
        if neighbors8(source, &goal_tile).is_empty()
            && !neighbors8(source, &start_tile).iter().any(|t| t.coord() == goal_coord)
        {
            return Err(NavError::Unreachable);
        }

        let goal_center = goal_tile.center();
        let mut open = BinaryHeap::new();
        let mut tiles: HashMap<TileCoord, Tile> = HashMap::new();
        let mut g_score: HashMap<TileCoord, f32> = HashMap::new();
        let mut came_from: HashMap<TileCoord, TileCoord> = HashMap::new();
        let mut closed: HashSet<TileCoord> = HashSet::new();
        let mut seq = 0u64;
        let mut expanded = 0usize;

        tiles.insert(start_coord, start_tile);
        g_score.insert(start_coord, 0.0);
        open.push(Frontier {
            f: start_tile.center().distance(goal_center),
            g: 0.0,
            seq,
            coord: start_coord,
        });

        while let Some(node) = open.pop() {
            if node.coord == goal_coord {
                trace!("[PATH] Goal reached after {} expansions", expanded);
                return Self::reconstruct(&tiles, &came_from, start_tile, goal_coord);
            }
            // Entries superseded by a cheaper push are skipped here.
            if !closed.insert(node.coord) {
                continue;
            }
            expanded += 1;
            if expanded > self.max_expansions {
                return Err(NavError::SearchLimit { expanded: self.max_expansions });
            }

            let Some(current) = tiles.get(&node.coord).copied() else {
                continue;
            };
            for neighbor in neighbors8(source, &current) {
                let coord = neighbor.coord();
                if closed.contains(&coord) {
                    continue;
                }
                let tentative = node.g + current.center().distance(neighbor.center());
                let known = g_score.get(&coord).copied().unwrap_or(f32::INFINITY);
                if tentative < known {
                    g_score.insert(coord, tentative);
                    came_from.insert(coord, node.coord);
                    tiles.insert(coord, neighbor);
                    seq += 1;
                    open.push(Frontier {
                        f: tentative + neighbor.center().distance(goal_center),
                        g: tentative,
                        seq,
                        coord,
                    });
                }
            }
        }

        Err(NavError::Unreachable)
    }

    fn reconstruct(
        tiles: &HashMap<TileCoord, Tile>,
        came_from: &HashMap<TileCoord, TileCoord>,
        start: Tile,
        goal: TileCoord,
    ) -> Result<Path> {
        let mut waypoints = Vec::new();
        let mut cursor = goal;
        while cursor != start.coord() {
            let tile = tiles.get(&cursor).ok_or(NavError::Unreachable)?;
            waypoints.push(tile.center());
            cursor = *came_from.get(&cursor).ok_or(NavError::Unreachable)?;
        }
        waypoints.reverse();

        let path = Path::new(start.center(), waypoints).ok_or(NavError::AlreadyAtGoal)?;
        debug!(
            "[PATH] {} waypoints, length {:.2}",
            path.len(),
            path.length()
        );
        Ok(path)
    }
}
