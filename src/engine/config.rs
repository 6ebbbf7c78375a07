// Tunables for the grid, streaming, obstacles, planner and follower.
//
// Every section has sensible defaults, so a RON file only needs to name the
// fields it overrides:
//
//   (grid: (tile_size: 2.0), follower: (speed: 6.0))

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

// ============================================================================
// SECTIONS
// ============================================================================

/// When `tile_at` is allowed to build a chunk that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationPolicy {
    /// Any lookup builds the containing chunk.
    OnDemand,
    /// Only `ChunkIndex::update` builds chunks; lookups outside the built
    /// area resolve to nothing.
    Streamed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// World units per tile edge.
    pub tile_size: f32,
    /// Tiles along one chunk edge. Must be even so the chunk can be centred
    /// on its origin.
    pub chunk_tiles: u32,
    pub generation: GenerationPolicy,
    /// Chebyshev radius (in chunks) around the origin beyond which nothing is
    /// ever generated. `None` = unbounded.
    pub world_bound: Option<i32>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            tile_size: 1.0,
            chunk_tiles: 32,
            generation: GenerationPolicy::OnDemand,
            world_bound: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Chunks kept active around the player, Chebyshev distance.
    pub view_radius: i32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self { view_radius: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Minimum Chebyshev distance between two blocked tiles, minus one.
    /// 1 = every rock has a full ring of open ground.
    pub clearance: u32,
    /// Candidate rock sites rolled per chunk.
    pub rocks_per_chunk: usize,
    /// Tiles along the chunk border that never receive rocks.
    pub edge_margin: u32,
    pub seed: u64,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            clearance: 1,
            rocks_per_chunk: 6,
            edge_margin: 1,
            seed: 0x7e11_5eed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Tiles expanded before the search gives up.
    pub max_expansions: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self { max_expansions: 20_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowerConfig {
    /// World units per second.
    pub speed: f32,
    /// Upper bound on a single tick's dt, in seconds.
    pub max_dt: f32,
    /// Distance under which a waypoint counts as reached.
    pub arrival_epsilon: f32,
    /// Steps shorter than this leave yaw untouched.
    pub min_facing_step: f32,
    /// Cancel movement when the next waypoint's tile becomes blocked.
    pub validate_waypoints: bool,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            speed: 4.0,
            max_dt: 0.05,
            arrival_epsilon: 1e-3,
            min_facing_step: 1e-4,
            validate_waypoints: false,
        }
    }
}

// ============================================================================
// NAV CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub grid: GridConfig,
    pub streaming: StreamingConfig,
    pub obstacles: ObstacleConfig,
    pub planner: PlannerConfig,
    pub follower: FollowerConfig,
}

impl NavConfig {
    /// Parse and validate a RON document.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let config: NavConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = &self.grid;
        if !(grid.tile_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "grid.tile_size must be positive, got {}",
                grid.tile_size
            )));
        }
        if grid.chunk_tiles == 0 || grid.chunk_tiles % 2 != 0 {
            return Err(ConfigError::Invalid(format!(
                "grid.chunk_tiles must be a positive even number, got {}",
                grid.chunk_tiles
            )));
        }
        if matches!(grid.world_bound, Some(bound) if bound < 0) {
            return Err(ConfigError::Invalid("grid.world_bound cannot be negative".into()));
        }
        if self.streaming.view_radius < 0 {
            return Err(ConfigError::Invalid("streaming.view_radius cannot be negative".into()));
        }
        if self.obstacles.clearance == 0 {
            return Err(ConfigError::Invalid("obstacles.clearance must be at least 1".into()));
        }

        let follower = &self.follower;
        for (name, value) in [
            ("follower.speed", follower.speed),
            ("follower.max_dt", follower.max_dt),
            ("follower.arrival_epsilon", follower.arrival_epsilon),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        Ok(())
    }

    /// World-space edge length of one chunk.
    pub fn chunk_extent(&self) -> f32 {
        self.grid.tile_size * self.grid.chunk_tiles as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = NavConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_extent(), 32.0);
    }

    #[test]
    fn test_partial_ron_keeps_other_defaults() {
        let config = NavConfig::from_ron("(grid: (tile_size: 2.0), follower: (speed: 6.0))").unwrap();
        assert_eq!(config.grid.tile_size, 2.0);
        assert_eq!(config.grid.chunk_tiles, 32);
        assert_eq!(config.follower.speed, 6.0);
        assert_eq!(config.follower.max_dt, 0.05);
        assert_eq!(config.chunk_extent(), 64.0);
    }

    #[test]
    fn test_generation_policy_parses() {
        let config = NavConfig::from_ron("(grid: (generation: Streamed, world_bound: Some(3)))").unwrap();
        assert_eq!(config.grid.generation, GenerationPolicy::Streamed);
        assert_eq!(config.grid.world_bound, Some(3));
    }

    #[test]
    fn test_odd_chunk_side_rejected() {
        let err = NavConfig::from_ron("(grid: (chunk_tiles: 31))").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_speed_rejected() {
        let err = NavConfig::from_ron("(follower: (speed: 0.0))").unwrap_err();
        assert!(err.to_string().contains("follower.speed"));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = NavConfig::from_ron("(grid: [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = NavConfig::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
