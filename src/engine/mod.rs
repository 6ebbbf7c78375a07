// Engine module - chunked tile world, A* planning and path following
// Everything hangs off GameWorld; the other modules are its parts.

pub mod chunk_index;
pub mod components;
pub mod config;
pub mod error;
pub mod follower;
pub mod grid;
pub mod navigation;
pub mod obstacles;
pub mod systems;
pub mod world;

// Re-export commonly used items
pub use chunk_index::{ChunkDelta, ChunkGenerator, ChunkIndex, FlatGenerator, TileSource};
pub use components::*;
pub use config::NavConfig;
pub use error::{ConfigError, NavError, Result};
pub use follower::{FollowEvent, MoveState, PathFollower};
pub use grid::{Chunk, ChunkCoord, GridLayout, Tile, TileCoord};
pub use navigation::{Path, PathPlanner, neighbors8};
pub use obstacles::{ObstacleRegistry, RockScatter};
pub use world::{GameWorld, TickReport};
