// Top-level game context.
//
// One GameWorld per session. It owns the chunk index, the planner and the ECS
// world holding the player, and is passed by reference to whatever needs it;
// there is no global state. The owning frame loop calls `tick` once per
// frame and nothing else advances time.

use std::collections::BTreeSet;

use bevy_ecs::prelude::*;
use glam::Vec3;
use log::{debug, info};

use super::chunk_index::{ChunkDelta, ChunkGenerator, ChunkIndex, FlatGenerator};
use super::components::{Player, Transform};
use super::config::NavConfig;
use super::follower::{FollowEvent, PathFollower};
use super::grid::{ChunkCoord, TileCoord};
use super::navigation::{Path, PathPlanner};
use super::obstacles::LocalTile;
use super::systems::{chunk_streaming_system, path_follow_system, waypoint_validation_system};

/// Everything one `tick` changed that outside collaborators care about.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    /// Chunks to show / hide.
    pub chunks: ChunkDelta,
    /// Waypoint and arrival events, per entity.
    pub events: Vec<(Entity, FollowEvent)>,
    /// Followers stopped because their next waypoint became blocked.
    pub invalidated: Vec<Entity>,
}

pub struct GameWorld {
    config: NavConfig,
    chunks: ChunkIndex,
    planner: PathPlanner,
    ecs: World,
    player: Entity,
}

impl GameWorld {
    /// All-walkable world with the player at the origin.
    pub fn new(config: NavConfig) -> Self {
        Self::with_generator(config, FlatGenerator)
    }

    pub fn with_generator(config: NavConfig, generator: impl ChunkGenerator + 'static) -> Self {
        let mut chunks = ChunkIndex::with_generator(&config, generator);
        let planner = PathPlanner::new(&config.planner);

        let mut ecs = World::new();
        let player = ecs
            .spawn((
                Transform::default(),
                PathFollower::new(&config.follower),
                Player,
            ))
            .id();

        chunks.update(Vec3::ZERO, config.streaming.view_radius);
        info!(
            "World ready: {} chunks around spawn, tile {} / chunk {}",
            chunks.chunk_count(),
            config.grid.tile_size,
            config.grid.chunk_tiles
        );

        Self {
            config,
            chunks,
            planner,
            ecs,
            player,
        }
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    pub fn chunks(&self) -> &ChunkIndex {
        &self.chunks
    }

    pub fn ecs(&self) -> &World {
        &self.ecs
    }

    pub fn ecs_mut(&mut self) -> &mut World {
        &mut self.ecs
    }

    pub fn player(&self) -> Entity {
        self.player
    }

    pub fn player_transform(&self) -> Transform {
        self.ecs.get::<Transform>(self.player).copied().unwrap_or_default()
    }

    /// Put the player somewhere directly (spawn points, teleports).
    /// Any movement in progress is dropped.
    pub fn set_player_position(&mut self, position: Vec3) {
        self.cancel();
        if let Some(mut transform) = self.ecs.get_mut::<Transform>(self.player) {
            transform.position = position;
        }
    }

    pub fn active_chunks(&self) -> &BTreeSet<ChunkCoord> {
        self.chunks.active()
    }

    /// Block tiles for authored scenery, e.g. walls.
    pub fn place_fixed(&mut self, chunk: ChunkCoord, tiles: &[LocalTile]) -> Vec<TileCoord> {
        self.chunks.place_fixed(chunk, tiles)
    }

    /// Scatter-style placement with clearance.
    pub fn place_obstacles(&mut self, chunk: ChunkCoord, candidates: &[LocalTile], clearance: u32) -> Vec<TileCoord> {
        self.chunks.place_obstacles(chunk, candidates, clearance)
    }

    pub fn find_path(&mut self, start: Vec3, end: Vec3) -> Option<Path> {
        self.planner.find_path(&mut self.chunks, start, end)
    }

    /// Plan from the player's position to `target` and start walking.
    /// Returns false, leaving any current movement untouched, when there is
    /// no path.
    pub fn move_to(&mut self, target: Vec3) -> bool {
        let start = self.player_transform().position;
        let Some(path) = self.find_path(start, target) else {
            return false;
        };
        match self.ecs.get_mut::<PathFollower>(self.player) {
            Some(mut follower) => {
                follower.follow(path);
                true
            }
            None => false,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.ecs
            .get::<PathFollower>(self.player)
            .is_some_and(PathFollower::is_moving)
    }

    pub fn cancel(&mut self) {
        if let Some(mut follower) = self.ecs.get_mut::<PathFollower>(self.player) {
            follower.cancel();
        }
    }

    /// Advance one frame: stream chunks, optionally re-validate waypoints,
    /// then move.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let chunks = chunk_streaming_system(&mut self.ecs, &mut self.chunks, self.config.streaming.view_radius);

        let invalidated = if self.config.follower.validate_waypoints {
            waypoint_validation_system(&mut self.ecs, &self.chunks)
        } else {
            Vec::new()
        };

        let events = path_follow_system(&mut self.ecs, dt);
        for (entity, event) in &events {
            if *event == FollowEvent::Arrived {
                debug!("[WORLD] {:?} arrived", entity);
            }
        }

        TickReport {
            chunks,
            events,
            invalidated,
        }
    }
}
