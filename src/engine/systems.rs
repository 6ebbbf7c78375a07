// Per-frame systems, run in a fixed order by GameWorld::tick:
//   1. chunk_streaming_system    : active chunk set around the player
//   2. waypoint_validation_system : optional, drops paths into new obstacles
//   3. path_follow_system        : moves followers, writes Transform
//
// Systems take the ECS world and frame inputs explicitly; nothing schedules
// itself.

use bevy_ecs::prelude::*;
use log::warn;

use super::chunk_index::{ChunkDelta, ChunkIndex};
use super::components::{Player, Transform};
use super::follower::{FollowEvent, PathFollower};

/// Re-centre the active chunk set on the player. No player, no change.
pub fn chunk_streaming_system(world: &mut World, chunks: &mut ChunkIndex, view_radius: i32) -> ChunkDelta {
    let mut query = world.query_filtered::<&Transform, With<Player>>();
    match query.iter(world).next() {
        Some(transform) => chunks.update(transform.position, view_radius),
        None => ChunkDelta::default(),
    }
}

/// Cancel any follower whose current waypoint now sits on a blocked tile.
/// Returns the entities that were stopped.
pub fn waypoint_validation_system(world: &mut World, chunks: &ChunkIndex) -> Vec<Entity> {
    let mut stopped = Vec::new();
    let mut query = world.query::<(Entity, &mut PathFollower)>();
    for (entity, mut follower) in query.iter_mut(world) {
        let Some(dest) = follower.destination() else {
            continue;
        };
        let blocked = chunks.peek_tile(dest).is_some_and(|tile| !tile.is_walkable());
        if blocked {
            warn!(
                "[FOLLOW] Waypoint ({:.2}, {:.2}) became unwalkable; stopping {:?}",
                dest.x, dest.z, entity
            );
            follower.cancel();
            stopped.push(entity);
        }
    }
    stopped
}

/// Step every moving follower. Only waypoint/arrival events are reported;
/// plain steps are not.
pub fn path_follow_system(world: &mut World, dt: f32) -> Vec<(Entity, FollowEvent)> {
    let mut events = Vec::new();
    let mut query = world.query::<(Entity, &mut PathFollower, &mut Transform)>();
    for (entity, mut follower, mut transform) in query.iter_mut(world) {
        let event = follower.tick(&mut transform, dt);
        if matches!(event, FollowEvent::WaypointReached(_) | FollowEvent::Arrived) {
            events.push((entity, event));
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{FollowerConfig, NavConfig};
    use crate::engine::grid::ChunkCoord;
    use crate::engine::navigation::Path;
    use glam::Vec3;

    fn walker(world: &mut World, at: Vec3, to: &[Vec3]) -> Entity {
        let mut follower = PathFollower::new(&FollowerConfig::default());
        follower.follow(Path::new(at, to.to_vec()).unwrap());
        world.spawn((Transform::from_position(at), follower)).id()
    }

    #[test]
    fn test_follow_system_moves_and_reports_arrival() {
        let mut world = World::new();
        let goal = Vec3::new(0.1, 0.0, 0.0);
        let e = walker(&mut world, Vec3::ZERO, &[goal]);

        let events = path_follow_system(&mut world, 0.05);
        assert_eq!(events, vec![(e, FollowEvent::Arrived)]);
        assert_eq!(world.get::<Transform>(e).unwrap().position, goal);
        assert!(path_follow_system(&mut world, 0.05).is_empty());
    }

    #[test]
    fn test_streaming_follows_player_only() {
        let mut world = World::new();
        let mut chunks = ChunkIndex::new(&NavConfig::default());
        assert!(chunk_streaming_system(&mut world, &mut chunks, 1).is_empty());

        world.spawn(Transform::from_position(Vec3::new(100.0, 0.0, 0.0)));
        world.spawn((Transform::from_position(Vec3::new(40.0, 0.0, 0.0)), Player));
        let delta = chunk_streaming_system(&mut world, &mut chunks, 0);
        assert_eq!(delta.entered, vec![ChunkCoord::new(1, 0)]);
    }

    #[test]
    fn test_validation_stops_follower_on_blocked_waypoint() {
        let mut world = World::new();
        let mut chunks = ChunkIndex::new(&NavConfig::default());
        // Chunk (0,0) local (17, 16) is centred on (1.5, 0.5).
        let e = walker(&mut world, Vec3::new(0.5, 0.0, 0.5), &[Vec3::new(1.5, 0.0, 0.5)]);
        chunks.place_fixed(ChunkCoord::new(0, 0), &[(20, 20)]);
        assert!(waypoint_validation_system(&mut world, &chunks).is_empty());

        chunks.place_fixed(ChunkCoord::new(0, 0), &[(17, 16)]);
        assert_eq!(waypoint_validation_system(&mut world, &chunks), vec![e]);
        assert!(!world.get::<PathFollower>(e).unwrap().is_moving());
    }
}
