// Path following: the per-tick movement state machine.
//
//   Idle --follow(path)--> Moving --last waypoint reached / cancel()--> Idle
//
// Each tick moves the agent straight at the current waypoint by at most
// speed·dt. dt is clamped to `max_dt` so a frame hitch can't fling the agent
// past a waypoint. On arrival the position snaps exactly onto the waypoint
// before the next one is targeted.

use bevy_ecs::prelude::*;
use glam::Vec3;
use log::debug;

use super::components::Transform;
use super::config::FollowerConfig;
use super::navigation::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveState {
    #[default]
    Idle,
    Moving,
}

/// What happened during one `tick`, for animation/camera listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowEvent {
    /// Nothing to do.
    Idle,
    /// Moved toward the current waypoint without reaching it.
    Stepped,
    /// Reached waypoint `i` and moved on to `i + 1`.
    WaypointReached(usize),
    /// Reached the final waypoint; now idle.
    Arrived,
}

#[derive(Component, Debug, Clone)]
pub struct PathFollower {
    speed: f32,
    max_dt: f32,
    arrival_epsilon: f32,
    min_facing_step: f32,
    state: MoveState,
    path: Option<Path>,
    /// Index of the waypoint currently being walked to.
    next: usize,
}

impl PathFollower {
    pub fn new(config: &FollowerConfig) -> Self {
        Self {
            speed: config.speed,
            max_dt: config.max_dt,
            arrival_epsilon: config.arrival_epsilon,
            min_facing_step: config.min_facing_step,
            state: MoveState::Idle,
            path: None,
            next: 0,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    pub fn state(&self) -> MoveState {
        self.state
    }

    pub fn is_moving(&self) -> bool {
        self.state == MoveState::Moving
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    /// Waypoint currently being walked to.
    pub fn destination(&self) -> Option<Vec3> {
        self.path.as_ref()?.waypoints().get(self.next).copied()
    }

    /// Waypoints not reached yet, current destination first.
    pub fn remaining_waypoints(&self) -> &[Vec3] {
        match &self.path {
            Some(path) => &path.waypoints()[self.next.min(path.len())..],
            None => &[],
        }
    }

    /// Replace whatever is being followed with `path`.
    pub fn follow(&mut self, path: Path) {
        debug!(
            "[FOLLOW] New path: {} waypoints, goal ({:.2}, {:.2})",
            path.len(),
            path.goal().x,
            path.goal().z
        );
        self.path = Some(path);
        self.next = 0;
        self.state = MoveState::Moving;
    }

    /// Drop the remaining waypoints and go idle where we stand.
    pub fn cancel(&mut self) {
        if self.is_moving() {
            debug!("[FOLLOW] Cancelled with {} waypoints left", self.remaining_waypoints().len());
        }
        self.clear();
    }

    /// Advance one frame. Never panics; a no-op while idle.
    pub fn tick(&mut self, transform: &mut Transform, dt: f32) -> FollowEvent {
        if self.state == MoveState::Idle {
            return FollowEvent::Idle;
        }
        let Some(dest) = self.destination() else {
            self.clear();
            return FollowEvent::Idle;
        };

        // NaN would slip through clamp and turn the step into a teleport.
        let dt = if dt.is_finite() { dt.clamp(0.0, self.max_dt) } else { 0.0 };
        let to_dest = dest - transform.position;
        let remaining = to_dest.length();
        let step = remaining.min(self.speed * dt);

        if remaining > 0.0 {
            transform.position += to_dest / remaining * step;
        }
        if step > self.min_facing_step {
            transform.yaw = to_dest.x.atan2(to_dest.z);
        }

        if transform.position.distance(dest) >= self.arrival_epsilon {
            return FollowEvent::Stepped;
        }

        transform.position = dest;
        let reached = self.next;
        self.next += 1;
        if self.next >= self.path.as_ref().map_or(0, Path::len) {
            debug!("[FOLLOW] Arrived at ({:.2}, {:.2})", dest.x, dest.z);
            self.clear();
            return FollowEvent::Arrived;
        }
        FollowEvent::WaypointReached(reached)
    }

    fn clear(&mut self) {
        self.path = None;
        self.next = 0;
        self.state = MoveState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn follower(speed: f32) -> PathFollower {
        PathFollower::new(&FollowerConfig {
            speed,
            ..FollowerConfig::default()
        })
    }

    fn path(from: Vec3, points: &[Vec3]) -> Path {
        Path::new(from, points.to_vec()).unwrap()
    }

    #[test]
    fn test_starts_idle_and_idle_tick_is_noop() {
        let mut f = follower(4.0);
        let mut t = Transform::from_position(Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(f.state(), MoveState::Idle);
        assert_eq!(f.tick(&mut t, 0.016), FollowEvent::Idle);
        assert_eq!(t, Transform::from_position(Vec3::new(1.0, 0.0, 2.0)));
        assert!(f.destination().is_none());
        assert!(f.remaining_waypoints().is_empty());
    }

    #[test]
    fn test_arrival_after_ceil_distance_over_step_ticks() {
        // d = 3, s = 2, dt = 0.05 -> 0.1 per tick -> 30 ticks.
        let mut f = follower(2.0);
        let mut t = Transform::default();
        let goal = Vec3::new(3.0, 0.0, 0.0);
        f.follow(path(Vec3::ZERO, &[goal]));
        assert_eq!(f.destination(), Some(goal));

        let mut ticks = 0;
        while f.is_moving() {
            ticks += 1;
            f.tick(&mut t, 0.05);
            assert!(ticks <= 100, "never arrived");
        }
        assert_eq!(ticks, (3.0f32 / (2.0 * 0.05)).ceil() as i32);
        assert_eq!(t.position, goal);
    }

    #[test]
    fn test_partial_final_step_arrives_exactly() {
        // d = 1, step 0.3 -> ceil(3.33) = 4 ticks.
        let mut f = follower(6.0);
        let mut t = Transform::default();
        let goal = Vec3::new(0.0, 0.0, -1.0);
        f.follow(path(Vec3::ZERO, &[goal]));
        let events: Vec<_> = (0..4).map(|_| f.tick(&mut t, 0.05)).collect();
        assert_eq!(&events[..3], &[FollowEvent::Stepped; 3]);
        assert_eq!(events[3], FollowEvent::Arrived);
        assert_eq!(t.position, goal);
        assert_eq!(f.state(), MoveState::Idle);
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut f = follower(4.0);
        let mut t = Transform::default();
        f.follow(path(Vec3::ZERO, &[Vec3::new(10.0, 0.0, 0.0)]));
        f.tick(&mut t, 2.0);
        assert!((t.position.x - 4.0 * 0.05).abs() < 1e-6);
        f.tick(&mut t, -1.0);
        assert!((t.position.x - 4.0 * 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_dt_does_not_move() {
        let mut f = follower(4.0);
        let mut t = Transform::default();
        f.follow(path(Vec3::ZERO, &[Vec3::new(2.0, 0.0, 0.0)]));
        for dt in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert_eq!(f.tick(&mut t, dt), FollowEvent::Stepped);
            assert_eq!(t.position, Vec3::ZERO);
        }
        assert!(f.is_moving());
        f.tick(&mut t, 0.05);
        assert!((t.position.x - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_faces_direction_of_travel() {
        let mut f = follower(4.0);
        let mut t = Transform::default();
        f.follow(path(Vec3::ZERO, &[Vec3::new(5.0, 0.0, 0.0)]));
        f.tick(&mut t, 0.05);
        assert!((t.yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert!((t.forward() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_zero_dt_keeps_yaw() {
        let mut f = follower(4.0);
        let mut t = Transform { position: Vec3::ZERO, yaw: 1.0 };
        f.follow(path(Vec3::ZERO, &[Vec3::new(0.0, 0.0, -5.0)]));
        assert_eq!(f.tick(&mut t, 0.0), FollowEvent::Stepped);
        assert_eq!(t.yaw, 1.0);
    }

    #[test]
    fn test_walks_waypoints_in_order() {
        let mut f = follower(10.0);
        let mut t = Transform::default();
        let a = Vec3::new(0.5, 0.0, 0.0);
        let b = Vec3::new(0.5, 0.0, 0.5);
        f.follow(path(Vec3::ZERO, &[a, b]));

        assert_eq!(f.tick(&mut t, 0.05), FollowEvent::WaypointReached(0));
        assert_eq!(t.position, a);
        assert_eq!(f.destination(), Some(b));
        assert_eq!(f.remaining_waypoints(), &[b]);
        assert_eq!(f.tick(&mut t, 0.05), FollowEvent::Arrived);
        assert_eq!(t.position, b);
        assert!(!f.is_moving());
    }

    #[test]
    fn test_cancel_stops_immediately() {
        let mut f = follower(4.0);
        let mut t = Transform::default();
        f.follow(path(Vec3::ZERO, &[Vec3::new(5.0, 0.0, 5.0)]));
        f.tick(&mut t, 0.05);
        let stopped_at = t;

        f.cancel();
        assert!(!f.is_moving());
        assert!(f.path().is_none());
        assert_eq!(f.tick(&mut t, 0.05), FollowEvent::Idle);
        assert_eq!(t, stopped_at);
    }

    #[test]
    fn test_new_path_replaces_old() {
        let mut f = follower(4.0);
        let mut t = Transform::default();
        f.follow(path(Vec3::ZERO, &[Vec3::new(5.0, 0.0, 0.0), Vec3::new(6.0, 0.0, 0.0)]));
        f.tick(&mut t, 0.05);
        let fresh = Vec3::new(-3.0, 0.0, 0.0);
        f.follow(path(t.position, &[fresh]));
        assert_eq!(f.destination(), Some(fresh));
        assert_eq!(f.remaining_waypoints().len(), 1);
        f.tick(&mut t, 0.05);
        assert!(t.position.x < 0.2);
    }
}
