// Headless walk-through of the navigation stack.
// Builds a rock-scattered world, sends the player through a list of targets
// and logs progress once per second. Run with RUST_LOG=debug to see planner
// and chunk streaming output.
//
//   trailhead [config.ron]

use std::time::{Duration, Instant};

use glam::Vec3;
use log::{info, warn};

use trailhead::engine::{FollowEvent, GameWorld, NavConfig, RockScatter};

// ============================================================================
// DEMO ROUTE
// ============================================================================

const TARGETS: [Vec3; 4] = [
    Vec3::new(12.0, 0.0, 5.0),
    Vec3::new(-20.0, 0.0, 18.0),
    Vec3::new(35.0, 0.0, -8.0),
    Vec3::new(0.0, 0.0, 0.0),
];

const FRAME: Duration = Duration::from_millis(16);

/// Give up on a leg that takes longer than this.
const LEG_TIMEOUT: Duration = Duration::from_secs(60);

fn load_config() -> NavConfig {
    let Some(path) = std::env::args().nth(1) else {
        return NavConfig::default();
    };
    match NavConfig::load(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path);
            config
        }
        Err(e) => {
            warn!("Could not load {}: {}; using defaults", path, e);
            NavConfig::default()
        }
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() {
    env_logger::init();

    let config = load_config();
    let scatter = RockScatter::new(&config.obstacles);
    let mut world = GameWorld::with_generator(config, scatter);

    for target in TARGETS {
        let from = world.player_transform().position;
        if !world.move_to(target) {
            warn!(
                "No path from ({:.1}, {:.1}) to ({:.1}, {:.1}); skipping",
                from.x, from.z, target.x, target.z
            );
            continue;
        }
        info!("Heading to ({:.1}, {:.1})", target.x, target.z);

        let leg_start = Instant::now();
        let mut last_update = Instant::now();
        let mut last_report = Instant::now();
        let mut frame_count = 0;

        while world.is_moving() {
            std::thread::sleep(FRAME);
            let now = Instant::now();
            let dt = (now - last_update).as_secs_f32();
            last_update = now;

            let report = world.tick(dt);
            frame_count += 1;

            for (_, event) in &report.events {
                if let FollowEvent::Arrived = event {
                    let p = world.player_transform().position;
                    info!(
                        "Arrived at ({:.2}, {:.2}) after {:.1}s",
                        p.x,
                        p.z,
                        leg_start.elapsed().as_secs_f32()
                    );
                }
            }

            if (now - last_report).as_secs_f32() >= 1.0 {
                let transform = world.player_transform();
                info!(
                    "FPS: {} | Pos: ({:.2}, {:.2}) | Yaw: {:.2} | Chunks: {} active / {} built | Rocks: {}",
                    frame_count,
                    transform.position.x,
                    transform.position.z,
                    transform.yaw,
                    world.active_chunks().len(),
                    world.chunks().chunk_count(),
                    world.chunks().obstacles().total_placed()
                );
                frame_count = 0;
                last_report = now;
            }

            if leg_start.elapsed() > LEG_TIMEOUT {
                warn!("Leg timed out; cancelling");
                world.cancel();
            }
        }
    }

    info!("Route finished");
}
