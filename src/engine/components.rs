// Core ECS components shared by movement, camera and animation code.

use bevy_ecs::prelude::*;
use glam::Vec3;

/// Position and facing of an entity in 3D space.
///
/// `yaw` is radians about +Y; 0 faces +Z, π/2 faces +X.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub yaw: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position, yaw: 0.0 }
    }

    /// Unit vector the entity is facing, on the XZ plane.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, self.yaw.cos())
    }
}

/// The locally controlled character. Chunk streaming centres on it.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Player;
