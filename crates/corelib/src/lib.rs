//! Core types: math re-exports, Transform, Camera, bounds and the tiny ECS.

pub use glam::{EulerRot, Mat4, Quat, Vec2, Vec3, vec3};

pub mod bounds;
pub mod camera;
pub mod ecs;
pub mod transform;
