//! Tiny ECS: World, Entity, components: Transform + Renderable.

use crate::transform::Transform;

/// Entity id (dense, index into component arrays).
pub type Entity = u32;

/// Handle of a loaded model owned by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModelId(pub u32);

/// Marker component: the entity draws the given model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Renderable {
    pub model: ModelId,
}

/// Very small ECS world with dense parallel arrays.
/// No allocations per-frame; spawn may allocate to grow capacity.
#[derive(Default)]
pub struct World {
    transforms: Vec<Transform>,
    renderables: Vec<Option<Renderable>>,
    len: u32,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn entity with Transform and optional Renderable.
    pub fn spawn(&mut self, t: Transform, r: Option<Renderable>) -> Entity {
        let id = self.len;
        let idx = id as usize;
        self.len += 1;

        if idx >= self.transforms.len() {
            let new_len = (idx + 1).next_power_of_two().max(8);
            self.transforms.resize(new_len, Transform::identity());
            self.renderables.resize(new_len, None);
        }

        self.transforms[idx] = t;
        self.renderables[idx] = r;
        id
    }

    /// Iterate over (Transform, Renderable) pairs of spawned entities.
    pub fn iter_renderables(&self) -> impl Iterator<Item = (&Transform, &Renderable)> {
        (0..self.len as usize)
            .filter_map(move |i| self.renderables[i].as_ref().map(|r| (&self.transforms[i], r)))
    }

    /// Rotate every transform by `speed_xyz * dt` (Euler radians).
    pub fn system_rotate_all(&mut self, dt: f32, speed_xyz: [f32; 3]) {
        let [sx, sy, sz] = speed_xyz;
        for t in &mut self.transforms[..self.len as usize] {
            t.rotation_euler.x += sx * dt;
            t.rotation_euler.y += sy * dt;
            t.rotation_euler.z += sz * dt;
        }
    }
}
