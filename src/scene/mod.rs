use bitflags::bitflags;

use crate::maths::{Color, Vec3};

mod camera;
pub use camera::{Camera, MAX_CAMERA_PITCH};
mod object;
pub use object::{
    DirectionalLight, Ease, FollowHandler, GLOBAL_SECTOR_ID, LOD_DISTANCE_THRESHOLD, Light,
    NEAR_PLANE_DISTANCE, Object, ObjectId, ObjectKind, Polygon, UpdateHandler, Vertex3d,
};
mod obj_file;
pub use obj_file::{ModelData, load_model_data};
mod particles;
pub use particles::{ParticleBehavior, ParticleSystem};
mod primitives;
pub use primitives::{cube, grid_mesh, model, particle, skybox};
#[allow(clippy::module_inception)]
mod scene;
pub use scene::{MOVEMENT_SPEED, Scene};
mod texture;
pub use texture::{COLOR_KEY_TRANSPARENT, Texture, TextureId};

pub const MAX_VISIBILITY: i32 = i32::MAX;

bitflags! {
    /// Camera control schemes a scene accepts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlMode: u32 {
        const WASD = 1 << 0;
        const MOUSE = 1 << 1;
    }

    /// Movement keys currently held, as reported by the shell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Keys: u32 {
        const W = 1 << 0;
        const A = 1 << 1;
        const S = 1 << 2;
        const D = 1 << 3;
        const SHIFT = 1 << 4;
    }
}

/// Per-frame control input handed to the scene: held movement keys plus
/// accumulated mouse deltas since the previous frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct Input {
    pub keys: Keys,
    pub mouse_dx: f32,
    pub mouse_dy: f32,
}

impl Input {
    pub fn reset_key_state(&mut self) {
        self.keys = Keys::empty();
        self.mouse_dx = 0.0;
        self.mouse_dy = 0.0;
    }
}

/// Tunable per-scene rendering and lighting parameters, mutable at
/// runtime through the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    pub background_color: Color,
    pub ambient_light_color: Color,
    pub ambient_light_vector: Vec3,
    pub ambient_light_factor: f32,
    pub has_static_ambient_light: bool,
    pub brightness: f32,
    pub visibility: i32,
    pub control_mode: ControlMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            background_color: Color::BLACK,
            ambient_light_color: Color::BLACK,
            ambient_light_vector: Vec3::new(0.0, -1.0, 0.0),
            ambient_light_factor: 1.0,
            has_static_ambient_light: false,
            brightness: 1.0,
            visibility: MAX_VISIBILITY,
            control_mode: ControlMode::WASD | ControlMode::MOUSE,
        }
    }
}

/// An axis-aligned box spanned by two opposite corners.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aabb {
    pub corner_a: Vec3,
    pub corner_b: Vec3,
}

impl Aabb {
    pub fn has_point_inside(&self, point: Vec3) -> bool {
        let x_min = self.corner_a.x.min(self.corner_b.x);
        let x_max = self.corner_a.x.max(self.corner_b.x);
        let y_min = self.corner_a.y.min(self.corner_b.y);
        let y_max = self.corner_a.y.max(self.corner_b.y);
        let z_min = self.corner_a.z.min(self.corner_b.z);
        let z_max = self.corner_a.z.max(self.corner_b.z);

        point.x >= x_min
            && point.x <= x_max
            && point.y >= y_min
            && point.y <= y_max
            && point.z >= z_min
            && point.z <= z_max
    }
}

/// A world region objects can be assigned to; objects tagged with a
/// sector only render while the camera occupies that sector's bounds.
#[derive(Debug, Clone, Copy)]
pub struct Sector {
    pub id: i32,
    pub bounds: Aabb,
}
