use crate::maths::{DEG_TO_RAD, Quaternion, Rotation, Vec3};

pub const MAX_CAMERA_PITCH: f32 = 89.0 * DEG_TO_RAD;

/// First-person viewpoint. Pitch is clamped to +/-89 degrees by the
/// control handling; roll is fixed at zero.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub pitch: f32,
    pub yaw: f32,
    pub fov: i32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 100.0, 0.0),
            pitch: 0.0,
            yaw: 0.0,
            fov: 90,
        }
    }
}

impl Camera {
    pub fn direction(&self) -> Vec3 {
        let pitch_factor = self.pitch.cos().abs();

        Vec3::new(
            -self.yaw.sin() * pitch_factor,
            self.pitch.sin(),
            self.yaw.cos() * pitch_factor,
        )
        .unit()
    }

    pub fn rotation_matrix(&self) -> Rotation {
        let q1 = Quaternion::from_axis_angle(self.pitch, 1.0, 0.0, 0.0);
        let q2 = Quaternion::from_axis_angle(self.yaw, 0.0, 1.0, 0.0);

        (q1 * q2).to_rotation_matrix()
    }
}
