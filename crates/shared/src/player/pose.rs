use glam::Vec3;

/// Player position and view angles. Used for both the server-owned
/// authoritative pose and the client's predicted estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for Pose {
    fn default() -> Self {
        Self::SPAWN
    }
}

impl Pose {
    /// Standing eye height, a couple of metres back from the desk.
    pub const SPAWN: Pose = Pose {
        position: Vec3::new(0.0, 1.6, 2.0),
        yaw: 0.0,
        pitch: 0.0,
    };

    pub const fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
        }
    }

    /// Ground-plane forward axis for the current yaw.
    pub fn forward(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vec3::new(sin_yaw, 0.0, cos_yaw)
    }

    /// Ground-plane strafe axis for the current yaw.
    pub fn right_axis(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vec3::new(-cos_yaw, 0.0, sin_yaw)
    }

    /// Unit view direction from yaw and pitch.
    pub fn look_direction(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(sin_yaw * cos_pitch, sin_pitch, cos_yaw * cos_pitch)
    }

    pub fn distance(&self, other: &Pose) -> f32 {
        self.position.distance(other.position)
    }
}
