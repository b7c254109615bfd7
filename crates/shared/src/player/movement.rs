use glam::Vec3;

use super::Pose;

pub fn clamp_pitch(pitch: f32, limit: f32) -> f32 {
    let limit = limit.abs();
    pitch.clamp(-limit, limit)
}

/// Applies look deltas, clamping pitch on every update.
pub fn apply_look(pose: &mut Pose, yaw_delta: f32, pitch_delta: f32, pitch_limit: f32) {
    pose.yaw += yaw_delta;
    pose.pitch = clamp_pitch(pose.pitch + pitch_delta, pitch_limit);
}

/// Un-normalized displacement direction for the given control axes.
pub fn move_vector(pose: &Pose, forward: f32, right: f32, up: f32) -> Vec3 {
    pose.forward() * forward + pose.right_axis() * right + Vec3::Y * up
}
