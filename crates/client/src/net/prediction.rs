use glam::Vec3;

use deskterm::{InputFrame, Pose, apply_look, move_vector};

use super::config::PredictionConfig;

/// Client-side estimate of the player pose.
///
/// Local input moves the estimate immediately; every frame it is then pulled
/// toward the latest authoritative pose with an exponential blend, so
/// corrections show up as smooth drift rather than pops.
#[derive(Debug, Clone)]
pub struct ClientPrediction {
    config: PredictionConfig,
    predicted: Pose,
    authoritative: Option<Pose>,
}

impl ClientPrediction {
    pub fn new(config: PredictionConfig) -> Self {
        Self {
            config,
            predicted: Pose::SPAWN,
            authoritative: None,
        }
    }

    /// Dead-reckons one frame of input. Non-positive `dt` is ignored.
    pub fn apply_input(&mut self, input: &InputFrame) {
        if input.dt <= 0.0 {
            return;
        }

        apply_look(
            &mut self.predicted,
            input.yaw_delta,
            input.pitch_delta,
            self.config.pitch_limit,
        );

        let wish = move_vector(&self.predicted, input.forward, input.right, input.up);
        let length = wish.length();
        let wish = if length > self.config.wish_epsilon {
            wish / length
        } else {
            Vec3::ZERO
        };

        self.predicted.position += wish * self.config.move_speed * input.dt;
    }

    /// Records the newest authoritative pose. The first one ever received
    /// also replaces the free-running estimate outright.
    pub fn set_authoritative(&mut self, pose: Pose) {
        if self.authoritative.is_none() {
            self.predicted = pose;
        }
        self.authoritative = Some(pose);
    }

    /// Pulls the estimate toward the authoritative pose by
    /// `1 - exp(-k * dt)` of the remaining gap.
    pub fn reconcile(&mut self, dt: f32) {
        let Some(target) = self.authoritative else {
            return;
        };
        if dt <= 0.0 {
            return;
        }

        let alpha = 1.0 - (-self.config.blend_rate * dt).exp();
        self.predicted.position += (target.position - self.predicted.position) * alpha;
        self.predicted.yaw += (target.yaw - self.predicted.yaw) * alpha;
        self.predicted.pitch += (target.pitch - self.predicted.pitch) * alpha;
    }

    pub fn predicted(&self) -> Pose {
        self.predicted
    }

    pub fn authoritative(&self) -> Option<Pose> {
        self.authoritative
    }

    /// Positional gap to the authoritative pose, zero before the first one.
    pub fn error(&self) -> f32 {
        self.authoritative
            .map_or(0.0, |target| self.predicted.distance(&target))
    }

    pub fn camera_direction(&self) -> Vec3 {
        self.predicted.look_direction()
    }

    pub fn camera_target(&self) -> Vec3 {
        self.predicted.position + self.camera_direction()
    }
}
