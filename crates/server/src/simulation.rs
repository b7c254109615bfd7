use deskterm::{InputFrame, MovementConfig, Pose, apply_look, move_vector};

/// Server-owned canonical pose. Only input deltas are accepted, so the
/// pose is a pure function of the spawn pose and the input sequence.
#[derive(Debug, Clone)]
pub struct AuthoritativeSim {
    pose: Pose,
    config: MovementConfig,
}

impl AuthoritativeSim {
    pub fn new(spawn: Pose, config: MovementConfig) -> Self {
        Self {
            pose: spawn,
            config,
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Integrates one input and returns the pose to report back.
    /// Non-positive `dt` leaves the pose untouched. Returns `None`, without
    /// mutating, when the input would overflow the pose to a non-finite value.
    pub fn apply_input(&mut self, input: &InputFrame) -> Option<Pose> {
        if input.dt <= 0.0 {
            return Some(self.pose);
        }

        let mut candidate = self.pose;
        apply_look(
            &mut candidate,
            input.yaw_delta,
            input.pitch_delta,
            self.config.pitch_limit,
        );

        let step = self.config.move_speed * input.dt;
        let displacement = move_vector(&candidate, input.forward, input.right, input.up);
        candidate.position += displacement * step;

        if !is_finite_pose(&candidate) {
            return None;
        }
        self.pose = candidate;
        Some(self.pose)
    }
}

fn is_finite_pose(pose: &Pose) -> bool {
    pose.position.is_finite() && pose.yaw.is_finite() && pose.pitch.is_finite()
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn input(forward: f32, right: f32, up: f32, yaw: f32, pitch: f32, dt: f32) -> InputFrame {
        InputFrame {
            forward,
            right,
            up,
            yaw_delta: yaw,
            pitch_delta: pitch,
            dt,
        }
    }

    #[test]
    fn test_forward_step_from_spawn() {
        let mut sim = AuthoritativeSim::new(Pose::SPAWN, MovementConfig::default());
        let pose = sim.apply_input(&input(1.0, 0.0, 0.0, 0.0, 0.0, 0.1)).unwrap();

        assert!((pose.position - Vec3::new(0.0, 1.6, 2.45)).length() < 1e-6);
    }

    #[test]
    fn test_yaw_applies_before_move() {
        let mut sim = AuthoritativeSim::new(Pose::SPAWN, MovementConfig::default());
        let quarter = std::f32::consts::FRAC_PI_2;
        let pose = sim.apply_input(&input(1.0, 0.0, 0.0, quarter, 0.0, 1.0)).unwrap();

        assert!((pose.position.x - 4.5).abs() < 1e-5);
        assert!((pose.position.z - 2.0).abs() < 1e-5);
        assert!((pose.yaw - quarter).abs() < 1e-6);
    }

    #[test]
    fn test_up_moves_vertically() {
        let mut sim = AuthoritativeSim::new(Pose::SPAWN, MovementConfig::default());
        let pose = sim.apply_input(&input(0.0, 0.0, -1.0, 0.0, 0.0, 0.2)).unwrap();

        assert!((pose.position.y - (1.6 - 0.9)).abs() < 1e-5);
    }

    #[test]
    fn test_pitch_clamped_every_input() {
        let mut sim = AuthoritativeSim::new(Pose::SPAWN, MovementConfig::default());
        for _ in 0..20 {
            let pose = sim.apply_input(&input(0.0, 0.0, 0.0, 0.0, 0.4, 0.016)).unwrap();
            assert!(pose.pitch <= 1.2);
        }
        let pose = sim.apply_input(&input(0.0, 0.0, 0.0, 0.0, -0.2, 0.016)).unwrap();
        assert!((pose.pitch - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_positive_dt_is_noop() {
        let mut sim = AuthoritativeSim::new(Pose::SPAWN, MovementConfig::default());
        assert_eq!(
            sim.apply_input(&input(1.0, 1.0, 1.0, 0.5, 0.5, 0.0)),
            Some(Pose::SPAWN)
        );
        assert_eq!(
            sim.apply_input(&input(1.0, 1.0, 1.0, 0.5, 0.5, -0.1)),
            Some(Pose::SPAWN)
        );
    }

    #[test]
    fn test_overflowing_input_is_rejected() {
        let mut sim = AuthoritativeSim::new(Pose::SPAWN, MovementConfig::default());
        assert_eq!(sim.apply_input(&input(3e38, 0.0, 0.0, 0.0, 0.0, 3e38)), None);
        assert_eq!(sim.pose(), Pose::SPAWN);

        let first = sim.apply_input(&input(0.0, 0.0, 0.0, 3e38, 0.0, 0.016));
        assert!(first.is_some());
        assert_eq!(sim.apply_input(&input(0.0, 0.0, 0.0, 3e38, 0.0, 0.016)), None);
        let after = sim.apply_input(&input(1.0, 0.0, 0.0, 0.0, 0.0, 0.1));
        let pose = after.unwrap();
        assert!(pose.position.is_finite());
        assert!(pose.yaw.is_finite());
    }

    #[test]
    fn test_replay_is_deterministic() {
        let inputs = [
            input(1.0, 0.0, 0.0, 0.1, 0.0, 0.016),
            input(1.0, -1.0, 0.0, 0.05, -0.02, 0.017),
            input(0.0, 1.0, 0.0, -0.3, 0.01, 0.015),
        ];
        let mut a = AuthoritativeSim::new(Pose::SPAWN, MovementConfig::default());
        let mut b = AuthoritativeSim::new(Pose::SPAWN, MovementConfig::default());
        for i in &inputs {
            a.apply_input(i);
        }
        for i in &inputs {
            b.apply_input(i);
        }
        assert_eq!(a.pose(), b.pose());
    }
}
