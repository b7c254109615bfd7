use glam::Vec2;

use deskterm::InputFrame;

/// Raw controls for one frame: movement axes in `[-1, 1]` and the pointer
/// delta in screen pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlState {
    pub forward: f32,
    pub right: f32,
    pub up: f32,
    pub pointer_delta: Vec2,
}

#[derive(Debug, Clone, Copy)]
pub struct InputIntegrator {
    sensitivity: f32,
}

impl InputIntegrator {
    pub fn new(sensitivity: f32) -> Self {
        Self { sensitivity }
    }

    /// Builds the frame's INPUT. Pointer motion to the right turns right,
    /// which is a negative yaw delta; moving the pointer down looks down.
    pub fn sample(&self, controls: &ControlState, dt: f32) -> InputFrame {
        InputFrame {
            forward: controls.forward.clamp(-1.0, 1.0),
            right: controls.right.clamp(-1.0, 1.0),
            up: controls.up.clamp(-1.0, 1.0),
            yaw_delta: -controls.pointer_delta.x * self.sensitivity,
            pitch_delta: -controls.pointer_delta.y * self.sensitivity,
            dt,
        }
    }
}
