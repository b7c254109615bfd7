pub const DEFAULT_MOVE_SPEED: f32 = 4.5;
pub const SERVER_PITCH_LIMIT: f32 = 1.2;
pub const CLIENT_PITCH_LIMIT: f32 = 1.55;

#[derive(Debug, Clone, Copy)]
pub struct MovementConfig {
    pub move_speed: f32,
    pub pitch_limit: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: DEFAULT_MOVE_SPEED,
            pitch_limit: SERVER_PITCH_LIMIT,
        }
    }
}
