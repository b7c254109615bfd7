use deskterm::{CLIENT_PITCH_LIMIT, DEFAULT_MOVE_SPEED, HISTORY_CAPACITY, HISTORY_LINE_MAX};

pub const DEFAULT_SENSITIVITY: f32 = 0.0025;
pub const DEFAULT_FRAME_RATE: u32 = 60;

#[derive(Debug, Clone, Copy)]
pub struct PredictionConfig {
    pub move_speed: f32,
    pub pitch_limit: f32,
    /// Rate `k` of the exponential pull toward the authoritative pose.
    pub blend_rate: f32,
    /// Wish vectors shorter than this count as no movement.
    pub wish_epsilon: f32,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            move_speed: DEFAULT_MOVE_SPEED,
            pitch_limit: CLIENT_PITCH_LIMIT,
            blend_rate: 12.0,
            wish_epsilon: 0.001,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub frame_rate: u32,
    pub sensitivity: f32,
    pub prediction: PredictionConfig,
    pub history_capacity: usize,
    pub history_line_max: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            sensitivity: DEFAULT_SENSITIVITY,
            prediction: PredictionConfig::default(),
            history_capacity: HISTORY_CAPACITY,
            history_line_max: HISTORY_LINE_MAX,
        }
    }
}
