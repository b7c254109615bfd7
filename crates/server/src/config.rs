use deskterm::{DEFAULT_PORT, HISTORY_CAPACITY, HISTORY_LINE_MAX, MovementConfig, PROTOCOL_VERSION, Pose};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// 1 keeps the single accept-then-exit lifecycle; more enables the
    /// concurrent accept loop.
    pub max_sessions: usize,
    pub version: String,
    pub spawn: Pose,
    pub movement: MovementConfig,
    pub history_capacity: usize,
    pub history_line_max: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_sessions: 1,
            version: PROTOCOL_VERSION.to_string(),
            spawn: Pose::SPAWN,
            movement: MovementConfig::default(),
            history_capacity: HISTORY_CAPACITY,
            history_line_max: HISTORY_LINE_MAX,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
