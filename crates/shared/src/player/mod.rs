mod config;
mod movement;
mod pose;

pub use config::{CLIENT_PITCH_LIMIT, DEFAULT_MOVE_SPEED, MovementConfig, SERVER_PITCH_LIMIT};
pub use movement::{apply_look, clamp_pitch, move_vector};
pub use pose::Pose;
