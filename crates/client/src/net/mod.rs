mod client;
mod config;
mod handshake;
mod input;
mod prediction;

pub use client::NetworkClient;
pub use config::{ClientConfig, DEFAULT_FRAME_RATE, DEFAULT_SENSITIVITY};
pub use input::ControlState;
