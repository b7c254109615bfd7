pub mod history;
pub mod net;
pub mod player;

pub use history::{HISTORY_CAPACITY, HISTORY_LINE_MAX, LineHistory, PROMPT};
pub use net::{
    ACCUM_CAPACITY, Connection, DEFAULT_PORT, InputFrame, LineBuffer, MAX_LINE_LEN, Message,
    PROTOCOL_VERSION, ProtocolError, TransportError,
};
pub use player::{
    CLIENT_PITCH_LIMIT, DEFAULT_MOVE_SPEED, MovementConfig, Pose, SERVER_PITCH_LIMIT, apply_look,
    clamp_pitch, move_vector,
};
