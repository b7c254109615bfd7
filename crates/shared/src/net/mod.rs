mod connection;
mod framing;
mod protocol;

pub use connection::{Connection, TransportError};
pub use framing::{ACCUM_CAPACITY, LineBuffer, MAX_LINE_LEN};
pub use protocol::{DEFAULT_PORT, InputFrame, Message, PROTOCOL_VERSION, ProtocolError};
