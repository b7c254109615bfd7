use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub enum ServerEvent {
    ClientConnected {
        addr: Option<SocketAddr>,
    },
    HandshakeComplete {
        history_lines: usize,
    },
    MessageDropped {
        line: String,
        reason: String,
    },
    CommandRun {
        command: String,
        output_lines: usize,
    },
    ClientDisconnected {
        reason: DisconnectReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    PeerClosed,
    SendFailed,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::PeerClosed => "disconnected",
            DisconnectReason::SendFailed => "lost (send failed)",
        }
    }
}
