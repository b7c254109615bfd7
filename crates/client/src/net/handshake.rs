use deskterm::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    AwaitingWelcome,
    AwaitingHistory,
    ReceivingHistory { remaining: usize },
    AwaitingState,
    Complete,
    /// The server broke the expected WELCOME, HIST, LINE x n, STATE order.
    Violated,
}

/// Follows the server's opening sequence. INPUT may only be sent once this
/// reports complete.
#[derive(Debug, Clone)]
pub struct HandshakeTracker {
    stage: HandshakeStage,
    version: Option<String>,
}

impl Default for HandshakeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HandshakeTracker {
    pub fn new() -> Self {
        Self {
            stage: HandshakeStage::AwaitingWelcome,
            version: None,
        }
    }

    pub fn stage(&self) -> HandshakeStage {
        self.stage
    }

    pub fn is_complete(&self) -> bool {
        self.stage == HandshakeStage::Complete
    }

    pub fn server_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Advances on one received message. Returns `true` on the message that
    /// completes the handshake. Once complete, further messages are ignored.
    pub fn observe(&mut self, message: &Message) -> bool {
        let next = match (self.stage, message) {
            (HandshakeStage::Complete | HandshakeStage::Violated, _) => return false,
            (HandshakeStage::AwaitingWelcome, Message::Welcome { version }) => {
                self.version = Some(version.clone());
                HandshakeStage::AwaitingHistory
            }
            (HandshakeStage::AwaitingHistory, Message::Hist { count: 0 }) => {
                HandshakeStage::AwaitingState
            }
            (HandshakeStage::AwaitingHistory, Message::Hist { count }) => {
                HandshakeStage::ReceivingHistory { remaining: *count }
            }
            (HandshakeStage::ReceivingHistory { remaining: 1 }, Message::Line(_)) => {
                HandshakeStage::AwaitingState
            }
            (HandshakeStage::ReceivingHistory { remaining }, Message::Line(_)) => {
                HandshakeStage::ReceivingHistory {
                    remaining: remaining - 1,
                }
            }
            (HandshakeStage::AwaitingState, Message::State(_)) => HandshakeStage::Complete,
            (stage, message) => {
                log::warn!(
                    "unexpected {} during handshake ({:?})",
                    message.tag(),
                    stage
                );
                HandshakeStage::Violated
            }
        };

        self.stage = next;
        next == HandshakeStage::Complete
    }
}
