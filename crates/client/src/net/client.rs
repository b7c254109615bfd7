use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use glam::Vec3;

use deskterm::{Connection, LineHistory, Message, PROMPT, PROTOCOL_VERSION, Pose, TransportError};

use super::config::ClientConfig;
use super::handshake::HandshakeTracker;
use super::input::{ControlState, InputIntegrator};
use super::prediction::ClientPrediction;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientStats {
    pub inputs_sent: u64,
    pub states_received: u64,
    pub lines_received: u64,
    pub lines_dropped: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Client end of a session, driven once per frame from a single thread.
///
/// Polling never blocks. When the link drops, prediction keeps running on
/// local input alone and no further corrections arrive.
pub struct NetworkClient<S = TcpStream> {
    connection: Connection<S>,
    handshake: HandshakeTracker,
    prediction: ClientPrediction,
    integrator: InputIntegrator,
    terminal: LineHistory,
    stats: ClientStats,
    link_lost_reported: bool,
}

impl NetworkClient<TcpStream> {
    /// Connects and sends HELLO.
    pub fn connect<A: ToSocketAddrs>(addr: A, config: &ClientConfig) -> Result<Self, TransportError> {
        let connection = Connection::connect(addr)?;
        if let Some(addr) = connection.peer_addr() {
            log::info!("Connected to {}", addr);
        }
        let mut client = Self::from_connection(connection, config);
        client.connection.send(&Message::Hello)?;
        Ok(client)
    }
}

impl<S: Read + Write> NetworkClient<S> {
    pub fn from_connection(connection: Connection<S>, config: &ClientConfig) -> Self {
        Self {
            connection,
            handshake: HandshakeTracker::new(),
            prediction: ClientPrediction::new(config.prediction),
            integrator: InputIntegrator::new(config.sensitivity),
            terminal: LineHistory::new(config.history_capacity, config.history_line_max),
            stats: ClientStats::default(),
            link_lost_reported: false,
        }
    }

    /// One client frame: drain the network, integrate local controls, send
    /// INPUT once the handshake is done, then blend toward the server pose.
    /// Returns whether the connection is still up.
    pub fn update(&mut self, dt: f32, controls: Option<&ControlState>) -> bool {
        self.process_network();

        if let Some(controls) = controls {
            let input = self.integrator.sample(controls, dt);
            self.prediction.apply_input(&input);

            if self.handshake.is_complete() && self.connection.is_connected() {
                match self.connection.send(&Message::Input(input)) {
                    Ok(()) => self.stats.inputs_sent += 1,
                    Err(e) => log::debug!("input send failed: {}", e),
                }
            }
        }

        self.prediction.reconcile(dt);
        self.check_link();
        self.connection.is_connected()
    }

    /// Sends a terminal command and echoes it into the local prompt line.
    pub fn send_command(&mut self, text: &str) -> Result<(), TransportError> {
        self.connection.send(&Message::Cmd(text.to_string()))?;
        self.terminal.replace_last(format!("{PROMPT}{text}"));
        Ok(())
    }

    fn process_network(&mut self) {
        let mut lines = Vec::new();
        self.connection.poll_lines(|line| lines.push(line));

        // Several STATEs may arrive in one frame; only the last one counts.
        let mut latest_state = None;
        for line in lines {
            let message = match Message::decode(&line) {
                Ok(message) => message,
                Err(e) => {
                    log::debug!("dropped {:?}: {}", line, e);
                    self.stats.lines_dropped += 1;
                    continue;
                }
            };

            if self.handshake.observe(&message) {
                log::info!(
                    "Handshake complete ({} history lines)",
                    self.terminal.len()
                );
            }

            match message {
                Message::Welcome { version } => {
                    if version != PROTOCOL_VERSION {
                        log::warn!(
                            "server speaks protocol {}, expected {}",
                            version,
                            PROTOCOL_VERSION
                        );
                    }
                }
                Message::Hist { .. } => self.terminal.clear(),
                Message::Line(text) => {
                    self.stats.lines_received += 1;
                    self.terminal.push(text);
                }
                Message::State(pose) => {
                    self.stats.states_received += 1;
                    latest_state = Some(pose);
                }
                other => {
                    log::debug!("ignoring client-only message {}", other.tag());
                    self.stats.lines_dropped += 1;
                }
            }
        }

        if let Some(pose) = latest_state {
            self.prediction.set_authoritative(pose);
        }
    }

    fn check_link(&mut self) {
        if !self.connection.is_connected() && !self.link_lost_reported {
            log::warn!("Connection to server lost; continuing on local prediction");
            self.link_lost_reported = true;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn handshake(&self) -> &HandshakeTracker {
        &self.handshake
    }

    pub fn is_ready(&self) -> bool {
        self.handshake.is_complete()
    }

    pub fn predicted_pose(&self) -> Pose {
        self.prediction.predicted()
    }

    pub fn authoritative_pose(&self) -> Option<Pose> {
        self.prediction.authoritative()
    }

    pub fn prediction_error(&self) -> f32 {
        self.prediction.error()
    }

    pub fn camera_target(&self) -> Vec3 {
        self.prediction.camera_target()
    }

    pub fn terminal(&self) -> &LineHistory {
        &self.terminal
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            bytes_sent: self.connection.bytes_sent(),
            bytes_received: self.connection.bytes_received(),
            ..self.stats
        }
    }

    pub fn disconnect(&mut self) {
        self.connection.close();
        self.link_lost_reported = true;
    }
}
