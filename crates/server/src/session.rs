use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpStream;

use deskterm::{Connection, Message, Pose, TransportError};

use crate::config::ServerConfig;
use crate::events::{DisconnectReason, ServerEvent};
use crate::interpreter::{CommandInterpreter, ToyTerminal};
use crate::simulation::AuthoritativeSim;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Handshaking,
    Active,
    Terminated(DisconnectReason),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    pub inputs_applied: u64,
    pub commands_run: u64,
    pub lines_dropped: u64,
    pub states_sent: u64,
}

/// Server side of one client connection.
///
/// Owns the authoritative pose, the command interpreter and the connection;
/// nothing is shared with other sessions.
pub struct Session<S> {
    connection: Connection<S>,
    sim: AuthoritativeSim,
    interpreter: Box<dyn CommandInterpreter>,
    version: String,
    state: SessionState,
    stats: SessionStats,
    pending_events: VecDeque<ServerEvent>,
}

impl Session<TcpStream> {
    pub fn accept(stream: TcpStream, config: &ServerConfig) -> std::io::Result<Self> {
        let connection = Connection::accept(stream)?;
        let addr = connection.peer_addr();
        let mut session = Self::new(connection, config);
        session.push_event(ServerEvent::ClientConnected { addr });
        Ok(session)
    }
}

impl<S: Read + Write> Session<S> {
    pub fn new(connection: Connection<S>, config: &ServerConfig) -> Self {
        let interpreter = ToyTerminal::new(config.history_capacity, config.history_line_max);
        Self::with_interpreter(connection, config, Box::new(interpreter))
    }

    pub fn with_interpreter(
        connection: Connection<S>,
        config: &ServerConfig,
        interpreter: Box<dyn CommandInterpreter>,
    ) -> Self {
        Self {
            connection,
            sim: AuthoritativeSim::new(config.spawn, config.movement),
            interpreter,
            version: config.version.clone(),
            state: SessionState::Idle,
            stats: SessionStats::default(),
            pending_events: VecDeque::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn pose(&self) -> Pose {
        self.sim.pose()
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    /// Runs the handshake and then the message loop until the peer goes
    /// away or a reply cannot be sent.
    pub fn run(&mut self) -> DisconnectReason {
        loop {
            if let Some(reason) = self.step() {
                return reason;
            }
        }
    }

    /// Advances the session by one unit of work: the handshake on first
    /// call, then one received line per call. Returns the disconnect reason
    /// once the session is over.
    pub fn step(&mut self) -> Option<DisconnectReason> {
        match self.state {
            SessionState::Terminated(reason) => return Some(reason),
            SessionState::Idle | SessionState::Handshaking => {
                if self.handshake().is_err() {
                    return Some(self.terminate(DisconnectReason::SendFailed));
                }
                return None;
            }
            SessionState::Active => {}
        }

        match self.connection.read_line() {
            Some(line) => match self.handle_line(&line) {
                Ok(()) => None,
                Err(e) => {
                    log::debug!("reply failed: {}", e);
                    Some(self.terminate(DisconnectReason::SendFailed))
                }
            },
            None => Some(self.terminate(DisconnectReason::PeerClosed)),
        }
    }

    /// WELCOME, the history backfill, then the initial STATE.
    pub fn handshake(&mut self) -> Result<(), TransportError> {
        self.state = SessionState::Handshaking;

        self.connection.send(&Message::Welcome {
            version: self.version.clone(),
        })?;

        let history = self.interpreter.history().to_vec();
        self.connection.send(&Message::Hist {
            count: history.len(),
        })?;
        for line in history {
            self.connection.send(&Message::Line(line))?;
        }

        self.send_state(self.sim.pose())?;

        self.state = SessionState::Active;
        self.push_event(ServerEvent::HandshakeComplete {
            history_lines: self.interpreter.history().len(),
        });
        Ok(())
    }

    /// Processes one received line. Malformed lines are dropped without a
    /// reply; only transport failures are returned.
    pub fn handle_line(&mut self, line: &str) -> Result<(), TransportError> {
        let message = match Message::decode(line) {
            Ok(message) => message,
            Err(e) => {
                self.drop_line(line, e.to_string());
                return Ok(());
            }
        };

        match message {
            Message::Hello => Ok(()),
            Message::Input(input) => match self.sim.apply_input(&input) {
                Some(pose) => {
                    self.stats.inputs_applied += 1;
                    self.send_state(pose)
                }
                None => {
                    self.drop_line(line, "input overflows the pose".to_string());
                    Ok(())
                }
            },
            Message::Cmd(command) => {
                let output = self.interpreter.run(&command);
                self.stats.commands_run += 1;
                self.push_event(ServerEvent::CommandRun {
                    command,
                    output_lines: output.len(),
                });
                for line in output {
                    self.connection.send(&Message::Line(line))?;
                }
                Ok(())
            }
            other => {
                self.drop_line(line, format!("{} is not a client message", other.tag()));
                Ok(())
            }
        }
    }

    fn send_state(&mut self, pose: Pose) -> Result<(), TransportError> {
        self.connection.send(&Message::State(pose))?;
        self.stats.states_sent += 1;
        Ok(())
    }

    fn drop_line(&mut self, line: &str, reason: String) {
        self.stats.lines_dropped += 1;
        self.push_event(ServerEvent::MessageDropped {
            line: line.to_string(),
            reason,
        });
    }

    fn terminate(&mut self, reason: DisconnectReason) -> DisconnectReason {
        self.connection.close();
        self.state = SessionState::Terminated(reason);
        self.push_event(ServerEvent::ClientDisconnected { reason });
        reason
    }

    fn push_event(&mut self, event: ServerEvent) {
        self.pending_events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    fn loopback() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (server, client)
    }

    fn read_lines(reader: &mut BufReader<TcpStream>, count: usize) -> Vec<String> {
        (0..count)
            .map(|_| {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                line.trim_end_matches('\n').to_string()
            })
            .collect()
    }

    #[test]
    fn test_handshake_order() {
        let (server, client) = loopback();
        let mut session = Session::accept(server, &ServerConfig::default()).unwrap();
        session.handshake().unwrap();

        let mut reader = BufReader::new(client);
        let lines = read_lines(&mut reader, 6);
        assert_eq!(
            lines,
            vec![
                "WELCOME 0.1",
                "HIST 3",
                "LINE > CONNECTED",
                "LINE > CALC TERMINAL MODE",
                "LINE >>> ",
                "STATE 0.000000 1.600000 2.000000 0.000000 0.000000",
            ]
        );
        assert_eq!(session.state(), SessionState::Active);
    }

    #[test]
    fn test_input_produces_one_state() {
        let (server, client) = loopback();
        let mut session = Session::accept(server, &ServerConfig::default()).unwrap();
        session.handshake().unwrap();
        let mut reader = BufReader::new(client);
        read_lines(&mut reader, 6);

        session.handle_line("INPUT 1 0 0 0 0 0.1").unwrap();
        assert_eq!(
            read_lines(&mut reader, 1),
            vec!["STATE 0.000000 1.600000 2.450000 0.000000 0.000000"]
        );
        assert_eq!(session.stats().inputs_applied, 1);
    }

    #[test]
    fn test_malformed_input_is_dropped() {
        let (server, _client) = loopback();
        let mut session = Session::accept(server, &ServerConfig::default()).unwrap();
        session.drain_events().for_each(drop);

        session.handle_line("INPUT 1 0 0").unwrap();
        session.handle_line("STATE 0 0 0 0 0").unwrap();
        session.handle_line("BOGUS").unwrap();

        assert_eq!(session.pose(), Pose::SPAWN);
        assert_eq!(session.stats().lines_dropped, 3);
        assert_eq!(session.stats().states_sent, 0);
        let dropped = session
            .drain_events()
            .filter(|e| matches!(e, ServerEvent::MessageDropped { .. }))
            .count();
        assert_eq!(dropped, 3);
    }

    #[test]
    fn test_overflowing_input_is_dropped() {
        let (server, client) = loopback();
        let mut session = Session::accept(server, &ServerConfig::default()).unwrap();
        session.handshake().unwrap();
        let mut reader = BufReader::new(client);
        read_lines(&mut reader, 6);

        session.handle_line("INPUT 3e38 0 0 0 0 3e38").unwrap();
        assert_eq!(session.pose(), Pose::SPAWN);
        assert_eq!(session.stats().lines_dropped, 1);
        assert_eq!(session.stats().inputs_applied, 0);

        session.handle_line("INPUT 1 0 0 0 0 0.1").unwrap();
        let reply = read_lines(&mut reader, 1).remove(0);
        assert_eq!(reply, "STATE 0.000000 1.600000 2.450000 0.000000 0.000000");
        assert!(Message::decode(&reply).is_ok());
    }

    #[test]
    fn test_malformed_input_then_valid_input() {
        let (server, client) = loopback();
        let handle = thread::spawn(move || {
            let mut session = Session::accept(server, &ServerConfig::default()).unwrap();
            let reason = session.run();
            (reason, session.stats())
        });

        let mut writer = client.try_clone().unwrap();
        let mut reader = BufReader::new(client);
        read_lines(&mut reader, 6);

        writer.write_all(b"INPUT 1 0 0\nINPUT 1 0 0 0 0 0.1\n").unwrap();
        assert_eq!(
            read_lines(&mut reader, 1),
            vec!["STATE 0.000000 1.600000 2.450000 0.000000 0.000000"]
        );

        writer.shutdown(std::net::Shutdown::Both).unwrap();
        let (reason, stats) = handle.join().unwrap();
        assert_eq!(reason, DisconnectReason::PeerClosed);
        assert_eq!(stats.lines_dropped, 1);
        assert_eq!(stats.inputs_applied, 1);
        assert_eq!(stats.states_sent, 2);
    }

    #[test]
    fn test_full_session_over_loopback() {
        let (server, client) = loopback();
        let handle = thread::spawn(move || {
            let mut session = Session::accept(server, &ServerConfig::default()).unwrap();
            let reason = session.run();
            (reason, session.stats(), session.pose())
        });

        let mut writer = client.try_clone().unwrap();
        let mut reader = BufReader::new(client);
        read_lines(&mut reader, 6);

        writer.write_all(b"HELLO\nINPUT 1 0 0 0 0 0.1\n").unwrap();
        assert_eq!(
            read_lines(&mut reader, 1),
            vec!["STATE 0.000000 1.600000 2.450000 0.000000 0.000000"]
        );

        writer.write_all(b"INPUT 1 0 0\nCMD 6 * 7\n").unwrap();
        assert_eq!(read_lines(&mut reader, 2), vec!["LINE 42", "LINE >>> "]);

        writer.shutdown(std::net::Shutdown::Both).unwrap();
        let (reason, stats, pose) = handle.join().unwrap();

        assert_eq!(reason, DisconnectReason::PeerClosed);
        assert_eq!(stats.inputs_applied, 1);
        assert_eq!(stats.commands_run, 1);
        assert_eq!(stats.lines_dropped, 1);
        assert!((pose.position.z - 2.45).abs() < 1e-6);
    }
}
