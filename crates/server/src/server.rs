use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::events::{DisconnectReason, ServerEvent};
use crate::session::{Session, SessionStats};

/// Listening socket plus the per-session bookkeeping shared by both
/// serving modes.
pub struct SessionServer {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    next_session_id: Arc<AtomicU64>,
}

impl SessionServer {
    pub fn bind(config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr())?;
        Ok(Self {
            listener,
            config: Arc::new(config),
            next_session_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accepts exactly one connection and serves it to completion.
    pub fn serve_one(&self) -> io::Result<SessionReport> {
        let (stream, _) = self.listener.accept()?;
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        run_session(id, stream, &self.config)
    }

    /// Accept loop with one blocking task per session, at most
    /// `max_sessions` at a time. Returns once `shutdown` resolves; sessions
    /// already running are left to finish on their own.
    pub async fn serve_concurrent(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        self.listener
            .set_nonblocking(true)
            .context("failed to make listener non-blocking")?;
        let listener = tokio::net::TcpListener::from_std(self.listener)
            .context("failed to register listener with the runtime")?;
        let limit = Arc::new(Semaphore::new(self.config.max_sessions.max(1)));

        tokio::pin!(shutdown);
        loop {
            let permit = tokio::select! {
                permit = Arc::clone(&limit).acquire_owned() => permit?,
                _ = &mut shutdown => break,
            };

            let stream = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        log::warn!("accept failed: {}", e);
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };

            let stream = match stream.into_std() {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!("failed to detach accepted socket: {}", e);
                    continue;
                }
            };

            let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
            let config = Arc::clone(&self.config);
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                if let Err(e) = run_session(id, stream, &config) {
                    log::warn!("[session {}] failed to start: {}", id, e);
                }
            });
        }

        log::info!("No longer accepting sessions");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionReport {
    pub id: u64,
    pub reason: DisconnectReason,
    pub stats: SessionStats,
}

fn run_session(id: u64, stream: TcpStream, config: &ServerConfig) -> io::Result<SessionReport> {
    let mut session = Session::accept(stream, config)?;

    let reason = loop {
        let finished = session.step();
        for event in session.drain_events() {
            log_event(id, &event);
        }
        if let Some(reason) = finished {
            break reason;
        }
    };

    let stats = session.stats();
    let pose = session.pose();
    log::info!(
        "[session {}] {} inputs, {} states, {} commands, {} dropped lines, final position {:?}",
        id,
        stats.inputs_applied,
        stats.states_sent,
        stats.commands_run,
        stats.lines_dropped,
        pose.position
    );
    Ok(SessionReport { id, reason, stats })
}

fn log_event(id: u64, event: &ServerEvent) {
    match event {
        ServerEvent::ClientConnected { addr: Some(addr) } => {
            log::info!("[session {}] client connected from {}", id, addr);
        }
        ServerEvent::ClientConnected { addr: None } => {
            log::info!("[session {}] client connected", id);
        }
        ServerEvent::HandshakeComplete { history_lines } => {
            log::info!(
                "[session {}] handshake complete ({} history lines)",
                id,
                history_lines
            );
        }
        ServerEvent::MessageDropped { line, reason } => {
            log::warn!("[session {}] dropped {:?}: {}", id, line, reason);
        }
        ServerEvent::CommandRun {
            command,
            output_lines,
        } => {
            log::debug!(
                "[session {}] ran {:?} ({} lines)",
                id,
                command,
                output_lines
            );
        }
        ServerEvent::ClientDisconnected { reason } => {
            log::info!("[session {}] client {}", id, reason.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::thread;

    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1".to_string(),
            port: 0,
            ..Default::default()
        }
    }

    fn read_lines(reader: &mut impl BufRead, count: usize) -> Vec<String> {
        (0..count)
            .map(|_| {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                line.trim_end().to_string()
            })
            .collect()
    }

    #[test]
    fn test_serve_one_ends_with_session() {
        let server = SessionServer::bind(test_config()).unwrap();
        let addr = server.local_addr().unwrap();
        let handle = thread::spawn(move || server.serve_one().unwrap());

        let client = TcpStream::connect(addr).unwrap();
        let mut writer = client.try_clone().unwrap();
        let mut reader = BufReader::new(client);
        assert_eq!(read_lines(&mut reader, 1), vec!["WELCOME 0.1"]);
        read_lines(&mut reader, 5);

        writer.write_all(b"INPUT 0 1 0 0 0 0.5\nINPUT nan 0 0 0 0 0.1\n").unwrap();
        let state = read_lines(&mut reader, 1);
        assert!(state[0].starts_with("STATE "));
        drop(writer);
        drop(reader);

        let report = handle.join().unwrap();
        assert_eq!(report.reason, DisconnectReason::PeerClosed);
        assert_eq!(report.stats.inputs_applied, 1);
        assert_eq!(report.stats.lines_dropped, 1);
    }

    #[test]
    fn test_concurrent_sessions_are_independent() {
        let config = ServerConfig {
            max_sessions: 4,
            ..test_config()
        };
        let server = SessionServer::bind(config).unwrap();
        let addr = server.local_addr().unwrap();

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let serving = runtime.spawn(server.serve_concurrent(async {
            let _ = stop_rx.await;
        }));

        let mut first = BufReader::new(TcpStream::connect(addr).unwrap());
        let mut second = BufReader::new(TcpStream::connect(addr).unwrap());
        read_lines(&mut first, 6);
        read_lines(&mut second, 6);

        first.get_mut().write_all(b"INPUT 1 0 0 0 0 1\n").unwrap();
        assert_eq!(
            read_lines(&mut first, 1),
            vec!["STATE 0.000000 1.600000 6.500000 0.000000 0.000000"]
        );

        second.get_mut().write_all(b"INPUT 0 0 0 0 0 1\n").unwrap();
        assert_eq!(
            read_lines(&mut second, 1),
            vec!["STATE 0.000000 1.600000 2.000000 0.000000 0.000000"]
        );

        stop_tx.send(()).unwrap();
        runtime.block_on(serving).unwrap().unwrap();
        drop(first);
        drop(second);
        runtime.shutdown_timeout(std::time::Duration::from_secs(1));
    }
}
