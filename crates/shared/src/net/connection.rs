use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use super::framing::LineBuffer;
use super::protocol::{Message, ProtocolError};

const READ_CHUNK: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection is closed")]
    Disconnected,
    #[error("peer accepted zero bytes")]
    WriteZero,
    #[error("transport i/o failed: {0}")]
    Io(#[from] io::Error),
}

/// A stream socket carrying newline-delimited protocol lines.
///
/// The same buffered extraction backs both the non-blocking `poll_lines`
/// used by the client frame loop and the blocking `read_line` used by the
/// server session, so both roles see identical line sequences. The first
/// hard read or write failure marks the connection closed for good.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    connected: bool,
    buffer: LineBuffer,
    bytes_sent: u64,
    bytes_received: u64,
}

impl<S: Read + Write> Connection<S> {
    pub fn new(stream: S) -> Self {
        Self::with_buffer(stream, LineBuffer::default())
    }

    pub fn with_buffer(stream: S, buffer: LineBuffer) -> Self {
        Self {
            stream,
            connected: true,
            buffer,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn overflow_count(&self) -> u64 {
        self.buffer.overflow_count()
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        self.send_line(&message.encode())
    }

    /// Writes `line` plus a newline, looping over partial writes.
    pub fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }

        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');

        let mut sent = 0;
        while sent < bytes.len() {
            match self.stream.write(&bytes[sent..]) {
                Ok(0) => {
                    self.connected = false;
                    return Err(TransportError::WriteZero);
                }
                Ok(n) => sent += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.connected = false;
                    return Err(e.into());
                }
            }
        }
        self.bytes_sent += sent as u64;

        if let Err(e) = self.stream.flush() {
            self.connected = false;
            return Err(e.into());
        }
        Ok(())
    }

    /// Drains every byte currently readable and hands each complete line to
    /// `on_line`. Returns `false` once the peer is gone.
    pub fn poll_lines(&mut self, mut on_line: impl FnMut(String)) -> bool {
        if !self.connected {
            return false;
        }

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.connected = false;
                    return false;
                }
                Ok(n) => {
                    self.bytes_received += n as u64;
                    self.buffer.push_bytes(&chunk[..n]);
                    while let Some(line) = self.buffer.next_line() {
                        on_line(line);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return true,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("read failed: {}", e);
                    self.connected = false;
                    return false;
                }
            }
        }
    }

    /// Blocks until a full line is available. `None` means end of session.
    ///
    /// Lines already buffered are returned even after the peer has closed.
    /// On a non-blocking stream with no complete line this also returns
    /// `None` without closing the connection.
    pub fn read_line(&mut self) -> Option<String> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.buffer.next_line() {
                return Some(line);
            }
            if !self.connected {
                return None;
            }

            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.connected = false;
                    return None;
                }
                Ok(n) => {
                    self.bytes_received += n as u64;
                    self.buffer.push_bytes(&chunk[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return None,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("read failed: {}", e);
                    self.connected = false;
                    return None;
                }
            }
        }
    }

    /// Reads and decodes the next line. Malformed lines come back as
    /// `Some(Err(..))`; dropping them is the caller's call.
    pub fn read_message(&mut self) -> Option<Result<Message, ProtocolError>> {
        self.read_line().map(|line| Message::decode(&line))
    }

    pub fn close(&mut self) {
        self.connected = false;
        self.buffer.clear();
    }
}

impl Connection<TcpStream> {
    /// Blocking connect, then switches the socket to non-blocking for
    /// per-frame polling.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_nonblocking(true)?;
        Ok(Self::new(stream))
    }

    /// Wraps an accepted socket for the blocking server loop.
    pub fn accept(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }

    pub fn shutdown(&mut self) {
        if self.connected {
            let _ = self.stream.shutdown(Shutdown::Both);
        }
        self.close();
    }
}
