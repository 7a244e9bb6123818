//! Blocking connection to the trivia server
//!
//! The client is strictly sequential: one request on the wire, then one
//! reply read back, so a plain blocking `TcpStream` is all it needs.

use log::debug;
use shared::{ClientCommand, ProtocolError, ServerReply, HEADER_LEN};
use std::fmt;
use std::io::{Read, Write};
use std::net::TcpStream;

/// Errors surfaced to the prompt loop.
#[derive(Debug)]
pub enum ClientError {
    Io(std::io::Error),
    Protocol(ProtocolError),
    /// The server closed the connection mid-conversation.
    Disconnected,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(e) => write!(f, "connection error: {}", e),
            ClientError::Protocol(e) => write!(f, "protocol error: {}", e),
            ClientError::Disconnected => write!(f, "the server closed the connection"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ClientError::Disconnected
        } else {
            ClientError::Io(e)
        }
    }
}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        ClientError::Protocol(e)
    }
}

/// One live connection to the server.
pub struct Connection {
    stream: TcpStream,
}

impl Connection {
    pub fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)?;
        debug!("Connected to {}", addr);
        Ok(Self { stream })
    }

    /// Writes one command frame.
    pub fn send(&mut self, command: ClientCommand, payload: &str) -> Result<(), ClientError> {
        let frame = command.encode(payload)?;
        self.stream.write_all(&frame)?;
        Ok(())
    }

    /// Reads one reply frame, rejecting codes outside the server direction.
    pub fn recv(&mut self) -> Result<(ServerReply, String), ClientError> {
        let mut header = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut header)?;
        let payload_len = shared::declared_payload_len(&header)?;

        let mut frame = header.to_vec();
        frame.resize(HEADER_LEN + payload_len, 0);
        self.stream.read_exact(&mut frame[HEADER_LEN..])?;

        let (code, payload) = shared::decode(&frame)?;
        let reply = ServerReply::from_code(&code)
            .ok_or_else(|| ProtocolError::UnknownCommand(code))?;
        debug!("Server -> {:?} ({} payload bytes)", reply, payload.len());
        Ok((reply, payload))
    }

    /// Sends one command and reads its reply.
    pub fn request(
        &mut self,
        command: ClientCommand,
        payload: &str,
    ) -> Result<(ServerReply, String), ClientError> {
        self.send(command, payload)?;
        self.recv()
    }
}
