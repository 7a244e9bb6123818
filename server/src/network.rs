//! Connection handling: accept loop, per-connection framing, dispatch loop
//!
//! Each accepted socket gets a fresh connection id and a lightweight task
//! that reads one frame at a time and forwards it to the dispatcher loop
//! over an mpsc channel, awaiting the reply on a oneshot before writing it
//! back. All mutable game state lives in the dispatcher loop and is
//! touched by one command at a time, so the protocol's strict
//! request/response discipline holds without any locking.
//!
//! A parse failure, an explicit logout, or a closed peer all resolve the
//! same way: the session is torn down and the connection closed.

use crate::dispatch::{self, Response};
use crate::game::{ConnId, GameStore};
use crate::sessions::SessionRegistry;
use log::{debug, error, info, warn};
use shared::{ClientCommand, ServerReply, HEADER_LEN};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

/// Events sent from connection tasks to the dispatcher loop
#[derive(Debug)]
pub enum ConnEvent {
    Request {
        conn: ConnId,
        command: ClientCommand,
        payload: String,
        /// `None` back means: close the connection without replying.
        reply: oneshot::Sender<Option<Response>>,
    },
    Closed {
        conn: ConnId,
    },
}

/// Result of reading one frame off a connection.
#[derive(Debug)]
enum FrameRead {
    Frame { code: String, payload: String },
    /// Peer closed or reset; nothing more to read.
    Closed,
    /// The peer sent bytes that do not frame; treated as a disconnect.
    Garbage,
}

/// The trivia server: listening socket plus the state handed to the
/// dispatcher loop when [`Server::run`] starts.
pub struct Server {
    listener: TcpListener,
    store: GameStore,
}

impl Server {
    /// Binds the listening socket. The only startup error that is fatal to
    /// the process is failing here.
    pub async fn bind(addr: &str, store: GameStore) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Server { listener, store })
    }

    /// The bound address, useful when binding port 0 in tests.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop and the dispatcher loop until process shutdown.
    pub async fn run(self) -> std::io::Result<()> {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        tokio::spawn(accept_loop(self.listener, event_tx));

        // The dispatcher loop is the single owner of all mutable state
        let mut store = self.store;
        let mut sessions = SessionRegistry::new();

        while let Some(event) = event_rx.recv().await {
            match event {
                ConnEvent::Request { conn, command, payload, reply } => {
                    let response = dispatch::dispatch(&mut store, &mut sessions, conn, command, &payload);
                    // A dropped receiver just means the connection died mid-command
                    let _ = reply.send(response);
                }
                ConnEvent::Closed { conn } => {
                    sessions.deauthenticate(conn, &mut store);
                }
            }
        }
        Ok(())
    }
}

async fn accept_loop(listener: TcpListener, events: mpsc::UnboundedSender<ConnEvent>) {
    let mut next_conn: ConnId = 1;
    loop {
        match listener.accept().await {
            Ok((socket, addr)) => {
                let conn = next_conn;
                next_conn += 1;
                info!("Client {} connected from {}", conn, addr);
                tokio::spawn(handle_connection(conn, socket, events.clone()));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Serves one connection: read a frame, dispatch, write the reply, repeat.
///
/// Generic over the socket so tests can drive it with an in-memory duplex.
async fn handle_connection<S>(conn: ConnId, mut socket: S, events: mpsc::UnboundedSender<ConnEvent>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let (code, payload) = match read_frame(conn, &mut socket).await {
            FrameRead::Frame { code, payload } => (code, payload),
            FrameRead::Closed | FrameRead::Garbage => break,
        };

        // A structurally valid frame with a code outside the client
        // direction gets a generic error and the connection stays open
        let Some(command) = ClientCommand::from_code(&code) else {
            warn!("Connection {} sent unrecognized command {:?}", conn, code);
            let frame = match ServerReply::Error.encode("Error: unrecognized command") {
                Ok(frame) => frame,
                Err(_) => break,
            };
            if socket.write_all(&frame).await.is_err() {
                break;
            }
            continue;
        };
        debug!("Connection {} -> {:?} ({} payload bytes)", conn, command, payload.len());

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = ConnEvent::Request { conn, command, payload, reply: reply_tx };
        if events.send(request).is_err() {
            break;
        }
        let Ok(response) = reply_rx.await else {
            break;
        };
        // No response means logout: close without writing anything back
        let Some(response) = response else {
            break;
        };

        let frame = match response.encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Connection {}: could not encode {:?}: {}", conn, response.reply, e);
                break;
            }
        };
        if socket.write_all(&frame).await.is_err() {
            break;
        }
    }

    let _ = events.send(ConnEvent::Closed { conn });
    info!("Client {} disconnected", conn);
}

/// Reads exactly one frame: the fixed header, then the declared payload.
async fn read_frame<R>(conn: ConnId, socket: &mut R) -> FrameRead
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    if socket.read_exact(&mut header).await.is_err() {
        return FrameRead::Closed;
    }

    let payload_len = match shared::declared_payload_len(&header) {
        Ok(len) => len,
        Err(e) => {
            warn!("Connection {} sent a malformed header: {}", conn, e);
            return FrameRead::Garbage;
        }
    };

    let mut frame = header.to_vec();
    frame.resize(HEADER_LEN + payload_len, 0);
    if socket.read_exact(&mut frame[HEADER_LEN..]).await.is_err() {
        return FrameRead::Closed;
    }

    match shared::decode(&frame) {
        Ok((code, payload)) => FrameRead::Frame { code, payload },
        Err(e) => {
            warn!("Connection {} sent a malformed frame: {}", conn, e);
            FrameRead::Garbage
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_read_frame_valid() {
        let (mut client, mut server) = duplex(1024);
        let frame = ClientCommand::Login.encode("alice#p1").unwrap();
        client.write_all(&frame).await.unwrap();

        match read_frame(1, &mut server).await {
            FrameRead::Frame { code, payload } => {
                assert_eq!(code, "LOGIN");
                assert_eq!(payload, "alice#p1");
            }
            other => panic!("expected a frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_frame_peer_closed() {
        let (client, mut server) = duplex(1024);
        drop(client);
        assert!(matches!(read_frame(1, &mut server).await, FrameRead::Closed));
    }

    #[tokio::test]
    async fn test_read_frame_truncated_is_closed() {
        let (mut client, mut server) = duplex(1024);
        let frame = ClientCommand::Login.encode("alice#p1").unwrap();
        client.write_all(&frame[..HEADER_LEN + 2]).await.unwrap();
        drop(client);
        assert!(matches!(read_frame(1, &mut server).await, FrameRead::Closed));
    }

    #[tokio::test]
    async fn test_read_frame_garbage_header() {
        let (mut client, mut server) = duplex(1024);
        client.write_all(&[b'x'; HEADER_LEN]).await.unwrap();
        assert!(matches!(read_frame(1, &mut server).await, FrameRead::Garbage));
    }

    #[tokio::test]
    async fn test_unknown_code_answered_with_error_and_stays_open() {
        let (mut client, server) = duplex(1024);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(handle_connection(7, server, event_tx));

        // "PING" frames fine but is no client command
        client.write_all(&shared::encode("PING", "").unwrap()).await.unwrap();

        let mut header = [0u8; HEADER_LEN];
        client.read_exact(&mut header).await.unwrap();
        let len = shared::declared_payload_len(&header).unwrap();
        let mut rest = vec![0u8; len];
        client.read_exact(&mut rest).await.unwrap();
        let mut frame = header.to_vec();
        frame.extend_from_slice(&rest);
        let (code, payload) = shared::decode(&frame).unwrap();
        assert_eq!(ServerReply::from_code(&code), Some(ServerReply::Error));
        assert_eq!(payload, "Error: unrecognized command");

        // The connection survived; a real command still gets forwarded
        client.write_all(&ClientCommand::MyScore.encode("").unwrap()).await.unwrap();
        match event_rx.recv().await.unwrap() {
            ConnEvent::Request { conn, command, .. } => {
                assert_eq!(conn, 7);
                assert_eq!(command, ClientCommand::MyScore);
            }
            other => panic!("expected a request, got {:?}", other),
        }

        drop(client);
        task.await.unwrap();
        assert!(matches!(event_rx.recv().await, Some(ConnEvent::Closed { conn: 7 })));
    }

    #[tokio::test]
    async fn test_garbage_frame_tears_connection_down() {
        let (mut client, server) = duplex(1024);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(handle_connection(3, server, event_tx));

        client.write_all(&[b'!'; HEADER_LEN + 8]).await.unwrap();

        assert!(matches!(event_rx.recv().await, Some(ConnEvent::Closed { conn: 3 })));
        task.await.unwrap();

        // Server side closed; reads on the client end drain to EOF
        let mut buf = [0u8; 16];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_none_response_closes_without_reply() {
        let (mut client, server) = duplex(1024);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(handle_connection(5, server, event_tx));

        client.write_all(&ClientCommand::Logout.encode("").unwrap()).await.unwrap();

        match event_rx.recv().await.unwrap() {
            ConnEvent::Request { command, reply, .. } => {
                assert_eq!(command, ClientCommand::Logout);
                reply.send(None).unwrap();
            }
            other => panic!("expected a request, got {:?}", other),
        }

        assert!(matches!(event_rx.recv().await, Some(ConnEvent::Closed { conn: 5 })));
        task.await.unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_response_written_back_on_same_connection() {
        let (mut client, server) = duplex(1024);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let _task = tokio::spawn(handle_connection(2, server, event_tx));

        client.write_all(&ClientCommand::MyScore.encode("").unwrap()).await.unwrap();

        match event_rx.recv().await.unwrap() {
            ConnEvent::Request { reply, .. } => {
                reply.send(Some(Response::new(ServerReply::YourScore, "15"))).unwrap();
            }
            other => panic!("expected a request, got {:?}", other),
        }

        let expected = ServerReply::YourScore.encode("15").unwrap();
        let mut buf = vec![0u8; expected.len()];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, expected);
    }
}
