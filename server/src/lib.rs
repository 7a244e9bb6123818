//! # Trivia Game Server Library
//!
//! The authoritative server for the multi-client trivia game. Clients hold
//! a persistent TCP connection, authenticate, request questions, submit
//! answers, and query scores and leaderboards using the length-prefixed
//! text protocol defined in the `shared` crate.
//!
//! ## Architecture
//!
//! All mutable game state (users, questions, sessions) is owned by one
//! dispatcher loop. Connection tasks do the framing and forward each
//! decoded command over a channel, then write the single reply back on the
//! same connection. The protocol is strictly request/response with one
//! in-flight command per client, so commands are applied one at a time
//! and no locking is needed anywhere.
//!
//! ## Module Organization
//!
//! - [`game`]: the in-memory state store with users, questions, scoring,
//!   asked-question history and the leaderboard.
//! - [`sessions`]: the login state machine mapping connections to
//!   authenticated usernames.
//! - [`dispatch`]: routes each decoded command to its handler behind a
//!   single authentication gate.
//! - [`network`]: the TCP accept loop, per-connection framing tasks, and
//!   the dispatcher loop that ties it all together.
//! - [`storage`]: one-shot loading of the JSON user/question databases.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use server::storage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = storage::load_database("Users.txt", "Questions.txt")?;
//!     let server = Server::bind("127.0.0.1:2604", store).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod dispatch;
pub mod game;
pub mod network;
pub mod sessions;
pub mod storage;
