//! Per-connection authentication state
//!
//! Maps live connections to the username they are logged in as, and keeps
//! that mapping in sync with the `connected` marker on the user record.
//! A username maps to at most one live connection at a time.

use crate::game::{ConnId, GameStore};
use log::info;
use std::fmt;

/// Why a login attempt was refused. Checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    /// This connection already holds an authenticated session.
    AlreadyLoggedIn,
    UnknownUser,
    WrongPassword,
    /// Another connection is logged in as this user.
    AlreadyConnected,
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginError::AlreadyLoggedIn => write!(f, "Already logged in from this connection"),
            LoginError::UnknownUser => write!(f, "The username you entered does not exist"),
            LoginError::WrongPassword => write!(f, "Wrong password"),
            LoginError::AlreadyConnected => write!(f, "User already connected"),
        }
    }
}

impl std::error::Error for LoginError {}

/// Connection-to-username mapping for authenticated sessions.
///
/// Kept in login order so the `LOGGED` listing is stable.
pub struct SessionRegistry {
    sessions: Vec<(ConnId, String)>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self { sessions: Vec::new() }
    }

    /// The username this connection is logged in as, if any. This is the
    /// dispatcher's precondition gate for every command except login.
    pub fn username(&self, conn: ConnId) -> Option<&str> {
        self.sessions
            .iter()
            .find(|(id, _)| *id == conn)
            .map(|(_, name)| name.as_str())
    }

    /// Attempts to log `conn` in as `username`.
    ///
    /// On success records the mapping both ways: session → username here,
    /// and the connection id on the user record.
    pub fn authenticate(
        &mut self,
        conn: ConnId,
        username: &str,
        password: &str,
        store: &mut GameStore,
    ) -> Result<(), LoginError> {
        if self.username(conn).is_some() {
            return Err(LoginError::AlreadyLoggedIn);
        }
        let user = store.user(username).ok_or(LoginError::UnknownUser)?;
        if user.password != password {
            return Err(LoginError::WrongPassword);
        }
        if user.connected.is_some() {
            return Err(LoginError::AlreadyConnected);
        }

        self.sessions.push((conn, username.to_string()));
        if let Some(user) = store.user_mut(username) {
            user.connected = Some(conn);
        }
        info!("Connection {} logged in as {}", conn, username);
        Ok(())
    }

    /// Clears both sides of the mapping for `conn`.
    ///
    /// A no-op for connections that never authenticated, so teardown can
    /// call it unconditionally.
    pub fn deauthenticate(&mut self, conn: ConnId, store: &mut GameStore) {
        let Some(pos) = self.sessions.iter().position(|(id, _)| *id == conn) else {
            return;
        };
        let (_, username) = self.sessions.remove(pos);
        if let Some(user) = store.user_mut(&username) {
            if user.connected == Some(conn) {
                user.connected = None;
            }
        }
        info!("Connection {} logged out ({})", conn, username);
    }

    /// Usernames of all authenticated sessions, in login order.
    pub fn logged_usernames(&self) -> Vec<&str> {
        self.sessions.iter().map(|(_, name)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
