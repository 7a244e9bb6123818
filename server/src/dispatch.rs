//! Command dispatch: routes one decoded client command to its handler
//!
//! The exhaustive match over [`ClientCommand`] is the routing table; the
//! authentication precondition is applied once, in front of every handler
//! except login. Handlers return a typed [`Response`]; expected bad input
//! (a non-numeric answer, an unknown question id) is a value here, never
//! control flow that escapes the dispatcher.

use crate::game::{ConnId, GameStore, CORRECT_ANSWER_POINTS};
use crate::sessions::SessionRegistry;
use log::{debug, warn};
use shared::{ClientCommand, ServerReply, DATA_DELIMITER};

/// One reply frame to be sent back on the triggering connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub reply: ServerReply,
    pub payload: String,
}

impl Response {
    pub fn new(reply: ServerReply, payload: impl Into<String>) -> Self {
        Self { reply, payload: payload.into() }
    }

    pub fn empty(reply: ServerReply) -> Self {
        Self::new(reply, "")
    }

    fn error(message: &str) -> Self {
        Self::new(ServerReply::Error, message)
    }

    /// Encodes this response as one wire frame.
    pub fn encode(&self) -> Result<Vec<u8>, shared::ProtocolError> {
        self.reply.encode(&self.payload)
    }
}

/// Handles one command for one connection.
///
/// Returns `None` only for logout, which tears the session down and sends
/// nothing back (the connection is about to close).
pub fn dispatch(
    store: &mut GameStore,
    sessions: &mut SessionRegistry,
    conn: ConnId,
    command: ClientCommand,
    payload: &str,
) -> Option<Response> {
    if command == ClientCommand::Login {
        return Some(handle_login(store, sessions, conn, payload));
    }
    if command == ClientCommand::Logout {
        sessions.deauthenticate(conn, store);
        return None;
    }

    // Every remaining command needs an authenticated session; handlers key
    // game-state lookups by the username recorded there.
    let Some(username) = sessions.username(conn).map(String::from) else {
        debug!("Connection {} sent {:?} without logging in", conn, command);
        return Some(Response::error("Error: not logged in"));
    };

    let response = match command {
        ClientCommand::MyScore => handle_get_score(store, &username),
        ClientCommand::Highscore => Response::new(ServerReply::AllScore, store.leaderboard()),
        ClientCommand::Logged => {
            Response::new(ServerReply::LoggedAnswer, sessions.logged_usernames().join(","))
        }
        ClientCommand::GetQuestion => handle_get_question(store, &username),
        ClientCommand::SendAnswer => handle_send_answer(store, &username, payload),
        ClientCommand::Login | ClientCommand::Logout => unreachable!("handled above"),
    };
    Some(response)
}

fn handle_login(
    store: &mut GameStore,
    sessions: &mut SessionRegistry,
    conn: ConnId,
    payload: &str,
) -> Response {
    let Some((username, password)) = payload.split_once(DATA_DELIMITER) else {
        warn!("Connection {} sent malformed login payload", conn);
        return Response::error("Error: invalid input");
    };

    match sessions.authenticate(conn, username, password, store) {
        Ok(()) => Response::empty(ServerReply::LoginOk),
        Err(reason) => {
            debug!("Login as {:?} on connection {} refused: {}", username, conn, reason);
            Response::new(ServerReply::LoginFailed, reason.to_string())
        }
    }
}

fn handle_get_score(store: &GameStore, username: &str) -> Response {
    match store.user(username) {
        Some(user) => Response::new(ServerReply::YourScore, user.score.to_string()),
        // Session exists but the user record is gone; should not happen
        None => Response::error("Error: unknown user"),
    }
}

fn handle_get_question(store: &mut GameStore, username: &str) -> Response {
    let Some(id) = store.pick_unasked(username) else {
        return Response::empty(ServerReply::NoQuestions);
    };
    let Some(question) = store.question(id) else {
        return Response::error("Error: unknown question");
    };

    let payload = format!(
        "{}#{}#{}#{}#{}#{}",
        id,
        question.text,
        question.answers[0],
        question.answers[1],
        question.answers[2],
        question.answers[3],
    );
    Response::new(ServerReply::Question, payload)
}

fn handle_send_answer(store: &mut GameStore, username: &str, payload: &str) -> Response {
    let parsed = payload.split_once(DATA_DELIMITER).and_then(|(id, answer)| {
        Some((id.parse::<u32>().ok()?, answer.parse::<u8>().ok()?))
    });
    let Some((question_id, answer)) = parsed else {
        return Response::error("Error: invalid input");
    };
    let Some(question) = store.question(question_id) else {
        return Response::error("Error: invalid input");
    };

    if question.correct == answer {
        store.award(username, CORRECT_ANSWER_POINTS);
        Response::empty(ServerReply::Correct)
    } else {
        let correct = question.correct.to_string();
        Response::new(ServerReply::Wrong, correct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Question;
    use std::collections::HashSet;

    fn fixture() -> (GameStore, SessionRegistry) {
        let mut store = GameStore::new();
        store.add_user("alice", "p1", 0, HashSet::new());
        store.add_question(1, Question::new("2+2?", ["3", "4", "5", "6"], 1));
        (store, SessionRegistry::new())
    }

    fn login(store: &mut GameStore, sessions: &mut SessionRegistry, conn: ConnId) {
        let response =
            dispatch(store, sessions, conn, ClientCommand::Login, "alice#p1").unwrap();
        assert_eq!(response, Response::empty(ServerReply::LoginOk));
    }

    #[test]
    fn test_login_ok() {
        let (mut store, mut sessions) = fixture();
        login(&mut store, &mut sessions, 1);
        assert_eq!(sessions.username(1), Some("alice"));
    }

    #[test]
    fn test_login_unknown_user_has_stable_reason() {
        let (mut store, mut sessions) = fixture();
        let response =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::Login, "bob#p1").unwrap();
        assert_eq!(response.reply, ServerReply::LoginFailed);
        assert_eq!(response.payload, "The username you entered does not exist");
    }

    #[test]
    fn test_login_wrong_password() {
        let (mut store, mut sessions) = fixture();
        let response =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::Login, "alice#wrong").unwrap();
        assert_eq!(response.reply, ServerReply::LoginFailed);
        assert_eq!(response.payload, "Wrong password");
    }

    #[test]
    fn test_login_missing_delimiter() {
        let (mut store, mut sessions) = fixture();
        let response =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::Login, "alice").unwrap();
        assert_eq!(response.reply, ServerReply::Error);
    }

    #[test]
    fn test_commands_gated_behind_login() {
        let (mut store, mut sessions) = fixture();
        for command in [
            ClientCommand::GetQuestion,
            ClientCommand::SendAnswer,
            ClientCommand::MyScore,
            ClientCommand::Highscore,
            ClientCommand::Logged,
        ] {
            let response = dispatch(&mut store, &mut sessions, 1, command, "").unwrap();
            assert_eq!(response.reply, ServerReply::Error, "{:?} not gated", command);
        }
        // The gate leaves state untouched
        assert_eq!(store.user("alice").unwrap().score, 0);
        assert!(store.user("alice").unwrap().asked.is_empty());
    }

    #[test]
    fn test_logout_returns_no_response_and_frees_user() {
        let (mut store, mut sessions) = fixture();
        login(&mut store, &mut sessions, 1);

        assert_eq!(dispatch(&mut store, &mut sessions, 1, ClientCommand::Logout, ""), None);
        assert_eq!(store.user("alice").unwrap().connected, None);
        assert_eq!(sessions.username(1), None);
    }

    #[test]
    fn test_get_score() {
        let (mut store, mut sessions) = fixture();
        login(&mut store, &mut sessions, 1);
        store.award("alice", 15);

        let response =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::MyScore, "").unwrap();
        assert_eq!(response, Response::new(ServerReply::YourScore, "15"));
    }

    #[test]
    fn test_question_then_correct_answer_awards_points() {
        let (mut store, mut sessions) = fixture();
        login(&mut store, &mut sessions, 1);

        let response =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::GetQuestion, "").unwrap();
        assert_eq!(response.reply, ServerReply::Question);
        assert_eq!(response.payload, "1#2+2?#3#4#5#6");

        let response =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::SendAnswer, "1#1").unwrap();
        assert_eq!(response, Response::empty(ServerReply::Correct));
        assert_eq!(store.user("alice").unwrap().score, 5);
    }

    #[test]
    fn test_wrong_answer_reports_correct_index() {
        let (mut store, mut sessions) = fixture();
        login(&mut store, &mut sessions, 1);

        let response =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::SendAnswer, "1#3").unwrap();
        assert_eq!(response, Response::new(ServerReply::Wrong, "1"));
        assert_eq!(store.user("alice").unwrap().score, 0);
    }

    #[test]
    fn test_answer_rejects_bad_input() {
        let (mut store, mut sessions) = fixture();
        login(&mut store, &mut sessions, 1);

        for payload in ["", "1", "one#two", "1#two", "x#1", "9#1"] {
            let response =
                dispatch(&mut store, &mut sessions, 1, ClientCommand::SendAnswer, payload)
                    .unwrap();
            assert_eq!(response.reply, ServerReply::Error, "payload {:?}", payload);
        }
        assert_eq!(store.user("alice").unwrap().score, 0);
    }

    #[test]
    fn test_questions_exhaust() {
        let (mut store, mut sessions) = fixture();
        login(&mut store, &mut sessions, 1);

        let first =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::GetQuestion, "").unwrap();
        assert_eq!(first.reply, ServerReply::Question);

        let second =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::GetQuestion, "").unwrap();
        assert_eq!(second, Response::empty(ServerReply::NoQuestions));
    }

    #[test]
    fn test_highscore_and_logged() {
        let (mut store, mut sessions) = fixture();
        store.add_user("bob", "p2", 0, HashSet::new());
        login(&mut store, &mut sessions, 1);
        dispatch(&mut store, &mut sessions, 2, ClientCommand::Login, "bob#p2").unwrap();
        store.award("bob", 5);

        let response =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::Highscore, "").unwrap();
        assert_eq!(response, Response::new(ServerReply::AllScore, "bob: 5\nalice: 0\n"));

        let response =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::Logged, "").unwrap();
        assert_eq!(response, Response::new(ServerReply::LoggedAnswer, "alice,bob"));
    }

    #[test]
    fn test_full_scenario() {
        // Load alice and one question, play the whole session through
        let (mut store, mut sessions) = fixture();
        login(&mut store, &mut sessions, 1);

        let question =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::GetQuestion, "").unwrap();
        assert_eq!(question.payload, "1#2+2?#3#4#5#6");

        let verdict =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::SendAnswer, "1#1").unwrap();
        assert_eq!(verdict.reply, ServerReply::Correct);
        assert_eq!(store.user("alice").unwrap().score, 5);

        let empty =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::GetQuestion, "").unwrap();
        assert_eq!(empty.reply, ServerReply::NoQuestions);

        let table =
            dispatch(&mut store, &mut sessions, 1, ClientCommand::Highscore, "").unwrap();
        assert_eq!(table.payload, "alice: 5\n");
    }
}
