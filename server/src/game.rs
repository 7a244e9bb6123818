//! In-memory game state: users, questions, scores and asked-question history
//!
//! The store is plain data plus the two derived queries the dispatcher
//! needs (unasked-question selection and the leaderboard). It is owned by
//! the dispatcher loop and mutated from exactly one place, so it carries
//! no locking of its own. Its invariants:
//! - a score never decreases, and only answer submissions change it
//! - the asked-set only grows, and survives logout
//! - at most one live connection per user (tracked in `connected`)

use log::debug;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};

/// Opaque identity of one live connection, assigned by the accept loop.
pub type ConnId = u64;
/// Key of a question in the question table.
pub type QuestionId = u32;

/// Points awarded for a correct answer.
pub const CORRECT_ANSWER_POINTS: u32 = 5;

/// One registered player, loaded at startup from the user database.
#[derive(Debug, Clone)]
pub struct User {
    pub password: String,
    pub score: u32,
    /// Connection currently logged in as this user, if any.
    pub connected: Option<ConnId>,
    /// Ids of questions already served to this user. Never shrinks.
    pub asked: HashSet<QuestionId>,
}

/// One quiz question. Immutable after load.
#[derive(Debug, Clone)]
pub struct Question {
    pub text: String,
    pub answers: [String; 4],
    /// 0-based index of the right answer, in `0..=3`.
    pub correct: u8,
}

impl Question {
    pub fn new(text: impl Into<String>, answers: [&str; 4], correct: u8) -> Self {
        Self {
            text: text.into(),
            answers: answers.map(String::from),
            correct,
        }
    }
}

/// All mutable game state, owned by the dispatcher loop.
pub struct GameStore {
    users: HashMap<String, User>,
    /// Usernames in load order, so leaderboard ties stay stable.
    roster: Vec<String>,
    questions: HashMap<QuestionId, Question>,
}

impl GameStore {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            roster: Vec::new(),
            questions: HashMap::new(),
        }
    }

    pub fn add_user(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        score: u32,
        asked: HashSet<QuestionId>,
    ) {
        let username = username.into();
        if !self.users.contains_key(&username) {
            self.roster.push(username.clone());
        }
        self.users.insert(
            username,
            User {
                password: password.into(),
                score,
                connected: None,
                asked,
            },
        );
    }

    pub fn add_question(&mut self, id: QuestionId, question: Question) {
        self.questions.insert(id, question);
    }

    pub fn user(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    pub fn user_mut(&mut self, username: &str) -> Option<&mut User> {
        self.users.get_mut(username)
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.get(&id)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Adds points to a user's score. Scores only ever go up.
    pub fn award(&mut self, username: &str, points: u32) {
        if let Some(user) = self.users.get_mut(username) {
            user.score += points;
            debug!("User {} awarded {} points, score now {}", username, points, user.score);
        }
    }

    /// Picks a question this user has not seen yet, uniformly at random.
    ///
    /// The chosen id is recorded into the asked-set before it is returned,
    /// so a crash between selection and send can never serve it twice.
    /// Returns `None` when the user has exhausted the question table.
    pub fn pick_unasked(&mut self, username: &str) -> Option<QuestionId> {
        let user = self.users.get_mut(username)?;
        let mut unasked: Vec<QuestionId> = self
            .questions
            .keys()
            .copied()
            .filter(|id| !user.asked.contains(id))
            .collect();
        unasked.sort_unstable();

        let id = *unasked.choose(&mut rand::thread_rng())?;
        user.asked.insert(id);
        Some(id)
    }

    /// Formats the leaderboard: one `name: score` line per user, highest
    /// score first. Ties keep the order users were loaded in (stable sort).
    pub fn leaderboard(&self) -> String {
        let mut entries: Vec<(&str, u32)> = self
            .roster
            .iter()
            .filter_map(|name| self.users.get(name).map(|u| (name.as_str(), u.score)))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));

        let mut table = String::new();
        for (name, score) in entries {
            table.push_str(&format!("{}: {}\n", name, score));
        }
        table
    }
}

impl Default for GameStore {
    fn default() -> Self {
        Self::new()
    }
}
