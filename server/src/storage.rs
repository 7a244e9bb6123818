//! Loading of the persisted user and question tables
//!
//! Both databases are JSON files in the shape the original deployment
//! used: users keyed by username, questions keyed by the decimal id.
//! They are read once at startup into a [`GameStore`]; nothing is ever
//! written back (score persistence is out of scope).

use crate::game::{GameStore, Question, QuestionId};
use log::info;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// Why a database file could not be loaded.
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// A question record broke an invariant the game relies on.
    InvalidQuestion { id: String, reason: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "could not read database file: {}", e),
            StorageError::Json(e) => write!(f, "database file is not valid JSON: {}", e),
            StorageError::InvalidQuestion { id, reason } => {
                write!(f, "question {:?} is invalid: {}", id, reason)
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Json(e) => Some(e),
            StorageError::InvalidQuestion { .. } => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(e)
    }
}

/// One user record as persisted on disk. The original format also stored a
/// `connected_ip` marker; connection state is runtime-only here, so any
/// such field is simply ignored.
#[derive(Debug, Deserialize)]
struct UserRecord {
    password: String,
    #[serde(default)]
    score: u32,
    #[serde(default)]
    questions_asked: Vec<QuestionId>,
}

/// One question record as persisted on disk. `correct` is the 0-based
/// index of the right answer.
#[derive(Debug, Deserialize)]
struct QuestionRecord {
    question: String,
    answers: Vec<String>,
    correct: u8,
}

/// Loads both database files into a fresh store.
pub fn load_database(
    users_path: impl AsRef<Path>,
    questions_path: impl AsRef<Path>,
) -> Result<GameStore, StorageError> {
    let mut store = GameStore::new();
    load_users_json(&fs::read_to_string(users_path)?, &mut store)?;
    load_questions_json(&fs::read_to_string(questions_path)?, &mut store)?;
    info!(
        "Loaded {} users and {} questions",
        store.user_count(),
        store.question_count()
    );
    Ok(store)
}

fn load_users_json(text: &str, store: &mut GameStore) -> Result<(), StorageError> {
    // serde_json keeps object key order, so the leaderboard's tie order
    // matches the file
    let records: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)?;
    for (username, value) in records {
        let record: UserRecord = serde_json::from_value(value)?;
        let asked: HashSet<QuestionId> = record.questions_asked.into_iter().collect();
        store.add_user(username, record.password, record.score, asked);
    }
    Ok(())
}

fn load_questions_json(text: &str, store: &mut GameStore) -> Result<(), StorageError> {
    let records: HashMap<String, QuestionRecord> = serde_json::from_str(text)?;
    for (key, record) in records {
        let id: QuestionId = key.parse().map_err(|_| StorageError::InvalidQuestion {
            id: key.clone(),
            reason: "id is not a number".to_string(),
        })?;
        let answers: [String; 4] =
            record.answers.try_into().map_err(|v: Vec<String>| StorageError::InvalidQuestion {
                id: key.clone(),
                reason: format!("expected 4 answers, got {}", v.len()),
            })?;
        if record.correct > 3 {
            return Err(StorageError::InvalidQuestion {
                id: key,
                reason: format!("correct index {} out of range 0..=3", record.correct),
            });
        }
        store.add_question(
            id,
            Question {
                text: record.question,
                answers,
                correct: record.correct,
            },
        );
    }
    Ok(())
}
