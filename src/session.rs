/**
 * A log of finished sessions: which questions were asked, what the learner chose and
 * whether it was right. Only the most recent sessions are kept.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::persistence::{load_json_or_default, save_json, Store};
use super::quiz::QuestionItem;
use super::select::SessionMode;


pub const SESSIONS_KEY: &str = "sessions";
pub const SESSION_CAP: usize = 50;


/// One answered question within a session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub area: String,
    /// Index of the option the learner picked, for multiple-choice questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen: Option<usize>,
    pub correct: bool,
}


#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    pub mode: SessionMode,
    pub topic: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub answers: Vec<AnswerRecord>,
}


impl SessionRecord {
    /// Start a new session. Nothing is stored until `end_session` is called.
    pub fn begin(mode: SessionMode, topic: &str) -> Self {
        let started_at = Utc::now();
        SessionRecord {
            id: format!("{}-{}", mode, started_at.timestamp_millis()),
            mode,
            topic: topic.to_string(),
            started_at,
            finished_at: None,
            answers: Vec::new(),
        }
    }

    pub fn log_answer(&mut self, item: &QuestionItem, chosen: Option<usize>, correct: bool) {
        self.answers.push(AnswerRecord {
            id: item.id().map(String::from),
            area: item.area(),
            chosen,
            correct,
        });
    }

    pub fn total(&self) -> usize {
        self.answers.len()
    }

    pub fn total_correct(&self) -> usize {
        self.answers.iter().filter(|a| a.correct).count()
    }

    pub fn total_incorrect(&self) -> usize {
        self.total() - self.total_correct()
    }

    /// Percentage of correct answers, or `None` if nothing was answered.
    pub fn score(&self) -> Option<f64> {
        if self.answers.is_empty() {
            None
        } else {
            Some(100.0 * self.total_correct() as f64 / self.total() as f64)
        }
    }
}


/// Mark `session` as finished and append it to the log, dropping the oldest sessions
/// beyond `SESSION_CAP`.
pub fn end_session(store: &mut dyn Store, mut session: SessionRecord) -> SessionRecord {
    session.finished_at = Some(Utc::now());
    let mut sessions = load_sessions(store);
    sessions.push(session.clone());
    if sessions.len() > SESSION_CAP {
        let excess = sessions.len() - SESSION_CAP;
        sessions.drain(..excess);
    }
    save_json(store, SESSIONS_KEY, &sessions);
    debug!(id = session.id.as_str(), answers = session.total(), "logged session");
    session
}


/// All logged sessions, oldest first.
pub fn load_sessions(store: &dyn Store) -> Vec<SessionRecord> {
    load_json_or_default(store, SESSIONS_KEY)
}


pub fn last_session(store: &dyn Store) -> Option<SessionRecord> {
    load_sessions(store).pop()
}


pub fn clear_sessions(store: &mut dyn Store) {
    store.remove(SESSIONS_KEY);
}
