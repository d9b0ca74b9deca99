//! Per-session interview state and the keyed container holding it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use crate::error::{BrokerError, Result};
use crate::rendezvous::Mailbox;

/// Lifecycle state of an interview session, derived from its record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No question outstanding; the worker may ask the next one
    AwaitingQuestion,
    /// A question was published and its worker is blocked on the answer
    QuestionPending,
    Done,
    /// Finished with an error message; an errored session is also done
    Error,
}

impl SessionState {
    pub fn is_finished(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Error)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::AwaitingQuestion => "AWAITING_QUESTION",
            SessionState::QuestionPending => "QUESTION_PENDING",
            SessionState::Done => "DONE",
            SessionState::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// One answered question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub question: String,
    pub answer: String,
}

/// Mutable state of one session. Only the broker mutates it, under the store lock.
#[derive(Debug)]
pub struct SessionRecord {
    pub(crate) pending_question: Option<String>,
    pub(crate) transcript: Vec<TranscriptEntry>,
    pub(crate) done: bool,
    pub(crate) error: Option<String>,
    pub(crate) mailbox: Mailbox,
    pub(crate) created_at: DateTime<Utc>,
}

impl SessionRecord {
    fn new() -> Self {
        Self {
            pending_question: None,
            transcript: Vec::new(),
            done: false,
            error: None,
            mailbox: Mailbox::new(),
            created_at: Utc::now(),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.error.is_some() {
            SessionState::Error
        } else if self.done {
            SessionState::Done
        } else if self.pending_question.is_some() {
            SessionState::QuestionPending
        } else {
            SessionState::AwaitingQuestion
        }
    }

    fn snapshot(&self, session_id: &str) -> SessionSnapshot {
        SessionSnapshot {
            session_id: session_id.to_string(),
            state: self.state(),
            pending_question: self.pending_question.clone(),
            transcript: self.transcript.clone(),
            done: self.done,
            error: self.error.clone(),
            created_at: self.created_at,
        }
    }
}

/// Owned copy of a session record, taken under the lock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: SessionState,
    pub pending_question: Option<String>,
    pub transcript: Vec<TranscriptEntry>,
    pub done: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Coarse-locked map from session id to session record.
///
/// Sessions live for the lifetime of the process; there is no eviction.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh session and return its id.
    pub fn create(&self) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.lock().insert(session_id.clone(), SessionRecord::new());
        session_id
    }

    pub fn get(&self, session_id: &str) -> Result<SessionSnapshot> {
        self.lock()
            .get(session_id)
            .map(|record| record.snapshot(session_id))
            .ok_or_else(|| BrokerError::not_found(session_id))
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All session ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run `f` against a record while holding the store lock.
    pub(crate) fn with_record<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionRecord) -> T,
    ) -> Option<T> {
        self.lock().get_mut(session_id).map(f)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionRecord>> {
        // Every critical section leaves records consistent, so a poisoned lock is usable
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
