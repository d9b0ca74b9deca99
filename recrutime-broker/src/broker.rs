//! The interview broker: a per-session state machine bridging a blocking worker
//! thread and clients that can only poll.
//!
//! ```text
//!                 ask                      answer
//! AWAITING_QUESTION ──→ QUESTION_PENDING ──────→ AWAITING_QUESTION
//!         │                    │
//!         └── mark_done / mark_error (any state) ──→ DONE / ERROR
//! ```
//!
//! State changes happen under the session store lock. The mailbox deposit that
//! wakes a blocked `ask` happens after the lock is released, and only for the
//! transition that cleared the pending question, so each question gets exactly
//! one delivery.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{BrokerError, Result};
use crate::rendezvous::{Delivery, Mailbox};
use crate::session::{SessionRecord, SessionState, SessionStore, TranscriptEntry};

/// Error message recorded when `ask_with_timeout` gives up.
pub const TIMEOUT_MESSAGE: &str = "timeout";

/// Whether an answer reached a pending question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Delivered,
    /// No question was pending; the answer was dropped
    Ignored,
}

/// Non-blocking summary of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub exists: bool,
    pub done: bool,
    pub error: Option<String>,
    pub has_question: bool,
    pub transcript_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterviewReport {
    pub done: bool,
    pub error: Option<String>,
    pub transcript: Vec<TranscriptEntry>,
}

/// What a polling client sees
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuestionPoll {
    Question { question: String },
    Waiting,
    Done,
    Error { message: String },
}

#[derive(Debug, Default)]
pub struct InterviewBroker {
    store: SessionStore,
}

impl InterviewBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn create_session(&self) -> String {
        let session_id = self.store.create();
        info!("Created interview session {}", session_id);
        session_id
    }

    /// Publish `question` and block until it is answered or the session finishes.
    ///
    /// Returns the answer, or an empty string when the session was finished before
    /// an answer arrived (including when it was already finished on entry).
    pub fn ask(&self, session_id: &str, question: &str) -> Result<String> {
        match self.publish_question(session_id, question)? {
            Some(mailbox) => Ok(self.receive(session_id, mailbox.wait())),
            None => Ok(String::new()),
        }
    }

    /// Like [`ask`](Self::ask), but gives up after `timeout`, moving the session to
    /// `ERROR("timeout")` and returning an empty answer.
    pub fn ask_with_timeout(
        &self,
        session_id: &str,
        question: &str,
        timeout: Duration,
    ) -> Result<String> {
        let Some(mailbox) = self.publish_question(session_id, question)? else {
            return Ok(String::new());
        };

        if let Some(delivery) = mailbox.wait_timeout(timeout) {
            return Ok(self.receive(session_id, delivery));
        }

        let expired = self
            .store
            .with_record(session_id, |record| {
                if record.state() != SessionState::QuestionPending {
                    return false;
                }
                record.pending_question = None;
                record.done = true;
                record.error = Some(TIMEOUT_MESSAGE.to_string());
                true
            })
            .unwrap_or(false);

        if expired {
            warn!("No answer for session {} within {:?}", session_id, timeout);
            return Ok(String::new());
        }

        // The question was cleared concurrently; its delivery is already on the way
        Ok(self.receive(session_id, mailbox.wait()))
    }

    /// Deliver `answer` to the pending question, if any.
    ///
    /// An answer with no pending question is dropped, so a late or duplicate
    /// answer can never be attributed to a future question.
    pub fn answer(&self, session_id: &str, answer: &str) -> Result<AnswerOutcome> {
        let mailbox = self
            .store
            .with_record(session_id, |record| {
                let question = record.pending_question.take()?;
                record.transcript.push(TranscriptEntry {
                    question,
                    answer: answer.to_string(),
                });
                Some(record.mailbox.clone())
            })
            .ok_or_else(|| BrokerError::not_found(session_id))?;

        match mailbox {
            Some(mailbox) => {
                info!(
                    "Answer for session {} delivered ({} chars)",
                    session_id,
                    answer.chars().count()
                );
                mailbox.deposit(Delivery::Answer(answer.to_string()));
                Ok(AnswerOutcome::Delivered)
            }
            None => {
                warn!("Ignoring answer for session {}: no pending question", session_id);
                Ok(AnswerOutcome::Ignored)
            }
        }
    }

    /// The pending question, without blocking.
    pub fn get_question(&self, session_id: &str) -> Result<Option<String>> {
        let question = self
            .store
            .with_record(session_id, |record| record.pending_question.clone())
            .ok_or_else(|| BrokerError::not_found(session_id))?;

        match &question {
            Some(q) => debug!("Poll {}: question pending ({} chars)", session_id, q.len()),
            None => debug!("Poll {}: no question yet", session_id),
        }

        Ok(question)
    }

    /// Polling view of a session: an error wins over done, done over a question.
    pub fn poll(&self, session_id: &str) -> Result<QuestionPoll> {
        let poll = self
            .store
            .with_record(session_id, |record| match record.state() {
                SessionState::Error => QuestionPoll::Error {
                    message: record.error.clone().unwrap_or_default(),
                },
                SessionState::Done => QuestionPoll::Done,
                SessionState::QuestionPending => QuestionPoll::Question {
                    question: record.pending_question.clone().unwrap_or_default(),
                },
                SessionState::AwaitingQuestion => QuestionPoll::Waiting,
            })
            .ok_or_else(|| BrokerError::not_found(session_id))?;

        debug!("Poll {}: {:?}", session_id, poll);
        Ok(poll)
    }

    /// Finish the session, releasing a blocked `ask` if there is one.
    pub fn mark_done(&self, session_id: &str) -> Result<()> {
        let released = self
            .store
            .with_record(session_id, |record| {
                record.done = true;
                release_pending(record)
            })
            .ok_or_else(|| BrokerError::not_found(session_id))?;

        info!("Session {} done", session_id);
        if let Some(mailbox) = released {
            mailbox.deposit(Delivery::Released);
        }
        Ok(())
    }

    /// Finish the session with an error. The first recorded error is kept.
    pub fn mark_error(&self, session_id: &str, message: &str) -> Result<()> {
        let released = self
            .store
            .with_record(session_id, |record| {
                record.done = true;
                if record.error.is_none() {
                    record.error = Some(message.to_string());
                }
                release_pending(record)
            })
            .ok_or_else(|| BrokerError::not_found(session_id))?;

        info!("Session {} failed: {}", session_id, message);
        if let Some(mailbox) = released {
            mailbox.deposit(Delivery::Released);
        }
        Ok(())
    }

    /// Summary of a session; unknown ids report `exists: false`.
    pub fn status(&self, session_id: &str) -> SessionStatus {
        self.store
            .with_record(session_id, |record| SessionStatus {
                exists: true,
                done: record.done,
                error: record.error.clone(),
                has_question: record.pending_question.is_some(),
                transcript_len: record.transcript.len(),
            })
            .unwrap_or_default()
    }

    pub fn transcript(&self, session_id: &str) -> Result<Vec<TranscriptEntry>> {
        self.store
            .with_record(session_id, |record| record.transcript.clone())
            .ok_or_else(|| BrokerError::not_found(session_id))
    }

    pub fn report(&self, session_id: &str) -> Result<InterviewReport> {
        self.store
            .with_record(session_id, |record| InterviewReport {
                done: record.done,
                error: record.error.clone(),
                transcript: record.transcript.clone(),
            })
            .ok_or_else(|| BrokerError::not_found(session_id))
    }

    // Record the question and hand back the mailbox to wait on, or `None` when the
    // session is already finished.
    fn publish_question(&self, session_id: &str, question: &str) -> Result<Option<Mailbox>> {
        self.store
            .with_record(session_id, |record| match record.state() {
                SessionState::Done | SessionState::Error => {
                    debug!("Session {} is finished, not asking {:?}", session_id, question);
                    Ok(None)
                }
                SessionState::QuestionPending => Err(BrokerError::invalid_transition(
                    session_id,
                    SessionState::QuestionPending,
                )),
                SessionState::AwaitingQuestion => {
                    record.pending_question = Some(question.to_string());
                    info!("Session {} asks: {:?}", session_id, question);
                    Ok(Some(record.mailbox.clone()))
                }
            })
            .unwrap_or_else(|| Err(BrokerError::not_found(session_id)))
    }

    fn receive(&self, session_id: &str, delivery: Delivery) -> String {
        if delivery == Delivery::Released {
            debug!("Session {} released its waiting question", session_id);
        }
        delivery.into_text()
    }
}

fn release_pending(record: &mut SessionRecord) -> Option<Mailbox> {
    record
        .pending_question
        .take()
        .map(|_| record.mailbox.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tracing_test::traced_test;

    fn wait_for_question(broker: &InterviewBroker, session_id: &str) -> String {
        for _ in 0..500 {
            if let Some(question) = broker.get_question(session_id).unwrap() {
                return question;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("no question was published");
    }

    #[test]
    fn test_ask_answer_round_trip() {
        let broker = Arc::new(InterviewBroker::new());
        let id = broker.create_session();

        let worker = {
            let broker = Arc::clone(&broker);
            let id = id.clone();
            thread::spawn(move || broker.ask(&id, "Experience with X?").unwrap())
        };

        assert_eq!(wait_for_question(&broker, &id), "Experience with X?");
        assert_eq!(
            broker.poll(&id).unwrap(),
            QuestionPoll::Question {
                question: "Experience with X?".to_string()
            }
        );
        assert_eq!(broker.answer(&id, "5 years").unwrap(), AnswerOutcome::Delivered);
        assert_eq!(worker.join().unwrap(), "5 years");

        assert_eq!(
            broker.transcript(&id).unwrap(),
            vec![TranscriptEntry {
                question: "Experience with X?".to_string(),
                answer: "5 years".to_string(),
            }]
        );
        assert_eq!(broker.get_question(&id).unwrap(), None);
        assert_eq!(broker.poll(&id).unwrap(), QuestionPoll::Waiting);
    }

    #[test]
    fn test_answer_without_question_is_ignored() {
        let broker = InterviewBroker::new();
        let id = broker.create_session();

        assert_eq!(broker.answer(&id, "early").unwrap(), AnswerOutcome::Ignored);
        assert!(broker.transcript(&id).unwrap().is_empty());
        assert!(broker.store().get(&id).unwrap().pending_question.is_none());
    }

    #[test]
    #[traced_test]
    fn test_ignored_answer_is_logged() {
        let broker = InterviewBroker::new();
        let id = broker.create_session();

        broker.answer(&id, "early").unwrap();
        assert!(logs_contain("no pending question"));
    }

    #[test]
    fn test_mark_done_releases_waiting_ask() {
        let broker = Arc::new(InterviewBroker::new());
        let id = broker.create_session();

        let worker = {
            let broker = Arc::clone(&broker);
            let id = id.clone();
            thread::spawn(move || broker.ask(&id, "Still there?").unwrap())
        };
        wait_for_question(&broker, &id);

        broker.mark_done(&id).unwrap();
        assert_eq!(worker.join().unwrap(), "");

        let status = broker.status(&id);
        assert!(status.done);
        assert!(!status.has_question);
        assert_eq!(status.transcript_len, 0);
        assert_eq!(broker.poll(&id).unwrap(), QuestionPoll::Done);
    }

    #[test]
    fn test_ask_on_finished_session_returns_immediately() {
        let broker = InterviewBroker::new();
        let id = broker.create_session();
        broker.mark_done(&id).unwrap();

        assert_eq!(broker.ask(&id, "Another one?").unwrap(), "");
        assert_eq!(broker.get_question(&id).unwrap(), None);
    }

    #[test]
    fn test_second_ask_while_pending_is_rejected() {
        let broker = Arc::new(InterviewBroker::new());
        let id = broker.create_session();

        let worker = {
            let broker = Arc::clone(&broker);
            let id = id.clone();
            thread::spawn(move || broker.ask(&id, "First?").unwrap())
        };
        wait_for_question(&broker, &id);

        let err = broker.ask(&id, "Second?").unwrap_err();
        assert!(matches!(
            err,
            BrokerError::InvalidTransition {
                state: SessionState::QuestionPending,
                ..
            }
        ));
        assert_eq!(broker.get_question(&id).unwrap().as_deref(), Some("First?"));

        broker.answer(&id, "done").unwrap();
        assert_eq!(worker.join().unwrap(), "done");
    }

    #[test]
    fn test_mark_error_keeps_first_message() {
        let broker = InterviewBroker::new();
        let id = broker.create_session();

        broker.mark_done(&id).unwrap();
        broker.mark_error(&id, "model unavailable").unwrap();
        broker.mark_error(&id, "second failure").unwrap();

        let report = broker.report(&id).unwrap();
        assert!(report.done);
        assert_eq!(report.error.as_deref(), Some("model unavailable"));
        assert_eq!(
            broker.poll(&id).unwrap(),
            QuestionPoll::Error {
                message: "model unavailable".to_string()
            }
        );
    }

    #[test]
    fn test_ask_with_timeout_marks_error() {
        let broker = InterviewBroker::new();
        let id = broker.create_session();

        let answer = broker
            .ask_with_timeout(&id, "Anyone?", Duration::from_millis(30))
            .unwrap();
        assert_eq!(answer, "");

        let status = broker.status(&id);
        assert!(status.done);
        assert_eq!(status.error.as_deref(), Some(TIMEOUT_MESSAGE));
        assert!(!status.has_question);

        // A late answer finds nothing to attach to
        assert_eq!(broker.answer(&id, "sorry").unwrap(), AnswerOutcome::Ignored);
    }

    #[test]
    fn test_ask_with_timeout_returns_prompt_answer() {
        let broker = Arc::new(InterviewBroker::new());
        let id = broker.create_session();

        let worker = {
            let broker = Arc::clone(&broker);
            let id = id.clone();
            thread::spawn(move || {
                broker
                    .ask_with_timeout(&id, "Quick one?", Duration::from_secs(10))
                    .unwrap()
            })
        };
        wait_for_question(&broker, &id);
        broker.answer(&id, "yes").unwrap();

        assert_eq!(worker.join().unwrap(), "yes");
        assert!(broker.status(&id).error.is_none());
    }

    #[test]
    fn test_unknown_session() {
        let broker = InterviewBroker::new();

        assert_eq!(broker.status("nope"), SessionStatus::default());
        assert!(!broker.status("nope").exists);
        assert!(matches!(broker.ask("nope", "q"), Err(BrokerError::NotFound { .. })));
        assert!(matches!(broker.answer("nope", "a"), Err(BrokerError::NotFound { .. })));
        assert!(matches!(broker.get_question("nope"), Err(BrokerError::NotFound { .. })));
        assert!(matches!(broker.mark_done("nope"), Err(BrokerError::NotFound { .. })));
        assert!(matches!(
            broker.mark_error("nope", "x"),
            Err(BrokerError::NotFound { .. })
        ));
        assert!(matches!(broker.report("nope"), Err(BrokerError::NotFound { .. })));
    }
}
