//! recrutime-broker: Human-in-the-loop interview sessions over a polling API
//!
//! An interview job runs on its own thread and asks one question at a time,
//! blocking until the answer arrives. The candidate's client cannot hold a
//! connection open across that wait; it polls for the current question and posts
//! answers. The [`broker::InterviewBroker`] bridges the two sides with a
//! per-session state machine and a single-slot rendezvous.
//!
//! ## Key Modules
//!
//! - **[`broker`]**: Session state machine (`ask`, `answer`, `mark_done`, `mark_error`, ...)
//! - **[`session`]**: Session records and the coarse-locked store holding them
//! - **[`rendezvous`]**: One-element mailbox that wakes a blocked `ask`
//! - **[`worker`]**: Runs interview jobs on named threads and records their outcome
//! - **[`candidate`]**: Channels for putting questions to the candidate
//! - **[`interviewer`]**: Interview plans and the scripted interviewer job
//! - **[`handoff`]**: File-backed question/answer store
//! - **[`job_config`]**: Admin-edited job offer, persisted as JSON
//! - **[`server`]**: axum routes for interviews, search, knowledge and job administration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recrutime_broker::broker::InterviewBroker;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let broker = Arc::new(InterviewBroker::new());
//! let session_id = broker.create_session();
//!
//! let worker = {
//!     let broker = Arc::clone(&broker);
//!     let session_id = session_id.clone();
//!     thread::spawn(move || broker.ask(&session_id, "Experience with Rust?"))
//! };
//!
//! // Later, on behalf of the polling client:
//! if broker.get_question(&session_id)?.is_some() {
//!     broker.answer(&session_id, "5 years")?;
//! }
//! # let _ = worker.join();
//! # Ok::<(), recrutime_broker::error::BrokerError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! client ──poll/answer──→ server ──→ InterviewBroker ←──ask── worker thread
//!                            │              │                    │
//!                            ↓         SessionStore         ScriptedInterviewer
//!                      SearchEngine ←───────────── search ───────┘
//! ```

pub mod broker;
pub mod candidate;
pub mod config;
pub mod error;
pub mod handoff;
pub mod interviewer;
pub mod job_config;
mod persist;
pub mod rendezvous;
pub mod server;
pub mod session;
pub mod worker;

pub use broker::{AnswerOutcome, InterviewBroker, InterviewReport, QuestionPoll, SessionStatus};
pub use config::ServerConfig;
pub use error::{BrokerError, Result, StoreError};
pub use server::{AppState, router, run_server};
pub use session::{SessionState, SessionStore, TranscriptEntry};
