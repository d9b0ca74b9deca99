//! Ways for an interview job to put a question to the candidate.
//!
//! The job only sees [`CandidateChannel`]; whether the answer comes from the web
//! client through the broker, from a terminal, from the handoff file, or from a
//! script is decided when the job is started.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::broker::InterviewBroker;
use crate::handoff::HandoffStore;

/// Answer returned by [`TerminalChannel`] for an empty line.
pub const NO_ANSWER: &str = "(no answer provided)";

/// Answer returned by [`TerminalChannel`] when stdin cannot be read.
pub const NO_INPUT: &str = "(error: no interactive input available)";

/// Answer returned by [`ScriptedChannel`] for questions it has no script for.
pub const SIMULATED_ANSWER: &str = "Simulated answer: I would first clarify the need, then explain \
     the key principles and give a concrete example from my experience.";

pub trait CandidateChannel: Send + Sync {
    /// Put one question to the candidate and return the answer.
    fn ask(&self, question: &str) -> anyhow::Result<String>;

    /// Whether the conversation has ended and further questions are pointless.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Asks through the broker on behalf of one session (web mode)
#[derive(Debug, Clone)]
pub struct BrokerChannel {
    broker: Arc<InterviewBroker>,
    session_id: String,
    timeout: Option<Duration>,
}

impl BrokerChannel {
    pub fn new(broker: Arc<InterviewBroker>, session_id: String) -> Self {
        Self {
            broker,
            session_id,
            timeout: None,
        }
    }

    /// Give up on a question after `timeout`, failing the session.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl CandidateChannel for BrokerChannel {
    fn ask(&self, question: &str) -> anyhow::Result<String> {
        let answer = match self.timeout {
            Some(timeout) => self
                .broker
                .ask_with_timeout(&self.session_id, question, timeout)?,
            None => self.broker.ask(&self.session_id, question)?,
        };
        debug!(
            "Session {} got an answer of {} chars",
            self.session_id,
            answer.chars().count()
        );
        Ok(answer)
    }

    fn is_closed(&self) -> bool {
        self.broker.status(&self.session_id).done
    }
}

/// Prints the question and reads one line of input
#[derive(Debug)]
pub struct TerminalChannel<R, W> {
    io: Mutex<(R, W)>,
}

impl TerminalChannel<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalChannel<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }

    /// Give back the reader and writer.
    pub fn into_inner(self) -> (R, W) {
        self.io.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R, W> CandidateChannel for TerminalChannel<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn ask(&self, question: &str) -> anyhow::Result<String> {
        let mut io = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        let (input, output) = &mut *io;

        writeln!(output, "\n[INTERVIEW QUESTION] {question}")?;
        writeln!(output, "[Please type your answer and press Enter]")?;
        output.flush()?;

        let mut line = String::new();
        let answer = match input.read_line(&mut line) {
            Ok(0) => NO_INPUT.to_string(),
            Ok(_) if line.trim().is_empty() => NO_ANSWER.to_string(),
            Ok(_) => line.trim().to_string(),
            Err(e) => {
                warn!("Failed to read an answer from the terminal: {}", e);
                NO_INPUT.to_string()
            }
        };
        Ok(answer)
    }
}

/// Simulated candidate answering from a script
#[derive(Debug, Clone, Default)]
pub struct ScriptedChannel {
    answers: HashMap<String, String>,
    fallback: Option<String>,
}

impl ScriptedChannel {
    pub fn new<I, Q, A>(answers: I) -> Self
    where
        I: IntoIterator<Item = (Q, A)>,
        Q: Into<String>,
        A: Into<String>,
    {
        Self {
            answers: answers
                .into_iter()
                .map(|(q, a)| (q.into(), a.into()))
                .collect(),
            fallback: None,
        }
    }

    /// Replace the generic answer for unscripted questions.
    pub fn with_fallback<S: Into<String>>(mut self, fallback: S) -> Self {
        self.fallback = Some(fallback.into());
        self
    }
}

impl CandidateChannel for ScriptedChannel {
    fn ask(&self, question: &str) -> anyhow::Result<String> {
        let answer = self
            .answers
            .get(question)
            .filter(|answer| !answer.is_empty())
            .or(self.fallback.as_ref())
            .map(String::as_str)
            .unwrap_or(SIMULATED_ANSWER);
        Ok(answer.to_string())
    }
}

/// Writes the question to the handoff file and polls it for the answer
#[derive(Debug, Clone)]
pub struct HandoffChannel {
    store: Arc<HandoffStore>,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl HandoffChannel {
    pub fn new(store: Arc<HandoffStore>) -> Self {
        Self {
            store,
            poll_interval: Duration::from_millis(500),
            timeout: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl CandidateChannel for HandoffChannel {
    fn ask(&self, question: &str) -> anyhow::Result<String> {
        let id = self.store.push_question(question)?;
        let started = Instant::now();

        loop {
            if let Some(answer) = self.store.get(&id)?.and_then(|item| item.answer) {
                return Ok(answer);
            }
            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    anyhow::bail!("no answer to handoff question {id} within {timeout:?}");
                }
            }
            thread::sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn test_terminal_channel_reads_one_line() {
        let channel = TerminalChannel::new(Cursor::new("  Rust and Go  \n\nmore\n"), Vec::new());

        assert_eq!(channel.ask("Languages?").unwrap(), "Rust and Go");
        assert_eq!(channel.ask("Anything else?").unwrap(), NO_ANSWER);
        assert_eq!(channel.ask("Last one?").unwrap(), "more");
        assert_eq!(channel.ask("Still there?").unwrap(), NO_INPUT);

        let (_, output) = channel.into_inner();
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("[INTERVIEW QUESTION] Languages?"));
        assert_eq!(printed.matches("[INTERVIEW QUESTION]").count(), 4);
    }

    #[test]
    fn test_scripted_channel() {
        let channel = ScriptedChannel::new([("Experience with X?", "5 years"), ("Blank?", "")]);

        assert_eq!(channel.ask("Experience with X?").unwrap(), "5 years");
        assert_eq!(channel.ask("Unknown?").unwrap(), SIMULATED_ANSWER);
        assert_eq!(channel.ask("Blank?").unwrap(), SIMULATED_ANSWER);
        assert!(!channel.is_closed());

        let custom = ScriptedChannel::default().with_fallback("No comment");
        assert_eq!(custom.ask("Anything?").unwrap(), "No comment");
    }

    #[test]
    fn test_broker_channel_on_finished_session() {
        let broker = Arc::new(InterviewBroker::new());
        let id = broker.create_session();
        let channel = BrokerChannel::new(Arc::clone(&broker), id.clone());
        assert!(!channel.is_closed());

        broker.mark_done(&id).unwrap();
        assert!(channel.is_closed());
        assert_eq!(channel.ask("Too late?").unwrap(), "");
    }

    #[test]
    fn test_handoff_channel_waits_for_answer() {
        let temp_dir = tempdir().unwrap();
        let store = Arc::new(HandoffStore::open(temp_dir.path().join("store.json")).unwrap());
        let channel =
            HandoffChannel::new(Arc::clone(&store)).with_poll_interval(Duration::from_millis(10));

        let asker = thread::spawn(move || channel.ask("Notice period?").unwrap());

        let id = loop {
            if let Some(item) = store.pending().unwrap().into_iter().next() {
                break item.id;
            }
            thread::sleep(Duration::from_millis(5));
        };
        assert!(store.answer(&id, "One month").unwrap());

        assert_eq!(asker.join().unwrap(), "One month");
    }

    #[test]
    fn test_handoff_channel_timeout() {
        let temp_dir = tempdir().unwrap();
        let store = Arc::new(HandoffStore::open(temp_dir.path().join("store.json")).unwrap());
        let channel = HandoffChannel::new(store)
            .with_poll_interval(Duration::from_millis(5))
            .with_timeout(Some(Duration::from_millis(30)));

        let err = channel.ask("Anyone?").unwrap_err();
        assert!(err.to_string().contains("no answer to handoff question"));
    }
}
