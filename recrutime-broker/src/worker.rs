//! Runs interview jobs on dedicated threads and turns their outcome into session state.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

use crate::broker::InterviewBroker;

/// Start `job` on a named thread for `session_id`.
///
/// The job receives the session id explicitly. When it returns `Ok` the session is
/// marked done; an error or a panic marks the session as failed.
pub fn spawn_interview<F>(
    broker: Arc<InterviewBroker>,
    session_id: String,
    job: F,
) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce(&str) -> anyhow::Result<()> + Send + 'static,
{
    let short_id: String = session_id.chars().take(8).collect();
    thread::Builder::new()
        .name(format!("interview-{short_id}"))
        .spawn(move || run_interview(&broker, &session_id, job))
}

/// Run `job` on the current thread and record its outcome on the session.
pub fn run_interview<F>(broker: &InterviewBroker, session_id: &str, job: F)
where
    F: FnOnce(&str) -> anyhow::Result<()>,
{
    info!("Interview worker started for session {}", session_id);

    let recorded = match panic::catch_unwind(AssertUnwindSafe(|| job(session_id))) {
        Ok(Ok(())) => broker.mark_done(session_id),
        Ok(Err(e)) => {
            error!("Interview for session {} failed: {:#}", session_id, e);
            broker.mark_error(session_id, &e.to_string())
        }
        Err(payload) => {
            let message = format!("worker panicked: {}", panic_message(payload.as_ref()));
            error!("Interview for session {}: {}", session_id, message);
            broker.mark_error(session_id, &message)
        }
    };

    if let Err(e) = recorded {
        warn!("Could not record interview outcome: {}", e);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_marks_done() {
        let broker = Arc::new(InterviewBroker::new());
        let id = broker.create_session();

        spawn_interview(Arc::clone(&broker), id.clone(), |_| Ok(()))
            .unwrap()
            .join()
            .unwrap();

        let status = broker.status(&id);
        assert!(status.done);
        assert!(status.error.is_none());
    }

    #[test]
    fn test_error_marks_error() {
        let broker = Arc::new(InterviewBroker::new());
        let id = broker.create_session();

        spawn_interview(Arc::clone(&broker), id.clone(), |_| {
            Err(anyhow::anyhow!("orchestrator unavailable"))
        })
        .unwrap()
        .join()
        .unwrap();

        assert_eq!(
            broker.status(&id).error.as_deref(),
            Some("orchestrator unavailable")
        );
    }

    #[test]
    fn test_panic_marks_error() {
        let broker = Arc::new(InterviewBroker::new());
        let id = broker.create_session();

        // The worker thread itself must not die from the panic
        let handle = spawn_interview(Arc::clone(&broker), id.clone(), |_| {
            panic!("index out of bounds")
        })
        .unwrap();
        assert!(handle.join().is_ok());

        let status = broker.status(&id);
        assert!(status.done);
        assert_eq!(
            status.error.as_deref(),
            Some("worker panicked: index out of bounds")
        );
    }

    #[test]
    fn test_job_receives_session_id() {
        let broker = InterviewBroker::new();
        let id = broker.create_session();
        let expected = id.clone();

        run_interview(&broker, &id, move |session_id| {
            anyhow::ensure!(session_id == expected, "wrong session id");
            Ok(())
        });

        assert!(broker.status(&id).error.is_none());
    }
}
