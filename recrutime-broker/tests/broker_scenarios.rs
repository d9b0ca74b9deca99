//! End-to-end scenarios for the interview broker
//!
//! A real worker thread blocks in `ask` while the test plays the polling client.

use recrutime_broker::broker::{AnswerOutcome, InterviewBroker, QuestionPoll, TIMEOUT_MESSAGE};
use recrutime_broker::candidate::{
    BrokerChannel, CandidateChannel, HandoffChannel, ScriptedChannel,
};
use recrutime_broker::handoff::HandoffStore;
use recrutime_broker::interviewer::{InterviewPlan, ScriptedInterviewer};
use recrutime_broker::session::TranscriptEntry;
use recrutime_broker::worker::spawn_interview;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn wait_for_question(broker: &InterviewBroker, session_id: &str) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Some(question) = broker.get_question(session_id).unwrap() {
            return question;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("no question published for {session_id}");
}

fn wait_until_done(broker: &InterviewBroker, session_id: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if broker.status(session_id).done {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!("session {session_id} never finished");
}

#[test]
fn test_experience_question_scenario() {
    let broker = Arc::new(InterviewBroker::new());
    let session_id = broker.create_session();

    let worker = {
        let broker = Arc::clone(&broker);
        let session_id = session_id.clone();
        thread::spawn(move || broker.ask(&session_id, "Experience with X?"))
    };

    assert_eq!(wait_for_question(&broker, &session_id), "Experience with X?");
    assert!(!worker.is_finished());

    broker.answer(&session_id, "5 years").unwrap();
    assert_eq!(worker.join().unwrap().unwrap(), "5 years");

    let transcript = broker.transcript(&session_id).unwrap();
    assert_eq!(
        serde_json::to_value(&transcript).unwrap(),
        serde_json::json!([{ "question": "Experience with X?", "answer": "5 years" }])
    );
}

#[test]
fn test_mark_error_unblocks_waiting_ask() {
    let broker = Arc::new(InterviewBroker::new());
    let session_id = broker.create_session();

    let worker = {
        let broker = Arc::clone(&broker);
        let session_id = session_id.clone();
        thread::spawn(move || broker.ask(&session_id, "Are you there?"))
    };
    wait_for_question(&broker, &session_id);

    let started = Instant::now();
    broker.mark_error(&session_id, TIMEOUT_MESSAGE).unwrap();
    assert_eq!(worker.join().unwrap().unwrap(), "");
    assert!(started.elapsed() < Duration::from_secs(2));

    let status = broker.status(&session_id);
    assert!(status.done);
    assert_eq!(status.error.as_deref(), Some("timeout"));
    assert_eq!(
        broker.poll(&session_id).unwrap(),
        QuestionPoll::Error {
            message: "timeout".to_string()
        }
    );
}

#[test]
fn test_concurrent_double_answer() {
    for _ in 0..20 {
        let broker = Arc::new(InterviewBroker::new());
        let session_id = broker.create_session();
        // Holds the worker back from the second question until both answers landed
        let gate = Arc::new(Barrier::new(2));

        let worker = {
            let broker = Arc::clone(&broker);
            let session_id = session_id.clone();
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let first = broker.ask(&session_id, "First?").unwrap();
                gate.wait();
                let second = broker.ask(&session_id, "Second?").unwrap();
                (first, second)
            })
        };
        wait_for_question(&broker, &session_id);

        let start = Arc::new(Barrier::new(2));
        let answerers: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|answer| {
                let broker = Arc::clone(&broker);
                let session_id = session_id.clone();
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    broker.answer(&session_id, answer).unwrap()
                })
            })
            .collect();
        let outcomes: Vec<AnswerOutcome> =
            answerers.into_iter().map(|h| h.join().unwrap()).collect();

        let delivered = outcomes
            .iter()
            .filter(|o| **o == AnswerOutcome::Delivered)
            .count();
        assert_eq!(delivered, 1);
        assert_eq!(broker.transcript(&session_id).unwrap().len(), 1);

        gate.wait();
        // The duplicate never leaked into the next question
        assert_eq!(wait_for_question(&broker, &session_id), "Second?");
        broker.answer(&session_id, "c").unwrap();

        let (first, second) = worker.join().unwrap();
        assert!(first == "a" || first == "b");
        assert_eq!(second, "c");
        assert_eq!(broker.transcript(&session_id).unwrap().len(), 2);
    }
}

#[test]
fn test_transcript_matches_completed_answers() {
    let broker = Arc::new(InterviewBroker::new());
    let session_id = broker.create_session();
    let questions: Vec<String> = (1..=5).map(|n| format!("Question {n}?")).collect();
    let gate = Arc::new(Barrier::new(2));

    let worker = {
        let broker = Arc::clone(&broker);
        let session_id = session_id.clone();
        let questions = questions.clone();
        let gate = Arc::clone(&gate);
        thread::spawn(move || {
            for question in &questions {
                gate.wait();
                broker.ask(&session_id, question).unwrap();
            }
        })
    };

    let mut completed = 0;
    for (n, question) in questions.iter().enumerate() {
        // Stray answers between questions are dropped
        assert_eq!(
            broker.answer(&session_id, "stray").unwrap(),
            AnswerOutcome::Ignored
        );
        assert_eq!(broker.transcript(&session_id).unwrap().len(), completed);

        gate.wait();
        assert_eq!(&wait_for_question(&broker, &session_id), question);
        assert_eq!(
            broker.answer(&session_id, &format!("answer {n}")).unwrap(),
            AnswerOutcome::Delivered
        );
        completed += 1;
        assert_eq!(broker.transcript(&session_id).unwrap().len(), completed);
    }
    worker.join().unwrap();

    let transcript = broker.transcript(&session_id).unwrap();
    assert_eq!(transcript.len(), questions.len());
    for (n, entry) in transcript.iter().enumerate() {
        assert_eq!(entry.question, questions[n]);
        assert_eq!(entry.answer, format!("answer {n}"));
    }
}

#[test]
fn test_worker_panic_becomes_error() {
    let broker = Arc::new(InterviewBroker::new());
    let session_id = broker.create_session();

    let handle = spawn_interview(Arc::clone(&broker), session_id.clone(), |_| {
        panic!("tool crashed")
    })
    .unwrap();
    handle.join().unwrap();

    let report = broker.report(&session_id).unwrap();
    assert!(report.done);
    assert_eq!(report.error.as_deref(), Some("worker panicked: tool crashed"));
}

#[test]
fn test_scripted_interview_through_broker() {
    let broker = Arc::new(InterviewBroker::new());
    let session_id = broker.create_session();
    let plan = InterviewPlan {
        role_title: "Backend Engineer".to_string(),
        candidate_name: Some("Alex".to_string()),
        questions: vec!["Experience with X?".to_string(), "Why us?".to_string()],
        ..InterviewPlan::default()
    };

    let job_broker = Arc::clone(&broker);
    spawn_interview(Arc::clone(&broker), session_id.clone(), move |session_id| {
        let channel = BrokerChannel::new(job_broker, session_id.to_string());
        ScriptedInterviewer::new(plan).run(&channel).map(|_| ())
    })
    .unwrap();

    // The client answers with a simulated candidate
    let candidate = ScriptedChannel::new([("Experience with X?", "5 years")]).with_fallback("Growth");
    for _ in 0..2 {
        let question = wait_for_question(&broker, &session_id);
        let answer = candidate.ask(&question).unwrap();
        broker.answer(&session_id, &answer).unwrap();
    }
    wait_until_done(&broker, &session_id);

    let report = broker.report(&session_id).unwrap();
    assert!(report.error.is_none());
    assert_eq!(
        report.transcript,
        vec![
            TranscriptEntry {
                question: "Experience with X?".to_string(),
                answer: "5 years".to_string(),
            },
            TranscriptEntry {
                question: "Why us?".to_string(),
                answer: "Growth".to_string(),
            },
        ]
    );
}

#[test]
fn test_ask_with_timeout_fails_session() {
    let broker = Arc::new(InterviewBroker::new());
    let session_id = broker.create_session();

    let job_broker = Arc::clone(&broker);
    spawn_interview(Arc::clone(&broker), session_id.clone(), move |session_id| {
        let channel = BrokerChannel::new(job_broker, session_id.to_string())
            .with_timeout(Some(Duration::from_millis(50)));
        ScriptedInterviewer::new(InterviewPlan::default()).run(&channel).map(|_| ())
    })
    .unwrap()
    .join()
    .unwrap();

    let status = broker.status(&session_id);
    assert!(status.done);
    assert_eq!(status.error.as_deref(), Some(TIMEOUT_MESSAGE));
    assert_eq!(status.transcript_len, 0);
}

#[test]
fn test_handoff_store_concurrent_writers() {
    let temp_dir = tempdir().unwrap();
    let store = Arc::new(HandoffStore::open(temp_dir.path().join("web_interview.json")).unwrap());

    let writers: Vec<_> = (0..8)
        .map(|n| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for m in 0..5 {
                    store.push_question(&format!("Question {n}-{m}")).unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let raw = std::fs::read_to_string(store.path()).unwrap();
    let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(document["items"].as_array().unwrap().len(), 40);
    assert_eq!(store.pending().unwrap().len(), 40);
}

#[test]
fn test_scripted_interview_through_handoff_file() {
    let temp_dir = tempdir().unwrap();
    let store = Arc::new(HandoffStore::open(temp_dir.path().join("web_interview.json")).unwrap());
    let plan = InterviewPlan {
        questions: vec!["Experience with X?".to_string(), "Why us?".to_string()],
        ..InterviewPlan::default()
    };

    let interview = {
        let channel = HandoffChannel::new(Arc::clone(&store))
            .with_poll_interval(Duration::from_millis(5))
            .with_timeout(Some(Duration::from_secs(5)));
        thread::spawn(move || ScriptedInterviewer::new(plan).run(&channel))
    };

    // A separate UI answers each item as it shows up in the file
    let mut answered = 0;
    let deadline = Instant::now() + Duration::from_secs(5);
    while answered < 2 && Instant::now() < deadline {
        if let Some(item) = store.pending().unwrap().into_iter().next() {
            let answer = format!("answer {answered}");
            assert!(store.answer(&item.id, &answer).unwrap());
            answered += 1;
        }
        thread::sleep(Duration::from_millis(5));
    }

    let transcript = interview.join().unwrap().unwrap();
    assert_eq!(
        transcript,
        vec![
            TranscriptEntry {
                question: "Experience with X?".to_string(),
                answer: "answer 0".to_string(),
            },
            TranscriptEntry {
                question: "Why us?".to_string(),
                answer: "answer 1".to_string(),
            },
        ]
    );
    assert!(store.pending().unwrap().is_empty());
}
