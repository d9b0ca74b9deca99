//! Scripted interviewer standing in for the agent-orchestration runtime.
//!
//! The interviewer walks an [`InterviewPlan`], looks up knowledge context for each
//! question and puts the question to the candidate through a [`CandidateChannel`].

use anyhow::Context;
use recrutime_retriever::SearchEngine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::candidate::CandidateChannel;
use crate::job_config::JobConfig;
use crate::session::TranscriptEntry;

/// Number of knowledge chunks consulted per question.
pub const CONTEXT_RESULTS: usize = 3;

/// Company named in interviews when neither the job config nor the plan sets one.
pub const DEFAULT_COMPANY_NAME: &str = "Your Company";

/// Candidate profile the offer is looking for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferProfile {
    pub experience_level: Option<String>,
    pub tech_skills: Vec<String>,
    pub education: Option<String>,
    pub soft_skills: Vec<String>,
}

/// Role, offer and questions of one interview
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewPlan {
    pub role_title: String,
    #[serde(default)]
    pub candidate_name: Option<String>,
    /// Fallback company name; the admin job config takes precedence
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default = "default_questions")]
    pub questions: Vec<String>,
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub offer: OfferProfile,
}

impl Default for InterviewPlan {
    fn default() -> Self {
        Self {
            role_title: "Software Engineer".to_string(),
            candidate_name: None,
            company_name: None,
            questions: default_questions(),
            job: JobConfig::default(),
            offer: OfferProfile::default(),
        }
    }
}

fn default_questions() -> Vec<String> {
    [
        "Can you introduce yourself and your recent experience?",
        "Which project are you most proud of, and what was your role in it?",
        "How do you approach testing and code review?",
        "Describe a production incident you helped resolve.",
        "Why are you interested in this role?",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl InterviewPlan {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("Invalid interview plan")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read interview plan {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// This plan adjusted for one interview request. Empty overrides are ignored.
    pub fn for_request(
        &self,
        role_title: &str,
        candidate_name: Option<String>,
        questions: Option<Vec<String>>,
    ) -> Self {
        let role_title = role_title.trim();
        Self {
            role_title: if role_title.is_empty() {
                self.role_title.clone()
            } else {
                role_title.to_string()
            },
            candidate_name: candidate_name
                .filter(|name| !name.trim().is_empty())
                .or_else(|| self.candidate_name.clone()),
            questions: questions
                .filter(|questions| !questions.is_empty())
                .unwrap_or_else(|| self.questions.clone()),
            ..self.clone()
        }
    }

    pub fn with_job(mut self, job: JobConfig) -> Self {
        self.job = job;
        self
    }

    pub fn with_offer(mut self, offer: OfferProfile) -> Self {
        self.offer = offer;
        self
    }

    /// Company the interview is run for.
    pub fn company(&self) -> &str {
        [Some(self.job.company_name.as_str()), self.company_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
            .unwrap_or(DEFAULT_COMPANY_NAME)
    }

    /// Retrieval query for `question`: the role and offer terms followed by the
    /// question itself. Blank fields are left out.
    pub fn context_query(&self, question: &str) -> String {
        let offer = &self.offer;
        let mut parts: Vec<&str> = vec![
            self.role_title.as_str(),
            self.job.department.as_str(),
            self.job.experience.as_str(),
            self.job.requirements.as_str(),
        ];
        parts.extend(offer.experience_level.as_deref());
        parts.extend(offer.tech_skills.iter().map(String::as_str));
        parts.extend(offer.education.as_deref());
        parts.extend(offer.soft_skills.iter().map(String::as_str));
        parts.push(question);

        parts
            .into_iter()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct ScriptedInterviewer {
    plan: InterviewPlan,
    engine: Option<Arc<SearchEngine>>,
}

impl ScriptedInterviewer {
    pub fn new(plan: InterviewPlan) -> Self {
        Self { plan, engine: None }
    }

    /// Consult `engine` for knowledge context before each question.
    pub fn with_search_engine(mut self, engine: Arc<SearchEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn plan(&self) -> &InterviewPlan {
        &self.plan
    }

    /// Ask every question of the plan in order, stopping early once the channel
    /// is closed. Returns the answered questions.
    pub fn run(&self, channel: &dyn CandidateChannel) -> anyhow::Result<Vec<TranscriptEntry>> {
        info!(
            "Interviewing {} for {} at {} ({} questions)",
            self.plan.candidate_name.as_deref().unwrap_or("candidate"),
            self.plan.role_title,
            self.plan.company(),
            self.plan.questions.len()
        );

        let mut transcript = Vec::with_capacity(self.plan.questions.len());
        for question in &self.plan.questions {
            if channel.is_closed() {
                info!("Channel closed after {} answers", transcript.len());
                break;
            }

            self.log_context(question);
            let answer = channel.ask(question)?;
            if channel.is_closed() && answer.is_empty() {
                break;
            }

            transcript.push(TranscriptEntry {
                question: question.clone(),
                answer,
            });
        }

        Ok(transcript)
    }

    fn log_context(&self, question: &str) {
        let Some(engine) = &self.engine else {
            return;
        };

        let query = self.plan.context_query(question);
        for hit in engine.search(&query, CONTEXT_RESULTS) {
            debug!("Context for {:?}: {} ({:.4})", question, hit.chunk_id, hit.score);
        }
    }
}
