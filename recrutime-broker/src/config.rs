use recrutime_retriever::IndexConfig;
use recrutime_retriever::retrieval::chunking_strategy::ChunkingConfig;
use std::path::PathBuf;
use std::time::Duration;

use crate::interviewer::InterviewPlan;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:4200";
pub const DEFAULT_KNOWLEDGE_DIR: &str = "knowledge";

/// Configuration for the interview server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Root directory of the knowledge documents
    pub knowledge_dir: PathBuf,
    /// Origin allowed to call the API from a browser
    pub frontend_origin: String,
    /// Plan used when a start request does not override it
    pub plan: InterviewPlan,
    /// JSON file backing `/api/items`, if any
    pub handoff_path: Option<PathBuf>,
    /// JSON file persisting the admin job config; kept in memory only when unset
    pub job_config_path: Option<PathBuf>,
    pub chunk_size: usize,
    pub overlap: usize,
    /// Fail a session whose question stays unanswered this long
    pub answer_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Create a server configuration serving the knowledge in `knowledge_dir`.
    pub fn new(knowledge_dir: PathBuf) -> Self {
        Self {
            knowledge_dir,
            ..Self::default()
        }
    }

    pub fn with_plan(mut self, plan: InterviewPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_handoff_path(mut self, handoff_path: Option<PathBuf>) -> Self {
        self.handoff_path = handoff_path;
        self
    }

    pub fn with_job_config_path(mut self, job_config_path: Option<PathBuf>) -> Self {
        self.job_config_path = job_config_path;
        self
    }

    pub fn with_answer_timeout(mut self, answer_timeout: Option<Duration>) -> Self {
        self.answer_timeout = answer_timeout;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn index_config(&self) -> IndexConfig {
        IndexConfig::new(self.knowledge_dir.clone())
            .with_chunk_size(self.chunk_size)
            .with_overlap(self.overlap)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let chunking = ChunkingConfig::default();
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            knowledge_dir: PathBuf::from(DEFAULT_KNOWLEDGE_DIR),
            frontend_origin: DEFAULT_FRONTEND_ORIGIN.to_string(),
            plan: InterviewPlan::default(),
            handoff_path: None,
            job_config_path: None,
            chunk_size: chunking.max_chunk_size,
            overlap: chunking.overlap,
            answer_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.overlap, 120);

        let index = ServerConfig::new(PathBuf::from("/srv/knowledge")).index_config();
        assert_eq!(index.knowledge_root, PathBuf::from("/srv/knowledge"));
        assert_eq!(index.chunking_config.max_chunk_size, 800);
        assert_eq!(index.preview_chars, 1200);
    }
}
