//! File-backed question/answer handoff.
//!
//! The store is a JSON document `{"items": [{id, question, answer, timestamp}]}`
//! that a worker and a separate UI process can both read. Writes go to a
//! temporary file in the same directory, which then atomically replaces the store,
//! so readers never observe a torn document.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::persist::{parent_directory, write_json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffItem {
    pub id: String,
    pub question: String,
    /// `null` until the question is answered
    pub answer: Option<String>,
    /// RFC 3339 creation time
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffDocument {
    #[serde(default)]
    pub items: Vec<HandoffItem>,
}

#[derive(Debug)]
pub struct HandoffStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl HandoffStore {
    /// Open the store at `path`, creating an empty document if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };

        std::fs::create_dir_all(parent_directory(&store.path))?;
        if !store.path.exists() {
            store.write(&HandoffDocument::default())?;
            info!("Created handoff store at {}", store.path.display());
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> StoreResult<HandoffDocument> {
        self.read()
    }

    pub fn items(&self) -> StoreResult<Vec<HandoffItem>> {
        Ok(self.read()?.items)
    }

    /// Items still waiting for an answer, oldest first.
    pub fn pending(&self) -> StoreResult<Vec<HandoffItem>> {
        Ok(self
            .read()?
            .items
            .into_iter()
            .filter(|item| item.answer.is_none())
            .collect())
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<HandoffItem>> {
        Ok(self.read()?.items.into_iter().find(|item| item.id == id))
    }

    /// Append an unanswered question and return its id.
    pub fn push_question(&self, question: &str) -> StoreResult<String> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut document = self.read()?;
        let id = Uuid::new_v4().to_string();
        document.items.push(HandoffItem {
            id: id.clone(),
            question: question.to_string(),
            answer: None,
            timestamp: Utc::now().to_rfc3339(),
        });
        self.write(&document)?;

        debug!("Handoff question {} written to {}", id, self.path.display());
        Ok(id)
    }

    /// Record `answer` for the item `id`. Returns `false` if no such item exists.
    pub fn answer(&self, id: &str, answer: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut document = self.read()?;
        let Some(item) = document.items.iter_mut().find(|item| item.id == id) else {
            return Ok(false);
        };
        item.answer = Some(answer.to_string());
        self.write(&document)?;

        debug!("Handoff item {} answered", id);
        Ok(true)
    }

    fn read(&self) -> StoreResult<HandoffDocument> {
        let bytes = std::fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write(&self, document: &HandoffDocument) -> StoreResult<()> {
        write_json(&self.path, document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_empty_document() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("runtime").join("web_interview.json");

        let store = HandoffStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.items().unwrap().is_empty());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "items": [] }));
    }

    #[test]
    fn test_push_and_answer() {
        let temp_dir = tempdir().unwrap();
        let store = HandoffStore::open(temp_dir.path().join("store.json")).unwrap();

        let first = store.push_question("Describe your last project").unwrap();
        let second = store.push_question("Why this role?").unwrap();
        assert_eq!(store.pending().unwrap().len(), 2);

        assert!(store.answer(&first, "A billing platform").unwrap());
        assert!(!store.answer("unknown-id", "ignored").unwrap());

        let items = store.items().unwrap();
        assert_eq!(items[0].answer.as_deref(), Some("A billing platform"));
        assert_eq!(items[1].answer, None);
        assert!(chrono::DateTime::parse_from_rfc3339(&items[0].timestamp).is_ok());

        let pending = store.pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second);
    }

    #[test]
    fn test_existing_document_is_kept() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("store.json");
        std::fs::write(
            &path,
            r#"{"items":[{"id":"q1","question":"Hi?","answer":null,"timestamp":"2025-01-01T00:00:00+00:00"}]}"#,
        )
        .unwrap();

        let store = HandoffStore::open(&path).unwrap();
        assert_eq!(store.get("q1").unwrap().unwrap().question, "Hi?");
    }

    #[test]
    fn test_malformed_document() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = HandoffStore::open(&path).unwrap();
        assert!(matches!(store.items(), Err(StoreError::Json { .. })));
    }
}
