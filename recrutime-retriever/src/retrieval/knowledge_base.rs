//! Bookkeeping for the documents stored in the knowledge root.
//!
//! Uploaded documents land directly in the knowledge root under their base name.
//! The retrieval index is not touched here; callers rebuild the
//! [`SearchEngine`](super::search_engine::SearchEngine) after a change.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::chunking_strategy::ChunkingStrategy;
use crate::error::{Result, RetrievalError};

/// A document stored in the knowledge root
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeFile {
    pub name: String,
    pub size: u64,
    /// Lowercase extension including the dot, empty when there is none
    pub ext: String,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    root: PathBuf,
    strategy: ChunkingStrategy,
}

impl KnowledgeBase {
    pub fn new(root: PathBuf, strategy: ChunkingStrategy) -> Self {
        Self { root, strategy }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List the top-level documents, most recently modified first.
    pub fn list(&self) -> Result<Vec<KnowledgeFile>> {
        std::fs::create_dir_all(&self.root)?;

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let ext = Path::new(&name)
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
                .unwrap_or_default();
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_default();

            files.push(KnowledgeFile {
                name,
                size: metadata.len(),
                ext,
                modified,
            });
        }

        files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(files)
    }

    /// Store a document under the base name of `name`, returning the stored name.
    ///
    /// An existing document is never overwritten: `faq.md` becomes `faq_1.md`,
    /// then `faq_2.md`, and so on.
    pub fn add(&self, name: &str, content: &str) -> Result<String> {
        let base_name = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.starts_with('.'))
            .ok_or_else(|| RetrievalError::invalid_name(name))?;
        // Anything stored must stay removable
        validate_name(&base_name)?;

        let base_path = Path::new(&base_name);
        if !self.strategy.accepts_extension(base_path) {
            let extension = base_path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
                .unwrap_or_default();
            return Err(RetrievalError::UnsupportedExtension { extension });
        }

        std::fs::create_dir_all(&self.root)?;

        let stem = base_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = base_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut stored_name = base_name.clone();
        let mut suffix = 1;
        while self.root.join(&stored_name).exists() {
            stored_name = format!("{stem}_{suffix}.{extension}");
            suffix += 1;
        }

        std::fs::write(self.root.join(&stored_name), content)?;
        info!("Stored knowledge document {}", stored_name);

        Ok(stored_name)
    }

    /// Delete a top-level document. Names that could leave the root are rejected.
    pub fn remove(&self, name: &str) -> Result<()> {
        validate_name(name)?;

        let target = self.root.join(name);
        if !target.is_file() {
            return Err(RetrievalError::not_found(name));
        }

        std::fs::remove_file(&target)?;
        info!("Removed knowledge document {}", name);
        Ok(())
    }
}

/// Reject names that are empty or could address anything but a top-level file.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(RetrievalError::invalid_name(name));
    }
    Ok(())
}
