use recrutime_context::text::{DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP, ParagraphChunker, TextChunk};
use std::path::Path;

/// Extensions indexed when none are configured.
pub const DEFAULT_ACCEPTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Configuration for chunking knowledge documents
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum size of each chunk in characters
    pub max_chunk_size: usize,
    /// Characters shared by consecutive slices of an oversized paragraph
    pub overlap: usize,
    /// Lowercase extensions (without the dot) that are indexed
    pub accepted_extensions: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            accepted_extensions: DEFAULT_ACCEPTED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl ChunkingConfig {
    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Replace the accepted extensions. Leading dots and case are normalized away,
    /// so `".MD"` and `"md"` are equivalent.
    pub fn with_accepted_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.accepted_extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }
}

/// Strategy for chunking files - delegates the splitting to recrutime-context
#[derive(Debug, Clone)]
pub struct ChunkingStrategy {
    config: ChunkingConfig,
}

impl ChunkingStrategy {
    /// Create a new chunking strategy with the given configuration
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Chunk a document's content; `relative_path` becomes part of every chunk id
    pub fn chunk_content(&self, relative_path: &str, content: &str) -> Vec<TextChunk> {
        let chunker = ParagraphChunker::new(
            relative_path.to_string(),
            self.config.max_chunk_size,
            self.config.overlap,
        );

        let chunks = chunker.get_chunks(content);

        tracing::debug!(
            "Chunked {} into {} chunks (max size: {}, overlap: {})",
            relative_path,
            chunks.len(),
            chunker.max_chunk_length(),
            chunker.overlap()
        );

        chunks
    }

    /// Check if a file should be indexed based on its path
    pub fn should_index_file(&self, file_path: &Path) -> bool {
        // Skip hidden files such as reindex markers
        if let Some(filename) = file_path.file_name().and_then(|n| n.to_str()) {
            if filename.starts_with('.') {
                return false;
            }
        }

        self.accepts_extension(file_path)
    }

    /// Check the extension alone, case-insensitively
    pub fn accepts_extension(&self, file_path: &Path) -> bool {
        match file_path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => {
                let ext = ext.to_lowercase();
                self.config.accepted_extensions.iter().any(|a| *a == ext)
            }
            None => false,
        }
    }
}
