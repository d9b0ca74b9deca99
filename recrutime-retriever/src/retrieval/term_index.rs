//! Lexical term index over a knowledge folder.
//!
//! This module scans the knowledge root, chunks every accepted document and weights
//! the terms of every chunk with TF-IDF. The resulting [`TermIndex`] is immutable;
//! a rebuild produces a fresh index rather than patching the old one.
//!
//! ## Weighting
//!
//! ```text
//! idf(term)          = ln((1 + N) / (1 + df(term))) + 1     N = number of chunks (min 1)
//! weight(term, c)    = count(term, c) / tokens(c) * idf(term)
//! ```
//!
//! Queries are vectorized the same way against the stored idf table, with idf 1.0
//! for terms the corpus has never seen, and compared with cosine similarity.
//!
//! ## Determinism
//!
//! Documents are visited in sorted relative-path order and weights live in
//! `BTreeMap`s, so two builds over the same corpus produce identical chunk ids,
//! identical idf values and bit-identical scores.

use ignore::WalkBuilder;
use recrutime_context::tokenize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::chunking_strategy::{ChunkingConfig, ChunkingStrategy};

/// Sparse term-weight vector, ordered by term.
pub type TermWeights = BTreeMap<String, f64>;

/// Default number of results returned by a search.
pub const DEFAULT_TOP_K: usize = 5;

/// Default cap on the characters of chunk content carried in a search result.
pub const DEFAULT_PREVIEW_CHARS: usize = 1200;

/// Configuration for building and querying the term index
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Root directory of the knowledge documents
    pub knowledge_root: PathBuf,
    /// Chunking configuration
    pub chunking_config: ChunkingConfig,
    /// Maximum characters of content returned per search result
    pub preview_chars: usize,
}

impl IndexConfig {
    /// Create a new index configuration with default chunking for `knowledge_root`.
    pub fn new(knowledge_root: PathBuf) -> Self {
        Self {
            knowledge_root,
            chunking_config: ChunkingConfig::default(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Set the maximum size for text chunks in characters.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunking_config = self.chunking_config.with_max_chunk_size(size);
        self
    }

    /// Set the overlap between consecutive slices of an oversized paragraph.
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.chunking_config = self.chunking_config.with_overlap(overlap);
        self
    }

    pub fn with_chunking_config(mut self, config: ChunkingConfig) -> Self {
        self.chunking_config = config;
        self
    }

    pub fn with_preview_chars(mut self, preview_chars: usize) -> Self {
        self.preview_chars = preview_chars;
        self
    }
}

/// A chunk with its precomputed term weights
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    /// `<relative-path>::chunk-<n>`
    pub chunk_id: String,
    /// Document path relative to the knowledge root
    pub source: String,
    pub content: String,
    pub weights: TermWeights,
    norm: f64,
}

impl IndexedChunk {
    fn new(chunk_id: String, source: String, content: String, weights: TermWeights) -> Self {
        let norm = vector_norm(&weights);
        Self {
            chunk_id,
            source,
            content,
            weights,
            norm,
        }
    }

    /// Cosine similarity between this chunk and a query vector.
    pub fn similarity(&self, query: &TermWeights) -> f64 {
        if query.is_empty() || self.weights.is_empty() {
            return 0.0;
        }

        // Iterate over the smaller vector and look terms up in the larger one
        let (small, large) = if query.len() <= self.weights.len() {
            (query, &self.weights)
        } else {
            (&self.weights, query)
        };
        let dot: f64 = small
            .iter()
            .filter_map(|(term, weight)| large.get(term).map(|other| weight * other))
            .sum();

        dot / (vector_norm(query) * self.norm)
    }
}

/// Statistics of one index build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub documents_indexed: usize,
    pub documents_skipped: usize,
    pub chunks: usize,
    pub vocabulary: usize,
}

/// Immutable TF-IDF index over the chunks of a knowledge folder
#[derive(Debug, Clone, Default)]
pub struct TermIndex {
    chunks: Vec<IndexedChunk>,
    idf: TermWeights,
    stats: BuildStats,
}

impl TermIndex {
    /// Build an index from the documents under `config.knowledge_root`.
    ///
    /// This never fails: a missing root gives an empty index, and documents that
    /// cannot be read are logged and skipped while the rest are indexed.
    pub fn build(config: &IndexConfig) -> Self {
        let strategy = ChunkingStrategy::new(config.chunking_config.clone());
        let (paths, walk_errors) = collect_paths(&config.knowledge_root, &strategy);

        let mut index = Self::from_paths(&strategy, paths);
        index.stats.documents_skipped += walk_errors;
        let skipped = index.stats.documents_skipped;

        info!(
            "Built term index for {}: {} documents, {} chunks, {} terms ({} skipped)",
            config.knowledge_root.display(),
            index.stats.documents_indexed,
            index.stats.chunks,
            index.stats.vocabulary,
            skipped
        );

        index
    }

    /// Build an index from `(relative_path, absolute_path)` pairs, in the order
    /// given. Files that cannot be read are logged, counted as skipped and left out.
    pub fn from_paths(strategy: &ChunkingStrategy, paths: Vec<(String, PathBuf)>) -> Self {
        let (documents, skipped) = read_documents(paths);
        let mut index = Self::from_documents(strategy, &documents);
        index.stats.documents_skipped = skipped;
        index
    }

    /// Build an index from in-memory `(relative_path, content)` documents, in the
    /// order given.
    pub fn from_documents(strategy: &ChunkingStrategy, documents: &[(String, String)]) -> Self {
        let mut raw_chunks: Vec<(String, String, String)> = Vec::new();
        for (relative_path, content) in documents {
            for chunk in strategy.chunk_content(relative_path, content) {
                raw_chunks.push((chunk.chunk_id(), relative_path.clone(), chunk.chunk_text));
            }
        }

        let chunk_tokens: Vec<Vec<String>> = raw_chunks
            .iter()
            .map(|(_, _, content)| tokenize(content))
            .collect();

        // Document frequency counts each term once per chunk
        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &chunk_tokens {
            let mut seen: Vec<&str> = tokens.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let total_chunks = raw_chunks.len().max(1) as f64;
        let idf: TermWeights = document_frequency
            .into_iter()
            .map(|(term, df)| {
                let weight = ((1.0 + total_chunks) / (1.0 + df as f64)).ln() + 1.0;
                (term.to_string(), weight)
            })
            .collect();

        let chunks: Vec<IndexedChunk> = raw_chunks
            .into_iter()
            .zip(chunk_tokens.iter())
            .map(|((chunk_id, source, content), tokens)| {
                let weights = weigh_terms(tokens, &idf);
                IndexedChunk::new(chunk_id, source, content, weights)
            })
            .collect();

        let stats = BuildStats {
            documents_indexed: documents.len(),
            documents_skipped: 0,
            chunks: chunks.len(),
            vocabulary: idf.len(),
        };

        Self { chunks, idf, stats }
    }

    /// Vectorize a query with the index's idf table.
    pub fn vectorize(&self, text: &str) -> TermWeights {
        weigh_terms(&tokenize(text), &self.idf)
    }

    pub fn chunks(&self) -> &[IndexedChunk] {
        &self.chunks
    }

    pub fn idf(&self) -> &TermWeights {
        &self.idf
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

// Relative term frequency times idf; unseen terms weigh with idf 1.0.
fn weigh_terms(tokens: &[String], idf: &TermWeights) -> TermWeights {
    let mut counts: BTreeMap<&str, f64> = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0.0) += 1.0;
    }

    let total = tokens.len().max(1) as f64;
    counts
        .into_iter()
        .map(|(term, count)| {
            let weight = (count / total) * idf.get(term).copied().unwrap_or(1.0);
            (term.to_string(), weight)
        })
        .collect()
}

fn vector_norm(weights: &TermWeights) -> f64 {
    let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm == 0.0 { 1.0 } else { norm }
}

/// Every indexable file under `root` as `(relative_path, absolute_path)`, sorted by
/// relative path, plus the number of walk errors.
fn collect_paths(root: &Path, strategy: &ChunkingStrategy) -> (Vec<(String, PathBuf)>, usize) {
    if !root.is_dir() {
        debug!("Knowledge root {} does not exist, index is empty", root.display());
        return (Vec::new(), 0);
    }

    let mut paths: Vec<(String, PathBuf)> = Vec::new();
    let mut skipped = 0;

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to walk knowledge root {}: {}", root.display(), e);
                skipped += 1;
                continue;
            }
        };

        let is_file = entry.file_type().map(|ft| ft.is_file()).unwrap_or(false);
        if !is_file || !strategy.should_index_file(entry.path()) {
            continue;
        }

        if let Some(relative_path) = relative_path(root, entry.path()) {
            paths.push((relative_path, entry.into_path()));
        }
    }

    paths.sort_by(|a, b| a.0.cmp(&b.0));
    (paths, skipped)
}

/// Reads each file lossily as UTF-8. Returns the documents that could be read
/// and the number that could not.
fn read_documents(paths: Vec<(String, PathBuf)>) -> (Vec<(String, String)>, usize) {
    let mut skipped = 0;
    let mut documents = Vec::with_capacity(paths.len());
    for (relative_path, absolute_path) in paths {
        match std::fs::read(&absolute_path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes).into_owned();
                documents.push((relative_path, content));
            }
            Err(e) => {
                warn!("Skipping unreadable document {}: {}", absolute_path.display(), e);
                skipped += 1;
            }
        }
    }

    (documents, skipped)
}

/// Path of `path` relative to `root`, with `/` separators on every platform.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
