//! Retrieval engine ranking knowledge chunks against free-text queries.
//!
//! The engine owns the current [`TermIndex`] behind an `RwLock<Option<Arc<_>>>`.
//! The index is built lazily by the first search, and [`SearchEngine::rebuild`]
//! builds a complete replacement before swapping it in, so a concurrent search sees
//! either the old index or the new one, never a partially built index.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use super::term_index::{BuildStats, IndexConfig, TermIndex};

/// One ranked chunk returned by [`SearchEngine::search`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    /// Document path relative to the knowledge root
    pub source: String,
    /// Cosine similarity rounded to 4 decimals
    pub score: f64,
    /// Trimmed chunk content, cut to the configured preview length
    pub content: String,
}

/// Lazily built, atomically swappable search over a knowledge folder
#[derive(Debug)]
pub struct SearchEngine {
    config: IndexConfig,
    index: RwLock<Option<Arc<TermIndex>>>,
}

impl SearchEngine {
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            index: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Rank chunks against `query`, best first, returning at most `top_k` results.
    ///
    /// Chunks with zero similarity are never returned; equal scores keep the order
    /// in which chunks were indexed. An empty index or a query without tokens
    /// gives an empty list.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        let index = self.index();
        let query_vector = index.vectorize(query);
        if query_vector.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(f64, usize)> = index
            .chunks()
            .iter()
            .enumerate()
            .filter_map(|(position, chunk)| {
                let similarity = chunk.similarity(&query_vector);
                (similarity > 0.0).then_some((similarity, position))
            })
            .collect();

        // Stable sort: ties stay in chunk order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        let results: Vec<SearchResult> = scored
            .into_iter()
            .take(top_k)
            .map(|(similarity, position)| {
                let chunk = &index.chunks()[position];
                SearchResult {
                    chunk_id: chunk.chunk_id.clone(),
                    source: chunk.source.clone(),
                    score: round_score(similarity),
                    content: chunk
                        .content
                        .trim()
                        .chars()
                        .take(self.config.preview_chars)
                        .collect(),
                }
            })
            .collect();

        debug!(
            "Search for {:?} returned {} of at most {} results",
            query,
            results.len(),
            top_k
        );

        results
    }

    /// The current index, building it first if no search has run yet.
    pub fn index(&self) -> Arc<TermIndex> {
        if let Some(index) = self
            .index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Arc::clone(index);
        }

        let fresh = Arc::new(TermIndex::build(&self.config));
        let mut slot = self.index.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have finished its lazy build first; keep that one
        Arc::clone(slot.get_or_insert(fresh))
    }

    /// Build a fresh index from the knowledge root and swap it in.
    pub fn rebuild(&self) -> Arc<TermIndex> {
        let fresh = Arc::new(TermIndex::build(&self.config));
        let mut slot = self.index.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::clone(&fresh));
        fresh
    }

    /// Statistics of the current index, if one has been built.
    pub fn stats(&self) -> Option<BuildStats> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|index| index.stats().clone())
    }
}

fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}
