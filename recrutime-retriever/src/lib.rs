//! recrutime-retriever: Keyword retrieval over a folder of knowledge documents
//!
//! This crate indexes the plain-text and Markdown documents of a knowledge folder
//! and ranks their chunks against free-text queries using TF-IDF weights and
//! cosine similarity. The index lives in memory and is rebuilt on demand.
//!
//! ## Key Modules
//!
//! - **[`retrieval::chunking_strategy`]**: Which files are indexed and how they are split
//! - **[`retrieval::term_index`]**: Vocabulary, IDF weights and per-chunk term vectors
//! - **[`retrieval::search_engine`]**: Lazy build, atomic rebuild and ranked search
//! - **[`retrieval::knowledge_base`]**: Listing, uploading and deleting documents
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recrutime_retriever::retrieval::{
//!     search_engine::SearchEngine,
//!     term_index::IndexConfig,
//! };
//! use std::path::PathBuf;
//!
//! let engine = SearchEngine::new(IndexConfig::new(PathBuf::from("knowledge")));
//! for hit in engine.search("Experience with Rust", 3) {
//!     println!("{} ({}): {}", hit.chunk_id, hit.score, hit.content);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! knowledge/ → ChunkingStrategy → TermIndex (idf, vectors) → SearchEngine
//!      ↑                                                        ↓
//! KnowledgeBase (add/remove) ──────── rebuild() ─────→ ranked SearchResults
//! ```

pub mod error;
pub mod retrieval;

pub use error::{Result, RetrievalError};
pub use retrieval::search_engine::{SearchEngine, SearchResult};
pub use retrieval::term_index::{IndexConfig, TermIndex};
