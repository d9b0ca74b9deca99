//! This module turns raw knowledge documents into bounded "chunks", the unit of
//! retrieval used by the interview assistant when it looks up reference material.
//!
//! The module defines two main structs:
//! - [`ParagraphChunker`]: Holds the chunking parameters (maximum chunk length and
//!   overlap) for one document and produces its chunks.
//! - [`TextChunk`]: A single slice of a document along with its origin and position.
//!
//! # Chunking Rules
//!
//! *   **Paragraph Segmentation**: The document is split on blank lines (`"\n\n"`).
//!     Each paragraph is trimmed and empty paragraphs are dropped.
//! *   **Greedy Merging**: Adjacent paragraphs are merged (re-joined with `"\n\n"`)
//!     while the running chunk stays within the maximum length.
//! *   **Hard Splitting**: A paragraph that is still longer than the maximum is cut
//!     into fixed-size slices, each one starting `overlap` characters before the end
//!     of the previous slice.
//! *   **Character Lengths**: All lengths are counted in `char`s, so a slice never
//!     lands in the middle of a multi-byte character.
//!
//! # Usage
//!
//! ```
//! use recrutime_context::text::ParagraphChunker;
//!
//! let chunker = ParagraphChunker::new("guides/rust.md".to_string(), 200, 40);
//!
//! let content = "Ownership rules.\n\nBorrowing rules.\n\n\n\nLifetimes.";
//! let chunks = chunker.get_chunks(content);
//!
//! // Short paragraphs are merged into a single chunk.
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(
//!     chunks[0].chunk_text,
//!     "Ownership rules.\n\nBorrowing rules.\n\nLifetimes."
//! );
//! assert_eq!(chunks[0].chunk_id(), "guides/rust.md::chunk-1");
//! ```
use serde::Serialize;

/// Chunk length used when no explicit size is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Smallest chunk length a [`ParagraphChunker`] accepts; smaller values are raised to it.
pub const MIN_CHUNK_SIZE: usize = 200;

/// Overlap used between hard-split slices when none is configured.
pub const DEFAULT_OVERLAP: usize = 120;

/// Separator between paragraphs, both when splitting and when merging.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Represents a single chunk of text extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// The path of the document, relative to the knowledge root.
    pub path: String,
    /// The sequence number of this chunk within the document (0-indexed).
    pub sequence: usize,
    /// The text content of this specific chunk.
    pub chunk_text: String,
}

impl TextChunk {
    /// Stable identifier of the chunk: `<path>::chunk-<n>` with a 1-based `n`.
    pub fn chunk_id(&self) -> String {
        format!("{}::chunk-{}", self.path, self.sequence + 1)
    }

    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.chunk_text.chars().count()
    }
}

/// Splits documents into paragraph-aligned chunks of bounded length.
///
/// The maximum chunk length is clamped to at least [`MIN_CHUNK_SIZE`] and the overlap
/// to at most half of the maximum, so hard splitting always makes progress.
#[derive(Debug, Clone)]
pub struct ParagraphChunker {
    path: String,
    max_chunk_length: usize,
    overlap: usize,
}

impl ParagraphChunker {
    /// Creates a new `ParagraphChunker` for the document at `path`.
    ///
    /// # Arguments
    ///
    /// *   `path` - The document path relative to the knowledge root. It becomes part
    ///     of every chunk id.
    /// *   `max_chunk_length` - Maximum chunk length in characters.
    /// *   `overlap` - Characters shared by consecutive hard-split slices.
    ///
    /// # Examples
    ///
    /// ```
    /// use recrutime_context::text::{ParagraphChunker, MIN_CHUNK_SIZE};
    ///
    /// let chunker = ParagraphChunker::new("notes.txt".to_string(), 50, 400);
    /// assert_eq!(chunker.max_chunk_length(), MIN_CHUNK_SIZE);
    /// assert_eq!(chunker.overlap(), MIN_CHUNK_SIZE / 2);
    /// ```
    pub fn new(path: String, max_chunk_length: usize, overlap: usize) -> Self {
        let max_chunk_length = max_chunk_length.max(MIN_CHUNK_SIZE);
        let overlap = overlap.min(max_chunk_length / 2);

        ParagraphChunker {
            path,
            max_chunk_length,
            overlap,
        }
    }

    /// Create a chunker with [`DEFAULT_CHUNK_SIZE`] and [`DEFAULT_OVERLAP`].
    pub fn with_defaults(path: String) -> Self {
        Self::new(path, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP)
    }

    pub fn max_chunk_length(&self) -> usize {
        self.max_chunk_length
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Splits the provided `content` into a vector of `TextChunk`s.
    ///
    /// Chunks are returned in document order with consecutive sequence numbers.
    /// No chunk is longer than [`max_chunk_length`](Self::max_chunk_length) characters.
    /// Content made only of whitespace produces no chunks.
    ///
    /// # Examples
    ///
    /// ```
    /// use recrutime_context::text::ParagraphChunker;
    ///
    /// let chunker = ParagraphChunker::new("long.txt".to_string(), 200, 50);
    /// let content = "x".repeat(450);
    /// let chunks = chunker.get_chunks(&content);
    ///
    /// // Slices start at 0, 150 and 300; the last one reaches the end.
    /// assert_eq!(chunks.len(), 3);
    /// assert!(chunks.iter().all(|c| c.char_len() <= 200));
    /// assert_eq!(chunks[2].char_len(), 150);
    /// ```
    pub fn get_chunks(&self, content: &str) -> Vec<TextChunk> {
        let mut pieces: Vec<String> = Vec::new();

        for merged in self.merge_paragraphs(content) {
            if merged.chars().count() <= self.max_chunk_length {
                pieces.push(merged);
            } else {
                pieces.extend(self.hard_split(&merged));
            }
        }

        pieces
            .into_iter()
            .enumerate()
            .map(|(sequence, chunk_text)| TextChunk {
                path: self.path.clone(),
                sequence,
                chunk_text,
            })
            .collect()
    }

    // Greedily merges trimmed paragraphs while the joined text fits the limit.
    // A single paragraph longer than the limit is passed through untouched.
    fn merge_paragraphs(&self, content: &str) -> Vec<String> {
        let separator_len = PARAGRAPH_SEPARATOR.chars().count();
        let mut merged: Vec<String> = Vec::new();
        let mut last_len = 0;

        let paragraphs = content
            .split(PARAGRAPH_SEPARATOR)
            .map(str::trim)
            .filter(|p| !p.is_empty());

        for paragraph in paragraphs {
            let paragraph_len = paragraph.chars().count();
            match merged.last_mut() {
                Some(last) if last_len + separator_len + paragraph_len <= self.max_chunk_length => {
                    last.push_str(PARAGRAPH_SEPARATOR);
                    last.push_str(paragraph);
                    last_len += separator_len + paragraph_len;
                }
                _ => {
                    merged.push(paragraph.to_string());
                    last_len = paragraph_len;
                }
            }
        }

        merged
    }

    // Cuts `text` into slices of `max_chunk_length` chars advancing by
    // `max_chunk_length - overlap`, stopping once a slice reaches the end.
    fn hard_split(&self, text: &str) -> Vec<String> {
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(idx, _)| idx)
            .chain(std::iter::once(text.len()))
            .collect();
        let total_chars = boundaries.len() - 1;
        let stride = self.max_chunk_length - self.overlap;

        let mut slices = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.max_chunk_length).min(total_chars);
            slices.push(text[boundaries[start]..boundaries[end]].to_string());
            if end == total_chars {
                break;
            }
            start += stride;
        }

        slices
    }
}
