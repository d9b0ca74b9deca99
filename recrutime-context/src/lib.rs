pub mod text;
pub mod tokens;

// Re-export the chunking and tokenizing entry points for external use
pub use text::{ParagraphChunker, TextChunk};
pub use tokens::tokenize;
