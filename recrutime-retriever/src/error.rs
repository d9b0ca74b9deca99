//! Error types for knowledge retrieval

/// Result type for retrieval and knowledge-folder operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Error type for knowledge-folder bookkeeping.
///
/// Index building never fails as a whole: unreadable documents are logged and
/// skipped, and a missing knowledge root yields an empty index. These variants
/// cover the operations that do surface failures to the caller, namely adding
/// and removing documents.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// IO errors when touching the knowledge root
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The document does not carry one of the accepted text extensions
    #[error("Unsupported file type: {extension}")]
    UnsupportedExtension { extension: String },

    /// The document name is empty or could escape the knowledge root
    #[error("Invalid file name: {name}")]
    InvalidName { name: String },

    /// No document with this name exists in the knowledge root
    #[error("File not found: {name}")]
    DocumentNotFound { name: String },
}

impl RetrievalError {
    pub fn invalid_name<S: Into<String>>(name: S) -> Self {
        Self::InvalidName { name: name.into() }
    }

    pub fn not_found<S: Into<String>>(name: S) -> Self {
        Self::DocumentNotFound { name: name.into() }
    }
}
