use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The segmenter process or library could not be reached or executed.
    #[error("tokenizer unavailable: {0}")]
    TokenizerUnavailable(String),

    /// The segmenter ran but could not process the input.
    #[error("tokenize failed: {0}")]
    Tokenize(String),

    #[error("document store unavailable: {0}")]
    StoreUnavailable(#[from] sled::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("corrupt entry {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        Error::Corrupt { key: key.into(), reason: reason.to_string() }
    }
}
