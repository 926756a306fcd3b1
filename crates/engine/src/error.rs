use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// `init_online` was asked for a chunk_size whose middle element is zero.
    InvalidChunkSize,
    /// The underlying engine rejected initialization for an engine-specific reason.
    InitFailed(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidChunkSize => write!(f, "chunk_size middle element must be non-zero"),
            EngineError::InitFailed(msg) => write!(f, "engine init failed: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
