use std::io;

use thiserror::Error;

/// Errors surfaced by casefile storage and its readers.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// A temporary file ended before the case at `index` could be read back.
    #[error("unexpected end of file reading case {index}")]
    UnexpectedEof { index: u64 },
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
    /// The caller broke the casefile's usage protocol (a programming error).
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),
    #[error("case is {actual} bytes but the casefile holds {expected}-byte cases")]
    CaseSize { expected: usize, actual: usize },
}
