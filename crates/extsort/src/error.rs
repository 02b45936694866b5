use std::io;

use casefile::CaseError;
use thiserror::Error;

/// Errors surfaced by the external sort engine.
///
/// Any error aborts the sort; every run file created so far is removed as
/// the engine unwinds.
#[derive(Debug, Error)]
pub enum SortError {
    #[error(transparent)]
    Case(#[from] CaseError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// A run file ended before all of its cases were read back.
    #[error("run file ended after {read} of {expected} cases")]
    UnexpectedEof { read: u64, expected: u64 },
    #[error("corrupt run file: {0}")]
    Corrupt(String),
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}
