//! # Casefile
//!
//! Append-only storage for fixed-width binary records ("cases") that starts
//! in memory and transparently overflows to a temporary file once a
//! workspace budget is spent.
//!
//! ## Lifecycle
//!
//! ```text
//!  new(case_size)
//!        │
//!        ▼
//!  ┌────────────┐  append() past workspace   ┌────────────┐
//!  │  Memory    │ ─────── or to_disk() ────▶ │   Disk     │
//!  │  (Write)   │                            │  (Write)   │
//!  └────────────┘                            └────────────┘
//!        │ get_reader()                            │ get_reader()
//!        ▼                                         ▼
//!  ┌────────────┐          to_disk()         ┌────────────┐
//!  │  Memory    │ ─────────────────────────▶ │   Disk     │
//!  │  (Read)    │                            │  (Read)    │
//!  └────────────┘                            └────────────┘
//! ```
//!
//! Storage moves from memory to disk at most once and never back. The first
//! reader freezes the casefile; later appends are protocol violations.
//!
//! ## Disk layout
//!
//! The temporary file is the cases back to back, so case `i` lives at byte
//! offset `i * case_size`. I/O goes through a block buffer holding a whole
//! number of cases.
//!
//! ## Example
//! ```rust
//! use casefile::Casefile;
//!
//! let mut cf = Casefile::new(8);
//! for v in [1u64, 2, 3] {
//!     cf.append(&v.to_le_bytes()).unwrap();
//! }
//! let mut r = cf.get_reader().unwrap();
//! assert_eq!(r.read().unwrap(), Some(&1u64.to_le_bytes()[..]));
//! ```

mod casefile;
mod config;
mod disk;
mod error;
mod memory;
mod reader;

pub use crate::casefile::{Casefile, Mode};
pub use config::{CasefileConfig, DEFAULT_BLOCK_SIZE, DEFAULT_WORKSPACE_BYTES};
pub use error::CaseError;
pub use reader::{Casereader, DestructiveReader};

/// A forward-only stream of fixed-width cases.
///
/// Each returned slice is valid until the next call.
pub trait CaseSource {
    /// Width in bytes of every case this source yields.
    fn case_size(&self) -> usize;

    /// Total number of cases this source yields from its start.
    fn case_count(&self) -> u64;

    /// Returns the next case, or `None` at end of stream.
    fn next_case(&mut self) -> Result<Option<&[u8]>, CaseError>;
}
