use std::path::{Path, PathBuf};

use casefile::{CaseError, CasefileConfig, DEFAULT_BLOCK_SIZE, DEFAULT_WORKSPACE_BYTES};

use crate::error::SortError;
use crate::selection::NODE_BYTES;

/// Upper bound on the number of runs combined in one merge.
pub const MAX_MERGE_ORDER: usize = 7;

/// Smallest per-input merge buffer, in bytes.
pub const MIN_BUFFER_SIZE_BYTES: usize = 4096;

/// Smallest per-input merge buffer, in cases.
pub const MIN_BUFFER_SIZE_RECS: usize = 16;

/// Smallest replacement-selection tree worth running.
pub const MIN_BUFFER_TOTAL_SIZE_RECS: usize = 64;

/// Default budget of simultaneously open files during a merge.
pub const DEFAULT_MAX_FILE_HANDLES: usize = 16;

/// Resource limits for the external sort engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortConfig {
    /// Memory for the replacement-selection tree and, later, the merge
    /// buffers.
    pub workspace_bytes: usize,
    /// Write buffer size for run files.
    pub block_size: usize,
    /// Directory for run files. `None` uses the platform default.
    pub temp_dir: Option<PathBuf>,
    pub max_merge_order: usize,
    /// Open files allowed at once; a merge needs one per input plus the output.
    pub max_file_handles: usize,
    pub min_buffer_bytes: usize,
    pub min_buffer_records: usize,
    pub min_tree_records: usize,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            workspace_bytes: DEFAULT_WORKSPACE_BYTES,
            block_size: DEFAULT_BLOCK_SIZE,
            temp_dir: None,
            max_merge_order: MAX_MERGE_ORDER,
            max_file_handles: DEFAULT_MAX_FILE_HANDLES,
            min_buffer_bytes: MIN_BUFFER_SIZE_BYTES,
            min_buffer_records: MIN_BUFFER_SIZE_RECS,
            min_tree_records: MIN_BUFFER_TOTAL_SIZE_RECS,
        }
    }
}

impl From<&CasefileConfig> for SortConfig {
    fn from(c: &CasefileConfig) -> Self {
        Self {
            workspace_bytes: c.workspace_bytes,
            block_size: c.block_size,
            temp_dir: c.temp_dir.clone(),
            ..Self::default()
        }
    }
}

impl SortConfig {
    pub fn with_workspace(mut self, bytes: usize) -> Self {
        self.workspace_bytes = bytes;
        self
    }

    pub fn with_temp_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.temp_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_max_merge_order(mut self, order: usize) -> Self {
        self.max_merge_order = order;
        self
    }

    pub fn with_max_file_handles(mut self, handles: usize) -> Self {
        self.max_file_handles = handles;
        self
    }

    /// Relaxes the minimum buffer sizes; meant for small workspaces.
    pub fn with_min_buffers(mut self, bytes: usize, records: usize, tree_records: usize) -> Self {
        self.min_buffer_bytes = bytes;
        self.min_buffer_records = records;
        self.min_tree_records = tree_records;
        self
    }

    /// Casefile settings matching this sort's workspace and temp directory.
    pub fn casefile_config(&self) -> CasefileConfig {
        CasefileConfig {
            workspace_bytes: self.workspace_bytes,
            block_size: self.block_size,
            temp_dir: self.temp_dir.clone(),
        }
    }
}

/// Sizes derived from a [`SortConfig`] for one case width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortPlan {
    pub case_size: usize,
    /// Cases held by the replacement-selection tree.
    pub tree_records: usize,
    /// Merge order P: runs combined per merge.
    pub merge_order: usize,
    /// Cases buffered from each merge input per refill.
    pub buffer_records: usize,
}

impl SortPlan {
    /// Chooses the tree size and the largest merge order the limits allow.
    ///
    /// # Errors
    ///
    /// [`SortError::ResourceExhausted`] if the workspace cannot hold the
    /// minimum tree, or no merge order of at least 2 satisfies the file-handle
    /// and per-buffer minimums. A zero case size is a protocol violation.
    pub fn new(config: &SortConfig, case_size: usize) -> Result<Self, SortError> {
        if case_size == 0 {
            return Err(CaseError::ProtocolViolation("case size must be nonzero").into());
        }

        let tree_records = config.workspace_bytes / (case_size + NODE_BYTES);
        let min_tree = config.min_tree_records.max(2);
        if tree_records < min_tree {
            return Err(SortError::ResourceExhausted(format!(
                "workspace of {} bytes holds {} cases of {} bytes; sorting needs at least {}",
                config.workspace_bytes, tree_records, case_size, min_tree
            )));
        }

        let min_buffer = config
            .min_buffer_bytes
            .max(config.min_buffer_records.saturating_mul(case_size))
            .max(case_size);
        let mut order = config
            .max_merge_order
            .min(config.max_file_handles.saturating_sub(1));
        while order >= 2 && config.workspace_bytes / order < min_buffer {
            order -= 1;
        }
        if order < 2 {
            return Err(SortError::ResourceExhausted(format!(
                "workspace of {} bytes and {} file handles cannot support a 2-way merge \
                 with {}-byte buffers",
                config.workspace_bytes, config.max_file_handles, min_buffer
            )));
        }

        let buffer_records = config.workspace_bytes / order / case_size;
        Ok(Self {
            case_size,
            tree_records,
            merge_order: order,
            buffer_records,
        })
    }
}
