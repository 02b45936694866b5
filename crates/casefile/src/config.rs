use std::path::{Path, PathBuf};

/// Default in-memory workspace before a casefile overflows to disk: 64 MiB.
pub const DEFAULT_WORKSPACE_BYTES: usize = 64 * 1024 * 1024;

/// Default I/O block size for disk-backed casefiles.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Storage settings consumed by a [`Casefile`](crate::Casefile).
///
/// The host owns these values; the casefile only reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasefileConfig {
    /// Bytes of case data (plus per-case bookkeeping) kept in memory before
    /// the casefile migrates to a temporary file.
    pub workspace_bytes: usize,
    /// Size of the disk write/read buffer. Rounded down to a whole number of
    /// cases, but never below one case.
    pub block_size: usize,
    /// Directory for temporary files. `None` uses the platform default.
    pub temp_dir: Option<PathBuf>,
}

impl Default for CasefileConfig {
    fn default() -> Self {
        Self {
            workspace_bytes: DEFAULT_WORKSPACE_BYTES,
            block_size: DEFAULT_BLOCK_SIZE,
            temp_dir: None,
        }
    }
}

impl CasefileConfig {
    pub fn with_workspace(mut self, bytes: usize) -> Self {
        self.workspace_bytes = bytes;
        self
    }

    pub fn with_block_size(mut self, bytes: usize) -> Self {
        self.block_size = bytes;
        self
    }

    pub fn with_temp_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.temp_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Number of `case_size`-byte cases held by one disk block buffer.
    pub fn cases_per_block(&self, case_size: usize) -> usize {
        (self.block_size / case_size.max(1)).max(1)
    }

    /// Byte length of one disk block buffer for `case_size`-byte cases.
    pub fn block_bytes(&self, case_size: usize) -> usize {
        self.cases_per_block(case_size) * case_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_rounds_down_to_whole_cases() {
        let c = CasefileConfig::default().with_block_size(4096);
        assert_eq!(c.cases_per_block(8), 512);
        assert_eq!(c.cases_per_block(24), 170);
        assert_eq!(c.block_bytes(24), 170 * 24);
    }

    #[test]
    fn block_never_below_one_case() {
        let c = CasefileConfig::default().with_block_size(16);
        assert_eq!(c.cases_per_block(100), 1);
        assert_eq!(c.block_bytes(100), 100);
    }

    #[test]
    fn builders_set_fields() {
        let c = CasefileConfig::default()
            .with_workspace(1024)
            .with_temp_dir("/tmp/cases");
        assert_eq!(c.workspace_bytes, 1024);
        assert_eq!(c.temp_dir.as_deref(), Some(Path::new("/tmp/cases")));
    }
}
