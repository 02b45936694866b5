//! Disk-backed case storage.
//!
//! A disk casefile is one temporary file of back-to-back fixed-width cases.
//! The file itself is owned by [`DiskStorage`] (dropping it deletes the file);
//! every open descriptor travels with its block buffer as a [`DiskHandle`],
//! which has exactly one owner at a time: the casefile's idle slot or a
//! single reader.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tempfile::{Builder, TempPath};

use crate::config::CasefileConfig;
use crate::error::CaseError;

/// Owns the temporary file backing a disk casefile.
#[derive(Debug)]
pub(crate) struct DiskStorage {
    path: TempPath,
}

impl DiskStorage {
    /// Creates a new temporary file and returns it together with a read/write
    /// handle positioned at its start.
    pub(crate) fn create(
        config: &CasefileConfig,
        block_bytes: usize,
    ) -> io::Result<(Self, DiskHandle)> {
        let mut builder = Builder::new();
        builder.prefix("casefile-").suffix(".tmp");
        let tmp = match &config.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let (file, path) = tmp.into_parts();
        Ok((Self { path }, DiskHandle::new(file, block_bytes)))
    }

    /// Opens an independent read-only descriptor on the backing file.
    pub(crate) fn open_handle(&self, block_bytes: usize) -> io::Result<DiskHandle> {
        let file = File::open(&self.path)?;
        Ok(DiskHandle::new(file, block_bytes))
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the backing file, reporting any removal error.
    pub(crate) fn close(self) -> io::Result<()> {
        self.path.close()
    }
}

/// A file descriptor plus its block buffer.
///
/// While the casefile is writable the buffer accumulates pending cases and
/// `filled` counts the pending bytes. Once lent to a reader the buffer holds
/// whatever block the reader loaded last.
#[derive(Debug)]
pub(crate) struct DiskHandle {
    file: File,
    buffer: Vec<u8>,
    filled: usize,
}

impl DiskHandle {
    fn new(file: File, block_bytes: usize) -> Self {
        Self {
            file,
            buffer: vec![0u8; block_bytes],
            filled: 0,
        }
    }

    /// Buffers `case` for writing, flushing first if it would overflow.
    pub(crate) fn write_case(&mut self, case: &[u8]) -> io::Result<()> {
        if self.filled + case.len() > self.buffer.len() {
            self.flush()?;
        }
        self.buffer[self.filled..self.filled + case.len()].copy_from_slice(case);
        self.filled += case.len();
        Ok(())
    }

    /// Writes any pending bytes to the file.
    pub(crate) fn flush(&mut self) -> io::Result<()> {
        if self.filled > 0 {
            self.file.write_all(&self.buffer[..self.filled])?;
            self.filled = 0;
        }
        self.file.flush()
    }
}

/// Sequential block reader over a [`DiskHandle`].
///
/// Cases are addressed by logical index; the file offset is always derived
/// as `index * case_size`, so a cursor can be attached at any position.
#[derive(Debug)]
pub(crate) struct BlockCursor {
    handle: DiskHandle,
    /// Logical index of the first case currently in the buffer.
    first: u64,
    /// Number of valid cases in the buffer.
    cases: usize,
}

impl BlockCursor {
    pub(crate) fn new(mut handle: DiskHandle) -> Self {
        handle.filled = 0;
        Self {
            handle,
            first: 0,
            cases: 0,
        }
    }

    pub(crate) fn into_handle(self) -> DiskHandle {
        self.handle
    }

    /// Returns case `index`, loading the block that contains it if needed.
    pub(crate) fn case_at(
        &mut self,
        index: u64,
        case_size: usize,
        case_count: u64,
    ) -> Result<&[u8], CaseError> {
        if index < self.first || index >= self.first + self.cases as u64 {
            self.load(index, case_size, case_count)?;
        }
        let offset = (index - self.first) as usize * case_size;
        Ok(&self.handle.buffer[offset..offset + case_size])
    }

    /// Fills the buffer with the whole block containing case `index`.
    pub(crate) fn load(
        &mut self,
        index: u64,
        case_size: usize,
        case_count: u64,
    ) -> Result<(), CaseError> {
        let per_block = (self.handle.buffer.len() / case_size) as u64;
        let first = index / per_block * per_block;
        let n = per_block.min(case_count.saturating_sub(first)) as usize;
        let bytes = n * case_size;

        self.cases = 0;
        self.handle
            .file
            .seek(SeekFrom::Start(first * case_size as u64))?;
        match self.handle.file.read_exact(&mut self.handle.buffer[..bytes]) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(CaseError::UnexpectedEof { index });
            }
            Err(e) => return Err(CaseError::Io(e)),
        }
        self.first = first;
        self.cases = n;
        Ok(())
    }
}
