use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;

use tracing::{debug, trace};

use crate::config::CasefileConfig;
use crate::disk::{BlockCursor, DiskHandle, DiskStorage};
use crate::error::CaseError;
use crate::memory::MemoryCases;
use crate::reader::{Casereader, DestructiveReader, Draining};

/// Whether a casefile still accepts appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Accepting appends; no reader has been created yet.
    Write,
    /// Frozen by the first [`Casefile::get_reader`] call.
    Read,
}

pub(crate) enum Storage {
    Memory(MemoryCases),
    Disk(DiskStorage),
}

/// Append-only store of fixed-width cases with independent sequential readers.
///
/// # Storage
///
/// A casefile starts in memory. When an append would exceed the configured
/// workspace (or the allocator refuses), the whole list is written, in order,
/// to a temporary file and every later case goes through a block-sized write
/// buffer. The move happens at most once and never reverses. [`to_disk`]
/// forces it early.
///
/// # Readers
///
/// [`get_reader`] freezes the casefile and returns a [`Casereader`] at case 0.
/// Each reader keeps its own logical index and, once the casefile is on disk,
/// its own descriptor and buffer. The casefile keeps at most one idle
/// descriptor in a single-owner slot: the first reader to need one takes it,
/// and a dropped reader hands its descriptor back only if the slot is empty.
///
/// Readers borrow the casefile, so none can outlive it.
///
/// [`to_disk`]: Casefile::to_disk
/// [`get_reader`]: Casefile::get_reader
pub struct Casefile {
    case_size: usize,
    case_count: u64,
    config: CasefileConfig,
    mode: Cell<Mode>,
    storage: RefCell<Storage>,
    idle: RefCell<Option<DiskHandle>>,
}

impl Casefile {
    /// Creates an empty, writable, memory-backed casefile with the default
    /// configuration.
    ///
    /// # Panics
    ///
    /// Panics if `case_size` is zero.
    pub fn new(case_size: usize) -> Self {
        Self::with_config(case_size, CasefileConfig::default())
    }

    /// Creates an empty, writable, memory-backed casefile.
    ///
    /// # Panics
    ///
    /// Panics if `case_size` is zero.
    pub fn with_config(case_size: usize, config: CasefileConfig) -> Self {
        assert!(case_size > 0, "case size must be nonzero");
        Self {
            case_size,
            case_count: 0,
            config,
            mode: Cell::new(Mode::Write),
            storage: RefCell::new(Storage::Memory(MemoryCases::new())),
            idle: RefCell::new(None),
        }
    }

    pub fn case_size(&self) -> usize {
        self.case_size
    }

    /// Number of cases appended so far. Never decreases.
    pub fn case_count(&self) -> u64 {
        self.case_count
    }

    pub fn mode(&self) -> Mode {
        self.mode.get()
    }

    pub fn config(&self) -> &CasefileConfig {
        &self.config
    }

    /// Returns `true` once the casefile has migrated to a temporary file.
    pub fn is_on_disk(&self) -> bool {
        matches!(&*self.storage.borrow(), Storage::Disk(_))
    }

    /// Appends a copy of `case`.
    ///
    /// # Errors
    ///
    /// - [`CaseError::ProtocolViolation`] if a reader has already been created.
    /// - [`CaseError::CaseSize`] if `case` is not exactly `case_size` bytes.
    /// - [`CaseError::Io`] if migrating to or writing the temporary file fails.
    pub fn append(&mut self, case: &[u8]) -> Result<(), CaseError> {
        if self.mode.get() == Mode::Read {
            return Err(CaseError::ProtocolViolation(
                "append on a casefile that already has readers",
            ));
        }
        if case.len() != self.case_size {
            return Err(CaseError::CaseSize {
                expected: self.case_size,
                actual: case.len(),
            });
        }

        let workspace = self.config.workspace_bytes;
        let stored = match self.storage.get_mut() {
            Storage::Memory(mem) => {
                let ok = mem.try_push(case, workspace);
                if !ok {
                    debug!(
                        cases = mem.len(),
                        approx_bytes = mem.approx_size(),
                        workspace,
                        "casefile workspace exhausted"
                    );
                }
                ok
            }
            Storage::Disk(_) => false,
        };

        if !stored {
            self.migrate()?;
            let handle = self.idle.get_mut().as_mut().ok_or(CaseError::ProtocolViolation(
                "writable disk casefile has no write handle",
            ))?;
            handle.write_case(case)?;
        }

        self.case_count += 1;
        Ok(())
    }

    /// Moves the casefile to disk now. Does nothing if it is already there.
    ///
    /// Safe to call while readers are open: they re-derive their file
    /// position from their logical case index on the next read.
    pub fn to_disk(&self) -> Result<(), CaseError> {
        self.migrate()
    }

    /// Freezes the casefile and returns a reader positioned at case 0.
    ///
    /// The reader sees exactly the cases present now. Pending disk writes are
    /// flushed first.
    pub fn get_reader(&self) -> Result<Casereader<'_>, CaseError> {
        if self.mode.get() == Mode::Write {
            if let Some(handle) = self.idle.borrow_mut().as_mut() {
                handle.flush()?;
            }
            self.mode.set(Mode::Read);
        }
        Casereader::new(self)
    }

    /// Sorts the cases in place with a stable merge sort.
    ///
    /// Only defined for memory storage; a disk-backed casefile must be
    /// sorted by the external sort engine instead.
    ///
    /// # Errors
    ///
    /// - [`CaseError::ProtocolViolation`] if the casefile is on disk.
    /// - [`CaseError::ResourceExhausted`] if the sort index cannot be allocated.
    pub fn sort_by<F>(&mut self, compare: F) -> Result<(), CaseError>
    where
        F: FnMut(&[u8], &[u8]) -> Ordering,
    {
        match self.storage.get_mut() {
            Storage::Memory(mem) => mem.sort_by(compare),
            Storage::Disk(_) => Err(CaseError::ProtocolViolation(
                "in-memory sort requested on a disk-backed casefile",
            )),
        }
    }

    /// Consumes the casefile, returning a reader that yields every case once
    /// and releases storage as it goes.
    pub fn into_destructive_reader(self) -> Result<DestructiveReader, CaseError> {
        let block_bytes = self.block_bytes();
        let Casefile {
            case_size,
            case_count,
            storage,
            idle,
            ..
        } = self;

        let source = match storage.into_inner() {
            Storage::Memory(mem) => Draining::Memory {
                cases: mem.into_cases().into_iter(),
                current: None,
            },
            Storage::Disk(disk) => {
                let handle = match idle.into_inner() {
                    Some(mut handle) => {
                        handle.flush()?;
                        handle
                    }
                    None => disk.open_handle(block_bytes)?,
                };
                Draining::Disk {
                    cursor: BlockCursor::new(handle),
                    storage: disk,
                }
            }
        };
        Ok(DestructiveReader::new(case_size, case_count, source))
    }

    /// Releases all storage, deleting the temporary file if there is one.
    ///
    /// Dropping the casefile does the same but ignores removal errors.
    pub fn destroy(self) -> Result<(), CaseError> {
        drop(self.idle.into_inner());
        match self.storage.into_inner() {
            Storage::Memory(_) => Ok(()),
            Storage::Disk(disk) => Ok(disk.close()?),
        }
    }

    pub(crate) fn storage(&self) -> &RefCell<Storage> {
        &self.storage
    }

    fn block_bytes(&self) -> usize {
        self.config.block_bytes(self.case_size)
    }

    /// Writes the memory list to a new temporary file in list order and
    /// switches storage to disk. The memory list is only released once every
    /// case is safely written; on error the casefile stays in memory and the
    /// partial file is removed.
    fn migrate(&self) -> Result<(), CaseError> {
        let mut storage = self.storage.borrow_mut();
        let mem = match &*storage {
            Storage::Disk(_) => return Ok(()),
            Storage::Memory(mem) => mem,
        };

        let (disk, mut handle) = DiskStorage::create(&self.config, self.block_bytes())?;
        for case in mem.iter() {
            handle.write_case(case)?;
        }
        if self.mode.get() == Mode::Read {
            handle.flush()?;
        }

        debug!(
            cases = mem.len(),
            case_size = self.case_size,
            path = %disk.path().display(),
            "casefile migrated to disk"
        );
        *storage = Storage::Disk(disk);
        *self.idle.borrow_mut() = Some(handle);
        Ok(())
    }

    /// Takes the idle descriptor if there is one, otherwise opens a new one.
    pub(crate) fn acquire_handle(&self) -> Result<DiskHandle, CaseError> {
        if let Some(handle) = self.idle.borrow_mut().take() {
            trace!("reader reusing idle casefile descriptor");
            return Ok(handle);
        }
        match &*self.storage.borrow() {
            Storage::Disk(disk) => {
                trace!("reader opening its own casefile descriptor");
                Ok(disk.open_handle(self.block_bytes())?)
            }
            Storage::Memory(_) => Err(CaseError::ProtocolViolation(
                "disk descriptor requested for a memory casefile",
            )),
        }
    }

    /// Parks `handle` in the idle slot if it is empty; otherwise closes it.
    pub(crate) fn release_handle(&self, handle: DiskHandle) {
        let mut idle = self.idle.borrow_mut();
        if idle.is_none() {
            *idle = Some(handle);
        }
    }
}

impl fmt::Debug for Casefile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Casefile")
            .field("case_size", &self.case_size)
            .field("case_count", &self.case_count)
            .field("mode", &self.mode.get())
            .field("on_disk", &self.is_on_disk())
            .finish()
    }
}
