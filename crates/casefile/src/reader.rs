use crate::casefile::{Casefile, Storage};
use crate::disk::{BlockCursor, DiskStorage};
use crate::error::CaseError;
use crate::CaseSource;

/// Independent sequential cursor over a [`Casefile`].
///
/// A reader yields the cases present when it was created, in append order,
/// regardless of what other readers do. Its position is a logical case
/// index, so a migration to disk in the middle of a traversal changes
/// nothing about the cases it returns.
pub struct Casereader<'a> {
    casefile: &'a Casefile,
    index: u64,
    case_count: u64,
    cursor: Option<BlockCursor>,
    /// Copy of the current case while the casefile is in memory.
    current: Vec<u8>,
}

impl<'a> Casereader<'a> {
    pub(crate) fn new(casefile: &'a Casefile) -> Result<Self, CaseError> {
        let mut reader = Self {
            casefile,
            index: 0,
            case_count: casefile.case_count(),
            cursor: None,
            current: vec![0u8; casefile.case_size()],
        };
        if casefile.is_on_disk() {
            let mut cursor = BlockCursor::new(casefile.acquire_handle()?);
            if reader.case_count > 0 {
                cursor.load(0, casefile.case_size(), reader.case_count)?;
            }
            reader.cursor = Some(cursor);
        }
        Ok(reader)
    }

    /// Returns the next case, or `None` once every case present at creation
    /// has been read.
    pub fn read(&mut self) -> Result<Option<&[u8]>, CaseError> {
        if self.index >= self.case_count {
            return Ok(None);
        }
        let index = self.index;

        let on_disk = match &*self.casefile.storage().borrow() {
            Storage::Memory(mem) => {
                self.current.copy_from_slice(mem.get(index as usize));
                false
            }
            Storage::Disk(_) => true,
        };
        if !on_disk {
            self.index += 1;
            return Ok(Some(&self.current));
        }

        if self.cursor.is_none() {
            // Storage migrated under us; resume from the logical index.
            self.cursor = Some(BlockCursor::new(self.casefile.acquire_handle()?));
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return Err(CaseError::ProtocolViolation("reader lost its disk cursor"));
        };
        let case = cursor.case_at(index, self.casefile.case_size(), self.case_count)?;
        self.index += 1;
        Ok(Some(case))
    }

    /// Feeds the remaining cases to `sink` until it returns `false` or the
    /// reader is exhausted. Returns the number of cases delivered.
    pub fn write_to<F>(&mut self, mut sink: F) -> Result<u64, CaseError>
    where
        F: FnMut(&[u8]) -> bool,
    {
        let mut delivered = 0;
        while let Some(case) = self.read()? {
            delivered += 1;
            if !sink(case) {
                break;
            }
        }
        Ok(delivered)
    }

    /// Logical index of the next case to be read.
    pub fn position(&self) -> u64 {
        self.index
    }

    /// Number of cases this reader will yield in total.
    pub fn case_count(&self) -> u64 {
        self.case_count
    }

    pub fn remaining(&self) -> u64 {
        self.case_count - self.index
    }
}

impl Drop for Casereader<'_> {
    fn drop(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            self.casefile.release_handle(cursor.into_handle());
        }
    }
}

impl CaseSource for Casereader<'_> {
    fn case_size(&self) -> usize {
        self.casefile.case_size()
    }

    fn case_count(&self) -> u64 {
        self.case_count
    }

    fn next_case(&mut self) -> Result<Option<&[u8]>, CaseError> {
        self.read()
    }
}

pub(crate) enum Draining {
    Memory {
        cases: std::vec::IntoIter<Box<[u8]>>,
        current: Option<Box<[u8]>>,
    },
    Disk {
        cursor: BlockCursor,
        storage: DiskStorage,
    },
}

/// Single-pass reader that owns its casefile's storage.
///
/// Memory cases are freed one by one as they are read; a disk file is
/// deleted when the reader is dropped or [`finish`](Self::finish)ed.
pub struct DestructiveReader {
    case_size: usize,
    case_count: u64,
    index: u64,
    source: Draining,
}

impl DestructiveReader {
    pub(crate) fn new(case_size: usize, case_count: u64, source: Draining) -> Self {
        Self {
            case_size,
            case_count,
            index: 0,
            source,
        }
    }

    pub fn read(&mut self) -> Result<Option<&[u8]>, CaseError> {
        if self.index >= self.case_count {
            return Ok(None);
        }
        let index = self.index;
        let case = match &mut self.source {
            Draining::Memory { cases, current } => {
                *current = cases.next();
                match current.as_deref() {
                    Some(case) => case,
                    None => return Err(CaseError::UnexpectedEof { index }),
                }
            }
            Draining::Disk { cursor, .. } => cursor.case_at(index, self.case_size, self.case_count)?,
        };
        self.index += 1;
        Ok(Some(case))
    }

    pub fn case_count(&self) -> u64 {
        self.case_count
    }

    pub fn remaining(&self) -> u64 {
        self.case_count - self.index
    }

    /// Releases remaining storage, reporting temp-file removal errors.
    pub fn finish(self) -> Result<(), CaseError> {
        match self.source {
            Draining::Memory { .. } => Ok(()),
            Draining::Disk { cursor, storage } => {
                drop(cursor);
                Ok(storage.close()?)
            }
        }
    }
}

impl CaseSource for DestructiveReader {
    fn case_size(&self) -> usize {
        self.case_size
    }

    fn case_count(&self) -> u64 {
        self.case_count
    }

    fn next_case(&mut self) -> Result<Option<&[u8]>, CaseError> {
        self.read()
    }
}
