//! Run files: sorted sequences of cases produced by replacement selection
//! and consumed (and produced) by the merge phase.
//!
//! Each run lives in its own temporary file, removed when the [`Run`] that
//! owns it is dropped or closed.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};

use crc32fast::Hasher;
use tempfile::{Builder, TempPath};
use tracing::trace;

use crate::config::SortConfig;
use crate::error::SortError;
use crate::format::{read_footer, write_footer, RUN_MAGIC};

/// A finished run: its file, its case count and its merge depth.
///
/// Dummy runs have no file and no cases; they only pad the merge pattern.
#[derive(Debug)]
pub(crate) struct Run {
    path: Option<TempPath>,
    pub(crate) len: u64,
    /// 0 for initial runs, otherwise one more than the deepest merged input.
    pub(crate) depth: u32,
}

impl Run {
    pub(crate) fn dummy() -> Self {
        Self {
            path: None,
            len: 0,
            depth: 0,
        }
    }

    pub(crate) fn is_dummy(&self) -> bool {
        self.path.is_none()
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> Option<&std::path::Path> {
        self.path.as_deref()
    }

    /// Deletes the run file, reporting removal errors.
    pub(crate) fn close(self) -> io::Result<()> {
        match self.path {
            Some(path) => path.close(),
            None => Ok(()),
        }
    }
}

/// Appends cases to a fresh run file.
pub(crate) struct RunWriter {
    out: BufWriter<File>,
    path: TempPath,
    hasher: Hasher,
    count: u64,
}

impl RunWriter {
    pub(crate) fn create(config: &SortConfig) -> Result<Self, SortError> {
        let mut builder = Builder::new();
        builder.prefix("run-").suffix(".tmp");
        let tmp = match &config.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let (file, path) = tmp.into_parts();
        trace!(path = %path.display(), "run file created");
        Ok(Self {
            out: BufWriter::with_capacity(config.block_size.max(1), file),
            path,
            hasher: Hasher::new(),
            count: 0,
        })
    }

    pub(crate) fn write(&mut self, case: &[u8]) -> io::Result<()> {
        self.hasher.update(case);
        self.out.write_all(case)?;
        self.count += 1;
        Ok(())
    }

    /// Writes the footer and flushes, handing the file over to a [`Run`].
    pub(crate) fn finish(mut self, depth: u32) -> Result<Run, SortError> {
        let crc = self.hasher.finalize();
        write_footer(&mut self.out, self.count, crc)?;
        self.out.flush()?;
        Ok(Run {
            path: Some(self.path),
            len: self.count,
            depth,
        })
    }
}

/// Buffered sequential reader over one run.
///
/// The buffer is refilled eagerly: after construction and after every
/// [`advance`](Self::advance) the head case is available unless the run is
/// exhausted. The footer is checked as soon as the last case has been
/// loaded.
pub struct RunReader {
    file: Option<File>,
    case_size: usize,
    buffer: Vec<u8>,
    pos: usize,
    filled: usize,
    /// Cases still in the file, not yet loaded.
    unloaded: u64,
    case_count: u64,
    hasher: Hasher,
    pending_advance: bool,
}

impl RunReader {
    pub(crate) fn open(run: &Run, case_size: usize, buffer_records: usize) -> Result<Self, SortError> {
        let file = match &run.path {
            Some(path) => Some(File::open(path)?),
            None => None,
        };
        let buffer_records = buffer_records.max(1);
        let capacity = buffer_records as u64 * case_size as u64;
        let buffer_len = capacity.min(run.len.saturating_mul(case_size as u64)) as usize;
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(buffer_len).map_err(|_| {
            SortError::ResourceExhausted(format!("no room for a {buffer_len}-byte run buffer"))
        })?;
        buffer.resize(buffer_len, 0);

        let mut reader = Self {
            file,
            case_size,
            buffer,
            pos: 0,
            filled: 0,
            unloaded: run.len,
            case_count: run.len,
            hasher: Hasher::new(),
            pending_advance: false,
        };
        reader.fill()?;
        Ok(reader)
    }

    fn fill(&mut self) -> Result<(), SortError> {
        self.pos = 0;
        self.filled = 0;
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        if self.unloaded > 0 {
            let cases = (self.buffer.len() / self.case_size).min(self.unloaded as usize);
            let bytes = cases * self.case_size;
            if let Err(e) = file.read_exact(&mut self.buffer[..bytes]) {
                return Err(match e.kind() {
                    io::ErrorKind::UnexpectedEof => SortError::UnexpectedEof {
                        read: self.case_count - self.unloaded,
                        expected: self.case_count,
                    },
                    _ => e.into(),
                });
            }
            self.hasher.update(&self.buffer[..bytes]);
            self.unloaded -= cases as u64;
            self.filled = bytes;
        }
        if self.unloaded == 0 {
            self.verify_footer()?;
        }
        Ok(())
    }

    fn verify_footer(&mut self) -> Result<(), SortError> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        let footer = read_footer(&mut file).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => SortError::Corrupt("truncated footer".into()),
            _ => e.into(),
        })?;
        if footer.magic != RUN_MAGIC {
            return Err(SortError::Corrupt(format!("bad magic {:#010x}", footer.magic)));
        }
        if footer.case_count != self.case_count {
            return Err(SortError::Corrupt(format!(
                "footer records {} cases, run holds {}",
                footer.case_count, self.case_count
            )));
        }
        let crc = self.hasher.clone().finalize();
        if footer.crc != crc {
            return Err(SortError::Corrupt(format!(
                "checksum mismatch: footer {:#010x}, data {:#010x}",
                footer.crc, crc
            )));
        }
        Ok(())
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.pos >= self.filled
    }

    /// Current head case. Must not be called once exhausted.
    pub(crate) fn head(&self) -> &[u8] {
        debug_assert!(!self.is_exhausted());
        &self.buffer[self.pos..self.pos + self.case_size]
    }

    pub(crate) fn advance(&mut self) -> Result<(), SortError> {
        self.pos += self.case_size;
        if self.pos >= self.filled {
            self.fill()?;
        }
        Ok(())
    }

    /// Returns the next case, or `None` at the end of the run.
    pub fn read(&mut self) -> Result<Option<&[u8]>, SortError> {
        if self.pending_advance {
            self.pending_advance = false;
            self.advance()?;
        }
        if self.is_exhausted() {
            return Ok(None);
        }
        self.pending_advance = true;
        Ok(Some(self.head()))
    }

    /// Feeds cases to `sink` until it returns `false` or the run ends.
    /// Returns the number of cases delivered.
    pub fn write_to<F>(&mut self, mut sink: F) -> Result<u64, SortError>
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

    pub fn case_count(&self) -> u64 {
        self.case_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FOOTER_BYTES;
    use anyhow::Result;
    use std::fs::OpenOptions;
    use std::io::{Seek, SeekFrom};
    use tempfile::tempdir;

    fn write_run(config: &SortConfig, cases: &[[u8; 4]]) -> Result<Run> {
        let mut w = RunWriter::create(config)?;
        for c in cases {
            w.write(c)?;
        }
        Ok(w.finish(0)?)
    }

    fn read_all(run: &Run, buffer_records: usize) -> Result<Vec<[u8; 4]>> {
        let mut r = RunReader::open(run, 4, buffer_records)?;
        let mut out = Vec::new();
        while let Some(c) = r.read()? {
            out.push(c.try_into()?);
        }
        Ok(out)
    }

    fn cases(n: u32) -> Vec<[u8; 4]> {
        (0..n).map(u32::to_le_bytes).collect()
    }

    // -------------------- Round trip --------------------

    #[test]
    fn read_back_with_small_buffers() -> Result<()> {
        let dir = tempdir()?;
        let config = SortConfig::default().with_temp_dir(dir.path());
        let input = cases(103);
        let run = write_run(&config, &input)?;
        assert_eq!(run.len, 103);

        for buffer_records in [1, 7, 103, 1000] {
            assert_eq!(read_all(&run, buffer_records)?, input);
        }
        Ok(())
    }

    #[test]
    fn empty_run_and_dummy() -> Result<()> {
        let dir = tempdir()?;
        let config = SortConfig::default().with_temp_dir(dir.path());
        let run = write_run(&config, &[])?;
        assert!(read_all(&run, 4)?.is_empty());
        assert!(read_all(&Run::dummy(), 4)?.is_empty());
        assert!(Run::dummy().is_dummy());
        Ok(())
    }

    #[test]
    fn close_removes_file() -> Result<()> {
        let dir = tempdir()?;
        let config = SortConfig::default().with_temp_dir(dir.path());
        let run = write_run(&config, &cases(3))?;
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        run.close()?;
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);

        drop(write_run(&config, &cases(3))?);
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn write_to_stops_early() -> Result<()> {
        let dir = tempdir()?;
        let config = SortConfig::default().with_temp_dir(dir.path());
        let run = write_run(&config, &cases(10))?;
        let mut r = RunReader::open(&run, 4, 3)?;
        let mut seen = 0;
        let delivered = r.write_to(|_| {
            seen += 1;
            seen < 5
        })?;
        assert_eq!(delivered, 5);
        assert_eq!(r.read()?, Some(&5u32.to_le_bytes()[..]));
        Ok(())
    }

    // -------------------- Integrity --------------------

    fn path_of(run: &Run) -> std::path::PathBuf {
        run.path.as_ref().map(|p| p.to_path_buf()).unwrap()
    }

    #[test]
    fn flipped_byte_is_corrupt() -> Result<()> {
        let dir = tempdir()?;
        let config = SortConfig::default().with_temp_dir(dir.path());
        let run = write_run(&config, &cases(20))?;
        let mut f = OpenOptions::new().write(true).open(path_of(&run))?;
        f.seek(SeekFrom::Start(9))?;
        f.write_all(&[0xFF])?;
        drop(f);

        let err = read_all(&run, 8).unwrap_err();
        assert!(matches!(err.downcast_ref::<SortError>(), Some(SortError::Corrupt(_))));
        Ok(())
    }

    #[test]
    fn truncated_data_is_unexpected_eof() -> Result<()> {
        let dir = tempdir()?;
        let config = SortConfig::default().with_temp_dir(dir.path());
        let run = write_run(&config, &cases(20))?;
        let f = OpenOptions::new().write(true).open(path_of(&run))?;
        f.set_len(4 * 10)?;
        drop(f);

        let err = read_all(&run, 4).unwrap_err();
        match err.downcast_ref::<SortError>() {
            Some(SortError::UnexpectedEof { read, expected }) => {
                assert_eq!(*expected, 20);
                assert_eq!(*read, 8);
            }
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn truncated_footer_is_corrupt() -> Result<()> {
        let dir = tempdir()?;
        let config = SortConfig::default().with_temp_dir(dir.path());
        let run = write_run(&config, &cases(5))?;
        let f = OpenOptions::new().write(true).open(path_of(&run))?;
        f.set_len(4 * 5 + FOOTER_BYTES - 1)?;
        drop(f);

        let err = read_all(&run, 16).unwrap_err();
        assert!(matches!(err.downcast_ref::<SortError>(), Some(SortError::Corrupt(_))));
        Ok(())
    }
}
