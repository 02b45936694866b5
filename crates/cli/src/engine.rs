//! Record-file operations behind the `casesort` subcommands: generate,
//! sort and check files of fixed-width binary records.

use anyhow::{bail, Context, Result};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use casefile::{Casefile, CasefileConfig};
use extsort::{sort_casefile, SortConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// How the key bytes of a record are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum KeyKind {
    /// Unsigned lexicographic byte order.
    #[default]
    Bytes,
    U64le,
    I64le,
    /// IEEE total order, so NaNs sort after every number.
    F64le,
}

/// The slice of each record that records are ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpec {
    pub offset: usize,
    pub len: usize,
    pub kind: KeyKind,
    pub reverse: bool,
}

impl KeySpec {
    /// Parses `offset:len`.
    pub fn parse(s: &str, kind: KeyKind, reverse: bool) -> Result<Self> {
        let Some((offset, len)) = s.split_once(':') else {
            bail!("key must be offset:len, got {s:?}");
        };
        let offset = offset.trim().parse().with_context(|| format!("bad key offset in {s:?}"))?;
        let len = len.trim().parse().with_context(|| format!("bad key length in {s:?}"))?;
        Ok(Self {
            offset,
            len,
            kind,
            reverse,
        })
    }

    /// Checks the key fits in a record and suits its kind.
    pub fn validate(&self, record_size: usize) -> Result<()> {
        if self.len == 0 {
            bail!("key length must be nonzero");
        }
        if self.offset + self.len > record_size {
            bail!(
                "key {}:{} does not fit in {}-byte records",
                self.offset,
                self.len,
                record_size
            );
        }
        if self.kind != KeyKind::Bytes && self.len != 8 {
            bail!("{:?} keys are 8 bytes, got {}", self.kind, self.len);
        }
        Ok(())
    }

    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let range = self.offset..self.offset + self.len;
        let (ka, kb) = (&a[range.clone()], &b[range]);
        let ord = match self.kind {
            KeyKind::Bytes => ka.cmp(kb),
            KeyKind::U64le => LittleEndian::read_u64(ka).cmp(&LittleEndian::read_u64(kb)),
            KeyKind::I64le => LittleEndian::read_i64(ka).cmp(&LittleEndian::read_i64(kb)),
            KeyKind::F64le => LittleEndian::read_f64(ka).total_cmp(&LittleEndian::read_f64(kb)),
        };
        if self.reverse {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// Number of whole records in `path`, rejecting files with a partial tail.
fn record_count(path: &Path, record_size: usize) -> Result<u64> {
    let len = std::fs::metadata(path)
        .with_context(|| format!("cannot stat {}", path.display()))?
        .len();
    if len % record_size as u64 != 0 {
        bail!(
            "{} is {} bytes, not a multiple of the {}-byte record size",
            path.display(),
            len,
            record_size
        );
    }
    Ok(len / record_size as u64)
}

/// Writes `count` records whose first 8 bytes are a shuffled permutation of
/// `0..count` (u64 LE), followed by random payload.
pub fn generate(path: &Path, count: u64, record_size: usize, seed: u64) -> Result<()> {
    if record_size < 8 {
        bail!("records must be at least 8 bytes to hold the key");
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keys: Vec<u64> = (0..count).collect();
    algo::shuffle(&mut keys, &mut rng);

    let mut out = BufWriter::new(File::create(path)?);
    let mut payload = vec![0u8; record_size - 8];
    for key in keys {
        out.write_u64::<LittleEndian>(key)?;
        rng.fill(&mut payload[..]);
        out.write_all(&payload)?;
    }
    out.flush()?;
    info!(path = %path.display(), count, record_size, "records generated");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SortOptions {
    pub record_size: usize,
    pub key: KeySpec,
    /// Stop after writing this many records.
    pub limit: Option<u64>,
    pub config: SortConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSummary {
    pub records_in: u64,
    pub records_out: u64,
    /// Whether the input overflowed the workspace and went through disk.
    pub spilled: bool,
}

/// Loads `input` into a casefile, sorts it and writes the result to `output`.
pub fn sort_file(input: &Path, output: &Path, opts: &SortOptions) -> Result<SortSummary> {
    opts.key.validate(opts.record_size)?;
    let records_in = record_count(input, opts.record_size)?;

    let mut casefile = Casefile::with_config(opts.record_size, opts.config.casefile_config());
    let mut reader = BufReader::new(File::open(input)?);
    let mut record = vec![0u8; opts.record_size];
    for _ in 0..records_in {
        reader.read_exact(&mut record)?;
        casefile.append(&record)?;
    }
    let spilled = casefile.is_on_disk();
    debug!(records = records_in, spilled, "input loaded");

    let key = opts.key;
    sort_casefile(&mut casefile, |a, b| key.compare(a, b), &opts.config)?;

    let mut out = BufWriter::new(File::create(output)?);
    let mut records_out = 0u64;
    if opts.limit != Some(0) {
        let mut write_err = None;
        let mut cases = casefile.get_reader()?;
        cases.write_to(|case| {
            if let Err(e) = out.write_all(case) {
                write_err = Some(e);
                return false;
            }
            records_out += 1;
            opts.limit.map_or(true, |limit| records_out < limit)
        })?;
        if let Some(e) = write_err {
            return Err(e).with_context(|| format!("writing {}", output.display()));
        }
    }
    out.flush()?;

    info!(records_in, records_out, spilled, "sort finished");
    Ok(SortSummary {
        records_in,
        records_out,
        spilled,
    })
}

/// Result of [`check_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    pub records: u64,
    /// Index of the first record that sorts before its predecessor.
    pub first_violation: Option<u64>,
}

/// Streams `input` and reports whether its records are in key order.
pub fn check_file(input: &Path, record_size: usize, key: &KeySpec) -> Result<CheckReport> {
    key.validate(record_size)?;
    let records = record_count(input, record_size)?;
    let mut reader = BufReader::new(File::open(input)?);
    let mut prev = vec![0u8; record_size];
    let mut cur = vec![0u8; record_size];

    for i in 0..records {
        reader.read_exact(&mut cur)?;
        if i > 0 && key.compare(&prev, &cur) == Ordering::Greater {
            return Ok(CheckReport {
                records,
                first_violation: Some(i),
            });
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    Ok(CheckReport {
        records,
        first_violation: None,
    })
}

/// Storage settings for a sort that keeps everything under `temp_dir`.
pub fn sort_config(
    workspace: usize,
    block_size: usize,
    temp_dir: Option<&Path>,
    max_merge_order: usize,
) -> SortConfig {
    let mut casefile = CasefileConfig::default()
        .with_workspace(workspace)
        .with_block_size(block_size);
    if let Some(dir) = temp_dir {
        casefile = casefile.with_temp_dir(dir);
    }
    SortConfig::from(&casefile).with_max_merge_order(max_merge_order)
}
