//! # Extsort
//!
//! External merge sort for fixed-width cases.
//!
//! ## Phases
//!
//! 1. **Run formation.** Replacement selection with a tree of losers reads
//!    the input once and writes sorted runs, each in its own temporary file.
//!    Runs average twice the tree size on random input.
//! 2. **Merge.** Runs are merged P at a time, always picking the P shortest
//!    from a min-heap keyed by length. Zero-length dummy runs are added first
//!    so every merge is a full P-way merge. The pattern ends with one run.
//!
//! P is the largest order allowed by [`SortConfig::max_merge_order`], the
//! file-handle budget and the minimum per-input buffer size. Run files carry
//! a footer (see [`format`]) that is verified on read-back.
//!
//! Sorting is not stable: cases that compare equal may come out in any
//! order.
//!
//! ## Example
//! ```rust
//! use casefile::Casefile;
//! use extsort::{sort_casefile, SortConfig};
//!
//! let mut cf = Casefile::new(4);
//! for v in [30u32, 10, 20] {
//!     cf.append(&v.to_be_bytes()).unwrap();
//! }
//! sort_casefile(&mut cf, |a, b| a.cmp(b), &SortConfig::default()).unwrap();
//! let mut r = cf.get_reader().unwrap();
//! assert_eq!(r.read().unwrap(), Some(&10u32.to_be_bytes()[..]));
//! ```

use std::cmp::Ordering;
use std::mem;

use casefile::{CaseError, Casefile};
use tracing::debug;

mod config;
mod error;
pub mod format;
mod merge;
mod run;
mod selection;
mod sorter;

pub use config::{
    SortConfig, SortPlan, DEFAULT_MAX_FILE_HANDLES, MAX_MERGE_ORDER, MIN_BUFFER_SIZE_BYTES,
    MIN_BUFFER_SIZE_RECS, MIN_BUFFER_TOTAL_SIZE_RECS,
};
pub use error::SortError;
pub use run::RunReader;
pub use sorter::{ExternalSort, SortStats, SortedRun};

/// Sorts a casefile in place.
///
/// Fewer than two cases need no work. A memory-backed casefile is sorted in
/// memory. A disk-backed one (or one whose in-memory sort index cannot be
/// allocated) is drained through the external sort engine and replaced by a
/// new casefile with the same configuration holding the sorted cases.
///
/// # Errors
///
/// If the engine cannot be set up (see [`ExternalSort::new`]) the casefile is
/// left untouched. An error after that point leaves it empty: its cases
/// have already been handed to the engine, and every temporary file is
/// removed.
pub fn sort_casefile<F>(
    casefile: &mut Casefile,
    mut compare: F,
    config: &SortConfig,
) -> Result<(), SortError>
where
    F: FnMut(&[u8], &[u8]) -> Ordering,
{
    if casefile.case_count() < 2 {
        return Ok(());
    }
    if !casefile.is_on_disk() {
        match casefile.sort_by(&mut compare) {
            Ok(()) => {
                debug!(cases = casefile.case_count(), "sorted in memory");
                return Ok(());
            }
            Err(CaseError::ResourceExhausted(reason)) => {
                debug!(%reason, "in-memory sort unavailable, sorting externally");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let case_size = casefile.case_size();
    let engine = ExternalSort::new(config.clone(), case_size)?;
    let output_config = casefile.config().clone();
    let placeholder = Casefile::with_config(case_size, output_config.clone());
    let input = mem::replace(casefile, placeholder);
    let mut source = input.into_destructive_reader()?;
    let sorted = engine.sort(&mut source, &mut compare)?;
    source.finish()?;
    *casefile = sorted.into_casefile(output_config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use casefile::CasefileConfig;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tempfile::tempdir;

    fn key(case: &[u8]) -> u32 {
        u32::from_le_bytes([case[0], case[1], case[2], case[3]])
    }

    fn by_key(a: &[u8], b: &[u8]) -> Ordering {
        key(a).cmp(&key(b))
    }

    fn drain(cf: &Casefile) -> Result<Vec<Vec<u8>>> {
        let mut r = cf.get_reader()?;
        let mut out = Vec::new();
        while let Some(c) = r.read()? {
            out.push(c.to_vec());
        }
        Ok(out)
    }

    fn random_cases(n: usize, seed: u64) -> Vec<[u8; 12]> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let mut c = [0u8; 12];
                c[..4].copy_from_slice(&rng.random_range(0..500u32).to_le_bytes());
                rng.fill(&mut c[4..]);
                c
            })
            .collect()
    }

    fn assert_sorted_permutation(out: &[Vec<u8>], input: &[[u8; 12]]) {
        assert!(out.windows(2).all(|w| by_key(&w[0], &w[1]) != Ordering::Greater));
        let mut a: Vec<Vec<u8>> = out.to_vec();
        let mut b: Vec<Vec<u8>> = input.iter().map(|c| c.to_vec()).collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    fn load(config: CasefileConfig, cases: &[[u8; 12]]) -> Result<Casefile> {
        let mut cf = Casefile::with_config(12, config);
        for c in cases {
            cf.append(c)?;
        }
        Ok(cf)
    }

    // -------------------- Bypass paths --------------------

    #[test]
    fn memory_casefile_sorts_in_place() -> Result<()> {
        let input = random_cases(2_000, 1);
        let mut cf = load(CasefileConfig::default(), &input)?;
        sort_casefile(&mut cf, by_key, &SortConfig::default())?;
        assert!(!cf.is_on_disk());
        assert_sorted_permutation(&drain(&cf)?, &input);
        Ok(())
    }

    #[test]
    fn trivial_casefiles() -> Result<()> {
        let mut cf = Casefile::new(12);
        sort_casefile(&mut cf, by_key, &SortConfig::default())?;
        assert_eq!(cf.case_count(), 0);

        let mut cf = Casefile::new(12);
        cf.append(&[7; 12])?;
        sort_casefile(&mut cf, by_key, &SortConfig::default())?;
        assert_eq!(drain(&cf)?, vec![vec![7; 12]]);
        Ok(())
    }

    #[test]
    fn single_disk_case_skips_the_engine() -> Result<()> {
        let dir = tempdir()?;
        let config = CasefileConfig::default().with_temp_dir(dir.path());
        let mut cf = load(config, &random_cases(1, 4))?;
        cf.to_disk()?;
        let before = drain(&cf)?;

        // far too small for the external engine
        sort_casefile(&mut cf, by_key, &SortConfig::default().with_workspace(64))?;
        assert!(cf.is_on_disk());
        assert_eq!(drain(&cf)?, before);

        let config = CasefileConfig::default().with_temp_dir(dir.path());
        let mut empty = Casefile::with_config(12, config);
        empty.to_disk()?;
        sort_casefile(&mut empty, by_key, &SortConfig::default().with_workspace(64))?;
        assert_eq!(empty.case_count(), 0);
        Ok(())
    }

    // -------------------- External path --------------------

    #[test]
    fn disk_casefile_sorts_externally() -> Result<()> {
        let dir = tempdir()?;
        let cf_config = CasefileConfig::default()
            .with_workspace(1024)
            .with_block_size(120)
            .with_temp_dir(dir.path());
        let sort_config = SortConfig::default()
            .with_workspace(28 * 32)
            .with_min_buffers(64, 2, 8)
            .with_temp_dir(dir.path());

        let input = random_cases(3_000, 2);
        let mut cf = load(cf_config.clone(), &input)?;
        assert!(cf.is_on_disk());

        sort_casefile(&mut cf, by_key, &sort_config)?;
        assert_eq!(cf.config(), &cf_config);
        assert_eq!(cf.case_count(), 3_000);
        assert_sorted_permutation(&drain(&cf)?, &input);

        // only the sorted casefile's own temp file remains
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        drop(cf);
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn undersized_workspace_leaves_input_intact() -> Result<()> {
        let dir = tempdir()?;
        let cf_config = CasefileConfig::default()
            .with_workspace(0)
            .with_temp_dir(dir.path());
        let input = random_cases(10, 3);
        let mut cf = load(cf_config, &input)?;

        let config = SortConfig::default().with_workspace(64);
        let err = sort_casefile(&mut cf, by_key, &config).unwrap_err();
        assert!(matches!(err, SortError::ResourceExhausted(_)));
        assert_eq!(cf.case_count(), 10);
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        assert_eq!(drain(&cf)?, input.iter().map(|c| c.to_vec()).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn unallocatable_tree_leaves_input_intact() -> Result<()> {
        let dir = tempdir()?;
        let cf_config = CasefileConfig::default()
            .with_workspace(0)
            .with_temp_dir(dir.path());
        let input = random_cases(10, 5);
        let mut cf = load(cf_config, &input)?;

        // the plan fits the limits but no allocator can provide the tree
        let config = SortConfig::default()
            .with_workspace(1 << 60)
            .with_temp_dir(dir.path());
        let err = sort_casefile(&mut cf, by_key, &config).unwrap_err();
        assert!(matches!(err, SortError::ResourceExhausted(_)));
        assert!(cf.is_on_disk());
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
        assert_eq!(drain(&cf)?, input.iter().map(|c| c.to_vec()).collect::<Vec<_>>());
        Ok(())
    }
}
