use std::cmp::Ordering;
use std::fmt;

use casefile::{CaseError, CaseSource, Casefile, CasefileConfig};
use tracing::info;

use crate::config::{SortConfig, SortPlan};
use crate::error::SortError;
use crate::merge::merge_runs;
use crate::run::{Run, RunReader};
use crate::selection::Tournament;

/// What an external sort did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SortStats {
    pub cases: u64,
    /// Runs produced by replacement selection.
    pub initial_runs: u64,
    /// Zero-length runs added to even out the merge pattern.
    pub dummy_runs: u64,
    pub merges: u64,
    /// Merge depth of the final run; 0 when selection produced a single run.
    pub passes: u32,
}

/// Replacement-selection external merge sort for one case width.
///
/// Construction settles the memory plan and allocates the selection tree,
/// so a workspace too small to sort in (or a tree the allocator refuses)
/// fails here, before any input is read or any file created. An engine
/// sorts once.
///
/// ```no_run
/// use casefile::Casefile;
/// use extsort::{ExternalSort, SortConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut cf = Casefile::new(8);
/// for v in [3u64, 1, 2] {
///     cf.append(&v.to_be_bytes())?;
/// }
/// let engine = ExternalSort::new(SortConfig::default(), 8)?;
/// let sorted = engine.sort(&mut cf.get_reader()?, |a, b| a.cmp(b))?;
/// assert_eq!(sorted.case_count(), 3);
/// # Ok(())
/// # }
/// ```
pub struct ExternalSort {
    config: SortConfig,
    plan: SortPlan,
    tree: Tournament,
}

impl ExternalSort {
    pub fn new(config: SortConfig, case_size: usize) -> Result<Self, SortError> {
        let plan = SortPlan::new(&config, case_size)?;
        let tree = Tournament::new(&plan)?;
        Ok(Self { config, plan, tree })
    }

    pub fn plan(&self) -> &SortPlan {
        &self.plan
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Sorts every remaining case of `source` into a single run.
    ///
    /// Sorting is not stable. On error every run file created so far is
    /// removed.
    pub fn sort<S, F>(self, source: &mut S, mut compare: F) -> Result<SortedRun, SortError>
    where
        S: CaseSource + ?Sized,
        F: FnMut(&[u8], &[u8]) -> Ordering,
    {
        if source.case_size() != self.plan.case_size {
            return Err(CaseError::CaseSize {
                expected: self.plan.case_size,
                actual: source.case_size(),
            }
            .into());
        }
        info!(
            case_size = self.plan.case_size,
            tree_records = self.plan.tree_records,
            merge_order = self.plan.merge_order,
            "external sort starting"
        );

        let runs = self.tree.form_runs(source, &mut compare, &self.config)?;
        let mut stats = SortStats {
            cases: runs.iter().map(|r| r.len).sum(),
            initial_runs: runs.len() as u64,
            ..SortStats::default()
        };

        let (run, counts) = merge_runs(runs, &self.plan, &self.config, &mut compare)?;
        stats.dummy_runs = counts.dummy_runs;
        stats.merges = counts.merges;
        stats.passes = run.as_ref().map_or(0, |r| r.depth);
        info!(
            cases = stats.cases,
            initial_runs = stats.initial_runs,
            merges = stats.merges,
            passes = stats.passes,
            "external sort finished"
        );

        Ok(SortedRun {
            run,
            case_size: self.plan.case_size,
            buffer_records: self.plan.buffer_records,
            stats,
        })
    }
}

impl fmt::Debug for ExternalSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalSort")
            .field("config", &self.config)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

/// The sorted output of an [`ExternalSort`]: one run file, removed on drop.
#[derive(Debug)]
pub struct SortedRun {
    run: Option<Run>,
    case_size: usize,
    buffer_records: usize,
    stats: SortStats,
}

impl SortedRun {
    pub fn stats(&self) -> &SortStats {
        &self.stats
    }

    pub fn case_count(&self) -> u64 {
        self.run.as_ref().map_or(0, |r| r.len)
    }

    pub fn case_size(&self) -> usize {
        self.case_size
    }

    /// Opens a fresh reader at the first sorted case.
    pub fn reader(&self) -> Result<RunReader, SortError> {
        match &self.run {
            Some(run) => RunReader::open(run, self.case_size, self.buffer_records),
            None => RunReader::open(&Run::dummy(), self.case_size, self.buffer_records),
        }
    }

    /// Feeds the sorted cases to `sink` until it returns `false`.
    pub fn write_to<F>(&self, sink: F) -> Result<u64, SortError>
    where
        F: FnMut(&[u8]) -> bool,
    {
        self.reader()?.write_to(sink)
    }

    /// Copies the sorted cases into a new casefile and removes the run file.
    pub fn into_casefile(self, config: CasefileConfig) -> Result<Casefile, SortError> {
        let mut casefile = Casefile::with_config(self.case_size, config);
        let mut reader = self.reader()?;
        while let Some(case) = reader.read()? {
            casefile.append(case)?;
        }
        drop(reader);
        self.close()?;
        Ok(casefile)
    }

    /// Removes the run file, reporting removal errors.
    pub fn close(self) -> Result<(), SortError> {
        match self.run {
            Some(run) => Ok(run.close()?),
            None => Ok(()),
        }
    }
}
