//! Merge phase: combines runs P at a time, shortest first, until one is left.
//!
//! Dummy runs pad the run count so `(K - 1) % (P - 1) == 0`; every merge is
//! then a full P-way merge and the pattern is a Huffman tree over run
//! lengths, which minimises the total number of cases rewritten.

use std::cmp::Ordering;

use minheap::Heap;
use tracing::{debug, info};

use crate::config::{SortConfig, SortPlan};
use crate::error::SortError;
use crate::run::{Run, RunReader, RunWriter};

/// Counters gathered during the merge phase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MergeCounts {
    pub(crate) dummy_runs: u64,
    pub(crate) merges: u64,
}

/// Number of zero-length runs needed so `runs` reduces to one by full
/// `order`-way merges.
pub(crate) fn dummy_runs_needed(runs: usize, order: usize) -> usize {
    if runs <= 1 || order < 2 {
        return 0;
    }
    let rem = (runs - 1) % (order - 1);
    if rem == 0 {
        0
    } else {
        order - 1 - rem
    }
}

/// Merges `runs` down to a single run. Returns `None` when there are no runs.
pub(crate) fn merge_runs<F>(
    runs: Vec<Run>,
    plan: &SortPlan,
    config: &SortConfig,
    compare: &mut F,
) -> Result<(Option<Run>, MergeCounts), SortError>
where
    F: FnMut(&[u8], &[u8]) -> Ordering,
{
    let mut counts = MergeCounts::default();
    if runs.len() <= 1 {
        return Ok((runs.into_iter().next(), counts));
    }

    let order = plan.merge_order;
    let dummies = dummy_runs_needed(runs.len(), order);
    counts.dummy_runs = dummies as u64;
    info!(
        runs = runs.len(),
        merge_order = order,
        dummy_runs = dummies,
        "merge phase starting"
    );

    let mut slots: Vec<Option<Run>> = Vec::with_capacity(runs.len() + dummies);
    let mut heap = Heap::new(runs.len() + dummies);
    for run in runs.into_iter().chain((0..dummies).map(|_| Run::dummy())) {
        heap.insert(slots.len(), run.len);
        slots.push(Some(run));
    }

    while heap.size() > 1 {
        let mut inputs = Vec::with_capacity(order);
        while inputs.len() < order {
            let Some((index, _)) = heap.delete_min() else {
                break;
            };
            if let Some(run) = slots[index].take() {
                inputs.push(run);
            }
        }
        let merged = merge_once(inputs, plan, config, compare)?;
        counts.merges += 1;
        heap.insert(slots.len(), merged.len);
        slots.push(Some(merged));
    }

    let last = heap.delete_min().and_then(|(index, _)| slots[index].take());
    Ok((last, counts))
}

/// One P-way merge: the inputs are consumed and their files removed.
fn merge_once<F>(
    inputs: Vec<Run>,
    plan: &SortPlan,
    config: &SortConfig,
    compare: &mut F,
) -> Result<Run, SortError>
where
    F: FnMut(&[u8], &[u8]) -> Ordering,
{
    let expected: u64 = inputs.iter().map(|r| r.len).sum();
    let depth = inputs.iter().map(|r| r.depth).max().unwrap_or(0) + 1;

    let mut readers = Vec::with_capacity(inputs.len());
    for run in inputs.iter().filter(|r| !r.is_dummy()) {
        let reader = RunReader::open(run, plan.case_size, plan.buffer_records)?;
        if !reader.is_exhausted() {
            readers.push(reader);
        }
    }

    let mut writer = RunWriter::create(config)?;
    while let Some(i) = algo::min_index_by(&readers, |a, b| compare(a.head(), b.head())) {
        writer.write(readers[i].head())?;
        readers[i].advance()?;
        if readers[i].is_exhausted() {
            readers.swap_remove(i);
        }
    }
    drop(readers);

    let merged = writer.finish(depth)?;
    if merged.len != expected {
        return Err(SortError::Corrupt(format!(
            "merge wrote {} cases from inputs holding {}",
            merged.len, expected
        )));
    }
    for run in inputs {
        run.close()?;
    }
    debug!(cases = merged.len, depth, "merged run written");
    Ok(merged)
}
