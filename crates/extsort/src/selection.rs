//! Initial run formation by replacement selection.
//!
//! A tree of losers over `P` record slots yields runs of about `2P` cases on
//! random input and a single run on already-sorted input. Slot `j` doubles
//! as internal node `j`; its external node is `(P + j) / 2` and an internal
//! node's parent is `j / 2`, so node 1 is the root.

use std::cmp::Ordering;
use std::mem;

use casefile::{CaseError, CaseSource};
use tracing::debug;

use crate::config::{SortConfig, SortPlan};
use crate::error::SortError;
use crate::run::{Run, RunWriter};

#[derive(Debug, Clone, Copy, Default)]
struct Node {
    /// Record slot that lost the comparison at this internal node.
    loser: usize,
    /// Run number of the record in this slot.
    run: u64,
}

/// Tree bytes charged per record slot, on top of the record itself.
pub(crate) const NODE_BYTES: usize = mem::size_of::<Node>();

pub(crate) struct Tournament {
    case_size: usize,
    records: Vec<u8>,
    nodes: Vec<Node>,
}

impl Tournament {
    /// Allocates the whole tree up front so an undersized workspace fails
    /// before any input is consumed.
    pub(crate) fn new(plan: &SortPlan) -> Result<Self, SortError> {
        let slots = plan.tree_records;
        let refused = || {
            SortError::ResourceExhausted(format!("no room for a {slots}-record selection tree"))
        };
        let bytes = slots.checked_mul(plan.case_size).ok_or_else(refused)?;
        let mut records = Vec::new();
        let mut nodes = Vec::new();
        if records.try_reserve_exact(bytes).is_err() || nodes.try_reserve_exact(slots).is_err() {
            return Err(refused());
        }
        records.resize(bytes, 0);
        nodes.extend((0..slots).map(|j| Node { loser: j, run: 0 }));
        Ok(Self {
            case_size: plan.case_size,
            records,
            nodes,
        })
    }

    fn slots(&self) -> usize {
        self.nodes.len()
    }

    fn record(&self, j: usize) -> &[u8] {
        &self.records[j * self.case_size..(j + 1) * self.case_size]
    }

    /// Runs the selection over `source`, writing each run to its own file.
    pub(crate) fn form_runs<S, F>(
        mut self,
        source: &mut S,
        compare: &mut F,
        config: &SortConfig,
    ) -> Result<Vec<Run>, SortError>
    where
        S: CaseSource + ?Sized,
        F: FnMut(&[u8], &[u8]) -> Ordering,
    {
        let p = self.slots();
        let mut runs = Vec::new();
        let mut writer: Option<RunWriter> = None;
        let mut rmax = 0u64;
        let mut rc = 0u64;
        let mut q = 0usize;

        loop {
            if self.nodes[q].run != rc {
                if let Some(w) = writer.take() {
                    let run = w.finish(0)?;
                    debug!(run = rc, cases = run.len, "initial run written");
                    runs.push(run);
                }
                if self.nodes[q].run > rmax {
                    break;
                }
                rc = self.nodes[q].run;
                writer = Some(RunWriter::create(config)?);
            }

            if let Some(w) = writer.as_mut() {
                w.write(self.record(q))?;
            }

            match source.next_case()? {
                None => self.nodes[q].run = rmax + 1,
                Some(case) => {
                    if case.len() != self.case_size {
                        return Err(CaseError::CaseSize {
                            expected: self.case_size,
                            actual: case.len(),
                        }
                        .into());
                    }
                    if rc == 0 || compare(case, self.record(q)) == Ordering::Less {
                        self.nodes[q].run += 1;
                        rmax = rmax.max(self.nodes[q].run);
                    }
                    let start = q * self.case_size;
                    self.records[start..start + self.case_size].copy_from_slice(case);
                }
            }

            let mut t = (p + q) / 2;
            loop {
                let l = self.nodes[t].loser;
                let (rl, rq) = (self.nodes[l].run, self.nodes[q].run);
                if rl < rq || (rl == rq && compare(self.record(l), self.record(q)) == Ordering::Less) {
                    self.nodes[t].loser = q;
                    q = l;
                }
                if t <= 1 {
                    break;
                }
                t /= 2;
            }
        }
        Ok(runs)
    }
}
