//! In-memory case storage.
//!
//! Cases live as individually boxed slices in append order. An approximate
//! byte size (case bytes plus one pointer of bookkeeping per case) is tracked
//! so the casefile can tell when the workspace budget is spent.

use std::cmp::Ordering;
use std::mem;

use crate::error::CaseError;

#[derive(Debug, Default)]
pub(crate) struct MemoryCases {
    cases: Vec<Box<[u8]>>,
    approx_size: usize,
}

impl MemoryCases {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bytes charged against the workspace for one case.
    pub(crate) fn case_cost(case_size: usize) -> usize {
        case_size + mem::size_of::<Box<[u8]>>()
    }

    /// Stores a copy of `case` if it fits in `workspace` bytes and the
    /// allocator cooperates. Returns `false`, leaving the list untouched,
    /// when either refuses.
    pub(crate) fn try_push(&mut self, case: &[u8], workspace: usize) -> bool {
        let cost = Self::case_cost(case.len());
        if self.approx_size.saturating_add(cost) > workspace {
            return false;
        }
        if self.cases.try_reserve(1).is_err() {
            return false;
        }
        let mut copy = Vec::new();
        if copy.try_reserve_exact(case.len()).is_err() {
            return false;
        }
        copy.extend_from_slice(case);
        self.cases.push(copy.into_boxed_slice());
        self.approx_size += cost;
        true
    }

    pub(crate) fn get(&self, index: usize) -> &[u8] {
        &self.cases[index]
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.cases.iter().map(|c| &c[..])
    }

    pub(crate) fn len(&self) -> usize {
        self.cases.len()
    }

    pub(crate) fn approx_size(&self) -> usize {
        self.approx_size
    }

    pub(crate) fn into_cases(self) -> Vec<Box<[u8]>> {
        self.cases
    }

    /// Stable top-down merge sort of the stored cases.
    ///
    /// Only case pointers move; the auxiliary array holds one (initially
    /// empty) pointer per case and recursion depth is `O(log n)`.
    pub(crate) fn sort_by<F>(&mut self, mut compare: F) -> Result<(), CaseError>
    where
        F: FnMut(&[u8], &[u8]) -> Ordering,
    {
        let n = self.cases.len();
        if n < 2 {
            return Ok(());
        }
        let mut aux: Vec<Box<[u8]>> = Vec::new();
        aux.try_reserve_exact(n).map_err(|_| {
            CaseError::ResourceExhausted(format!("no room for a {n}-entry sort index"))
        })?;
        aux.resize_with(n, Default::default);
        merge_sort(&mut self.cases, &mut aux, &mut compare);
        debug_assert!(algo::is_sorted_by(&self.cases, |a, b| compare(a, b)));
        Ok(())
    }
}

fn merge_sort<F>(v: &mut [Box<[u8]>], aux: &mut [Box<[u8]>], compare: &mut F)
where
    F: FnMut(&[u8], &[u8]) -> Ordering,
{
    let n = v.len();
    if n < 2 {
        return;
    }
    let mid = n / 2;
    merge_sort(&mut v[..mid], &mut aux[..mid], compare);
    merge_sort(&mut v[mid..], &mut aux[mid..], compare);
    if compare(&v[mid - 1], &v[mid]) != Ordering::Greater {
        return;
    }

    for (slot, case) in aux.iter_mut().zip(v.iter_mut()) {
        mem::swap(slot, case);
    }
    let (left, right) = aux.split_at_mut(mid);
    let (mut i, mut j) = (0, 0);
    for slot in v.iter_mut() {
        let take_left =
            j == right.len() || (i < left.len() && compare(&left[i], &right[j]) != Ordering::Greater);
        if take_left {
            mem::swap(slot, &mut left[i]);
            i += 1;
        } else {
            mem::swap(slot, &mut right[j]);
            j += 1;
        }
    }
}
