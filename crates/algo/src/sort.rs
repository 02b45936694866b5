use std::cmp::Ordering;

use crate::heap::{make_heap, sort_heap};
use crate::seq::unique_by;

/// Partitions at or below this length are left for the final insertion pass.
const PARTITION_THRESHOLD: usize = 4;

/// Sorts `v` with `compare` (unstable).
///
/// Median-of-three quicksort recurses into the smaller side and loops on the
/// larger one until partitions shrink to [`PARTITION_THRESHOLD`]; a single
/// insertion-sort pass over the whole slice then finishes the job, since no
/// element is more than a partition away from its final place. Recursion
/// deeper than `2 * log2(n)` falls back to heapsort for that partition.
pub fn sort_by<T, F>(v: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = v.len();
    if len < 2 {
        return;
    }
    let depth_limit = 2 * (usize::BITS - len.leading_zeros()) as usize;
    quicksort(v, &mut compare, depth_limit);
    insertion_sort_by(v, compare);
}

fn quicksort<T, F>(mut v: &mut [T], compare: &mut F, mut depth_limit: usize)
where
    F: FnMut(&T, &T) -> Ordering,
{
    while v.len() > PARTITION_THRESHOLD {
        if depth_limit == 0 {
            make_heap(v, &mut *compare);
            sort_heap(v, &mut *compare);
            return;
        }
        depth_limit -= 1;

        let split = partition_median_of_three(v, compare);
        let (left, rest) = v.split_at_mut(split);
        let right = &mut rest[1..];
        if left.len() < right.len() {
            quicksort(left, compare, depth_limit);
            v = right;
        } else {
            quicksort(right, compare, depth_limit);
            v = left;
        }
    }
}

/// Orders first/middle/last, parks the median at `len - 2` and partitions
/// around it. Returns the pivot's final index. Requires `v.len() >= 3`.
fn partition_median_of_three<T, F>(v: &mut [T], compare: &mut F) -> usize
where
    F: FnMut(&T, &T) -> Ordering,
{
    let last = v.len() - 1;
    let mid = last / 2;

    if compare(&v[mid], &v[0]) == Ordering::Less {
        v.swap(mid, 0);
    }
    if compare(&v[last], &v[mid]) == Ordering::Less {
        v.swap(last, mid);
        if compare(&v[mid], &v[0]) == Ordering::Less {
            v.swap(mid, 0);
        }
    }

    // v[0] <= pivot <= v[last] act as sentinels for the scans below.
    let pivot = last - 1;
    v.swap(mid, pivot);

    let mut i = 0;
    let mut j = pivot;
    loop {
        i += 1;
        while compare(&v[i], &v[pivot]) == Ordering::Less {
            i += 1;
        }
        j -= 1;
        while compare(&v[pivot], &v[j]) == Ordering::Less {
            j -= 1;
        }
        if i >= j {
            break;
        }
        v.swap(i, j);
    }
    v.swap(i, pivot);
    i
}

/// Stable insertion sort; quadratic, intended for short or nearly sorted input.
pub fn insertion_sort_by<T, F>(v: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    for i in 1..v.len() {
        let mut j = i;
        while j > 0 && compare(&v[j], &v[j - 1]) == Ordering::Less {
            v.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Returns `true` if `v` is in non-decreasing order under `compare`.
pub fn is_sorted_by<T, F>(v: &[T], mut compare: F) -> bool
where
    F: FnMut(&T, &T) -> Ordering,
{
    v.windows(2)
        .all(|w| compare(&w[0], &w[1]) != Ordering::Greater)
}

/// Sorts `v` and compacts duplicates, returning the number of distinct elements.
pub fn sort_unique<T, F>(v: &mut [T], mut compare: F) -> usize
where
    F: FnMut(&T, &T) -> Ordering,
{
    sort_by(v, &mut compare);
    unique_by(v, compare)
}
