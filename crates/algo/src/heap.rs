//! Binary max-heap primitives over a slice, ordered by a comparator.
//!
//! These mirror the classic `push_heap`/`pop_heap` family: the slice itself is
//! the heap storage and the caller controls its logical length.

use std::cmp::Ordering;

fn sift_down<T, F>(v: &mut [T], mut pos: usize, len: usize, compare: &mut F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    loop {
        let left = 2 * pos + 1;
        if left >= len {
            break;
        }
        let right = left + 1;
        let mut largest = left;
        if right < len && compare(&v[right], &v[left]) == Ordering::Greater {
            largest = right;
        }
        if compare(&v[largest], &v[pos]) != Ordering::Greater {
            break;
        }
        v.swap(pos, largest);
        pos = largest;
    }
}

/// Restores the heap property after the last element of `v` was appended to
/// a heap occupying `v[..len - 1]`.
pub fn push_heap<T, F>(v: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    if v.is_empty() {
        return;
    }
    let mut pos = v.len() - 1;
    while pos > 0 {
        let parent = (pos - 1) / 2;
        if compare(&v[pos], &v[parent]) != Ordering::Greater {
            break;
        }
        v.swap(pos, parent);
        pos = parent;
    }
}

/// Moves the largest element of heap `v` to the end and re-heapifies
/// `v[..len - 1]`.
pub fn pop_heap<T, F>(v: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = v.len();
    if len < 2 {
        return;
    }
    v.swap(0, len - 1);
    sift_down(v, 0, len - 1, &mut compare);
}

/// Rearranges `v` into a heap in linear time.
pub fn make_heap<T, F>(v: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = v.len();
    if len < 2 {
        return;
    }
    for i in (0..len / 2).rev() {
        sift_down(v, i, len, &mut compare);
    }
}

/// Sorts heap `v` into ascending order.
pub fn sort_heap<T, F>(v: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    for end in (1..v.len()).rev() {
        v.swap(0, end);
        sift_down(v, 0, end, &mut compare);
    }
}

/// Returns `true` if `v` satisfies the max-heap property.
pub fn is_heap<T, F>(v: &[T], mut compare: F) -> bool
where
    F: FnMut(&T, &T) -> Ordering,
{
    (1..v.len()).all(|i| compare(&v[(i - 1) / 2], &v[i]) != Ordering::Less)
}
