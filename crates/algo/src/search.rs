use std::cmp::Ordering;

/// Searches sorted `v` for an element equal to `key`. If several match, any
/// one of their indices may be returned.
pub fn binary_search_by<T, F>(v: &[T], key: &T, mut compare: F) -> Option<usize>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut low = 0;
    let mut high = v.len();
    while low < high {
        let mid = low + (high - low) / 2;
        match compare(key, &v[mid]) {
            Ordering::Less => high = mid,
            Ordering::Greater => low = mid + 1,
            Ordering::Equal => return Some(mid),
        }
    }
    None
}

/// Compares two slices element by element; a proper prefix orders first.
pub fn lexicographical_compare<T, F>(a: &[T], b: &[T], mut compare: F) -> Ordering
where
    F: FnMut(&T, &T) -> Ordering,
{
    for (x, y) in a.iter().zip(b) {
        match compare(x, y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Multiset difference of sorted `a` and sorted `b`: every element of `a`
/// without a matching partner in `b` is copied into `out`, in order.
///
/// Each element of `b` cancels at most one equal element of `a`. Copying
/// stops when `out` is full. Returns the number of elements written.
pub fn set_difference<T, F>(a: &[T], b: &[T], out: &mut [T], mut compare: F) -> usize
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && n < out.len() {
        if j == b.len() {
            out[n] = a[i].clone();
            n += 1;
            i += 1;
            continue;
        }
        match compare(&a[i], &b[j]) {
            Ordering::Less => {
                out[n] = a[i].clone();
                n += 1;
                i += 1;
            }
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    n
}

/// Returns the index of the first minimal element, by linear scan.
pub fn min_index_by<T, F>(v: &[T], mut compare: F) -> Option<usize>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if v.is_empty() {
        return None;
    }
    let mut best = 0;
    for i in 1..v.len() {
        if compare(&v[i], &v[best]) == Ordering::Less {
            best = i;
        }
    }
    Some(best)
}
