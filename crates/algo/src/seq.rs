use std::cmp::Ordering;

use rand::Rng;

/// Returns the index of the first element equal to `target`.
pub fn find<T, F>(v: &[T], target: &T, mut compare: F) -> Option<usize>
where
    F: FnMut(&T, &T) -> Ordering,
{
    v.iter().position(|x| compare(x, target) == Ordering::Equal)
}

/// Counts the elements equal to `target`.
pub fn count_equal<T, F>(v: &[T], target: &T, mut compare: F) -> usize
where
    F: FnMut(&T, &T) -> Ordering,
{
    v.iter()
        .filter(|x| compare(x, target) == Ordering::Equal)
        .count()
}

/// Counts the elements satisfying `pred`.
pub fn count_if<T, P>(v: &[T], mut pred: P) -> usize
where
    P: FnMut(&T) -> bool,
{
    v.iter().filter(|x| pred(x)).count()
}

/// Returns the index of the first element equal to its successor.
pub fn adjacent_find_equal<T, F>(v: &[T], mut compare: F) -> Option<usize>
where
    F: FnMut(&T, &T) -> Ordering,
{
    v.windows(2)
        .position(|w| compare(&w[0], &w[1]) == Ordering::Equal)
}

/// Compacts a sorted slice so that each run of equal elements keeps only its
/// first member, preserving the relative order of survivors. Returns the
/// number of survivors, which occupy `v[..n]`.
pub fn unique_by<T, F>(v: &mut [T], mut compare: F) -> usize
where
    F: FnMut(&T, &T) -> Ordering,
{
    if v.is_empty() {
        return 0;
    }
    let mut last = 0;
    for i in 1..v.len() {
        if compare(&v[last], &v[i]) != Ordering::Equal {
            last += 1;
            if last != i {
                v.swap(last, i);
            }
        }
    }
    last + 1
}

/// Reorders `v` so that every element satisfying `pred` precedes every element
/// that does not. Not stable. Returns the number of elements satisfying `pred`.
pub fn partition<T, P>(v: &mut [T], mut pred: P) -> usize
where
    P: FnMut(&T) -> bool,
{
    let mut first = 0;
    let mut last = v.len();
    loop {
        while first < last && pred(&v[first]) {
            first += 1;
        }
        while first < last && !pred(&v[last - 1]) {
            last -= 1;
        }
        if first >= last {
            return first;
        }
        v.swap(first, last - 1);
        first += 1;
        last -= 1;
    }
}

/// Returns `true` if `v[..true_count]` all satisfy `pred` and the rest do not.
pub fn is_partitioned<T, P>(v: &[T], true_count: usize, mut pred: P) -> bool
where
    P: FnMut(&T) -> bool,
{
    true_count <= v.len()
        && v[..true_count].iter().all(&mut pred)
        && !v[true_count..].iter().any(&mut pred)
}

/// Stably removes every element satisfying `pred`, returning the new length.
pub fn remove_if<T, P>(v: &mut [T], mut pred: P) -> usize
where
    P: FnMut(&T) -> bool,
{
    let mut kept = 0;
    for i in 0..v.len() {
        if !pred(&v[i]) {
            if kept != i {
                v.swap(kept, i);
            }
            kept += 1;
        }
    }
    kept
}

/// Stably removes every element equal to `target`, returning the new length.
pub fn remove_equal<T, F>(v: &mut [T], target: &T, mut compare: F) -> usize
where
    F: FnMut(&T, &T) -> Ordering,
{
    remove_if(v, |x| compare(x, target) == Ordering::Equal)
}

/// Copies the elements of `src` satisfying `pred` into the front of `dst`,
/// stopping when `dst` is full. Returns the number copied.
pub fn copy_if<T, P>(src: &[T], dst: &mut [T], mut pred: P) -> usize
where
    T: Clone,
    P: FnMut(&T) -> bool,
{
    let mut n = 0;
    for x in src {
        if n == dst.len() {
            break;
        }
        if pred(x) {
            dst[n] = x.clone();
            n += 1;
        }
    }
    n
}

/// Moves the element at `from` to index `to`, shifting the elements between.
pub fn move_element<T>(v: &mut [T], from: usize, to: usize) {
    if from < to {
        v[from..=to].rotate_left(1);
    } else if to < from {
        v[to..=from].rotate_right(1);
    }
}

/// Fisher-Yates shuffle drawing indices from `rng`.
pub fn shuffle<T, R>(v: &mut [T], rng: &mut R)
where
    R: Rng + ?Sized,
{
    for i in (1..v.len()).rev() {
        let j = rng.random_range(0..=i);
        v.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::sort_by;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // -------------------- unique --------------------

    #[test]
    fn unique_removes_duplicate_runs() {
        let mut v = vec![1, 1, 2, 3, 3, 3, 4, 5, 5];
        let n = unique_by(&mut v, |a: &i32, b| a.cmp(b));
        assert_eq!(n, 5);
        assert_eq!(&v[..n], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn unique_keeps_first_of_each_run() {
        let mut v = vec![(1, 'a'), (1, 'b'), (2, 'c'), (2, 'd'), (3, 'e')];
        let n = unique_by(&mut v, |a, b| a.0.cmp(&b.0));
        assert_eq!(&v[..n], &[(1, 'a'), (2, 'c'), (3, 'e')]);
    }

    #[test]
    fn unique_empty_and_single() {
        let mut empty: Vec<u8> = vec![];
        assert_eq!(unique_by(&mut empty, |a, b| a.cmp(b)), 0);
        let mut one = vec![9u8];
        assert_eq!(unique_by(&mut one, |a, b| a.cmp(b)), 1);
    }

    // -------------------- partition / remove / copy --------------------

    #[test]
    fn partition_evens_first() {
        let mut v: Vec<u32> = (0..21).collect();
        let n = partition(&mut v, |x| x % 2 == 0);
        assert_eq!(n, 11);
        assert!(is_partitioned(&v, n, |x| x % 2 == 0));
    }

    #[test]
    fn partition_all_or_nothing() {
        let mut v = vec![1, 3, 5];
        assert_eq!(partition(&mut v, |x: &i32| *x > 0), 3);
        assert_eq!(partition(&mut v, |x: &i32| *x < 0), 0);
    }

    #[test]
    fn remove_if_is_stable() {
        let mut v = vec![1, 2, 3, 4, 5, 6, 7];
        let n = remove_if(&mut v, |x: &i32| x % 3 == 0);
        assert_eq!(&v[..n], &[1, 2, 4, 5, 7]);
    }

    #[test]
    fn remove_equal_drops_matches() {
        let mut v = vec![2, 7, 2, 2, 8];
        let n = remove_equal(&mut v, &2, |a: &i32, b| a.cmp(b));
        assert_eq!(&v[..n], &[7, 8]);
    }

    #[test]
    fn copy_if_stops_when_full() {
        let src = [1, 2, 3, 4, 5, 6];
        let mut dst = [0; 2];
        assert_eq!(copy_if(&src, &mut dst, |x: &i32| x % 2 == 0), 2);
        assert_eq!(dst, [2, 4]);
    }

    // -------------------- find / count --------------------

    #[test]
    fn find_and_count() {
        let v = [4, 1, 4, 7];
        assert_eq!(find(&v, &4, |a: &i32, b| a.cmp(b)), Some(0));
        assert_eq!(find(&v, &9, |a: &i32, b| a.cmp(b)), None);
        assert_eq!(count_equal(&v, &4, |a: &i32, b| a.cmp(b)), 2);
        assert_eq!(count_if(&v, |x| *x > 3), 3);
        assert_eq!(adjacent_find_equal(&[1, 2, 2, 3], |a: &i32, b| a.cmp(b)), Some(1));
        assert_eq!(adjacent_find_equal(&[1, 2, 3], |a: &i32, b| a.cmp(b)), None);
    }

    #[test]
    fn move_element_both_directions() {
        let mut v = vec!['a', 'b', 'c', 'd'];
        move_element(&mut v, 0, 2);
        assert_eq!(v, vec!['b', 'c', 'a', 'd']);
        move_element(&mut v, 3, 0);
        assert_eq!(v, vec!['d', 'b', 'c', 'a']);
    }

    // -------------------- shuffle --------------------

    #[test]
    fn shuffle_is_a_permutation_and_seeded() {
        let mut a: Vec<u32> = (0..500).collect();
        let mut b = a.clone();
        shuffle(&mut a, &mut StdRng::seed_from_u64(11));
        shuffle(&mut b, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
        assert_ne!(a, (0..500).collect::<Vec<u32>>());

        sort_by(&mut a, |x, y| x.cmp(y));
        assert_eq!(a, (0..500).collect::<Vec<u32>>());
    }

    proptest! {
        #[test]
        fn unique_matches_dedup(mut v in prop::collection::vec(0u8..16, 0..400)) {
            v.sort();
            let mut expected = v.clone();
            expected.dedup();
            let n = unique_by(&mut v, |a, b| a.cmp(b));
            prop_assert_eq!(n, expected.len());
            prop_assert_eq!(&v[..n], &expected[..]);
        }

        #[test]
        fn partition_count_matches_predicate(mut v in prop::collection::vec(any::<i32>(), 0..300)) {
            let expected = v.iter().filter(|x| **x < 0).count();
            let n = partition(&mut v, |x| *x < 0);
            prop_assert_eq!(n, expected);
            prop_assert!(is_partitioned(&v, n, |x| *x < 0));
        }
    }
}
