//! # Minheap
//!
//! Array-based binary min-heap mapping an opaque index to an integer key.
//!
//! The external sort engine keys each pending run by its length and repeatedly
//! removes the shortest runs to merge next (the Huffman merge pattern). The
//! index is whatever the caller uses to find the run again; the heap never
//! interprets it.
//!
//! Ties among equal keys come out in unspecified order.
//!
//! ## Example
//! ```rust
//! use minheap::Heap;
//!
//! let mut h = Heap::new(4);
//! h.insert(0, 30);
//! h.insert(1, 10);
//! h.insert(2, 20);
//! assert_eq!(h.delete_min(), Some((1, 10)));
//! assert_eq!(h.size(), 2);
//! ```

/// One heap slot: the caller's index and its ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapElem {
    index: usize,
    key: u64,
}

/// Binary min-heap over `(index, key)` pairs, ordered by `key`.
///
/// Storage is a single `Vec` laid out in the usual implicit-tree order
/// (children of `i` at `2i + 1` and `2i + 2`); it grows geometrically when an
/// insert exceeds the current capacity.
#[derive(Debug, Default)]
pub struct Heap {
    elems: Vec<HeapElem>,
}

impl Heap {
    /// Creates an empty heap with room for `capacity` elements.
    pub fn new(capacity: usize) -> Self {
        Self {
            elems: Vec::with_capacity(capacity),
        }
    }

    /// Inserts `index` with ordering `key`. O(log n).
    pub fn insert(&mut self, index: usize, key: u64) {
        self.elems.push(HeapElem { index, key });
        let pos = self.elems.len() - 1;
        self.sift_up(pos);
    }

    /// Removes and returns the element with the smallest key, or `None` if
    /// the heap is empty.
    pub fn delete_min(&mut self) -> Option<(usize, u64)> {
        if self.elems.is_empty() {
            return None;
        }
        let min = self.elems.swap_remove(0);
        if !self.elems.is_empty() {
            self.sift_down(0);
        }
        Some((min.index, min.key))
    }

    /// Returns the element with the smallest key without removing it.
    pub fn peek_min(&self) -> Option<(usize, u64)> {
        self.elems.first().map(|e| (e.index, e.key))
    }

    /// Number of elements currently held.
    pub fn size(&self) -> usize {
        self.elems.len()
    }

    /// Returns `true` if the heap holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.elems[pos].key >= self.elems[parent].key {
                break;
            }
            self.elems.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.elems.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut smallest = left;
            if right < len && self.elems[right].key < self.elems[left].key {
                smallest = right;
            }
            if self.elems[pos].key <= self.elems[smallest].key {
                break;
            }
            self.elems.swap(pos, smallest);
            pos = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    // -------------------- Basic operations --------------------

    #[test]
    fn empty_heap() {
        let mut h = Heap::new(0);
        assert!(h.is_empty());
        assert_eq!(h.size(), 0);
        assert_eq!(h.peek_min(), None);
        assert_eq!(h.delete_min(), None);
    }

    #[test]
    fn delete_min_returns_keys_in_order() {
        let mut h = Heap::new(2);
        for (i, k) in [50u64, 10, 40, 20, 30].into_iter().enumerate() {
            h.insert(i, k);
        }
        let keys: Vec<u64> = std::iter::from_fn(|| h.delete_min().map(|(_, k)| k)).collect();
        assert_eq!(keys, vec![10, 20, 30, 40, 50]);
    }

    #[test]
    fn index_travels_with_key() {
        let mut h = Heap::new(4);
        h.insert(7, 3);
        h.insert(9, 1);
        h.insert(8, 2);
        assert_eq!(h.delete_min(), Some((9, 1)));
        assert_eq!(h.delete_min(), Some((8, 2)));
        assert_eq!(h.delete_min(), Some((7, 3)));
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut h = Heap::new(1);
        for i in 0..1000usize {
            h.insert(i, (1000 - i) as u64);
        }
        assert_eq!(h.size(), 1000);
        assert_eq!(h.peek_min(), Some((999, 1)));
    }

    #[test]
    fn duplicate_keys_all_returned() {
        let mut h = Heap::new(4);
        for i in 0..6 {
            h.insert(i, 5);
        }
        let mut seen: Vec<usize> = std::iter::from_fn(|| h.delete_min().map(|(i, _)| i)).collect();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    // -------------------- Cross-check against a reference structure --------------------

    /// Multiset of keys, each with the indices inserted under it.
    fn reference_min(reference: &BTreeMap<u64, Vec<usize>>) -> Option<u64> {
        reference.keys().next().copied()
    }

    #[test]
    fn random_interleaving_matches_reference() {
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        let mut h = Heap::new(8);
        let mut reference: BTreeMap<u64, Vec<usize>> = BTreeMap::new();

        for i in 0..20_000usize {
            if rng.random_bool(0.6) || h.is_empty() {
                let key = rng.random_range(0..500);
                h.insert(i, key);
                reference.entry(key).or_default().push(i);
            } else {
                let expected = reference_min(&reference).unwrap();
                let (index, key) = h.delete_min().unwrap();
                assert_eq!(key, expected);
                let bucket = reference.get_mut(&key).unwrap();
                let pos = bucket.iter().position(|x| *x == index).unwrap();
                bucket.swap_remove(pos);
                if bucket.is_empty() {
                    reference.remove(&key);
                }
            }
            assert_eq!(h.size(), reference.values().map(Vec::len).sum::<usize>());
        }
    }

    proptest! {
        #[test]
        fn delete_min_is_true_minimum(ops in prop::collection::vec(prop::option::of(0u64..100), 0..500)) {
            let mut h = Heap::new(0);
            let mut held: Vec<u64> = Vec::new();
            for (i, op) in ops.into_iter().enumerate() {
                match op {
                    Some(key) => {
                        h.insert(i, key);
                        held.push(key);
                    }
                    None => {
                        let got = h.delete_min().map(|(_, k)| k);
                        let want = held.iter().copied().min();
                        prop_assert_eq!(got, want);
                        if let Some(w) = want {
                            let pos = held.iter().position(|k| *k == w).unwrap();
                            held.swap_remove(pos);
                        }
                    }
                }
            }
        }
    }
}
