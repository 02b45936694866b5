//! # Algo
//!
//! Allocator-free array primitives used by the casefile and external sort
//! layers: sorting, partitioning, compaction, searching and multiset
//! operations over plain slices.
//!
//! Every function is driven by a caller-supplied comparator or predicate, so
//! the element type needs no `Ord` bound. Nothing here allocates; functions
//! that "remove" elements compact the survivors to the front of the slice and
//! return the new logical length, leaving the tail in unspecified order.
//!
//! ## Example
//! ```rust
//! let mut v = vec![5, 3, 3, 9, 1, 5];
//! algo::sort_by(&mut v, |a, b| a.cmp(b));
//! let n = algo::unique_by(&mut v, |a, b| a.cmp(b));
//! assert_eq!(&v[..n], &[1, 3, 5, 9]);
//! ```

mod heap;
mod search;
mod seq;
mod sort;

pub use heap::{is_heap, make_heap, pop_heap, push_heap, sort_heap};
pub use search::{binary_search_by, lexicographical_compare, min_index_by, set_difference};
pub use seq::{
    adjacent_find_equal, copy_if, count_equal, count_if, find, is_partitioned, move_element,
    partition, remove_equal, remove_if, shuffle, unique_by,
};
pub use sort::{insertion_sort_by, is_sorted_by, sort_by, sort_unique};
