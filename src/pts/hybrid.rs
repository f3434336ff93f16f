// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Hybrid implementation of the points-to set, which uses an inline array
//! for small sets and a bit vector for large sets.

use std::fmt;
use std::slice;

use arrayvec::ArrayVec;

use super::PointsToSet;
use crate::util::bit_vec::{BitIter, BitVec};
use crate::util::Idx;

const SMALL_SET_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct HybridPointsToSet<T> {
    repr: HybridRepr<T>,
}

#[derive(Clone)]
enum HybridRepr<T> {
    Small(ArrayVec<T, SMALL_SET_CAPACITY>),
    Large(BitVec<T>),
}

impl<T: Idx> fmt::Debug for HybridPointsToSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Idx> PointsToSet<T> for HybridPointsToSet<T> {
    type Iter<'a>
        = HybridIter<'a, T>
    where
        Self: 'a;

    fn new() -> Self {
        HybridPointsToSet {
            repr: HybridRepr::Small(ArrayVec::new()),
        }
    }

    fn insert(&mut self, elem: T) -> bool {
        match &mut self.repr {
            HybridRepr::Small(small) if small.contains(&elem) => false,
            HybridRepr::Small(small) if !small.is_full() => {
                small.push(elem);
                true
            }
            HybridRepr::Small(small) => {
                // The small set is full: spill to a bit vector.
                let mut large = BitVec::new_empty();
                for elem in small.iter() {
                    large.insert(*elem);
                }
                let changed = large.insert(elem);
                self.repr = HybridRepr::Large(large);
                changed
            }
            HybridRepr::Large(large) => large.insert(elem),
        }
    }

    fn contains(&self, elem: T) -> bool {
        match &self.repr {
            HybridRepr::Small(small) => small.contains(&elem),
            HybridRepr::Large(large) => large.contains(elem),
        }
    }

    fn count(&self) -> usize {
        match &self.repr {
            HybridRepr::Small(small) => small.len(),
            HybridRepr::Large(large) => large.count(),
        }
    }

    fn is_empty(&self) -> bool {
        match &self.repr {
            HybridRepr::Small(small) => small.is_empty(),
            HybridRepr::Large(large) => large.is_empty(),
        }
    }

    fn iter(&self) -> HybridIter<'_, T> {
        match &self.repr {
            HybridRepr::Small(small) => HybridIter::Small(small.iter()),
            HybridRepr::Large(large) => HybridIter::Large(large.iter()),
        }
    }
}

pub enum HybridIter<'a, T: Idx> {
    Small(slice::Iter<'a, T>),
    Large(BitIter<'a, T>),
}

impl<'a, T: Idx> Iterator for HybridIter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self {
            HybridIter::Small(small) => small.next().copied(),
            HybridIter::Large(large) => large.next(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use rand::Rng;

    use super::{HybridPointsToSet, HybridRepr, SMALL_SET_CAPACITY};
    use crate::pts::PointsToSet;

    fn random_set(len: usize) -> HashSet<u32> {
        let mut rng = rand::thread_rng();
        let mut set = HashSet::new();
        while set.len() < len {
            set.insert(rng.gen_range(1..1000));
        }
        set
    }

    fn from_elems(elems: &HashSet<u32>) -> HybridPointsToSet<u32> {
        let mut set = HybridPointsToSet::new();
        for x in elems {
            set.insert(*x);
        }
        set
    }

    #[test]
    fn small_set() {
        let rand_set = random_set(8);
        let set = from_elems(&rand_set);
        assert_eq!(set.count(), 8);
        assert!(matches!(set.repr, HybridRepr::Small(_)));
        assert_eq!(set.iter().collect::<HashSet<_>>(), rand_set);
    }

    #[test]
    fn spill_to_large_set() {
        let rand_set = random_set(SMALL_SET_CAPACITY + 3);
        let mut set = from_elems(&rand_set);
        assert_eq!(set.count(), SMALL_SET_CAPACITY + 3);
        assert!(matches!(set.repr, HybridRepr::Large(_)));
        assert_eq!(set.iter().collect::<HashSet<_>>(), rand_set);

        let elem = *rand_set.iter().next().unwrap();
        assert!(set.contains(elem));
        assert!(!set.insert(elem));
    }

    #[test]
    fn add_all_returns_the_diff_once() {
        for len in [5, SMALL_SET_CAPACITY + 5] {
            let rand_set = random_set(len);
            let src = from_elems(&rand_set);
            let mut dst = HybridPointsToSet::new();

            let diff = dst.add_all(&src);
            assert_eq!(diff.iter().collect::<HashSet<_>>(), rand_set);

            let again = dst.add_all(&src);
            assert!(again.is_empty());
            assert_eq!(dst.count(), len);
        }
    }

    #[test]
    fn add_all_across_representations() {
        let small = from_elems(&random_set(4));
        let large = from_elems(&random_set(SMALL_SET_CAPACITY + 8));

        let mut merged = small.clone();
        let diff = merged.add_all(&large);
        assert!(diff.count() >= SMALL_SET_CAPACITY + 8 - 4);
        for x in small.iter() {
            assert!(merged.contains(x));
        }
        for x in large.iter() {
            assert!(merged.contains(x));
        }
    }
}
