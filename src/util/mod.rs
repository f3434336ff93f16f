// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

pub mod bit_vec;

pub use bit_vec::Idx;

/// Declares a dense index type: a `u32` newtype used to address an arena.
///
/// Purpose: avoid mixing indices for different entity domains.
#[macro_export]
macro_rules! new_index {
    ($(#[$attr:meta])* $vis:vis struct $name:ident) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name(u32);

        impl $name {
            #[inline]
            $vis fn new(idx: usize) -> Self {
                assert!(idx <= u32::MAX as usize);
                $name(idx as u32)
            }

            #[inline]
            $vis fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl $crate::util::Idx for $name {
            #[inline]
            fn new(idx: usize) -> Self {
                $name::new(idx)
            }

            #[inline]
            fn index(self) -> usize {
                self.index()
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

/// An arena paired with a reverse map, interning values to dense indices.
///
/// This is the canonicalization scheme used for every (context, entity)
/// table: one slot per distinct key, lookups via hashing, identity via the
/// returned index rather than via pointers.
pub struct Interner<K, I> {
    items: Vec<K>,
    index_map: std::collections::HashMap<K, I>,
}

impl<K, I> Interner<K, I>
where
    K: Clone + Eq + std::hash::Hash,
    I: Idx,
{
    pub fn new() -> Self {
        Interner {
            items: Vec::new(),
            index_map: std::collections::HashMap::new(),
        }
    }

    /// Returns the index for `key`, allocating a new slot on first sight.
    pub fn intern(&mut self, key: K) -> I {
        if let Some(idx) = self.index_map.get(&key) {
            *idx
        } else {
            let idx = I::new(self.items.len());
            self.items.push(key.clone());
            self.index_map.insert(key, idx);
            idx
        }
    }

    /// Returns the index for `key` if it has been interned before.
    pub fn get(&self, key: &K) -> Option<I> {
        self.index_map.get(key).copied()
    }

    /// Returns the value stored at `idx`.
    pub fn value(&self, idx: I) -> &K {
        &self.items[idx.index()]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.items.iter()
    }
}

impl<K, I> Default for Interner<K, I>
where
    K: Clone + Eq + std::hash::Hash,
    I: Idx,
{
    fn default() -> Self {
        Self::new()
    }
}
