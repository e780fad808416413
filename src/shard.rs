use std::fmt::Debug;

use crate::{container::Container, key::Key};

/// A container together with the key shared by the high 32 bits of every
/// value it holds.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Shard<C> {
    key: Key,
    container: C,
}

impl<C> Shard<C> {
    #[inline]
    pub fn new(key: Key, container: C) -> Self {
        Self { key, container }
    }

    #[inline(always)]
    pub fn key(&self) -> Key {
        self.key
    }

    #[inline(always)]
    pub fn container(&self) -> &C {
        &self.container
    }

    #[inline(always)]
    pub fn container_mut(&mut self) -> &mut C {
        &mut self.container
    }
}

/// Shards sorted by strictly increasing key.
#[derive(Clone, PartialEq, Eq)]
pub struct ShardIndex<C> {
    shards: Vec<Shard<C>>,
}

impl<C> Default for ShardIndex<C> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<C: Container> Debug for ShardIndex<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.shards.iter().map(|s| (s.key, s.container.cardinality())))
            .finish()
    }
}

impl<C> ShardIndex<C> {
    pub const EMPTY: Self = ShardIndex { shards: Vec::new() };

    pub fn with_capacity(capacity: usize) -> Self {
        Self { shards: Vec::with_capacity(capacity) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    #[inline]
    fn search(&self, key: Key) -> Result<usize, usize> {
        self.shards.binary_search_by_key(&key, |s| s.key)
    }

    pub fn lookup(&self, key: Key) -> Option<&Shard<C>> {
        self.search(key).ok().map(|idx| &self.shards[idx])
    }

    pub fn lookup_mut(&mut self, key: Key) -> Option<&mut Shard<C>> {
        match self.search(key) {
            Ok(idx) => Some(&mut self.shards[idx]),
            Err(_) => None,
        }
    }

    /// Appends a shard whose key is greater than every key in the index.
    pub fn push(&mut self, shard: Shard<C>) {
        if let Some(last) = self.shards.last() {
            assert!(last.key < shard.key, "shards must be pushed in key order");
        }
        self.shards.push(shard);
    }

    /// Inserts the shard at its sorted position. If a shard with the same key
    /// already exists the index is left unchanged and the shard is handed back.
    pub fn insert_sorted(&mut self, shard: Shard<C>) -> Option<Shard<C>> {
        match self.search(shard.key) {
            Ok(_) => Some(shard),
            Err(idx) => {
                self.shards.insert(idx, shard);
                None
            }
        }
    }

    #[inline]
    pub fn first(&self) -> Option<&Shard<C>> {
        self.shards.first()
    }

    #[inline]
    pub fn last(&self) -> Option<&Shard<C>> {
        self.shards.last()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Shard<C>> {
        self.shards.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Shard<C>> {
        self.shards.iter_mut()
    }
}

impl<C: Container> ShardIndex<C> {
    /// Returns the shard for `key`, inserting an empty one at its sorted
    /// position if it doesn't exist yet.
    pub fn lookup_or_create(&mut self, key: Key) -> &mut Shard<C> {
        let idx = match self.search(key) {
            Ok(idx) => idx,
            Err(idx) => {
                self.shards.insert(idx, Shard::new(key, C::default()));
                idx
            }
        };
        &mut self.shards[idx]
    }

    /// Drops the shard for `key` if its container no longer holds any values.
    pub fn remove_if_empty(&mut self, key: Key) {
        if let Ok(idx) = self.search(key) {
            if self.shards[idx].container.is_empty() {
                self.shards.remove(idx);
            }
        }
    }

    /// The total number of values across all shards.
    pub fn cardinality(&self) -> u64 {
        self.shards.iter().map(|s| s.container.cardinality()).sum()
    }
}
