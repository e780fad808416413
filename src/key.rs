use std::iter::FusedIterator;

/// The high 32 bits of a `u64`, selecting the shard which holds a value.
pub type Key = u32;

/// Splits a `u64` into its shard key and the low 32 bits stored in that
/// shard's container.
pub trait SplitKey: Sized {
    fn key(self) -> Key;
    fn split(self) -> (Key, u32);
    fn unsplit(key: Key, low: u32) -> Self;
}

impl SplitKey for u64 {
    #[inline(always)]
    fn key(self) -> Key {
        (self >> u32::BITS) as Key
    }

    #[inline(always)]
    fn split(self) -> (Key, u32) {
        (self.key(), self as u32)
    }

    #[inline(always)]
    fn unsplit(key: Key, low: u32) -> Self {
        (u64::from(key) << u32::BITS) | u64::from(low)
    }
}

/// Returns `(n >> 32, n & 0xFFFF_FFFF)`.
#[inline]
pub fn split(n: u64) -> (Key, u32) {
    n.split()
}

/// Returns `(key << 32) | low`, the inverse of [`split`].
#[inline]
pub fn combine(key: Key, low: u32) -> u64 {
    u64::unsplit(key, low)
}

/// Recombines the low values of a single shard with that shard's key.
#[must_use]
pub struct IterCombined<I> {
    key: Key,
    inner: I,
}

impl<I> IterCombined<I> {
    pub fn new(key: Key, inner: I) -> Self {
        Self { key, inner }
    }
}

impl<I: Iterator<Item = u32>> Iterator for IterCombined<I> {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|low| combine(self.key, low))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<I: FusedIterator<Item = u32>> FusedIterator for IterCombined<I> {}
