use itertools::Itertools;
use rand::{SeedableRng, seq::index};

use crate::{Bitmap64, Bitmap64Err, container::Container, key::combine};

pub fn mkbitmap(values: impl IntoIterator<Item = u64>) -> Bitmap64 {
    let mut bitmap = Bitmap64::new();
    for v in values {
        bitmap.insert(v);
    }
    bitmap
}

/// Checks every read operation of `bitmap` against `expected`, which must be
/// sorted and free of duplicates.
#[track_caller]
pub fn test_bitmap_read<C: Container>(bitmap: &Bitmap64<C>, expected: &[u64]) {
    assert!(
        expected.iter().tuple_windows().all(|(a, b)| a < b),
        "expected must be sorted and unique"
    );

    assert_eq!(bitmap.len(), expected.len() as u64);
    assert_eq!(bitmap.is_empty(), expected.is_empty());

    let iter = bitmap.iter();
    assert_eq!(iter.size_hint(), (expected.len(), Some(expected.len())));
    itertools::assert_equal(iter, expected.iter().copied());
    // iteration can be restarted
    itertools::assert_equal(bitmap.iter(), expected.iter().copied());

    for (i, &v) in expected.iter().enumerate() {
        let i = i as u64;
        assert!(bitmap.contains(v), "missing {v}");
        assert_eq!(bitmap.rank(v), i + 1, "rank({v})");
        assert_eq!(bitmap.position(v), Some(i), "position({v})");
        assert_eq!(bitmap.select(i), Some(v), "select({i})");
        assert_eq!(bitmap.get(i).ok(), Some(v), "get({i})");

        // probe the gap below each value
        if let Some(prev) = v.checked_sub(1) {
            if i == 0 || expected[i as usize - 1] != prev {
                assert!(!bitmap.contains(prev), "unexpected {prev}");
                assert_eq!(bitmap.rank(prev), i, "rank({prev})");
                assert_eq!(bitmap.position(prev), None);
            }
        }
    }

    let len = expected.len() as u64;
    assert_eq!(bitmap.select(len), None);
    assert!(matches!(
        bitmap.get(len),
        Err(Bitmap64Err::IndexOutOfRange { index, len: l }) if index == len && l == len
    ));
    assert_eq!(bitmap.rank(u64::MAX), len);

    match (expected.first(), expected.last()) {
        (Some(&first), Some(&last)) => {
            assert_eq!(bitmap.min().ok(), Some(first));
            assert_eq!(bitmap.max().ok(), Some(last));
        }
        _ => {
            assert!(matches!(bitmap.min(), Err(Bitmap64Err::Empty)));
            assert!(matches!(bitmap.max(), Err(Bitmap64Err::Empty)));
        }
    }
}

pub struct SetGen {
    rng: rand::rngs::StdRng,
}

impl SetGen {
    pub fn new(seed: u64) -> Self {
        let rng = rand::rngs::StdRng::seed_from_u64(seed);
        Self { rng }
    }

    fn sample_u32(&mut self, amount: usize) -> impl Iterator<Item = u32> + use<> {
        index::sample(&mut self.rng, u32::MAX as usize, amount)
            .into_iter()
            .map(|i| i as u32)
    }

    /// `len` values spread over the whole `u64` domain, one per shard.
    pub fn random(&mut self, len: usize) -> Vec<u64> {
        let keys = self.sample_u32(len).collect_vec();
        let lows = self.sample_u32(len);
        keys.into_iter()
            .zip(lows)
            .map(|(key, low)| combine(key, low))
            .sorted()
            .collect()
    }

    /// `shards` random keys, each holding `per_shard` random low values.
    #[track_caller]
    pub fn sharded(&mut self, shards: usize, per_shard: usize) -> Vec<u64> {
        let keys = self.sample_u32(shards).collect_vec();
        let mut out = Vec::with_capacity(shards * per_shard);
        for key in keys {
            out.extend(self.sample_u32(per_shard).map(|low| combine(key, low)));
        }
        out.sort();
        assert_eq!(out.len(), shards * per_shard);
        out
    }

    /// `count` contiguous runs of `len` values, each in its own shard.
    #[track_caller]
    pub fn runs(&mut self, count: usize, len: usize) -> Vec<u64> {
        assert!(len > 0 && len < u32::MAX as usize);
        let keys = self.sample_u32(count).collect_vec();
        let mut out = Vec::with_capacity(count * len);
        for key in keys {
            let start = index::sample(&mut self.rng, u32::MAX as usize - len, 1).index(0) as u32;
            out.extend((start..start + len as u32).map(|low| combine(key, low)));
        }
        out.sort();
        out
    }
}
