use std::{fmt::Debug, io};

use bytes::BufMut;
use roaring::RoaringBitmap;

use crate::{
    codec::{DecodeErr, Encodable, encoder::Encoder},
    ops::Merge,
    traits::Optimizable,
};

/// A compressed set of `u32` values stored under a single shard key.
///
/// `Bitmap64` only depends on this trait, so any compressed `u32` set can back
/// a shard as long as its encoding is self-delimiting: decoding must consume
/// exactly the bytes written by [`Encodable::encode`].
pub trait Container:
    Default + Clone + Debug + PartialEq + Merge + Optimizable + Encodable
{
    /// the number of values in this container.
    fn cardinality(&self) -> u64;

    /// returns true if this container is empty
    fn is_empty(&self) -> bool;

    /// returns true if this container contains the given value
    fn contains(&self, value: u32) -> bool;

    /// returns the number of values contained in this container up to and
    /// including the value.
    fn rank(&self, value: u32) -> u64;

    /// returns the value at position `idx`.
    fn select(&self, idx: u32) -> Option<u32>;

    fn min(&self) -> Option<u32>;

    fn max(&self) -> Option<u32>;

    /// returns an iterator over all values in this container in ascending
    /// order
    fn iter(&self) -> impl Iterator<Item = u32>;

    /// Inserts the value into the container unless it already exists.
    /// Returns `true` if the insertion occurred, `false` otherwise.
    fn insert(&mut self, value: u32) -> bool;

    /// Removes the value from the container if it exists.
    /// Returns `true` if the removal occurred, `false` otherwise.
    fn remove(&mut self, value: u32) -> bool;

    /// Decodes one container from the front of `data`, advancing `data` past
    /// the consumed bytes.
    fn decode_prefix(data: &mut &[u8]) -> Result<Self, DecodeErr>;
}

impl Container for RoaringBitmap {
    #[inline]
    fn cardinality(&self) -> u64 {
        self.len()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        RoaringBitmap::is_empty(self)
    }

    #[inline]
    fn contains(&self, value: u32) -> bool {
        RoaringBitmap::contains(self, value)
    }

    #[inline]
    fn rank(&self, value: u32) -> u64 {
        RoaringBitmap::rank(self, value)
    }

    #[inline]
    fn select(&self, idx: u32) -> Option<u32> {
        RoaringBitmap::select(self, idx)
    }

    #[inline]
    fn min(&self) -> Option<u32> {
        RoaringBitmap::min(self)
    }

    #[inline]
    fn max(&self) -> Option<u32> {
        RoaringBitmap::max(self)
    }

    #[inline]
    fn iter(&self) -> impl Iterator<Item = u32> {
        RoaringBitmap::iter(self)
    }

    #[inline]
    fn insert(&mut self, value: u32) -> bool {
        RoaringBitmap::insert(self, value)
    }

    #[inline]
    fn remove(&mut self, value: u32) -> bool {
        RoaringBitmap::remove(self, value)
    }

    fn decode_prefix(data: &mut &[u8]) -> Result<Self, DecodeErr> {
        // reading from a slice advances it by exactly the bytes the roaring
        // codec consumed
        RoaringBitmap::deserialize_from(data).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => DecodeErr::Length,
            _ => DecodeErr::Container(err),
        })
    }
}

impl Encodable for RoaringBitmap {
    #[inline]
    fn encoded_size(&self) -> usize {
        self.serialized_size()
    }

    fn encode<B: BufMut>(&self, encoder: &mut Encoder<B>) {
        self.serialize_into(encoder)
            .expect("writes to an Encoder never fail");
    }
}

impl Merge for RoaringBitmap {
    #[inline]
    fn merge(&mut self, rhs: &Self) {
        *self |= rhs;
    }
}

impl Optimizable for RoaringBitmap {
    #[inline]
    fn optimize(&mut self) {
        let _ = RoaringBitmap::optimize(self);
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use itertools::Itertools;
    use roaring::RoaringBitmap;

    use crate::{
        codec::{DecodeErr, Encodable},
        container::Container,
        ops::Merge,
    };

    #[test]
    fn test_roaring_container_read() {
        let bitmap = RoaringBitmap::from_iter([5u32, 10, 1 << 20, u32::MAX]);

        assert_eq!(Container::cardinality(&bitmap), 4);
        assert!(Container::contains(&bitmap, 10));
        assert!(!Container::contains(&bitmap, 11));
        assert_eq!(Container::rank(&bitmap, 4), 0);
        assert_eq!(Container::rank(&bitmap, 5), 1);
        assert_eq!(Container::rank(&bitmap, 11), 2);
        assert_eq!(Container::rank(&bitmap, u32::MAX), 4);
        assert_eq!(Container::select(&bitmap, 2), Some(1 << 20));
        assert_eq!(Container::select(&bitmap, 4), None);
        assert_eq!(Container::min(&bitmap), Some(5));
        assert_eq!(Container::max(&bitmap), Some(u32::MAX));
        assert_eq!(
            Container::iter(&bitmap).collect_vec(),
            vec![5, 10, 1 << 20, u32::MAX]
        );
    }

    #[test]
    fn test_decode_prefix_consumes_exactly() {
        let a = RoaringBitmap::from_iter(0u32..100);
        let b = RoaringBitmap::from_iter([7u32, 70_000]);

        let mut buf = a.encode_to_bytes().to_vec();
        buf.extend_from_slice(&b.encode_to_bytes());
        buf.extend_from_slice(&[0xAA, 0xBB]);

        let mut data = buf.as_slice();
        assert_eq!(RoaringBitmap::decode_prefix(&mut data).unwrap(), a);
        assert_eq!(data.len(), b.encoded_size() + 2);
        assert_eq!(RoaringBitmap::decode_prefix(&mut data).unwrap(), b);
        assert_eq!(data, &[0xAA, 0xBB]);
    }

    #[test]
    fn test_decode_prefix_truncated() {
        let buf = RoaringBitmap::from_iter(0u32..100).encode_to_bytes();
        for len in 0..buf.len() {
            let mut data = &buf[..len];
            assert_matches!(
                RoaringBitmap::decode_prefix(&mut data),
                Err(DecodeErr::Length),
                "truncated to {len} bytes"
            );
        }
    }

    #[test]
    fn test_merge() {
        let mut a = RoaringBitmap::from_iter([1u32, 2]);
        a.merge(&RoaringBitmap::from_iter([2u32, 3]));
        assert_eq!(Container::iter(&a).collect_vec(), vec![1, 2, 3]);
    }
}
