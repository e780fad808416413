use std::{io, mem::size_of};

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, LittleEndian, SizeError, U32, U64, Unaligned,
};

use crate::{
    codec::encoder::Encoder,
    container::Container,
    key::Key,
    shard::{Shard, ShardIndex},
};

pub mod encoder;

pub trait Encodable {
    fn encoded_size(&self) -> usize;

    fn encode<B: BufMut>(&self, encoder: &mut Encoder<B>);

    fn encode_to_bytes(&self) -> Bytes {
        let size = self.encoded_size();
        let mut encoder = Encoder::new(BytesMut::with_capacity(size));
        self.encode(&mut encoder);
        encoder.into_inner().freeze()
    }
}

#[derive(Debug, Error)]
pub enum DecodeErr {
    #[error("not enough bytes")]
    Length,

    #[error("shard key {key} does not follow shard key {prev}")]
    KeyOrder { prev: Key, key: Key },

    #[error("shard {key} has an empty container")]
    EmptyShard { key: Key },

    #[error("{0} unexpected bytes after the last shard")]
    TrailingBytes(usize),

    #[error("invalid container encoding")]
    Container(#[source] io::Error),
}

impl DecodeErr {
    #[inline]
    fn ensure_bytes_available(data: &[u8], len: usize) -> Result<(), DecodeErr> {
        if data.len() < len {
            Err(Self::Length)
        } else {
            Ok(())
        }
    }
}

impl<S, D> From<SizeError<S, D>> for DecodeErr {
    fn from(_: SizeError<S, D>) -> Self {
        DecodeErr::Length
    }
}

/// The first eight bytes of an encoded bitmap
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout)]
#[repr(C)]
pub struct Header {
    shards: U64<LittleEndian>,
}

impl Header {
    pub const SIZE: usize = size_of::<Self>();

    pub fn new(shards: usize) -> Self {
        Self { shards: (shards as u64).into() }
    }

    pub fn shards(&self) -> u64 {
        self.shards.get()
    }
}

/// Precedes each encoded container
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout)]
#[repr(C)]
pub struct ShardKey {
    key: U32<LittleEndian>,
}

impl ShardKey {
    pub const SIZE: usize = size_of::<Self>();

    pub fn new(key: Key) -> Self {
        Self { key: key.into() }
    }

    pub fn key(&self) -> Key {
        self.key.get()
    }
}

static_assertions::const_assert_eq!(Header::SIZE, 8);
static_assertions::const_assert_eq!(ShardKey::SIZE, 4);

/// The smallest encoding of a shard: a key plus an empty roaring container
/// (cookie and container count).
const MIN_SHARD_SIZE: usize = ShardKey::SIZE + 8;

/// Controls how strictly [`crate::Bitmap64::deserialize_with`] validates its
/// input.
///
/// By default keys must be strictly increasing and the buffer must end after
/// the last shard. Empty containers are dropped, since writers that don't
/// prune shards after removals emit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    strict_order: bool,
    allow_empty_shards: bool,
    allow_trailing_bytes: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::STRICT.allow_empty_shards(true)
    }
}

impl DecodeOptions {
    /// Accepts exactly what the encoder produces: empty containers are
    /// rejected as well.
    pub const STRICT: Self = Self {
        strict_order: true,
        allow_empty_shards: false,
        allow_trailing_bytes: false,
    };

    /// Accepts any buffer with a readable layout: out of order
    /// and duplicate keys are sorted and merged, empty containers are dropped
    /// and trailing bytes are ignored.
    pub const LENIENT: Self = Self {
        strict_order: false,
        allow_empty_shards: true,
        allow_trailing_bytes: true,
    };

    /// When disabled, shards are inserted at their sorted position and
    /// containers sharing a key are merged.
    pub const fn strict_order(mut self, strict: bool) -> Self {
        self.strict_order = strict;
        self
    }

    /// When enabled, empty containers are skipped rather than rejected.
    pub const fn allow_empty_shards(mut self, allow: bool) -> Self {
        self.allow_empty_shards = allow;
        self
    }

    /// When enabled, bytes following the last shard are ignored rather than
    /// rejected.
    pub const fn allow_trailing_bytes(mut self, allow: bool) -> Self {
        self.allow_trailing_bytes = allow;
        self
    }
}

pub(crate) fn decode<C: Container>(
    mut data: &[u8],
    options: DecodeOptions,
) -> Result<ShardIndex<C>, DecodeErr> {
    let (header, rest) = Header::read_from_prefix(data)?;
    data = rest;

    let count = header.shards();
    let max_count = (data.len() / MIN_SHARD_SIZE) as u64;
    if count > max_count {
        return Err(DecodeErr::Length);
    }
    tracing::trace!(shards = count, bytes = data.len(), "decoding bitmap64");

    let mut index = ShardIndex::with_capacity(count as usize);
    for _ in 0..count {
        DecodeErr::ensure_bytes_available(data, ShardKey::SIZE)?;
        let (key, rest) = ShardKey::read_from_prefix(data)?;
        data = rest;
        let key = key.key();

        let container = C::decode_prefix(&mut data)?;
        tracing::trace!(key, cardinality = container.cardinality(), "decoded shard");

        if container.is_empty() {
            if !options.allow_empty_shards {
                return Err(DecodeErr::EmptyShard { key });
            }
            tracing::debug!(key, "skipping empty shard");
            continue;
        }

        let shard = Shard::new(key, container);
        match index.last() {
            Some(last) if last.key() >= key => {
                if options.strict_order {
                    return Err(DecodeErr::KeyOrder { prev: last.key(), key });
                }
                if let Some(dup) = index.insert_sorted(shard) {
                    tracing::debug!(key, "merging duplicate shard");
                    if let Some(existing) = index.lookup_mut(key) {
                        existing.container_mut().merge(dup.container());
                    }
                }
            }
            _ => index.push(shard),
        }
    }

    if !data.is_empty() {
        if !options.allow_trailing_bytes {
            return Err(DecodeErr::TrailingBytes(data.len()));
        }
        tracing::debug!(trailing = data.len(), "ignoring trailing bytes");
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use itertools::Itertools;
    use roaring::RoaringBitmap;
    use zerocopy::IntoBytes;

    use crate::{
        Bitmap64,
        codec::{DecodeErr, DecodeOptions, Encodable, Header, ShardKey},
        key::combine,
    };

    /// A single shard under key 0 holding a run container of 1..=52.
    const RUN_SHARD_FIXTURE: &[u8] = b"\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00;0\x00\x00\x01\
        \x00\x003\x00\x01\x00\x01\x003\x00";

    fn mkshard(key: u32, values: impl IntoIterator<Item = u32>) -> Vec<u8> {
        let mut buf = ShardKey::new(key).as_bytes().to_vec();
        buf.extend_from_slice(&RoaringBitmap::from_iter(values).encode_to_bytes());
        buf
    }

    fn mkbuf(shards: &[Vec<u8>]) -> Vec<u8> {
        let mut buf = Header::new(shards.len()).as_bytes().to_vec();
        for shard in shards {
            buf.extend_from_slice(shard);
        }
        buf
    }

    #[test]
    fn test_run_shard_fixture() {
        assert_eq!(RUN_SHARD_FIXTURE.len(), 27);

        let bitmap = Bitmap64::deserialize(RUN_SHARD_FIXTURE).unwrap();
        assert_eq!(bitmap.len(), 52);
        assert_eq!(bitmap.shard_count(), 1);
        itertools::assert_equal(bitmap.iter(), 1..=52u64);

        assert_eq!(bitmap.serialized_size(), RUN_SHARD_FIXTURE.len());
        assert_eq!(bitmap.serialize().as_ref(), RUN_SHARD_FIXTURE);
    }

    #[test]
    fn test_byteorder() {
        let bitmap: Bitmap64 = Bitmap64::from_iter([combine(0x0102_0304, 7)]);
        let buf = bitmap.serialize();

        assert_eq!(
            &buf[..12],
            &[
                0x01, 0, 0, 0, 0, 0, 0, 0, // shard count
                0x04, 0x03, 0x02, 0x01, // key
            ]
        );
        assert_eq!(
            &buf[12..],
            RoaringBitmap::from_iter([7u32]).encode_to_bytes().as_ref()
        );
    }

    #[test]
    fn test_empty() {
        let buf = Bitmap64::EMPTY.serialize();
        assert_eq!(buf.as_ref(), &[0; 8]);
        assert!(Bitmap64::deserialize(&buf).unwrap().is_empty());
    }

    #[test]
    fn test_length_corruption() {
        for i in 0..Header::SIZE {
            let truncated = [0].repeat(i);
            assert_matches!(
                Bitmap64::deserialize(&truncated),
                Err(DecodeErr::Length),
                "Failed for truncated buffer of size {}",
                i
            );
        }

        for i in Header::SIZE..RUN_SHARD_FIXTURE.len() {
            assert_matches!(
                Bitmap64::deserialize(&RUN_SHARD_FIXTURE[..i]),
                Err(DecodeErr::Length),
                "Failed for truncated fixture of size {}",
                i
            );
        }
    }

    #[test]
    fn test_shard_count_exceeds_input() {
        let mut buf = RUN_SHARD_FIXTURE.to_vec();
        buf[..8].copy_from_slice(&u64::MAX.to_le_bytes());
        assert_matches!(Bitmap64::deserialize(&buf), Err(DecodeErr::Length));

        let mut buf = mkbuf(&[mkshard(0, [1]), mkshard(1, [1])]);
        buf[0] = 3;
        assert_matches!(Bitmap64::deserialize(&buf), Err(DecodeErr::Length));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut buf = RUN_SHARD_FIXTURE.to_vec();
        buf.extend_from_slice(&[1, 2, 3]);

        assert_matches!(
            Bitmap64::deserialize(&buf),
            Err(DecodeErr::TrailingBytes(3))
        );

        let options = DecodeOptions::default().allow_trailing_bytes(true);
        let bitmap = Bitmap64::deserialize_with(&buf, options).unwrap();
        assert_eq!(bitmap.serialize().as_ref(), RUN_SHARD_FIXTURE);
    }

    #[test]
    fn test_key_order() {
        let buf = mkbuf(&[mkshard(5, [1, 2]), mkshard(2, [3]), mkshard(5, [4])]);

        assert_matches!(
            Bitmap64::deserialize(&buf),
            Err(DecodeErr::KeyOrder { prev: 5, key: 2 })
        );

        let options = DecodeOptions::default().strict_order(false);
        let bitmap = Bitmap64::deserialize_with(&buf, options).unwrap();
        assert_eq!(bitmap.shard_count(), 2);
        assert_eq!(
            bitmap.iter().collect_vec(),
            vec![
                combine(2, 3),
                combine(5, 1),
                combine(5, 2),
                combine(5, 4)
            ]
        );

        // re-encoding restores the canonical layout
        let canonical = mkbuf(&[mkshard(2, [3]), mkshard(5, [1, 2, 4])]);
        assert_eq!(bitmap.serialize().as_ref(), canonical.as_slice());
    }

    #[test]
    fn test_duplicate_key() {
        let buf = mkbuf(&[mkshard(1, [1]), mkshard(1, [2])]);
        assert_matches!(
            Bitmap64::deserialize(&buf),
            Err(DecodeErr::KeyOrder { prev: 1, key: 1 })
        );

        let bitmap = Bitmap64::deserialize_with(&buf, DecodeOptions::LENIENT).unwrap();
        assert_eq!(bitmap.iter().collect_vec(), vec![combine(1, 1), combine(1, 2)]);
    }

    #[test]
    fn test_empty_shard() {
        let buf = mkbuf(&[mkshard(1, []), mkshard(2, [9])]);
        assert_matches!(
            Bitmap64::deserialize_with(&buf, DecodeOptions::STRICT),
            Err(DecodeErr::EmptyShard { key: 1 })
        );

        let bitmap = Bitmap64::deserialize(&buf).unwrap();
        assert_eq!(bitmap.shard_count(), 1);
        assert_eq!(bitmap.iter().collect_vec(), vec![combine(2, 9)]);
    }

    #[test]
    fn test_unpruned_empty_container() {
        // one shard under key 0 whose container was emptied by removals
        let buf: &[u8] = &[
            0x01, 0, 0, 0, 0, 0, 0, 0, // shard count
            0, 0, 0, 0, // key
            0x3a, 0x30, 0, 0, 0, 0, 0, 0, // empty roaring container
        ];

        let bitmap = Bitmap64::deserialize(buf).unwrap();
        assert!(bitmap.is_empty());
        assert_eq!(bitmap.len(), 0);
        assert_eq!(bitmap.shard_count(), 0);
        // the empty shard is pruned, so re-encoding drops it
        assert_eq!(bitmap.serialize().as_ref(), &[0; 8]);

        assert_matches!(
            Bitmap64::deserialize_with(buf, DecodeOptions::STRICT),
            Err(DecodeErr::EmptyShard { key: 0 })
        );
    }

    #[test]
    fn test_corrupted_container() {
        let mut buf = RUN_SHARD_FIXTURE.to_vec();
        // clobber the roaring cookie
        buf[12] = 0;
        buf[13] = 0;
        assert_matches!(Bitmap64::deserialize(&buf), Err(DecodeErr::Container(_)));
    }
}
