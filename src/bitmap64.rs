use std::fmt::Debug;

use bytes::{BufMut, Bytes};
use roaring::RoaringBitmap;

use crate::{
    Bitmap64Err,
    codec::{DecodeErr, DecodeOptions, Encodable, Header, ShardKey, decode, encoder::Encoder},
    container::Container,
    key::{IterCombined, SplitKey, combine},
    shard::ShardIndex,
    traits::Optimizable,
    util::IteratorExt,
};

/// A compressed bitmap of 64-bit unsigned integers.
///
/// Values are sharded by their high 32 bits. Each shard stores the low 32
/// bits of its values in a compressed [`Container`], and shards are kept
/// sorted by key so that iterating them in order yields values in ascending
/// order. By default containers are [`RoaringBitmap`]s, and the serialized
/// form is compatible with the common "64-bit roaring as a list of 32-bit
/// roaring bitmaps" layout.
///
/// # Examples
///
/// ```
/// use bitmap64_rs::Bitmap64;
///
/// let mut bitmap = Bitmap64::new();
/// bitmap.insert(1);
/// bitmap.insert(1 << 33);
/// bitmap.insert((1 << 33) + 10);
/// bitmap.insert(1 << 34);
///
/// assert_eq!(bitmap.len(), 4);
/// assert!(bitmap.contains(1 << 33));
/// assert_eq!(bitmap.rank(1 << 33), 2);
/// assert_eq!(bitmap.min().unwrap(), 1);
/// assert_eq!(bitmap.max().unwrap(), 1 << 34);
///
/// let values: Vec<u64> = bitmap.iter().collect();
/// assert_eq!(values, vec![1, 1 << 33, (1 << 33) + 10, 1 << 34]);
/// ```
///
/// Serializing and deserializing:
///
/// ```
/// use bitmap64_rs::Bitmap64;
///
/// let bitmap: Bitmap64 = [3, 1 << 40, u64::MAX].into_iter().collect();
/// let bytes = bitmap.serialize();
///
/// let decoded = Bitmap64::deserialize(&bytes).unwrap();
/// assert_eq!(decoded, bitmap);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap64<C = RoaringBitmap> {
    shards: ShardIndex<C>,
}

impl Bitmap64 {
    /// An empty bitmap, suitable for usage in a const context.
    pub const EMPTY: Self = Bitmap64 { shards: ShardIndex::EMPTY };

    /// Creates an empty bitmap backed by [`RoaringBitmap`] containers.
    pub fn new() -> Self {
        Self::EMPTY
    }

    /// Deserializes a bitmap using the default [`DecodeOptions`]: keys must be
    /// strictly increasing, empty containers are dropped and the buffer must
    /// end after the last shard.
    ///
    /// # Examples
    ///
    /// ```
    /// use bitmap64_rs::{Bitmap64, DecodeErr};
    ///
    /// let bitmap = Bitmap64::deserialize(&[0; 8]).unwrap();
    /// assert!(bitmap.is_empty());
    ///
    /// assert!(matches!(Bitmap64::deserialize(&[0; 4]), Err(DecodeErr::Length)));
    /// ```
    pub fn deserialize(data: &[u8]) -> Result<Self, DecodeErr> {
        Self::decode(data, DecodeOptions::default())
    }

    /// Deserializes a bitmap using the provided [`DecodeOptions`].
    pub fn deserialize_with(data: &[u8], options: DecodeOptions) -> Result<Self, DecodeErr> {
        Self::decode(data, options)
    }
}

impl<C> Default for Bitmap64<C> {
    fn default() -> Self {
        Self { shards: ShardIndex::default() }
    }
}

impl<C: Container> Debug for Bitmap64<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap64")
            .field("len", &self.len())
            .field("shards", &self.shards)
            .finish()
    }
}

impl<C: Container> Bitmap64<C> {
    /// Decodes a bitmap whose shards are stored in containers of type `C`.
    pub fn decode(data: &[u8], options: DecodeOptions) -> Result<Self, DecodeErr> {
        Ok(Self { shards: decode(data, options)? })
    }

    /// Serializes this bitmap into a new buffer.
    #[inline]
    pub fn serialize(&self) -> Bytes {
        self.encode_to_bytes()
    }

    /// The exact number of bytes [`Bitmap64::serialize`] will produce.
    #[inline]
    pub fn serialized_size(&self) -> usize {
        self.encoded_size()
    }

    /// Returns the total number of values in this bitmap.
    pub fn len(&self) -> u64 {
        self.shards.cardinality()
    }

    /// Returns `true` if this bitmap has no shards. Shards are dropped as
    /// soon as their last value is removed, so this is equivalent to
    /// `len() == 0`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Returns the number of distinct high 32-bit keys present.
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Returns `true` if this bitmap contains the value.
    pub fn contains(&self, value: u64) -> bool {
        let (key, low) = value.split();
        self.shards
            .lookup(key)
            .is_some_and(|shard| shard.container().contains(low))
    }

    /// Inserts a value into this bitmap.
    ///
    /// Returns `true` if the value was newly inserted, or `false` if it was
    /// already present. Callers which don't care can ignore the result.
    ///
    /// # Examples
    ///
    /// ```
    /// use bitmap64_rs::Bitmap64;
    ///
    /// let mut bitmap = Bitmap64::new();
    /// assert!(bitmap.insert(u64::MAX));
    /// assert!(!bitmap.insert(u64::MAX));
    /// assert_eq!(bitmap.len(), 1);
    /// ```
    pub fn insert(&mut self, value: u64) -> bool {
        let (key, low) = value.split();
        self.shards.lookup_or_create(key).container_mut().insert(low)
    }

    /// Inserts a value, reporting whether it was newly added.
    ///
    /// Identical to [`Bitmap64::insert`], but marked `#[must_use]` for call
    /// sites that rely on detecting duplicates.
    #[must_use]
    #[inline]
    pub fn insert_checked(&mut self, value: u64) -> bool {
        self.insert(value)
    }

    /// Removes a value from this bitmap if present.
    ///
    /// Returns `true` if the value was present and removed.
    pub fn remove(&mut self, value: u64) -> bool {
        let (key, low) = value.split();
        let Some(shard) = self.shards.lookup_mut(key) else {
            return false;
        };
        let removed = shard.container_mut().remove(low);
        if removed {
            self.shards.remove_if_empty(key);
        }
        removed
    }

    /// Removes a value from this bitmap, failing with
    /// [`Bitmap64Err::NotFound`] if it isn't present. The bitmap is left
    /// unchanged on failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use bitmap64_rs::{Bitmap64, Bitmap64Err};
    ///
    /// let mut bitmap: Bitmap64 = [7].into_iter().collect();
    /// assert!(matches!(bitmap.remove_checked(8), Err(Bitmap64Err::NotFound(8))));
    /// assert!(bitmap.remove_checked(7).is_ok());
    /// assert!(!bitmap.contains(7));
    /// ```
    pub fn remove_checked(&mut self, value: u64) -> Result<(), Bitmap64Err> {
        if self.remove(value) {
            Ok(())
        } else {
            Err(Bitmap64Err::NotFound(value))
        }
    }

    /// Returns the smallest value in this bitmap.
    pub fn min(&self) -> Result<u64, Bitmap64Err> {
        self.shards
            .first()
            .and_then(|shard| shard.container().min().map(|low| combine(shard.key(), low)))
            .ok_or(Bitmap64Err::Empty)
    }

    /// Returns the largest value in this bitmap.
    pub fn max(&self) -> Result<u64, Bitmap64Err> {
        self.shards
            .last()
            .and_then(|shard| shard.container().max().map(|low| combine(shard.key(), low)))
            .ok_or(Bitmap64Err::Empty)
    }

    /// Returns the number of values in this bitmap that are less than or
    /// equal to the given value.
    ///
    /// # Examples
    ///
    /// ```
    /// use bitmap64_rs::Bitmap64;
    ///
    /// let bitmap: Bitmap64 = [10, 20, 1 << 40].into_iter().collect();
    ///
    /// assert_eq!(bitmap.rank(5), 0);
    /// assert_eq!(bitmap.rank(10), 1);
    /// assert_eq!(bitmap.rank(25), 2);
    /// assert_eq!(bitmap.rank(1 << 40), 3);
    /// assert_eq!(bitmap.rank(u64::MAX), 3);
    /// ```
    pub fn rank(&self, value: u64) -> u64 {
        let (key, low) = value.split();
        let mut total = 0;
        for shard in self.shards.iter() {
            if shard.key() > key {
                break;
            } else if shard.key() < key {
                total += shard.container().cardinality();
            } else {
                return total + shard.container().rank(low);
            }
        }
        total
    }

    /// Returns the 0-based position of the value if it is present.
    pub fn position(&self, value: u64) -> Option<u64> {
        self.contains(value).then(|| self.rank(value) - 1)
    }

    /// Returns the value at position `idx` in ascending order, or `None` if
    /// `idx` is out of bounds.
    pub fn select(&self, idx: u64) -> Option<u64> {
        let mut remaining = idx;
        for shard in self.shards.iter() {
            let cardinality = shard.container().cardinality();
            if remaining < cardinality {
                // a container never holds more than 2^32 values
                let low = shard.container().select(remaining as u32)?;
                return Some(combine(shard.key(), low));
            }
            remaining -= cardinality;
        }
        None
    }

    /// Returns the value at position `idx` in ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use bitmap64_rs::{Bitmap64, Bitmap64Err};
    ///
    /// let bitmap: Bitmap64 = [1, 1 << 33].into_iter().collect();
    /// assert_eq!(bitmap.get(1).unwrap(), 1 << 33);
    /// assert!(matches!(
    ///     bitmap.get(2),
    ///     Err(Bitmap64Err::IndexOutOfRange { index: 2, len: 2 })
    /// ));
    /// ```
    pub fn get(&self, idx: u64) -> Result<u64, Bitmap64Err> {
        self.select(idx)
            .ok_or_else(|| Bitmap64Err::IndexOutOfRange { index: idx, len: self.len() })
    }

    /// Returns an iterator over all values in ascending order.
    ///
    /// Each call starts a fresh pass over the bitmap.
    pub fn iter(&self) -> impl Iterator<Item = u64> {
        let len = self.len();
        self.shards
            .iter()
            .flat_map(|shard| IterCombined::new(shard.key(), shard.container().iter()))
            .with_size_hint(len)
    }
}

impl<C: Container> Encodable for Bitmap64<C> {
    fn encoded_size(&self) -> usize {
        Header::SIZE
            + self
                .shards
                .iter()
                .map(|shard| ShardKey::SIZE + shard.container().encoded_size())
                .sum::<usize>()
    }

    fn encode<B: BufMut>(&self, encoder: &mut Encoder<B>) {
        encoder.put_header(self.shards.len());
        for shard in self.shards.iter() {
            encoder.put_shard(shard.key(), shard.container());
        }
    }
}

impl<C: Container> Optimizable for Bitmap64<C> {
    fn optimize(&mut self) {
        for shard in self.shards.iter_mut() {
            shard.container_mut().optimize();
        }
    }
}

impl<C: Container> FromIterator<u64> for Bitmap64<C> {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut bitmap = Self::default();
        bitmap.extend(iter);
        bitmap
    }
}

impl<C: Container> Extend<u64> for Bitmap64<C> {
    fn extend<T: IntoIterator<Item = u64>>(&mut self, iter: T) {
        for value in iter {
            self.insert(value);
        }
    }
}
