//! `bitmap64-rs` is a compressed bitmap over 64-bit unsigned integers (`u64`), built by sharding
//! values across compressed 32-bit containers.
//!
//! ## Key Features:
//!
//! - **Sharded Layout**: Each `u64` is split into a high 32-bit key and a low 32-bit value. Shards are kept in a vector sorted by key, so lookups are a binary search and iteration yields values in ascending order.
//!
//! - **Pluggable Containers**: Shards store their low values in any type implementing [`Container`]. [`RoaringBitmap`](roaring::RoaringBitmap) is the default.
//!
//! - **Stable Encoding**: [`Bitmap64::serialize`] writes a little-endian shard count followed by each `(key, container)` pair. Buffers written by other implementations of this layout decode and re-encode byte for byte.

use thiserror::Error;

mod bitmap64;
mod codec;
mod container;
mod key;
pub mod ops;
mod shard;
mod traits;
mod util;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use bitmap64::Bitmap64;
pub use codec::{DecodeErr, DecodeOptions, Encodable, encoder::Encoder};
pub use container::Container;
pub use key::{Key, SplitKey, combine, split};
pub use traits::Optimizable;

#[derive(Debug, Error)]
pub enum Bitmap64Err {
    #[error("value {0} is not present in the bitmap")]
    NotFound(u64),

    #[error("bitmap is empty")]
    Empty,

    #[error("index {index} is out of range for a bitmap of length {len}")]
    IndexOutOfRange { index: u64, len: u64 },
}
