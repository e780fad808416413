use std::io;

use bytes::BufMut;
use zerocopy::IntoBytes;

use crate::{
    codec::{Encodable, Header, ShardKey},
    key::Key,
};

pub struct Encoder<B: BufMut> {
    buf: B,
}

impl<B: BufMut> Encoder<B> {
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    /// Retrieve the wrapped buffer from the `Encoder`
    pub fn into_inner(self) -> B {
        self.buf
    }

    /// Write the shard count which prefixes every encoded bitmap.
    pub(crate) fn put_header(&mut self, shards: usize) {
        let header = Header::new(shards);
        self.put_slice(header.as_bytes());
    }

    /// Encode a shard: its key followed by its container.
    pub(crate) fn put_shard<C: Encodable>(&mut self, key: Key, container: &C) {
        let key = ShardKey::new(key);
        self.put_slice(key.as_bytes());
        container.encode(self);
    }

    fn put_slice(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }
}

/// Containers encode themselves through `io::Write`.
impl<B: BufMut> io::Write for Encoder<B> {
    #[inline]
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.put_slice(data);
        Ok(data.len())
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
