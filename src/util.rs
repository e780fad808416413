pub trait IteratorExt: Iterator + Sized {
    #[inline]
    fn with_size_hint(self, hint: u64) -> SizeHintIter<Self> {
        SizeHintIter::new(hint, self)
    }
}

impl<I: Iterator> IteratorExt for I {}

/// A `SizeHintIter` wraps an iter whose exact length is known up front.
///
/// The length is tracked as a `u64`; when it doesn't fit in a `usize` the
/// hint saturates its lower bound and reports no upper bound.
#[must_use]
pub struct SizeHintIter<I> {
    remaining: u64,
    iter: I,
}

impl<T, I: Iterator<Item = T>> SizeHintIter<I> {
    pub fn new(size: u64, iter: I) -> Self {
        Self { remaining: size, iter }
    }
}

impl<T, I: Iterator<Item = T>> Iterator for SizeHintIter<I> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.iter.next();
        if next.is_some() {
            self.remaining = self.remaining.saturating_sub(1);
        } else {
            self.remaining = 0;
        }
        next
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl<T, I: std::iter::FusedIterator<Item = T>> std::iter::FusedIterator for SizeHintIter<I> {}
