/// Forward cursor over a window of ring history.
///
/// Produced by [`RingBuffer::delay_range()`](super::RingBuffer::delay_range).
/// Yields `zeros` zero samples first (history the ring does not have yet),
/// then `remaining` stored samples, oldest first.
pub struct DelayRange<'a> {
    buffer: &'a [i32],
    pos: usize,
    remaining: usize,
    zeros: usize,
}

impl<'a> DelayRange<'a> {
    pub(super) fn new(buffer: &'a [i32], pos: usize, remaining: usize, zeros: usize) -> Self {
        DelayRange {
            buffer,
            pos,
            remaining,
            zeros,
        }
    }

    /// The sample under the cursor, or 0 in the zero-padded prefix or past the end.
    #[inline]
    pub fn value(&self) -> i32 {
        if self.zeros > 0 || self.remaining == 0 {
            0
        } else {
            self.buffer[self.pos]
        }
    }

    /// Move to the next sample. Does nothing once the range is exhausted.
    #[inline]
    pub fn advance(&mut self) {
        if self.zeros > 0 {
            self.zeros -= 1;
            return;
        }
        if self.remaining == 0 {
            return;
        }
        self.remaining -= 1;
        self.pos += 1;
        if self.pos == self.buffer.len() {
            self.pos = 0;
        }
    }

    /// Number of samples left, including the zero-padded prefix.
    #[inline]
    pub fn length(&self) -> usize {
        self.zeros + self.remaining
    }
}

impl Iterator for DelayRange<'_> {
    type Item = i32;

    #[inline]
    fn next(&mut self) -> Option<i32> {
        if self.length() == 0 {
            return None;
        }
        let value = self.value();
        self.advance();
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.length();
        (n, Some(n))
    }
}

impl ExactSizeIterator for DelayRange<'_> {}
