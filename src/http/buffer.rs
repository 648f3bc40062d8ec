//! Growable read buffer with explicit consume-and-compact.

/// Byte buffer that accumulates reads of unpredictable size.
///
/// Bytes are appended at the tail through [`ReadBuffer::spare_mut`] and
/// [`ReadBuffer::advance`]; parsed bytes are dropped from the head with
/// [`ReadBuffer::consume`], which moves the remainder to the front.
#[derive(Debug)]
pub struct ReadBuffer {
    buf: Vec<u8>,
    filled: usize,
}

impl ReadBuffer {
    /// Create a buffer with `capacity` bytes of initial room (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)],
            filled: 0,
        }
    }

    /// Bytes received but not yet consumed.
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    /// Unfilled tail, doubling the allocation first when the buffer is full.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        if self.filled == self.buf.len() {
            let grown = self.buf.len() * 2;
            tracing::trace!(from = self.buf.len(), to = grown, "Growing read buffer");
            self.buf.resize(grown, 0);
        }
        &mut self.buf[self.filled..]
    }

    /// Mark `n` bytes of the spare tail as filled.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.filled + n <= self.buf.len());
        self.filled += n;
    }

    /// Discard the first `n` filled bytes and compact the rest to the front.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.filled);
        if n == 0 {
            return;
        }
        self.buf.copy_within(n..self.filled, 0);
        self.filled -= n;
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Current allocation size.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(buf: &mut ReadBuffer, data: &[u8]) {
        let mut rest = data;
        while !rest.is_empty() {
            let spare = buf.spare_mut();
            let n = spare.len().min(rest.len());
            spare[..n].copy_from_slice(&rest[..n]);
            buf.advance(n);
            rest = &rest[n..];
        }
    }

    #[test]
    fn test_grows_by_doubling() {
        let mut buf = ReadBuffer::with_capacity(4);
        push(&mut buf, b"abcd");
        assert_eq!(buf.capacity(), 4);

        push(&mut buf, b"e");
        assert_eq!(buf.capacity(), 8);
        assert_eq!(buf.filled(), b"abcde");
    }

    #[test]
    fn test_consume_compacts() {
        let mut buf = ReadBuffer::with_capacity(8);
        push(&mut buf, b"GET /\r\n");
        buf.consume(4);
        assert_eq!(buf.filled(), b"/\r\n");
        assert_eq!(buf.len(), 3);

        push(&mut buf, b"xy");
        assert_eq!(buf.filled(), b"/\r\nxy");

        buf.consume(5);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_zero_capacity_still_usable() {
        let mut buf = ReadBuffer::with_capacity(0);
        assert_eq!(buf.capacity(), 1);
        push(&mut buf, b"abc");
        assert_eq!(buf.filled(), b"abc");
    }
}
