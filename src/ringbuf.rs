//! A fixed-capacity byte ring buffer.
//!
//! Every protocol layer above TLS reads and writes through one of
//! these instead of growable `Vec<u8>` buffers, so a slow peer can
//! only ever back-pressure the session, never make it allocate without
//! bound. Capacity is fixed at construction and never reallocated;
//! `clear()` is used to recycle the buffer across reconnects.

/// One slot of the backing store is always kept empty so that
/// `head == tail` is unambiguously "empty" rather than also meaning
/// "full".
pub struct RingBuf {
    buf: Vec<u8>,
    head: usize,
    tail: usize,
}

impl RingBuf {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring buffer capacity must be at least 2");
        Self {
            buf: vec![0u8; capacity],
            head: 0,
            tail: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn bytes_available(&self) -> usize {
        (self.head + self.buf.len() - self.tail) % self.buf.len()
    }

    pub fn bytes_free(&self) -> usize {
        self.capacity() - 1 - self.bytes_available()
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }

    /// Copies `src` in; fails without writing anything if it doesn't fit.
    pub fn push(&mut self, src: &[u8]) -> Result<(), &'static str> {
        if src.len() > self.bytes_free() {
            return Err("ring buffer full");
        }
        let cap = self.buf.len();
        let first = cap - self.head;
        if src.len() <= first {
            self.buf[self.head..self.head + src.len()].copy_from_slice(src);
        } else {
            self.buf[self.head..cap].copy_from_slice(&src[..first]);
            self.buf[..src.len() - first].copy_from_slice(&src[first..]);
        }
        self.bump_head(src.len());
        Ok(())
    }

    /// Copies up to `dst.len()` bytes out, returns the number copied.
    pub fn pop(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.bytes_available());
        let cap = self.buf.len();
        let first = (cap - self.tail).min(n);
        dst[..first].copy_from_slice(&self.buf[self.tail..self.tail + first]);
        if n > first {
            dst[first..n].copy_from_slice(&self.buf[..n - first]);
        }
        self.bump_tail(n);
        n
    }

    pub fn bump_head(&mut self, n: usize) {
        debug_assert!(n <= self.bytes_free());
        self.head = (self.head + n) % self.buf.len();
    }

    pub fn bump_tail(&mut self, n: usize) {
        debug_assert!(n <= self.bytes_available());
        self.tail = (self.tail + n) % self.buf.len();
    }

    /// Contiguous writable span starting at `head`. May be shorter than
    /// `bytes_free()` when the free region wraps around the end of the
    /// backing store — callers loop, writing and calling `bump_head`,
    /// until they've placed everything they need to.
    pub fn linear_insert_range(&mut self) -> &mut [u8] {
        let cap = self.buf.len();
        let free = self.bytes_free();
        if self.head >= self.tail {
            // Free region may wrap: [head..cap) then [0..tail).
            let tail_is_zero_and_full_wrap = self.tail == 0 && self.head != 0;
            let first_len = if tail_is_zero_and_full_wrap {
                cap - self.head - 1
            } else {
                (cap - self.head).min(free)
            };
            &mut self.buf[self.head..self.head + first_len]
        } else {
            let first_len = (self.tail - self.head - 1).min(free);
            &mut self.buf[self.head..self.head + first_len]
        }
    }

    /// Contiguous readable span starting at `tail`; same wrap caveat as
    /// `linear_insert_range`.
    pub fn linear_read_range(&self) -> &[u8] {
        let cap = self.buf.len();
        let avail = self.bytes_available();
        if self.tail <= self.head {
            &self.buf[self.tail..self.tail + avail]
        } else {
            let first_len = (cap - self.tail).min(avail);
            &self.buf[self.tail..self.tail + first_len]
        }
    }

    /// First offset (from `tail`) of `needle` within the readable
    /// region, or `None`. O(n) over the readable bytes.
    pub fn find_bytes(&self, needle: &[u8]) -> Option<usize> {
        if needle.is_empty() || needle.len() > self.bytes_available() {
            return None;
        }
        let avail = self.bytes_available();
        for offset in 0..=(avail - needle.len()) {
            let mut matched = true;
            for (i, &b) in needle.iter().enumerate() {
                let idx = (self.tail + offset + i) % self.buf.len();
                if self.buf[idx] != b {
                    matched = false;
                    break;
                }
            }
            if matched {
                return Some(offset);
            }
        }
        None
    }

    /// Pushes as much of `src` as currently fits, returning the count
    /// written. Used by the WebSocket TX framer, which must be able to
    /// queue a prefix of a frame and report the short count back to
    /// the caller instead of failing outright.
    pub fn push_partial(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.bytes_free());
        if n > 0 {
            self.push(&src[..n]).expect("n was computed from bytes_free");
        }
        n
    }

    /// Copies `n` bytes starting at `tail` without consuming them, for
    /// callers that need to peek before committing to `bump_tail`.
    pub fn peek(&self, n: usize) -> Vec<u8> {
        let n = n.min(self.bytes_available());
        let mut out = vec![0u8; n];
        let cap = self.buf.len();
        let first = (cap - self.tail).min(n);
        out[..first].copy_from_slice(&self.buf[self.tail..self.tail + first]);
        if n > first {
            out[first..].copy_from_slice(&self.buf[..n - first]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_holds_after_push_pop() {
        let mut rb = RingBuf::with_capacity(8);
        assert_eq!(rb.bytes_available() + rb.bytes_free(), 7);
        rb.push(b"abcde").unwrap();
        assert_eq!(rb.bytes_available(), 5);
        assert_eq!(rb.bytes_available() + rb.bytes_free(), 7);
        let mut out = [0u8; 5];
        assert_eq!(rb.pop(&mut out), 5);
        assert_eq!(&out, b"abcde");
    }

    #[test]
    fn push_fails_when_too_big() {
        let mut rb = RingBuf::with_capacity(4);
        assert!(rb.push(b"abcd").is_err());
        assert!(rb.push(b"abc").is_ok());
    }

    #[test]
    fn wraps_around() {
        let mut rb = RingBuf::with_capacity(8);
        rb.push(b"abcdeff").unwrap();
        let mut out = [0u8; 5];
        rb.pop(&mut out);
        rb.push(b"xyz").unwrap();
        let mut rest = vec![0u8; rb.bytes_available()];
        rb.pop(&mut rest);
        assert_eq!(rest, b"ffxyz");
    }

    #[test]
    fn find_bytes_locates_needle_across_wrap() {
        let mut rb = RingBuf::with_capacity(16);
        rb.push(b"0123456789012").unwrap();
        let mut sink = [0u8; 10];
        rb.pop(&mut sink);
        rb.push(b"\r\n\r\n").unwrap();
        let off = rb.find_bytes(b"\r\n\r\n").unwrap();
        assert_eq!(off, 3);
    }

    #[test]
    fn pop_returns_min_of_requested_and_available() {
        let mut rb = RingBuf::with_capacity(8);
        rb.push(b"ab").unwrap();
        let mut out = [0u8; 5];
        assert_eq!(rb.pop(&mut out), 2);
    }
}
