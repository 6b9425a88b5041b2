//! Response queue
//!
//! Bytes the terminal itself must send back to the controlling process:
//! device status reports, cursor position reports, device attributes, Kitty
//! graphics acknowledgements. The external I/O layer drains this queue and
//! writes it to the PTY.

use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct ResponseQueue {
    bytes: VecDeque<u8>,
}

impl ResponseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.bytes.extend(bytes.iter().copied());
    }

    pub fn push_str(&mut self, s: &str) {
        self.push(s.as_bytes());
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Drain up to `out.len()` bytes, FIFO. Removes exactly what was copied;
    /// the remainder stays queued for the next read.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.bytes.len());
        for slot in out.iter_mut().take(n) {
            // Length was checked above
            *slot = self.bytes.pop_front().unwrap_or(0);
        }
        n
    }
}
