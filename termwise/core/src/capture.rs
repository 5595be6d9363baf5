//! Capture Buffer
//!
//! Fixed-capacity ring of recent terminal output lines. The buffer is shared
//! between the PTY reader (writer side) and whoever assembles LLM context
//! (reader side), so it is guarded by a reader/writer lock: writes are
//! exclusive, snapshots may run concurrently with each other.
//!
//! Lines are opaque byte sequences. Nothing here assumes valid UTF-8; the
//! context assembler deals with encoding when it builds prompts.
//!
//! ```text
//!   write("c")           head
//!                          v
//!   [ "a" | "b" | "c" |    ]    size = 3, capacity = 4
//! ```

use std::io;
use std::sync::Arc;

use parking_lot::RwLock;

/// Capacity used when a non-positive capacity is requested
pub const DEFAULT_CAPTURE_CAPACITY: usize = 2000;

// ============================================================================
// Ring storage
// ============================================================================

#[derive(Debug)]
struct Ring {
    /// Slots filled so far; grows up to `capacity`, then is reused in place
    slots: Vec<Vec<u8>>,
    /// Next slot to write
    head: usize,
    capacity: usize,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            head: 0,
            capacity,
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn push(&mut self, line: &[u8]) {
        if self.slots.len() < self.capacity {
            self.slots.push(line.to_vec());
        } else {
            // Reuse the evicted line's allocation
            let slot = &mut self.slots[self.head];
            slot.clear();
            slot.extend_from_slice(line);
        }
        self.head = (self.head + 1) % self.capacity;
    }

    fn last_n(&self, n: usize) -> Vec<Vec<u8>> {
        let n = n.min(self.len());
        (0..n)
            .map(|i| {
                let idx = (self.head + self.capacity - n + i) % self.capacity;
                self.slots[idx].clone()
            })
            .collect()
    }
}

// ============================================================================
// Capture Buffer
// ============================================================================

/// Bounded, thread-safe store of the most recent output lines
///
/// After `W` writes the buffer holds exactly `min(W, capacity)` lines, the
/// most recent ones, in write order. Once full, the oldest line is silently
/// overwritten.
#[derive(Debug)]
pub struct CaptureBuffer {
    ring: RwLock<Ring>,
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_CAPACITY)
    }
}

impl CaptureBuffer {
    /// Create a buffer holding up to `capacity` lines
    ///
    /// A capacity of zero falls back to [`DEFAULT_CAPTURE_CAPACITY`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_CAPTURE_CAPACITY
        } else {
            capacity
        };
        Self {
            ring: RwLock::new(Ring::new(capacity)),
        }
    }

    /// Store a copy of `line`, evicting the oldest line when full
    pub fn write(&self, line: impl AsRef<[u8]>) {
        self.ring.write().push(line.as_ref());
    }

    /// Return up to `n` of the most recent lines, oldest first
    ///
    /// Every returned line is an owned copy. Asking for more lines than are
    /// stored returns what is there; asking for zero returns nothing.
    #[must_use]
    pub fn get_last_n(&self, n: usize) -> Vec<Vec<u8>> {
        if n == 0 {
            return Vec::new();
        }
        self.ring.read().last_n(n)
    }

    /// Copy of every stored line, oldest first
    #[must_use]
    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        let ring = self.ring.read();
        ring.last_n(ring.len())
    }

    /// Number of lines currently stored
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.read().len()
    }

    /// Whether no lines have been stored since creation or the last clear
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of lines retained
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.read().capacity
    }

    /// Drop every stored line; capacity is unchanged
    pub fn clear(&self) {
        let mut ring = self.ring.write();
        let capacity = ring.capacity;
        *ring = Ring::new(capacity);
    }
}

// ============================================================================
// Line splitting writer
// ============================================================================

/// Splits raw terminal output into lines and feeds them to a [`CaptureBuffer`]
///
/// Output arrives in arbitrary chunks; a line is only committed once its
/// terminating `\n` has been seen. The newline itself is not stored.
#[derive(Debug)]
pub struct CaptureWriter {
    buffer: Arc<CaptureBuffer>,
    pending: Vec<u8>,
}

impl CaptureWriter {
    /// Create a writer feeding `buffer`
    #[must_use]
    pub fn new(buffer: Arc<CaptureBuffer>) -> Self {
        Self {
            buffer,
            pending: Vec::new(),
        }
    }

    /// Feed a chunk of output, committing every completed line
    pub fn push(&mut self, chunk: &[u8]) {
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            if self.pending.is_empty() {
                self.buffer.write(&rest[..pos]);
            } else {
                self.pending.extend_from_slice(&rest[..pos]);
                self.buffer.write(&self.pending);
                self.pending.clear();
            }
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);
    }

    /// Bytes received after the last newline
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Commit the trailing partial line, if any
    pub fn finish(&mut self) {
        if !self.pending.is_empty() {
            self.buffer.write(&self.pending);
            self.pending.clear();
        }
    }
}

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
