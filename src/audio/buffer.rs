//! Fixed-capacity circular (ring) buffer.
//!
//! When the buffer is full, new values **overwrite** the oldest data so that
//! the most-recent `capacity` values are always available.  Energy traces
//! and raw per-channel waveforms are both stored this way.
//!
//! # Example
//!
//! ```rust
//! use sound_compass::audio::RingBuffer;
//!
//! let mut buf = RingBuffer::new(4);
//! buf.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]); // 5 items → capacity 4 → oldest dropped
//! assert_eq!(buf.to_vec(), vec![2.0, 3.0, 4.0, 5.0]);
//! assert_eq!(buf.latest(2), vec![4.0, 5.0]);
//! ```

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity circular buffer.
///
/// ## Overflow behaviour
///
/// When [`push`](Self::push) or [`push_slice`](Self::push_slice) would exceed
/// `capacity`, the oldest values are silently overwritten.  The buffer never
/// allocates beyond its initial capacity.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Index of the *next* write position (wraps around `capacity`).
    write_pos: usize,
    /// Number of valid values currently stored (≤ `capacity`).
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a new ring buffer with the given `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buf: vec![T::default(); capacity],
            capacity,
            write_pos: 0,
            len: 0,
        }
    }

    /// Append one value, evicting the oldest when full.
    pub fn push(&mut self, item: T) {
        self.buf[self.write_pos] = item;
        self.write_pos = (self.write_pos + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Append `data` in order.
    pub fn push_slice(&mut self, data: &[T]) {
        for &item in data {
            self.push(item);
        }
    }

    /// Index of the oldest stored value inside `buf`.
    fn read_pos(&self) -> usize {
        // Before the first overflow valid data starts at 0; afterwards the
        // oldest value sits where the next write would go.
        if self.len < self.capacity {
            0
        } else {
            self.write_pos
        }
    }

    /// Value `index` positions after the oldest one, if present.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        Some(self.buf[(self.read_pos() + index) % self.capacity])
    }

    /// Most recently pushed value.
    pub fn last(&self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.get(self.len - 1)
    }

    /// Copy of the newest `n` values in chronological order (fewer when the
    /// buffer holds less than `n`).
    pub fn latest(&self, n: usize) -> Vec<T> {
        let n = n.min(self.len);
        (self.len - n..self.len).filter_map(|i| self.get(i)).collect()
    }

    /// Copy of every stored value in chronological order.
    pub fn to_vec(&self) -> Vec<T> {
        self.latest(self.len)
    }

    /// Number of valid values currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the buffer contains no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
