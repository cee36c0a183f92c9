/// Fixed-capacity FIFO over an inline array.
///
/// Used for bounded queues that must never allocate on the hot path, such
/// as a surface's pending-event queue before its owner subscribes.
#[derive(Debug)]
pub struct RingBuffer<T, const N: usize> {
    data: [T; N],
    head: u32,
    tail: u32,
    count: u32,
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    /// Create a new ring buffer with all elements set to the given value.
    /// This is const-compatible and can be used for static initialization.
    #[inline(always)]
    pub const fn new_with(value: T) -> Self {
        Self {
            data: [value; N],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Returns the current number of elements in the buffer.
    #[inline(always)]
    pub const fn len(&self) -> u32 {
        self.count
    }
}

impl<T: Copy + Default, const N: usize> RingBuffer<T, N> {
    #[inline(always)]
    pub fn new() -> Self {
        Self {
            data: [T::default(); N],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    #[inline(always)]
    pub fn capacity(&self) -> u32 {
        N as u32
    }

    #[inline(always)]
    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.count >= self.capacity()
    }

    /// Push, evicting the oldest element when full. Returns the evicted value.
    #[inline(always)]
    pub fn push_overwrite(&mut self, value: T) -> Option<T> {
        let mut evicted = None;
        if self.is_full() {
            evicted = Some(self.data[self.tail as usize]);
            self.tail = (self.tail + 1) % self.capacity();
            self.count -= 1;
        }
        self.data[self.head as usize] = value;
        self.head = (self.head + 1) % self.capacity();
        self.count += 1;
        evicted
    }

    /// Push without overwrite; returns true on success, false if full.
    #[inline(always)]
    pub fn try_push(&mut self, value: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.data[self.head as usize] = value;
        self.head = (self.head + 1) % self.capacity();
        self.count += 1;
        true
    }

    /// Pop oldest element; returns Some(value) or None when empty.
    #[inline(always)]
    pub fn try_pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.data[self.tail as usize];
        self.tail = (self.tail + 1) % self.capacity();
        self.count -= 1;
        Some(value)
    }

    /// Peek at the oldest element without removing it.
    #[inline(always)]
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        Some(&self.data[self.tail as usize])
    }

    /// Iterate from oldest to newest without consuming.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let cap = N as u32;
        (0..self.count).map(move |i| &self.data[((self.tail + i) % cap) as usize])
    }
}

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut rb: RingBuffer<u32, 4> = RingBuffer::new();
        assert!(rb.try_push(1));
        assert!(rb.try_push(2));
        assert_eq!(rb.peek(), Some(&1));
        assert_eq!(rb.try_pop(), Some(1));
        assert_eq!(rb.try_pop(), Some(2));
        assert_eq!(rb.try_pop(), None);
    }

    #[test]
    fn test_overwrite_drops_oldest() {
        let mut rb: RingBuffer<u32, 3> = RingBuffer::new();
        for v in 1..=3 {
            assert_eq!(rb.push_overwrite(v), None);
        }
        assert!(!rb.try_push(9));
        assert_eq!(rb.push_overwrite(4), Some(1));
        assert_eq!(rb.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(rb.len(), 3);
    }

    #[test]
    fn test_reset_empties() {
        let mut rb: RingBuffer<u8, 2> = RingBuffer::new_with(0);
        rb.push_overwrite(5);
        rb.reset();
        assert!(rb.is_empty());
        assert_eq!(rb.capacity(), 2);
    }
}
