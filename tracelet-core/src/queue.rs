//! Bounded FIFO of handles.
//!
//! Circular index buffer with head/tail/count bookkeeping. Capacity is fixed
//! at compile time; every operation is O(1) and allocation free. The queue
//! carries handles by value (`Copy`), never the objects behind them.

use std::fmt;

pub struct BoundedQueue<T: Copy, const N: usize> {
    buffer: [Option<T>; N],
    head: usize,
    tail: usize,
    count: usize,
}

impl<T: Copy, const N: usize> BoundedQueue<T, N> {
    const DEPTH_OK: () = assert!(N > 0, "queue depth must be greater than zero");

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::DEPTH_OK;

        Self {
            buffer: [None; N],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Appends `item`, handing it back when the queue is full.
    pub fn insert(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.buffer[self.tail] = Some(item);
        self.tail = (self.tail + 1) % N;
        self.count += 1;
        Ok(())
    }

    /// Removes the oldest item.
    pub fn remove(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.buffer[self.head].take();
        self.head = (self.head + 1) % N;
        self.count -= 1;
        item
    }

    /// Oldest item without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.buffer[self.head].as_ref()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == N
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T: Copy, const N: usize> Default for BoundedQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + fmt::Debug, const N: usize> fmt::Debug for BoundedQueue<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = (0..self.count).filter_map(|i| self.buffer[(self.head + i) % N]);
        f.debug_list().entries(items).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn signals_queue_full() {
        let mut queue: BoundedQueue<u32, 2> = BoundedQueue::new();
        assert!(queue.insert(1).is_ok());
        assert!(queue.insert(2).is_ok());
        assert_eq!(queue.insert(3), Err(3));
        assert!(queue.is_full());
    }

    #[test]
    fn empty_queue_yields_nothing() {
        let mut queue: BoundedQueue<u32, 2> = BoundedQueue::new();
        assert_eq!(queue.remove(), None);

        queue.insert(9).unwrap();
        assert_eq!(queue.remove(), Some(9));
        assert_eq!(queue.remove(), None);
        assert_eq!(queue.peek(), None);
    }

    #[test]
    fn maintains_ordering() {
        let mut queue: BoundedQueue<u32, 4> = BoundedQueue::new();
        queue.insert(1).unwrap();
        queue.insert(2).unwrap();
        assert_eq!(queue.peek(), Some(&1));
        assert_eq!(queue.remove(), Some(1));
        assert_eq!(queue.remove(), Some(2));
    }

    #[test]
    fn wraps_buffer_correctly() {
        let mut queue: BoundedQueue<u32, 4> = BoundedQueue::new();
        for cycle in 0..3 {
            for i in 0..4 {
                queue.insert(i + cycle * 4).unwrap();
            }
            assert_eq!(queue.len(), 4);
            for i in 0..4 {
                assert_eq!(queue.remove(), Some(i + cycle * 4));
            }
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn debug_lists_items_oldest_first() {
        let mut queue: BoundedQueue<u32, 3> = BoundedQueue::new();
        queue.insert(1).unwrap();
        queue.insert(2).unwrap();
        queue.remove();
        queue.insert(3).unwrap();
        queue.insert(4).unwrap();
        assert_eq!(format!("{queue:?}"), "[2, 3, 4]");
    }

    proptest! {
        #[test]
        fn behaves_like_a_bounded_fifo(ops in proptest::collection::vec(proptest::option::of(any::<u16>()), 0..128)) {
            let mut queue: BoundedQueue<u16, 5> = BoundedQueue::new();
            let mut model = std::collections::VecDeque::new();
            for op in ops {
                match op {
                    Some(item) => {
                        let accepted = queue.insert(item).is_ok();
                        prop_assert_eq!(accepted, model.len() < 5);
                        if accepted {
                            model.push_back(item);
                        }
                    }
                    None => prop_assert_eq!(queue.remove(), model.pop_front()),
                }
                prop_assert_eq!(queue.len(), model.len());
            }
        }
    }
}
