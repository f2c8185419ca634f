//! SPSC (single producer, single consumer) ring buffer for lock-free messaging
//! between the control thread and the audio thread.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free SPSC ring buffer. One thread may call `try_send`; another may call `try_recv`.
/// No allocation in send/recv; capacity fixed at creation. Values still queued when the
/// buffer is dropped are dropped with it.
pub struct RingBuffer<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Total number of values ever sent. Only the producer stores to it.
    head: AtomicUsize,
    /// Total number of values ever received. Only the consumer stores to it.
    tail: AtomicUsize,
}

// SAFETY: a slot is touched by the producer only while it is free and by the consumer
// only while it is filled; the head/tail release-acquire pairs hand slots over.
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Creates a ring buffer with the given capacity. No allocation after this.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        RingBuffer {
            slots,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of values currently queued. Only a snapshot when the other side is active.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Tries to send a value. Returns `Ok(())` if enqueued, `Err(value)` if full.
    /// Only the producer thread may call this.
    pub fn try_send(&self, value: T) -> Result<(), T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) == self.capacity() {
            return Err(value);
        }
        let slot = &self.slots[head % self.capacity()];
        // SAFETY: the slot is free (not yet sent or already received) and only this
        // producer writes slots.
        unsafe { (*slot.get()).write(value) };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Tries to receive a value. Returns `Some(value)` if one was enqueued, `None` if empty.
    /// Only the consumer thread may call this.
    pub fn try_recv(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }
        let slot = &self.slots[tail % self.capacity()];
        // SAFETY: the slot was filled by the producer (published by the acquire load of
        // head) and is read exactly once before tail moves past it.
        let value = unsafe { (*slot.get()).assume_init_read() };
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(value)
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        while self.try_recv().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::RingBuffer;
    use std::sync::Arc;
    use std::thread;

    #[test]
    /// Test that sending a value and then receiving it returns the value.
    fn test_send_then_recv_returns_value() {
        let ring_buffer: RingBuffer<i32> = RingBuffer::new(1);
        ring_buffer.try_send(42).unwrap();
        assert_eq!(ring_buffer.try_recv(), Some(42));
        assert!(ring_buffer.is_empty());
    }

    #[test]
    /// Test that sending to a full buffer hands the value back.
    fn test_full_send_returns_err() {
        let ring_buffer: RingBuffer<i32> = RingBuffer::new(2);
        ring_buffer.try_send(1).unwrap();
        ring_buffer.try_send(2).unwrap();
        assert!(ring_buffer.is_full());
        assert_eq!(ring_buffer.try_send(3), Err(3));
    }

    #[test]
    /// Test FIFO order across several wrap-arounds of the slot array.
    fn test_fifo_order_across_wraps() {
        let ring_buffer: RingBuffer<usize> = RingBuffer::new(3);
        for i in 0..10 {
            ring_buffer.try_send(i).unwrap();
            ring_buffer.try_send(i + 100).unwrap();
            assert_eq!(ring_buffer.try_recv(), Some(i));
            assert_eq!(ring_buffer.try_recv(), Some(i + 100));
        }
        assert_eq!(ring_buffer.len(), 0);
    }

    #[test]
    /// Test that values left in the queue are dropped with it.
    fn test_drop_releases_queued_values() {
        let tracker = Arc::new(());
        {
            let ring_buffer = RingBuffer::new(4);
            ring_buffer.try_send(Arc::clone(&tracker)).unwrap();
            ring_buffer.try_send(Arc::clone(&tracker)).unwrap();
            assert_eq!(Arc::strong_count(&tracker), 3);
        }
        assert_eq!(Arc::strong_count(&tracker), 1);
    }

    #[test]
    fn test_cross_thread_transfer_preserves_order() {
        let ring_buffer = Arc::new(RingBuffer::<u32>::new(8));
        let producer = {
            let rb = Arc::clone(&ring_buffer);
            thread::spawn(move || {
                for i in 0..10_000u32 {
                    let mut value = i;
                    while let Err(v) = rb.try_send(value) {
                        value = v;
                        thread::yield_now();
                    }
                }
            })
        };
        let mut expected = 0u32;
        while expected < 10_000 {
            match ring_buffer.try_recv() {
                Some(v) => {
                    assert_eq!(v, expected);
                    expected += 1;
                }
                None => thread::yield_now(),
            }
        }
        producer.join().unwrap();
    }
}
