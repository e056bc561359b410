//! queue.rs
//! Bounded lock-free bundle queue between the real-time producer and the drain thread.
//! - fixed capacity, never grows; a full queue is backpressure, not an error
//! - push/pop never take a lock, so the producer cannot be stalled by the consumer
//! - FIFO

use crossbeam_queue::ArrayQueue;

use crate::bundle::Bundle;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

pub struct BundleQueue {
    inner: ArrayQueue<Bundle>,
}

impl BundleQueue {
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: ArrayQueue::new(capacity),
        }
    }

    /// Non-blocking insert. `false` means the queue was full and the bundle was dropped.
    #[inline]
    pub fn push(&self, bundle: Bundle) -> bool {
        self.inner.push(bundle).is_ok()
    }

    /// Non-blocking insert that hands the bundle back when full, for callers that retry.
    #[inline]
    pub fn try_push(&self, bundle: Bundle) -> Result<(), Bundle> {
        self.inner.push(bundle)
    }

    #[inline]
    pub fn pop(&self) -> Option<Bundle> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl Default for BundleQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::Message;
    use std::{sync::Arc, thread};

    fn tagged(i: i32) -> Bundle {
        Bundle::now().message(Message::new("/seq").arg(i))
    }

    fn seq_of(bundle: &Bundle) -> i32 {
        match bundle.messages[0].args[0] {
            crate::bundle::Value::Int(i) => i,
            _ => unreachable!(),
        }
    }

    #[test]
    fn drains_in_push_order() {
        let q = BundleQueue::new(8);
        for i in 0..8 {
            assert!(q.push(tagged(i)));
        }
        let drained: Vec<i32> = std::iter::from_fn(|| q.pop()).map(|b| seq_of(&b)).collect();
        assert_eq!(drained, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn full_queue_rejects_without_growing() {
        let q = BundleQueue::new(2);
        assert!(q.push(tagged(0)));
        assert!(q.push(tagged(1)));
        assert!(!q.push(tagged(2)));

        let rejected = q.try_push(tagged(3)).unwrap_err();
        assert_eq!(seq_of(&rejected), 3);
        assert_eq!(q.len(), 2);
        assert_eq!(q.capacity(), 2);
    }

    #[test]
    fn concurrent_producer_consumer_keeps_fifo() {
        const N: i32 = 10_000;
        let q = Arc::new(BundleQueue::new(64));

        let producer = {
            let q = q.clone();
            thread::spawn(move || {
                for i in 0..N {
                    let mut b = tagged(i);
                    while let Err(back) = q.try_push(b) {
                        b = back;
                        thread::yield_now();
                    }
                }
            })
        };

        let mut expected = 0;
        while expected < N {
            match q.pop() {
                Some(b) => {
                    assert_eq!(seq_of(&b), expected);
                    expected += 1;
                }
                None => thread::yield_now(),
            }
        }
        producer.join().unwrap();
        assert!(q.is_empty());
    }
}
