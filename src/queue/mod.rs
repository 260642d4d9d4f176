//! The growable queue: the Message Router's back-pressure shock-absorber.
//!
//! A classic fixed-capacity channel would either block the Router (stalling
//! every Wire Client behind it) or drop writer-bound data outright. This
//! container keeps the FIFO, thread-safety, and `Send`/`Receive`/
//! `TryReceive`/`Close` semantics of a sized channel, but doubles its
//! capacity whenever occupancy crosses 70% fill instead of blocking or
//! dropping.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Fill ratio, numerator/100, past which the next `send` doubles capacity.
const GROW_THRESHOLD_PCT: usize = 70;

struct Inner<T> {
    buf: Mutex<VecDeque<T>>,
    capacity: AtomicUsize,
    closed: AtomicBool,
    notify: Notify,
}

/// A thread-safe, unbounded-in-practice FIFO queue that grows its backing
/// capacity rather than applying back-pressure to senders.
///
/// Cloning shares the same underlying queue — all handles see the same
/// items, in the same order, exactly like a `tokio::sync::mpsc` sender
/// shared across tasks.
pub struct GrowableQueue<T> {
    inner: std::sync::Arc<Inner<T>>,
}

impl<T> Clone for GrowableQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> GrowableQueue<T> {
    /// Creates a queue with the given initial capacity. A capacity of zero is
    /// treated as one: the first `send` must be able to observe a fill ratio.
    #[must_use]
    pub fn new(initial_capacity: usize) -> Self {
        let capacity = initial_capacity.max(1);
        Self {
            inner: std::sync::Arc::new(Inner {
                buf: Mutex::new(VecDeque::with_capacity(capacity)),
                capacity: AtomicUsize::new(capacity),
                closed: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Current configured capacity (doubles as occupancy crosses 70%).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity.load(Ordering::Acquire)
    }

    /// Current number of buffered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.buf.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Enqueues an item, doubling capacity first if occupancy would cross the
    /// 70% threshold. Returns `false` (without enqueuing) iff the queue is
    /// closed.
    pub fn send(&self, item: T) -> bool {
        if self.is_closed() {
            return false;
        }
        let mut buf = self.inner.buf.lock();
        let capacity = self.inner.capacity.load(Ordering::Acquire);
        if (buf.len() + 1) * 100 >= capacity * GROW_THRESHOLD_PCT {
            let new_capacity = capacity * 2;
            let additional = new_capacity.saturating_sub(buf.len());
            buf.reserve(additional);
            self.inner.capacity.store(new_capacity, Ordering::Release);
        }
        buf.push_back(item);
        drop(buf);
        self.inner.notify.notify_one();
        true
    }

    /// Non-blocking dequeue. Returns `(item, true)` if one was available,
    /// or `(None, false)` if the queue was empty (closed or not).
    pub fn try_receive(&self) -> Option<T> {
        self.inner.buf.lock().pop_front()
    }

    /// Blocking dequeue: waits for an item to become available. Returns
    /// `None` once the queue is closed and fully drained.
    pub async fn receive(&self) -> Option<T> {
        loop {
            if let Some(item) = self.try_receive() {
                return Some(item);
            }
            if self.is_closed() {
                // One more check: a concurrent send could have raced the
                // close and landed between our pop and the closed check.
                if let Some(item) = self.try_receive() {
                    return Some(item);
                }
                return None;
            }
            let notified = self.inner.notify.notified();
            if self.is_empty() && !self.is_closed() {
                notified.await;
            }
        }
    }

    /// Drains up to `max` items in FIFO order without blocking.
    pub fn drain_to(&self, max: usize) -> Vec<T> {
        let mut buf = self.inner.buf.lock();
        let n = max.min(buf.len());
        buf.drain(..n).collect()
    }

    /// Closes the queue. Already-buffered items remain retrievable via
    /// `receive`/`try_receive`/`drain_to`; once drained, `receive` returns
    /// `None` and `send` returns `false`.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_capacity_grows_to_two_on_first_send() {
        let q: GrowableQueue<i32> = GrowableQueue::new(1);
        assert_eq!(q.capacity(), 1);
        assert!(q.send(1));
        assert_eq!(q.capacity(), 2);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn doubles_capacity_crossing_seventy_percent_fill() {
        let q: GrowableQueue<i32> = GrowableQueue::new(10);
        for i in 0..6 {
            q.send(i);
        }
        // 7th item would put us at 7/10 = 70% -> triggers growth before insert.
        assert_eq!(q.capacity(), 10);
        q.send(6);
        assert_eq!(q.capacity(), 20);
    }

    #[test]
    fn fifo_order_preserved_across_resize() {
        let q: GrowableQueue<i32> = GrowableQueue::new(2);
        for i in 0..10 {
            q.send(i);
        }
        let drained = q.drain_to(100);
        assert_eq!(drained, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn try_receive_on_empty_returns_none() {
        let q: GrowableQueue<i32> = GrowableQueue::new(4);
        assert_eq!(q.try_receive(), None);
    }

    #[test]
    fn send_after_close_is_rejected() {
        let q: GrowableQueue<i32> = GrowableQueue::new(4);
        q.send(1);
        q.close();
        assert!(!q.send(2));
        // Already-buffered items remain retrievable after close.
        assert_eq!(q.try_receive(), Some(1));
        assert_eq!(q.try_receive(), None);
    }

    #[tokio::test]
    async fn receive_blocks_until_send_then_drains_to_none_after_close() {
        let q: GrowableQueue<i32> = GrowableQueue::new(4);
        let q2 = q.clone();
        let handle = tokio::spawn(async move { q2.receive().await });
        tokio::task::yield_now().await;
        q.send(42);
        assert_eq!(handle.await.unwrap(), Some(42));

        q.close();
        assert_eq!(q.receive().await, None);
    }

    #[tokio::test]
    async fn drain_to_respects_max() {
        let q: GrowableQueue<i32> = GrowableQueue::new(4);
        for i in 0..5 {
            q.send(i);
        }
        let first = q.drain_to(3);
        assert_eq!(first, vec![0, 1, 2]);
        let rest = q.drain_to(100);
        assert_eq!(rest, vec![3, 4]);
    }
}
