//! Free-list pool for reusable header records.
//!
//! Avoids a per-call allocation on the hot path by recycling
//! [`crate::header::RequestHeader`] / [`crate::header::ResponseHeader`]
//! instances. Purely an optimization: a correct caller may construct a
//! fresh header every time instead.

use std::sync::Arc;

use crossbeam_queue::SegQueue;

/// A lock-free free-list of `Arc<T>`, reset before return.
pub struct HeaderPool<T> {
    free: SegQueue<Arc<T>>,
}

impl<T> Default for HeaderPool<T> {
    fn default() -> Self {
        Self { free: SegQueue::new() }
    }
}

impl<T: Default> HeaderPool<T> {
    /// Build an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop a recycled record, or build a fresh zero-initialized one.
    pub fn acquire(&self) -> Arc<T> {
        self.free.pop().unwrap_or_default()
    }
}

impl<T> HeaderPool<T> {
    /// Return `record` to the pool after `reset` has cleared its fields.
    ///
    /// `reset` is a caller-supplied closure rather than a `Reset` trait
    /// bound so this pool works for any pooled type, not just the two
    /// header kinds.
    pub fn release(&self, record: Arc<T>, reset: impl FnOnce(&T)) {
        reset(&record);
        self.free.push(record);
    }

    /// Number of records currently sitting idle in the pool.
    pub fn idle_len(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::header::RequestHeader;

    #[test]
    fn acquire_on_empty_pool_builds_fresh() {
        let pool: HeaderPool<RequestHeader> = HeaderPool::new();
        let h = pool.acquire();
        assert_eq!(h.id(), 0);
        assert_eq!(pool.idle_len(), 0);
    }

    #[test]
    fn release_then_acquire_recycles_and_resets() {
        let pool: HeaderPool<RequestHeader> = HeaderPool::new();
        let h = pool.acquire();
        h.unmarshal(&RequestHeader::new(1, "ArithService.Add", 7, 3, 9).marshal()).unwrap();
        assert_eq!(h.id(), 7);

        pool.release(h, RequestHeader::reset);
        assert_eq!(pool.idle_len(), 1);

        let recycled = pool.acquire();
        assert_eq!(recycled.id(), 0);
        assert_eq!(pool.idle_len(), 0);
    }
}
