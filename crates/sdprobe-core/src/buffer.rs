//! Chunk buffer allocation.
//!
//! Each phase allocates exactly one chunk buffer up front and reuses it for
//! every transfer. Allocation goes through [`ChunkAllocator`] so that running
//! out of memory is an observable outcome rather than an abort.

/// Allocates zero-filled chunk buffers.
pub trait ChunkAllocator: Send + Sync {
    /// A zeroed buffer of exactly `len` bytes, or `None` if it cannot be had.
    fn allocate(&self, len: usize) -> Option<Vec<u8>>;
}

/// Global-heap allocator using fallible reservation.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

impl ChunkAllocator for HeapAllocator {
    fn allocate(&self, len: usize) -> Option<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).ok()?;
        buf.resize(len, 0);
        Some(buf)
    }
}

/// Heap allocator that refuses any request above `limit` bytes.
///
/// Models a target with a small fixed heap.
#[derive(Clone, Copy, Debug)]
pub struct LimitedAllocator {
    limit: usize,
}

impl LimitedAllocator {
    /// Refuse requests larger than `limit` bytes.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl ChunkAllocator for LimitedAllocator {
    fn allocate(&self, len: usize) -> Option<Vec<u8>> {
        if len > self.limit {
            tracing::debug!(len, limit = self.limit, "allocation refused");
            return None;
        }
        HeapAllocator.allocate(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_allocator_returns_zeroed_buffer() {
        let buf = HeapAllocator.allocate(16 * 1024).unwrap();
        assert_eq!(buf.len(), 16 * 1024);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn heap_allocator_reports_impossible_requests() {
        assert!(HeapAllocator.allocate(usize::MAX).is_none());
    }

    #[test]
    fn limited_allocator_enforces_limit() {
        let alloc = LimitedAllocator::new(1024);
        assert!(alloc.allocate(1024).is_some());
        assert!(alloc.allocate(1025).is_none());
    }
}
