//! Dispatch sequence allocation.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::dispatch::DispatchSequence;
use crate::domain::foundation::Timestamp;

/// Process-wide monotonic source of dispatch sequences.
///
/// Seeded from wall-clock milliseconds so numbers keep increasing across
/// restarts of a single instance.
pub struct SequenceAllocator {
    next: AtomicU64,
}

impl SequenceAllocator {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn seeded_from_clock() -> Self {
        let millis = Timestamp::now().as_unix_millis().max(1) as u64;
        Self::starting_at(millis)
    }

    pub fn next(&self) -> DispatchSequence {
        DispatchSequence::new(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::seeded_from_clock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn sequences_strictly_increase() {
        let allocator = SequenceAllocator::starting_at(10);
        let a = allocator.next();
        let b = allocator.next();
        assert_eq!(a.value(), 10);
        assert!(b > a);
    }

    #[tokio::test]
    async fn concurrent_allocation_never_repeats() {
        let allocator = Arc::new(SequenceAllocator::seeded_from_clock());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let allocator = allocator.clone();
            tasks.push(tokio::spawn(async move {
                (0..100).map(|_| allocator.next()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for task in tasks {
            for seq in task.await.unwrap() {
                assert!(seen.insert(seq));
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
