//! Per-resource async locks.
//!
//! Every read-modify-append on one pick runs under that pick's mutex; work on
//! different picks never contends. Entries live only while someone holds or
//! waits on them.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct ResourceLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Exclusive access to one resource; the registry entry is dropped with the
/// last holder
pub struct ResourceGuard<'a> {
    locks: &'a DashMap<Uuid, Arc<Mutex<()>>>,
    resource_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ResourceGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex (and its Arc) first so an idle entry counts 1
        drop(self.guard.take());
        self.locks
            .remove_if(&self.resource_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `resource_id`
    pub async fn acquire(&self, resource_id: Uuid) -> ResourceGuard<'_> {
        let lock = self
            .locks
            .entry(resource_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        ResourceGuard {
            locks: &self.locks,
            resource_id,
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_resource_is_serialized() {
        let locks = Arc::new(ResourceLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));
        let id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_inside.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn entry_outlives_the_holder_only_while_contended() {
        let locks = Arc::new(ResourceLocks::new());
        let id = Uuid::new_v4();

        let first = locks.acquire(id).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.acquire(id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        drop(first);
        assert!(locks.len() <= 1);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn idle_resources_leave_no_entries() {
        let locks = ResourceLocks::new();
        for _ in 0..100 {
            let _guard = locks.acquire(Uuid::new_v4()).await;
        }
        assert!(locks.is_empty());
    }
}
