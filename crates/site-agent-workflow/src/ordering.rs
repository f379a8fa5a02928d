//! Per-`(kind, resource_id)` ordering: two activities against the same
//! resource never interleave, even though the adapter dispatches every
//! polled task onto its own `tokio::spawn`. A `dashmap` keyed lock avoids
//! one workspace-wide mutex serializing unrelated kinds.

use std::sync::Arc;

use dashmap::DashMap;
use site_agent_core::ResourceKind;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct OrderingTable {
    locks: DashMap<(ResourceKind, Uuid), Arc<Mutex<()>>>,
}

impl OrderingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Held for the duration of one activity dispatch. Cheap to create: the
    /// entry stays in the map after the guard drops, so a resource that is
    /// only ever touched once leaves a tiny permanent entry behind — an
    /// acceptable tradeoff against the alternative of a lock that could be
    /// removed out from under a waiting acquirer.
    pub async fn acquire(&self, kind: ResourceKind, resource_id: Uuid) -> OwnedMutexGuard<()> {
        let entry = self
            .locks
            .entry((kind, resource_id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_resource_serializes_across_concurrent_acquires() {
        let table = Arc::new(OrderingTable::new());
        let resource_id = Uuid::new_v4();

        let first = table.clone().acquire(ResourceKind::Vpc, resource_id).await;
        let table2 = table.clone();
        let handle = tokio::spawn(async move {
            let _guard = table2.acquire(ResourceKind::Vpc, resource_id).await;
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        drop(first);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn distinct_resources_never_block_each_other() {
        let table = OrderingTable::new();
        let a = table.acquire(ResourceKind::Vpc, Uuid::new_v4()).await;
        let b = table.acquire(ResourceKind::Vpc, Uuid::new_v4()).await;
        drop(a);
        drop(b);
    }
}
