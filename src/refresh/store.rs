//! Latest committed snapshots and the transient refresh state
//!
//! Both live behind `tokio::sync::watch` channels, so a reader always sees a
//! whole snapshot and replacement is a single pointer swap.

use crate::core::section::ViewMode;
use crate::core::snapshot::Snapshot;
use crate::refresh::state::RefreshState;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    current: watch::Sender<BTreeMap<ViewMode, Arc<Snapshot>>>,
    committed: watch::Sender<Option<Arc<Snapshot>>>,
    state: watch::Sender<Option<RefreshState>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        SnapshotStore {
            inner: Arc::new(StoreInner {
                current: watch::Sender::new(BTreeMap::new()),
                committed: watch::Sender::new(None),
                state: watch::Sender::new(None),
            }),
        }
    }

    /// Replaces the current snapshot of its view mode and notifies subscribers.
    pub fn commit(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        debug!(
            view = %snapshot.view_mode(),
            request_id = %snapshot.request_id(),
            partial = snapshot.is_partial(),
            "Committing snapshot"
        );
        self.inner.current.send_modify(|current| {
            current.insert(snapshot.view_mode(), Arc::clone(&snapshot));
        });
        self.inner.committed.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }

    pub fn current(&self, view_mode: ViewMode) -> Option<Arc<Snapshot>> {
        self.inner.current.borrow().get(&view_mode).cloned()
    }

    /// Yields snapshots committed after this call.
    pub fn subscribe(&self) -> SnapshotSubscriber {
        SnapshotSubscriber {
            rx: self.inner.committed.subscribe(),
        }
    }

    pub(crate) fn publish_state(&self, state: RefreshState) {
        self.inner.state.send_replace(Some(state));
    }

    pub fn refresh_state(&self) -> Option<RefreshState> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<Option<RefreshState>> {
        self.inner.state.subscribe()
    }
}

/// Latest-wins stream of committed snapshots. Intermediate commits may be
/// skipped by a slow reader.
pub struct SnapshotSubscriber {
    rx: watch::Receiver<Option<Arc<Snapshot>>>,
}

impl SnapshotSubscriber {
    /// Waits for the next commit. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Arc<Snapshot>> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(snapshot) = self.rx.borrow_and_update().clone() {
                return Some(snapshot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::FxRates;
    use crate::core::snapshot::RequestId;
    use chrono::Utc;

    fn empty(view: ViewMode, id: u64) -> Snapshot {
        Snapshot::assemble(view, RequestId::new(id), Vec::new(), FxRates::default(), Utc::now())
    }

    #[tokio::test]
    async fn test_commit_replaces_per_view() {
        let store = SnapshotStore::new();
        assert!(store.current(ViewMode::Crypto).is_none());

        store.commit(empty(ViewMode::Crypto, 1));
        store.commit(empty(ViewMode::Stock, 2));
        store.commit(empty(ViewMode::Crypto, 3));

        assert_eq!(
            store.current(ViewMode::Crypto).map(|s| s.request_id()),
            Some(RequestId::new(3))
        );
        assert_eq!(
            store.current(ViewMode::Stock).map(|s| s.request_id()),
            Some(RequestId::new(2))
        );
    }

    #[tokio::test]
    async fn test_subscriber_sees_latest_commit() {
        let store = SnapshotStore::new();
        store.commit(empty(ViewMode::Crypto, 1));

        let mut subscriber = store.subscribe();
        store.commit(empty(ViewMode::Crypto, 2));
        store.commit(empty(ViewMode::Crypto, 3));

        let latest = subscriber.next().await.unwrap();
        assert_eq!(latest.request_id(), RequestId::new(3));

        drop(store);
        assert!(subscriber.next().await.is_none());
    }

    #[test]
    fn test_state_publication() {
        let store = SnapshotStore::new();
        assert!(store.refresh_state().is_none());

        let rx = store.subscribe_state();
        store.publish_state(RefreshState::new(ViewMode::Stock, None));
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            store.refresh_state().map(|s| s.view_mode),
            Some(ViewMode::Stock)
        );
    }
}
