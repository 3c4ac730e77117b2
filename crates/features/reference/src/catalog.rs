//! In-memory reference catalogs with durable snapshots and live feeds.

use crate::error::ReferenceError;
use crate::store::{FeedGuard, RefChange, RefRecord, ReferenceStore};
use chrono::{DateTime, Utc};
use nosh_domain::constants::{
    CATEGORIES_SNAPSHOT, CATEGORY_TABLE, CONDITIONS_SNAPSHOT, CONDITION_TABLE,
};
use nosh_domain::dietary::{DietaryCondition, FoodCategory, Profile};
use nosh_domain::marker::ChangeAction;
use nosh_event_bus::EventBus;
use nosh_kernel::snapshot::{REFERENCE_FRESHNESS, Recovery, SnapshotCache};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Buffer for in-flight feed events of one catalog.
const EVENT_BUFFER: usize = 32;

/// Published on the bus after a catalog changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceUpdated {
    pub collection: &'static str,
    pub count: usize,
}

/// The two persisted catalogs, keyed by store path.
#[derive(Debug, Default)]
struct CatalogState {
    categories: BTreeMap<String, RefRecord>,
    conditions: BTreeMap<String, RefRecord>,
}

impl CatalogState {
    fn collection(&self, snapshot: &str) -> &BTreeMap<String, RefRecord> {
        if snapshot == CATEGORIES_SNAPSHOT { &self.categories } else { &self.conditions }
    }

    fn collection_mut(&mut self, snapshot: &str) -> &mut BTreeMap<String, RefRecord> {
        if snapshot == CATEGORIES_SNAPSHOT { &mut self.categories } else { &mut self.conditions }
    }
}

#[derive(Debug)]
struct CatalogInner {
    store: Arc<dyn ReferenceStore>,
    cache: SnapshotCache,
    events: EventBus,
    state: RwLock<CatalogState>,
    guards: Mutex<Vec<FeedGuard>>,
}

/// Reference data owner: food categories and dietary conditions.
///
/// On start, each catalog restores its snapshot when fresh (6 hours) and
/// resumes incrementally from the cached timestamp; a stale or missing
/// snapshot triggers a full refetch from timestamp zero. Live feeds keep both
/// catalogs current afterwards, writing through after every change.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    inner: Arc<CatalogInner>,
}

impl ReferenceCatalog {
    #[must_use]
    pub fn new(store: Arc<dyn ReferenceStore>, cache: SnapshotCache, events: EventBus) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                store,
                cache,
                events,
                state: RwLock::new(CatalogState::default()),
                guards: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Loads both catalogs and attaches their live feeds.
    ///
    /// # Errors
    /// Returns [`ReferenceError::Store`] when a catch-up query fails. A feed
    /// that cannot be attached degrades that catalog to snapshot + catch-up
    /// data instead of failing startup.
    pub async fn start(&self) -> Result<(), ReferenceError> {
        self.sync_collection(CATEGORIES_SNAPSHOT, CATEGORY_TABLE).await?;
        self.sync_collection(CONDITIONS_SNAPSHOT, CONDITION_TABLE).await?;
        Ok(())
    }

    async fn sync_collection(
        &self,
        snapshot: &'static str,
        table: &'static str,
    ) -> Result<(), ReferenceError> {
        let recovery = self
            .inner
            .cache
            .load::<RefRecord>(snapshot, Some(REFERENCE_FRESHNESS), RefRecord::is_valid)
            .await;

        let since = match recovery {
            Recovery::Hit(restored) => {
                debug!(collection = snapshot, count = restored.records.len(), "Snapshot restored");
                let mut state = self.inner.state.write();
                let collection = state.collection_mut(snapshot);
                for record in restored.records {
                    collection.insert(record.path.clone(), record);
                }
                restored.updated_at
            },
            // Full refetch from timestamp zero.
            Recovery::Miss => DateTime::<Utc>::UNIX_EPOCH,
        };

        let fetched = self.inner.store.changed_since(table, since).await?;
        info!(collection = snapshot, count = fetched.len(), since = %since, "Catalog catch-up");
        {
            let mut state = self.inner.state.write();
            let collection = state.collection_mut(snapshot);
            for record in fetched {
                collection.insert(record.path.clone(), record);
            }
        }
        self.inner.write_through(snapshot).await;

        let (tx, mut rx) = mpsc::channel::<RefChange>(EVENT_BUFFER);
        match self.inner.store.subscribe(table, tx).await {
            Ok(guard) => {
                self.inner.guards.lock().push(guard);
                let inner = Arc::downgrade(&self.inner);
                tokio::spawn(async move {
                    while let Some(change) = rx.recv().await {
                        let Some(inner) = inner.upgrade() else { break };
                        inner.apply_change(snapshot, change).await;
                    }
                });
            },
            Err(err) => {
                warn!(collection = snapshot, error = %err, "Reference feed unavailable");
            },
        }

        Ok(())
    }

    /// All known food categories, name-ordered by path.
    #[must_use]
    pub fn categories(&self) -> Vec<FoodCategory> {
        self.inner
            .state
            .read()
            .categories
            .values()
            .map(|record| FoodCategory { path: record.path.clone(), name: record.name.clone() })
            .collect()
    }

    /// All known dietary conditions, ordered by path.
    #[must_use]
    pub fn conditions(&self) -> Vec<DietaryCondition> {
        self.inner
            .state
            .read()
            .conditions
            .values()
            .map(|record| DietaryCondition {
                path: record.path.clone(),
                name: record.name.clone(),
            })
            .collect()
    }

    /// Builds a profile from selected condition paths. Unknown paths are
    /// silently skipped.
    #[must_use]
    pub fn profile_from_paths<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> Profile {
        let state = self.inner.state.read();
        paths
            .into_iter()
            .filter_map(|path| state.conditions.get(path))
            .map(|record| DietaryCondition {
                path: record.path.clone(),
                name: record.name.clone(),
            })
            .collect()
    }
}

impl CatalogInner {
    async fn apply_change(&self, snapshot: &'static str, change: RefChange) {
        {
            let mut state = self.state.write();
            let collection = state.collection_mut(snapshot);
            match (change.action, change.record) {
                (ChangeAction::Added | ChangeAction::Modified, Some(record)) => {
                    collection.insert(change.path, record);
                },
                (ChangeAction::Removed, _) => {
                    collection.remove(&change.path);
                },
                (action, None) => {
                    warn!(?action, path = %change.path, "Reference change without body");
                    return;
                },
            }
        }
        self.write_through(snapshot).await;
    }

    async fn write_through(&self, snapshot: &'static str) {
        let (records, count) = {
            let state = self.state.read();
            let records: Vec<RefRecord> = state.collection(snapshot).values().cloned().collect();
            let count = records.len();
            (records, count)
        };

        self.cache.write_through(snapshot, &records).await;
        let _ = self.events.publish(ReferenceUpdated { collection: snapshot, count });
    }
}
