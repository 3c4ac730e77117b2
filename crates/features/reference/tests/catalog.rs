use chrono::{DateTime, TimeDelta, Utc};
use nosh_domain::marker::ChangeAction;
use nosh_event_bus::EventBus;
use nosh_kernel::snapshot::{KeyValue, SnapshotCache, SnapshotError};
use nosh_reference::{
    FeedGuard, RefChange, RefRecord, ReferenceCatalog, ReferenceError, ReferenceStore,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

fn record(path: &str, name: &str) -> RefRecord {
    RefRecord { path: path.to_owned(), name: name.to_owned(), updated_at: Utc::now() }
}

#[derive(Debug, Default)]
struct StoreHub {
    records: Mutex<Vec<RefRecord>>,
    since_calls: Mutex<Vec<(&'static str, DateTime<Utc>)>>,
    senders: Mutex<Vec<(&'static str, mpsc::Sender<RefChange>)>>,
}

#[derive(Debug, Clone, Default)]
struct MockReferenceStore(Arc<StoreHub>);

impl MockReferenceStore {
    fn set_records(&self, records: Vec<RefRecord>) {
        *self.0.records.lock() = records;
    }

    async fn emit(&self, table: &str, change: RefChange) {
        let sender = self
            .0
            .senders
            .lock()
            .iter()
            .rev()
            .find(|(t, _)| *t == table)
            .map(|(_, s)| s.clone())
            .expect("no subscription for table");
        sender.send(change).await.expect("feed should be attached");
    }
}

impl ReferenceStore for MockReferenceStore {
    fn changed_since(
        &self,
        table: &'static str,
        since: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Vec<RefRecord>, ReferenceError>> {
        Box::pin(async move {
            self.0.since_calls.lock().push((table, since));
            Ok(self
                .0
                .records
                .lock()
                .iter()
                .filter(|record| record.updated_at > since)
                .cloned()
                .collect())
        })
    }

    fn subscribe(
        &self,
        table: &'static str,
        events: mpsc::Sender<RefChange>,
    ) -> BoxFuture<'_, Result<FeedGuard, ReferenceError>> {
        Box::pin(async move {
            self.0.senders.lock().push((table, events));
            Ok(FeedGuard::from_task(tokio::spawn(std::future::pending::<()>())))
        })
    }
}

#[derive(Debug, Default, Clone)]
struct MemoryKv {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKv {
    fn put_raw(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_owned(), value.to_owned());
    }
}

impl KeyValue for MemoryKv {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, SnapshotError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.entries.lock().get(key).cloned()) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), SnapshotError>> + Send + 'a>> {
        Box::pin(async move {
            self.entries.lock().insert(key.to_owned(), value.to_owned());
            Ok(())
        })
    }
}

fn snapshot_raw(updated_at: DateTime<Utc>, records: &[RefRecord]) -> String {
    let body: Vec<String> = records
        .iter()
        .map(|r| {
            format!(
                r#"{{"path":"{}","name":"{}","updatedAt":"{}"}}"#,
                r.path,
                r.name,
                r.updated_at.to_rfc3339()
            )
        })
        .collect();
    format!(r#"{{"updatedAt":"{}","records":[{}]}}"#, updated_at.to_rfc3339(), body.join(","))
}

struct Harness {
    catalog: ReferenceCatalog,
    store: MockReferenceStore,
    kv: MemoryKv,
}

fn harness() -> Harness {
    let store = MockReferenceStore::default();
    let kv = MemoryKv::default();
    let catalog = ReferenceCatalog::new(
        Arc::new(store.clone()),
        SnapshotCache::new(Arc::new(kv.clone())),
        EventBus::new(),
    );
    Harness { catalog, store, kv }
}

#[tokio::test]
async fn cold_start_refetches_from_timestamp_zero() {
    let h = harness();
    h.store.set_records(vec![record("condition:vegan", "Vegan")]);

    h.catalog.start().await.unwrap();

    let calls = h.store.0.since_calls.lock();
    assert_eq!(calls.len(), 2, "one catch-up per catalog");
    assert!(
        calls.iter().all(|(_, since)| *since == DateTime::<Utc>::UNIX_EPOCH),
        "cold start must refetch everything"
    );
    drop(calls);

    let conditions = h.catalog.conditions();
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].name, "Vegan");
}

#[tokio::test]
async fn fresh_snapshot_resumes_incrementally() {
    let h = harness();
    let cached_at = Utc::now() - TimeDelta::hours(1);
    let cached = RefRecord {
        path: "condition:vegan".to_owned(),
        name: "Vegan".to_owned(),
        updated_at: cached_at,
    };
    h.kv.put_raw("conditions", &snapshot_raw(cached_at, std::slice::from_ref(&cached)));

    h.catalog.start().await.unwrap();

    let calls = h.store.0.since_calls.lock();
    let condition_call =
        calls.iter().find(|(table, _)| *table == "condition").expect("condition catch-up");
    assert_eq!(condition_call.1, cached_at, "fresh snapshot resumes from its timestamp");
    drop(calls);

    assert_eq!(h.catalog.conditions().len(), 1, "cached entries are available immediately");
}

#[tokio::test]
async fn stale_snapshot_forces_full_refetch() {
    let h = harness();
    let cached_at = Utc::now() - TimeDelta::hours(7);
    let cached = RefRecord {
        path: "condition:old".to_owned(),
        name: "Old".to_owned(),
        updated_at: cached_at,
    };
    h.kv.put_raw("conditions", &snapshot_raw(cached_at, std::slice::from_ref(&cached)));
    h.store.set_records(vec![record("condition:vegan", "Vegan")]);

    h.catalog.start().await.unwrap();

    let calls = h.store.0.since_calls.lock();
    let condition_call =
        calls.iter().find(|(table, _)| *table == "condition").expect("condition catch-up");
    assert_eq!(
        condition_call.1,
        DateTime::<Utc>::UNIX_EPOCH,
        "snapshot older than the freshness window is a miss"
    );
}

#[tokio::test]
async fn live_changes_update_catalog_and_snapshot() {
    let h = harness();
    h.catalog.start().await.unwrap();
    assert!(h.catalog.conditions().is_empty());

    h.store
        .emit(
            "condition",
            RefChange {
                action: ChangeAction::Added,
                path: "condition:halal".to_owned(),
                record: Some(record("condition:halal", "Halal")),
            },
        )
        .await;

    for _ in 0..100 {
        if !h.catalog.conditions().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.catalog.conditions().len(), 1);

    // Write-through landed in the kv backend.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let raw = h.kv.entries.lock().get("conditions").cloned().expect("snapshot written");
    assert!(raw.contains("Halal"));

    h.store
        .emit(
            "condition",
            RefChange {
                action: ChangeAction::Removed,
                path: "condition:halal".to_owned(),
                record: None,
            },
        )
        .await;
    for _ in 0..100 {
        if h.catalog.conditions().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(h.catalog.conditions().is_empty());
}

#[tokio::test]
async fn profile_from_paths_skips_unknown() {
    let h = harness();
    h.store.set_records(vec![
        record("condition:vegan", "Vegan"),
        record("condition:halal", "Halal"),
    ]);
    h.catalog.start().await.unwrap();

    let profile = h.catalog.profile_from_paths(["condition:vegan", "condition:nope"]);
    let names: Vec<String> = profile.conditions().map(|c| c.name.clone()).collect();
    assert_eq!(names, vec!["Vegan".to_owned()]);
}
