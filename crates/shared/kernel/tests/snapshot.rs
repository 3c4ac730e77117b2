use chrono::TimeDelta;
use nosh_kernel::snapshot::{
    KeyValue, Recovery, SnapshotCache, SnapshotError, StorageKeyValue,
};
use nosh_storage::Storage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Record {
    name: String,
    vicinity: String,
    tags: Vec<String>,
}

impl Record {
    fn valid(&self) -> bool {
        !self.name.is_empty()
    }

    fn sample(name: &str) -> Self {
        Self { name: name.to_owned(), vicinity: "somewhere".to_owned(), tags: vec![] }
    }
}

/// In-memory backend for exercising the port without touching the disk.
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

fn cache() -> (SnapshotCache, MemoryKv) {
    let kv = MemoryKv::default();
    (SnapshotCache::new(Arc::new(kv.clone())), kv)
}

#[tokio::test]
async fn round_trip_within_window_is_a_hit() {
    let (cache, _kv) = cache();
    let records = vec![Record::sample("a"), Record::sample("b")];

    cache.write_through("markers", &records).await;

    match cache.load("markers", Some(TimeDelta::hours(6)), Record::valid).await {
        Recovery::Hit(snapshot) => assert_eq!(snapshot.records, records),
        Recovery::Miss => panic!("fresh snapshot should be a hit"),
    }
}

#[tokio::test]
async fn absent_snapshot_is_a_miss() {
    let (cache, _kv) = cache();
    let recovery = cache.load::<Record>("markers", None, Record::valid).await;
    assert_eq!(recovery, Recovery::Miss);
}

#[tokio::test]
async fn corrupt_snapshot_is_a_miss_not_an_error() {
    let (cache, kv) = cache();
    kv.put_raw("markers", "{ not json ]");

    let recovery = cache.load::<Record>("markers", None, Record::valid).await;
    assert_eq!(recovery, Recovery::Miss);
}

#[tokio::test]
async fn empty_snapshot_is_a_miss() {
    let (cache, _kv) = cache();
    cache.write_through::<Record>("markers", &[]).await;

    let recovery = cache.load::<Record>("markers", None, Record::valid).await;
    assert_eq!(recovery, Recovery::Miss);
}

#[tokio::test]
async fn shape_invalid_record_invalidates_snapshot() {
    let (cache, _kv) = cache();
    let records = vec![Record::sample("ok"), Record::sample("")];
    cache.write_through("markers", &records).await;

    let recovery = cache.load::<Record>("markers", None, Record::valid).await;
    assert_eq!(recovery, Recovery::Miss);
}

#[tokio::test]
async fn stale_snapshot_is_a_miss() {
    let (cache, kv) = cache();
    // Stamp a snapshot seven hours into the past.
    let updated_at = chrono::Utc::now() - TimeDelta::hours(7);
    let raw = format!(
        r#"{{"updatedAt":"{}","records":[{{"name":"a","vicinity":"v","tags":[]}}]}}"#,
        updated_at.to_rfc3339()
    );
    kv.put_raw("conditions", &raw);

    let stale = cache.load::<Record>("conditions", Some(TimeDelta::hours(6)), Record::valid).await;
    assert_eq!(stale, Recovery::Miss);

    // Without an age bound the same snapshot is usable.
    match cache.load::<Record>("conditions", None, Record::valid).await {
        Recovery::Hit(snapshot) => assert_eq!(snapshot.records.len(), 1),
        Recovery::Miss => panic!("age-unbounded load should hit"),
    }
}

#[tokio::test]
async fn storage_backed_port_round_trips() {
    let temp = TempDir::new().unwrap();
    let storage = Storage::builder().root(temp.path()).connect().await.unwrap();
    let kv = StorageKeyValue::new(storage.namespace("places").unwrap());
    let cache = SnapshotCache::new(Arc::new(kv));

    let records = vec![Record::sample("persisted")];
    cache.write_through("markers", &records).await;

    match cache.load("markers", Some(TimeDelta::hours(6)), Record::valid).await {
        Recovery::Hit(snapshot) => assert_eq!(snapshot.records, records),
        Recovery::Miss => panic!("storage-backed snapshot should round trip"),
    }
}
