//! Named snapshot persistence over an injected key-value port.
//!
//! Each snapshot is one named JSON document carrying its record list and an
//! update timestamp. Consumers decide what staleness means for them: reference
//! data applies [`REFERENCE_FRESHNESS`], live marker state ignores age because
//! it is epoch-scoped anyway.
//!
//! A corrupt, empty, or shape-invalid snapshot is a cache **miss**, never an
//! error; writes are best-effort and must not interrupt the in-memory flow.

use chrono::{DateTime, TimeDelta, Utc};
use nosh_storage::{NamespacedStorage, StorageError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum age of a reference-data snapshot before it is discarded in favor
/// of a full refetch: 6 hours.
pub const REFERENCE_FRESHNESS: TimeDelta = TimeDelta::hours(6);

/// A specialized [`SnapshotError`] enum of this module.
#[nosh_derive::nosh_error]
pub enum SnapshotError {
    /// The underlying key-value backend failed.
    #[error("Snapshot backend error{}: {message}", format_context(.context))]
    Backend { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Snapshot (de)serialization failed.
    #[error("Snapshot serialization error{}: {source}", format_context(.context))]
    Serde { source: serde_json::Error, context: Option<Cow<'static, str>> },
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Port over durable client-local key-value storage.
///
/// `get` returns `None` for an absent key; neither call carries transactional
/// guarantees, and each named snapshot is written/read independently.
pub trait KeyValue: Debug + Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, SnapshotError>>;
    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<(), SnapshotError>>;
}

/// [`KeyValue`] implementation backed by the sandboxed storage engine.
///
/// Snapshot names map to `<name>.json` files inside the given namespace.
#[derive(Debug, Clone)]
pub struct StorageKeyValue {
    storage: NamespacedStorage,
}

impl StorageKeyValue {
    #[must_use]
    pub const fn new(storage: NamespacedStorage) -> Self {
        Self { storage }
    }
}

impl KeyValue for StorageKeyValue {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, SnapshotError>> {
        Box::pin(async move {
            match self.storage.read_text(format!("{key}.json")).await {
                Ok(text) => Ok(Some(text)),
                Err(StorageError::FileNotFound { .. }) => Ok(None),
                Err(err) => Err(SnapshotError::Backend {
                    message: err.to_string().into(),
                    context: Some("Snapshot read".into()),
                }),
            }
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: &'a str) -> BoxFuture<'a, Result<(), SnapshotError>> {
        Box::pin(async move {
            self.storage.write_text(format!("{key}.json"), value).await.map_err(|err| {
                SnapshotError::Backend {
                    message: err.to_string().into(),
                    context: Some("Snapshot write".into()),
                }
            })
        })
    }
}

/// On-disk shape of a named snapshot.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    updated_at: DateTime<Utc>,
    records: Vec<T>,
}

/// A successfully restored snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub records: Vec<T>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a snapshot read.
#[derive(Debug, Clone, PartialEq)]
pub enum Recovery<T> {
    /// Absent, corrupt, empty, shape-invalid, or older than the allowed age.
    /// The consumer performs a full refetch from timestamp zero.
    Miss,
    /// Usable records; the consumer may resume incrementally from `updated_at`.
    Hit(Snapshot<T>),
}

/// Reads and writes named snapshots through a [`KeyValue`] port.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    kv: Arc<dyn KeyValue>,
}

impl SnapshotCache {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValue>) -> Self {
        Self { kv }
    }

    /// Restores the snapshot stored under `name`.
    ///
    /// Every record must pass `validate`; one malformed record invalidates the
    /// whole snapshot (a partially trusted cache is worse than none). When
    /// `max_age` is given, snapshots older than it are misses as well.
    pub async fn load<T>(
        &self,
        name: &str,
        max_age: Option<TimeDelta>,
        validate: impl Fn(&T) -> bool,
    ) -> Recovery<T>
    where
        T: DeserializeOwned,
    {
        let raw = match self.kv.get(name).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Recovery::Miss,
            Err(err) => {
                warn!(snapshot = name, error = %err, "Snapshot read failed, treating as miss");
                return Recovery::Miss;
            },
        };

        let envelope: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(snapshot = name, error = %err, "Corrupt snapshot, treating as miss");
                return Recovery::Miss;
            },
        };

        if envelope.records.is_empty() {
            return Recovery::Miss;
        }
        if !envelope.records.iter().all(validate) {
            warn!(snapshot = name, "Snapshot failed shape validation, treating as miss");
            return Recovery::Miss;
        }
        if let Some(max_age) = max_age
            && Utc::now() - envelope.updated_at > max_age
        {
            debug!(snapshot = name, updated_at = %envelope.updated_at, "Snapshot is stale");
            return Recovery::Miss;
        }

        Recovery::Hit(Snapshot { records: envelope.records, updated_at: envelope.updated_at })
    }

    /// Persists `records` under `name`, stamped with the current time.
    ///
    /// Best-effort: serialization and backend failures are logged and
    /// swallowed. The next write attempt is unaffected.
    pub async fn write_through<T>(&self, name: &str, records: &[T])
    where
        T: Serialize,
    {
        let envelope = SerializableEnvelope { updated_at: Utc::now(), records };
        let raw = match serde_json::to_string(&envelope) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(snapshot = name, error = %err, "Snapshot serialization failed");
                return;
            },
        };

        if let Err(err) = self.kv.set(name, &raw).await {
            warn!(snapshot = name, error = %err, "Snapshot write failed");
        }
    }
}

/// Borrowing twin of [`Envelope`] for the write path.
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SerializableEnvelope<'a, T> {
    updated_at: DateTime<Utc>,
    records: &'a [T],
}
