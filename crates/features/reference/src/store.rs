//! Port over the persisted reference catalogs.

use crate::error::{ReferenceError, ReferenceErrorExt};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use nosh_database::Database;
use nosh_domain::marker::ChangeAction;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use surrealdb::types::{Datetime, RecordId, SurrealValue};
use surrealdb::{Action, Notification};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One reference catalog entry (a category or a condition).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefRecord {
    /// Store path, e.g. `condition:vegan`.
    pub path: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

impl RefRecord {
    /// Shape check used by the snapshot cache.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.path.is_empty() && !self.name.is_empty()
    }
}

/// One change-feed delivery for a reference catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefChange {
    pub action: ChangeAction,
    pub path: String,
    /// The entry body; absent for removals.
    pub record: Option<RefRecord>,
}

/// Guard over one live feed registration; dropping it detaches the feed.
#[derive(Debug)]
pub struct FeedGuard {
    task: JoinHandle<()>,
}

impl FeedGuard {
    /// Wraps the task that owns the feed.
    #[must_use]
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self { task }
    }
}

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Port over the reference catalogs in the authoritative store.
pub trait ReferenceStore: Debug + Send + Sync {
    /// Entries of `table` updated strictly after `since`, oldest first.
    ///
    /// Passing timestamp zero is the full-refetch path.
    fn changed_since(
        &self,
        table: &'static str,
        since: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Vec<RefRecord>, ReferenceError>>;

    /// Registers a live feed over `table` and forwards its events into
    /// `events` until the returned guard is dropped.
    fn subscribe(
        &self,
        table: &'static str,
        events: mpsc::Sender<RefChange>,
    ) -> BoxFuture<'_, Result<FeedGuard, ReferenceError>>;
}

/// Full catalog document as stored in SurrealDB.
#[derive(Debug, Clone, SurrealValue)]
struct RefDoc {
    id: RecordId,
    name: String,
    updated_at: Datetime,
}

impl RefDoc {
    fn into_record(self) -> RefRecord {
        RefRecord {
            path: self.id.to_string(),
            name: self.name,
            updated_at: self.updated_at.into(),
        }
    }
}

/// Reference store backed by the shared SurrealDB session.
#[derive(Debug, Clone)]
pub struct SurrealReferenceStore {
    db: Database,
}

impl SurrealReferenceStore {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }
}

impl ReferenceStore for SurrealReferenceStore {
    fn changed_since(
        &self,
        table: &'static str,
        since: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Vec<RefRecord>, ReferenceError>> {
        Box::pin(async move {
            let docs = self
                .db
                .query("SELECT * FROM type::table($table) WHERE updated_at > $since ORDER BY updated_at ASC")
                .bind(("table", table))
                .bind(("since", Datetime::from(since)))
                .await
                .context("Catch-up query failed")?
                .take::<Vec<RefDoc>>(0)
                .context("Catch-up query returned an unexpected shape")?;

            Ok(docs.into_iter().map(RefDoc::into_record).collect())
        })
    }

    fn subscribe(
        &self,
        table: &'static str,
        events: mpsc::Sender<RefChange>,
    ) -> BoxFuture<'_, Result<FeedGuard, ReferenceError>> {
        Box::pin(async move {
            let mut response = self
                .db
                .query(format!("LIVE SELECT * FROM {table}"))
                .await
                .context("Registering live query")?;

            let mut stream =
                response.stream::<Notification<RefDoc>>(0).map_err(|e| ReferenceError::Feed {
                    message: e.to_string().into(),
                    context: Some("Opening notification stream".into()),
                })?;

            let task = tokio::spawn(async move {
                while let Some(delivery) = stream.next().await {
                    let notification = match delivery {
                        Ok(notification) => notification,
                        Err(err) => {
                            warn!(error = %err, "Reference feed delivery failed");
                            continue;
                        },
                    };

                    let path = notification.data.id.to_string();
                    let (action, record) = match notification.action {
                        Action::Create => {
                            (ChangeAction::Added, Some(notification.data.into_record()))
                        },
                        Action::Update => {
                            (ChangeAction::Modified, Some(notification.data.into_record()))
                        },
                        Action::Delete => (ChangeAction::Removed, None),
                        other => {
                            warn!(?other, "Ignoring unsupported reference feed action");
                            continue;
                        },
                    };

                    if events.send(RefChange { action, path, record }).await.is_err() {
                        break;
                    }
                }
            });

            Ok(FeedGuard { task })
        })
    }
}
