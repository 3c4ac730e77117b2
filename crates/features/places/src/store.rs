//! Port over the authoritative marker store.

use crate::error::PlacesError;
use crate::gateway::BoxFuture;
use nosh_domain::geo::GeoPoint;
use nosh_domain::marker::{ChangeEvent, Marker, MarkerPatch};
use std::fmt::Debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Guard over one live change-feed registration.
///
/// Dropping the guard detaches the subscription: the delivery task is aborted
/// and, for the SurrealDB adapter, the live query dies with its stream. This
/// is what makes epoch teardown a plain move-and-drop.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Wraps the task that owns the feed and pushes [`ChangeEvent`]s.
    #[must_use]
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self { task }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Port over the persisted venue collection.
///
/// All radius arguments are meters. Change events for one subscription are
/// delivered in order through the provided channel.
pub trait MarkerStore: Debug + Send + Sync {
    /// Bounded radius query returning full records with computed distance.
    fn query_near(
        &self,
        center: GeoPoint,
        radius_m: f64,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<Marker>, PlacesError>>;

    /// Registers a change feed scoped to the region and forwards its events
    /// into `events` until the returned [`Subscription`] is dropped.
    fn subscribe_near(
        &self,
        center: GeoPoint,
        radius_m: f64,
        events: mpsc::Sender<ChangeEvent>,
    ) -> BoxFuture<'_, Result<Subscription, PlacesError>>;

    /// Merge-upsert of a full document under its record key. Idempotent for
    /// reconciliation seeds because the key is derived from external identity.
    fn upsert(&self, marker: Marker) -> BoxFuture<'_, Result<(), PlacesError>>;

    /// Merge-patch of an existing document.
    fn patch(&self, id: String, patch: MarkerPatch) -> BoxFuture<'_, Result<(), PlacesError>>;

    /// Inserts a new document, letting the store pick the record key.
    fn create(&self, marker: Marker) -> BoxFuture<'_, Result<Marker, PlacesError>>;
}
