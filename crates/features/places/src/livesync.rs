//! Per-epoch ownership of the change-feed subscription set.

use crate::error::PlacesError;
use crate::gateway::BoxFuture;
use crate::store::{MarkerStore, Subscription};
use nosh_domain::geo::GeoPoint;
use nosh_domain::marker::ChangeEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Buffer for in-flight change events of one subscription.
const EVENT_BUFFER: usize = 64;

/// Owns the live subscription set of one query epoch.
///
/// Exactly one scope is alive at any time; dropping it aborts the delivery
/// task and detaches the store subscription, so subscriptions never leak
/// across region changes. Events are handed to `on_event` strictly one at a
/// time, in delivery order.
#[derive(Debug)]
pub(crate) struct SyncScope {
    epoch: u64,
    _subscription: Subscription,
    deliverer: JoinHandle<()>,
}

impl SyncScope {
    /// Registers the epoch's subscription and starts the delivery loop.
    pub(crate) async fn start<F>(
        store: &Arc<dyn MarkerStore>,
        center: GeoPoint,
        radius_m: f64,
        epoch: u64,
        on_event: F,
    ) -> Result<Self, PlacesError>
    where
        F: Fn(ChangeEvent) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<ChangeEvent>(EVENT_BUFFER);
        let subscription = store.subscribe_near(center, radius_m, tx).await?;

        let deliverer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                on_event(event).await;
            }
            debug!(epoch, "Change feed delivery loop ended");
        });

        Ok(Self { epoch, _subscription: subscription, deliverer })
    }

    pub(crate) const fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Drop for SyncScope {
    fn drop(&mut self) {
        self.deliverer.abort();
        debug!(epoch = self.epoch, "Detached live subscription scope");
    }
}
