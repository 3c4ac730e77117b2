//! Reconciliation of external search results against the authoritative set.

use crate::codec;
use crate::gateway::ExternalPlace;
use crate::store::MarkerStore;
use fxhash::FxHashSet;
use nosh_domain::geo::GeoPoint;
use nosh_domain::marker::Marker;
use std::sync::Arc;
use tracing::{debug, warn};

/// Deduplicates `external` against `authoritative` by external identity and
/// seeds every previously unseen entry into the store.
///
/// Seeds are fire-and-forget upserts keyed by external identity with empty
/// tags, so re-running reconciliation with unchanged input never
/// double-inserts. The merged baseline includes the seeds immediately; the UI
/// never waits on write latency.
#[must_use]
pub fn reconcile(
    store: &Arc<dyn MarkerStore>,
    authoritative: Vec<Marker>,
    external: Vec<ExternalPlace>,
    center: GeoPoint,
) -> Vec<Marker> {
    let mut known: FxHashSet<String> =
        authoritative.iter().filter_map(|m| m.external_id.clone()).collect();

    let mut merged = authoritative;
    for place in external {
        if !known.insert(place.id.clone()) {
            continue;
        }

        let seed = codec::marker_from_external(&place, center);
        debug!(id = %seed.id, "Seeding store with external place");

        let store = Arc::clone(store);
        let persisted = seed.clone();
        tokio::spawn(async move {
            if let Err(err) = store.upsert(persisted).await {
                warn!(error = %err, "Seed upsert failed; entry stays in-memory only");
            }
        });

        merged.push(seed);
    }

    merged
}
