//! The browsing session: one canonical marker map, one live epoch.
//!
//! All mutation flows through dispatched reducer actions under a single lock;
//! no other component writes the map. Switching the region is the
//! cancellation signal for everything belonging to the previous epoch.

use crate::error::PlacesError;
use crate::filter;
use crate::gateway::ExternalPlaces;
use crate::livesync::SyncScope;
use crate::reducer::{self, MarkerAction, MarkerMap, MergePolicy};
use crate::store::MarkerStore;
use crate::{query, reconcile};
use nosh_domain::constants::MARKERS_SNAPSHOT;
use nosh_domain::dietary::Profile;
use nosh_domain::geo::GeoPoint;
use nosh_domain::marker::{ChangeAction, ChangeEvent, Marker, MarkerPatch};
use nosh_event_bus::EventBus;
use nosh_kernel::safe_nanoid;
use nosh_kernel::snapshot::{Recovery, SnapshotCache};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Published on the bus when a new query epoch begins.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStarted {
    pub epoch: u64,
    pub center: GeoPoint,
    pub radius_m: f64,
}

/// Published on the bus after every applied marker-map change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkersChanged {
    pub epoch: u64,
    pub count: usize,
}

#[derive(Debug, Default)]
struct SessionState {
    epoch: u64,
    markers: MarkerMap,
    focused: Option<String>,
    scope: Option<SyncScope>,
}

#[derive(Debug)]
struct SessionInner {
    store: Arc<dyn MarkerStore>,
    gateway: Arc<dyn ExternalPlaces>,
    events: EventBus,
    cache: SnapshotCache,
    category: String,
    query_limit: usize,
    state: Mutex<SessionState>,
}

/// A user's venue-browsing session.
///
/// Cheap to clone; all clones share the same state.
#[derive(Debug, Clone)]
pub struct PlacesSession {
    inner: Arc<SessionInner>,
}

impl PlacesSession {
    #[must_use]
    pub fn new(
        store: Arc<dyn MarkerStore>,
        gateway: Arc<dyn ExternalPlaces>,
        events: EventBus,
        cache: SnapshotCache,
        category: impl Into<String>,
        query_limit: usize,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                store,
                gateway,
                events,
                cache,
                category: category.into(),
                query_limit,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    /// Restores the cached marker snapshot as the pre-query baseline.
    ///
    /// Only applies before the first region query; live marker state is
    /// epoch-scoped, so the first [`PlacesSession::set_region`] replaces it
    /// regardless of age. Returns the number of restored markers.
    pub async fn restore_cached(&self) -> usize {
        let recovery = self
            .inner
            .cache
            .load::<Marker>(MARKERS_SNAPSHOT, None, |marker| {
                !marker.id.is_empty() && !marker.name.is_empty()
            })
            .await;

        match recovery {
            Recovery::Hit(snapshot) => {
                let mut state = self.inner.state.lock();
                if state.epoch != 0 {
                    return 0;
                }
                state.markers = reducer::reduce(
                    &state.markers,
                    MarkerAction::AddMarkers(snapshot.records),
                    MergePolicy::KeepExisting,
                );
                state.markers.len()
            },
            Recovery::Miss => 0,
        }
    }

    /// Starts a new query epoch for the given region.
    ///
    /// Resets the map, detaches the previous epoch's subscriptions, fetches
    /// and reconciles both providers, and registers the new change feed.
    /// Results belonging to a superseded epoch are discarded, never applied.
    ///
    /// # Errors
    /// Returns [`PlacesError::Store`] when the authoritative query fails; the
    /// external provider degrades to an empty result instead of failing.
    pub async fn set_region(&self, center: GeoPoint, radius_m: f64) -> Result<(), PlacesError> {
        let epoch = {
            let mut state = self.inner.state.lock();
            state.epoch += 1;
            // Dropping the scope aborts delivery and kills the live query.
            state.scope = None;
            state.focused = None;
            state.markers =
                reducer::reduce(&state.markers, MarkerAction::Reset, MergePolicy::KeepExisting);
            state.epoch
        };
        let _ = self.inner.events.publish(EpochStarted { epoch, center, radius_m });
        debug!(epoch, "Query epoch started");

        let (external, authoritative) = query::execute_query(
            &self.inner.gateway,
            &self.inner.store,
            center,
            radius_m,
            &self.inner.category,
            self.inner.query_limit,
        )
        .await?;
        let baseline = reconcile::reconcile(&self.inner.store, authoritative, external, center);

        {
            let mut state = self.inner.state.lock();
            if state.epoch != epoch {
                debug!(epoch, "Discarding baseline for superseded epoch");
                return Ok(());
            }
            state.markers = reducer::reduce(
                &state.markers,
                MarkerAction::AddMarkers(baseline),
                MergePolicy::KeepExisting,
            );
        }

        let weak = Arc::downgrade(&self.inner);
        let scope = SyncScope::start(&self.inner.store, center, radius_m, epoch, move |event| {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    inner.apply_change(epoch, event).await;
                }
            })
        })
        .await;

        match scope {
            Ok(scope) => {
                let mut state = self.inner.state.lock();
                if state.epoch == epoch && scope.epoch() == epoch {
                    state.scope = Some(scope);
                }
            },
            Err(err) => {
                // Degraded epoch: the baseline stays visible without live updates.
                warn!(error = %err, "Change feed unavailable for this epoch");
            },
        }

        self.inner.after_change(epoch).await;
        Ok(())
    }

    /// Places a transient, client-local marker. Never auto-persisted;
    /// discarded on the next epoch reset.
    pub fn place_marker(&self, coordinates: GeoPoint, name: impl Into<String>) -> Marker {
        let marker = Marker {
            id: safe_nanoid!(),
            external_id: None,
            coordinates,
            name: name.into(),
            vicinity: String::new(),
            tags: BTreeSet::new(),
            distance: None,
            is_new: true,
        };

        let mut state = self.inner.state.lock();
        state.markers = reducer::reduce(
            &state.markers,
            MarkerAction::AddMarker(marker.clone()),
            MergePolicy::KeepExisting,
        );
        marker
    }

    /// Persists the tag set of a marker.
    ///
    /// A persisted marker is patched in place; the change feed delivers the
    /// resulting update. An unsaved (`is_new`) marker is created in the store
    /// and its client-local entry dropped, to be replaced by the feed's copy.
    ///
    /// # Errors
    /// Returns [`PlacesError::Internal`] for an unknown id, or the store
    /// error when the write fails.
    pub async fn save_tags(&self, id: &str, tags: BTreeSet<String>) -> Result<(), PlacesError> {
        let target = { self.inner.state.lock().markers.get(id).cloned() };
        let Some(marker) = target else {
            return Err(PlacesError::Internal {
                message: format!("Unknown marker {id}").into(),
                context: None,
            });
        };

        if marker.is_new {
            let mut doc = marker;
            doc.tags = tags;
            doc.is_new = false;
            self.inner.store.create(doc).await?;

            let mut state = self.inner.state.lock();
            state.markers = reducer::reduce(
                &state.markers,
                MarkerAction::DeleteMarker(id.to_owned()),
                MergePolicy::KeepExisting,
            );
            if state.focused.as_deref() == Some(id) {
                state.focused = None;
            }
        } else {
            self.inner.store.patch(marker.id, MarkerPatch::tags(tags)).await?;
        }

        Ok(())
    }

    /// All markers of the current epoch, unordered.
    #[must_use]
    pub fn markers(&self) -> Vec<Marker> {
        self.inner.state.lock().markers.values().cloned().collect()
    }

    /// Markers passing the dietary predicate for `profile`, unordered.
    #[must_use]
    pub fn visible(&self, profile: &Profile) -> Vec<Marker> {
        self.inner
            .state
            .lock()
            .markers
            .values()
            .filter(|marker| filter::matches(marker, profile))
            .cloned()
            .collect()
    }

    /// Focuses the marker with the given id. Returns whether it exists.
    pub fn focus(&self, id: &str) -> bool {
        let mut state = self.inner.state.lock();
        if state.markers.contains_key(id) {
            state.focused = Some(id.to_owned());
            true
        } else {
            false
        }
    }

    /// The currently focused marker, if any.
    #[must_use]
    pub fn focused(&self) -> Option<Marker> {
        let state = self.inner.state.lock();
        state.focused.as_ref().and_then(|id| state.markers.get(id)).cloned()
    }

    /// Re-evaluates the focus against a changed profile.
    ///
    /// A focused marker that no longer passes the predicate is defocused; the
    /// canonical record itself is untouched.
    pub fn set_profile(&self, profile: &Profile) {
        let mut state = self.inner.state.lock();
        let defocus = state
            .focused
            .as_ref()
            .and_then(|id| state.markers.get(id))
            .is_some_and(|marker| !filter::matches(marker, profile));
        if defocus {
            state.focused = None;
        }
    }

    /// The current query epoch (0 before the first region query).
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.inner.state.lock().epoch
    }
}

impl SessionInner {
    /// Applies one change-feed event. Events tagged with a stale epoch are
    /// dropped; dedup of `added` against the baseline happens in the reducer.
    async fn apply_change(&self, epoch: u64, event: ChangeEvent) {
        {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                debug!(epoch, id = %event.id, "Dropping change event from stale epoch");
                return;
            }

            let action = match (event.action, event.data) {
                (ChangeAction::Added, Some(marker)) => MarkerAction::AddMarker(marker),
                (ChangeAction::Modified, Some(marker)) => MarkerAction::UpdateMarker {
                    id: event.id,
                    patch: patch_from(marker),
                },
                (ChangeAction::Removed, _) => MarkerAction::DeleteMarker(event.id),
                (action, None) => {
                    warn!(?action, id = %event.id, "Change event without document body");
                    return;
                },
            };

            state.markers = reducer::reduce(&state.markers, action, MergePolicy::KeepExisting);
            let focus_gone = state
                .focused
                .as_ref()
                .is_some_and(|focused| !state.markers.contains_key(focused));
            if focus_gone {
                state.focused = None;
            }
        }

        self.after_change(epoch).await;
    }

    /// Write-through and notification after any applied change.
    async fn after_change(&self, epoch: u64) {
        let (persistable, count) = {
            let state = self.state.lock();
            if state.epoch != epoch {
                return;
            }
            // Unsaved client-local markers are never persisted, not even to
            // the snapshot cache.
            let persistable: Vec<Marker> =
                state.markers.values().filter(|m| !m.is_new).cloned().collect();
            (persistable, state.markers.len())
        };

        self.cache.write_through(MARKERS_SNAPSHOT, &persistable).await;
        let _ = self.events.publish(MarkersChanged { epoch, count });
    }
}

fn patch_from(marker: Marker) -> MarkerPatch {
    MarkerPatch {
        coordinates: Some(marker.coordinates),
        name: Some(marker.name),
        vicinity: Some(marker.vicinity),
        tags: Some(marker.tags),
        distance: marker.distance,
    }
}
