//! SurrealDB implementation of the marker store port.
//!
//! Radius queries ride on `geo::distance`; the change feed is a `LIVE SELECT`
//! scoped to the same region predicate. Dropping the returned subscription
//! aborts the forwarding task, which drops the notification stream and with
//! it the live query.

use crate::codec::{self, PlaceDoc};
use crate::error::{PlacesError, PlacesErrorExt};
use crate::gateway::BoxFuture;
use crate::store::{MarkerStore, Subscription};
use futures::StreamExt;
use nosh_database::Database;
use nosh_domain::geo::GeoPoint;
use nosh_domain::marker::{ChangeAction, ChangeEvent, Marker, MarkerPatch};
use surrealdb::{Action, Notification};
use tokio::sync::mpsc;
use tracing::warn;

const QUERY_NEAR: &str = "\
    SELECT *, geo::distance(coordinates, type::point([$lng, $lat])) AS distance \
    FROM place \
    WHERE geo::distance(coordinates, type::point([$lng, $lat])) <= $radius \
    ORDER BY distance ASC \
    LIMIT $limit";

const LIVE_NEAR: &str = "\
    LIVE SELECT * FROM place \
    WHERE geo::distance(coordinates, type::point([$lng, $lat])) <= $radius";

const UPSERT_PLACE: &str = "\
    UPSERT type::record($target) MERGE { \
        external_id: $external_id, \
        name: $name, \
        vicinity: $vicinity, \
        coordinates: type::point([$lng, $lat]), \
        tags: $tags \
    }";

const CREATE_PLACE: &str = "\
    CREATE place CONTENT { \
        external_id: $external_id, \
        name: $name, \
        vicinity: $vicinity, \
        coordinates: type::point([$lng, $lat]), \
        tags: $tags \
    }";

/// Marker store backed by the shared SurrealDB session.
#[derive(Debug, Clone)]
pub struct SurrealMarkerStore {
    db: Database,
}

impl SurrealMarkerStore {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }
}

impl MarkerStore for SurrealMarkerStore {
    fn query_near(
        &self,
        center: GeoPoint,
        radius_m: f64,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<Marker>, PlacesError>> {
        Box::pin(async move {
            let docs = self
                .db
                .query(QUERY_NEAR)
                .bind(("lng", center.lng))
                .bind(("lat", center.lat))
                .bind(("radius", radius_m))
                .bind(("limit", i64::try_from(limit).unwrap_or(i64::MAX)))
                .await
                .context("Radius query failed")?
                .take::<Vec<PlaceDoc>>(0)
                .context("Radius query returned an unexpected shape")?;

            Ok(docs
                .into_iter()
                .filter_map(|doc| codec::marker_from_doc(doc, Some(center)))
                .collect())
        })
    }

    fn subscribe_near(
        &self,
        center: GeoPoint,
        radius_m: f64,
        events: mpsc::Sender<ChangeEvent>,
    ) -> BoxFuture<'_, Result<Subscription, PlacesError>> {
        Box::pin(async move {
            let mut response = self
                .db
                .query(LIVE_NEAR)
                .bind(("lng", center.lng))
                .bind(("lat", center.lat))
                .bind(("radius", radius_m))
                .await
                .context("Registering live query")?;

            let mut stream =
                response.stream::<Notification<PlaceDoc>>(0).map_err(|e| PlacesError::Feed {
                    message: e.to_string().into(),
                    context: Some("Opening notification stream".into()),
                })?;

            let task = tokio::spawn(async move {
                while let Some(delivery) = stream.next().await {
                    let notification = match delivery {
                        Ok(notification) => notification,
                        Err(err) => {
                            // Keep the last good state visible; a transient
                            // feed error never clears anything.
                            warn!(error = %err, "Change feed delivery failed");
                            continue;
                        },
                    };

                    let Some(event) = change_event(notification, center) else { continue };
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
            });

            Ok(Subscription::from_task(task))
        })
    }

    fn upsert(&self, marker: Marker) -> BoxFuture<'_, Result<(), PlacesError>> {
        Box::pin(async move {
            self.db
                .query(UPSERT_PLACE)
                .bind(("target", marker.id))
                .bind(("external_id", marker.external_id))
                .bind(("name", marker.name))
                .bind(("vicinity", marker.vicinity))
                .bind(("lng", marker.coordinates.lng))
                .bind(("lat", marker.coordinates.lat))
                .bind(("tags", marker.tags.into_iter().collect::<Vec<_>>()))
                .await
                .context("Upsert failed")?
                .check()
                .map_err(surrealdb::Error::from)
                .context("Upsert rejected")?;
            Ok(())
        })
    }

    fn patch(&self, id: String, patch: MarkerPatch) -> BoxFuture<'_, Result<(), PlacesError>> {
        Box::pin(async move {
            let mut sets = Vec::new();
            if patch.name.is_some() {
                sets.push("name = $name");
            }
            if patch.vicinity.is_some() {
                sets.push("vicinity = $vicinity");
            }
            if patch.tags.is_some() {
                sets.push("tags = $tags");
            }
            if patch.coordinates.is_some() {
                sets.push("coordinates = type::point([$lng, $lat])");
            }
            if sets.is_empty() {
                return Ok(());
            }

            let query = format!("UPDATE type::record($target) SET {}", sets.join(", "));
            let mut request = self.db.query(query).bind(("target", id));
            if let Some(name) = patch.name {
                request = request.bind(("name", name));
            }
            if let Some(vicinity) = patch.vicinity {
                request = request.bind(("vicinity", vicinity));
            }
            if let Some(tags) = patch.tags {
                request = request.bind(("tags", tags.into_iter().collect::<Vec<_>>()));
            }
            if let Some(coordinates) = patch.coordinates {
                request =
                    request.bind(("lng", coordinates.lng)).bind(("lat", coordinates.lat));
            }

            request
                .await
                .context("Patch failed")?
                .check()
                .map_err(surrealdb::Error::from)
                .context("Patch rejected")?;
            Ok(())
        })
    }

    fn create(&self, marker: Marker) -> BoxFuture<'_, Result<Marker, PlacesError>> {
        Box::pin(async move {
            let created = self
                .db
                .query(CREATE_PLACE)
                .bind(("external_id", marker.external_id))
                .bind(("name", marker.name))
                .bind(("vicinity", marker.vicinity))
                .bind(("lng", marker.coordinates.lng))
                .bind(("lat", marker.coordinates.lat))
                .bind(("tags", marker.tags.into_iter().collect::<Vec<_>>()))
                .await
                .context("Create failed")?
                .take::<Vec<PlaceDoc>>(0)
                .context("Create returned an unexpected shape")?;

            created
                .into_iter()
                .next()
                .and_then(|doc| codec::marker_from_doc(doc, None))
                .ok_or_else(|| PlacesError::Decode {
                    message: "Created document could not be decoded".into(),
                    context: None,
                })
        })
    }
}

fn change_event(notification: Notification<PlaceDoc>, center: GeoPoint) -> Option<ChangeEvent> {
    let id = notification.data.id.to_string();

    let action = match notification.action {
        Action::Create => ChangeAction::Added,
        Action::Update => ChangeAction::Modified,
        Action::Delete => ChangeAction::Removed,
        other => {
            warn!(?other, "Ignoring unsupported change feed action");
            return None;
        },
    };

    let data = if action == ChangeAction::Removed {
        None
    } else {
        // A document the codec rejects must not reach the reducer at all.
        Some(codec::marker_from_doc(notification.data, Some(center))?)
    };

    Some(ChangeEvent { action, id, data })
}
