//! Boundary codec between store documents and domain [`Marker`]s.
//!
//! Identity rule: the reducer key is the store record key once a document is
//! persisted. Reconciliation seeds use the external identity as the record
//! key (`place:⟨external-id⟩`), so seeded entries carry their final id before
//! the asynchronous upsert lands. Client-placed markers get a synthetic nanoid
//! until they are explicitly saved.

use crate::gateway::ExternalPlace;
use nosh_domain::constants::PLACE_TABLE;
use nosh_domain::geo::GeoPoint;
use nosh_domain::marker::Marker;
use surrealdb::types::{Datetime, Geometry, RecordId, SurrealValue};
use tracing::warn;

/// Full `place` document as stored in SurrealDB.
#[derive(Debug, Clone, SurrealValue)]
pub(crate) struct PlaceDoc {
    pub id: RecordId,
    pub external_id: Option<String>,
    pub name: String,
    pub vicinity: String,
    pub coordinates: Geometry,
    pub tags: Vec<String>,
    pub updated_at: Option<Datetime>,
    pub distance: Option<f64>,
}

/// The record key a reconciliation seed is persisted under.
#[must_use]
pub fn seeded_marker_id(external_id: &str) -> String {
    RecordId::new(PLACE_TABLE, external_id).to_string()
}

/// Decodes a store document into a [`Marker`].
///
/// Malformed documents (non-point geometry) are rejected with a log line
/// rather than propagated into the reducer. When `center` is given and the
/// document carries no distance, it is derived client-side.
pub(crate) fn marker_from_doc(doc: PlaceDoc, center: Option<GeoPoint>) -> Option<Marker> {
    let Geometry::Point(point) = doc.coordinates else {
        warn!(id = %doc.id, "Rejecting place record with non-point geometry");
        return None;
    };
    let coordinates = GeoPoint::new(point.y(), point.x());

    let distance =
        doc.distance.or_else(|| center.map(|center| center.distance_m(&coordinates)));

    Some(Marker {
        id: doc.id.to_string(),
        external_id: doc.external_id,
        coordinates,
        name: doc.name,
        vicinity: doc.vicinity,
        tags: doc.tags.into_iter().collect(),
        distance,
        is_new: false,
    })
}

/// Builds the in-memory marker for a previously unseen external result.
///
/// Tags start empty; the id is the record key the seed upsert will use, so
/// the in-memory entry and the persisted document converge on one identity.
#[must_use]
pub fn marker_from_external(place: &ExternalPlace, center: GeoPoint) -> Marker {
    Marker {
        id: seeded_marker_id(&place.id),
        external_id: Some(place.id.clone()),
        coordinates: place.location,
        name: place.name.clone(),
        vicinity: place.vicinity.clone(),
        tags: std::collections::BTreeSet::new(),
        distance: Some(center.distance_m(&place.location)),
        is_new: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_id_uses_external_identity_as_record_key() {
        let id = seeded_marker_id("ext-42");
        assert!(id.starts_with("place:"));
        assert!(id.contains("ext-42"));
        // Re-seeding the same external identity yields the same key.
        assert_eq!(id, seeded_marker_id("ext-42"));
    }

    #[test]
    fn external_markers_start_with_empty_tags() {
        let place = ExternalPlace {
            id: "ext-1".to_owned(),
            name: "Corner Cafe".to_owned(),
            vicinity: "5 High St".to_owned(),
            location: GeoPoint::new(50.0, 30.0),
        };
        let center = GeoPoint::new(50.001, 30.0);

        let marker = marker_from_external(&place, center);
        assert!(marker.tags.is_empty());
        assert!(!marker.is_new);
        assert_eq!(marker.external_id.as_deref(), Some("ext-1"));
        assert!(marker.distance.is_some_and(|d| d > 0.0));
    }
}
