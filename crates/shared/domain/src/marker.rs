use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A venue marker as held by the in-memory state machine.
///
/// `id` is the canonical key: the store record key once persisted, or a
/// synthetic client-local id for unsaved (`is_new`) entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: String,
    /// Identity assigned by the third-party places catalog, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub coordinates: GeoPoint,
    pub name: String,
    pub vicinity: String,
    /// Dietary tag labels. Insertion order is irrelevant.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Derived distance from the query center, meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// True only for client-created markers that were never persisted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_new: bool,
}

impl Marker {
    /// Replaces the patched fields, leaving identity untouched.
    ///
    /// Applying the same patch twice yields the same marker as applying it once.
    pub fn apply(&mut self, patch: &MarkerPatch) {
        if let Some(coordinates) = patch.coordinates {
            self.coordinates = coordinates;
        }
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(vicinity) = &patch.vicinity {
            self.vicinity.clone_from(vicinity);
        }
        if let Some(tags) = &patch.tags {
            self.tags.clone_from(tags);
        }
        if let Some(distance) = patch.distance {
            self.distance = Some(distance);
        }
    }
}

/// A partial update for a [`Marker`]. Absent fields are left as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vicinity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl MarkerPatch {
    /// A patch that only replaces the tag set.
    #[must_use]
    pub fn tags(tags: BTreeSet<String>) -> Self {
        Self { tags: Some(tags), ..Self::default() }
    }
}

/// What happened to a document on the authoritative store's change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Added,
    Modified,
    Removed,
}

/// One change-feed delivery, scoped to a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub action: ChangeAction,
    pub id: String,
    /// The document body; absent for removals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Marker>,
}
