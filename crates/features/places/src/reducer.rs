//! Pure marker state machine.
//!
//! The reducer never mutates its input; every dispatch returns a fresh
//! mapping. `id` is the only key, and it stays unique across any action
//! sequence.

use fxhash::FxHashMap;
use nosh_domain::marker::{Marker, MarkerPatch};

/// The canonical in-memory marker mapping for one query epoch.
pub type MarkerMap = FxHashMap<String, Marker>;

/// How ADD-class actions treat an already-present id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// A repeated add is a no-op. Guards the batch-vs-feed double-delivery
    /// race on the general marker map.
    #[default]
    KeepExisting,
    /// Newest wins. For collections where a repeated add carries fresher data.
    Replace,
}

/// One dispatched state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerAction {
    /// Appends all batch entries not already present by id.
    AddMarkers(Vec<Marker>),
    /// Appends a single marker, subject to the merge policy.
    AddMarker(Marker),
    /// Replaces the existing entry's fields with the patch. Idempotent;
    /// unknown ids are ignored.
    UpdateMarker { id: String, patch: MarkerPatch },
    /// Removes the entry if present. Absent-key deletion is a no-op.
    DeleteMarker(String),
    /// Clears to empty. Issued whenever the query epoch changes.
    Reset,
}

/// Applies `action` to `state`, returning the next state.
#[must_use]
pub fn reduce(state: &MarkerMap, action: MarkerAction, policy: MergePolicy) -> MarkerMap {
    match action {
        MarkerAction::AddMarkers(batch) => {
            let mut next = state.clone();
            for marker in batch {
                insert(&mut next, marker, policy);
            }
            next
        },
        MarkerAction::AddMarker(marker) => {
            let mut next = state.clone();
            insert(&mut next, marker, policy);
            next
        },
        MarkerAction::UpdateMarker { id, patch } => {
            let mut next = state.clone();
            if let Some(existing) = next.get_mut(&id) {
                existing.apply(&patch);
            }
            next
        },
        MarkerAction::DeleteMarker(id) => {
            let mut next = state.clone();
            next.remove(&id);
            next
        },
        MarkerAction::Reset => MarkerMap::default(),
    }
}

fn insert(state: &mut MarkerMap, marker: Marker, policy: MergePolicy) {
    match policy {
        MergePolicy::KeepExisting => {
            state.entry(marker.id.clone()).or_insert(marker);
        },
        MergePolicy::Replace => {
            state.insert(marker.id.clone(), marker);
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nosh_domain::geo::GeoPoint;
    use std::collections::BTreeSet;

    fn marker(id: &str, name: &str) -> Marker {
        Marker {
            id: id.to_owned(),
            external_id: None,
            coordinates: GeoPoint::new(1.0, 2.0),
            name: name.to_owned(),
            vicinity: String::new(),
            tags: BTreeSet::new(),
            distance: None,
            is_new: false,
        }
    }

    #[test]
    fn add_markers_skips_present_ids() {
        let state = reduce(
            &MarkerMap::default(),
            MarkerAction::AddMarkers(vec![marker("a", "one"), marker("b", "two")]),
            MergePolicy::KeepExisting,
        );
        assert_eq!(state.len(), 2);

        let next = reduce(
            &state,
            MarkerAction::AddMarkers(vec![marker("b", "replaced"), marker("c", "three")]),
            MergePolicy::KeepExisting,
        );
        assert_eq!(next.len(), 3);
        assert_eq!(next["b"].name, "two", "existing entry must not be replaced");
    }

    #[test]
    fn repeated_add_is_a_noop() {
        let state = reduce(
            &MarkerMap::default(),
            MarkerAction::AddMarker(marker("a", "original")),
            MergePolicy::KeepExisting,
        );
        let next = reduce(
            &state,
            MarkerAction::AddMarker(marker("a", "duplicate")),
            MergePolicy::KeepExisting,
        );

        assert_eq!(next.len(), 1);
        assert_eq!(next["a"].name, "original");
    }

    #[test]
    fn replace_policy_prefers_newest() {
        let state = reduce(
            &MarkerMap::default(),
            MarkerAction::AddMarker(marker("a", "original")),
            MergePolicy::Replace,
        );
        let next = reduce(
            &state,
            MarkerAction::AddMarker(marker("a", "fresher")),
            MergePolicy::Replace,
        );

        assert_eq!(next["a"].name, "fresher");
    }

    #[test]
    fn update_is_idempotent() {
        let state = reduce(
            &MarkerMap::default(),
            MarkerAction::AddMarker(marker("a", "original")),
            MergePolicy::KeepExisting,
        );

        let patch = MarkerPatch { name: Some("patched".to_owned()), ..MarkerPatch::default() };
        let once = reduce(
            &state,
            MarkerAction::UpdateMarker { id: "a".to_owned(), patch: patch.clone() },
            MergePolicy::KeepExisting,
        );
        let twice = reduce(
            &once,
            MarkerAction::UpdateMarker { id: "a".to_owned(), patch },
            MergePolicy::KeepExisting,
        );

        assert_eq!(once, twice);
        assert_eq!(once["a"].name, "patched");
    }

    #[test]
    fn update_of_unknown_id_is_ignored() {
        let state = reduce(
            &MarkerMap::default(),
            MarkerAction::UpdateMarker {
                id: "ghost".to_owned(),
                patch: MarkerPatch { name: Some("boo".to_owned()), ..MarkerPatch::default() },
            },
            MergePolicy::KeepExisting,
        );
        assert!(state.is_empty());
    }

    #[test]
    fn delete_absent_key_is_a_noop() {
        let state = reduce(
            &MarkerMap::default(),
            MarkerAction::AddMarker(marker("a", "one")),
            MergePolicy::KeepExisting,
        );
        let next =
            reduce(&state, MarkerAction::DeleteMarker("nope".to_owned()), MergePolicy::KeepExisting);
        assert_eq!(next.len(), 1);

        let gone =
            reduce(&next, MarkerAction::DeleteMarker("a".to_owned()), MergePolicy::KeepExisting);
        assert!(gone.is_empty());
    }

    #[test]
    fn reset_clears_everything() {
        let state = reduce(
            &MarkerMap::default(),
            MarkerAction::AddMarkers(vec![marker("a", "one"), marker("b", "two")]),
            MergePolicy::KeepExisting,
        );
        let next = reduce(&state, MarkerAction::Reset, MergePolicy::KeepExisting);
        assert!(next.is_empty());
        // Purity: the input state is untouched.
        assert_eq!(state.len(), 2);
    }
}
