use nosh_domain::geo::GeoPoint;
use nosh_domain::marker::{Marker, MarkerPatch};
use nosh_places::reducer::{MarkerAction, MarkerMap, MergePolicy, reduce};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn marker(id: String, name: String) -> Marker {
    Marker {
        id,
        external_id: None,
        coordinates: GeoPoint::new(10.0, 20.0),
        name,
        vicinity: String::new(),
        tags: BTreeSet::new(),
        distance: None,
        is_new: false,
    }
}

fn arb_id() -> impl Strategy<Value = String> {
    // A small id space so actions collide often.
    prop_oneof![Just("a"), Just("b"), Just("c"), Just("d")].prop_map(str::to_owned)
}

fn arb_action() -> impl Strategy<Value = MarkerAction> {
    prop_oneof![
        (arb_id(), "[a-z]{1,8}").prop_map(|(id, name)| MarkerAction::AddMarker(marker(id, name))),
        prop::collection::vec((arb_id(), "[a-z]{1,8}"), 0..4).prop_map(|entries| {
            MarkerAction::AddMarkers(
                entries.into_iter().map(|(id, name)| marker(id, name)).collect(),
            )
        }),
        (arb_id(), "[a-z]{1,8}").prop_map(|(id, name)| MarkerAction::UpdateMarker {
            id,
            patch: MarkerPatch { name: Some(name), ..MarkerPatch::default() },
        }),
        arb_id().prop_map(MarkerAction::DeleteMarker),
        Just(MarkerAction::Reset),
    ]
}

proptest! {
    /// Every entry's key equals its marker id, for any action sequence.
    #[test]
    fn keys_always_match_marker_ids(actions in prop::collection::vec(arb_action(), 0..32)) {
        let mut state = MarkerMap::default();
        for action in actions {
            state = reduce(&state, action, MergePolicy::KeepExisting);
            for (key, marker) in &state {
                prop_assert_eq!(key, &marker.id);
            }
        }
    }

    /// The reducer never mutates its input state.
    #[test]
    fn reduce_is_pure(
        seed in prop::collection::vec((arb_id(), "[a-z]{1,8}"), 0..4),
        action in arb_action(),
    ) {
        let state = reduce(
            &MarkerMap::default(),
            MarkerAction::AddMarkers(seed.into_iter().map(|(id, name)| marker(id, name)).collect()),
            MergePolicy::KeepExisting,
        );
        let before = state.clone();

        let _ = reduce(&state, action, MergePolicy::KeepExisting);
        prop_assert_eq!(state, before);
    }

    /// Applying the same update twice equals applying it once.
    #[test]
    fn update_is_idempotent(
        id in arb_id(),
        name in "[a-z]{1,8}",
        patch_name in "[a-z]{1,8}",
    ) {
        let state = reduce(
            &MarkerMap::default(),
            MarkerAction::AddMarker(marker(id.clone(), name)),
            MergePolicy::KeepExisting,
        );

        let patch = MarkerPatch { name: Some(patch_name), ..MarkerPatch::default() };
        let once = reduce(
            &state,
            MarkerAction::UpdateMarker { id: id.clone(), patch: patch.clone() },
            MergePolicy::KeepExisting,
        );
        let twice = reduce(
            &once,
            MarkerAction::UpdateMarker { id, patch },
            MergePolicy::KeepExisting,
        );

        prop_assert_eq!(once, twice);
    }

    /// Reset always clears the map, whatever came before.
    #[test]
    fn reset_always_empties(actions in prop::collection::vec(arb_action(), 0..16)) {
        let mut state = MarkerMap::default();
        for action in actions {
            state = reduce(&state, action, MergePolicy::KeepExisting);
        }
        let cleared = reduce(&state, MarkerAction::Reset, MergePolicy::KeepExisting);
        prop_assert!(cleared.is_empty());
    }
}
