//! Dietary predicate over markers.

use nosh_domain::dietary::Profile;
use nosh_domain::marker::Marker;

/// Non-mutating membership test of a marker against the user's profile.
///
/// A marker passes when the profile is empty, when it is an unsaved
/// client-local marker, or when its tags intersect the selected condition
/// names.
#[must_use]
pub fn matches(marker: &Marker, profile: &Profile) -> bool {
    profile.is_empty() || marker.is_new || profile.intersects(&marker.tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nosh_domain::dietary::DietaryCondition;
    use nosh_domain::geo::GeoPoint;
    use std::collections::BTreeSet;

    fn marker(tags: &[&str], is_new: bool) -> Marker {
        Marker {
            id: "m".to_owned(),
            external_id: None,
            coordinates: GeoPoint::new(0.0, 0.0),
            name: "Venue".to_owned(),
            vicinity: String::new(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect::<BTreeSet<_>>(),
            distance: None,
            is_new,
        }
    }

    fn vegan_profile() -> Profile {
        [DietaryCondition { path: "condition:vegan".to_owned(), name: "Vegan".to_owned() }]
            .into_iter()
            .collect()
    }

    #[test]
    fn empty_profile_matches_all() {
        assert!(matches(&marker(&[], false), &Profile::default()));
        assert!(matches(&marker(&["Halal"], false), &Profile::default()));
    }

    #[test]
    fn tag_intersection_passes() {
        assert!(matches(&marker(&["Vegan", "Halal"], false), &vegan_profile()));
    }

    #[test]
    fn untagged_marker_is_excluded() {
        assert!(!matches(&marker(&[], false), &vegan_profile()));
        assert!(!matches(&marker(&["Kosher"], false), &vegan_profile()));
    }

    #[test]
    fn unsaved_marker_always_passes() {
        assert!(matches(&marker(&[], true), &vegan_profile()));
    }
}
