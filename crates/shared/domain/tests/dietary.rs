use nosh_domain::dietary::{DietaryCondition, Profile};
use std::collections::BTreeSet;

fn condition(name: &str) -> DietaryCondition {
    DietaryCondition { path: format!("condition:{}", name.to_lowercase()), name: name.to_owned() }
}

#[test]
fn empty_profile_matches_nothing() {
    let profile = Profile::default();
    assert!(profile.is_empty());
    assert!(!profile.intersects(&BTreeSet::from(["Vegan".to_owned()])));
}

#[test]
fn intersects_by_condition_name() {
    let profile: Profile = [condition("Vegan")].into_iter().collect();

    assert!(profile.intersects(&BTreeSet::from(["Vegan".to_owned(), "Halal".to_owned()])));
    assert!(!profile.intersects(&BTreeSet::from(["Kosher".to_owned()])));
    assert!(!profile.intersects(&BTreeSet::new()));
}
