use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A dietary restriction or preference the user can select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietaryCondition {
    /// Unique identity (store path), e.g. `condition:vegan`.
    pub path: String,
    /// Label used for tag matching, e.g. `Vegan`.
    pub name: String,
}

/// A food category from the reference catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodCategory {
    pub path: String,
    pub name: String,
}

/// The user's currently selected dietary conditions.
///
/// Owned by the surrounding UI and handed to the core by reference for each
/// evaluation; the core never mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    conditions: Vec<DietaryCondition>,
}

impl Profile {
    #[must_use]
    pub fn new(conditions: Vec<DietaryCondition>) -> Self {
        Self { conditions }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &DietaryCondition> {
        self.conditions.iter()
    }

    /// Whether any selected condition name appears in `tags`.
    #[must_use]
    pub fn intersects(&self, tags: &BTreeSet<String>) -> bool {
        self.conditions.iter().any(|condition| tags.contains(&condition.name))
    }
}

impl FromIterator<DietaryCondition> for Profile {
    fn from_iter<I: IntoIterator<Item = DietaryCondition>>(iter: I) -> Self {
        Self { conditions: iter.into_iter().collect() }
    }
}
