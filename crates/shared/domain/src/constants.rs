//! Shared string constants.

/// OpenAPI tag for system endpoints.
pub const SYSTEM_TAG: &str = "System";
/// OpenAPI tag for the location endpoints.
pub const LOCATION_TAG: &str = "Location";

/// Snapshot name for the persisted marker set.
pub const MARKERS_SNAPSHOT: &str = "markers";
/// Snapshot name for the food category catalog.
pub const CATEGORIES_SNAPSHOT: &str = "categories";
/// Snapshot name for the dietary condition catalog.
pub const CONDITIONS_SNAPSHOT: &str = "conditions";

/// Store table holding venue documents.
pub const PLACE_TABLE: &str = "place";
/// Store table holding food categories.
pub const CATEGORY_TABLE: &str = "category";
/// Store table holding dietary conditions.
pub const CONDITION_TABLE: &str = "condition";
