//! Facade crate for Nosh features and shared modules.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Add `nosh` with the desired feature flags (`server`/`client`).
//! - Call `nosh::init` (server) to register feature slices; extend as new slices appear.

#[cfg(feature = "server")]
use nosh_database::Database;
pub use nosh_domain as domain;
#[cfg(feature = "server")]
use nosh_domain::config::ApiConfig;
#[cfg(feature = "server")]
use nosh_event_bus::EventBus;
pub use nosh_kernel as kernel;
#[cfg(feature = "server")]
use nosh_kernel::snapshot::{SnapshotCache, StorageKeyValue};
#[cfg(feature = "server")]
use nosh_storage::Storage;

#[cfg(feature = "server")]
pub mod server {
    pub mod router {
        pub use nosh_kernel::server::router::system_router;
        pub use nosh_places::location_router;
    }
}

/// Feature registry for runtime introspection.
pub mod features {
    pub use nosh_places as places;
    pub use nosh_reference as reference;

    /// Build-time enabled features (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        #[cfg(feature = "server")]
        "server",
        #[cfg(feature = "client")]
        "client",
        "places",
        "reference",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

/// Initialize all enabled features for server mode.
///
/// # Errors
/// Returns an error if any feature initialization fails.
#[cfg(feature = "server")]
pub async fn init(
    config: &ApiConfig,
    database: &Database,
    events: &EventBus,
    storage: &Storage,
) -> Result<Vec<domain::registry::InitializedSlice>, Box<dyn std::error::Error>> {
    let mut slices = Vec::new();

    // Places
    slices.push(features::places::init(config, database)?);

    // Reference data (categories + dietary conditions)
    let reference_kv = StorageKeyValue::new(storage.namespace("reference")?);
    let reference_cache = SnapshotCache::new(std::sync::Arc::new(reference_kv));
    slices.push(features::reference::init(database, reference_cache, events).await?);

    Ok(slices)
}
