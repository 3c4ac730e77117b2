//! A sandboxed storage engine for durable client-local data.
//! It provides a secure abstraction over the filesystem with built-in protections against common
//! I/O pitfalls and security vulnerabilities. All examples use temporary directories to avoid
//! writing to the real filesystem.
//!
//! # Core Features
//!
//! - **Sandbox Security**: Strict path traversal protection using physical path canonicalization.
//! - **Atomic Writes**: Uses an "atomic swap" pattern (unique temp write + `fsync` + `rename`) to prevent data corruption during crashes.
//! - **Transparent Compression**: Integrated LZ4 block compression that is invisible to the consumer.
//! - **Namespacing**: Logical data partitioning for grouped snapshots.
//! - **Self-Healing**: Automatically identifies and cleans up orphaned temporary files during initialization.
//!
//! # Architectural Overview
//!
//! The crate follows a layered approach:
//! 1.  **[`Storage`]**: The primary thread-safe handle and entry point.
//! 2.  **[`NamespacedStorage`]**: A scoped view for grouped data.
//! 3.  **[`StorageBuilder`]**: A type-safe fluent builder for configuration.
//!
//! # Examples
//!
//! ```rust
//! use nosh_storage::{Storage, Compression, StorageError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     // Use a temp directory for examples/tests
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("data");
//!     let storage = Storage::builder()
//!         .root(&root)
//!         .create(true)
//!         .compression(Compression::Lz4)
//!         .connect()
//!         .await?;
//!
//!     // Write data atomically
//!     storage.write("markers.json", b"[]").await?;
//!
//!     // Read data (automatically decompressed)
//!     let data = storage.read("markers.json").await?;
//!     assert_eq!(data, b"[]");
//!
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod namespace;
mod security;

pub use builder::StorageBuilder;
pub use engine::{Compression, Storage};
pub use error::{StorageError, StorageErrorExt};
pub use namespace::NamespacedStorage;
