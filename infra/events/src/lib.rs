//! # Event Bus
//!
//! A type-safe, asynchronous event bus designed for vertical slice
//! architectures.
//!
//! ## Overview
//!
//! Provides a centralized `EventBus` with two channel kinds (`broadcast`,
//! `watch`) to connect decoupled components. Uses `tokio` primitives with
//! minimal overhead.
//!
//! ## Features
//!
//! * **Type-Safe**: Events are identified by their Rust type.
//! * **Channel choice**: Broadcast (fan-out) or Watch (the latest value).
//! * **High Performance**: `FxHashMap` + `parking_lot::RwLock`.
//! * **Vertical Slice Friendly**: Share a single bus across slices.
//!
//! # Example
//!
//! ```rust
//! use nosh_event_bus::{EventBus, EventReceiverExt, EventBusError};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct MarkersChanged { count: usize }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!
//!     let mut rx = bus.subscribe::<MarkersChanged>()?;
//!     bus.publish(MarkersChanged { count: 3 })?;
//!
//!     if let Ok(event) = rx.recv().await {
//!         assert_eq!(event.count, 3);
//!     }
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod receiver;

pub use bus::{ChannelKind, Event, EventBus};
pub use error::{EventBusError, EventBusErrorExt};
pub use receiver::EventReceiverExt;
