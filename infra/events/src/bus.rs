use crate::error::EventBusError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::trace;

/// A safe default for channel buffers.
/// 128 is usually enough for domain events in a vertical slice.
const DEFAULT_CAPACITY: usize = 128;

/// Supported channel kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Broadcast (fan-out) semantics.
    Broadcast,
    /// Watch (latest-value) semantics.
    Watch,
}

/// Marker trait for types that can be sent across the [`EventBus`].
///
/// Any type that is `Send + Sync + 'static` automatically implements this trait.
pub trait Event: Any + Send + Sync + 'static {}
impl<T: Any + Send + Sync + 'static> Event for T {}

struct ChannelState {
    kind: ChannelKind,
    sender: Box<dyn Any + Send + Sync>,
}

/// A thread-safe event bus managing one channel per event type.
///
/// Channels are indexed by the [`TypeId`] of the event.
#[derive(Clone, Default)]
pub struct EventBus {
    channels: Arc<RwLock<FxHashMap<TypeId, ChannelState>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("channels", &self.channels.read().len()).finish()
    }
}

impl EventBus {
    /// Creates a new, empty `EventBus`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to an event of type `T` using broadcast with default capacity.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a watch channel
    /// was already registered for `T`.
    ///
    /// # Examples
    /// ```rust
    /// use nosh_event_bus::{EventBus, EventReceiverExt};
    ///
    /// #[derive(Clone, Debug, PartialEq)]
    /// struct EpochStarted(u64);
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), nosh_event_bus::EventBusError> {
    /// let bus = EventBus::new();
    /// let mut rx = bus.subscribe::<EpochStarted>()?;
    /// bus.publish(EpochStarted(1))?;
    /// assert_eq!(rx.recv().await.unwrap().0, 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe<T: Event>(&self) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        self.subscribe_with_capacity::<T>(DEFAULT_CAPACITY)
    }

    /// Subscribes to an event of type `T` with a specific broadcast buffer capacity.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a watch channel was
    /// already registered for `T`, or [`EventBusError::InvalidCapacity`] if
    /// `capacity` is zero.
    pub fn subscribe_with_capacity<T: Event>(
        &self,
        capacity: usize,
    ) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        if capacity == 0 {
            return Err(EventBusError::InvalidCapacity {
                message: "capacity must be >= 1".into(),
                context: Some(std::any::type_name::<T>().into()),
            });
        }
        self.with_broadcast::<T, _>(capacity, |tx| tx.subscribe())
    }

    /// Subscribe to a watch channel (latest-value semantics). Initializes with the provided value if absent.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a broadcast channel
    /// was already registered for `T`.
    pub fn subscribe_watch<T: Event>(
        &self,
        initial: T,
    ) -> Result<watch::Receiver<Arc<T>>, EventBusError> {
        self.with_watch::<T, _>(Arc::new(initial), |tx| tx.subscribe())
    }

    /// Publishes a shared event instance via broadcast.
    ///
    /// Returns the number of receivers that observed the event; an event with
    /// no subscribers is dropped silently.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a watch channel
    /// was already registered for `T`.
    pub fn publish<T: Event>(&self, event: T) -> Result<usize, EventBusError> {
        self.publish_arc(Arc::new(event))
    }

    /// Publishes a shared event instance via broadcast without re-wrapping.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a watch channel
    /// was already registered for `T`.
    pub fn publish_arc<T: Event>(&self, event: Arc<T>) -> Result<usize, EventBusError> {
        let delivered =
            self.with_broadcast::<T, _>(DEFAULT_CAPACITY, |tx| tx.send(event).unwrap_or(0))?;
        trace!(event = std::any::type_name::<T>(), delivered, "Event dispatched");
        Ok(delivered)
    }

    /// Publishes to a watch channel (latest-value semantics). Creates a channel if missing.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if a broadcast channel
    /// was already registered for `T`.
    pub fn publish_watch<T: Event>(&self, event: T) -> Result<(), EventBusError> {
        let arc = Arc::new(event);
        self.with_watch::<T, _>(arc.clone(), |tx| tx.send_replace(arc))?;
        Ok(())
    }

    /// Gracefully shuts down the bus by dropping all underlying channels.
    ///
    /// Returns the number of event channels that were closed.
    #[must_use]
    pub fn shutdown(&self) -> usize {
        let mut channels = self.channels.write();
        let count = channels.len();
        channels.clear();
        count
    }

    /// Runs `f` against the broadcast sender for `T`, creating the channel on first use.
    fn with_broadcast<T: Event, R>(
        &self,
        capacity: usize,
        f: impl FnOnce(&broadcast::Sender<Arc<T>>) -> R,
    ) -> Result<R, EventBusError> {
        let mut channels = self.channels.write();
        let state = channels.entry(TypeId::of::<T>()).or_insert_with(|| {
            trace!(event = std::any::type_name::<T>(), capacity, "Initializing broadcast channel");
            let (tx, _) = broadcast::channel::<Arc<T>>(capacity);
            ChannelState { kind: ChannelKind::Broadcast, sender: Box::new(tx) }
        });

        if state.kind != ChannelKind::Broadcast {
            return Err(kind_mismatch::<T>(ChannelKind::Broadcast, state.kind));
        }

        let sender = state
            .sender
            .downcast_ref::<broadcast::Sender<Arc<T>>>()
            .ok_or_else(type_mismatch::<T>)?;
        Ok(f(sender))
    }

    /// Runs `f` against the watch sender for `T`, creating the channel on first use.
    fn with_watch<T: Event, R>(
        &self,
        initial: Arc<T>,
        f: impl FnOnce(&watch::Sender<Arc<T>>) -> R,
    ) -> Result<R, EventBusError> {
        let mut channels = self.channels.write();
        let state = channels.entry(TypeId::of::<T>()).or_insert_with(|| {
            trace!(event = std::any::type_name::<T>(), "Initializing watch channel");
            let (tx, _) = watch::channel::<Arc<T>>(initial);
            ChannelState { kind: ChannelKind::Watch, sender: Box::new(tx) }
        });

        if state.kind != ChannelKind::Watch {
            return Err(kind_mismatch::<T>(ChannelKind::Watch, state.kind));
        }

        let sender =
            state.sender.downcast_ref::<watch::Sender<Arc<T>>>().ok_or_else(type_mismatch::<T>)?;
        Ok(f(sender))
    }
}

fn kind_mismatch<T>(expected: ChannelKind, found: ChannelKind) -> EventBusError {
    EventBusError::ChannelKindMismatch {
        message: format!("Expected {expected:?} but found {found:?} for {}", std::any::type_name::<T>())
            .into(),
        context: None,
    }
}

fn type_mismatch<T>() -> EventBusError {
    EventBusError::TypeMismatch {
        message: std::any::type_name::<T>().into(),
        context: Some("Unexpected event type".into()),
    }
}
