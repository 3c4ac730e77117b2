use std::borrow::Cow;

/// A specialized [`EventBusError`] enum of this crate.
#[nosh_derive::nosh_error]
pub enum EventBusError {
    /// A channel for this event type already exists with a different kind.
    #[error("Channel kind mismatch{}: {message}", format_context(.context))]
    ChannelKindMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The stored sender could not be downcast to the requested event type.
    #[error("Channel type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Zero or otherwise unusable channel capacity.
    #[error("Invalid channel capacity{}: {message}", format_context(.context))]
    InvalidCapacity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
