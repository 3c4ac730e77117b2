use std::borrow::Cow;

/// A specialized [`PlacesError`] enum of this crate.
#[nosh_derive::nosh_error]
pub enum PlacesError {
    /// The third-party provider rejected or failed the search call.
    #[error("Places provider error{}: {message}", format_context(.context))]
    Provider { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Transport-level failure talking to the provider.
    #[error("Provider transport error{}: {source}", format_context(.context))]
    Http {
        #[source]
        source: reqwest::Error,
        context: Option<Cow<'static, str>>,
    },

    /// The authoritative store rejected a query or write.
    #[error("Marker store error{}: {source}", format_context(.context))]
    Store {
        #[source]
        source: surrealdb::Error,
        context: Option<Cow<'static, str>>,
    },

    /// A store document failed boundary decoding.
    #[error("Malformed store record{}: {message}", format_context(.context))]
    Decode { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The change feed could not be established.
    #[error("Change feed error{}: {message}", format_context(.context))]
    Feed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal places error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
