use std::borrow::Cow;

/// A specialized [`ReferenceError`] enum of this crate.
#[nosh_derive::nosh_error]
pub enum ReferenceError {
    /// The reference store rejected a query.
    #[error("Reference store error{}: {source}", format_context(.context))]
    Store {
        #[source]
        source: surrealdb::Error,
        context: Option<Cow<'static, str>>,
    },

    /// The change feed could not be established.
    #[error("Reference feed error{}: {message}", format_context(.context))]
    Feed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal reference error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
