//! Common error types used throughout smartmedia.
//!
//! The variants mirror how each failure is handled by the conversion batches:
//! duplicates are swallowed, remote failures are mapped to an ERROR status,
//! and database failures abort the batch.

/// Common error type for smartmedia.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested record was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A record with the same unique key already exists.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// The remote dispatch interface rejected or failed an upload.
    #[error("Remote dispatch failed: {0}")]
    RemoteDispatch(String),

    /// A result artifact could not be listed or downloaded.
    #[error("Remote fetch failed: {0}")]
    RemoteFetch(String),

    /// A pricing tier has no usable price for the region.
    #[error("Invalid {tier} pricing for region {region}")]
    InvalidPricing {
        /// The pricing tier that was requested.
        tier: String,
        /// The region the catalog belongs to.
        region: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Duplicate error.
    pub fn duplicate<S: Into<String>>(msg: S) -> Self {
        Self::Duplicate(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new RemoteDispatch error.
    pub fn remote_dispatch<S: Into<String>>(msg: S) -> Self {
        Self::RemoteDispatch(msg.into())
    }

    /// Create a new RemoteFetch error.
    pub fn remote_fetch<S: Into<String>>(msg: S) -> Self {
        Self::RemoteFetch(msg.into())
    }

    /// Create a new InvalidPricing error.
    pub fn invalid_pricing(tier: impl Into<String>, region: impl Into<String>) -> Self {
        Self::InvalidPricing {
            tier: tier.into(),
            region: region.into(),
        }
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns `true` for failures of a remote collaborator call.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteDispatch(_) | Self::RemoteFetch(_))
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
