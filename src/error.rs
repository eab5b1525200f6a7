//! Crate-wide error handling.

use std::io;

/// Abstraction over every error this crate can surface, so call sites can use `?`
/// uniformly across the router, use-case, transport, and CLI layers.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The router could not fulfil an acquire: the owner is not registered, or
    /// (for `AcquireRandom`) no eligible peer exists.
    #[error("relayer unavailable")]
    RelayerUnavailable,

    /// A sink send or stream read/write failed at the transport layer.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// Envelope bytes did not decode into a known variant.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The owning task's cancellation token was tripped.
    #[error("cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RelayError>;
