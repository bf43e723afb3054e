use thiserror::Error;

/// Top-level error type for the `statewire-api` crate.
///
/// Transient transport failures are retried internally by the
/// transport and never bubble out of it; these variants surface only
/// through `on_error` callbacks and from [`BusConnector`] backends.
///
/// [`BusConnector`]: crate::bus::BusConnector
#[derive(Debug, Error)]
pub enum Error {
    /// The event channel could not be established or dropped mid-read.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The remote side cannot produce a live proxy for an
    /// interface/path pair. Recoverable: callers treat the resource as
    /// temporarily unavailable and may retry.
    #[error("No proxy available for {interface} at {path}")]
    ProxyUnavailable { interface: String, path: String },

    /// JSON (de)serialization failed.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if this is a transient failure worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::WebSocketConnect(_) | Self::ProxyUnavailable { .. }
        )
    }
}
