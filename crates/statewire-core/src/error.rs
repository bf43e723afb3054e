// ── Core error types ──
//
// User-facing errors from statewire-core. Consumers never see raw
// transport failures: transient socket and proxy errors are recovered
// locally (retry / absent result) and only the terminal cases surface
// here. The `From<statewire_api::Error>` impl translates what is left.

use thiserror::Error;

use crate::model::Source;

/// Error type shared across the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A record in one of the input collections lacks a primary-key
    /// field. Fatal for the whole reconciliation run; previously
    /// published output stays untouched.
    #[error("Record from {collection} source is missing primary-key field '{field}'")]
    MissingKeyField { collection: Source, field: String },

    /// The event channel exhausted its reconnection attempt cap.
    #[error("Connection to the management service cannot be recovered")]
    TransportUnrecoverable,

    /// The management service (or one of its objects) is not reachable
    /// right now. Retryable.
    #[error("Management service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The backend reported a login result code outside the known set.
    #[error("Unknown login result code: {0}")]
    UnknownLoginCode(u32),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<statewire_api::Error> for CoreError {
    fn from(err: statewire_api::Error) -> Self {
        match err {
            statewire_api::Error::WebSocketConnect(reason) => CoreError::ServiceUnavailable {
                message: reason,
            },
            statewire_api::Error::ProxyUnavailable { interface, path } => {
                CoreError::ServiceUnavailable {
                    message: format!("no proxy for {interface} at {path}"),
                }
            }
            statewire_api::Error::InvalidUrl(e) => CoreError::Config {
                message: e.to_string(),
            },
            statewire_api::Error::Deserialization(e) => CoreError::Serialization(e),
        }
    }
}
