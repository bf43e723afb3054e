//! Wire events delivered over the management-service event channel.
//!
//! Every frame is one self-describing JSON object tagged by `type`.
//! The set of variants is closed on purpose: consumers pattern-match
//! exhaustively instead of probing an open-ended map for optional keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed event frame from the management service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireEvent {
    /// Properties of one resource changed on the remote object bus.
    PropertiesChanged(ChangeNotification),
    /// A named signal was emitted on the remote object bus.
    Signal(SignalNotification),
}

/// A "properties changed" notification for a single (path, interface)
/// pair. Ephemeral: produced by the transport, consumed by proxy-layer
/// subscribers, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification {
    /// Object path of the resource that changed.
    pub path: String,
    /// Interface the changed properties belong to.
    pub interface: String,
    /// Property name → new value.
    #[serde(default)]
    pub changed_properties: serde_json::Map<String, Value>,
    /// Properties whose value is no longer known and must be re-read.
    #[serde(default)]
    pub invalidated_properties: Vec<String>,
}

/// A named occurrence emitted by the remote object bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalNotification {
    pub interface: String,
    pub path: String,
    pub member: String,
    #[serde(default)]
    pub args: Vec<Value>,
}
