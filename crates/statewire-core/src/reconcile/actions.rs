// ── Action derivation ──
//
// Fixed per-status action sets. A locked record yields no actions
// regardless of status, and unmapped statuses yield none rather than
// failing.

use serde::{Deserialize, Serialize};

use super::Status;

/// What invoking an action asks the collaborator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Connect,
    Disconnect,
    RetryConnect,
    CancelConnection,
    RetryDisconnect,
    EditConnection,
    Delete,
}

/// One action the UI may offer for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub label: String,
    pub effect: Effect,
    pub is_dangerous: bool,
}

impl Action {
    fn safe(label: &str, effect: Effect) -> Self {
        Self {
            label: label.to_owned(),
            effect,
            is_dangerous: false,
        }
    }

    fn dangerous(label: &str, effect: Effect) -> Self {
        Self {
            label: label.to_owned(),
            effect,
            is_dangerous: true,
        }
    }
}

/// Ordered action list for a record with `status`.
pub fn actions_for(status: Status, locked: bool) -> Vec<Action> {
    if locked {
        return Vec::new();
    }
    match status {
        Status::Connected => vec![
            Action::dangerous("Disconnect", Effect::Disconnect),
            Action::safe("Edit connection", Effect::EditConnection),
        ],
        Status::ConnectionFailed => vec![
            Action::safe("Retry connection", Effect::RetryConnect),
            Action::dangerous("Cancel connection", Effect::CancelConnection),
        ],
        Status::Disconnected => vec![Action::safe("Connect", Effect::Connect)],
        Status::DisconnectionFailed => {
            vec![Action::dangerous("Retry disconnection", Effect::RetryDisconnect)]
        }
        Status::Missing => vec![Action::dangerous("Delete", Effect::Delete)],
        Status::ConnectedBySystem | Status::DisconnectedBySystem | Status::Unknown => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_records_get_no_actions_regardless_of_status() {
        for status in [
            Status::Connected,
            Status::ConnectionFailed,
            Status::Disconnected,
            Status::DisconnectionFailed,
            Status::Missing,
            Status::ConnectedBySystem,
            Status::DisconnectedBySystem,
            Status::Unknown,
        ] {
            assert!(actions_for(status, true).is_empty(), "{status} leaked actions");
        }
    }

    #[test]
    fn connected_offers_disconnect_then_edit() {
        let actions = actions_for(Status::Connected, false);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].label, "Disconnect");
        assert!(actions[0].is_dangerous);
        assert_eq!(actions[1].label, "Edit connection");
        assert!(!actions[1].is_dangerous);
    }

    #[test]
    fn connection_failed_offers_retry_then_cancel() {
        let actions = actions_for(Status::ConnectionFailed, false);
        assert_eq!(
            actions,
            vec![
                Action::safe("Retry connection", Effect::RetryConnect),
                Action::dangerous("Cancel connection", Effect::CancelConnection),
            ]
        );
    }

    #[test]
    fn system_managed_and_unknown_statuses_offer_nothing() {
        for status in [
            Status::ConnectedBySystem,
            Status::DisconnectedBySystem,
            Status::Unknown,
        ] {
            assert!(actions_for(status, false).is_empty());
        }
    }
}
