// ── Target change monitor ──
//
// Watches the event channel for anything that makes a source stale and
// surfaces a coarse refresh hint. Re-fetching the collections is the
// caller's job; the monitor only says *which* side to re-fetch.

use std::sync::Arc;

use statewire_api::message::WireEvent;
use statewire_api::registry::{HandlerRegistry, Subscription};
use statewire_api::transport::Transport;

/// Root object of the storage service; its own properties carry the
/// declared configuration.
pub const STORAGE_IFACE: &str = "org.statewire.Storage1";
pub const STORAGE_PATH: &str = "/org/statewire/Storage1";

pub const INITIATOR_IFACE: &str = "org.statewire.Storage1.ISCSI.Initiator";
pub const NODE_IFACE: &str = "org.statewire.Storage1.ISCSI.Node";

/// Subtree holding one object per discovered or connected node.
pub const NODES_NAMESPACE: &str = "/org/statewire/Storage1/iscsi_nodes";

/// Which source a consumer should re-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshHint {
    Config,
    System,
}

/// Turns raw wire events into [`RefreshHint`]s.
pub struct TargetMonitor {
    hints: Arc<HandlerRegistry<RefreshHint>>,
    _wiring: Subscription,
}

impl TargetMonitor {
    pub fn attach(transport: &Transport) -> Self {
        let hints = Arc::new(HandlerRegistry::new());
        let wiring = {
            let hints = Arc::clone(&hints);
            transport.on_event(move |event| {
                if let Some(hint) = hint_for(event) {
                    tracing::trace!(?hint, "source went stale");
                    hints.emit(&hint);
                }
            })
        };
        Self {
            hints,
            _wiring: wiring,
        }
    }

    pub fn on_refresh(
        &self,
        handler: impl Fn(RefreshHint) + Send + Sync + 'static,
    ) -> Subscription {
        self.hints.subscribe(move |hint: &RefreshHint| handler(*hint))
    }
}

fn hint_for(event: &WireEvent) -> Option<RefreshHint> {
    match event {
        WireEvent::PropertiesChanged(change) => {
            if change.interface == NODE_IFACE || change.interface == INITIATOR_IFACE {
                Some(RefreshHint::System)
            } else if change.interface == STORAGE_IFACE {
                Some(RefreshHint::Config)
            } else {
                None
            }
        }
        WireEvent::Signal(signal) => (signal.interface == INITIATOR_IFACE
            || signal.path.starts_with(NODES_NAMESPACE))
        .then_some(RefreshHint::System),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statewire_api::message::{ChangeNotification, SignalNotification};

    fn change(path: &str, interface: &str) -> WireEvent {
        WireEvent::PropertiesChanged(ChangeNotification {
            path: path.to_owned(),
            interface: interface.to_owned(),
            changed_properties: serde_json::Map::new(),
            invalidated_properties: Vec::new(),
        })
    }

    fn signal(interface: &str, path: &str, member: &str) -> WireEvent {
        WireEvent::Signal(SignalNotification {
            interface: interface.to_owned(),
            path: path.to_owned(),
            member: member.to_owned(),
            args: Vec::new(),
        })
    }

    #[test]
    fn node_and_initiator_changes_stale_the_system_source() {
        let node = change("/org/statewire/Storage1/iscsi_nodes/1", NODE_IFACE);
        assert_eq!(hint_for(&node), Some(RefreshHint::System));

        let initiator = change(STORAGE_PATH, INITIATOR_IFACE);
        assert_eq!(hint_for(&initiator), Some(RefreshHint::System));
    }

    #[test]
    fn service_root_changes_stale_the_config_source() {
        let root = change(STORAGE_PATH, STORAGE_IFACE);
        assert_eq!(hint_for(&root), Some(RefreshHint::Config));
    }

    #[test]
    fn discovery_and_node_signals_stale_the_system_source() {
        let discovery = signal(INITIATOR_IFACE, STORAGE_PATH, "DiscoveryFinished");
        assert_eq!(hint_for(&discovery), Some(RefreshHint::System));

        let node_added = signal(
            NODE_IFACE,
            "/org/statewire/Storage1/iscsi_nodes/3",
            "StatusChanged",
        );
        assert_eq!(hint_for(&node_added), Some(RefreshHint::System));
    }

    #[test]
    fn unrelated_events_produce_no_hint() {
        let other = change("/org/statewire/Users1", "org.statewire.Users1");
        assert_eq!(hint_for(&other), None);

        let other = signal("org.statewire.Users1", "/org/statewire/Users1", "Changed");
        assert_eq!(hint_for(&other), None);
    }
}
