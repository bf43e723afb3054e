// End-to-end: wire frames in, reconciled records out.
//
// A scripted channel feeds the transport; the monitor turns the frames
// into refresh hints; the test plays the consumer, re-fetching observed
// state through the proxy layer and pushing it into the store.

#![allow(clippy::unwrap_used)]

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

use statewire_api::bus::{BusConnector, ProxyLayer};
use statewire_api::error::Error;
use statewire_api::transport::{Connector, Transport};
use statewire_core::monitor::{
    RefreshHint, TargetMonitor, INITIATOR_IFACE, NODE_IFACE, STORAGE_PATH,
};
use statewire_core::{SourceStore, Startup, Status, Target};

const NODE_PATH: &str = "/org/statewire/Storage1/iscsi_nodes/1";
const TARGET_IQN: &str = "iqn.2023-01.com.example:disk1";

struct OneShotConnector {
    frames: Mutex<Option<Vec<Result<Message, tungstenite::Error>>>>,
}

impl Connector for OneShotConnector {
    type Channel = Pin<Box<dyn Stream<Item = Result<Message, tungstenite::Error>> + Send>>;

    async fn connect(&self, _url: &Url) -> Result<Self::Channel, Error> {
        match self.frames.lock().unwrap().take() {
            Some(frames) => {
                let stream = futures_util::stream::iter(frames).chain(futures_util::stream::pending());
                Ok(Box::pin(stream))
            }
            None => Err(Error::WebSocketConnect("script exhausted".into())),
        }
    }
}

struct NodeBus;

impl BusConnector for NodeBus {
    async fn get_properties(
        &self,
        interface: &str,
        path: Option<&str>,
    ) -> Result<serde_json::Map<String, Value>, Error> {
        if interface == NODE_IFACE && path == Some(NODE_PATH) {
            let Value::Object(props) = json!({
                "Target": TARGET_IQN,
                "Address": "192.168.100.102",
                "Port": 3260,
                "Connected": true,
                "IBFT": false
            }) else {
                unreachable!()
            };
            Ok(props)
        } else {
            Err(Error::ProxyUnavailable {
                interface: interface.to_owned(),
                path: path.unwrap_or("(default)").to_owned(),
            })
        }
    }
}

fn frame(json: &Value) -> Message {
    Message::Text(json.to_string().into())
}

fn observed_target(props: &serde_json::Map<String, Value>) -> Target {
    Target {
        name: props["Target"].as_str().unwrap().to_owned(),
        address: props["Address"].as_str().unwrap().to_owned(),
        port: u32::try_from(props["Port"].as_u64().unwrap()).unwrap(),
        interface: "default".to_owned(),
        ibft: props["IBFT"].as_bool().unwrap(),
        connected: props["Connected"].as_bool().unwrap(),
        startup: None,
        locked: props["IBFT"].as_bool().unwrap(),
    }
}

#[tokio::test(start_paused = true)]
async fn discovery_flows_from_wire_frames_to_reconciled_records() {
    let connector = OneShotConnector {
        frames: Mutex::new(Some(vec![
            Ok(frame(&json!({
                "type": "signal",
                "interface": INITIATOR_IFACE,
                "path": STORAGE_PATH,
                "member": "DiscoveryFinished"
            }))),
            Ok(frame(&json!({
                "type": "propertiesChanged",
                "path": NODE_PATH,
                "interface": NODE_IFACE,
                "changedProperties": { "Connected": true },
                "invalidatedProperties": []
            }))),
        ])),
    };

    let transport = Transport::connect(Url::parse("ws://localhost:3000/api/ws").unwrap(), connector);
    let monitor = TargetMonitor::attach(&transport);
    let layer = ProxyLayer::new(NodeBus);
    let _wiring = layer.attach(&transport);

    let hints = Arc::new(Mutex::new(Vec::new()));
    let _refresh = {
        let hints = Arc::clone(&hints);
        monitor.on_refresh(move |hint| hints.lock().unwrap().push(hint))
    };

    // The user declared the target (discovered without credentials).
    let store = SourceStore::new();
    store
        .apply_config(&[Target {
            name: TARGET_IQN.to_owned(),
            address: "192.168.100.102".to_owned(),
            port: 3260,
            interface: "default".to_owned(),
            ibft: false,
            connected: false,
            startup: Some(Startup::Onboot),
            locked: false,
        }])
        .unwrap();
    assert_eq!(store.snapshot()[0].status, Status::Missing);

    // Let the transport drain the scripted frames.
    tokio::time::sleep(Duration::from_millis(10)).await;

    let hints = hints.lock().unwrap().clone();
    assert_eq!(hints, vec![RefreshHint::System, RefreshHint::System]);

    // Play the consumer: re-fetch observed state and push it in.
    let node = layer.proxy(NODE_IFACE, Some(NODE_PATH)).await.unwrap();
    store
        .apply_system(&[observed_target(&node.properties())])
        .unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].status, Status::Connected);
    // Declared startup survives the merge even though the backend
    // never reported one.
    assert_eq!(snapshot[0].fields["startup"], json!("onboot"));

    let labels: Vec<(&str, bool)> = snapshot[0]
        .actions
        .iter()
        .map(|a| (a.label.as_str(), a.is_dangerous))
        .collect();
    assert_eq!(labels, vec![("Disconnect", true), ("Edit connection", false)]);

    transport.close();
}
