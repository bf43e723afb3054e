//! Live views over remote bus objects.
//!
//! The management service exposes its resources as (interface, path)
//! pairs on an internal object bus. [`ProxyLayer`] hands out
//! [`ProxyHandle`]s and routes `propertiesChanged` / `signal` frames
//! from the event channel to filtered subscribers.
//!
//! Caching rule: a handle requested *without* an explicit path stands
//! for the interface's singleton object and is cached per interface.
//! A handle requested *with* a path is never cached, so two distinct
//! objects of the same interface can never alias through the cache.
//! The cache is dropped whenever the channel reopens, because a
//! reconnect may follow a service restart that renumbered objects.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use serde_json::Value;

use crate::error::Error;
use crate::message::{ChangeNotification, SignalNotification, WireEvent};
use crate::registry::{HandlerRegistry, Subscription};
use crate::transport::Transport;

// ── Bus connector ────────────────────────────────────────────────────

/// Backend that resolves an interface (optionally at an explicit path)
/// into its current property set.
///
/// The production implementation calls the management service's HTTP
/// API; tests substitute a scripted map.
pub trait BusConnector: Send + Sync + 'static {
    fn get_properties(
        &self,
        interface: &str,
        path: Option<&str>,
    ) -> impl Future<Output = Result<serde_json::Map<String, Value>, Error>> + Send;
}

// ── Match spec ───────────────────────────────────────────────────────

/// Selects which bus signals a subscription receives.
///
/// Every field is optional; a signal must satisfy all that are set.
/// `path` and `path_namespace` are usually alternatives: the first
/// matches one object, the second a whole subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSpec {
    pub interface: Option<String>,
    pub path: Option<String>,
    /// Prefix match on the signal path ("/a/b" matches "/a/b" and
    /// "/a/b/c", not "/a/bc").
    pub path_namespace: Option<String>,
    pub member: Option<String>,
    /// Exact match on the signal's first argument (as a string).
    pub arg0: Option<String>,
}

impl MatchSpec {
    /// Match one named signal on `interface`, from any object.
    pub fn member(interface: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            interface: Some(interface.into()),
            member: Some(member.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_path_namespace(mut self, prefix: impl Into<String>) -> Self {
        self.path_namespace = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_arg0(mut self, arg0: impl Into<String>) -> Self {
        self.arg0 = Some(arg0.into());
        self
    }

    fn matches(&self, signal: &SignalNotification) -> bool {
        self.interface.as_ref().is_none_or(|i| *i == signal.interface)
            && self.path.as_ref().is_none_or(|p| *p == signal.path)
            && self.path_namespace.as_ref().is_none_or(|prefix| {
                signal.path == *prefix
                    || signal
                        .path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            && self.member.as_ref().is_none_or(|m| *m == signal.member)
            && self.arg0.as_ref().is_none_or(|arg0| {
                signal.args.first().and_then(Value::as_str) == Some(arg0.as_str())
            })
    }
}

// ── Proxy handle ─────────────────────────────────────────────────────

/// A property view of one remote object.
///
/// Handles for an interface's singleton object (requested without a
/// path) stay live: the layer applies matching change notifications to
/// them. Handles requested with an explicit path are point-in-time
/// snapshots; callers wanting updates subscribe via
/// [`ProxyLayer::on_properties_changed`].
pub struct ProxyHandle {
    interface: String,
    path: Option<String>,
    properties: Mutex<serde_json::Map<String, Value>>,
}

impl ProxyHandle {
    fn new(
        interface: &str,
        path: Option<&str>,
        properties: serde_json::Map<String, Value>,
    ) -> Self {
        Self {
            interface: interface.to_owned(),
            path: path.map(str::to_owned),
            properties: Mutex::new(properties),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Current value of one property, if known.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Snapshot of every known property.
    pub fn properties(&self) -> serde_json::Map<String, Value> {
        self.properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn apply(&self, change: &ChangeNotification) {
        let mut properties = self
            .properties
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (name, value) in &change.changed_properties {
            properties.insert(name.clone(), value.clone());
        }
        for name in &change.invalidated_properties {
            properties.remove(name);
        }
    }
}

impl std::fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("interface", &self.interface)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// ── Proxy layer ──────────────────────────────────────────────────────

/// Hands out proxies and routes wire events to filtered subscribers.
pub struct ProxyLayer<B: BusConnector> {
    bus: B,
    /// Singleton-object handles, keyed by interface. Never holds a
    /// handle that was requested with an explicit path.
    cache: DashMap<String, Arc<ProxyHandle>>,
    changes: HandlerRegistry<ChangeNotification>,
    signals: HandlerRegistry<SignalNotification>,
}

impl<B: BusConnector> ProxyLayer<B> {
    pub fn new(bus: B) -> Arc<Self> {
        Arc::new(Self {
            bus,
            cache: DashMap::new(),
            changes: HandlerRegistry::new(),
            signals: HandlerRegistry::new(),
        })
    }

    /// Wire this layer into a transport: events are routed to
    /// subscribers and cached handles, and the cache is dropped on
    /// every (re)open. The returned tokens keep the wiring alive.
    pub fn attach(self: &Arc<Self>, transport: &Transport) -> [Subscription; 2] {
        let layer = Arc::clone(self);
        let events = transport.on_event(move |event| layer.handle_event(event));

        let layer = Arc::clone(self);
        let opens = transport.on_open(move || layer.invalidate());

        [events, opens]
    }

    /// Resolve a handle for `interface`, optionally at an explicit
    /// `path`.
    ///
    /// Without a path the interface's cached singleton handle is
    /// reused when one exists; with a path a fresh handle is always
    /// created. A backend failure is not an error to the caller: the
    /// resource is treated as temporarily unavailable, logged, and
    /// reported as `None`. This layer does not retry; retry policy
    /// belongs to the caller.
    pub async fn proxy(&self, interface: &str, path: Option<&str>) -> Option<Arc<ProxyHandle>> {
        if path.is_none()
            && let Some(handle) = self.cache.get(interface)
        {
            return Some(Arc::clone(&handle));
        }

        match self.bus.get_properties(interface, path).await {
            Ok(properties) => {
                let handle = Arc::new(ProxyHandle::new(interface, path, properties));
                if path.is_none() {
                    self.cache.insert(interface.to_owned(), Arc::clone(&handle));
                }
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(interface, path, error = %e, "proxy unavailable");
                None
            }
        }
    }

    /// Register a handler for change notifications on one object,
    /// filtered to `path` first and `interface` second.
    ///
    /// Delivery order matches transport production order; rapid
    /// successive changes are not coalesced.
    pub fn on_properties_changed(
        &self,
        path: impl Into<String>,
        interface: impl Into<String>,
        handler: impl Fn(&ChangeNotification) + Send + Sync + 'static,
    ) -> Subscription {
        let path = path.into();
        let interface = interface.into();
        self.changes.subscribe(move |change: &ChangeNotification| {
            if change.path == path && change.interface == interface {
                handler(change);
            }
        })
    }

    /// Register a handler for bus signals selected by `spec`.
    pub fn on_signal(
        &self,
        spec: MatchSpec,
        handler: impl Fn(&SignalNotification) + Send + Sync + 'static,
    ) -> Subscription {
        self.signals.subscribe(move |signal: &SignalNotification| {
            if spec.matches(signal) {
                handler(signal);
            }
        })
    }

    /// Route one wire event to cached handles and subscribers.
    pub fn handle_event(&self, event: &WireEvent) {
        match event {
            WireEvent::PropertiesChanged(change) => {
                if let Some(handle) = self.cache.get(&change.interface) {
                    handle.apply(change);
                }
                self.changes.emit(change);
            }
            WireEvent::Signal(signal) => self.signals.emit(signal),
        }
    }

    /// Drop every cached handle so the next lookup refetches.
    pub fn invalidate(&self) {
        tracing::debug!(cached = self.cache.len(), "dropping proxy cache");
        self.cache.clear();
    }
}

// ── Tests ────────────────────────────────────────────────────────────
