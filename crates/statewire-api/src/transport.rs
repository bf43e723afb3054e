//! Resilient event channel with auto-reconnect.
//!
//! Keeps a persistent WebSocket open to the management service and
//! fans incoming [`WireEvent`]s out through instance-owned handler
//! registries. Reconnection uses a fixed delay (no backoff): the
//! service lives on the same host or management network as the UI, so
//! spreading out reconnect storms buys nothing, while predictable
//! retry pacing keeps the "connecting…" UI honest.
//!
//! One background task owns the socket. A fresh socket is built for
//! every attempt; the logical transport identity stays the same.
//!
//! # Example
//!
//! ```rust,ignore
//! use statewire_api::transport::{Transport, WsConnector};
//! use url::Url;
//!
//! let url = Url::parse("ws://localhost:3000/api/ws")?;
//! let transport = Transport::connect(url, WsConnector);
//!
//! let _token = transport.on_event(|event| println!("{event:?}"));
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::message::WireEvent;
use crate::registry::{HandlerRegistry, Subscription};

/// Consecutive reconnection attempts before the channel is classified
/// unrecoverable.
pub const MAX_ATTEMPTS: u32 = 15;

/// Fixed delay between reconnection attempts.
pub const ATTEMPT_INTERVAL: Duration = Duration::from_millis(1000);

// ── Channel state ────────────────────────────────────────────────────

/// Stored lifecycle state of the underlying channel.
///
/// `Unrecoverable` is deliberately absent: it is a *classification*
/// derived from state plus the attempt counter (see
/// [`Transport::is_recoverable`]), not a stored transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Connected,
    Closing,
    Closed,
}

// ── Connector ────────────────────────────────────────────────────────

/// Source of raw WebSocket channels.
///
/// The transport is generic over this seam so tests can substitute a
/// scripted channel for the real network.
pub trait Connector: Send + Sync + 'static {
    type Channel: Stream<Item = Result<Message, tungstenite::Error>> + Send + Unpin;

    fn connect(&self, url: &Url) -> impl Future<Output = Result<Self::Channel, Error>> + Send;
}

/// Default connector backed by `tokio_tungstenite`.
pub struct WsConnector;

impl Connector for WsConnector {
    type Channel =
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    async fn connect(&self, url: &Url) -> Result<Self::Channel, Error> {
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
        Ok(stream)
    }
}

// ── Transport ────────────────────────────────────────────────────────

struct Registries {
    open: HandlerRegistry<()>,
    close: HandlerRegistry<()>,
    error: HandlerRegistry<Error>,
    event: HandlerRegistry<WireEvent>,
}

struct Shared {
    state: Mutex<ChannelState>,
    /// Consecutive failed connections since the last successful
    /// handshake. Reset to 0 on every open.
    attempts: AtomicU32,
    registries: Registries,
}

impl Shared {
    fn set_state(&self, state: ChannelState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn state(&self) -> ChannelState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resilient duplex event channel to the management service.
///
/// Owns exactly one live socket at a time; reconnection replaces but
/// never duplicates the underlying channel. All callbacks fire from
/// the single background task, so `on_open` handlers are guaranteed to
/// run before any `on_event` handler for frames received after that
/// open.
pub struct Transport {
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl Transport {
    /// Spawn the connection loop against `url`.
    ///
    /// Returns immediately; the first connection attempt happens
    /// asynchronously. Must be called within a tokio runtime.
    pub fn connect<C: Connector>(url: Url, connector: C) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(ChannelState::Connecting),
            attempts: AtomicU32::new(0),
            registries: Registries {
                open: HandlerRegistry::new(),
                close: HandlerRegistry::new(),
                error: HandlerRegistry::new(),
                event: HandlerRegistry::new(),
            },
        });
        let cancel = CancellationToken::new();

        let task_shared = Arc::clone(&shared);
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            run_loop(&url, &connector, &task_shared, &task_cancel).await;
        });

        Self { shared, cancel }
    }

    pub fn state(&self) -> ChannelState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state() == ChannelState::Connected
    }

    /// `false` exactly when the channel is classified unrecoverable:
    /// not connected and the attempt cap has been exhausted.
    pub fn is_recoverable(&self) -> bool {
        self.is_connected() || self.reconnect_attempts() <= MAX_ATTEMPTS
    }

    /// Consecutive failed connection attempts since the last open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    /// Register a handler for successful (re)connections.
    pub fn on_open(&self, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.shared.registries.open.subscribe(move |()| handler())
    }

    /// Register a handler for channel closures (remote close, network
    /// failure, or end of stream).
    pub fn on_close(&self, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.shared.registries.close.subscribe(move |()| handler())
    }

    /// Register a handler for channel errors.
    pub fn on_error(&self, handler: impl Fn(&Error) + Send + Sync + 'static) -> Subscription {
        self.shared.registries.error.subscribe(handler)
    }

    /// Register a handler for parsed event frames.
    ///
    /// The handler runs for every event; filtering is up to the
    /// callback (the proxy layer does exactly that).
    pub fn on_event(&self, handler: impl Fn(&WireEvent) + Send + Sync + 'static) -> Subscription {
        self.shared.registries.event.subscribe(handler)
    }

    /// Tear the transport down.
    ///
    /// Cancels a pending scheduled retry so no reconnection can race
    /// the shutdown.
    pub fn close(&self) {
        self.shared.set_state(ChannelState::Closing);
        self.cancel.cancel();
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        // The retry timer lives in the background task; cancelling here
        // releases it on every path that ends the transport's life.
        self.cancel.cancel();
    }
}

// ── Background connection loop ───────────────────────────────────────

async fn run_loop<C: Connector>(
    url: &Url,
    connector: &C,
    shared: &Arc<Shared>,
    cancel: &CancellationToken,
) {
    loop {
        shared.set_state(ChannelState::Connecting);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connector.connect(url) => match result {
                Ok(channel) => {
                    shared.attempts.store(0, Ordering::SeqCst);
                    shared.set_state(ChannelState::Connected);
                    tracing::info!(url = %url, "channel connected");
                    shared.registries.open.emit(&());

                    let outcome = read_frames(channel, shared, cancel).await;
                    shared.set_state(ChannelState::Closed);
                    if let Err(e) = outcome {
                        tracing::warn!(error = %e, "channel failed");
                        shared.registries.error.emit(&e);
                    }
                    shared.registries.close.emit(&());
                }
                Err(e) => {
                    shared.set_state(ChannelState::Closed);
                    tracing::warn!(
                        error = %e,
                        attempts = shared.attempts.load(Ordering::SeqCst),
                        "connection attempt failed"
                    );
                    shared.registries.error.emit(&e);
                    shared.registries.close.emit(&());
                }
            }
        }

        if cancel.is_cancelled() {
            break;
        }

        let failures = shared.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if failures > MAX_ATTEMPTS {
            // The cap does not "stop trying" retroactively; the next
            // scheduled attempt is simply not issued.
            tracing::error!(max_attempts = MAX_ATTEMPTS, "reconnection attempt cap reached");
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(ATTEMPT_INTERVAL) => {}
        }
    }

    shared.set_state(ChannelState::Closed);
    tracing::debug!("connection loop exiting");
}

/// Read frames from one live channel until it drops.
async fn read_frames<S>(
    mut channel: S,
    shared: &Arc<Shared>,
    cancel: &CancellationToken,
) -> Result<(), Error>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Send + Unpin,
{
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            frame = channel.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    dispatch_frame(&text, &shared.registries.event);
                }
                Some(Ok(Message::Ping(_))) => {
                    // tungstenite replies with pongs automatically
                    tracing::trace!("channel ping");
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "close frame received");
                    return Ok(());
                }
                Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                None => {
                    tracing::info!("channel stream ended");
                    return Ok(());
                }
                _ => {
                    // Binary, Pong, Frame -- not part of the wire contract
                }
            }
        }
    }
}

/// Parse one text frame and fan it out.
///
/// A malformed frame is fatal to that frame only: it is dropped, the
/// connection stays open, and no other frame is affected.
fn dispatch_frame(text: &str, events: &HandlerRegistry<WireEvent>) {
    match serde_json::from_str::<WireEvent>(text) {
        Ok(event) => events.emit(&event),
        Err(e) => tracing::debug!(error = %e, "dropping malformed frame"),
    }
}

// ── Tests ────────────────────────────────────────────────────────────
