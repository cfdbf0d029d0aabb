//! The single WebSocket connection to the operator endpoint.
//!
//! [`ConnectionManager::connect`] validates the endpoint, then spawns a
//! driver task that performs the handshake and pumps frames:
//!
//! ```text
//! ConnectionHandle::send ──► outbound mpsc ──► socket
//! socket ──► Inbound::frames      (Text / Binary)
//!        └─► Inbound::lifecycle   (Opened / Closed / Failed)
//! ```
//!
//! There is no reconnect. Once `Closed` or `Failed`, the manager stays
//! terminal and `send` reports `NotConnected`.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::codec::EnvelopeCodec;
use crate::error::ChannelError;
use crate::message::Envelope;
use crate::state::ConnectionPhase;

/// Capacity of the inbound frame channel.
const INBOUND_CAPACITY: usize = 64;

/// Close code reported when the stream ends without a Close frame.
const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code reported when the peer's Close frame carries no code.
const NO_STATUS_RECEIVED: u16 = 1005;

/// A raw frame as received, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Opened,
    Closed { code: u16, reason: String },
    Failed(String),
}

/// Receiving ends handed to whoever consumes the connection.
#[derive(Debug)]
pub struct Inbound {
    pub frames: mpsc::Receiver<InboundFrame>,
    pub lifecycle: mpsc::UnboundedReceiver<LifecycleEvent>,
}

// ── ConnectionHandle ─────────────────────────────────────────────

/// Cloneable sending side of the connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    outbound: mpsc::UnboundedSender<String>,
    phase: watch::Receiver<ConnectionPhase>,
    shutdown: CancellationToken,
}

impl ConnectionHandle {
    /// Queue an envelope for transmission.
    ///
    /// Fails fast with [`ChannelError::NotConnected`] unless the
    /// connection is `Open`. Delivery is not confirmed.
    pub fn send(&self, envelope: &Envelope) -> Result<(), ChannelError> {
        if !self.phase.borrow().is_open() {
            return Err(ChannelError::NotConnected);
        }
        let text = EnvelopeCodec::encode(envelope)?;
        self.outbound
            .send(text)
            .map_err(|_| ChannelError::NotConnected)
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase.borrow().clone()
    }

    pub fn watch_phase(&self) -> watch::Receiver<ConnectionPhase> {
        self.phase.clone()
    }

    /// Wait for `Open`. Fails with `NotConnected` if the connection goes
    /// terminal first, or `Timeout` after `timeout`.
    pub async fn wait_until_open(&self, timeout: Duration) -> Result<(), ChannelError> {
        let mut rx = self.phase.clone();
        let wait = async move {
            loop {
                {
                    let phase = rx.borrow_and_update();
                    if phase.is_open() {
                        return Ok(());
                    }
                    if phase.is_terminal() {
                        return Err(ChannelError::NotConnected);
                    }
                }
                if rx.changed().await.is_err() {
                    return Err(ChannelError::NotConnected);
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| ChannelError::Timeout(timeout))?
    }

    /// Wait until the connection is `Closed` or `Failed`.
    pub async fn wait_until_terminal(&self) -> ConnectionPhase {
        let mut rx = self.phase.clone();
        loop {
            {
                let phase = rx.borrow_and_update();
                if phase.is_terminal() {
                    return phase.clone();
                }
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }

    /// Close the connection with a normal close frame.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

// ── ConnectionManager ────────────────────────────────────────────

/// Owns the driver task of the one connection.
#[derive(Debug)]
pub struct ConnectionManager {
    handle: ConnectionHandle,
    driver: JoinHandle<()>,
}

impl ConnectionManager {
    /// Validate `endpoint` and start connecting in the background.
    ///
    /// Must be called inside a Tokio runtime. Returns as soon as the
    /// driver is spawned; progress is reported through the phase watch
    /// and the lifecycle channel.
    pub fn connect(
        endpoint: &str,
        connect_timeout: Duration,
    ) -> Result<(Self, Inbound), ChannelError> {
        let url = parse_endpoint(endpoint)?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (frames_tx, frames_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(ConnectionPhase::default());
        let shutdown = CancellationToken::new();

        let driver = Driver {
            url,
            connect_timeout,
            phase: phase_tx,
            outbound: outbound_rx,
            frames: frames_tx,
            lifecycle: lifecycle_tx,
            shutdown: shutdown.clone(),
        };
        let driver = tokio::spawn(driver.run());

        let handle = ConnectionHandle {
            outbound: outbound_tx,
            phase: phase_rx,
            shutdown,
        };
        let inbound = Inbound {
            frames: frames_rx,
            lifecycle: lifecycle_rx,
        };
        Ok((Self { handle, driver }, inbound))
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Shut down and wait for the driver task to finish.
    pub async fn close(self) {
        self.handle.shutdown();
        let _ = self.driver.await;
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ChannelError> {
    let invalid = |reason: String| ChannelError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };
    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

// ── Driver ───────────────────────────────────────────────────────

struct Driver {
    url: Url,
    connect_timeout: Duration,
    phase: watch::Sender<ConnectionPhase>,
    outbound: mpsc::UnboundedReceiver<String>,
    frames: mpsc::Sender<InboundFrame>,
    lifecycle: mpsc::UnboundedSender<LifecycleEvent>,
    shutdown: CancellationToken,
}

impl Driver {
    async fn run(mut self) {
        self.transition(|p| p.begin_connect());
        info!(endpoint = %self.url, "connecting");

        let connect = tokio::time::timeout(
            self.connect_timeout,
            tokio_tungstenite::connect_async(self.url.as_str()),
        );
        let ws = tokio::select! {
            _ = self.shutdown.cancelled() => {
                self.finish(LifecycleEvent::Failed("shut down before open".into()));
                return;
            }
            result = connect => match result {
                Ok(Ok((ws, _response))) => ws,
                Ok(Err(e)) => {
                    self.finish(LifecycleEvent::Failed(e.to_string()));
                    return;
                }
                Err(_) => {
                    let cause = format!("connect timed out after {:?}", self.connect_timeout);
                    self.finish(LifecycleEvent::Failed(cause));
                    return;
                }
            },
        };

        self.transition(|p| p.open());
        info!(endpoint = %self.url, "connection open");
        let _ = self.lifecycle.send(LifecycleEvent::Opened);

        let (mut sink, mut stream) = ws.split();
        let outcome = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client shutdown".into(),
                    };
                    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                        debug!("close frame not sent: {e}");
                    }
                    break LifecycleEvent::Closed { code: 1000, reason: "client shutdown".into() };
                }

                Some(text) = self.outbound.recv() => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        break LifecycleEvent::Failed(e.to_string());
                    }
                }

                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => self.deliver(InboundFrame::Text(text)).await,
                    Some(Ok(Message::Binary(bytes))) => self.deliver(InboundFrame::Binary(bytes)).await,
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.into_owned()))
                            .unwrap_or((NO_STATUS_RECEIVED, String::new()));
                        break LifecycleEvent::Closed { code, reason };
                    }
                    // Ping/Pong are answered by the transport.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break LifecycleEvent::Failed(e.to_string()),
                    None => break LifecycleEvent::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: String::new(),
                    },
                },
            }
        };

        // Writes a pending close reply, if the transport queued one.
        if let Err(e) = sink.flush().await {
            debug!("final flush failed: {e}");
        }
        self.finish(outcome);
    }

    async fn deliver(&self, frame: InboundFrame) {
        if self.frames.send(frame).await.is_err() {
            debug!("inbound frame dropped: no consumer");
        }
    }

    /// Apply the terminal transition, log it and emit the event.
    fn finish(&self, event: LifecycleEvent) {
        match &event {
            LifecycleEvent::Closed { code, reason } => {
                info!(code, reason = %reason, "connection closed");
                let (code, reason) = (*code, reason.clone());
                self.transition(move |p| p.close(code, reason));
            }
            LifecycleEvent::Failed(cause) => {
                warn!(cause = %cause, "connection failed");
                let cause = cause.clone();
                self.transition(move |p| p.fail(cause));
            }
            LifecycleEvent::Opened => {}
        }
        let _ = self.lifecycle.send(event);
    }

    fn transition<F>(&self, f: F)
    where
        F: FnOnce(&mut ConnectionPhase) -> Result<(), ChannelError>,
    {
        self.phase.send_modify(|phase| {
            if let Err(e) = f(phase) {
                warn!("phase transition rejected: {e}");
            }
        });
    }
}

// ── Tests ────────────────────────────────────────────────────────
