//! # tether-core
//!
//! Client side of a remote command channel: a persistent WebSocket to an
//! operator endpoint that answers pull commands with queued records or
//! on-demand surface captures.
//!
//! This crate contains:
//! - **Queues**: `RecordQueue`, FIFO text records shared across threads
//! - **Capture**: `Surface`, `SurfaceHost`, `CaptureClient` for PNG snapshots
//!   taken on the surface-owning thread
//! - **Codec**: `EnvelopeCodec` for the JSON `{command, payload}` envelope
//! - **Network**: `ConnectionManager` for the single WebSocket connection
//! - **State**: `ConnectionPhase` lifecycle state machine
//! - **Dispatch**: `Dispatcher`, the pull-command decision logic
//! - **Client**: `ChannelClient`, the facade handed to the host
//! - **Error**: `ChannelError`, a typed `thiserror`-based error hierarchy

pub mod capture;
pub mod client;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod network;
pub mod queue;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use capture::{
    CaptureClient, CaptureInbox, EncodedImage, PixelFormat, RasterImage, Surface, SurfaceHost,
};
pub use client::ChannelClient;
pub use codec::EnvelopeCodec;
pub use config::ClientConfig;
pub use dispatch::{Dispatcher, ReplySink};
pub use error::ChannelError;
pub use message::{Envelope, PullCommand, ReplyCommand};
pub use network::{ConnectionHandle, ConnectionManager, InboundFrame, LifecycleEvent};
pub use queue::RecordQueue;
pub use state::ConnectionPhase;
