pub mod connection;

pub use connection::{ConnectionHandle, ConnectionManager, Inbound, InboundFrame, LifecycleEvent};
