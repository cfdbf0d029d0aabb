//! The client facade: one context object per process.
//!
//! [`ChannelClient::init`] builds the queues, starts the connection and
//! spawns the dispatcher. Clone the returned client to hand it to
//! producers; every clone refers to the same queues and connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::capture::{CaptureInbox, capture_channel};
use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::error::ChannelError;
use crate::network::{ConnectionHandle, ConnectionManager};
use crate::queue::{HISTORY_QUEUE, LOCATION_QUEUE, RecordQueue, location_record};
use crate::state::ConnectionPhase;

#[derive(Clone)]
pub struct ChannelClient {
    inner: Arc<Inner>,
}

struct Inner {
    location: Arc<RecordQueue>,
    history: Arc<RecordQueue>,
    connection: ConnectionHandle,
    dispatcher: JoinHandle<()>,
}

impl ChannelClient {
    /// Start the client. Must be called inside a Tokio runtime.
    ///
    /// The returned [`CaptureInbox`] belongs on the thread that owns the
    /// host's surfaces; attach it there with
    /// [`SurfaceHost::attach`](crate::SurfaceHost::attach).
    pub fn init(config: &ClientConfig) -> Result<(Self, CaptureInbox), ChannelError> {
        let capacity = config.queue_capacity();
        let location = Arc::new(RecordQueue::with_capacity(LOCATION_QUEUE, capacity));
        let history = Arc::new(RecordQueue::with_capacity(HISTORY_QUEUE, capacity));

        let (manager, inbound) =
            ConnectionManager::connect(&config.endpoint, config.connect_timeout())?;
        let connection = manager.handle().clone();

        let (capture, inbox) = capture_channel(config.capture_timeout());
        let dispatcher = Dispatcher::new(Arc::clone(&location), Arc::clone(&history), capture);
        let sink = connection.clone();
        let dispatcher = tokio::spawn(async move {
            dispatcher.run(inbound, sink).await;
            // The manager's driver has exited by the time inbound closes.
            drop(manager);
        });

        info!(endpoint = %config.endpoint, "command channel client started");
        let inner = Inner {
            location,
            history,
            connection,
            dispatcher,
        };
        Ok((
            Self {
                inner: Arc::new(inner),
            },
            inbox,
        ))
    }

    /// Record a location fix.
    pub fn enqueue_location(&self, latitude: f64, longitude: f64) {
        self.inner
            .location
            .enqueue(location_record(latitude, longitude));
        debug!("location record queued");
    }

    /// Record a search or navigation entry.
    pub fn enqueue_history_entry(&self, entry: impl Into<String>) {
        self.inner.history.enqueue(entry);
        debug!("history record queued");
    }

    pub fn pending_locations(&self) -> usize {
        self.inner.location.len()
    }

    pub fn pending_history(&self) -> usize {
        self.inner.history.len()
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.inner.connection.phase()
    }

    pub fn watch_phase(&self) -> watch::Receiver<ConnectionPhase> {
        self.inner.connection.watch_phase()
    }

    pub async fn wait_until_open(&self, timeout: Duration) -> Result<(), ChannelError> {
        self.inner.connection.wait_until_open(timeout).await
    }

    /// Wait until the connection is `Closed` or `Failed`.
    pub async fn closed(&self) -> ConnectionPhase {
        self.inner.connection.wait_until_terminal().await
    }

    /// Close the connection. Queued records are kept but can no longer
    /// be pulled.
    pub fn shutdown(&self) {
        self.inner.connection.shutdown();
    }

    /// `true` once the dispatcher task has stopped.
    pub fn is_finished(&self) -> bool {
        self.inner.dispatcher.is_finished()
    }
}
