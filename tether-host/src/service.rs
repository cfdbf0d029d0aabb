//! Host service: owns the client, the surface thread and the record feed.

use std::io::BufRead;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use tether_core::{CaptureInbox, ChannelClient, ConnectionPhase, SurfaceHost};

use crate::config::HostConfig;
use crate::feed::FeedLine;
use crate::surface::StillSurface;

const CLOSE_GRACE: Duration = Duration::from_secs(3);
const FEED_BUFFER: usize = 64;

// ── HostService ──────────────────────────────────────────────────

/// Runs once. The stop handle starts `true` and reads `false` once a stop
/// is requested or [`run`](Self::run) has returned.
pub struct HostService {
    config: HostConfig,
    running: Arc<AtomicBool>,
}

impl HostService {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Store `false` here to stop [`run`](Self::run), before or during it.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run with records read from stdin.
    pub async fn run(&self) -> Result<ConnectionPhase, Box<dyn std::error::Error>> {
        let feed = spawn_stdin_feed()?;
        self.run_with_feed(feed).await
    }

    /// Run until stopped or until the channel reaches a terminal phase.
    /// The feed ending does not stop the service.
    ///
    /// Returns the final connection phase.
    pub async fn run_with_feed(
        &self,
        mut feed: mpsc::Receiver<String>,
    ) -> Result<ConnectionPhase, Box<dyn std::error::Error>> {
        let _stopped = ClearOnExit(&self.running);

        let surface = self.load_surface()?;
        let (client, inbox) = ChannelClient::init(&self.config.client)?;
        let surface_thread = spawn_surface_thread(surface, inbox)?;

        let mut feed_open = true;
        loop {
            tokio::select! {
                line = feed.recv(), if feed_open => match line {
                    Some(line) => apply_line(&client, &line),
                    None => {
                        debug!("record feed ended");
                        feed_open = false;
                    }
                },
                phase = client.closed() => {
                    info!(%phase, "channel finished");
                    break;
                }
                _ = Self::wait_for_stop(&self.running) => {
                    info!("stop requested");
                    break;
                }
            }
        }
        // Lets a blocked feed reader exit on its next line.
        drop(feed);

        client.shutdown();
        let phase = match tokio::time::timeout(CLOSE_GRACE, client.closed()).await {
            Ok(phase) => phase,
            Err(_) => {
                warn!("channel did not close within {CLOSE_GRACE:?}");
                client.phase()
            }
        };
        if client.pending_locations() + client.pending_history() > 0 {
            info!(
                locations = client.pending_locations(),
                history = client.pending_history(),
                "records left unpulled"
            );
        }
        drop(client);

        // The surface thread exits once the dispatcher drops its capture
        // client.
        match tokio::task::spawn_blocking(move || surface_thread.join()).await {
            Ok(Ok(())) => debug!("surface thread joined"),
            Ok(Err(_)) => error!("surface thread panicked"),
            Err(e) => error!("surface thread join failed: {e}"),
        }

        Ok(phase)
    }

    fn load_surface(&self) -> Result<StillSurface, image::ImageError> {
        let cfg = &self.config.surface;
        if cfg.image.is_empty() {
            return Ok(StillSurface::test_pattern(cfg.width, cfg.height));
        }
        let surface = StillSurface::from_file(Path::new(&cfg.image))?;
        let (w, h) = surface.dimensions();
        info!("surface image {} ({w}x{h})", cfg.image);
        Ok(surface)
    }

    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// Clears the running flag however `run_with_feed` returns.
struct ClearOnExit<'a>(&'a AtomicBool);

impl Drop for ClearOnExit<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Read stdin on its own thread. A blocking read there never holds up
/// runtime shutdown.
fn spawn_stdin_feed() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(FEED_BUFFER);
    std::thread::Builder::new()
        .name("stdin-feed".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("record feed error: {e}");
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

/// The thread that owns the surface. Captures are served here only.
fn spawn_surface_thread(
    surface: StillSurface,
    inbox: CaptureInbox,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("surface".into())
        .spawn(move || {
            let mut host = SurfaceHost::attach(inbox);
            let surface = Rc::new(surface);
            host.bind_surface(&surface);
            host.serve_until_closed();
        })
}

fn apply_line(client: &ChannelClient, line: &str) {
    match FeedLine::parse(line) {
        Ok(record) => {
            record.apply(client);
        }
        Err(e) => warn!("ignoring feed line: {e}"),
    }
}

// ── Tests ────────────────────────────────────────────────────────
