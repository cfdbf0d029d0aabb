//! Surface capture and the cross-context hand-off.
//!
//! ```text
//! network side (tokio)                    surface-owning thread
//! ┌──────────────────┐   CaptureRequest   ┌──────────────────────┐
//! │ CaptureClient    │ ─────────────────► │ SurfaceHost          │
//! │   .capture()     │                    │   bound: Weak<Surface>│
//! │   (timeout)      │ ◄───────────────── │   capture() → PNG b64 │
//! └──────────────────┘  oneshot result    └──────────────────────┘
//! ```
//!
//! Surfaces are not required to be `Send`, and [`SurfaceHost`] holds a
//! `std::rc::Weak`, so neither can leave the thread that created them.
//! The only way the network side reaches a surface is by sending a
//! request through [`CaptureClient`].

pub mod types;

use std::io::Cursor;
use std::rc::{Rc, Weak};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::ChannelError;

pub use types::{EncodedImage, PixelFormat, RasterImage};

/// A visual context the host can render on demand.
pub trait Surface {
    /// Render the current contents. `None` means the surface is detached
    /// and cannot be captured.
    fn snapshot(&self) -> Option<RasterImage>;
}

/// Capture one surface: render, PNG-encode, base64-encode. Reachable
/// from outside the crate only through [`SurfaceHost`].
pub(crate) fn capture(surface: &dyn Surface) -> Result<EncodedImage, ChannelError> {
    let raster = surface
        .snapshot()
        .ok_or(ChannelError::CaptureUnavailable("surface is detached"))?;
    encode_png_base64(&raster)
}

pub fn encode_png_base64(raster: &RasterImage) -> Result<EncodedImage, ChannelError> {
    let rgba = raster.to_rgba8()?;
    let image = image::RgbaImage::from_raw(raster.width, raster.height, rgba)
        .ok_or_else(|| ChannelError::Encoding("raster size mismatch".into()))?;

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;

    Ok(EncodedImage {
        width: raster.width,
        height: raster.height,
        base64_png: BASE64.encode(&png),
    })
}

// ── Hand-off channel ─────────────────────────────────────────────

/// A pending capture, answered on the surface-owning thread.
#[derive(Debug)]
pub struct CaptureRequest {
    reply: oneshot::Sender<Result<EncodedImage, ChannelError>>,
}

/// Create the two halves of the capture hand-off.
pub fn capture_channel(timeout: Duration) -> (CaptureClient, CaptureInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CaptureClient { tx, timeout }, CaptureInbox { rx })
}

/// Network-side half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CaptureClient {
    tx: mpsc::UnboundedSender<CaptureRequest>,
    timeout: Duration,
}

impl CaptureClient {
    /// Ask the surface-owning thread for a capture and wait for it, at
    /// most `timeout`.
    pub async fn capture(&self) -> Result<EncodedImage, ChannelError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CaptureRequest { reply })
            .map_err(|_| ChannelError::CaptureUnavailable("surface context is gone"))?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ChannelError::CaptureUnavailable("surface context is gone")),
            Err(_) => Err(ChannelError::Timeout(self.timeout)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Receiving end of the hand-off, before it is attached to a thread.
///
/// This is `Send`; move it to the surface-owning thread and call
/// [`SurfaceHost::attach`] there.
#[derive(Debug)]
pub struct CaptureInbox {
    rx: mpsc::UnboundedReceiver<CaptureRequest>,
}

// ── SurfaceHost ──────────────────────────────────────────────────

/// The surface-owning side: holds the bound surface and answers capture
/// requests. Not `Send`.
pub struct SurfaceHost {
    inbox: mpsc::UnboundedReceiver<CaptureRequest>,
    bound: Option<Weak<dyn Surface>>,
}

impl SurfaceHost {
    pub fn attach(inbox: CaptureInbox) -> Self {
        Self {
            inbox: inbox.rx,
            bound: None,
        }
    }

    /// Make `surface` the capture target. Only a weak reference is kept;
    /// dropping the last `Rc` makes later captures fail.
    pub fn bind_surface<S: Surface + 'static>(&mut self, surface: &Rc<S>) {
        let weak: Weak<S> = Rc::downgrade(surface);
        self.bound = Some(weak);
        debug!("surface bound");
    }

    pub fn unbind_surface(&mut self) {
        self.bound = None;
    }

    /// `true` if a surface is bound and still alive.
    pub fn has_live_surface(&self) -> bool {
        self.bound.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    /// Capture the bound surface on the current thread.
    pub fn capture(&self) -> Result<EncodedImage, ChannelError> {
        let weak = self
            .bound
            .as_ref()
            .ok_or(ChannelError::CaptureUnavailable("no surface bound"))?;
        let surface = weak
            .upgrade()
            .ok_or(ChannelError::CaptureUnavailable("bound surface was dropped"))?;
        capture(&*surface)
    }

    /// Answer every request already queued, without blocking. For hosts
    /// that drive their own event loop. Returns the number answered.
    pub fn run_pending(&mut self) -> usize {
        let mut answered = 0;
        while let Ok(request) = self.inbox.try_recv() {
            self.answer(request);
            answered += 1;
        }
        answered
    }

    /// Block the current thread answering requests until every
    /// [`CaptureClient`] is dropped.
    ///
    /// Must not be called from inside an async runtime.
    pub fn serve_until_closed(&mut self) {
        while let Some(request) = self.inbox.blocking_recv() {
            self.answer(request);
        }
        debug!("capture channel closed");
    }

    fn answer(&self, request: CaptureRequest) {
        let result = self.capture();
        if request.reply.send(result).is_err() {
            debug!("capture requester went away before the reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Solid {
        width: u32,
        height: u32,
        rgba: [u8; 4],
        attached: Cell<bool>,
    }

    impl Solid {
        fn new(width: u32, height: u32, rgba: [u8; 4]) -> Self {
            Self {
                width,
                height,
                rgba,
                attached: Cell::new(true),
            }
        }
    }

    impl Surface for Solid {
        fn snapshot(&self) -> Option<RasterImage> {
            if !self.attached.get() {
                return None;
            }
            let data = self.rgba.repeat((self.width * self.height) as usize);
            Some(RasterImage::packed(self.width, self.height, PixelFormat::Rgba8, data))
        }
    }

    fn decode_png(encoded: &EncodedImage) -> image::RgbaImage {
        let bytes = BASE64.decode(&encoded.base64_png).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
            .unwrap()
            .to_rgba8()
    }

    #[test]
    fn capture_encodes_lossless_png() {
        let surface = Solid::new(3, 2, [10, 20, 30, 255]);
        let encoded = capture(&surface).unwrap();
        assert_eq!((encoded.width, encoded.height), (3, 2));

        let decoded = decode_png(&encoded);
        assert_eq!(decoded.dimensions(), (3, 2));
        assert!(decoded.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn detached_surface_is_unavailable() {
        let surface = Solid::new(1, 1, [0; 4]);
        surface.attached.set(false);
        assert!(matches!(
            capture(&surface),
            Err(ChannelError::CaptureUnavailable(_))
        ));
    }

    #[test]
    fn host_without_binding_is_unavailable() {
        let (_client, inbox) = capture_channel(Duration::from_secs(1));
        let host = SurfaceHost::attach(inbox);
        assert!(!host.has_live_surface());
        assert!(matches!(
            host.capture(),
            Err(ChannelError::CaptureUnavailable("no surface bound"))
        ));
    }

    #[test]
    fn stale_binding_is_unavailable() {
        let (_client, inbox) = capture_channel(Duration::from_secs(1));
        let mut host = SurfaceHost::attach(inbox);
        let surface = Rc::new(Solid::new(1, 1, [0; 4]));
        host.bind_surface(&surface);
        assert!(host.has_live_surface());

        drop(surface);
        assert!(!host.has_live_surface());
        assert!(matches!(
            host.capture(),
            Err(ChannelError::CaptureUnavailable("bound surface was dropped"))
        ));
    }

    #[test]
    fn rebinding_replaces_target() {
        let (_client, inbox) = capture_channel(Duration::from_secs(1));
        let mut host = SurfaceHost::attach(inbox);
        let first = Rc::new(Solid::new(1, 1, [1, 1, 1, 255]));
        let second = Rc::new(Solid::new(2, 2, [2, 2, 2, 255]));
        host.bind_surface(&first);
        host.bind_surface(&second);
        assert_eq!(host.capture().unwrap().width, 2);

        host.unbind_surface();
        assert!(host.capture().is_err());
    }

    /// A surface that can only live on its creating thread.
    struct Pinned {
        inner: Rc<Solid>,
    }

    impl Surface for Pinned {
        fn snapshot(&self) -> Option<RasterImage> {
            self.inner.snapshot()
        }
    }

    #[test]
    fn binds_concrete_non_send_surface() {
        let (_client, inbox) = capture_channel(Duration::from_secs(1));
        let mut host = SurfaceHost::attach(inbox);
        let surface = Rc::new(Pinned {
            inner: Rc::new(Solid::new(5, 3, [9, 8, 7, 255])),
        });
        host.bind_surface(&surface);
        assert!(host.has_live_surface());

        let encoded = host.capture().unwrap();
        assert_eq!(decode_png(&encoded).dimensions(), (5, 3));
        assert!(decode_png(&encoded).pixels().all(|p| p.0 == [9, 8, 7, 255]));
    }

    #[tokio::test]
    async fn client_round_trips_through_surface_thread() {
        let (client, inbox) = capture_channel(Duration::from_secs(5));
        let ui = std::thread::spawn(move || {
            let mut host = SurfaceHost::attach(inbox);
            let surface = Rc::new(Solid::new(4, 4, [200, 100, 50, 255]));
            host.bind_surface(&surface);
            host.serve_until_closed();
        });

        let encoded = client.capture().await.unwrap();
        assert_eq!(decode_png(&encoded).dimensions(), (4, 4));

        drop(client);
        ui.join().unwrap();
    }

    #[tokio::test]
    async fn client_times_out_when_nobody_serves() {
        let (client, _inbox) = capture_channel(Duration::from_millis(50));
        assert!(matches!(
            client.capture().await,
            Err(ChannelError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn client_fails_when_inbox_dropped() {
        let (client, inbox) = capture_channel(Duration::from_secs(1));
        drop(inbox);
        assert!(matches!(
            client.capture().await,
            Err(ChannelError::CaptureUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn run_pending_answers_queued_requests() {
        let (client, inbox) = capture_channel(Duration::from_secs(5));
        let mut host = SurfaceHost::attach(inbox);
        assert_eq!(host.run_pending(), 0);

        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.capture().await }
        });
        // Let the request land in the inbox.
        while host.run_pending() == 0 {
            tokio::task::yield_now().await;
        }
        let result = pending.await.unwrap();
        assert!(matches!(
            result,
            Err(ChannelError::CaptureUnavailable("no surface bound"))
        ));
    }
}
