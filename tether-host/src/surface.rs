//! A still image standing in for the host's visible view.

use std::path::Path;

use tether_core::{PixelFormat, RasterImage, Surface};

/// A surface whose snapshot never changes.
#[derive(Debug, Clone)]
pub struct StillSurface {
    frame: RasterImage,
}

impl StillSurface {
    /// Load a PNG (or any format the `image` build supports) from disk.
    pub fn from_file(path: &Path) -> Result<Self, image::ImageError> {
        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            frame: RasterImage::packed(width, height, PixelFormat::Rgba8, rgba.into_raw()),
        })
    }

    /// Diagonal colour bars, BGRA like a typical framebuffer.
    pub fn test_pattern(width: u32, height: u32) -> Self {
        const BARS: [[u8; 4]; 4] = [
            [0x20, 0x20, 0xe0, 0xff],
            [0x20, 0xe0, 0x20, 0xff],
            [0xe0, 0x20, 0x20, 0xff],
            [0xe0, 0xe0, 0xe0, 0xff],
        ];
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&BARS[((x + y) / 16 % 4) as usize]);
            }
        }
        Self {
            frame: RasterImage::packed(width, height, PixelFormat::Bgra8, data),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }
}

impl Surface for StillSurface {
    fn snapshot(&self) -> Option<RasterImage> {
        Some(self.frame.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use std::time::Duration;

    use tether_core::SurfaceHost;
    use tether_core::capture::capture_channel;

    fn host_with(surface: &Rc<StillSurface>) -> SurfaceHost {
        let (_client, inbox) = capture_channel(Duration::from_secs(1));
        let mut host = SurfaceHost::attach(inbox);
        host.bind_surface(surface);
        host
    }

    #[test]
    fn test_pattern_encodes() {
        let surface = Rc::new(StillSurface::test_pattern(40, 20));
        let encoded = host_with(&surface).capture().unwrap();
        assert_eq!((encoded.width, encoded.height), (40, 20));
        assert!(!encoded.base64_png.is_empty());
    }

    #[test]
    fn zero_sized_pattern_does_not_capture() {
        let surface = Rc::new(StillSurface::test_pattern(0, 0));
        assert!(host_with(&surface).capture().is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(StillSurface::from_file(Path::new("/nonexistent/view.png")).is_err());
    }
}
