//! Raster and encoded image types for the capture hand-off.
//!
//! [`RasterImage`] is what a host surface renders; [`EncodedImage`] is
//! what leaves the surface-owning context (PNG, base64 text).

use crate::error::ChannelError;

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout of a raster handed over by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 4 bytes per pixel: Blue, Green, Red, Alpha.
    Bgra8,
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba8,
    /// 3 bytes per pixel: Red, Green, Blue.
    Rgb8,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 | PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

// ── RasterImage ──────────────────────────────────────────────────

/// An uncompressed snapshot of a surface.
///
/// The `data` buffer holds `height` rows of `stride` bytes each.
/// `stride` may be larger than `width * bytes_per_pixel` when the host
/// pads rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// Row pitch in **bytes**.
    pub stride: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl RasterImage {
    /// A tightly packed raster (`stride == width * bpp`).
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width * format.bytes_per_pixel() as u32,
            format,
            data,
        }
    }

    /// Total byte size the raster must occupy.
    pub fn byte_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }

    /// Repack into tightly packed RGBA8, dropping row padding.
    pub fn to_rgba8(&self) -> Result<Vec<u8>, ChannelError> {
        if self.width == 0 || self.height == 0 {
            return Err(ChannelError::Encoding("raster has zero area".into()));
        }
        let bpp = self.format.bytes_per_pixel();
        let row_bytes = self.width as usize * bpp;
        if (self.stride as usize) < row_bytes {
            return Err(ChannelError::Encoding(format!(
                "stride {} shorter than row width {row_bytes}",
                self.stride
            )));
        }
        if self.data.len() < self.byte_len() {
            return Err(ChannelError::Encoding(format!(
                "raster holds {} bytes, expected {}",
                self.data.len(),
                self.byte_len()
            )));
        }

        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height as usize {
            let start = y * self.stride as usize;
            let row = &self.data[start..start + row_bytes];
            for px in row.chunks_exact(bpp) {
                match self.format {
                    PixelFormat::Rgba8 => out.extend_from_slice(px),
                    PixelFormat::Bgra8 => out.extend_from_slice(&[px[2], px[1], px[0], px[3]]),
                    PixelFormat::Rgb8 => out.extend_from_slice(&[px[0], px[1], px[2], 0xff]),
                }
            }
        }
        Ok(out)
    }
}

// ── EncodedImage ─────────────────────────────────────────────────

/// A PNG snapshot as base64 text, ready to be used as a reply payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub base64_png: String,
}
