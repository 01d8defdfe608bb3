//! Owned frame container.
//!
//! Frames are packed RGB8 buffers. A frame handed to the worker pool is
//! moved, never shared, so the dispatch loop can read the next frame from
//! the source without racing an in-flight inference.

use anyhow::{anyhow, Result};
use image::RgbImage;

/// One decoded video frame (packed RGB8).
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap a packed RGB8 buffer. Length must be `width * height * 3`.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(anyhow!(
                "frame buffer length {} does not match {}x{} RGB8 ({} bytes)",
                pixels.len(),
                width,
                height,
                expected
            ));
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    /// Solid-color frame, used by tests and the synthetic source.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&rgb);
        }
        Self {
            pixels,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Crop the half-open region `[x1, x2) x [y1, y2)`.
    ///
    /// Coordinates must already be clamped to the frame; zero-area regions
    /// are rejected.
    pub fn crop(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Result<Frame> {
        if x2 <= x1 || y2 <= y1 || x2 > self.width || y2 > self.height {
            return Err(anyhow!(
                "invalid crop region ({},{})-({},{}) for {}x{} frame",
                x1,
                y1,
                x2,
                y2,
                self.width,
                self.height
            ));
        }
        let (cw, ch) = (x2 - x1, y2 - y1);
        let mut pixels = Vec::with_capacity(cw as usize * ch as usize * 3);
        for row in y1..y2 {
            let start = (row as usize * self.width as usize + x1 as usize) * 3;
            let end = start + cw as usize * 3;
            pixels.extend_from_slice(&self.pixels[start..end]);
        }
        Ok(Frame {
            pixels,
            width: cw,
            height: ch,
        })
    }

    /// Convert into an `image::RgbImage` (renderer interop). Copies.
    pub fn to_image(&self) -> RgbImage {
        // Length is validated at construction, so this cannot fail.
        RgbImage::from_raw(self.width, self.height, self.pixels.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    pub fn from_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            pixels: image.into_raw(),
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_length() {
        assert!(Frame::new(vec![0u8; 10], 4, 4).is_err());
        assert!(Frame::new(vec![0u8; 48], 4, 4).is_ok());
    }

    #[test]
    fn crop_extracts_region() -> Result<()> {
        let mut pixels = vec![0u8; 4 * 4 * 3];
        // Mark pixel (2,1) red.
        let idx = (4 + 2) * 3;
        pixels[idx] = 255;
        let frame = Frame::new(pixels, 4, 4)?;

        let crop = frame.crop(2, 1, 4, 3)?;
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.pixels()[0], 255);
        Ok(())
    }

    #[test]
    fn crop_rejects_zero_area() {
        let frame = Frame::solid(4, 4, [0, 0, 0]);
        assert!(frame.crop(2, 2, 2, 4).is_err());
        assert!(frame.crop(0, 0, 5, 4).is_err());
    }

    #[test]
    fn image_roundtrip() {
        let frame = Frame::solid(3, 2, [10, 20, 30]);
        let back = Frame::from_image(frame.to_image());
        assert_eq!(back.pixels(), frame.pixels());
        assert_eq!(back.width(), 3);
        assert_eq!(back.height(), 2);
    }
}
