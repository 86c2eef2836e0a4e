use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Packed 8-bit, 3-channel frame.
///
/// Frames move through the pipeline by value: the stage holding a frame owns
/// it, and filters always produce a new buffer instead of touching the input.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel rows, top to bottom, `stride` bytes each
    pub data: Bytes,

    /// Frame metadata
    pub meta: FrameMetadata,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,
}

/// Frame metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Bytes per row
    pub stride: u32,
    pub format: PixelFormat,
    pub device_timestamp: Option<Duration>, // Hardware timestamp if available
}

/// Pixel formats we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Bgr24,
    Yuyv4,
    Mjpeg,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats, `None` for compressed ones.
    pub fn bytes_per_pixel(self) -> Option<u32> {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => Some(3),
            PixelFormat::Yuyv4 => Some(2),
            PixelFormat::Mjpeg => None,
        }
    }
}

impl Frame {
    /// Wrap a packed 3-channel buffer.
    pub fn new(
        data: impl Into<Bytes>,
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
    ) -> Self {
        let data = data.into();
        debug_assert_eq!(data.len(), (width * height * 3) as usize);

        Self {
            data,
            meta: FrameMetadata {
                sequence,
                width,
                height,
                stride: width * 3,
                format,
                device_timestamp: None,
            },
            timestamp: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.meta.width
    }

    pub fn height(&self) -> u32 {
        self.meta.height
    }

    pub fn format(&self) -> PixelFormat {
        self.meta.format
    }

    /// A frame with the same metadata and timestamp but new pixels.
    pub fn with_pixels(&self, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            data: Bytes::from(data),
            meta: self.meta,
            timestamp: self.timestamp,
        }
    }

    /// A frame with new pixels in a different channel order.
    pub fn with_pixels_as(&self, data: Vec<u8>, format: PixelFormat) -> Self {
        let mut frame = self.with_pixels(data);
        frame.meta.format = format;
        frame
    }

    /// Three bytes of the pixel at (x, y), in the frame's channel order.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let at = (y * self.meta.stride + x * 3) as usize;
        [self.data[at], self.data[at + 1], self.data[at + 2]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_computes_stride() {
        let frame = Frame::new(vec![0u8; 4 * 2 * 3], 4, 2, PixelFormat::Bgr24, 7);
        assert_eq!(frame.meta.stride, 12);
        assert_eq!(frame.meta.sequence, 7);
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
    }

    #[test]
    fn pixel_reads_row_major() {
        let mut data = vec![0u8; 2 * 2 * 3];
        data[9..12].copy_from_slice(&[1, 2, 3]);
        let frame = Frame::new(data, 2, 2, PixelFormat::Bgr24, 0);
        assert_eq!(frame.pixel(1, 1), [1, 2, 3]);
        assert_eq!(frame.pixel(0, 1), [0, 0, 0]);
    }

    #[test]
    fn with_pixels_as_keeps_metadata() {
        let frame = Frame::new(vec![5u8; 3], 1, 1, PixelFormat::Bgr24, 3);
        let out = frame.with_pixels_as(vec![1, 2, 3], PixelFormat::Rgb24);
        assert_eq!(out.meta.sequence, 3);
        assert_eq!(out.format(), PixelFormat::Rgb24);
        assert_eq!(&frame.data[..], &[5, 5, 5]);
    }
}
