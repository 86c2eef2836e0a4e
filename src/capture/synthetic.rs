//! Synthetic capture device.
//!
//! Selected with `stub://` device paths. Produces a moving BGR test pattern
//! with a solid blue band across the middle third, so every filter in the
//! catalog has something to act on without camera hardware.
//!
//! - `stub://absent` behaves like a machine with no camera: `open()` fails.
//! - `stub://flaky` drops every third read without closing the device.

use tracing::{debug, info};

use super::frame::{Frame, PixelFormat};
use super::source::{CaptureError, CaptureState, FrameSource, Result};

/// Blue band color in BGR, hue 118 on the 0..180 scale.
pub const BAND_BGR: [u8; 3] = [200, 40, 30];

/// Synthetic frame source.
#[derive(Debug)]
pub struct SyntheticSource {
    device: String,
    width: u32,
    height: u32,
    present: bool,
    drop_every: Option<u64>,
    state: CaptureState,
    sequence: u64,
    reads_attempted: u64,
    opens_attempted: u64,
}

impl SyntheticSource {
    pub fn new(device: &str, width: u32, height: u32) -> Self {
        let kind = device.strip_prefix("stub://").unwrap_or(device);
        Self {
            device: device.to_string(),
            width,
            height,
            present: kind != "absent",
            drop_every: (kind == "flaky").then_some(3),
            state: CaptureState::Closed,
            sequence: 0,
            reads_attempted: 0,
            opens_attempted: 0,
        }
    }

    /// Number of `read()` calls made against the device.
    pub fn reads_attempted(&self) -> u64 {
        self.reads_attempted
    }

    pub fn opens_attempted(&self) -> u64 {
        self.opens_attempted
    }

    /// Render the pattern for a given sequence number.
    pub fn pattern(width: u32, height: u32, sequence: u64) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        let band = height / 3..(2 * height) / 3;
        let shift = (sequence % 64) as u32 * 4;
        for y in 0..height {
            for x in 0..width {
                if band.contains(&y) {
                    pixels.extend_from_slice(&BAND_BGR);
                    continue;
                }
                let b = ((x * 255) / width.max(1) + shift) % 256;
                let g = ((y * 255) / height.max(1)) % 256;
                let r = ((x + y) * 7 + shift) % 256;
                pixels.extend_from_slice(&[b as u8, g as u8, r as u8]);
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn open(&mut self) -> Result<()> {
        if self.state == CaptureState::Available {
            return Ok(());
        }
        self.opens_attempted += 1;

        if !self.present {
            self.state = CaptureState::Unavailable;
            debug!("Synthetic capture {} has no camera", self.device);
            return Err(CaptureError::DeviceOpen {
                device: self.device.clone(),
                reason: "no such device".into(),
            });
        }

        self.state = CaptureState::Available;
        info!(
            "Synthetic capture {} opened ({}x{})",
            self.device, self.width, self.height
        );
        Ok(())
    }

    fn read(&mut self) -> Option<Frame> {
        if self.state != CaptureState::Available {
            return None;
        }
        self.reads_attempted += 1;

        if let Some(n) = self.drop_every {
            if self.reads_attempted % n == 0 {
                debug!("Synthetic capture dropped read {}", self.reads_attempted);
                return None;
            }
        }

        self.sequence += 1;
        let pixels = Self::pattern(self.width, self.height, self.sequence);
        Some(Frame::new(
            pixels,
            self.width,
            self.height,
            PixelFormat::Bgr24,
            self.sequence,
        ))
    }

    fn release(&mut self) {
        if self.state != CaptureState::Closed {
            info!("Synthetic capture {} released", self.device);
        }
        self.state = CaptureState::Closed;
    }

    fn state(&self) -> CaptureState {
        self.state
    }

    fn describe(&self) -> String {
        format!("{} (synthetic {}x{})", self.device, self.width, self.height)
    }
}
