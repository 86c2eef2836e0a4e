use crate::capture::frame::PixelFormat;
use crate::capture::source::{CaptureError, Result};
use tracing::info;
use v4l::{capability::Flags, video::Capture, Device, FourCC};

// Detected capture device info
#[derive(Debug, Clone)]
pub struct FoundDevice {
    pub path: String,
    pub format: PixelFormat,
}

/// Probe `/dev/video0..9` for the first capture device, preferring MJPEG.
pub fn auto_detect_device() -> Result<FoundDevice> {
    use std::path::Path;

    info!("Auto-detecting capture devices...");

    for i in 0..10 {
        let path = format!("/dev/video{}", i);
        if !Path::new(&path).exists() {
            continue;
        }

        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            continue;
        }
        let Ok(formats) = dev.enum_formats() else {
            continue;
        };

        let has = |code: &[u8; 4]| formats.iter().any(|f| f.fourcc == FourCC::new(code));
        if has(b"MJPG") {
            info!("Found MJPEG device: {} - {}", path, caps.card);
            return Ok(FoundDevice {
                path,
                format: PixelFormat::Mjpeg,
            });
        }
        if has(b"YUYV") {
            info!("Found YUYV device: {} - {}", path, caps.card);
            return Ok(FoundDevice {
                path,
                format: PixelFormat::Yuyv4,
            });
        }
    }

    Err(CaptureError::DeviceOpen {
        device: "auto".into(),
        reason: "no suitable capture device found".into(),
    })
}
