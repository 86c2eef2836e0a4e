//! V4L2 camera capture through mmap buffers

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::capture::decoder::decode_frame;
use crate::capture::frame::{Frame, PixelFormat};
use crate::capture::source::{CaptureError, CaptureState, FrameSource, Result};
use crate::utils;
use crate::CaptureConfig;

/// Camera handle plus its negotiated stream.
struct Stream {
    // Declared first so it is dropped before the device
    stream: MmapStream<'static>,
    _device: Device,
    width: u32,
    height: u32,
    format: PixelFormat,
}

/// V4L2 frame source
pub struct V4l2Source {
    config: CaptureConfig,
    stream: Option<Stream>,
    state: CaptureState,
    sequence: u64,
}

impl V4l2Source {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stream: None,
            state: CaptureState::Closed,
            sequence: 0,
        }
    }

    fn device_path(&self) -> Result<(String, PixelFormat)> {
        if self.config.device == "auto" {
            let found = utils::auto_detect_device()?;
            return Ok((found.path, found.format));
        }
        Ok((self.config.device.clone(), self.config.format))
    }

    fn connect(&self) -> Result<Stream> {
        let (path, format) = self.device_path()?;
        let open_err = |reason: String| CaptureError::DeviceOpen {
            device: path.clone(),
            reason,
        };

        let device = Device::with_path(&path).map_err(|e| open_err(e.to_string()))?;

        let caps = device.query_caps().map_err(|e| open_err(e.to_string()))?;
        info!("Device: {} ({})", caps.card, caps.driver);
        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(open_err("device doesn't support video capture".into()));
        }

        let mut fmt = device.format().map_err(|e| open_err(e.to_string()))?;
        fmt.width = self.config.width;
        fmt.height = self.config.height;
        fmt.fourcc = fourcc(format);
        let fmt = device
            .set_format(&fmt)
            .map_err(|e| open_err(e.to_string()))?;

        let format = pixel_format(fmt.fourcc).ok_or_else(|| {
            CaptureError::Unsupported(format!("driver chose {}", fmt.fourcc))
        })?;

        if self.config.fps > 0 {
            if let Err(e) = device.set_params(&Parameters::with_fps(self.config.fps)) {
                warn!("Failed to set {} fps on {}: {}", self.config.fps, path, e);
            }
        }

        let stream =
            MmapStream::with_buffers(&device, Type::VideoCapture, self.config.buffer_count)
                .map_err(|e| open_err(e.to_string()))?;

        info!(
            "Capture stream started on {} ({}x{} {:?}, {} buffers)",
            path, fmt.width, fmt.height, format, self.config.buffer_count
        );

        Ok(Stream {
            stream,
            _device: device,
            width: fmt.width,
            height: fmt.height,
            format,
        })
    }
}

fn fourcc(format: PixelFormat) -> FourCC {
    match format {
        PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
        PixelFormat::Yuyv4 => FourCC::new(b"YUYV"),
        PixelFormat::Rgb24 => FourCC::new(b"RGB3"),
        PixelFormat::Bgr24 => FourCC::new(b"BGR3"),
    }
}

fn pixel_format(fourcc: FourCC) -> Option<PixelFormat> {
    match &fourcc.repr {
        b"MJPG" => Some(PixelFormat::Mjpeg),
        b"YUYV" => Some(PixelFormat::Yuyv4),
        b"RGB3" => Some(PixelFormat::Rgb24),
        b"BGR3" => Some(PixelFormat::Bgr24),
        _ => None,
    }
}

impl FrameSource for V4l2Source {
    #[instrument(skip(self), fields(device = %self.config.device))]
    fn open(&mut self) -> Result<()> {
        if self.state == CaptureState::Available {
            return Ok(());
        }

        match self.connect() {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = CaptureState::Available;
                Ok(())
            }
            Err(e) => {
                self.stream = None;
                self.state = CaptureState::Unavailable;
                Err(e)
            }
        }
    }

    fn read(&mut self) -> Option<Frame> {
        let stream = self.stream.as_mut()?;
        let timestamp = Instant::now();

        let (buf, meta) = match stream.stream.next() {
            Ok(next) => next,
            Err(e) => {
                debug!("Capture miss: {}", e);
                return None;
            }
        };

        let used = (meta.bytesused as usize).min(buf.len());
        let pixels = match decode_frame(&buf[..used], stream.format, stream.width, stream.height)
        {
            Ok(pixels) => pixels,
            Err(e) => {
                debug!("Dropping undecodable buffer: {}", e);
                return None;
            }
        };

        self.sequence += 1;
        let mut frame = Frame::new(
            pixels,
            stream.width,
            stream.height,
            PixelFormat::Bgr24,
            self.sequence,
        );
        frame.timestamp = timestamp;
        frame.meta.device_timestamp = Some(
            Duration::from_secs(meta.timestamp.sec as u64)
                + Duration::from_micros(meta.timestamp.usec as u64),
        );
        Some(frame)
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            info!("Released capture device {}", self.config.device);
        }
        self.state = CaptureState::Closed;
    }

    fn state(&self) -> CaptureState {
        self.state
    }

    fn describe(&self) -> String {
        format!("{} (v4l2)", self.config.device)
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        self.release();
    }
}
