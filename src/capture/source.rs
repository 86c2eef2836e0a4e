use thiserror::Error;

use super::frame::Frame;

/// Lifecycle of a capture device handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No device handle held.
    Closed,
    /// Device opened and delivering frames.
    Available,
    /// Last open attempt failed; reads are not attempted until the next open.
    Unavailable,
}

/// Capture subsystem errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("could not open capture device {device}: {reason}")]
    DeviceOpen { device: String, reason: String },

    #[error("unsupported capture format: {0}")]
    Unsupported(String),

    #[error("frame read failed: {0}")]
    FrameRead(#[from] std::io::Error),

    #[error("frame decode failed: {0}")]
    Decode(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// A device that produces raw frames on demand.
///
/// Implementations own their device handle exclusively. None of the methods
/// may panic on a missing or busy device; failures surface as state.
pub trait FrameSource: Send {
    /// Acquire the device. Calling this while [`CaptureState::Available`]
    /// is a no-op returning `Ok`. On failure the source moves to
    /// [`CaptureState::Unavailable`].
    fn open(&mut self) -> Result<()>;

    /// Capture one frame in capture color order (BGR24).
    ///
    /// `None` means no new frame was delivered this call; the device stays
    /// open and the caller simply skips the tick.
    fn read(&mut self) -> Option<Frame>;

    /// Drop the device handle if held. Idempotent.
    fn release(&mut self);

    fn state(&self) -> CaptureState;

    /// Human readable device name for logs.
    fn describe(&self) -> String;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn read(&mut self) -> Option<Frame> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn state(&self) -> CaptureState {
        (**self).state()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
