#[cfg(feature = "sdl-display")]
pub mod display;

#[cfg(feature = "sdl-display")]
pub use display::Sdl2Display;

use flume::{Sender, TrySendError};
use tracing::{debug, info};

use crate::capture::Frame;

/// Receives processed frames in display order (RGB24, bottom row first).
///
/// Presentation is fire-and-forget: implementations must not block the tick
/// loop waiting for rendering.
pub trait DisplaySink: Send {
    fn present(&mut self, frame: Frame);
}

/// Hands frames to a UI thread through a single-slot channel.
///
/// When the UI has not taken the previous frame yet, the new one is dropped.
pub struct ChannelSink {
    tx: Sender<Frame>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Frame>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end for the renderer.
    pub fn pair() -> (Self, flume::Receiver<Frame>) {
        let (tx, rx) = flume::bounded(1);
        (Self::new(tx), rx)
    }
}

impl DisplaySink for ChannelSink {
    fn present(&mut self, frame: Frame) {
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(frame)) => {
                debug!("Display busy, dropped frame {}", frame.meta.sequence);
                metrics::counter!("display_frames_dropped").increment(1);
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Display closed");
            }
        }
    }
}

/// Sink for runs without a window: logs every `every`th frame.
pub struct HeadlessSink {
    every: u64,
    presented: u64,
}

impl HeadlessSink {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            presented: 0,
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl DisplaySink for HeadlessSink {
    fn present(&mut self, frame: Frame) {
        self.presented += 1;
        if self.presented % self.every == 0 {
            info!(
                "Presented frame {} ({}x{}, latency {:?})",
                frame.meta.sequence,
                frame.width(),
                frame.height(),
                frame.timestamp.elapsed()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PixelFormat;

    fn frame(seq: u64) -> Frame {
        Frame::new(vec![0u8; 3], 1, 1, PixelFormat::Rgb24, seq)
    }

    #[test]
    fn channel_sink_keeps_one_frame_in_flight() {
        let (mut sink, rx) = ChannelSink::pair();
        sink.present(frame(1));
        sink.present(frame(2));

        assert_eq!(rx.try_recv().unwrap().meta.sequence, 1);
        assert!(rx.try_recv().is_err());

        sink.present(frame(3));
        assert_eq!(rx.try_recv().unwrap().meta.sequence, 3);
    }

    #[test]
    fn channel_sink_survives_closed_display() {
        let (mut sink, rx) = ChannelSink::pair();
        drop(rx);
        sink.present(frame(1));
    }

    #[test]
    fn headless_sink_counts() {
        let mut sink = HeadlessSink::new(2);
        for seq in 0..5 {
            sink.present(frame(seq));
        }
        assert_eq!(sink.presented(), 5);
    }
}
