pub mod decoder;
pub mod frame;
pub mod source;
pub mod synthetic;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use frame::Frame;
pub use frame::PixelFormat;
pub use source::{CaptureError, CaptureState, FrameSource};
pub use synthetic::SyntheticSource;
#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Source;

use crate::CaptureConfig;

/// Build the source named by `config.device`.
///
/// `stub://` paths select the synthetic device; anything else needs the
/// `v4l2` feature and falls back to an absent synthetic device without it.
pub fn build_source(config: &CaptureConfig) -> Box<dyn FrameSource> {
    if config.device.starts_with("stub://") {
        return Box::new(SyntheticSource::new(
            &config.device,
            config.width,
            config.height,
        ));
    }

    #[cfg(feature = "v4l2")]
    return Box::new(V4l2Source::new(config.clone()));

    #[cfg(not(feature = "v4l2"))]
    {
        tracing::warn!(
            "Built without v4l2 support, {} will report as unavailable",
            config.device
        );
        Box::new(SyntheticSource::new("stub://absent", config.width, config.height))
    }
}
