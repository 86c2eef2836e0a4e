//! Fixed catalog of per-frame filters.
//!
//! Every filter takes a BGR24 frame and returns a new BGR24 frame of the same
//! dimensions. The input is never modified.

pub mod color;
pub mod convolve;
pub mod edge;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::capture::{Frame, PixelFormat};

/// Filter applied to each captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FilterSelector {
    #[default]
    None = 0,
    Gray = 1,
    Blur = 2,
    Edge = 3,
    Sharpen = 4,
    Emboss = 5,
    Sepia = 6,
    Invert = 7,
    HsvThreshold = 8,
}

impl FilterSelector {
    /// Catalog in control-surface order.
    pub const ALL: [FilterSelector; 9] = [
        FilterSelector::None,
        FilterSelector::Gray,
        FilterSelector::Blur,
        FilterSelector::Edge,
        FilterSelector::Sharpen,
        FilterSelector::Emboss,
        FilterSelector::Sepia,
        FilterSelector::Invert,
        FilterSelector::HsvThreshold,
    ];

    /// Wire name used by configuration and `select_by_name`.
    pub fn name(self) -> &'static str {
        match self {
            FilterSelector::None => "none",
            FilterSelector::Gray => "gray",
            FilterSelector::Blur => "blur",
            FilterSelector::Edge => "edge",
            FilterSelector::Sharpen => "sharpen",
            FilterSelector::Emboss => "emboss",
            FilterSelector::Sepia => "sepia",
            FilterSelector::Invert => "invert",
            FilterSelector::HsvThreshold => "hsv_threshold",
        }
    }

    /// Button label.
    pub fn label(self) -> &'static str {
        match self {
            FilterSelector::None => "None",
            FilterSelector::Gray => "Grayscale",
            FilterSelector::Blur => "Blur",
            FilterSelector::Edge => "Edge Detection",
            FilterSelector::Sharpen => "Sharpen",
            FilterSelector::Emboss => "Emboss",
            FilterSelector::Sepia => "Sepia",
            FilterSelector::Invert => "Invert",
            FilterSelector::HsvThreshold => "Blue HSV",
        }
    }

    /// Look up a filter by wire name. Unknown names select [`FilterSelector::None`].
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.name() == name)
            .unwrap_or_default()
    }

    /// Decode the atomic representation. Unknown codes select [`FilterSelector::None`].
    pub fn from_u8(code: u8) -> Self {
        Self::ALL.get(code as usize).copied().unwrap_or_default()
    }
}

impl fmt::Display for FilterSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Unknown names deserialize to `None` rather than failing
impl<'de> Deserialize<'de> for FilterSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

impl FromStr for FilterSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

/// Apply `selector` to a BGR24 frame.
pub fn apply(frame: &Frame, selector: FilterSelector) -> Frame {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let src = &frame.data[..];

    let pixels = match selector {
        FilterSelector::None => return frame.clone(),
        FilterSelector::Gray => color::gray_to_bgr(&color::bgr_to_gray(src)),
        FilterSelector::Blur => convolve::gaussian_blur(src, w, h, convolve::BLUR_KERNEL_SIZE),
        FilterSelector::Edge => {
            let gray = color::bgr_to_gray(src);
            let edges = edge::canny(&gray, w, h, edge::LOW_THRESHOLD, edge::HIGH_THRESHOLD);
            color::gray_to_bgr(&edges)
        }
        FilterSelector::Sharpen => convolve::filter3x3(src, w, h, &convolve::SHARPEN),
        FilterSelector::Emboss => convolve::filter3x3(src, w, h, &convolve::EMBOSS),
        FilterSelector::Sepia => color::sepia(src),
        FilterSelector::Invert => color::invert(src),
        FilterSelector::HsvThreshold => {
            color::hsv_threshold(src, color::BLUE_LOWER, color::BLUE_UPPER)
        }
    };

    frame.with_pixels(pixels)
}

/// Convert a processed BGR24 frame to display order: RGB24, rows flipped
/// so the bottom row comes first.
pub fn to_display(frame: &Frame) -> Frame {
    let pixels = color::bgr_to_rgb_flipped(
        &frame.data,
        frame.width() as usize,
        frame.height() as usize,
    );
    frame.with_pixels_as(pixels, PixelFormat::Rgb24)
}

/// Holds the currently selected filter.
///
/// Clones share the same selection, so the control surface and the tick
/// loop can live on different threads. The selection is a single atomic
/// byte; readers never observe a partial write.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    current: Arc<AtomicU8>,
}

impl FilterEngine {
    pub fn new(initial: FilterSelector) -> Self {
        Self {
            current: Arc::new(AtomicU8::new(initial as u8)),
        }
    }

    /// Change the filter used from the next processed frame on.
    pub fn select(&self, selector: FilterSelector) {
        self.current.store(selector as u8, Ordering::Release);
    }

    pub fn selected(&self) -> FilterSelector {
        FilterSelector::from_u8(self.current.load(Ordering::Acquire))
    }

    /// Apply an explicit filter.
    pub fn apply(&self, frame: &Frame, selector: FilterSelector) -> Frame {
        apply(frame, selector)
    }

    /// Apply the selected filter, returning which one was used.
    pub fn process(&self, frame: &Frame) -> (FilterSelector, Frame) {
        let selector = self.selected();
        (selector, apply(frame, selector))
    }
}
