//! Per-pixel color transforms on packed BGR24 buffers.

// BT.601 luma, 14 fractional bits
const GRAY_SHIFT: u32 = 14;
const B2Y: u32 = 1868;
const G2Y: u32 = 9617;
const R2Y: u32 = 4899;

const HSV_SHIFT: i32 = 12;
/// Hue range of 8-bit HSV (degrees / 2).
const HUE_RANGE: i32 = 180;

/// Inclusive lower HSV bound of the blue band.
pub const BLUE_LOWER: [u8; 3] = [100, 50, 50];
/// Inclusive upper HSV bound of the blue band.
pub const BLUE_UPPER: [u8; 3] = [130, 255, 255];

/// Sepia rows producing blue, green, red from (red, green, blue) input.
const SEPIA: [[f64; 3]; 3] = [
    [0.272, 0.534, 0.131],
    [0.349, 0.686, 0.168],
    [0.393, 0.769, 0.189],
];

/// Luma of one BGR pixel.
#[inline]
pub fn luma(b: u8, g: u8, r: u8) -> u8 {
    let y = u32::from(b) * B2Y + u32::from(g) * G2Y + u32::from(r) * R2Y;
    ((y + (1 << (GRAY_SHIFT - 1))) >> GRAY_SHIFT) as u8
}

/// Single-channel luma plane.
pub fn bgr_to_gray(src: &[u8]) -> Vec<u8> {
    src.chunks_exact(3).map(|p| luma(p[0], p[1], p[2])).collect()
}

/// Replicate a single-channel plane into three equal channels.
pub fn gray_to_bgr(gray: &[u8]) -> Vec<u8> {
    gray.iter().flat_map(|&v| [v, v, v]).collect()
}

pub fn invert(src: &[u8]) -> Vec<u8> {
    src.iter().map(|&v| !v).collect()
}

/// Classic sepia tone. Channel values are clamped to 0..=255 and truncated.
pub fn sepia(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len());
    for p in src.chunks_exact(3) {
        let rgb = [f64::from(p[2]), f64::from(p[1]), f64::from(p[0])];
        for row in &SEPIA {
            let v = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2];
            out.push(v.clamp(0.0, 255.0) as u8);
        }
    }
    out
}

fn hue_div(i: i32) -> i32 {
    if i == 0 {
        0
    } else {
        (f64::from(HUE_RANGE << HSV_SHIFT) / (6.0 * f64::from(i))).round() as i32
    }
}

fn sat_div(i: i32) -> i32 {
    if i == 0 {
        0
    } else {
        (f64::from(255 << HSV_SHIFT) / f64::from(i)).round() as i32
    }
}

/// 8-bit HSV of one BGR pixel: hue in 0..180, saturation and value in 0..=255.
pub fn bgr_to_hsv(b: u8, g: u8, r: u8) -> [u8; 3] {
    let (b, g, r) = (i32::from(b), i32::from(g), i32::from(r));
    let v = b.max(g).max(r);
    let diff = v - b.min(g).min(r);
    let round = 1 << (HSV_SHIFT - 1);

    let s = (diff * sat_div(v) + round) >> HSV_SHIFT;

    let h = if v == r {
        g - b
    } else if v == g {
        b - r + 2 * diff
    } else {
        r - g + 4 * diff
    };
    let mut h = (h * hue_div(diff) + round) >> HSV_SHIFT;
    if h < 0 {
        h += HUE_RANGE;
    }

    [h as u8, s as u8, v as u8]
}

/// Keep pixels whose HSV lies inside `[lower, upper]` on every channel; zero the rest.
pub fn hsv_threshold(src: &[u8], lower: [u8; 3], upper: [u8; 3]) -> Vec<u8> {
    let mut out = vec![0u8; src.len()];
    for (dst, p) in out.chunks_exact_mut(3).zip(src.chunks_exact(3)) {
        let hsv = bgr_to_hsv(p[0], p[1], p[2]);
        let inside = (0..3).all(|c| lower[c] <= hsv[c] && hsv[c] <= upper[c]);
        if inside {
            dst.copy_from_slice(p);
        }
    }
    out
}

/// Swap capture order (BGR) to display order (RGB) and flip rows so the
/// first row in the output is the bottom row of the input.
pub fn bgr_to_rgb_flipped(src: &[u8], width: usize, height: usize) -> Vec<u8> {
    let stride = width * 3;
    if stride == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(src.len());
    for row in src.chunks_exact(stride).take(height).rev() {
        for p in row.chunks_exact(3) {
            out.extend_from_slice(&[p[2], p[1], p[0]]);
        }
    }
    out
}
