//! Neighbourhood filters on packed BGR24 buffers.
//!
//! Borders are handled by reflect-101 (`dcb|abcd|cba`), channels are filtered
//! independently and results saturate to 0..=255.

/// Side of the square Gaussian kernel used by the blur filter.
pub const BLUR_KERNEL_SIZE: usize = 15;

pub const SHARPEN: [[i32; 3]; 3] = [[-1, -1, -1], [-1, 9, -1], [-1, -1, -1]];

pub const EMBOSS: [[i32; 3]; 3] = [[-2, -1, 0], [-1, 1, 1], [0, 1, 2]];

/// Map an out-of-range coordinate back into `0..n` by mirroring without
/// repeating the edge sample.
#[inline]
pub fn reflect_101(mut i: isize, n: usize) -> usize {
    let n = n as isize;
    if n == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Sigma used when none is given: `0.3 * ((k - 1) * 0.5 - 1) + 0.8`.
pub fn derived_sigma(ksize: usize) -> f64 {
    (ksize as f64).mul_add(0.15, 0.35)
}

/// Fractional bits of the fixed-point Gaussian weights.
const KERNEL_BITS: u32 = 8;

/// 1-D Gaussian weights of odd length `ksize` in fixed point with
/// [`KERNEL_BITS`] fractional bits, summing to exactly `1 << KERNEL_BITS`.
///
/// Quantisation error of each tail weight is carried into the next one and
/// the centre takes whatever is left.
pub fn gaussian_kernel(ksize: usize) -> Vec<u16> {
    let sigma = derived_sigma(ksize);
    let scale = -0.125 / (sigma * sigma);
    let half = ksize / 2;

    // Doubled offsets keep the even-sized case integral
    let tail: Vec<f64> = (0..half)
        .map(|i| {
            let x = 2 * i as i64 + 1 - ksize as i64;
            ((x * x) as f64 * scale).exp()
        })
        .collect();
    let sum = 2.0 * tail.iter().sum::<f64>() + 1.0;

    let one = 1i64 << KERNEL_BITS;
    let mut kernel = vec![0u16; ksize];
    let mut err = 0.0;
    let mut total = 0i64;
    for (i, t) in tail.iter().enumerate() {
        let adjusted = t / sum * one as f64 + err;
        let v = round_half_even(adjusted);
        err = adjusted - v as f64;
        kernel[i] = v as u16;
        kernel[ksize - 1 - i] = v as u16;
        total += v;
    }
    kernel[half] = (one - 2 * total) as u16;
    kernel
}

fn round_half_even(v: f64) -> i64 {
    let r = v.round();
    if (v - v.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
        (r - v.signum()) as i64
    } else {
        r as i64
    }
}

/// Separable Gaussian smoothing with a `ksize`×`ksize` kernel.
///
/// The horizontal pass keeps 8 fractional bits in `u16`, the vertical pass
/// accumulates 16 in `u32` and rounds half up on the way back to `u8`.
pub fn gaussian_blur(src: &[u8], width: usize, height: usize, ksize: usize) -> Vec<u8> {
    let kernel = gaussian_kernel(ksize);
    let radius = (ksize / 2) as isize;
    let stride = width * 3;

    let mut horizontal = vec![0u16; src.len()];
    for y in 0..height {
        let row = &src[y * stride..(y + 1) * stride];
        for x in 0..width {
            let mut acc = [0u16; 3];
            for (k, &w) in kernel.iter().enumerate() {
                let sx = reflect_101(x as isize + k as isize - radius, width);
                for c in 0..3 {
                    acc[c] = acc[c].saturating_add(w * u16::from(row[sx * 3 + c]));
                }
            }
            horizontal[y * stride + x * 3..y * stride + x * 3 + 3].copy_from_slice(&acc);
        }
    }

    let round = 1u32 << (2 * KERNEL_BITS - 1);
    let mut out = vec![0u8; src.len()];
    for y in 0..height {
        for x in 0..width {
            let mut acc = [0u32; 3];
            for (k, &w) in kernel.iter().enumerate() {
                let sy = reflect_101(y as isize + k as isize - radius, height);
                let at = sy * stride + x * 3;
                for c in 0..3 {
                    acc[c] += u32::from(w) * u32::from(horizontal[at + c]);
                }
            }
            for c in 0..3 {
                out[y * stride + x * 3 + c] = ((acc[c] + round) >> (2 * KERNEL_BITS)).min(255) as u8;
            }
        }
    }
    out
}

/// 3×3 correlation (kernel not flipped) anchored at the centre.
pub fn filter3x3(src: &[u8], width: usize, height: usize, kernel: &[[i32; 3]; 3]) -> Vec<u8> {
    let stride = width * 3;
    let mut out = vec![0u8; src.len()];

    for y in 0..height {
        for x in 0..width {
            let mut acc = [0i32; 3];
            for (ky, krow) in kernel.iter().enumerate() {
                let sy = reflect_101(y as isize + ky as isize - 1, height);
                for (kx, &w) in krow.iter().enumerate() {
                    if w == 0 {
                        continue;
                    }
                    let sx = reflect_101(x as isize + kx as isize - 1, width);
                    let at = sy * stride + sx * 3;
                    for c in 0..3 {
                        acc[c] += w * i32::from(src[at + c]);
                    }
                }
            }
            for c in 0..3 {
                out[y * stride + x * 3 + c] = acc[c].clamp(0, 255) as u8;
            }
        }
    }
    out
}
