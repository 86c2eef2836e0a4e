//! Canny edge detection on a single-channel luma plane.

use std::collections::VecDeque;

pub const LOW_THRESHOLD: i32 = 50;
pub const HIGH_THRESHOLD: i32 = 150;

/// tan(22.5°) with 15 fractional bits.
const TG22: i64 = 13_573;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeClass {
    None,
    Weak,
    Strong,
}

/// Binary edge map (0 or 255) of `gray`.
pub fn canny(gray: &[u8], width: usize, height: usize, low: i32, high: i32) -> Vec<u8> {
    let (dx, dy) = sobel(gray, width, height);
    let mag: Vec<i32> = dx.iter().zip(&dy).map(|(x, y)| x.abs() + y.abs()).collect();
    let classes = suppress_non_maxima(&dx, &dy, &mag, width, height, low, high);
    hysteresis(&classes, width, height)
}

/// 3×3 Sobel derivatives with replicated borders.
pub fn sobel(gray: &[u8], width: usize, height: usize) -> (Vec<i32>, Vec<i32>) {
    let at = |x: isize, y: isize| -> i32 {
        let x = x.clamp(0, width as isize - 1) as usize;
        let y = y.clamp(0, height as isize - 1) as usize;
        i32::from(gray[y * width + x])
    };

    let mut dx = vec![0i32; width * height];
    let mut dy = vec![0i32; width * height];
    for y in 0..height as isize {
        for x in 0..width as isize {
            let i = y as usize * width + x as usize;
            dx[i] = (at(x + 1, y - 1) + 2 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2 * at(x - 1, y) + at(x - 1, y + 1));
            dy[i] = (at(x - 1, y + 1) + 2 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2 * at(x, y - 1) + at(x + 1, y - 1));
        }
    }
    (dx, dy)
}

fn suppress_non_maxima(
    dx: &[i32],
    dy: &[i32],
    mag: &[i32],
    width: usize,
    height: usize,
    low: i32,
    high: i32,
) -> Vec<EdgeClass> {
    // Magnitude outside the image counts as zero
    let m_at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= width as isize || y >= height as isize {
            0
        } else {
            mag[y as usize * width + x as usize]
        }
    };

    let mut classes = vec![EdgeClass::None; width * height];
    for y in 0..height as isize {
        for x in 0..width as isize {
            let i = y as usize * width + x as usize;
            let m = mag[i];
            if m <= low {
                continue;
            }

            let gx = i64::from(dx[i].abs());
            let gy = i64::from(dy[i].abs()) << 15;
            let tg22x = gx * TG22;

            let is_max = if gy < tg22x {
                m > m_at(x - 1, y) && m >= m_at(x + 1, y)
            } else {
                let tg67x = tg22x + (gx << 16);
                if gy > tg67x {
                    m > m_at(x, y - 1) && m >= m_at(x, y + 1)
                } else {
                    let s = if (dx[i] ^ dy[i]) < 0 { -1 } else { 1 };
                    m > m_at(x - s, y - 1) && m > m_at(x + s, y + 1)
                }
            };

            if is_max {
                classes[i] = if m > high {
                    EdgeClass::Strong
                } else {
                    EdgeClass::Weak
                };
            }
        }
    }
    classes
}

/// Keep strong pixels plus weak pixels 8-connected to a strong one.
pub fn hysteresis(classes: &[EdgeClass], width: usize, height: usize) -> Vec<u8> {
    let mut out = vec![0u8; width * height];
    let mut queue: VecDeque<usize> = VecDeque::new();

    for (i, class) in classes.iter().enumerate() {
        if *class == EdgeClass::Strong {
            out[i] = 255;
            queue.push_back(i);
        }
    }

    while let Some(i) = queue.pop_front() {
        let (x, y) = ((i % width) as isize, (i / width) as isize);
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                    continue;
                }
                let n = ny as usize * width + nx as usize;
                if out[n] == 0 && classes[n] == EdgeClass::Weak {
                    out[n] = 255;
                    queue.push_back(n);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_image_has_no_edges() {
        let gray = vec![80u8; 12 * 9];
        assert!(canny(&gray, 12, 9, LOW_THRESHOLD, HIGH_THRESHOLD)
            .iter()
            .all(|&v| v == 0));
    }

    #[test]
    fn vertical_step_gives_single_column() {
        let (w, h) = (8, 5);
        let gray: Vec<u8> = (0..w * h)
            .map(|i| if i % w < 4 { 0 } else { 200 })
            .collect();
        let edges = canny(&gray, w, h, LOW_THRESHOLD, HIGH_THRESHOLD);
        for y in 0..h {
            for x in 0..w {
                let expected = if x == 3 { 255 } else { 0 };
                assert_eq!(edges[y * w + x], expected, "({x}, {y})");
            }
        }
    }

    #[test]
    fn faint_step_below_low_threshold_is_ignored() {
        let (w, h) = (8, 5);
        // |dx| = 4 * 10 = 40 <= 50
        let gray: Vec<u8> = (0..w * h)
            .map(|i| if i % w < 4 { 100 } else { 110 })
            .collect();
        assert!(canny(&gray, w, h, LOW_THRESHOLD, HIGH_THRESHOLD)
            .iter()
            .all(|&v| v == 0));
    }

    #[test]
    fn hysteresis_keeps_only_connected_weak_pixels() {
        use EdgeClass::{None as N, Strong as S, Weak as W};
        #[rustfmt::skip]
        let classes = [
            S, W, N, N, N,
            N, N, W, N, N,
            N, N, N, N, W,
        ];
        let out = hysteresis(&classes, 5, 3);
        #[rustfmt::skip]
        let expected: [u8; 15] = [
            255, 255, 0, 0, 0,
            0,   0, 255, 0, 0,
            0,   0,   0, 0, 0,
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn sobel_detects_vertical_gradient() {
        let gray = [0u8, 0, 0, 10, 10, 10, 20, 20, 20];
        let (dx, dy) = sobel(&gray, 3, 3);
        assert_eq!(dx[4], 0);
        // row below sums to 4 * 20, row above to 0
        assert_eq!(dy[4], 80);
    }
}
