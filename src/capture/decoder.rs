//! Raw device buffers to packed BGR24, the capture color order.

use jpeg_decoder::{Decoder, PixelFormat as JpegFormat};

use super::frame::PixelFormat;
use super::source::{CaptureError, Result};

// BT.601 fixed-point coefficients, 20 fractional bits
const YUV_SHIFT: i32 = 20;
const CY: i32 = 1_220_542;
const CUB: i32 = 2_116_026;
const CUG: i32 = -409_993;
const CVG: i32 = -852_492;
const CVR: i32 = 1_673_527;

/// Decode one device buffer into `width * height * 3` bytes of BGR.
pub fn decode_frame(data: &[u8], format: PixelFormat, width: u32, height: u32) -> Result<Vec<u8>> {
    match format {
        PixelFormat::Mjpeg => decode_mjpeg(data, width, height),
        PixelFormat::Bgr24 => packed(data, format, width, height).map(<[u8]>::to_vec),
        PixelFormat::Rgb24 => packed(data, format, width, height).map(swap_red_blue),
        PixelFormat::Yuyv4 => packed(data, format, width, height).map(yuyv_to_bgr),
    }
}

/// The leading `width * height` pixels of an uncompressed buffer.
fn packed(data: &[u8], format: PixelFormat, width: u32, height: u32) -> Result<&[u8]> {
    let bpp = format
        .bytes_per_pixel()
        .ok_or_else(|| CaptureError::Unsupported(format!("{:?} is not a packed format", format)))?;
    let needed = (width * height * bpp) as usize;
    if data.len() < needed {
        return Err(CaptureError::Decode(format!(
            "short buffer: {} bytes, expected {}",
            data.len(),
            needed
        )));
    }
    Ok(&data[..needed])
}

fn decode_mjpeg(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut decoder = Decoder::new(data);
    let pixels = decoder
        .decode()
        .map_err(|e| CaptureError::Decode(e.to_string()))?;
    let info = decoder
        .info()
        .ok_or_else(|| CaptureError::Decode("missing JPEG header".into()))?;

    if u32::from(info.width) != width || u32::from(info.height) != height {
        return Err(CaptureError::Decode(format!(
            "JPEG is {}x{}, stream negotiated {}x{}",
            info.width, info.height, width, height
        )));
    }

    match info.pixel_format {
        JpegFormat::RGB24 => Ok(swap_red_blue(&pixels)),
        JpegFormat::L8 => Ok(pixels.iter().flat_map(|&l| [l, l, l]).collect()),
        other => Err(CaptureError::Unsupported(format!("JPEG {:?}", other))),
    }
}

/// Reverse the channel order of every packed 3-byte pixel.
pub fn swap_red_blue(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for px in data.chunks_exact(3) {
        out.extend_from_slice(&[px[2], px[1], px[0]]);
    }
    out
}

fn yuyv_to_bgr(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 2 * 3);
    for quad in data.chunks_exact(4) {
        let u = i32::from(quad[1]) - 128;
        let v = i32::from(quad[3]) - 128;
        for y in [quad[0], quad[2]] {
            let y = (i32::from(y) - 16).max(0) * CY;
            let round = 1 << (YUV_SHIFT - 1);
            let r = (y + CVR * v + round) >> YUV_SHIFT;
            let g = (y + CVG * v + CUG * u + round) >> YUV_SHIFT;
            let b = (y + CUB * u + round) >> YUV_SHIFT;
            out.extend_from_slice(&[clamp_u8(b), clamp_u8(g), clamp_u8(r)]);
        }
    }
    out
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}
