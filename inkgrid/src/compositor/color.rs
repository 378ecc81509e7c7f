//! Region color statistics.
//!
//! [`average_color`] is not consulted by tile selection; tiles are placed at
//! random. It is exposed for callers that want to score tiles themselves.

use image::{Rgba, RgbaImage};

const MAX_16: u64 = 0xffff;

/// Mean color of the `width × height` region at `(x, y)`.
///
/// Pixels are accumulated as 16-bit alpha-premultiplied channels, averaged,
/// then un-premultiplied and clamped to 8 bits. Pixels outside the image are
/// ignored. An empty region yields opaque black; a fully transparent region
/// yields transparent black.
pub fn average_color(image: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> Rgba<u8> {
    let x_end = x.saturating_add(width).min(image.width());
    let y_end = y.saturating_add(height).min(image.height());

    let mut sums = [0u64; 4];
    let mut count = 0u64;

    for py in y..y_end {
        for px in x..x_end {
            let [r, g, b, a] = image.get_pixel(px, py).0;
            let alpha = widen(a);
            sums[0] += premultiply(widen(r), alpha);
            sums[1] += premultiply(widen(g), alpha);
            sums[2] += premultiply(widen(b), alpha);
            sums[3] += alpha;
            count += 1;
        }
    }

    if count == 0 {
        return Rgba([0, 0, 0, 255]);
    }

    let alpha = sums[3] / count;
    if alpha == 0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |sum: u64| -> u8 {
        let straight = (sum / count) * MAX_16 / alpha;
        (straight >> 8).min(255) as u8
    };

    Rgba([
        channel(sums[0]),
        channel(sums[1]),
        channel(sums[2]),
        (alpha >> 8).min(255) as u8,
    ])
}

#[inline]
fn widen(value: u8) -> u64 {
    u64::from(value) * 257
}

#[inline]
fn premultiply(channel: u64, alpha: u64) -> u64 {
    channel * alpha / MAX_16
}
