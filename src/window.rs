// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The reading window
//!
//! Energy functions never see the buffer.  They get a small square of
//! pre-read values centred on the pixel being scored, addressed by
//! offset, with reads past the image border clamped to the border.
//! The values come from a per-pixel read cache (brightness or luma),
//! so the window is cheap to build and safe to share across threads.

use crate::cq;
use crate::pixels::PixelBuffer;
use crate::twodmap::TwoDimensionalMap;

/// What a reading window reads out of each pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadKind {
    /// Mean of the colour channels.
    Brightness,
    /// Rec. 709 luma for three-colour layouts, brightness otherwise.
    Luma,
}

// Colour channels are everything but alpha and black.
fn colour_channels(pixels: &PixelBuffer) -> impl Iterator<Item = usize> + '_ {
    (0..pixels.channels())
        .filter(move |c| Some(*c) != pixels.alpha_channel() && Some(*c) != pixels.black_channel())
}

fn brightness(pixels: &PixelBuffer, z: usize) -> f64 {
    let (sum, count) = colour_channels(pixels)
        .fold((0.0, 0usize), |(sum, count), c| (sum + pixels.unit_at(z, c), count + 1));
    let mean = cq!(count == 0, 0.0, sum / count as f64);
    if pixels.kind().is_subtractive() {
        let black = pixels.black_channel().map_or(0.0, |k| pixels.unit_at(z, k));
        (1.0 - mean) * (1.0 - black)
    } else {
        mean
    }
}

fn luma(pixels: &PixelBuffer, z: usize) -> f64 {
    let colours: Vec<usize> = colour_channels(pixels).collect();
    if colours.len() != 3 || pixels.kind().is_subtractive() {
        return brightness(pixels, z);
    }
    0.2126 * pixels.unit_at(z, colours[0])
        + 0.7152 * pixels.unit_at(z, colours[1])
        + 0.0722 * pixels.unit_at(z, colours[2])
}

/// Read one physical pixel, premultiplied by alpha when there is one.
pub(crate) fn read_pixel(pixels: &PixelBuffer, z: usize, kind: ReadKind) -> f64 {
    let value = match kind {
        ReadKind::Brightness => brightness(pixels, z),
        ReadKind::Luma => luma(pixels, z),
    };
    match pixels.alpha_channel() {
        Some(a) => value * pixels.unit_at(z, a),
        None => value,
    }
}

/// The read cache: one value per physical pixel.
pub(crate) fn read_cache(pixels: &PixelBuffer, kind: ReadKind) -> Vec<f64> {
    (0..pixels.width() * pixels.height())
        .map(|z| read_pixel(pixels, z, kind))
        .collect()
}

/// A view of the neighbourhood of one pixel, in logical (carved)
/// coordinates.
pub struct ReadingWindow<'a> {
    cache: &'a [f64],
    raw: &'a TwoDimensionalMap<usize>,
    mask: Option<f32>,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    radius: usize,
}

impl<'a> ReadingWindow<'a> {
    pub(crate) fn new(
        cache: &'a [f64],
        raw: &'a TwoDimensionalMap<usize>,
        mask: Option<f32>,
        (x, y): (usize, usize),
        (width, height): (usize, usize),
        radius: usize,
    ) -> Self {
        ReadingWindow {
            cache,
            raw,
            mask,
            x,
            y,
            width,
            height,
            radius,
        }
    }

    /// Read the value at an offset from the centre.  Offsets are limited
    /// to the radius, and positions outside the image are clamped to
    /// the nearest border pixel.
    pub fn read(&self, dx: isize, dy: isize) -> f64 {
        let r = self.radius as isize;
        debug_assert!(dx.abs() <= r && dy.abs() <= r, "read outside the window");
        let (dx, dy) = (dx.clamp(-r, r), dy.clamp(-r, r));
        let x = (self.x as isize + dx).clamp(0, self.width as isize - 1) as usize;
        let y = (self.y as isize + dy).clamp(0, self.height as isize - 1) as usize;
        self.cache[self.raw[(x, y)]]
    }

    /// The value of the companion mask (bias layer) at the centre, if
    /// the carver has one.
    pub fn mask(&self) -> Option<f32> {
        self.mask
    }

    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    /// Current logical width of the image being read.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Current logical height of the image being read.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn radius(&self) -> usize {
        self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::ImageKind;

    #[test]
    fn brightness_ignores_alpha_channel_but_premultiplies() {
        let pixels = PixelBuffer::new(1, 1, 4, vec![255u8, 0, 0, 255]).unwrap();
        let v = read_pixel(&pixels, 0, ReadKind::Brightness);
        assert!((v - 1.0 / 3.0).abs() < 1e-9);

        let pixels = PixelBuffer::new(1, 1, 2, vec![255u8, 0]).unwrap();
        assert_eq!(read_pixel(&pixels, 0, ReadKind::Brightness), 0.0);
    }

    #[test]
    fn subtractive_layouts_are_inverted() {
        let pixels = PixelBuffer::new(1, 1, 4, vec![0.0f32, 0.0, 0.0, 0.5])
            .unwrap()
            .with_kind(ImageKind::Cmyk)
            .unwrap();
        assert_eq!(read_pixel(&pixels, 0, ReadKind::Brightness), 0.5);
    }

    #[test]
    fn luma_weights_green_heaviest() {
        let green = PixelBuffer::new(1, 1, 3, vec![0u8, 255, 0]).unwrap();
        let blue = PixelBuffer::new(1, 1, 3, vec![0u8, 0, 255]).unwrap();
        assert!(read_pixel(&green, 0, ReadKind::Luma) > read_pixel(&blue, 0, ReadKind::Luma));
    }

    #[test]
    fn window_reads_clamp_to_border() {
        let cache = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let raw = TwoDimensionalMap::from_fn(3, 2, |x, y| y * 3 + x);
        let w = ReadingWindow::new(&cache, &raw, None, (0, 0), (3, 2), 1);
        assert_eq!(w.read(0, 0), 0.0);
        assert_eq!(w.read(-1, -1), 0.0);
        assert_eq!(w.read(1, 1), 4.0);

        let w = ReadingWindow::new(&cache, &raw, Some(0.5), (2, 1), (3, 2), 1);
        assert_eq!(w.read(1, 1), 5.0);
        assert_eq!(w.read(-1, 0), 4.0);
        assert_eq!(w.mask(), Some(0.5));
    }
}
