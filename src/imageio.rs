// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversions between `PixelBuffer` and the `image` crate.

use crate::error::{try_with_capacity, Error, Result};
use crate::pixels::{PixelBuffer, Sample, Samples};
use image::{DynamicImage, GenericImageView, ImageBuffer, Pixel, Primitive};
use itertools::iproduct;
use std::path::Path;

fn from_view<I, P, S>(image: &I) -> Result<PixelBuffer>
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = S> + 'static,
    S: Primitive + Sample + 'static,
    Vec<S>: Into<Samples>,
{
    let (width, height) = image.dimensions();
    let channels = P::CHANNEL_COUNT as usize;
    let mut data = try_with_capacity(width as usize * height as usize * channels)?;
    for (y, x) in iproduct!(0..height, 0..width) {
        data.extend_from_slice(image.get_pixel(x, y).channels());
    }
    PixelBuffer::new(width as usize, height as usize, channels, data)
}

fn unsupported(buffer: &PixelBuffer) -> Error {
    Error::UnsupportedLayout(format!(
        "{:?} with {} channels at {:?}",
        buffer.kind(),
        buffer.channels(),
        buffer.depth()
    ))
}

impl PixelBuffer {
    /// Copy a decoded image.  Grey, grey+alpha, RGB and RGBA at 8 and
    /// 16 bits, and RGB and RGBA in 32-bit float are accepted.
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        match image {
            DynamicImage::ImageLuma8(i) => from_view(i),
            DynamicImage::ImageLumaA8(i) => from_view(i),
            DynamicImage::ImageRgb8(i) => from_view(i),
            DynamicImage::ImageRgba8(i) => from_view(i),
            DynamicImage::ImageLuma16(i) => from_view(i),
            DynamicImage::ImageLumaA16(i) => from_view(i),
            DynamicImage::ImageRgb16(i) => from_view(i),
            DynamicImage::ImageRgba16(i) => from_view(i),
            DynamicImage::ImageRgb32F(i) => from_view(i),
            DynamicImage::ImageRgba32F(i) => from_view(i),
            other => Err(Error::UnsupportedLayout(format!("{:?}", other.color()))),
        }
    }

    /// Copy into a `DynamicImage`.  64-bit float samples are narrowed to
    /// 32 bits; subtractive layouts are refused.
    pub fn to_image(&self) -> Result<DynamicImage> {
        if self.kind().is_subtractive() {
            return Err(unsupported(self));
        }
        let (w, h) = (self.width() as u32, self.height() as u32);
        let image = match (self.samples(), self.channels()) {
            (Samples::U8(v), 1) => ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageLuma8),
            (Samples::U8(v), 2) => ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageLumaA8),
            (Samples::U8(v), 3) => ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageRgb8),
            (Samples::U8(v), 4) => ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageRgba8),
            (Samples::U16(v), 1) => ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageLuma16),
            (Samples::U16(v), 2) => ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageLumaA16),
            (Samples::U16(v), 3) => ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageRgb16),
            (Samples::U16(v), 4) => ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageRgba16),
            (Samples::F32(v), 3) => ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageRgb32F),
            (Samples::F32(v), 4) => ImageBuffer::from_raw(w, h, v.clone()).map(DynamicImage::ImageRgba32F),
            (Samples::F64(v), 3) => {
                let narrow: Vec<f32> = v.iter().map(|&s| s as f32).collect();
                ImageBuffer::from_raw(w, h, narrow).map(DynamicImage::ImageRgb32F)
            }
            (Samples::F64(v), 4) => {
                let narrow: Vec<f32> = v.iter().map(|&s| s as f32).collect();
                ImageBuffer::from_raw(w, h, narrow).map(DynamicImage::ImageRgba32F)
            }
            _ => None,
        };
        image.ok_or_else(|| unsupported(self))
    }
}

/// Decode any format the `image` crate knows.
pub fn open<P: AsRef<Path>>(path: P) -> Result<PixelBuffer> {
    PixelBuffer::from_image(&image::open(path)?)
}

/// Encode by file extension.  Float images are converted to 16 bits
/// per channel first, since few formats take floats.
pub fn save<P: AsRef<Path>>(buffer: &PixelBuffer, path: P) -> Result<()> {
    let image = buffer.to_image()?;
    let image = match image {
        DynamicImage::ImageRgb32F(_) => DynamicImage::ImageRgb16(image.to_rgb16()),
        DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgba16(image.to_rgba16()),
        other => other,
    };
    image.save(path)?;
    Ok(())
}
