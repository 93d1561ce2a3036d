// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pixel storage
//!
//! A `PixelBuffer` is a dimensioned, interleaved block of samples in one
//! of four numeric depths.  The depth is a closed enum (`Samples`); the
//! per-depth work is written once, generically over `Sample`, and the
//! enum only dispatches.  The rest of the engine sees samples as `f64`
//! values normalized to [0, 1] and never cares which depth it is
//! carving.

use crate::error::{try_with_capacity, Error, Result};
use num_traits::{NumCast, ToPrimitive};
use std::fmt;

/// The four supported sample depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    U8,
    U16,
    F32,
    F64,
}

/// A single channel value.  Integers are scaled to [0, 1] by their
/// maximum; floats are taken as already normalized.
pub trait Sample:
    Copy + Default + PartialEq + fmt::Debug + ToPrimitive + NumCast + Send + Sync + 'static
{
    const DEPTH: ColorDepth;
    const UNIT: f64;
    const INTEGER: bool;

    /// Borrow a slice of this depth out of a depth-erased store.
    fn view(samples: &Samples) -> Option<&[Self]>;

    fn to_unit(self) -> f64 {
        self.to_f64().map_or(0.0, |v| v / Self::UNIT)
    }

    fn from_unit(v: f64) -> Self {
        let scaled = v * Self::UNIT;
        let scaled = if Self::INTEGER {
            scaled.round().clamp(0.0, Self::UNIT)
        } else {
            scaled
        };
        NumCast::from(scaled).unwrap_or_default()
    }

    /// The value halfway between two samples; integer depths truncate.
    fn midpoint(a: Self, b: Self) -> Self {
        let mid = (a.to_f64().unwrap_or(0.0) + b.to_f64().unwrap_or(0.0)) / 2.0;
        NumCast::from(if Self::INTEGER { mid.floor() } else { mid }).unwrap_or_default()
    }
}

impl Sample for u8 {
    const DEPTH: ColorDepth = ColorDepth::U8;
    const UNIT: f64 = 255.0;
    const INTEGER: bool = true;

    fn view(samples: &Samples) -> Option<&[Self]> {
        match samples {
            Samples::U8(v) => Some(v),
            _ => None,
        }
    }
}

impl Sample for u16 {
    const DEPTH: ColorDepth = ColorDepth::U16;
    const UNIT: f64 = 65535.0;
    const INTEGER: bool = true;

    fn view(samples: &Samples) -> Option<&[Self]> {
        match samples {
            Samples::U16(v) => Some(v),
            _ => None,
        }
    }
}

impl Sample for f32 {
    const DEPTH: ColorDepth = ColorDepth::F32;
    const UNIT: f64 = 1.0;
    const INTEGER: bool = false;

    fn view(samples: &Samples) -> Option<&[Self]> {
        match samples {
            Samples::F32(v) => Some(v),
            _ => None,
        }
    }
}

impl Sample for f64 {
    const DEPTH: ColorDepth = ColorDepth::F64;
    const UNIT: f64 = 1.0;
    const INTEGER: bool = false;

    fn view(samples: &Samples) -> Option<&[Self]> {
        match samples {
            Samples::F64(v) => Some(v),
            _ => None,
        }
    }
}

/// Depth-erased sample storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl From<Vec<u8>> for Samples {
    fn from(v: Vec<u8>) -> Self {
        Samples::U8(v)
    }
}

impl From<Vec<u16>> for Samples {
    fn from(v: Vec<u16>) -> Self {
        Samples::U16(v)
    }
}

impl From<Vec<f32>> for Samples {
    fn from(v: Vec<f32>) -> Self {
        Samples::F32(v)
    }
}

impl From<Vec<f64>> for Samples {
    fn from(v: Vec<f64>) -> Self {
        Samples::F64(v)
    }
}

/// Where a pixel of a rebuilt buffer comes from: a straight copy of an
/// old pixel, or the midpoint of two old pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Source {
    Copy(usize),
    Average(usize, usize),
}

fn remap_samples<S: Sample>(src: &[S], channels: usize, plan: &[Source]) -> Result<Vec<S>> {
    let mut out = try_with_capacity(plan.len() * channels)?;
    for source in plan {
        match *source {
            Source::Copy(z) => out.extend_from_slice(&src[z * channels..(z + 1) * channels]),
            Source::Average(a, b) => out.extend(
                (0..channels).map(|k| S::midpoint(src[a * channels + k], src[b * channels + k])),
            ),
        }
    }
    Ok(out)
}

/// Rebuild a per-pixel companion layer (bias, rigidity mask) by the
/// same plan as its buffer.
pub(crate) fn remap_layer(layer: &[f32], plan: &[Source]) -> Result<Vec<f32>> {
    remap_samples(layer, 1, plan)
}

impl Samples {
    pub fn depth(&self) -> ColorDepth {
        match self {
            Samples::U8(_) => ColorDepth::U8,
            Samples::U16(_) => ColorDepth::U16,
            Samples::F32(_) => ColorDepth::F32,
            Samples::F64(_) => ColorDepth::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::F32(v) => v.len(),
            Samples::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The sample at flat index `i`, normalized to [0, 1].
    pub fn unit(&self, i: usize) -> f64 {
        match self {
            Samples::U8(v) => v[i].to_unit(),
            Samples::U16(v) => v[i].to_unit(),
            Samples::F32(v) => v[i].to_unit(),
            Samples::F64(v) => v[i].to_unit(),
        }
    }

    pub(crate) fn remap(&self, channels: usize, plan: &[Source]) -> Result<Samples> {
        Ok(match self {
            Samples::U8(v) => Samples::U8(remap_samples(v, channels, plan)?),
            Samples::U16(v) => Samples::U16(remap_samples(v, channels, plan)?),
            Samples::F32(v) => Samples::F32(remap_samples(v, channels, plan)?),
            Samples::F64(v) => Samples::F64(remap_samples(v, channels, plan)?),
        })
    }
}

/// The channel layout of an image.  It decides which channels count as
/// colour, which one is alpha and which one is black.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Grey,
    GreyA,
    Rgb,
    Rgba,
    Cmy,
    Cmyk,
    Cmyka,
    /// Any channel count; the last channel is alpha unless overridden.
    Custom,
}

impl ImageKind {
    /// The default layout for a channel count.
    pub fn for_channels(channels: usize) -> Self {
        match channels {
            1 => ImageKind::Grey,
            2 => ImageKind::GreyA,
            3 => ImageKind::Rgb,
            4 => ImageKind::Rgba,
            5 => ImageKind::Cmyka,
            _ => ImageKind::Custom,
        }
    }

    fn channels(self) -> Option<usize> {
        match self {
            ImageKind::Grey => Some(1),
            ImageKind::GreyA => Some(2),
            ImageKind::Rgb | ImageKind::Cmy => Some(3),
            ImageKind::Rgba | ImageKind::Cmyk => Some(4),
            ImageKind::Cmyka => Some(5),
            ImageKind::Custom => None,
        }
    }

    // (alpha, black)
    fn layout(self, channels: usize) -> (Option<usize>, Option<usize>) {
        match self {
            ImageKind::Grey | ImageKind::Rgb | ImageKind::Cmy => (None, None),
            ImageKind::GreyA => (Some(1), None),
            ImageKind::Rgba => (Some(3), None),
            ImageKind::Cmyk => (None, Some(3)),
            ImageKind::Cmyka => (Some(4), Some(3)),
            ImageKind::Custom => (channels.checked_sub(1), None),
        }
    }

    /// Subtractive layouts store ink, not light.
    pub fn is_subtractive(self) -> bool {
        matches!(self, ImageKind::Cmy | ImageKind::Cmyk | ImageKind::Cmyka)
    }
}

/// An image held as interleaved samples, `channels` per pixel, rows top
/// to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    channels: usize,
    kind: ImageKind,
    alpha: Option<usize>,
    black: Option<usize>,
    samples: Samples,
}

impl PixelBuffer {
    /// Wrap caller-supplied samples.  The layout defaults to the usual
    /// one for the channel count.
    pub fn new<V: Into<Samples>>(
        width: usize,
        height: usize,
        channels: usize,
        samples: V,
    ) -> Result<Self> {
        let samples = samples.into();
        if width == 0 || height == 0 || channels == 0 {
            return Err(Error::InvalidDimensions {
                width,
                height,
                channels,
            });
        }
        let expected = width * height * channels;
        if samples.len() != expected {
            return Err(Error::BufferLength {
                expected,
                actual: samples.len(),
            });
        }
        let kind = ImageKind::for_channels(channels);
        let (alpha, black) = kind.layout(channels);
        Ok(PixelBuffer {
            width,
            height,
            channels,
            kind,
            alpha,
            black,
            samples,
        })
    }

    /// Build a buffer by asking for every sample.
    pub fn from_fn<S, F>(width: usize, height: usize, channels: usize, mut f: F) -> Result<Self>
    where
        S: Sample,
        Vec<S>: Into<Samples>,
        F: FnMut(usize, usize, usize) -> S,
    {
        let mut data = try_with_capacity(width * height * channels)?;
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    data.push(f(x, y, c));
                }
            }
        }
        PixelBuffer::new(width, height, channels, data)
    }

    pub fn with_kind(mut self, kind: ImageKind) -> Result<Self> {
        self.set_kind(kind)?;
        Ok(self)
    }

    pub fn set_kind(&mut self, kind: ImageKind) -> Result<()> {
        if let Some(expected) = kind.channels() {
            if expected != self.channels {
                return Err(Error::ChannelMismatch {
                    kind,
                    expected,
                    actual: self.channels,
                });
            }
        }
        let (alpha, black) = kind.layout(self.channels);
        self.kind = kind;
        self.alpha = alpha;
        self.black = black;
        Ok(())
    }

    /// Override the alpha channel.  The layout becomes `Custom`.
    pub fn set_alpha_channel(&mut self, channel: Option<usize>) -> Result<()> {
        self.check_channel(channel)?;
        self.alpha = channel;
        self.kind = ImageKind::Custom;
        Ok(())
    }

    /// Override the black channel.  The layout becomes `Custom`.
    pub fn set_black_channel(&mut self, channel: Option<usize>) -> Result<()> {
        self.check_channel(channel)?;
        self.black = channel;
        self.kind = ImageKind::Custom;
        Ok(())
    }

    fn check_channel(&self, channel: Option<usize>) -> Result<()> {
        match channel {
            Some(c) if c >= self.channels => Err(Error::ChannelOutOfRange {
                channel: c,
                channels: self.channels,
            }),
            _ => Ok(()),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn depth(&self) -> ColorDepth {
        self.samples.depth()
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn alpha_channel(&self) -> Option<usize> {
        self.alpha
    }

    pub fn black_channel(&self) -> Option<usize> {
        self.black
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn into_samples(self) -> Samples {
        self.samples
    }

    /// Typed access to the raw samples, if the depth matches.
    pub fn as_slice<S: Sample>(&self) -> Option<&[S]> {
        S::view(&self.samples)
    }

    /// One sample, normalized to [0, 1].
    pub fn unit(&self, x: usize, y: usize, channel: usize) -> f64 {
        self.unit_at(y * self.width + x, channel)
    }

    /// Every channel of one pixel, normalized to [0, 1].
    pub fn pixel(&self, x: usize, y: usize) -> Vec<f64> {
        (0..self.channels).map(|c| self.unit(x, y, c)).collect()
    }

    pub(crate) fn unit_at(&self, z: usize, channel: usize) -> f64 {
        self.samples.unit(z * self.channels + channel)
    }

    /// Rebuild the buffer at a new size, pixel by pixel, from a plan of
    /// sources in the current buffer.  The layout is kept.
    pub(crate) fn remap(&self, width: usize, height: usize, plan: &[Source]) -> Result<Self> {
        debug_assert_eq!(plan.len(), width * height);
        Ok(PixelBuffer {
            width,
            height,
            samples: self.samples.remap(self.channels, plan)?,
            channels: self.channels,
            kind: self.kind,
            alpha: self.alpha,
            black: self.black,
        })
    }
}
