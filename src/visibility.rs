// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Visibility
//!
//! Every physical pixel carries the level at which it was carved away.
//! Zero means "never removed".  A pixel is visible at level `L` when
//! its level is zero or at least `L`, so replaying a resize to any
//! width between the original and the deepest carve is a matter of
//! filtering, with no recomputation.

use crate::error::{try_filled, Error, Result};

/// Which way seams run.  `Vertical` seams are removed to change the
/// width; a carver resizing heights works transposed, on `Horizontal`
/// seams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Visibility {
    width: usize,
    height: usize,
    levels: Vec<usize>,
}

impl Visibility {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Ok(Visibility {
            width,
            height,
            levels: try_filled(width * height, 0)?,
        })
    }

    pub fn from_levels(width: usize, height: usize, levels: Vec<usize>) -> Self {
        debug_assert_eq!(levels.len(), width * height);
        Visibility { width, height, levels }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn levels(&self) -> &[usize] {
        &self.levels
    }

    pub fn get(&self, z: usize) -> usize {
        self.levels[z]
    }

    pub fn set(&mut self, z: usize, level: usize) {
        self.levels[z] = level;
    }

    pub fn is_visible(&self, z: usize, level: usize) -> bool {
        let vs = self.levels[z];
        vs == 0 || vs >= level
    }

    /// Physical offsets of the pixels of row `y` visible at `level`,
    /// left to right.
    pub fn visible_in_row(&self, y: usize, level: usize) -> impl Iterator<Item = usize> + '_ {
        let start = y * self.width;
        (start..start + self.width).filter(move |&z| self.is_visible(z, level))
    }

    /// All visible physical offsets, row-major.
    pub fn visible(&self, level: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.height).flat_map(move |y| self.visible_in_row(y, level))
    }
}

/// A snapshot of a carver's visibility levels.
///
/// `width`, `height` and `levels` are in the carver's working layout:
/// when `orientation` is `Horizontal` the grid is the transposed
/// image.  `depth` is the number of seams by which the image had been
/// enlarged when the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityMap {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    pub orientation: Orientation,
    pub levels: Vec<usize>,
}

impl VisibilityMap {
    /// Width of the image this map describes, in user orientation.
    pub fn image_width(&self) -> usize {
        match self.orientation {
            Orientation::Vertical => self.width,
            Orientation::Horizontal => self.height,
        }
    }

    /// Height of the image this map describes, in user orientation.
    pub fn image_height(&self) -> usize {
        match self.orientation {
            Orientation::Vertical => self.height,
            Orientation::Horizontal => self.width,
        }
    }

    /// The level of the pixel at user coordinates `(x, y)`.
    pub fn level(&self, x: usize, y: usize) -> usize {
        let (gx, gy) = match self.orientation {
            Orientation::Vertical => (x, y),
            Orientation::Horizontal => (y, x),
        };
        self.levels[gy * self.width + gx]
    }

    /// The deepest level recorded.
    pub fn max_level(&self) -> usize {
        self.levels.iter().copied().max().unwrap_or(0)
    }

    /// Check that the map describes a sequence of whole seams: every
    /// level up to and including the deepest one appears exactly once
    /// per row.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.levels.len() != self.width * self.height {
            return Err(Error::LayerSize {
                expected: self.width * self.height,
                actual: self.levels.len(),
            });
        }
        let deepest = self.max_level();
        if deepest > self.width {
            return Err(Error::InvalidVisibilityMap(format!(
                "level {} exceeds the width {}",
                deepest, self.width
            )));
        }
        for (y, row) in self.levels.chunks(self.width.max(1)).enumerate() {
            let mut seen = vec![0usize; deepest + 1];
            for &v in row {
                seen[v] += 1;
            }
            if let Some(level) = (1..=deepest).find(|&l| seen[l] != 1) {
                return Err(Error::InvalidVisibilityMap(format!(
                    "row {} holds level {} {} times",
                    y, level, seen[level]
                )));
            }
        }
        Ok(())
    }
}
