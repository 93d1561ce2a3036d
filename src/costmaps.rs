// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Cost maps
//!
//! The working state of a carve: the index remap from logical
//! (carved) coordinates to physical offsets, the energy of every
//! physical pixel, the cumulative minimum-path map, and the seam most
//! recently found.  Energy and minpath are indexed physically, so
//! removing a seam only touches the remap; `energymap.rs` and
//! `seamfinder.rs` fill the rest in.

use crate::error::{try_filled, Result};
use crate::pixels::PixelBuffer;
use crate::twodmap::{EnergyAndBackPointer, TwoDimensionalMap};
use crate::visibility::Visibility;
use crate::window::{read_cache, ReadKind};

#[derive(Debug, Clone)]
pub(crate) struct CostMaps {
    /// Logical `(x, y)` to physical offset.  Allocated at full width;
    /// only the first `width` cells of each row are live.
    pub raw: TwoDimensionalMap<usize>,
    pub width: usize,
    pub height: usize,
    pub cache: Vec<f64>,
    pub en: Vec<f32>,
    pub m: Vec<EnergyAndBackPointer<f32>>,
    /// Per-row energy band dirtied by the last seam, inclusive.
    pub nrg_xmin: Vec<isize>,
    pub nrg_xmax: Vec<isize>,
    /// Physical offset and logical column of the last seam, per row.
    pub vpath: Vec<usize>,
    pub vpath_x: Vec<usize>,
}

impl CostMaps {
    /// Build the remap from the pixels visible at `level`.  Every row
    /// must hold the same number of them.
    pub fn new(pixels: &PixelBuffer, vis: &Visibility, level: usize, read: ReadKind) -> Result<Self> {
        let (w0, h0) = (vis.width(), vis.height());
        let mut raw = TwoDimensionalMap::new(w0, h0);
        let mut width = None;
        for y in 0..h0 {
            let row = raw.row_mut(y);
            let mut x = 0;
            for z in vis.visible_in_row(y, level) {
                row[x] = z;
                x += 1;
            }
            match width {
                None => width = Some(x),
                Some(w) => assert_eq!(w, x, "row {} disagrees on visible width", y),
            }
        }

        Ok(CostMaps {
            raw,
            width: width.unwrap_or(0),
            height: h0,
            cache: read_cache(pixels, read),
            en: try_filled(w0 * h0, 0.0)?,
            m: try_filled(w0 * h0, EnergyAndBackPointer::default())?,
            nrg_xmin: try_filled(h0, 0)?,
            nrg_xmax: try_filled(h0, 0)?,
            vpath: try_filled(h0, 0)?,
            vpath_x: try_filled(h0, 0)?,
        })
    }

    /// The logical row `y`, as physical offsets.
    pub fn row(&self, y: usize) -> &[usize] {
        &self.raw.row(y)[..self.width]
    }

    /// Drop the last seam found from the remap.
    pub fn carve(&mut self) {
        let width = self.width;
        for y in 0..self.height {
            let x0 = self.vpath_x[y];
            self.raw.row_mut(y).copy_within(x0 + 1..width, x0);
        }
        self.width -= 1;
    }
}
