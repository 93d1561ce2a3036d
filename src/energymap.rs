// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The energy map
//!
//! Energy is computed once for the whole image and then, after each
//! seam, only inside the band of pixels whose reading windows the seam
//! passed through.  The bias layer, if any, is added on top.

use crate::costmaps::CostMaps;
use crate::energy::EnergyConfig;
use crate::error::Result;
use crate::state::StateCell;
use crate::twodmap::TwoDimensionalMap;
use crate::window::ReadingWindow;

fn evaluate(
    energy: &EnergyConfig,
    cache: &[f64],
    raw: &TwoDimensionalMap<usize>,
    bias: Option<&[f32]>,
    (x, y): (usize, usize),
    dims: (usize, usize),
) -> f32 {
    let z = raw[(x, y)];
    let mask = bias.map(|b| b[z]);
    let window = ReadingWindow::new(cache, raw, mask, (x, y), dims, energy.radius);
    energy.function.energy(&window) + mask.unwrap_or(0.0)
}

impl CostMaps {
    /// Compute the energy of every visible pixel.
    #[cfg(not(feature = "threaded"))]
    pub fn build_emap(&mut self, energy: &EnergyConfig, bias: Option<&[f32]>, state: &StateCell) -> Result<()> {
        self.build_emap_rows(energy, bias, state)
    }

    /// Compute the energy of every visible pixel, spread across the
    /// available cores.
    #[cfg(feature = "threaded")]
    pub fn build_emap(&mut self, energy: &EnergyConfig, bias: Option<&[f32]>, state: &StateCell) -> Result<()> {
        self.build_emap_parallel(num_cpus::get(), energy, bias, state)
    }

    fn build_emap_rows(&mut self, energy: &EnergyConfig, bias: Option<&[f32]>, state: &StateCell) -> Result<()> {
        let dims = (self.width, self.height);
        for y in 0..self.height {
            state.check()?;
            for x in 0..self.width {
                let e = evaluate(energy, &self.cache, &self.raw, bias, (x, y), dims);
                self.en[self.raw[(x, y)]] = e;
            }
        }
        Ok(())
    }

    /// A band of rows per worker.  Rows of the remap only ever point
    /// into their own row of physical storage, so each worker owns a
    /// disjoint slice of `en`.
    #[cfg(feature = "threaded")]
    fn build_emap_parallel(
        &mut self,
        workers: usize,
        energy: &EnergyConfig,
        bias: Option<&[f32]>,
        state: &StateCell,
    ) -> Result<()> {
        use std::panic::resume_unwind;

        let workers = workers.min(self.height);
        if workers <= 1 {
            return self.build_emap_rows(energy, bias, state);
        }
        let dims = (self.width, self.height);
        let stride = self.raw.width;
        let rows_per_worker = (self.height + workers - 1) / workers;
        let (cache, raw) = (&self.cache[..], &self.raw);
        let chunks = self.en[..stride * self.height].chunks_mut(stride * rows_per_worker);

        let joined = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .enumerate()
                .map(|(i, chunk)| {
                    scope.spawn(move |_| -> Result<()> {
                        let first = i * rows_per_worker;
                        let base = first * stride;
                        for y in first..first + chunk.len() / stride {
                            state.check()?;
                            for x in 0..dims.0 {
                                chunk[raw[(x, y)] - base] = evaluate(energy, cache, raw, bias, (x, y), dims);
                            }
                        }
                        Ok(())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        });

        let results = joined.unwrap_or_else(|panic| resume_unwind(panic));
        for result in results {
            result.unwrap_or_else(|panic| resume_unwind(panic))?;
        }
        Ok(())
    }

    /// Recompute energy around the seam just carved.  Each seam pixel
    /// dirties a square of side `2r` around its position, clipped to the
    /// image; per row the union is a single run.
    pub fn update_emap(&mut self, energy: &EnergyConfig, bias: Option<&[f32]>, state: &StateCell) -> Result<()> {
        let r = energy.radius.max(1) as isize;
        let (w, h) = (self.width as isize, self.height as isize);

        for y in 0..self.height {
            let x = self.vpath_x[y] as isize;
            self.nrg_xmin[y] = x;
            self.nrg_xmax[y] = x - 1;
        }
        for y in 0..h {
            let x = self.vpath_x[y as usize] as isize;
            for y1 in (y - r).max(0)..=(y + r).min(h - 1) {
                let y1 = y1 as usize;
                self.nrg_xmin[y1] = self.nrg_xmin[y1].min(x - r).max(0);
                self.nrg_xmax[y1] = self.nrg_xmax[y1].max(x + r - 1).min(w - 1);
            }
        }

        let dims = (self.width, self.height);
        for y in 0..self.height {
            state.check()?;
            for x in self.nrg_xmin[y]..=self.nrg_xmax[y] {
                let x = x as usize;
                let e = evaluate(energy, &self.cache, &self.raw, bias, (x, y), dims);
                self.en[self.raw[(x, y)]] = e;
            }
        }
        Ok(())
    }
}
