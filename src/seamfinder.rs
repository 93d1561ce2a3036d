// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Seam finding
//!
//! The minimum-path map is the usual dynamic program: the cost of
//! reaching a pixel is its energy plus the cheapest of the pixels up to
//! `delta_x` columns away in the row above, plus the rigidity penalty
//! for the step.  After a seam is carved only the columns reachable
//! from the dirtied energy band are recomputed, and the run stops
//! widening as soon as a row comes out unchanged.
//!
//! Ties go to the lower cost, then to the straighter step, then to
//! whichever side the carver currently favours.

use crate::costmaps::CostMaps;
use crate::error::Result;
use crate::rigidity::RigidityModel;
use crate::state::StateCell;
use crate::twodmap::EnergyAndBackPointer;
use std::cmp::Ordering;

/// Which of two equally good candidates wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    pub fn flip(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

// Should a step of `dx` replace the equally costly step `current`?
fn prefer(dx: isize, current: isize, side: Side) -> bool {
    match dx.abs().cmp(&current.abs()) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => side == Side::Right && dx > current,
    }
}

impl CostMaps {
    // Cheapest way into (x, y) from the row above: (cost, parent).
    fn least_parent(&self, x: usize, y: usize, rigidity: &RigidityModel, side: Side) -> (f32, usize) {
        let dx_max = rigidity.delta_x() as isize;
        let xi = x as isize;
        let lo = (-xi).max(-dx_max);
        let hi = (self.width as isize - 1 - xi).min(dx_max);
        let r_fact = rigidity.mask_at(self.raw[(x, y)]);

        let cost_of = |dx: isize| {
            let parent = self.raw[((xi + dx) as usize, y - 1)];
            let mut cost = self.m[parent].energy;
            if rigidity.is_rigid() {
                cost += r_fact * rigidity.penalty(dx);
            }
            (cost, parent)
        };

        let (mut best, mut parent) = cost_of(0);
        let mut best_dx = 0;
        for dx in (lo..=hi).filter(|&dx| dx != 0) {
            let (cost, p) = cost_of(dx);
            if cost < best || (cost == best && prefer(dx, best_dx, side)) {
                best = cost;
                best_dx = dx;
                parent = p;
            }
        }
        (best, parent)
    }

    fn seed_row(&mut self, x: usize) {
        let z = self.raw[(x, 0)];
        self.m[z] = EnergyAndBackPointer {
            energy: self.en[z],
            parent: z,
        };
    }

    /// Build the whole minimum-path map from the energy map.
    pub fn build_mmap(&mut self, rigidity: &RigidityModel, side: Side, state: &StateCell) -> Result<()> {
        for x in 0..self.width {
            self.seed_row(x);
        }
        for y in 1..self.height {
            state.check()?;
            for x in 0..self.width {
                let (cost, parent) = self.least_parent(x, y, rigidity, side);
                let z = self.raw[(x, y)];
                self.m[z] = EnergyAndBackPointer {
                    energy: self.en[z] + cost,
                    parent,
                };
            }
        }
        Ok(())
    }

    /// Recompute the minimum-path map after `update_emap`.  The range of
    /// columns to visit starts at the dirtied energy band, widens by
    /// `delta_x` per row, and is trimmed at either end wherever a
    /// recomputed cell matches its old value outside the band.
    pub fn update_mmap(&mut self, rigidity: &RigidityModel, side: Side, state: &StateCell) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Ok(());
        }
        let w = self.width as isize;
        let dx = rigidity.delta_x() as isize;

        let mut x_min = self.nrg_xmin[0].max(0);
        let mut x_max = self.nrg_xmax[0].min(w - 1);
        for x in x_min..=x_max {
            self.seed_row(x as usize);
        }

        for y in 1..self.height {
            state.check()?;
            x_min = (x_min.min(self.nrg_xmin[y]) - dx).max(0);
            x_max = (x_max.max(self.nrg_xmax[y]) + dx).min(w - 1);

            let mut stop = false;
            let mut x_stop = 0;
            let mut x = x_min;
            while x <= x_max {
                let xu = x as usize;
                let z = self.raw[(xu, y)];
                let (cost, parent) = self.least_parent(xu, y, rigidity, side);
                let fresh = EnergyAndBackPointer {
                    energy: self.en[z] + cost,
                    parent,
                };
                let unchanged = self.m[z] == fresh;

                if unchanged && x == x_min && x < self.nrg_xmin[y] {
                    x_min += 1;
                }
                if unchanged && x > self.nrg_xmax[y] {
                    if !stop {
                        x_stop = x;
                    }
                    stop = true;
                } else {
                    stop = false;
                }

                self.m[z] = fresh;
                if x == x_max && stop {
                    x_max = x_stop;
                }
                x += 1;
            }
        }
        Ok(())
    }

    /// Trace the cheapest seam from the last row back to the first,
    /// recording it in `vpath` and `vpath_x`.
    pub fn build_vpath(&mut self, rigidity: &RigidityModel, side: Side) {
        let last = self.height - 1;
        let mut x = 0;
        let mut best = self.m[self.raw[(0, last)]].energy;
        for x1 in 1..self.width {
            let e = self.m[self.raw[(x1, last)]].energy;
            if e < best || (e == best && side == Side::Right) {
                best = e;
                x = x1;
            }
        }

        let dx = rigidity.delta_x();
        let mut z = self.raw[(x, last)];
        for y in (0..self.height).rev() {
            self.vpath[y] = z;
            self.vpath_x[y] = x;
            if y == 0 {
                break;
            }
            z = self.m[z].parent;
            let lo = x.saturating_sub(dx);
            let hi = (x + dx).min(self.width - 1);
            x = match (lo..=hi).find(|&x1| self.raw[(x1, y - 1)] == z) {
                Some(x1) => x1,
                None => panic!("seam parent {} is not within reach in row {}", z, y - 1),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::{EnergyConfig, EnergyFunction};
    use crate::pixels::PixelBuffer;
    use crate::visibility::Visibility;
    use crate::window::{ReadKind, ReadingWindow};
    use std::sync::Arc;

    fn own_brightness() -> EnergyConfig {
        let f = |w: &ReadingWindow<'_>| w.read(0, 0) as f32;
        EnergyConfig {
            function: Arc::new(f) as Arc<dyn EnergyFunction>,
            radius: 0,
            read: ReadKind::Brightness,
        }
    }

    fn maps_for(pixels: &PixelBuffer) -> CostMaps {
        let vis = Visibility::new(pixels.width(), pixels.height()).unwrap();
        let mut maps = CostMaps::new(pixels, &vis, 1, ReadKind::Brightness).unwrap();
        maps.build_emap(&own_brightness(), None, &StateCell::new()).unwrap();
        maps
    }

    #[test]
    fn seam_follows_a_cheap_diagonal() {
        let pixels = PixelBuffer::from_fn(5, 5, 1, |x, y, _| if x == y { 0u8 } else { 255 }).unwrap();
        let mut maps = maps_for(&pixels);
        let rigidity = RigidityModel::new(0.0, 1, 5);
        maps.build_mmap(&rigidity, Side::Left, &StateCell::new()).unwrap();
        maps.build_vpath(&rigidity, Side::Left);
        assert_eq!(maps.vpath_x, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn flat_images_carve_straight_on_the_favoured_side() {
        let pixels = PixelBuffer::from_fn(4, 3, 1, |_, _, _| 128u8).unwrap();
        let rigidity = RigidityModel::new(0.0, 1, 3);

        let mut maps = maps_for(&pixels);
        maps.build_mmap(&rigidity, Side::Left, &StateCell::new()).unwrap();
        maps.build_vpath(&rigidity, Side::Left);
        assert_eq!(maps.vpath_x, vec![0, 0, 0]);

        maps.build_mmap(&rigidity, Side::Right, &StateCell::new()).unwrap();
        maps.build_vpath(&rigidity, Side::Right);
        assert_eq!(maps.vpath_x, vec![3, 3, 3]);
    }

    #[test]
    fn rigidity_straightens_the_seam() {
        // A cheap column that jogs one step right halfway down.
        let cheap = |x: usize, y: usize| (y < 3 && x == 1) || (y >= 3 && x == 2);
        let pixels = PixelBuffer::from_fn(4, 6, 1, |x, y, _| if cheap(x, y) { 0u8 } else { 10 }).unwrap();
        let state = StateCell::new();

        let mut loose = maps_for(&pixels);
        let rigidity = RigidityModel::new(0.0, 1, 6);
        loose.build_mmap(&rigidity, Side::Left, &state).unwrap();
        loose.build_vpath(&rigidity, Side::Left);
        assert_eq!(loose.vpath_x, vec![1, 1, 1, 2, 2, 2]);

        let mut stiff = maps_for(&pixels);
        let rigidity = RigidityModel::new(1000.0, 1, 6);
        stiff.build_mmap(&rigidity, Side::Left, &state).unwrap();
        stiff.build_vpath(&rigidity, Side::Left);
        let x0 = stiff.vpath_x[0];
        assert!(stiff.vpath_x.iter().all(|&x| x == x0));
    }

    #[test]
    fn incremental_update_matches_a_rebuild() {
        let pixels = PixelBuffer::from_fn(9, 7, 1, |x, y, _| ((x * 53 + y * 29 + x * y * 7) % 251) as u8).unwrap();
        let energy = EnergyConfig::default();
        let rigidity = RigidityModel::new(0.5, 2, 7);
        let state = StateCell::new();

        let vis = Visibility::new(9, 7).unwrap();
        let mut maps = CostMaps::new(&pixels, &vis, 1, energy.read).unwrap();
        maps.build_emap(&energy, None, &state).unwrap();
        maps.build_mmap(&rigidity, Side::Left, &state).unwrap();

        for _ in 0..4 {
            maps.build_vpath(&rigidity, Side::Left);
            maps.carve();
            maps.update_emap(&energy, None, &state).unwrap();
            maps.update_mmap(&rigidity, Side::Left, &state).unwrap();

            let mut fresh = maps.clone();
            fresh.build_mmap(&rigidity, Side::Left, &state).unwrap();
            for y in 0..maps.height {
                for &z in maps.row(y) {
                    assert_eq!(maps.m[z], fresh.m[z]);
                }
            }
        }
    }
}
