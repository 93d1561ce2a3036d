// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Rigidity
//!
//! A seam step from one row to the next may move sideways by at most
//! `delta_x` pixels.  With a non-zero rigidity factor every sideways
//! step also pays `factor * |dx|^1.5 / height`, optionally scaled per
//! pixel by a rigidity mask, which makes seams prefer to run straight.

#[derive(Debug, Clone)]
pub(crate) struct RigidityModel {
    factor: f32,
    delta_x: usize,
    table: Vec<f32>,
    pub(crate) mask: Option<Vec<f32>>,
}

fn penalty_table(factor: f32, delta_x: usize, height: usize) -> Vec<f32> {
    let h = height.max(1) as f32;
    (0..=2 * delta_x)
        .map(|i| {
            let dx = (i as isize - delta_x as isize).unsigned_abs() as f32;
            factor * dx.powf(1.5) / h
        })
        .collect()
}

impl RigidityModel {
    pub fn new(factor: f32, delta_x: usize, height: usize) -> Self {
        RigidityModel {
            factor,
            delta_x,
            table: penalty_table(factor, delta_x, height),
            mask: None,
        }
    }

    pub fn delta_x(&self) -> usize {
        self.delta_x
    }

    /// A zero factor means the search is the unconstrained one.
    pub fn is_rigid(&self) -> bool {
        self.factor != 0.0
    }

    pub fn penalty(&self, dx: isize) -> f32 {
        self.table[(dx + self.delta_x as isize) as usize]
    }

    pub fn mask_at(&self, z: usize) -> f32 {
        self.mask.as_ref().map_or(1.0, |m| m[z])
    }

    /// Recompute the table for a new image height.
    pub fn rescale(&mut self, height: usize) {
        self.table = penalty_table(self.factor, self.delta_x, height);
    }

    /// Change the factor and the step limit, keeping the mask.
    pub fn reconfigure(&mut self, factor: f32, delta_x: usize, height: usize) {
        self.factor = factor;
        self.delta_x = delta_x;
        self.rescale(height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_grows_with_step_size() {
        let r = RigidityModel::new(4.0, 2, 4);
        assert_eq!(r.penalty(0), 0.0);
        assert_eq!(r.penalty(1), 1.0);
        assert_eq!(r.penalty(-1), 1.0);
        assert!((r.penalty(2) - 8.0f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn zero_factor_is_not_rigid() {
        let r = RigidityModel::new(0.0, 1, 10);
        assert!(!r.is_rigid());
        assert_eq!(r.penalty(-1), 0.0);
        assert_eq!(r.mask_at(3), 1.0);
    }
}
