// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Energy functions
//!
//! An energy function scores how expensive a pixel is to remove, given
//! nothing but a reading window around it.  Any closure of the right
//! shape works; the builtins are the gradient family, computed on
//! brightness or on luma.

use crate::window::{ReadKind, ReadingWindow};
use std::fmt;
use std::sync::Arc;

/// A pure, pluggable `(window) -> energy` function.  Higher means more
/// important.  It must not have side effects: it may be called from
/// several threads at once on disjoint pixels.
pub trait EnergyFunction: Send + Sync {
    fn energy(&self, window: &ReadingWindow<'_>) -> f32;
}

impl<F> EnergyFunction for F
where
    F: Fn(&ReadingWindow<'_>) -> f32 + Send + Sync,
{
    fn energy(&self, window: &ReadingWindow<'_>) -> f32 {
        self(window)
    }
}

/// The builtin energy functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinEnergy {
    /// |∂x| of brightness.  The default.
    GradXAbs,
    /// (|∂x| + |∂y|) / 2 of brightness.
    GradSumAbs,
    /// √(∂x² + ∂y²) of brightness.
    GradNorm,
    LumaGradXAbs,
    LumaGradSumAbs,
    LumaGradNorm,
    /// Every pixel is worth nothing.
    Null,
}

impl BuiltinEnergy {
    pub const NAMES: [&'static str; 7] = [
        "grad-xabs",
        "grad-sumabs",
        "grad-norm",
        "luma-xabs",
        "luma-sumabs",
        "luma-norm",
        "null",
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "grad-xabs" => Some(BuiltinEnergy::GradXAbs),
            "grad-sumabs" => Some(BuiltinEnergy::GradSumAbs),
            "grad-norm" => Some(BuiltinEnergy::GradNorm),
            "luma-xabs" => Some(BuiltinEnergy::LumaGradXAbs),
            "luma-sumabs" => Some(BuiltinEnergy::LumaGradSumAbs),
            "luma-norm" => Some(BuiltinEnergy::LumaGradNorm),
            "null" => Some(BuiltinEnergy::Null),
            _ => None,
        }
    }

    pub fn read_kind(self) -> ReadKind {
        match self {
            BuiltinEnergy::LumaGradXAbs
            | BuiltinEnergy::LumaGradSumAbs
            | BuiltinEnergy::LumaGradNorm => ReadKind::Luma,
            _ => ReadKind::Brightness,
        }
    }

    pub fn radius(self) -> usize {
        1
    }
}

// One-sided differences on the border, central differences inside.
fn derivative(pos: usize, len: usize, read: impl Fn(isize) -> f64) -> f64 {
    if len < 2 {
        0.0
    } else if pos == 0 {
        read(1) - read(0)
    } else if pos < len - 1 {
        (read(1) - read(-1)) / 2.0
    } else {
        read(0) - read(-1)
    }
}

fn gradient(window: &ReadingWindow<'_>) -> (f64, f64) {
    let gx = derivative(window.x(), window.width(), |d| window.read(d, 0));
    let gy = derivative(window.y(), window.height(), |d| window.read(0, d));
    (gx, gy)
}

impl EnergyFunction for BuiltinEnergy {
    fn energy(&self, window: &ReadingWindow<'_>) -> f32 {
        let (gx, gy) = match self {
            BuiltinEnergy::Null => return 0.0,
            _ => gradient(window),
        };
        let e = match self {
            BuiltinEnergy::GradXAbs | BuiltinEnergy::LumaGradXAbs => gx.abs(),
            BuiltinEnergy::GradSumAbs | BuiltinEnergy::LumaGradSumAbs => (gx.abs() + gy.abs()) / 2.0,
            BuiltinEnergy::GradNorm | BuiltinEnergy::LumaGradNorm => (gx * gx + gy * gy).sqrt(),
            BuiltinEnergy::Null => 0.0,
        };
        e as f32
    }
}

/// The energy function in use, with how far it reads and what.
#[derive(Clone)]
pub(crate) struct EnergyConfig {
    pub function: Arc<dyn EnergyFunction>,
    pub radius: usize,
    pub read: ReadKind,
}

impl EnergyConfig {
    pub fn builtin(energy: BuiltinEnergy) -> Self {
        EnergyConfig {
            function: Arc::new(energy),
            radius: energy.radius(),
            read: energy.read_kind(),
        }
    }
}

impl Default for EnergyConfig {
    fn default() -> Self {
        EnergyConfig::builtin(BuiltinEnergy::GradXAbs)
    }
}

impl fmt::Debug for EnergyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnergyConfig")
            .field("radius", &self.radius)
            .field("read", &self.read)
            .finish()
    }
}
