use std::ops::{Index, IndexMut};

/// Defines the basic two-dimensional map: an addressable field
/// containing an object that represents one of several possible
/// objects during processing: a physical offset for the index remap,
/// or an energy + parent address, for the minpath map.
#[derive(Debug, Clone)]
pub struct TwoDimensionalMap<P: Default + Copy> {
    pub width: usize,
    cells: Vec<P>,
}

impl<P: Default + Copy> TwoDimensionalMap<P> {
    /// Define a new (abstract) map.  The content type must implement
    /// the Default trait.
    pub fn new(width: usize, height: usize) -> Self {
        TwoDimensionalMap {
            width,
            cells: vec![P::default(); width * height],
        }
    }

    /// Define a map and populate every cell from its address.
    #[cfg(test)]
    pub fn from_fn<F: FnMut(usize, usize) -> P>(width: usize, height: usize, mut f: F) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        TwoDimensionalMap { width, cells }
    }

    // Absolutely, the number one name of this game is keep the index
    // math in a singular location and never, ever mess with it.  This
    // particular variant is the same one used in image.rs.
    fn get_index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// A whole row, by reference.
    pub fn row(&self, y: usize) -> &[P] {
        let start = self.get_index(0, y);
        &self.cells[start..start + self.width]
    }

    /// A whole row, mutably.
    pub fn row_mut(&mut self, y: usize) -> &mut [P] {
        let start = self.get_index(0, y);
        let width = self.width;
        &mut self.cells[start..start + width]
    }
}

impl<P: Default + Copy> Index<(usize, usize)> for TwoDimensionalMap<P> {
    type Output = P;

    /// A convenience addressing mode for getting values.
    fn index(&self, (x, y): (usize, usize)) -> &P {
        let index = self.get_index(x, y);
        &self.cells[index]
    }
}

impl<P: Default + Copy> IndexMut<(usize, usize)> for TwoDimensionalMap<P> {
    /// A convenience addressing mode for setting values.
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut P {
        let index = self.get_index(x, y);
        &mut self.cells[index]
    }
}

/// A cumulative seam cost and the physical offset of the pixel in the
/// row above that it was reached from.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub(crate) struct EnergyAndBackPointer<P: Default + Copy> {
    pub energy: P,
    pub parent: usize,
}
