// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The carver
//!
//! A `Carver` owns one pixel buffer and everything needed to resize it
//! seam by seam: the cost maps, the visibility levels, the rigidity and
//! bias layers, and the carvers attached to it.
//!
//! The carver always works on vertical seams.  Heights are changed by
//! transposing the buffer and carving its width; the carver then stays
//! transposed until a width request arrives, so that height levels can
//! be replayed.  Every size query and readout is in user orientation.
//!
//! Shrinking carves seams and records, for every pixel, the level at
//! which it went away.  Any size between the original and the deepest
//! carve so far is then a matter of picking a level.  Growing past the
//! original inserts copies of the cheapest seams ("inflating"), and
//! growing past what one inflation can give flattens the result and
//! starts again from there.

use crate::carverlist::{AttachedId, CarverList};
use crate::costmaps::CostMaps;
use crate::cq;
use crate::energy::{BuiltinEnergy, EnergyConfig, EnergyFunction};
use crate::error::{try_with_capacity, Error, Result};
use crate::pixels::{remap_layer, ColorDepth, PixelBuffer, Source};
use crate::progress::{Progress, ProgressSink};
use crate::rigidity::RigidityModel;
use crate::seamfinder::Side;
use crate::state::{CancelHandle, CarverState, StateCell};
use crate::visibility::{Orientation, Visibility, VisibilityMap};
use crate::window::ReadKind;
use itertools::iproduct;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// How a resize call ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    Completed,
    /// Stopped on request.  The image is at the last fully carved size.
    Cancelled,
}

/// Which axis goes first when both change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeOrder {
    /// Width first.
    #[default]
    Horizontal,
    /// Height first.
    Vertical,
    /// One seam at a time, alternating.
    Interleaved,
}

// The three ways the working grid gets rebuilt.
#[derive(Debug, Clone, Copy)]
enum Reshape {
    Inflate(usize),
    Flatten,
    Transpose,
}

// A rebuilt grid for one carver, ready to install.
struct Regrid {
    pixels: PixelBuffer,
    bias: Option<Vec<f32>>,
    mask: Option<Vec<f32>>,
    vis: Visibility,
    width: usize,
    height: usize,
}

fn step_toward(from: usize, to: usize) -> usize {
    cq!(to > from, from + 1, from - 1)
}

#[derive(Debug)]
pub struct Carver {
    pixels: PixelBuffer,
    vis: Visibility,
    maps: Option<CostMaps>,
    // Working grid: w0 x h0 physical pixels, w_start of them per row
    // before any inflation.
    w0: usize,
    h0: usize,
    w_start: usize,
    h_start: usize,
    level: usize,
    max_level: usize,
    transposed: bool,
    rigidity: RigidityModel,
    bias: Option<Vec<f32>>,
    energy: EnergyConfig,
    resize_order: ResizeOrder,
    side: Side,
    side_switch_frequency: usize,
    enl_step: f32,
    dump_vmaps: bool,
    vmaps: Vec<VisibilityMap>,
    progress: Progress,
    state: Arc<StateCell>,
    pub(crate) attached: CarverList,
    is_attached: bool,
}

impl Carver {
    /// Take ownership of a buffer.  The carver starts with the default
    /// gradient energy, `delta_x` of 1 and no rigidity.
    pub fn new(pixels: PixelBuffer) -> Result<Self> {
        let (w, h) = pixels.dimensions();
        Ok(Carver {
            vis: Visibility::new(w, h)?,
            pixels,
            maps: None,
            w0: w,
            h0: h,
            w_start: w,
            h_start: h,
            level: 1,
            max_level: 1,
            transposed: false,
            rigidity: RigidityModel::new(0.0, 1, h),
            bias: None,
            energy: EnergyConfig::default(),
            resize_order: ResizeOrder::default(),
            side: Side::Left,
            side_switch_frequency: 0,
            enl_step: 2.0,
            dump_vmaps: false,
            vmaps: Vec::new(),
            progress: Progress::default(),
            state: Arc::new(StateCell::new()),
            attached: CarverList::default(),
            is_attached: false,
        })
    }

    /// Set the largest sideways step a seam may take between rows, and
    /// the rigidity factor that penalizes such steps.
    pub fn init(&mut self, delta_x: usize, rigidity: f32) -> Result<()> {
        if delta_x < 1 {
            return Err(Error::InvalidDeltaX);
        }
        self.rigidity.reconfigure(rigidity, delta_x, self.h0);
        self.maps = None;
        Ok(())
    }

    pub fn set_energy(&mut self, energy: BuiltinEnergy) {
        self.energy = EnergyConfig::builtin(energy);
        self.maps = None;
    }

    /// Use a custom energy function.  It will be handed windows of the
    /// given radius over values of the given kind.
    pub fn set_energy_function<F>(&mut self, function: F, radius: usize, read: ReadKind)
    where
        F: EnergyFunction + 'static,
    {
        self.energy = EnergyConfig {
            function: Arc::new(function),
            radius,
            read,
        };
        self.maps = None;
    }

    // A per-pixel layer given in user orientation, over the full grid.
    fn user_layer(&self, layer: Vec<f32>) -> Result<Vec<f32>> {
        let expected = self.w0 * self.h0;
        if layer.len() != expected {
            return Err(Error::LayerSize {
                expected,
                actual: layer.len(),
            });
        }
        if !self.transposed {
            return Ok(layer);
        }
        let (w0, h0) = (self.w0, self.h0);
        let mut plan = try_with_capacity(expected)?;
        plan.extend(iproduct!(0..h0, 0..w0).map(|(gy, gx)| Source::Copy(gx * h0 + gy)));
        remap_layer(&layer, &plan)
    }

    /// Add a per-pixel term to the energy: positive values protect a
    /// pixel, negative values mark it for removal.  One value per pixel
    /// of the full grid (see `full_dimensions`), row by row.
    pub fn set_bias(&mut self, bias: Option<Vec<f32>>) -> Result<()> {
        self.bias = bias.map(|b| self.user_layer(b)).transpose()?;
        self.maps = None;
        Ok(())
    }

    /// Scale the rigidity penalty per pixel.  Same layout as the bias.
    pub fn set_rigidity_mask(&mut self, mask: Option<Vec<f32>>) -> Result<()> {
        self.rigidity.mask = mask.map(|m| self.user_layer(m)).transpose()?;
        self.maps = None;
        Ok(())
    }

    pub fn set_resize_order(&mut self, order: ResizeOrder) {
        self.resize_order = order;
    }

    /// Flip the left/right tie-break this many times over each batch of
    /// seams.  Zero keeps seams drifting left on ties.
    pub fn set_side_switch_frequency(&mut self, frequency: usize) {
        self.side_switch_frequency = frequency;
    }

    /// How much one inflation may grow the image, as a factor of its
    /// reference width.
    pub fn set_enl_step(&mut self, step: f32) -> Result<()> {
        if !(step > 1.0 && step <= 2.0) {
            return Err(Error::InvalidEnlargementStep(step));
        }
        self.enl_step = step;
        Ok(())
    }

    pub fn set_progress<P: ProgressSink + 'static>(&mut self, sink: P) {
        self.progress.set_sink(Some(Box::new(sink)));
    }

    pub fn clear_progress(&mut self) {
        self.progress.set_sink(None);
    }

    /// Fraction of a run between progress reports.
    pub fn set_progress_step(&mut self, step: f64) {
        self.progress.set_step(step);
    }

    /// Keep a snapshot of the visibility map after every axis resize.
    pub fn set_dump_vmaps(&mut self, dump: bool) {
        self.dump_vmaps = dump;
    }

    /// A handle that can cancel this carver's running operation from
    /// another thread.  Taken from a carver that is later attached, it
    /// keeps pointing at the carver's old, unused state.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.state))
    }

    pub fn state(&self) -> CarverState {
        self.state.get()
    }

    pub fn is_attached(&self) -> bool {
        self.is_attached
    }

    fn grid_width(&self) -> usize {
        self.w0 - self.level + 1
    }

    pub fn width(&self) -> usize {
        cq!(self.transposed, self.h0, self.grid_width())
    }

    pub fn height(&self) -> usize {
        cq!(self.transposed, self.grid_width(), self.h0)
    }

    /// Width of the image the current levels are counted from.
    pub fn ref_width(&self) -> usize {
        cq!(self.transposed, self.h_start, self.w_start)
    }

    pub fn ref_height(&self) -> usize {
        cq!(self.transposed, self.w_start, self.h_start)
    }

    /// The whole working grid in user orientation: every pixel still
    /// held, hidden or not.  Bias and rigidity-mask layers must have
    /// exactly this many values.  Equal to the reference size plus the
    /// enlargement depth along the working axis.
    pub fn full_dimensions(&self) -> (usize, usize) {
        cq!(self.transposed, (self.h0, self.w0), (self.w0, self.h0))
    }

    pub fn channels(&self) -> usize {
        self.pixels.channels()
    }

    pub fn depth(&self) -> ColorDepth {
        self.pixels.depth()
    }

    /// Seams inserted by the current inflation, along the working axis.
    pub fn enlargement_depth(&self) -> usize {
        self.w0 - self.w_start
    }

    pub fn orientation(&self) -> Orientation {
        cq!(self.transposed, Orientation::Horizontal, Orientation::Vertical)
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn resize_width(&mut self, width: usize) -> Result<ResizeOutcome> {
        self.check_request(width, Orientation::Vertical)?;
        self.run(|c| c.resize_axis(width, Orientation::Vertical))
    }

    pub fn resize_height(&mut self, height: usize) -> Result<ResizeOutcome> {
        self.check_request(height, Orientation::Horizontal)?;
        self.run(|c| c.resize_axis(height, Orientation::Horizontal))
    }

    /// Resize both axes, in the configured order.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<ResizeOutcome> {
        self.check_request(width, Orientation::Vertical)?;
        self.check_request(height, Orientation::Horizontal)?;
        self.run(|c| match c.resize_order {
            ResizeOrder::Horizontal => {
                c.resize_axis(width, Orientation::Vertical)?;
                c.resize_axis(height, Orientation::Horizontal)
            }
            ResizeOrder::Vertical => {
                c.resize_axis(height, Orientation::Horizontal)?;
                c.resize_axis(width, Orientation::Vertical)
            }
            ResizeOrder::Interleaved => c.resize_interleaved(width, height),
        })
    }

    /// Resize relative to the current size.
    pub fn resize_by(&mut self, dw: isize, dh: isize) -> Result<ResizeOutcome> {
        let width = self.width() as isize + dw;
        let height = self.height() as isize + dh;
        for target in [width, height] {
            if target < 1 {
                return Err(Error::TargetTooSmall(target));
            }
        }
        self.resize(width as usize, height as usize)
    }

    /// Commit the current size as the new reference image, dropping
    /// every recorded level.  There is no way back.
    pub fn flatten(&mut self) -> Result<()> {
        if self.is_attached {
            return Err(Error::NotRoot);
        }
        self.state.begin(CarverState::Flattening)?;
        let result = self.flatten_all();
        self.state.set(CarverState::Std);
        result
    }

    fn check_request(&self, target: usize, axis: Orientation) -> Result<()> {
        if self.is_attached {
            return Err(Error::NotRoot);
        }
        if target < 1 {
            return Err(Error::TargetTooSmall(target as isize));
        }
        let current = match axis {
            Orientation::Vertical => self.width(),
            Orientation::Horizontal => self.height(),
        };
        let start = cq!(self.orientation() == axis, self.w_start, current);
        if target > current && start < 2 {
            return Err(Error::TooNarrow);
        }
        Ok(())
    }

    fn run<F>(&mut self, op: F) -> Result<ResizeOutcome>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.state.begin(CarverState::Resizing)?;
        let result = op(self);
        self.state.set(CarverState::Std);
        match result {
            Ok(()) => {
                info!(width = self.width(), height = self.height(), "resize complete");
                Ok(ResizeOutcome::Completed)
            }
            Err(Error::Cancelled) => {
                info!(width = self.width(), height = self.height(), "resize cancelled");
                Ok(ResizeOutcome::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    // Run `f` in `state`, then put back whatever state was there.
    fn with_state<T, F>(&mut self, state: CarverState, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let previous = self.state.get();
        self.state.set(state);
        let result = self.state.check().and_then(|_| f(self));
        self.state.set(previous);
        result
    }

    fn resize_axis(&mut self, target: usize, axis: Orientation) -> Result<()> {
        if self.orientation() != axis {
            self.transpose_all()?;
        }
        let label = cq!(axis == Orientation::Vertical, "width", "height");
        self.progress.init(&format!("resizing {} to {}", label, target));
        self.resize_grid(target)?;
        self.progress.end(&format!("{} is {}", label, target));
        if self.dump_vmaps {
            let map = self.vmap();
            self.vmaps.push(map);
        }
        Ok(())
    }

    fn resize_interleaved(&mut self, width: usize, height: usize) -> Result<()> {
        while self.width() != width || self.height() != height {
            if self.width() != width {
                let target = step_toward(self.width(), width);
                self.resize_axis(target, Orientation::Vertical)?;
            }
            if self.height() != height {
                let target = step_toward(self.height(), height);
                self.resize_axis(target, Orientation::Horizontal)?;
            }
        }
        Ok(())
    }

    // Bring the working grid to `target` columns.
    fn resize_grid(&mut self, target: usize) -> Result<()> {
        loop {
            if target <= self.w0 {
                let level = self.w0 - target + 1;
                self.build_maps(level)?;
                self.set_level(level);
                return Ok(());
            }

            if self.w0 > self.w_start {
                self.set_level(1);
                self.flatten_all()?;
                continue;
            }

            if self.w_start < 2 {
                return Err(Error::TooNarrow);
            }
            let cap = ((self.enl_step - 1.0) * self.w_start as f32) as usize;
            let seams = (target - self.w0).min(cap.clamp(1, self.w_start - 1));
            self.build_maps(seams + 1)?;
            self.set_level(1);
            self.inflate_all(seams)?;
        }
    }

    // Move this carver and everything attached to it to `level`.
    fn set_level(&mut self, level: usize) {
        self.level = level;
        let max_level = self.max_level;
        self.attached.for_each(&mut |aux: &mut Carver| {
            aux.level = level;
            aux.max_level = max_level;
        });
    }

    fn fresh_maps(&self) -> Result<CostMaps> {
        debug!(level = self.max_level, "building energy and minpath maps");
        let mut maps = CostMaps::new(&self.pixels, &self.vis, self.max_level, self.energy.read)?;
        maps.build_emap(&self.energy, self.bias.as_deref(), &self.state)?;
        maps.build_mmap(&self.rigidity, self.side, &self.state)?;
        Ok(maps)
    }

    // Make sure levels up to `depth` have been computed.  On failure the
    // carver is left at the deepest level fully carved, without maps.
    fn build_maps(&mut self, depth: usize) -> Result<()> {
        if depth <= self.max_level {
            return Ok(());
        }
        self.set_level(self.max_level);
        let mut maps = match self.maps.take() {
            Some(maps) => maps,
            None => self.fresh_maps()?,
        };
        match self.build_vsmap(&mut maps, depth) {
            Ok(()) => {
                self.maps = Some(maps);
                Ok(())
            }
            Err(e) => {
                self.set_level(self.max_level);
                Err(e)
            }
        }
    }

    fn build_vsmap(&mut self, maps: &mut CostMaps, depth: usize) -> Result<()> {
        let start = self.max_level;
        let span = depth - start;
        let interval = cq!(
            self.side_switch_frequency > 0,
            (span - 1) / self.side_switch_frequency + 1,
            0
        );
        debug!(from = start, to = depth, "carving seams");

        for l in start..depth {
            self.state.check()?;
            self.progress.update((l - start) as f64 / span as f64);

            maps.build_vpath(&self.rigidity, self.side);
            trace!(level = l, top = maps.vpath_x[0], "seam");
            self.commit_seam(&maps.vpath, l);
            self.max_level = l + 1;
            self.set_level(l + 1);
            maps.carve();

            if maps.width > 1 {
                maps.update_emap(&self.energy, self.bias.as_deref(), &self.state)?;
                if interval > 0 && (l - start + interval / 2) % interval == 0 {
                    self.side = self.side.flip();
                    maps.build_mmap(&self.rigidity, self.side, &self.state)?;
                } else {
                    maps.update_mmap(&self.rigidity, self.side, &self.state)?;
                }
            } else {
                // The last column goes at the deepest level.
                let last: Vec<usize> = (0..maps.height).map(|y| maps.row(y)[0]).collect();
                self.commit_seam(&last, self.w0);
            }
        }
        Ok(())
    }

    fn commit_seam(&mut self, seam: &[usize], level: usize) {
        for &z in seam {
            self.vis.set(z, level);
        }
        self.attached.for_each(&mut |aux: &mut Carver| {
            for &z in seam {
                aux.vis.set(z, level);
            }
        });
    }

    // Build the grid `op` would leave behind, without touching this
    // carver.
    fn reshaped(&self, op: Reshape) -> Result<Regrid> {
        match op {
            Reshape::Inflate(n) => self.inflated(n),
            Reshape::Flatten => self.flattened(),
            Reshape::Transpose => self.transposed_grid(),
        }
    }

    fn regrid(&self, width: usize, height: usize, plan: &[Source], vis: Visibility) -> Result<Regrid> {
        Ok(Regrid {
            pixels: self.pixels.remap(width, height, plan)?,
            bias: self.bias.as_deref().map(|b| remap_layer(b, plan)).transpose()?,
            mask: self
                .rigidity
                .mask
                .as_deref()
                .map(|m| remap_layer(m, plan))
                .transpose()?,
            vis,
            width,
            height,
        })
    }

    // Insert a copy of each of the first `n` seams, averaged with its
    // left neighbour.  Copies come back in the order their seams went.
    fn inflated(&self, n: usize) -> Result<Regrid> {
        let (w0, h0) = (self.w0, self.h0);
        let width = w0 + n;
        let mut plan = try_with_capacity(width * h0)?;
        let mut levels = try_with_capacity(width * h0)?;
        for y in 0..h0 {
            for x in 0..w0 {
                let z = y * w0 + x;
                let vs = self.vis.get(z);
                if vs >= 1 && vs <= n {
                    plan.push(Source::Average(cq!(x > 0, z - 1, z), z));
                    levels.push(n - vs + 1);
                }
                plan.push(Source::Copy(z));
                levels.push(cq!(vs == 0, 0, vs + n));
            }
        }
        assert_eq!(plan.len(), width * h0, "visibility levels do not form whole seams");
        self.regrid(width, h0, &plan, Visibility::from_levels(width, h0, levels))
    }

    // Physical offsets of the pixels visible now, row-major.
    fn visible_offsets(&self) -> Result<Vec<usize>> {
        let width = self.grid_width();
        let mut kept = try_with_capacity(width * self.h0)?;
        kept.extend(self.vis.visible(self.level));
        assert_eq!(kept.len(), width * self.h0, "visible rows are ragged");
        Ok(kept)
    }

    fn flattened(&self) -> Result<Regrid> {
        let (width, h0) = (self.grid_width(), self.h0);
        let kept = self.visible_offsets()?;
        let mut plan = try_with_capacity(kept.len())?;
        plan.extend(kept.into_iter().map(Source::Copy));
        self.regrid(width, h0, &plan, Visibility::new(width, h0)?)
    }

    // Transposing drops levels, so anything carved or inflated is
    // flattened on the way.
    fn transposed_grid(&self) -> Result<Regrid> {
        let (w, h) = (self.grid_width(), self.h0);
        let kept = self.visible_offsets()?;
        let mut plan = try_with_capacity(w * h)?;
        plan.extend(iproduct!(0..w, 0..h).map(|(x, y)| Source::Copy(kept[y * w + x])));
        self.regrid(h, w, &plan, Visibility::new(h, w)?)
    }

    fn install(&mut self, op: Reshape, grid: Regrid) {
        self.pixels = grid.pixels;
        self.bias = grid.bias;
        self.rigidity.mask = grid.mask;
        self.vis = grid.vis;
        self.w0 = grid.width;
        self.h0 = grid.height;
        self.level = 1;
        self.maps = None;
        match op {
            Reshape::Inflate(n) => self.max_level += n,
            Reshape::Flatten => {
                self.w_start = self.w0;
                self.max_level = 1;
            }
            Reshape::Transpose => {
                self.w_start = self.w0;
                self.h_start = self.h0;
                self.max_level = 1;
                self.transposed = !self.transposed;
                self.rigidity.rescale(self.h0);
            }
        }
    }

    // Apply `op` to this carver and every attached one.  All the new
    // grids are built before any is installed, so a failed allocation
    // leaves every carver as it was.
    fn reshape_all(&mut self, op: Reshape) -> Result<()> {
        let mut grids = vec![self.reshaped(op)?];
        self.attached.try_for_each(&mut |aux: &mut Carver| {
            grids.push(aux.reshaped(op)?);
            Ok(())
        })?;

        let mut grids = grids.into_iter();
        if let Some(grid) = grids.next() {
            self.install(op, grid);
        }
        self.attached.for_each(&mut |aux: &mut Carver| {
            if let Some(grid) = grids.next() {
                aux.install(op, grid);
            }
        });
        Ok(())
    }

    fn inflate_all(&mut self, seams: usize) -> Result<()> {
        self.with_state(CarverState::Inflating, |c| {
            debug!(seams, "inflating");
            c.reshape_all(Reshape::Inflate(seams))
        })
    }

    fn flatten_all(&mut self) -> Result<()> {
        self.with_state(CarverState::Flattening, |c| {
            debug!(width = c.width(), height = c.height(), "flattening");
            c.reshape_all(Reshape::Flatten)
        })
    }

    fn transpose_all(&mut self) -> Result<()> {
        self.with_state(CarverState::Transposing, |c| {
            debug!(from = ?c.orientation(), "transposing");
            c.reshape_all(Reshape::Transpose)
        })
    }

    /// Attach a companion carver, such as a mask, that will lose the
    /// same pixels as this one from now on.  Its visible image must be
    /// the size of this carver's full image.  Both must be idle.
    pub fn attach(&mut self, mut aux: Carver) -> Result<AttachedId> {
        if self.is_attached {
            return Err(Error::NotRoot);
        }
        if self.state.get() != CarverState::Std || aux.state.get() != CarverState::Std {
            return Err(Error::OperationInProgress);
        }
        let (width, height) = self.full_dimensions();
        let (aux_width, aux_height) = (aux.width(), aux.height());
        if (width, height) != (aux_width, aux_height) {
            return Err(Error::AttachedMismatch {
                width,
                height,
                aux_width,
                aux_height,
            });
        }

        if aux.transposed != self.transposed {
            aux.transpose_all()?;
        } else if aux.level > 1 || aux.w0 != aux.w_start {
            aux.flatten_all()?;
        }

        let vis = &self.vis;
        let state = &self.state;
        let (w_start, h_start, level, max_level) = (self.w_start, self.h_start, self.level, self.max_level);
        let mut adopt = |c: &mut Carver| {
            c.vis = vis.clone();
            c.w_start = w_start;
            c.h_start = h_start;
            c.level = level;
            c.max_level = max_level;
            c.maps = None;
            c.state = Arc::clone(state);
            c.is_attached = true;
        };
        adopt(&mut aux);
        aux.attached.for_each(&mut adopt);

        debug!(width, height, "attached carver");
        Ok(self.attached.push(aux))
    }

    /// Detach a carver, handing it back as an independent root at its
    /// current size.
    pub fn detach(&mut self, id: AttachedId) -> Result<Carver> {
        if self.state.get() != CarverState::Std {
            return Err(Error::OperationInProgress);
        }
        let mut aux = self.attached.remove(id).ok_or(Error::UnknownAttached(id.index()))?;
        let state = Arc::new(StateCell::new());
        aux.is_attached = false;
        aux.state = Arc::clone(&state);
        aux.attached.for_each(&mut |c: &mut Carver| c.state = Arc::clone(&state));
        Ok(aux)
    }

    pub fn attached(&self, id: AttachedId) -> Option<&Carver> {
        self.attached.get(id)
    }

    pub fn attached_mut(&mut self, id: AttachedId) -> Option<&mut Carver> {
        self.attached.get_mut(id)
    }

    pub fn attached_ids(&self) -> Vec<AttachedId> {
        self.attached.ids()
    }

    /// A snapshot of the visibility levels.
    pub fn vmap(&self) -> VisibilityMap {
        VisibilityMap {
            width: self.w0,
            height: self.h0,
            depth: self.enlargement_depth(),
            orientation: self.orientation(),
            levels: self.vis.levels().to_vec(),
        }
    }

    /// Snapshots kept since `set_dump_vmaps(true)`.
    pub fn vmaps(&self) -> &[VisibilityMap] {
        &self.vmaps
    }

    pub fn take_vmaps(&mut self) -> Vec<VisibilityMap> {
        std::mem::take(&mut self.vmaps)
    }

    /// Replay a visibility map on a carver that has not been resized.
    /// Sizes covered by the map then need no seam search at all.
    pub fn load_vmap(&mut self, map: &VisibilityMap) -> Result<()> {
        if self.is_attached {
            return Err(Error::NotRoot);
        }
        if self.state.get() != CarverState::Std {
            return Err(Error::OperationInProgress);
        }
        if map.depth != 0 {
            return Err(Error::InvalidVisibilityMap(
                "maps of enlarged images cannot be loaded".into(),
            ));
        }
        map.validate()?;
        let (width, height) = self.full_dimensions();
        if (map.image_width(), map.image_height()) != (width, height) {
            return Err(Error::InvalidVisibilityMap(format!(
                "map is {}x{}, image is {}x{}",
                map.image_width(),
                map.image_height(),
                width,
                height
            )));
        }
        if self.level != 1 || self.max_level != 1 || self.w0 != self.w_start {
            return Err(Error::InvalidVisibilityMap(
                "carver has already been resized".into(),
            ));
        }

        if map.orientation != self.orientation() {
            self.transpose_all()?;
        }
        let vis = Visibility::from_levels(map.width, map.height, map.levels.clone());
        self.attached.for_each(&mut |aux: &mut Carver| aux.vis = vis.clone());
        self.vis = vis;
        self.max_level = (map.max_level() + 1).min(self.w0);
        self.maps = None;
        self.set_level(1);
        debug!(max_level = self.max_level, "visibility map loaded");
        Ok(())
    }

    /// The image at its current size.
    pub fn image(&self) -> Result<PixelBuffer> {
        let w = self.grid_width();
        let rows: Vec<Vec<usize>> = (0..self.h0)
            .map(|y| self.vis.visible_in_row(y, self.level).collect())
            .collect();
        let mut plan = try_with_capacity(w * self.h0)?;
        if self.transposed {
            for x in 0..w {
                plan.extend(rows.iter().map(|row| Source::Copy(row[x])));
            }
            self.pixels.remap(self.h0, w, &plan)
        } else {
            plan.extend(rows.iter().flatten().map(|&z| Source::Copy(z)));
            self.pixels.remap(w, self.h0, &plan)
        }
    }

    /// One pixel of the image at its current size, every channel
    /// normalized to [0, 1].
    pub fn pixel(&self, x: usize, y: usize) -> Option<Vec<f64>> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let (gx, gy) = cq!(self.transposed, (y, x), (x, y));
        let z = self.vis.visible_in_row(gy, self.level).nth(gx)?;
        Some((0..self.pixels.channels()).map(|c| self.pixels.unit_at(z, c)).collect())
    }
}
