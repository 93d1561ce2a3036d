// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Progress reporting
//!
//! Long operations report a percentage to an optional sink.  Reports
//! are rate-limited by an update step and never go backwards.

use tracing::{debug, trace};

/// Receives progress reports.  Any `FnMut(f64)` closure is one.
pub trait ProgressSink: Send {
    fn init(&mut self, _message: &str) {}
    /// `percentage` runs from 0 to 100.
    fn update(&mut self, percentage: f64);
    fn end(&mut self, _message: &str) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(f64) + Send,
{
    fn update(&mut self, percentage: f64) {
        self(percentage)
    }
}

pub(crate) struct Progress {
    sink: Option<Box<dyn ProgressSink>>,
    step: f64,
    last: f64,
}

impl Default for Progress {
    fn default() -> Self {
        Progress {
            sink: None,
            step: 0.02,
            last: 0.0,
        }
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("attached", &self.sink.is_some())
            .field("step", &self.step)
            .finish()
    }
}

impl Progress {
    pub fn set_sink(&mut self, sink: Option<Box<dyn ProgressSink>>) {
        self.sink = sink;
    }

    /// Fraction of the run between reports, in (0, 1].
    pub fn set_step(&mut self, step: f64) {
        self.step = step.clamp(f64::EPSILON, 1.0);
    }

    pub fn init(&mut self, message: &str) {
        self.last = 0.0;
        debug!("{}", message);
        if let Some(sink) = self.sink.as_mut() {
            sink.init(message);
        }
    }

    /// Report `fraction` of the way done.
    pub fn update(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction < self.last + self.step && fraction < 1.0 {
            return;
        }
        if fraction <= self.last && self.last > 0.0 {
            return;
        }
        self.last = fraction;
        trace!(percent = fraction * 100.0, "progress");
        if let Some(sink) = self.sink.as_mut() {
            sink.update(fraction * 100.0);
        }
    }

    pub fn end(&mut self, message: &str) {
        self.update(1.0);
        debug!("{}", message);
        if let Some(sink) = self.sink.as_mut() {
            sink.end(message);
        }
    }
}
